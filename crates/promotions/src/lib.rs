//! Promotions domain module.
//!
//! This crate contains the promotion approval workflow, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod code;
pub mod promotion;

pub use code::{generate_promo_code, normalize_promo_code};
pub use promotion::{
    ADMIN_ROLE, Actor, CreatePromotion, DeletePromotion, Promotion, PromotionCommand, PromotionDetails,
    PromotionEvent, PromotionPatch, PromotionRecord, PromotionStatus, ReviewPromotion, SubmitPromotion,
    TogglePromotion, UpdatePromotion, VENDOR_ROLE,
};
