//! Promotion workflow service.
//!
//! Transitions lock the promotion row, replay the command through the
//! [`Promotion`] aggregate and write back whatever state it ends in.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::instrument;

use promoflow_auth::Principal;
use promoflow_core::{Aggregate, DomainError, DomainResult, Event, PromotionId};
use promoflow_promotions::{
    Actor, CreatePromotion, DeletePromotion, Promotion, PromotionCommand, PromotionDetails, PromotionEvent,
    PromotionPatch, PromotionRecord, PromotionStatus, ReviewPromotion, SubmitPromotion, TogglePromotion, UpdatePromotion,
    generate_promo_code,
};

use super::finish;
use crate::store::{PromotionRepository, SavedPromotion, Store, UnitOfWork, conflict_on, constraints};

const CODE_IN_USE: &str = "promo code already in use";
const GENERATED_CODE_ATTEMPTS: usize = 5;

/// Result of a bookmark request. Saving twice is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveReceipt {
    pub saved: SavedPromotion,
    pub already_saved: bool,
}

#[derive(Clone)]
pub struct PromotionService {
    store: Arc<dyn Store>,
}

fn actor(principal: &Principal) -> Actor {
    Actor::new(principal.user_id, principal.role_name().map(str::to_string))
}

impl PromotionService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Create a draft. Without a caller-supplied code one is generated.
    #[instrument(skip(self, principal, details), fields(user_id = %principal.user_id))]
    pub async fn create(
        &self,
        principal: &Principal,
        details: PromotionDetails,
        promo_code: Option<&str>,
    ) -> DomainResult<PromotionRecord> {
        let mut uow = self.store.begin().await?;
        let result = async {
            let code = match promo_code {
                Some(code) => code.to_string(),
                None => unused_code(uow.as_mut()).await?,
            };
            let id = PromotionId::new();
            let mut promotion = Promotion::empty(id);
            let events = promotion.execute(&PromotionCommand::Create(CreatePromotion {
                promotion_id: id,
                actor: actor(principal),
                details,
                promo_code: code,
                occurred_at: Utc::now(),
            }))?;
            log_events(&events);

            let record = promotion
                .into_record()
                .ok_or_else(|| DomainError::internal("created promotion has no state"))?;
            if uow.find_promotion_by_code(&record.promo_code).await?.is_some() {
                return Err(DomainError::conflict(CODE_IN_USE));
            }
            uow.insert_promotion(&record)
                .await
                .map_err(|e| conflict_on(e, constraints::PROMO_CODE, CODE_IN_USE))?;
            Ok(record)
        }
        .await;
        finish(uow, result, "create_promotion").await
    }

    pub async fn submit(&self, principal: &Principal, id: PromotionId) -> DomainResult<PromotionRecord> {
        let command = PromotionCommand::Submit(SubmitPromotion {
            promotion_id: id,
            actor: actor(principal),
            occurred_at: Utc::now(),
        });
        self.transition_existing(id, command, "submit_promotion").await
    }

    pub async fn approve(
        &self,
        principal: &Principal,
        id: PromotionId,
        comments: Option<String>,
    ) -> DomainResult<PromotionRecord> {
        let command = PromotionCommand::Approve(review(principal, id, comments));
        self.transition_existing(id, command, "approve_promotion").await
    }

    pub async fn reject(
        &self,
        principal: &Principal,
        id: PromotionId,
        comments: Option<String>,
    ) -> DomainResult<PromotionRecord> {
        let command = PromotionCommand::Reject(review(principal, id, comments));
        self.transition_existing(id, command, "reject_promotion").await
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: PromotionId,
        patch: PromotionPatch,
    ) -> DomainResult<PromotionRecord> {
        let command = PromotionCommand::Update(UpdatePromotion {
            promotion_id: id,
            actor: actor(principal),
            patch,
            occurred_at: Utc::now(),
        });
        self.transition_existing(id, command, "update_promotion").await
    }

    /// approved → active, active ⇄ inactive.
    pub async fn toggle(&self, principal: &Principal, id: PromotionId) -> DomainResult<PromotionRecord> {
        let command = PromotionCommand::Toggle(TogglePromotion {
            promotion_id: id,
            actor: actor(principal),
            occurred_at: Utc::now(),
        });
        self.transition_existing(id, command, "toggle_promotion").await
    }

    pub async fn delete(&self, principal: &Principal, id: PromotionId) -> DomainResult<()> {
        let command = PromotionCommand::Delete(DeletePromotion {
            promotion_id: id,
            actor: actor(principal),
            occurred_at: Utc::now(),
        });
        let mut uow = self.store.begin().await?;
        let result = async {
            match transition(uow.as_mut(), id, &command).await? {
                None => Ok(()),
                Some(_) => Err(DomainError::internal("deleted promotion still has state")),
            }
        }
        .await;
        finish(uow, result, "delete_promotion").await
    }

    pub async fn get(&self, id: PromotionId) -> DomainResult<PromotionRecord> {
        let mut uow = self.store.begin().await?;
        let result = async {
            uow.find_promotion(id)
                .await?
                .ok_or_else(|| DomainError::not_found("promotion not found"))
        }
        .await;
        finish(uow, result, "get_promotion").await
    }

    /// Every promotion, optionally narrowed to one status (parsed case-insensitively).
    pub async fn list_all(&self, status: Option<&str>) -> DomainResult<Vec<PromotionRecord>> {
        let filter: Vec<PromotionStatus> = match status {
            Some(raw) => vec![raw.parse()?],
            None => Vec::new(),
        };
        let mut uow = self.store.begin().await?;
        let result = async { Ok::<_, DomainError>(uow.list_promotions(&filter).await?) }.await;
        finish(uow, result, "list_promotions").await
    }

    /// Approved and active promotions. No authentication required.
    pub async fn list_public(&self) -> DomainResult<Vec<PromotionRecord>> {
        let public: Vec<PromotionStatus> = PromotionStatus::ALL.into_iter().filter(|s| s.is_public()).collect();
        let mut uow = self.store.begin().await?;
        let result = async { Ok::<_, DomainError>(uow.list_promotions(&public).await?) }.await;
        finish(uow, result, "list_public_promotions").await
    }

    /// Bookmark a promotion for the caller. Idempotent.
    #[instrument(skip(self, principal), fields(user_id = %principal.user_id))]
    pub async fn save(&self, principal: &Principal, id: PromotionId) -> DomainResult<SaveReceipt> {
        let mut uow = self.store.begin().await?;
        let result = async {
            if uow.find_promotion(id).await?.is_none() {
                return Err(DomainError::not_found("promotion not found"));
            }
            if let Some(saved) = uow.find_saved(principal.user_id, id).await? {
                return Ok(SaveReceipt {
                    saved,
                    already_saved: true,
                });
            }
            let saved = SavedPromotion {
                user_id: principal.user_id,
                promotion_id: id,
                saved_at: Utc::now(),
            };
            if uow.insert_saved(&saved).await? {
                return Ok(SaveReceipt {
                    saved,
                    already_saved: false,
                });
            }
            // A concurrent save won; report the row that was actually stored.
            let saved = uow
                .find_saved(principal.user_id, id)
                .await?
                .ok_or_else(|| DomainError::internal("bookmark vanished after conflicting insert"))?;
            Ok(SaveReceipt {
                saved,
                already_saved: true,
            })
        }
        .await;
        finish(uow, result, "save_promotion").await
    }

    /// Look up an active promotion by code (case-insensitive).
    pub async fn redeem(&self, code: &str) -> DomainResult<PromotionRecord> {
        let code = code.trim().to_ascii_uppercase();
        let mut uow = self.store.begin().await?;
        let result = async {
            uow.find_promotion_by_code(&code)
                .await?
                .filter(|p| p.status == PromotionStatus::Active)
                .ok_or_else(|| DomainError::not_found("invalid or expired promo code"))
        }
        .await;
        finish(uow, result, "redeem_promotion").await
    }

    async fn transition_existing(
        &self,
        id: PromotionId,
        command: PromotionCommand,
        operation: &'static str,
    ) -> DomainResult<PromotionRecord> {
        let mut uow = self.store.begin().await?;
        let result = async {
            transition(uow.as_mut(), id, &command)
                .await?
                .ok_or_else(|| DomainError::internal("promotion vanished during transition"))
        }
        .await;
        finish(uow, result, operation).await
    }
}

fn review(principal: &Principal, id: PromotionId, comments: Option<String>) -> ReviewPromotion {
    ReviewPromotion {
        promotion_id: id,
        actor: actor(principal),
        comments,
        occurred_at: Utc::now(),
    }
}

fn log_events(events: &[PromotionEvent]) {
    for event in events {
        tracing::info!(
            event_type = event.event_type(),
            promotion_id = %event.promotion_id(),
            "promotion event"
        );
    }
}

/// Lock, decide, apply, persist. Returns the new state (`None` once deleted).
async fn transition(
    uow: &mut dyn UnitOfWork,
    id: PromotionId,
    command: &PromotionCommand,
) -> DomainResult<Option<PromotionRecord>> {
    let mut promotion = match uow.find_promotion_for_update(id).await? {
        Some(record) => Promotion::restore(record),
        None => Promotion::empty(id),
    };
    let previous_code = promotion.record().map(|r| r.promo_code.clone());

    let events = promotion.execute(command)?;
    log_events(&events);

    match promotion.into_record() {
        Some(record) => {
            if previous_code.as_deref() != Some(record.promo_code.as_str()) {
                if let Some(other) = uow.find_promotion_by_code(&record.promo_code).await? {
                    if other.id != record.id {
                        return Err(DomainError::conflict(CODE_IN_USE));
                    }
                }
            }
            uow.update_promotion(&record)
                .await
                .map_err(|e| conflict_on(e, constraints::PROMO_CODE, CODE_IN_USE))?;
            Ok(Some(record))
        }
        None => {
            uow.delete_promotion(id).await?;
            Ok(None)
        }
    }
}

async fn unused_code(uow: &mut dyn UnitOfWork) -> DomainResult<String> {
    for _ in 0..GENERATED_CODE_ATTEMPTS {
        let code = generate_promo_code();
        if uow.find_promotion_by_code(&code).await?.is_none() {
            return Ok(code);
        }
    }
    Err(DomainError::conflict("could not generate an unused promo code"))
}
