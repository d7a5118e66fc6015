//! HTTP surface for the promotions platform.

pub mod app;
pub mod config;
pub mod middleware;
