use chrono::{DateTime, Utc};

/// A domain event.
///
/// Events are immutable facts with a stable type name (e.g.
/// "promotions.promotion.approved") used for logging and audit.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier.
    fn event_type(&self) -> &'static str;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
