use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use promoflow_core::{Aggregate, AggregateRoot, DomainError, Event, PromotionId, UserId};

use crate::code::normalize_promo_code;

/// Role allowed to create (and therefore own) promotions.
pub const VENDOR_ROLE: &str = "vendor";

/// Role allowed to review pending promotions.
pub const ADMIN_ROLE: &str = "admin";

/// Promotion status lifecycle.
///
/// `draft → pending → approved | rejected`, then `approved → active ⇄ inactive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromotionStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
    Active,
    Inactive,
}

impl PromotionStatus {
    pub const ALL: [PromotionStatus; 6] = [
        PromotionStatus::Draft,
        PromotionStatus::Pending,
        PromotionStatus::Approved,
        PromotionStatus::Rejected,
        PromotionStatus::Active,
        PromotionStatus::Inactive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PromotionStatus::Draft => "draft",
            PromotionStatus::Pending => "pending",
            PromotionStatus::Approved => "approved",
            PromotionStatus::Rejected => "rejected",
            PromotionStatus::Active => "active",
            PromotionStatus::Inactive => "inactive",
        }
    }

    /// Visible on the public listing.
    pub fn is_public(self) -> bool {
        matches!(self, PromotionStatus::Approved | PromotionStatus::Active)
    }

    pub fn is_editable(self) -> bool {
        !matches!(self, PromotionStatus::Approved | PromotionStatus::Active)
    }

    pub fn is_toggleable(self) -> bool {
        matches!(
            self,
            PromotionStatus::Approved | PromotionStatus::Active | PromotionStatus::Inactive
        )
    }
}

impl core::fmt::Display for PromotionStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for PromotionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        PromotionStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "unknown promotion status '{s}' (expected one of: draft, pending, approved, rejected, active, inactive)"
                ))
            })
    }
}

/// Who is asking: the user id and (if any) the role name they hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Option<String>,
}

impl Actor {
    pub fn new(user_id: UserId, role: Option<String>) -> Self {
        Self { user_id, role }
    }

    /// Role names compare case-insensitively.
    pub fn has_role(&self, name: &str) -> bool {
        self.role
            .as_deref()
            .is_some_and(|r| r.trim().eq_ignore_ascii_case(name))
    }
}

/// Vendor-editable promotion content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionDetails {
    pub title: String,
    pub description: Option<String>,
    pub terms: Option<String>,
    pub image_url: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Percentage off, 0..=100.
    pub discount: Option<i32>,
    pub target_segments: Option<String>,
}

impl PromotionDetails {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.title.trim().is_empty() {
            return Err(DomainError::validation("title must not be empty"));
        }
        if self.end_date < self.start_date {
            return Err(DomainError::validation("end_date must not be before start_date"));
        }
        if let Some(discount) = self.discount {
            if !(0..=100).contains(&discount) {
                return Err(DomainError::validation("discount must be between 0 and 100"));
            }
        }
        Ok(())
    }
}

/// Field-level patch. An absent field is left unchanged.
///
/// Optional detail fields take `Option<Option<T>>`: absent → `None`,
/// `null` → `Some(None)` (clear), a value → `Some(Some(v))`.
///
/// `status` writes the status directly, bypassing the transition table; only
/// the creator can do it and only while the promotion is still editable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromotionPatch {
    pub title: Option<String>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub terms: Option<Option<String>>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<Option<String>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub discount: Option<Option<i32>>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub target_segments: Option<Option<String>>,
    pub promo_code: Option<String>,
    pub status: Option<PromotionStatus>,
}

/// Only called for fields present in the input, so `null` becomes `Some(None)`.
#[allow(clippy::option_option)]
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl PromotionPatch {
    fn merged_into(&self, details: &PromotionDetails) -> PromotionDetails {
        let mut out = details.clone();
        if let Some(v) = &self.title {
            out.title = v.clone();
        }
        if let Some(v) = &self.description {
            out.description = v.clone();
        }
        if let Some(v) = &self.terms {
            out.terms = v.clone();
        }
        if let Some(v) = &self.image_url {
            out.image_url = v.clone();
        }
        if let Some(v) = self.start_date {
            out.start_date = v;
        }
        if let Some(v) = self.end_date {
            out.end_date = v;
        }
        if let Some(v) = self.discount {
            out.discount = v;
        }
        if let Some(v) = &self.target_segments {
            out.target_segments = v.clone();
        }
        out
    }
}

/// Persisted state of a promotion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionRecord {
    pub id: PromotionId,
    pub created_by: UserId,
    #[serde(flatten)]
    pub details: PromotionDetails,
    pub promo_code: String,
    pub status: PromotionStatus,
    pub approval_comments: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<UserId>,
    pub version: u64,
}

/// Aggregate root: Promotion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Promotion {
    id: PromotionId,
    record: Option<PromotionRecord>,
    version: u64,
}

impl Promotion {
    /// A not-yet-created promotion (target of a create command).
    pub fn empty(id: PromotionId) -> Self {
        Self {
            id,
            record: None,
            version: 0,
        }
    }

    /// Rehydrate from persisted state.
    pub fn restore(record: PromotionRecord) -> Self {
        Self {
            id: record.id,
            version: record.version,
            record: Some(record),
        }
    }

    pub fn id_typed(&self) -> PromotionId {
        self.id
    }

    pub fn record(&self) -> Option<&PromotionRecord> {
        self.record.as_ref()
    }

    pub fn into_record(self) -> Option<PromotionRecord> {
        self.record
    }

    pub fn status(&self) -> Option<PromotionStatus> {
        self.record.as_ref().map(|r| r.status)
    }

    pub fn exists(&self) -> bool {
        self.record.is_some()
    }
}

impl AggregateRoot for Promotion {
    type Id = PromotionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Command: CreatePromotion. `promo_code` is supplied by the caller (generated or user-chosen).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePromotion {
    pub promotion_id: PromotionId,
    pub actor: Actor,
    pub details: PromotionDetails,
    pub promo_code: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SubmitPromotion (draft → pending).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitPromotion {
    pub promotion_id: PromotionId,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Command body shared by approve and reject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewPromotion {
    pub promotion_id: PromotionId,
    pub actor: Actor,
    pub comments: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePromotion {
    pub promotion_id: PromotionId,
    pub actor: Actor,
    pub patch: PromotionPatch,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TogglePromotion {
    pub promotion_id: PromotionId,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletePromotion {
    pub promotion_id: PromotionId,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromotionCommand {
    Create(CreatePromotion),
    Submit(SubmitPromotion),
    Approve(ReviewPromotion),
    Reject(ReviewPromotion),
    Update(UpdatePromotion),
    Toggle(TogglePromotion),
    Delete(DeletePromotion),
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionCreated {
    pub promotion_id: PromotionId,
    pub created_by: UserId,
    pub details: PromotionDetails,
    pub promo_code: String,
    pub occurred_at: DateTime<Utc>,
}

/// A status change without other payload (submit, activate, deactivate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub promotion_id: PromotionId,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionReviewed {
    pub promotion_id: PromotionId,
    pub actor: UserId,
    pub comments: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Carries the full post-patch content so `apply` does not re-run validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionUpdated {
    pub promotion_id: PromotionId,
    pub actor: UserId,
    pub details: PromotionDetails,
    pub promo_code: String,
    pub status: PromotionStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromotionEvent {
    Created(PromotionCreated),
    Submitted(StatusChanged),
    Approved(PromotionReviewed),
    Rejected(PromotionReviewed),
    Updated(PromotionUpdated),
    Activated(StatusChanged),
    Deactivated(StatusChanged),
    Deleted(StatusChanged),
}

impl PromotionEvent {
    pub fn promotion_id(&self) -> PromotionId {
        match self {
            PromotionEvent::Created(e) => e.promotion_id,
            PromotionEvent::Updated(e) => e.promotion_id,
            PromotionEvent::Approved(e) | PromotionEvent::Rejected(e) => e.promotion_id,
            PromotionEvent::Submitted(e)
            | PromotionEvent::Activated(e)
            | PromotionEvent::Deactivated(e)
            | PromotionEvent::Deleted(e) => e.promotion_id,
        }
    }
}

impl Event for PromotionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PromotionEvent::Created(_) => "promotions.promotion.created",
            PromotionEvent::Submitted(_) => "promotions.promotion.submitted",
            PromotionEvent::Approved(_) => "promotions.promotion.approved",
            PromotionEvent::Rejected(_) => "promotions.promotion.rejected",
            PromotionEvent::Updated(_) => "promotions.promotion.updated",
            PromotionEvent::Activated(_) => "promotions.promotion.activated",
            PromotionEvent::Deactivated(_) => "promotions.promotion.deactivated",
            PromotionEvent::Deleted(_) => "promotions.promotion.deleted",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PromotionEvent::Created(e) => e.occurred_at,
            PromotionEvent::Updated(e) => e.occurred_at,
            PromotionEvent::Approved(e) | PromotionEvent::Rejected(e) => e.occurred_at,
            PromotionEvent::Submitted(e)
            | PromotionEvent::Activated(e)
            | PromotionEvent::Deactivated(e)
            | PromotionEvent::Deleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Promotion {
    type Command = PromotionCommand;
    type Event = PromotionEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PromotionEvent::Created(e) => {
                self.id = e.promotion_id;
                self.record = Some(PromotionRecord {
                    id: e.promotion_id,
                    created_by: e.created_by,
                    details: e.details.clone(),
                    promo_code: e.promo_code.clone(),
                    status: PromotionStatus::Draft,
                    approval_comments: None,
                    created_at: e.occurred_at,
                    updated_at: e.occurred_at,
                    updated_by: None,
                    version: 0,
                });
            }
            PromotionEvent::Submitted(e) => self.touch(PromotionStatus::Pending, e.actor, e.occurred_at),
            PromotionEvent::Approved(e) => {
                self.touch(PromotionStatus::Approved, e.actor, e.occurred_at);
                self.set_comments(e.comments.clone());
            }
            PromotionEvent::Rejected(e) => {
                self.touch(PromotionStatus::Rejected, e.actor, e.occurred_at);
                self.set_comments(e.comments.clone());
            }
            PromotionEvent::Updated(e) => {
                self.touch(e.status, e.actor, e.occurred_at);
                if let Some(r) = self.record.as_mut() {
                    r.details = e.details.clone();
                    r.promo_code = e.promo_code.clone();
                }
            }
            PromotionEvent::Activated(e) => self.touch(PromotionStatus::Active, e.actor, e.occurred_at),
            PromotionEvent::Deactivated(e) => self.touch(PromotionStatus::Inactive, e.actor, e.occurred_at),
            PromotionEvent::Deleted(_) => {
                self.record = None;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
        if let Some(r) = self.record.as_mut() {
            r.version = self.version;
        }
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PromotionCommand::Create(cmd) => self.handle_create(cmd),
            PromotionCommand::Submit(cmd) => self.handle_submit(cmd),
            PromotionCommand::Approve(cmd) => self.handle_review(cmd, true),
            PromotionCommand::Reject(cmd) => self.handle_review(cmd, false),
            PromotionCommand::Update(cmd) => self.handle_update(cmd),
            PromotionCommand::Toggle(cmd) => self.handle_toggle(cmd),
            PromotionCommand::Delete(cmd) => self.handle_delete(cmd),
        }
    }
}

impl Promotion {
    fn touch(&mut self, status: PromotionStatus, actor: UserId, at: DateTime<Utc>) {
        if let Some(r) = self.record.as_mut() {
            r.status = status;
            r.updated_by = Some(actor);
            r.updated_at = at;
        }
    }

    fn set_comments(&mut self, comments: Option<String>) {
        if let Some(r) = self.record.as_mut() {
            r.approval_comments = comments;
        }
    }

    // Guards run in a fixed order: existence, then role/ownership, then status.

    fn ensure_exists(&self, promotion_id: PromotionId) -> Result<&PromotionRecord, DomainError> {
        if self.id != promotion_id {
            return Err(DomainError::internal("promotion_id mismatch"));
        }
        self.record
            .as_ref()
            .ok_or_else(|| DomainError::not_found("promotion not found"))
    }

    fn ensure_creator(record: &PromotionRecord, actor: &Actor, action: &str) -> Result<(), DomainError> {
        if record.created_by != actor.user_id {
            return Err(DomainError::forbidden(format!(
                "only the creator can {action} this promotion"
            )));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreatePromotion) -> Result<Vec<PromotionEvent>, DomainError> {
        if self.record.is_some() {
            return Err(DomainError::conflict("promotion already exists"));
        }
        if !cmd.actor.has_role(VENDOR_ROLE) {
            return Err(DomainError::forbidden("only vendors can create promotions"));
        }
        cmd.details.validate()?;
        let promo_code = normalize_promo_code(&cmd.promo_code)?;

        Ok(vec![PromotionEvent::Created(PromotionCreated {
            promotion_id: cmd.promotion_id,
            created_by: cmd.actor.user_id,
            details: cmd.details.clone(),
            promo_code,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_submit(&self, cmd: &SubmitPromotion) -> Result<Vec<PromotionEvent>, DomainError> {
        let record = self.ensure_exists(cmd.promotion_id)?;
        Self::ensure_creator(record, &cmd.actor, "submit")?;
        if record.status != PromotionStatus::Draft {
            return Err(DomainError::invalid_state(format!(
                "only draft promotions can be submitted for approval (status: {})",
                record.status
            )));
        }

        Ok(vec![PromotionEvent::Submitted(StatusChanged {
            promotion_id: cmd.promotion_id,
            actor: cmd.actor.user_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_review(&self, cmd: &ReviewPromotion, approve: bool) -> Result<Vec<PromotionEvent>, DomainError> {
        let verb = if approve { "approve" } else { "reject" };
        let record = self.ensure_exists(cmd.promotion_id)?;
        if !cmd.actor.has_role(ADMIN_ROLE) {
            return Err(DomainError::forbidden(format!("only admins can {verb} promotions")));
        }
        if record.status != PromotionStatus::Pending {
            return Err(DomainError::invalid_state(format!(
                "only pending promotions can be {verb}d (status: {})",
                record.status
            )));
        }

        let reviewed = PromotionReviewed {
            promotion_id: cmd.promotion_id,
            actor: cmd.actor.user_id,
            comments: cmd.comments.clone(),
            occurred_at: cmd.occurred_at,
        };
        Ok(vec![if approve {
            PromotionEvent::Approved(reviewed)
        } else {
            PromotionEvent::Rejected(reviewed)
        }])
    }

    fn handle_update(&self, cmd: &UpdatePromotion) -> Result<Vec<PromotionEvent>, DomainError> {
        let record = self.ensure_exists(cmd.promotion_id)?;
        Self::ensure_creator(record, &cmd.actor, "update")?;
        if !record.status.is_editable() {
            return Err(DomainError::invalid_state(format!(
                "approved or active promotions cannot be edited (status: {})",
                record.status
            )));
        }

        let details = cmd.patch.merged_into(&record.details);
        details.validate()?;
        let promo_code = match &cmd.patch.promo_code {
            Some(raw) => normalize_promo_code(raw)?,
            None => record.promo_code.clone(),
        };

        Ok(vec![PromotionEvent::Updated(PromotionUpdated {
            promotion_id: cmd.promotion_id,
            actor: cmd.actor.user_id,
            details,
            promo_code,
            status: cmd.patch.status.unwrap_or(record.status),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_toggle(&self, cmd: &TogglePromotion) -> Result<Vec<PromotionEvent>, DomainError> {
        let record = self.ensure_exists(cmd.promotion_id)?;
        Self::ensure_creator(record, &cmd.actor, "change the status of")?;
        if !record.status.is_toggleable() {
            return Err(DomainError::invalid_state(format!(
                "only approved promotions can be activated or deactivated (status: {})",
                record.status
            )));
        }

        let changed = StatusChanged {
            promotion_id: cmd.promotion_id,
            actor: cmd.actor.user_id,
            occurred_at: cmd.occurred_at,
        };
        Ok(vec![match record.status {
            PromotionStatus::Active => PromotionEvent::Deactivated(changed),
            _ => PromotionEvent::Activated(changed),
        }])
    }

    fn handle_delete(&self, cmd: &DeletePromotion) -> Result<Vec<PromotionEvent>, DomainError> {
        let record = self.ensure_exists(cmd.promotion_id)?;
        Self::ensure_creator(record, &cmd.actor, "delete")?;

        Ok(vec![PromotionEvent::Deleted(StatusChanged {
            promotion_id: cmd.promotion_id,
            actor: cmd.actor.user_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use proptest::prelude::*;

    use super::*;
    use promoflow_core::ErrorKind;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn vendor() -> Actor {
        Actor::new(UserId::new(), Some("Vendor".to_string()))
    }

    fn admin() -> Actor {
        Actor::new(UserId::new(), Some("admin".to_string()))
    }

    fn details() -> PromotionDetails {
        let start = test_time();
        PromotionDetails {
            title: "Summer sale".to_string(),
            description: Some("Everything must go".to_string()),
            terms: None,
            image_url: None,
            start_date: start,
            end_date: start + Duration::days(30),
            discount: Some(20),
            target_segments: Some("students".to_string()),
        }
    }

    fn created_by(actor: &Actor) -> Promotion {
        let id = PromotionId::new();
        let mut promo = Promotion::empty(id);
        promo
            .execute(&PromotionCommand::Create(CreatePromotion {
                promotion_id: id,
                actor: actor.clone(),
                details: details(),
                promo_code: "summer24".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap();
        promo
    }

    fn submit(actor: &Actor, id: PromotionId) -> PromotionCommand {
        PromotionCommand::Submit(SubmitPromotion {
            promotion_id: id,
            actor: actor.clone(),
            occurred_at: test_time(),
        })
    }

    fn approve(actor: &Actor, id: PromotionId) -> PromotionCommand {
        PromotionCommand::Approve(ReviewPromotion {
            promotion_id: id,
            actor: actor.clone(),
            comments: Some("looks good".to_string()),
            occurred_at: test_time(),
        })
    }

    fn reject(actor: &Actor, id: PromotionId) -> PromotionCommand {
        PromotionCommand::Reject(ReviewPromotion {
            promotion_id: id,
            actor: actor.clone(),
            comments: Some("no".to_string()),
            occurred_at: test_time(),
        })
    }

    fn toggle(actor: &Actor, id: PromotionId) -> PromotionCommand {
        PromotionCommand::Toggle(TogglePromotion {
            promotion_id: id,
            actor: actor.clone(),
            occurred_at: test_time(),
        })
    }

    fn update(actor: &Actor, id: PromotionId, patch: PromotionPatch) -> PromotionCommand {
        PromotionCommand::Update(UpdatePromotion {
            promotion_id: id,
            actor: actor.clone(),
            patch,
            occurred_at: test_time(),
        })
    }

    fn delete(actor: &Actor, id: PromotionId) -> PromotionCommand {
        PromotionCommand::Delete(DeletePromotion {
            promotion_id: id,
            actor: actor.clone(),
            occurred_at: test_time(),
        })
    }

    #[test]
    fn create_starts_in_draft_with_normalized_code() {
        let v = vendor();
        let promo = created_by(&v);
        let record = promo.record().unwrap();
        assert_eq!(record.status, PromotionStatus::Draft);
        assert_eq!(record.created_by, v.user_id);
        assert_eq!(record.promo_code, "SUMMER24");
        assert_eq!(promo.version(), 1);
    }

    #[test]
    fn only_vendors_create() {
        let id = PromotionId::new();
        let promo = Promotion::empty(id);
        let customer = Actor::new(UserId::new(), Some("customer".to_string()));
        let err = promo
            .handle(&PromotionCommand::Create(CreatePromotion {
                promotion_id: id,
                actor: customer,
                details: details(),
                promo_code: "CODE1".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let roleless = Actor::new(UserId::new(), None);
        let err = promo
            .handle(&PromotionCommand::Create(CreatePromotion {
                promotion_id: id,
                actor: roleless,
                details: details(),
                promo_code: "CODE1".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[test]
    fn create_validates_details() {
        let id = PromotionId::new();
        let mut bad = details();
        bad.end_date = bad.start_date - Duration::days(1);
        let err = Promotion::empty(id)
            .handle(&PromotionCommand::Create(CreatePromotion {
                promotion_id: id,
                actor: vendor(),
                details: bad,
                promo_code: "CODE1".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("end_date")));
    }

    #[test]
    fn full_lifecycle_draft_to_active_and_back() {
        let v = vendor();
        let a = admin();
        let mut promo = created_by(&v);
        let id = promo.id_typed();

        promo.execute(&submit(&v, id)).unwrap();
        assert_eq!(promo.status(), Some(PromotionStatus::Pending));

        promo.execute(&approve(&a, id)).unwrap();
        let record = promo.record().unwrap();
        assert_eq!(record.status, PromotionStatus::Approved);
        assert_eq!(record.approval_comments.as_deref(), Some("looks good"));
        assert_eq!(record.updated_by, Some(a.user_id));

        promo.execute(&toggle(&v, id)).unwrap();
        assert_eq!(promo.status(), Some(PromotionStatus::Active));
        promo.execute(&toggle(&v, id)).unwrap();
        assert_eq!(promo.status(), Some(PromotionStatus::Inactive));
        promo.execute(&toggle(&v, id)).unwrap();
        assert_eq!(promo.status(), Some(PromotionStatus::Active));
        assert_eq!(promo.version(), 6);
    }

    #[test]
    fn reject_records_comments() {
        let v = vendor();
        let mut promo = created_by(&v);
        let id = promo.id_typed();
        promo.execute(&submit(&v, id)).unwrap();
        promo.execute(&reject(&admin(), id)).unwrap();
        let record = promo.record().unwrap();
        assert_eq!(record.status, PromotionStatus::Rejected);
        assert_eq!(record.approval_comments.as_deref(), Some("no"));
    }

    #[test]
    fn non_owner_is_forbidden_for_owner_operations() {
        let v = vendor();
        let other = vendor();
        let promo = created_by(&v);
        let id = promo.id_typed();

        for cmd in [
            submit(&other, id),
            update(&other, id, PromotionPatch::default()),
            delete(&other, id),
            toggle(&other, id),
        ] {
            let err = promo.handle(&cmd).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Forbidden, "{cmd:?}");
        }
    }

    #[test]
    fn non_admin_cannot_review_even_as_owner() {
        let v = vendor();
        let mut promo = created_by(&v);
        let id = promo.id_typed();
        promo.execute(&submit(&v, id)).unwrap();

        assert_eq!(promo.handle(&approve(&v, id)).unwrap_err().kind(), ErrorKind::Forbidden);
        assert_eq!(promo.handle(&reject(&v, id)).unwrap_err().kind(), ErrorKind::Forbidden);
    }

    #[test]
    fn second_approve_is_invalid_state() {
        let v = vendor();
        let a = admin();
        let mut promo = created_by(&v);
        let id = promo.id_typed();
        promo.execute(&submit(&v, id)).unwrap();
        promo.execute(&approve(&a, id)).unwrap();

        let err = promo.handle(&approve(&a, id)).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(msg) if msg.contains("pending")));
    }

    #[test]
    fn approve_from_draft_is_invalid_state() {
        let v = vendor();
        let promo = created_by(&v);
        let err = promo.handle(&approve(&admin(), promo.id_typed())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn submit_twice_is_invalid_state() {
        let v = vendor();
        let mut promo = created_by(&v);
        let id = promo.id_typed();
        promo.execute(&submit(&v, id)).unwrap();
        assert_eq!(promo.handle(&submit(&v, id)).unwrap_err().kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn toggle_requires_reviewed_promotion() {
        let v = vendor();
        let promo = created_by(&v);
        let err = promo.handle(&toggle(&v, promo.id_typed())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn update_patches_fields_and_keeps_creator() {
        let v = vendor();
        let mut promo = created_by(&v);
        let id = promo.id_typed();
        let patch = PromotionPatch {
            title: Some("Winter sale".to_string()),
            discount: Some(Some(35)),
            promo_code: Some("winter".to_string()),
            ..Default::default()
        };
        promo.execute(&update(&v, id, patch)).unwrap();

        let record = promo.record().unwrap();
        assert_eq!(record.details.title, "Winter sale");
        assert_eq!(record.details.discount, Some(35));
        assert_eq!(record.details.target_segments.as_deref(), Some("students"));
        assert_eq!(record.promo_code, "WINTER");
        assert_eq!(record.created_by, v.user_id);
        assert_eq!(record.status, PromotionStatus::Draft);
    }

    #[test]
    fn update_can_set_status_directly() {
        let v = vendor();
        let mut promo = created_by(&v);
        let id = promo.id_typed();
        let patch = PromotionPatch {
            status: Some(PromotionStatus::Pending),
            ..Default::default()
        };
        promo.execute(&update(&v, id, patch)).unwrap();
        assert_eq!(promo.status(), Some(PromotionStatus::Pending));
    }

    #[test]
    fn update_is_refused_once_approved_or_active() {
        let v = vendor();
        let a = admin();
        let mut promo = created_by(&v);
        let id = promo.id_typed();
        promo.execute(&submit(&v, id)).unwrap();
        promo.execute(&approve(&a, id)).unwrap();

        let err = promo.handle(&update(&v, id, PromotionPatch::default())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        promo.execute(&toggle(&v, id)).unwrap();
        let err = promo.handle(&update(&v, id, PromotionPatch::default())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        // Inactive promotions are editable again.
        promo.execute(&toggle(&v, id)).unwrap();
        assert!(promo.handle(&update(&v, id, PromotionPatch::default())).is_ok());
    }

    #[test]
    fn explicit_null_clears_optional_fields() {
        let v = vendor();
        let mut promo = created_by(&v);
        let id = promo.id_typed();
        let patch: PromotionPatch =
            serde_json::from_str(r#"{"discount": null, "description": null, "title": "Renamed"}"#).unwrap();
        assert_eq!(patch.discount, Some(None));
        assert_eq!(patch.terms, None);
        promo.execute(&update(&v, id, patch)).unwrap();

        let details = &promo.record().unwrap().details;
        assert_eq!(details.title, "Renamed");
        assert_eq!(details.discount, None);
        assert_eq!(details.description, None);
        assert_eq!(details.target_segments.as_deref(), Some("students"));
    }

    #[test]
    fn update_validates_merged_details() {
        let v = vendor();
        let promo = created_by(&v);
        let patch = PromotionPatch {
            discount: Some(Some(150)),
            ..Default::default()
        };
        let err = promo.handle(&update(&v, promo.id_typed(), patch)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn delete_removes_state() {
        let v = vendor();
        let mut promo = created_by(&v);
        let id = promo.id_typed();
        let events = promo.execute(&delete(&v, id)).unwrap();
        assert_eq!(events[0].event_type(), "promotions.promotion.deleted");
        assert!(!promo.exists());

        let err = promo.handle(&submit(&v, id)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn missing_promotion_is_not_found_before_role_check() {
        let id = PromotionId::new();
        let promo = Promotion::empty(id);
        let nobody = Actor::new(UserId::new(), None);
        assert_eq!(promo.handle(&approve(&nobody, id)).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn restore_round_trips_record() {
        let v = vendor();
        let mut promo = created_by(&v);
        promo.execute(&submit(&v, promo.id_typed())).unwrap();

        let record = promo.record().cloned().unwrap();
        let restored = Promotion::restore(record.clone());
        assert_eq!(restored.version(), promo.version());
        assert_eq!(restored.record(), Some(&record));
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Approved".parse::<PromotionStatus>().unwrap(), PromotionStatus::Approved);
        assert!("archived".parse::<PromotionStatus>().is_err());
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let v = vendor();
        let promo = created_by(&v);
        let before = promo.clone();
        let _ = promo.handle(&submit(&v, promo.id_typed())).unwrap();
        let _ = promo.handle(&approve(&admin(), promo.id_typed()));
        assert_eq!(promo, before);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Property: the aggregate agrees with the transition table
    // ─────────────────────────────────────────────────────────────────────

    #[derive(Debug, Clone, Copy)]
    enum Who {
        Owner,
        OtherVendor,
        Admin,
    }

    #[derive(Debug, Clone, Copy)]
    enum Op {
        Submit,
        Approve,
        Reject,
        Toggle,
        SetStatus(usize),
    }

    fn op_strategy() -> impl Strategy<Value = (Who, Op)> {
        let who = prop_oneof![Just(Who::Owner), Just(Who::OtherVendor), Just(Who::Admin)];
        let op = prop_oneof![
            Just(Op::Submit),
            Just(Op::Approve),
            Just(Op::Reject),
            Just(Op::Toggle),
            (0usize..6).prop_map(Op::SetStatus),
        ];
        (who, op)
    }

    /// Reference transition table: Some(next) if allowed, None if refused.
    fn expected(status: PromotionStatus, who: Who, op: Op) -> Option<PromotionStatus> {
        use PromotionStatus::*;
        let owner = matches!(who, Who::Owner);
        let admin = matches!(who, Who::Admin);
        match op {
            Op::Submit if owner && status == Draft => Some(Pending),
            Op::Approve if admin && status == Pending => Some(Approved),
            Op::Reject if admin && status == Pending => Some(Rejected),
            Op::Toggle if owner => match status {
                Approved | Inactive => Some(Active),
                Active => Some(Inactive),
                _ => None,
            },
            Op::SetStatus(i) if owner && status.is_editable() => Some(PromotionStatus::ALL[i]),
            _ => None,
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

        #[test]
        fn transitions_follow_table(ops in proptest::collection::vec(op_strategy(), 0..24)) {
            let owner = vendor();
            let other = vendor();
            let reviewer = admin();
            let mut promo = created_by(&owner);
            let id = promo.id_typed();

            for (who, op) in ops {
                let actor = match who {
                    Who::Owner => &owner,
                    Who::OtherVendor => &other,
                    Who::Admin => &reviewer,
                };
                let cmd = match op {
                    Op::Submit => submit(actor, id),
                    Op::Approve => approve(actor, id),
                    Op::Reject => reject(actor, id),
                    Op::Toggle => toggle(actor, id),
                    Op::SetStatus(i) => update(actor, id, PromotionPatch {
                        status: Some(PromotionStatus::ALL[i]),
                        ..Default::default()
                    }),
                };

                let before = promo.clone();
                let current = before.status().unwrap();
                match (promo.execute(&cmd), expected(current, who, op)) {
                    (Ok(events), Some(next)) => {
                        prop_assert_eq!(events.len(), 1);
                        prop_assert_eq!(promo.status(), Some(next));
                        prop_assert_eq!(promo.version(), before.version() + 1);
                    }
                    (Err(_), None) => prop_assert_eq!(&promo, &before),
                    (got, want) => prop_assert!(false, "status {current} {who:?} {op:?}: got {got:?}, want {want:?}"),
                }
            }
        }
    }
}
