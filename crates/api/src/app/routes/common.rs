use promoflow_auth::{PermissionGate, Principal};
use promoflow_infra::Services;

use crate::app::errors::ApiError;

/// Run `gate` for the caller before a handler does any work.
pub async fn require(services: &Services, principal: &Principal, gate: &PermissionGate) -> Result<(), ApiError> {
    let source = services.access.check(gate, principal).await?;
    tracing::debug!(
        user_id = %principal.user_id,
        module = gate.module(),
        permission = gate.permission(),
        ?source,
        "gate passed"
    );
    Ok(())
}
