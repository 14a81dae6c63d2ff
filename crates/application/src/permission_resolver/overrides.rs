use tessera_core::AppResult;
use tessera_domain::{ConditionOutcome, DecisionReason, Effect};
use tracing::warn;

use super::{AuthorizeRequest, PermissionContext, PermissionResolver};

impl PermissionResolver {
    /// Applies the member override tier. `None` means the tier did not decide.
    pub(super) async fn override_reason(
        &self,
        context: &PermissionContext,
        request: &AuthorizeRequest,
    ) -> AppResult<Option<DecisionReason>> {
        let Some(member_override) = self
            .stores
            .overrides
            .find_member_override(context.tenant_id, context.principal_id, &request.permission_key)
            .await?
        else {
            return Ok(None);
        };

        if member_override.tenant_id() != context.tenant_id {
            warn!(
                tenant_id = %context.tenant_id,
                foreign_tenant_id = %member_override.tenant_id(),
                permission = %request.permission_key,
                "dropping member override owned by another tenant"
            );
            return Ok(None);
        }

        if member_override.is_deleted()
            || member_override.member_id() != context.principal_id
            || member_override.permission_key() != &request.permission_key
        {
            return Ok(None);
        }

        if let Some(conditions) = member_override.conditions()
            && conditions.is_malformed()
        {
            warn!(
                tenant_id = %context.tenant_id,
                principal_id = %context.principal_id,
                permission = %request.permission_key,
                "member override carries malformed conditions"
            );
        }

        let outcome = ConditionOutcome::of(member_override.conditions(), &request.attributes);
        // A deny override stands unless its condition definitively fails.
        let applies = match member_override.effect() {
            Effect::Allow => outcome.is_satisfied(),
            Effect::Deny => outcome != ConditionOutcome::Unsatisfied,
        };
        if !applies {
            return Ok(None);
        }

        Ok(Some(match member_override.effect() {
            Effect::Allow => DecisionReason::OverrideAllow,
            Effect::Deny => DecisionReason::OverrideDeny,
        }))
    }
}
