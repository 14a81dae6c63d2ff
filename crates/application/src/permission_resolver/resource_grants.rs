use tessera_core::AppResult;
use tessera_domain::{AccessLevel, ConditionOutcome, DecisionReason, ResourceRef};
use tracing::warn;

use super::{AuthorizeRequest, PermissionContext, PermissionResolver};

impl PermissionResolver {
    /// Checks object-level grants held by the principal or its teams.
    ///
    /// With no applicable grant the outcome is `InsufficientGrant` when a
    /// role tentatively allowed, otherwise `NoMatchingRule`.
    pub(super) async fn resource_reason(
        &self,
        context: &PermissionContext,
        request: &AuthorizeRequest,
        resource: &ResourceRef,
        required_level: AccessLevel,
        tentative_allow: bool,
    ) -> AppResult<DecisionReason> {
        let subjects = context.grant_subjects();
        let grants = self
            .stores
            .resource_grants
            .list_resource_grants(context.tenant_id, resource, &subjects)
            .await?;

        let granted_level = grants
            .iter()
            .filter(|grant| {
                if grant.tenant_id() != context.tenant_id {
                    warn!(
                        tenant_id = %context.tenant_id,
                        foreign_tenant_id = %grant.tenant_id(),
                        resource = %resource,
                        "dropping resource grant owned by another tenant"
                    );
                    return false;
                }

                if grant.conditions().is_some_and(|conditions| conditions.is_malformed()) {
                    warn!(
                        tenant_id = %context.tenant_id,
                        resource = %resource,
                        subject_type = grant.subject().kind(),
                        "resource grant carries malformed conditions"
                    );
                }

                !grant.is_deleted()
                    && grant.resource() == resource
                    && subjects.contains(&grant.subject())
                    && ConditionOutcome::of(grant.conditions(), &request.attributes).is_satisfied()
            })
            .map(|grant| grant.access_level())
            .max();

        Ok(match granted_level {
            Some(level) if level.satisfies(required_level) => DecisionReason::GrantConfirmed,
            Some(_) => DecisionReason::InsufficientGrant,
            None if tentative_allow => DecisionReason::InsufficientGrant,
            None => DecisionReason::NoMatchingRule,
        })
    }
}
