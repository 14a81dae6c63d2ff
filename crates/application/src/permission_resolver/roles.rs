use std::collections::BTreeSet;

use tessera_core::{AppResult, RoleId};
use tessera_domain::{ConditionOutcome, DecisionReason, Effect, RolePermission};
use tracing::warn;

use super::{AuthorizeRequest, PermissionContext, PermissionResolver};

impl PermissionResolver {
    /// Aggregates direct and team-inherited roles.
    ///
    /// Returns `RoleDeny` if any applicable edge denies, `RoleAllow` if any
    /// applicable edge allows, and `None` when no edge applies.
    pub(super) async fn role_reason(
        &self,
        context: &PermissionContext,
        request: &AuthorizeRequest,
    ) -> AppResult<Option<DecisionReason>> {
        let role_ids = self
            .stores
            .memberships
            .active_roles_for(
                context.tenant_id,
                context.principal_id,
                &context.team_ids,
                context.evaluated_at,
            )
            .await?;

        if role_ids.is_empty() {
            return Ok(None);
        }

        let role_id_list: Vec<RoleId> = role_ids.iter().copied().collect();
        let edges = self
            .stores
            .roles
            .list_role_permissions(context.tenant_id, &role_id_list, &request.permission_key)
            .await?;

        let mut allowed = false;
        for edge in edges
            .iter()
            .filter(|edge| is_held_edge(edge, context, request, &role_ids))
        {
            if !ConditionOutcome::of(edge.conditions(), &request.attributes).is_satisfied() {
                continue;
            }

            match edge.effect() {
                Effect::Deny => return Ok(Some(DecisionReason::RoleDeny)),
                Effect::Allow => allowed = true,
            }
        }

        Ok(allowed.then_some(DecisionReason::RoleAllow))
    }
}

fn is_held_edge(
    edge: &RolePermission,
    context: &PermissionContext,
    request: &AuthorizeRequest,
    role_ids: &BTreeSet<RoleId>,
) -> bool {
    if !edge.role_scope().is_visible_to(context.tenant_id) {
        warn!(
            tenant_id = %context.tenant_id,
            role_id = %edge.role_id(),
            permission = %request.permission_key,
            "dropping role permission owned by another tenant"
        );
        return false;
    }

    if edge.conditions().is_some_and(|conditions| conditions.is_malformed()) {
        warn!(
            tenant_id = %context.tenant_id,
            role_id = %edge.role_id(),
            permission = %request.permission_key,
            "role permission carries malformed conditions"
        );
    }

    role_ids.contains(&edge.role_id()) && edge.permission_key() == &request.permission_key
}
