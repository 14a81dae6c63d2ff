use std::sync::Arc;

use chrono::Utc;
use tessera_core::{AppError, AppResult, MemberId, RoleId, TeamId, TenantId};
use tessera_domain::{
    Condition, Effect, GrantSubject, MemberPermissionOverride, MemberRole, PermissionKey,
    ResourceGrant, ResourceRef, RolePermission, TeamMember, TeamRole,
};
use tracing::{info, warn};

use crate::{AuthorizationAdminRepository, DecisionCache};


/// Application service for authorization writes.
///
/// Every write invalidates cached decisions before returning: changes
/// scoped to one member drop that member's decisions, changes that fan out
/// over roles, teams or resources drop the whole tenant.
#[derive(Clone)]
pub struct AuthorizationAdminService {
    repository: Arc<dyn AuthorizationAdminRepository>,
    decision_cache: Option<Arc<dyn DecisionCache>>,
}

enum Invalidation {
    Principal(TenantId, MemberId),
    Tenant(TenantId),
}

impl AuthorizationAdminService {
    /// Creates a new admin service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn AuthorizationAdminRepository>) -> Self {
        Self {
            repository,
            decision_cache: None,
        }
    }

    /// Invalidates the given decision cache on every write.
    #[must_use]
    pub fn with_decision_cache(mut self, decision_cache: Arc<dyn DecisionCache>) -> Self {
        self.decision_cache = Some(decision_cache);
        self
    }

    /// Creates or replaces the edge for (role, permission).
    pub async fn set_role_permission(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
        permission_key: &PermissionKey,
        effect: Effect,
        conditions: Option<Condition>,
    ) -> AppResult<RolePermission> {
        ensure_well_formed(conditions.as_ref())?;

        let edge = self
            .repository
            .upsert_role_permission(tenant_id, role_id, permission_key, effect, conditions)
            .await?;

        info!(
            tenant_id = %tenant_id,
            role_id = %role_id,
            permission = %permission_key,
            effect = effect.as_str(),
            "role permission set"
        );
        self.invalidate(Invalidation::Tenant(tenant_id)).await;

        Ok(edge)
    }

    /// Assigns a role directly to a member.
    pub async fn assign_member_role(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
        role_id: RoleId,
        assigned_by: Option<MemberId>,
    ) -> AppResult<MemberRole> {
        let assignment = self
            .repository
            .assign_member_role(tenant_id, member_id, role_id, assigned_by, Utc::now())
            .await?;

        self.invalidate(Invalidation::Principal(tenant_id, member_id))
            .await;

        Ok(assignment)
    }

    /// Revokes a direct role assignment.
    pub async fn revoke_member_role(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
        role_id: RoleId,
    ) -> AppResult<()> {
        self.repository
            .revoke_member_role(tenant_id, member_id, role_id, Utc::now())
            .await?;

        info!(
            tenant_id = %tenant_id,
            member_id = %member_id,
            role_id = %role_id,
            "member role revoked"
        );
        self.invalidate(Invalidation::Principal(tenant_id, member_id))
            .await;

        Ok(())
    }

    /// Adds a member to a team.
    pub async fn add_team_member(
        &self,
        tenant_id: TenantId,
        team_id: TeamId,
        member_id: MemberId,
    ) -> AppResult<TeamMember> {
        let membership = self
            .repository
            .add_team_member(tenant_id, team_id, member_id, Utc::now())
            .await?;

        self.invalidate(Invalidation::Principal(tenant_id, member_id))
            .await;

        Ok(membership)
    }

    /// Records that a member left a team.
    pub async fn remove_team_member(
        &self,
        tenant_id: TenantId,
        team_id: TeamId,
        member_id: MemberId,
    ) -> AppResult<()> {
        self.repository
            .remove_team_member(tenant_id, team_id, member_id, Utc::now())
            .await?;

        self.invalidate(Invalidation::Principal(tenant_id, member_id))
            .await;

        Ok(())
    }

    /// Assigns a role to every member of a team.
    pub async fn assign_team_role(
        &self,
        tenant_id: TenantId,
        team_id: TeamId,
        role_id: RoleId,
        assigned_by: Option<MemberId>,
    ) -> AppResult<TeamRole> {
        let assignment = self
            .repository
            .assign_team_role(tenant_id, team_id, role_id, assigned_by, Utc::now())
            .await?;

        self.invalidate(Invalidation::Tenant(tenant_id)).await;

        Ok(assignment)
    }

    /// Revokes a team role assignment.
    pub async fn revoke_team_role(
        &self,
        tenant_id: TenantId,
        team_id: TeamId,
        role_id: RoleId,
    ) -> AppResult<()> {
        self.repository
            .revoke_team_role(tenant_id, team_id, role_id, Utc::now())
            .await?;

        info!(
            tenant_id = %tenant_id,
            team_id = %team_id,
            role_id = %role_id,
            "team role revoked"
        );
        self.invalidate(Invalidation::Tenant(tenant_id)).await;

        Ok(())
    }

    /// Creates or replaces a member override.
    pub async fn set_member_override(&self, value: MemberPermissionOverride) -> AppResult<()> {
        ensure_well_formed(value.conditions())?;
        if value.is_deleted() {
            return Err(AppError::Validation(
                "cannot store an already deleted member override".to_owned(),
            ));
        }

        self.repository.upsert_member_override(&value).await?;

        info!(
            tenant_id = %value.tenant_id(),
            member_id = %value.member_id(),
            permission = %value.permission_key(),
            effect = value.effect().as_str(),
            "member override set"
        );
        self.invalidate(Invalidation::Principal(value.tenant_id(), value.member_id()))
            .await;

        Ok(())
    }

    /// Soft-deletes a member override.
    pub async fn delete_member_override(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
        permission_key: &PermissionKey,
    ) -> AppResult<()> {
        self.repository
            .delete_member_override(tenant_id, member_id, permission_key, Utc::now())
            .await?;

        self.invalidate(Invalidation::Principal(tenant_id, member_id))
            .await;

        Ok(())
    }

    /// Creates or replaces a resource grant.
    pub async fn set_resource_grant(&self, grant: ResourceGrant) -> AppResult<()> {
        ensure_well_formed(grant.conditions())?;
        if grant.is_deleted() {
            return Err(AppError::Validation(
                "cannot store an already deleted resource grant".to_owned(),
            ));
        }

        self.repository.upsert_resource_grant(&grant).await?;

        self.invalidate(Invalidation::Tenant(grant.tenant_id())).await;

        Ok(())
    }

    /// Soft-deletes a resource grant.
    pub async fn delete_resource_grant(
        &self,
        tenant_id: TenantId,
        subject: GrantSubject,
        resource: &ResourceRef,
    ) -> AppResult<()> {
        self.repository
            .delete_resource_grant(tenant_id, subject, resource, Utc::now())
            .await?;

        self.invalidate(Invalidation::Tenant(tenant_id)).await;

        Ok(())
    }

    async fn invalidate(&self, invalidation: Invalidation) {
        let Some(cache) = self.decision_cache.as_ref() else {
            return;
        };

        let (tenant_id, result) = match invalidation {
            Invalidation::Principal(tenant_id, member_id) => (
                tenant_id,
                cache.invalidate_principal(tenant_id, member_id).await,
            ),
            Invalidation::Tenant(tenant_id) => {
                (tenant_id, cache.invalidate_tenant(tenant_id).await)
            }
        };

        // The write already committed; stale entries expire with their ttl.
        if let Err(error) = result {
            warn!(
                tenant_id = %tenant_id,
                error = %error,
                "decision cache invalidation failed"
            );
        }
    }
}

fn ensure_well_formed(conditions: Option<&Condition>) -> AppResult<()> {
    match conditions {
        Some(conditions) if conditions.is_malformed() => Err(AppError::Validation(format!(
            "conditions are malformed: {}",
            conditions.to_json()
        ))),
        _ => Ok(()),
    }
}
