use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tessera_core::{AppResult, MemberId, RoleId, TeamId, TenantId};
use tessera_domain::{
    GrantSubject, MemberPermissionOverride, MemberRole, PermissionDefinition, PermissionKey,
    Principal, ResourceGrant, ResourceRef, RolePermission, TeamMember, TeamRole,
};
use tracing::warn;

/// Read port for the global permission catalog.
#[async_trait]
pub trait PermissionCatalog: Send + Sync {
    /// Finds a catalog entry, active or not.
    async fn find_permission(&self, key: &PermissionKey) -> AppResult<Option<PermissionDefinition>>;
}

/// Read port for role to permission edges.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Lists edges for `permission_key` held by any of `role_ids`.
    ///
    /// Only active, non-deleted roles owned by `tenant_id` or shared system
    /// templates are returned.
    async fn list_role_permissions(
        &self,
        tenant_id: TenantId,
        role_ids: &[RoleId],
        permission_key: &PermissionKey,
    ) -> AppResult<Vec<RolePermission>>;
}

/// Read port for principals, their role assignments and team memberships.
#[async_trait]
pub trait MembershipGraph: Send + Sync {
    /// Finds a principal by member id across tenants.
    ///
    /// This is the only lookup not filtered by tenant, so the resolver can
    /// tell a tenant mismatch apart from an unknown member.
    async fn find_principal(&self, member_id: MemberId) -> AppResult<Option<Principal>>;

    /// Lists direct role assignments, including revoked ones.
    async fn list_member_roles(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
    ) -> AppResult<Vec<MemberRole>>;

    /// Lists memberships in non-deleted teams, including ones already left.
    async fn list_team_memberships(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
    ) -> AppResult<Vec<TeamMember>>;

    /// Lists role assignments of non-deleted teams, including revoked ones.
    async fn list_team_roles(
        &self,
        tenant_id: TenantId,
        team_ids: &[TeamId],
    ) -> AppResult<Vec<TeamRole>>;

    /// Returns the teams the member actively belongs to at `now`.
    async fn active_teams_for(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
        now: DateTime<Utc>,
    ) -> AppResult<BTreeSet<TeamId>> {
        let memberships = self.list_team_memberships(tenant_id, member_id).await?;

        Ok(memberships
            .into_iter()
            .filter(|membership| {
                if membership.tenant_id != tenant_id {
                    warn!(
                        tenant_id = %tenant_id,
                        foreign_tenant_id = %membership.tenant_id,
                        team_id = %membership.team_id,
                        "dropping team membership owned by another tenant"
                    );
                    return false;
                }

                membership.member_id == member_id && membership.lifecycle.is_active_at(now)
            })
            .map(|membership| membership.team_id)
            .collect())
    }

    /// Returns the union of direct roles and roles inherited from `team_ids`.
    async fn active_roles_for(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
        team_ids: &BTreeSet<TeamId>,
        now: DateTime<Utc>,
    ) -> AppResult<BTreeSet<RoleId>> {
        let mut role_ids: BTreeSet<RoleId> = self
            .list_member_roles(tenant_id, member_id)
            .await?
            .into_iter()
            .filter(|assignment| {
                if assignment.tenant_id != tenant_id {
                    warn!(
                        tenant_id = %tenant_id,
                        foreign_tenant_id = %assignment.tenant_id,
                        role_id = %assignment.role_id,
                        "dropping member role owned by another tenant"
                    );
                    return false;
                }

                assignment.member_id == member_id && assignment.lifecycle.is_active_at(now)
            })
            .map(|assignment| assignment.role_id)
            .collect();

        if team_ids.is_empty() {
            return Ok(role_ids);
        }

        let team_id_list: Vec<TeamId> = team_ids.iter().copied().collect();
        let team_roles = self.list_team_roles(tenant_id, &team_id_list).await?;

        role_ids.extend(
            team_roles
                .into_iter()
                .filter(|assignment| {
                    if assignment.tenant_id != tenant_id {
                        warn!(
                            tenant_id = %tenant_id,
                            foreign_tenant_id = %assignment.tenant_id,
                            team_id = %assignment.team_id,
                            "dropping team role owned by another tenant"
                        );
                        return false;
                    }

                    team_ids.contains(&assignment.team_id) && assignment.lifecycle.is_active_at(now)
                })
                .map(|assignment| assignment.role_id),
        );

        Ok(role_ids)
    }
}

/// Read port for member permission overrides.
#[async_trait]
pub trait OverrideStore: Send + Sync {
    /// Finds the non-deleted override for one member and permission.
    async fn find_member_override(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
        permission_key: &PermissionKey,
    ) -> AppResult<Option<MemberPermissionOverride>>;
}

/// Read port for object-level resource grants.
#[async_trait]
pub trait ResourceGrantStore: Send + Sync {
    /// Lists non-deleted grants on `resource` held by any of `subjects`.
    async fn list_resource_grants(
        &self,
        tenant_id: TenantId,
        resource: &ResourceRef,
        subjects: &[GrantSubject],
    ) -> AppResult<Vec<ResourceGrant>>;
}
