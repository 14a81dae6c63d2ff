use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tessera_core::{AppResult, MemberId, RoleId, TeamId, TenantId};
use tessera_domain::{
    Condition, Effect, GrantSubject, MemberPermissionOverride, MemberRole, PermissionKey,
    ResourceGrant, ResourceRef, RolePermission, TeamMember, TeamRole,
};

/// Write port enforcing the uniqueness and lifecycle rules of the stores.
///
/// Every write is tenant-scoped. Revocations and deletions keep the row and
/// only stamp it, so past assignments stay auditable.
#[async_trait]
pub trait AuthorizationAdminRepository: Send + Sync {
    /// Creates or replaces the single edge for (role, permission).
    ///
    /// System roles are read-only templates and are rejected.
    async fn upsert_role_permission(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
        permission_key: &PermissionKey,
        effect: Effect,
        conditions: Option<Condition>,
    ) -> AppResult<RolePermission>;

    /// Assigns a role to a member, reactivating a revoked assignment.
    async fn assign_member_role(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
        role_id: RoleId,
        assigned_by: Option<MemberId>,
        at: DateTime<Utc>,
    ) -> AppResult<MemberRole>;

    /// Revokes an active member role assignment.
    async fn revoke_member_role(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
        role_id: RoleId,
        at: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Adds a member to a team, rejoining if they left before.
    async fn add_team_member(
        &self,
        tenant_id: TenantId,
        team_id: TeamId,
        member_id: MemberId,
        at: DateTime<Utc>,
    ) -> AppResult<TeamMember>;

    /// Records that a member left a team.
    async fn remove_team_member(
        &self,
        tenant_id: TenantId,
        team_id: TeamId,
        member_id: MemberId,
        at: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Assigns a role to a team, reactivating a revoked assignment.
    async fn assign_team_role(
        &self,
        tenant_id: TenantId,
        team_id: TeamId,
        role_id: RoleId,
        assigned_by: Option<MemberId>,
        at: DateTime<Utc>,
    ) -> AppResult<TeamRole>;

    /// Revokes an active team role assignment.
    async fn revoke_team_role(
        &self,
        tenant_id: TenantId,
        team_id: TeamId,
        role_id: RoleId,
        at: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Creates or replaces the single live override for (member, permission).
    async fn upsert_member_override(&self, value: &MemberPermissionOverride) -> AppResult<()>;

    /// Soft-deletes the live override for (member, permission).
    async fn delete_member_override(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
        permission_key: &PermissionKey,
        at: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Creates or replaces the single live grant for (subject, resource).
    async fn upsert_resource_grant(&self, grant: &ResourceGrant) -> AppResult<()>;

    /// Soft-deletes the live grant for (subject, resource).
    async fn delete_resource_grant(
        &self,
        tenant_id: TenantId,
        subject: GrantSubject,
        resource: &ResourceRef,
        at: DateTime<Utc>,
    ) -> AppResult<()>;
}
