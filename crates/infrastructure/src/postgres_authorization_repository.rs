use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use tessera_application::{
    AuthorizationAdminRepository, MembershipGraph, OverrideStore, PermissionCatalog,
    ResourceGrantStore, RoleStore,
};
use tessera_core::{AppError, AppResult, MemberId, RoleId, TeamId, TenantId};
use tessera_domain::{
    AccessLevel, Condition, Effect, GrantSubject, Lifecycle, MemberPermissionOverride,
    MemberRole, PermissionDefinition, PermissionKey, Principal, ResourceGrant, ResourceRef,
    RolePermission, RoleScope, TeamMember, TeamRole,
};

mod admin;
mod catalog;
mod membership;
mod overrides;
mod resource_grants;
mod roles;


/// PostgreSQL-backed repository for every authorization store port.
///
/// Every query filters by tenant and drops rows of soft-deleted tenants.
#[derive(Clone)]
pub struct PostgresAuthorizationRepository {
    pool: PgPool,
}

impl PostgresAuthorizationRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PermissionRow {
    key: String,
    name: String,
    description: Option<String>,
    is_active: bool,
}

#[derive(Debug, FromRow)]
struct RolePermissionRow {
    role_id: uuid::Uuid,
    role_tenant_id: Option<uuid::Uuid>,
    permission_key: String,
    effect: String,
    conditions: Option<serde_json::Value>,
}

#[derive(Debug, FromRow)]
struct PrincipalRow {
    member_id: uuid::Uuid,
    tenant_id: uuid::Uuid,
    is_active: bool,
}

#[derive(Debug, FromRow)]
struct MemberRoleRow {
    tenant_id: uuid::Uuid,
    membership_id: uuid::Uuid,
    role_id: uuid::Uuid,
    assigned_by: Option<uuid::Uuid>,
    is_active: bool,
    assigned_at: DateTime<Utc>,
    revoked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct TeamMemberRow {
    tenant_id: uuid::Uuid,
    team_id: uuid::Uuid,
    membership_id: uuid::Uuid,
    is_active: bool,
    joined_at: DateTime<Utc>,
    left_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct TeamRoleRow {
    tenant_id: uuid::Uuid,
    team_id: uuid::Uuid,
    role_id: uuid::Uuid,
    assigned_by: Option<uuid::Uuid>,
    is_active: bool,
    assigned_at: DateTime<Utc>,
    revoked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct OverrideRow {
    tenant_id: uuid::Uuid,
    membership_id: uuid::Uuid,
    permission_key: String,
    effect: String,
    conditions: Option<serde_json::Value>,
}

#[derive(Debug, FromRow)]
struct ResourceGrantRow {
    tenant_id: uuid::Uuid,
    subject_type: String,
    subject_id: uuid::Uuid,
    resource_type: String,
    resource_id: String,
    access_level: String,
    conditions: Option<serde_json::Value>,
}

impl TryFrom<PermissionRow> for PermissionDefinition {
    type Error = AppError;

    fn try_from(row: PermissionRow) -> Result<Self, Self::Error> {
        PermissionDefinition::new(
            decode_permission_key(row.key.as_str())?,
            row.name,
            row.description,
            row.is_active,
        )
        .map_err(|error| AppError::Internal(format!("invalid permission row: {error}")))
    }
}

impl TryFrom<RolePermissionRow> for RolePermission {
    type Error = AppError;

    fn try_from(row: RolePermissionRow) -> Result<Self, Self::Error> {
        Ok(RolePermission::new(
            RoleId::from_uuid(row.role_id),
            RoleScope::from_tenant_column(row.role_tenant_id.map(TenantId::from_uuid)),
            decode_permission_key(row.permission_key.as_str())?,
            decode_effect(row.effect.as_str())?,
            decode_conditions(row.conditions.as_ref()),
        ))
    }
}

impl From<PrincipalRow> for Principal {
    fn from(row: PrincipalRow) -> Self {
        Self {
            member_id: MemberId::from_uuid(row.member_id),
            tenant_id: TenantId::from_uuid(row.tenant_id),
            is_active: row.is_active,
        }
    }
}

impl From<MemberRoleRow> for MemberRole {
    fn from(row: MemberRoleRow) -> Self {
        Self {
            tenant_id: TenantId::from_uuid(row.tenant_id),
            member_id: MemberId::from_uuid(row.membership_id),
            role_id: RoleId::from_uuid(row.role_id),
            assigned_by: row.assigned_by.map(MemberId::from_uuid),
            lifecycle: Lifecycle::from_parts(row.assigned_at, row.revoked_at, row.is_active),
        }
    }
}

impl From<TeamMemberRow> for TeamMember {
    fn from(row: TeamMemberRow) -> Self {
        Self {
            tenant_id: TenantId::from_uuid(row.tenant_id),
            team_id: TeamId::from_uuid(row.team_id),
            member_id: MemberId::from_uuid(row.membership_id),
            lifecycle: Lifecycle::from_parts(row.joined_at, row.left_at, row.is_active),
        }
    }
}

impl From<TeamRoleRow> for TeamRole {
    fn from(row: TeamRoleRow) -> Self {
        Self {
            tenant_id: TenantId::from_uuid(row.tenant_id),
            team_id: TeamId::from_uuid(row.team_id),
            role_id: RoleId::from_uuid(row.role_id),
            assigned_by: row.assigned_by.map(MemberId::from_uuid),
            lifecycle: Lifecycle::from_parts(row.assigned_at, row.revoked_at, row.is_active),
        }
    }
}

impl TryFrom<OverrideRow> for MemberPermissionOverride {
    type Error = AppError;

    fn try_from(row: OverrideRow) -> Result<Self, Self::Error> {
        Ok(MemberPermissionOverride::new(
            TenantId::from_uuid(row.tenant_id),
            MemberId::from_uuid(row.membership_id),
            decode_permission_key(row.permission_key.as_str())?,
            decode_effect(row.effect.as_str())?,
            decode_conditions(row.conditions.as_ref()),
        ))
    }
}

impl TryFrom<ResourceGrantRow> for ResourceGrant {
    type Error = AppError;

    fn try_from(row: ResourceGrantRow) -> Result<Self, Self::Error> {
        let subject = GrantSubject::from_parts(row.subject_type.as_str(), row.subject_id)
            .map_err(|error| AppError::Internal(format!("invalid resource grant row: {error}")))?;
        let resource = ResourceRef::new(row.resource_type, row.resource_id)
            .map_err(|error| AppError::Internal(format!("invalid resource grant row: {error}")))?;
        let access_level = AccessLevel::from_str(row.access_level.as_str())
            .map_err(|error| AppError::Internal(format!("invalid resource grant row: {error}")))?;

        Ok(ResourceGrant::new(
            TenantId::from_uuid(row.tenant_id),
            subject,
            resource,
            access_level,
            decode_conditions(row.conditions.as_ref()),
        ))
    }
}

fn decode_permission_key(value: &str) -> AppResult<PermissionKey> {
    PermissionKey::new(value).map_err(|error| {
        AppError::Internal(format!("invalid stored permission key '{value}': {error}"))
    })
}

fn decode_effect(value: &str) -> AppResult<Effect> {
    Effect::from_str(value)
        .map_err(|error| AppError::Internal(format!("invalid stored effect '{value}': {error}")))
}

fn decode_conditions(value: Option<&serde_json::Value>) -> Option<Condition> {
    value.and_then(Condition::from_json)
}

fn encode_conditions(conditions: Option<&Condition>) -> Option<serde_json::Value> {
    conditions.map(Condition::to_json)
}

fn read_error(context: &str, error: sqlx::Error) -> AppError {
    AppError::StoreUnavailable(format!("failed to {context}: {error}"))
}

fn write_error(context: &str, error: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(database_error) = &error {
        match database_error.code().as_deref() {
            Some("23505") => {
                return AppError::Conflict(format!("{context}: {}", database_error.message()));
            }
            Some("23503") => {
                return AppError::NotFound(format!(
                    "{context}: referenced row does not exist in this tenant"
                ));
            }
            _ => {}
        }
    }

    AppError::StoreUnavailable(format!("failed to {context}: {error}"))
}

#[async_trait]
impl PermissionCatalog for PostgresAuthorizationRepository {
    async fn find_permission(&self, key: &PermissionKey) -> AppResult<Option<PermissionDefinition>> {
        self.find_permission_impl(key).await
    }
}

#[async_trait]
impl RoleStore for PostgresAuthorizationRepository {
    async fn list_role_permissions(
        &self,
        tenant_id: TenantId,
        role_ids: &[RoleId],
        permission_key: &PermissionKey,
    ) -> AppResult<Vec<RolePermission>> {
        self.list_role_permissions_impl(tenant_id, role_ids, permission_key)
            .await
    }
}

#[async_trait]
impl MembershipGraph for PostgresAuthorizationRepository {
    async fn find_principal(&self, member_id: MemberId) -> AppResult<Option<Principal>> {
        self.find_principal_impl(member_id).await
    }

    async fn list_member_roles(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
    ) -> AppResult<Vec<MemberRole>> {
        self.list_member_roles_impl(tenant_id, member_id).await
    }

    async fn list_team_memberships(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
    ) -> AppResult<Vec<TeamMember>> {
        self.list_team_memberships_impl(tenant_id, member_id).await
    }

    async fn list_team_roles(
        &self,
        tenant_id: TenantId,
        team_ids: &[TeamId],
    ) -> AppResult<Vec<TeamRole>> {
        self.list_team_roles_impl(tenant_id, team_ids).await
    }
}

#[async_trait]
impl OverrideStore for PostgresAuthorizationRepository {
    async fn find_member_override(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
        permission_key: &PermissionKey,
    ) -> AppResult<Option<MemberPermissionOverride>> {
        self.find_member_override_impl(tenant_id, member_id, permission_key)
            .await
    }
}

#[async_trait]
impl ResourceGrantStore for PostgresAuthorizationRepository {
    async fn list_resource_grants(
        &self,
        tenant_id: TenantId,
        resource: &ResourceRef,
        subjects: &[GrantSubject],
    ) -> AppResult<Vec<ResourceGrant>> {
        self.list_resource_grants_impl(tenant_id, resource, subjects)
            .await
    }
}

#[async_trait]
impl AuthorizationAdminRepository for PostgresAuthorizationRepository {
    async fn upsert_role_permission(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
        permission_key: &PermissionKey,
        effect: Effect,
        conditions: Option<Condition>,
    ) -> AppResult<RolePermission> {
        self.upsert_role_permission_impl(tenant_id, role_id, permission_key, effect, conditions)
            .await
    }

    async fn assign_member_role(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
        role_id: RoleId,
        assigned_by: Option<MemberId>,
        at: DateTime<Utc>,
    ) -> AppResult<MemberRole> {
        self.assign_member_role_impl(tenant_id, member_id, role_id, assigned_by, at)
            .await
    }

    async fn revoke_member_role(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
        role_id: RoleId,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        self.revoke_member_role_impl(tenant_id, member_id, role_id, at)
            .await
    }

    async fn add_team_member(
        &self,
        tenant_id: TenantId,
        team_id: TeamId,
        member_id: MemberId,
        at: DateTime<Utc>,
    ) -> AppResult<TeamMember> {
        self.add_team_member_impl(tenant_id, team_id, member_id, at)
            .await
    }

    async fn remove_team_member(
        &self,
        tenant_id: TenantId,
        team_id: TeamId,
        member_id: MemberId,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        self.remove_team_member_impl(tenant_id, team_id, member_id, at)
            .await
    }

    async fn assign_team_role(
        &self,
        tenant_id: TenantId,
        team_id: TeamId,
        role_id: RoleId,
        assigned_by: Option<MemberId>,
        at: DateTime<Utc>,
    ) -> AppResult<TeamRole> {
        self.assign_team_role_impl(tenant_id, team_id, role_id, assigned_by, at)
            .await
    }

    async fn revoke_team_role(
        &self,
        tenant_id: TenantId,
        team_id: TeamId,
        role_id: RoleId,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        self.revoke_team_role_impl(tenant_id, team_id, role_id, at)
            .await
    }

    async fn upsert_member_override(&self, value: &MemberPermissionOverride) -> AppResult<()> {
        self.upsert_member_override_impl(value).await
    }

    async fn delete_member_override(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
        permission_key: &PermissionKey,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        self.delete_member_override_impl(tenant_id, member_id, permission_key, at)
            .await
    }

    async fn upsert_resource_grant(&self, grant: &ResourceGrant) -> AppResult<()> {
        self.upsert_resource_grant_impl(grant).await
    }

    async fn delete_resource_grant(
        &self,
        tenant_id: TenantId,
        subject: GrantSubject,
        resource: &ResourceRef,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        self.delete_resource_grant_impl(tenant_id, subject, resource, at)
            .await
    }
}
