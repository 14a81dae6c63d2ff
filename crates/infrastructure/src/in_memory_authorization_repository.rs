use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tessera_application::{
    AuthorizationAdminRepository, MembershipGraph, OverrideStore, PermissionCatalog,
    ResourceGrantStore, RoleStore,
};
use tessera_core::{AppError, AppResult, MemberId, RoleId, TeamId, TenantId};
use tessera_domain::{
    Condition, Effect, GrantSubject, Lifecycle, MemberPermissionOverride, MemberRole,
    PermissionDefinition, PermissionKey, Principal, ResourceGrant, ResourceRef, RoleDefinition,
    RolePermission, Team, TeamMember, TeamRole,
};
use tokio::sync::RwLock;

#[cfg(test)]
mod tests;

#[derive(Debug, Default)]
struct AuthorizationState {
    deleted_tenants: HashSet<TenantId>,
    permissions: HashMap<PermissionKey, PermissionDefinition>,
    roles: HashMap<RoleId, RoleDefinition>,
    principals: HashMap<MemberId, Principal>,
    teams: HashMap<TeamId, Team>,
    role_permissions: HashMap<(RoleId, PermissionKey), RolePermission>,
    member_roles: HashMap<(MemberId, RoleId), MemberRole>,
    team_members: HashMap<(TeamId, MemberId), TeamMember>,
    team_roles: HashMap<(TeamId, RoleId), TeamRole>,
    overrides: HashMap<(MemberId, PermissionKey), MemberPermissionOverride>,
    resource_grants: HashMap<(TenantId, GrantSubject, ResourceRef), ResourceGrant>,
}

impl AuthorizationState {
    fn tenant_is_live(&self, tenant_id: TenantId) -> bool {
        !self.deleted_tenants.contains(&tenant_id)
    }

    fn member_in_tenant(&self, tenant_id: TenantId, member_id: MemberId) -> AppResult<()> {
        match self.principals.get(&member_id) {
            Some(principal) if principal.tenant_id == tenant_id => Ok(()),
            _ => Err(AppError::NotFound(format!(
                "member '{member_id}' does not exist for tenant '{tenant_id}'"
            ))),
        }
    }

    fn team_in_tenant(&self, tenant_id: TenantId, team_id: TeamId) -> AppResult<()> {
        match self.teams.get(&team_id) {
            Some(team) if team.tenant_id() == tenant_id => Ok(()),
            _ => Err(AppError::NotFound(format!(
                "team '{team_id}' does not exist for tenant '{tenant_id}'"
            ))),
        }
    }

    fn visible_role(&self, tenant_id: TenantId, role_id: RoleId) -> AppResult<&RoleDefinition> {
        self.roles
            .get(&role_id)
            .filter(|role| role.scope().is_visible_to(tenant_id) && role.deleted_at().is_none())
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "role '{role_id}' does not exist for tenant '{tenant_id}'"
                ))
            })
    }
}

/// In-memory implementation of every authorization store port.
///
/// Mirrors the tenant filtering and uniqueness rules of the PostgreSQL
/// adapter. Catalog entries, roles, members and teams are seeded directly.
#[derive(Debug, Default)]
pub struct InMemoryAuthorizationRepository {
    state: RwLock<AuthorizationState>,
}

impl InMemoryAuthorizationRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a catalog entry.
    pub async fn insert_permission(&self, permission: PermissionDefinition) {
        self.state
            .write()
            .await
            .permissions
            .insert(permission.key().clone(), permission);
    }

    /// Adds or replaces a role definition.
    pub async fn insert_role(&self, role: RoleDefinition) {
        self.state.write().await.roles.insert(role.id(), role);
    }

    /// Adds or replaces a tenant member.
    pub async fn insert_principal(&self, principal: Principal) {
        self.state
            .write()
            .await
            .principals
            .insert(principal.member_id, principal);
    }

    /// Adds or replaces a team.
    pub async fn insert_team(&self, team: Team) {
        self.state.write().await.teams.insert(team.id(), team);
    }

    /// Soft-deletes a tenant. Its data stays but no longer takes part in
    /// decisions.
    pub async fn delete_tenant(&self, tenant_id: TenantId) {
        self.state.write().await.deleted_tenants.insert(tenant_id);
    }
}

#[async_trait]
impl PermissionCatalog for InMemoryAuthorizationRepository {
    async fn find_permission(&self, key: &PermissionKey) -> AppResult<Option<PermissionDefinition>> {
        Ok(self.state.read().await.permissions.get(key).cloned())
    }
}

#[async_trait]
impl RoleStore for InMemoryAuthorizationRepository {
    async fn list_role_permissions(
        &self,
        tenant_id: TenantId,
        role_ids: &[RoleId],
        permission_key: &PermissionKey,
    ) -> AppResult<Vec<RolePermission>> {
        let state = self.state.read().await;
        if !state.tenant_is_live(tenant_id) {
            return Ok(Vec::new());
        }

        Ok(role_ids
            .iter()
            .filter(|role_id| {
                state.roles.get(role_id).is_some_and(|role| {
                    role.is_live() && role.scope().is_visible_to(tenant_id)
                })
            })
            .filter_map(|role_id| {
                state
                    .role_permissions
                    .get(&(*role_id, permission_key.clone()))
                    .cloned()
            })
            .collect())
    }
}

#[async_trait]
impl MembershipGraph for InMemoryAuthorizationRepository {
    async fn find_principal(&self, member_id: MemberId) -> AppResult<Option<Principal>> {
        let state = self.state.read().await;

        Ok(state.principals.get(&member_id).map(|principal| Principal {
            is_active: principal.is_active && state.tenant_is_live(principal.tenant_id),
            ..*principal
        }))
    }

    async fn list_member_roles(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
    ) -> AppResult<Vec<MemberRole>> {
        let state = self.state.read().await;
        if !state.tenant_is_live(tenant_id) {
            return Ok(Vec::new());
        }

        Ok(state
            .member_roles
            .values()
            .filter(|assignment| {
                assignment.tenant_id == tenant_id && assignment.member_id == member_id
            })
            .copied()
            .collect())
    }

    async fn list_team_memberships(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
    ) -> AppResult<Vec<TeamMember>> {
        let state = self.state.read().await;
        if !state.tenant_is_live(tenant_id) {
            return Ok(Vec::new());
        }

        Ok(state
            .team_members
            .values()
            .filter(|membership| {
                membership.tenant_id == tenant_id
                    && membership.member_id == member_id
                    && state
                        .teams
                        .get(&membership.team_id)
                        .is_some_and(|team| !team.is_deleted())
            })
            .copied()
            .collect())
    }

    async fn list_team_roles(
        &self,
        tenant_id: TenantId,
        team_ids: &[TeamId],
    ) -> AppResult<Vec<TeamRole>> {
        let state = self.state.read().await;
        if !state.tenant_is_live(tenant_id) {
            return Ok(Vec::new());
        }

        Ok(state
            .team_roles
            .values()
            .filter(|assignment| {
                assignment.tenant_id == tenant_id
                    && team_ids.contains(&assignment.team_id)
                    && state
                        .teams
                        .get(&assignment.team_id)
                        .is_some_and(|team| !team.is_deleted())
            })
            .copied()
            .collect())
    }
}

#[async_trait]
impl OverrideStore for InMemoryAuthorizationRepository {
    async fn find_member_override(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
        permission_key: &PermissionKey,
    ) -> AppResult<Option<MemberPermissionOverride>> {
        let state = self.state.read().await;
        if !state.tenant_is_live(tenant_id) {
            return Ok(None);
        }

        Ok(state
            .overrides
            .get(&(member_id, permission_key.clone()))
            .filter(|value| value.tenant_id() == tenant_id && !value.is_deleted())
            .cloned())
    }
}

#[async_trait]
impl ResourceGrantStore for InMemoryAuthorizationRepository {
    async fn list_resource_grants(
        &self,
        tenant_id: TenantId,
        resource: &ResourceRef,
        subjects: &[GrantSubject],
    ) -> AppResult<Vec<ResourceGrant>> {
        let state = self.state.read().await;
        if !state.tenant_is_live(tenant_id) {
            return Ok(Vec::new());
        }

        Ok(subjects
            .iter()
            .filter_map(|subject| {
                state
                    .resource_grants
                    .get(&(tenant_id, *subject, resource.clone()))
            })
            .filter(|grant| !grant.is_deleted())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AuthorizationAdminRepository for InMemoryAuthorizationRepository {
    async fn upsert_role_permission(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
        permission_key: &PermissionKey,
        effect: Effect,
        conditions: Option<Condition>,
    ) -> AppResult<RolePermission> {
        let mut state = self.state.write().await;
        let role = state.visible_role(tenant_id, role_id)?;
        if role.is_system() {
            return Err(AppError::Forbidden(format!(
                "system role '{role_id}' is a read-only template"
            )));
        }
        if !state.permissions.contains_key(permission_key) {
            return Err(AppError::NotFound(format!(
                "permission '{permission_key}' is not in the catalog"
            )));
        }

        let edge = RolePermission::new(
            role_id,
            role.scope(),
            permission_key.clone(),
            effect,
            conditions,
        );
        state
            .role_permissions
            .insert((role_id, permission_key.clone()), edge.clone());

        Ok(edge)
    }

    async fn assign_member_role(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
        role_id: RoleId,
        assigned_by: Option<MemberId>,
        at: DateTime<Utc>,
    ) -> AppResult<MemberRole> {
        let mut state = self.state.write().await;
        state.member_in_tenant(tenant_id, member_id)?;
        state.visible_role(tenant_id, role_id)?;

        let assignment = state
            .member_roles
            .entry((member_id, role_id))
            .and_modify(|existing| {
                if !existing.lifecycle.is_flagged_active() {
                    existing.assigned_by = assigned_by;
                    existing.lifecycle = Lifecycle::started_at(at);
                }
            })
            .or_insert(MemberRole {
                tenant_id,
                member_id,
                role_id,
                assigned_by,
                lifecycle: Lifecycle::started_at(at),
            });

        Ok(*assignment)
    }

    async fn revoke_member_role(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
        role_id: RoleId,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        match state.member_roles.get_mut(&(member_id, role_id)) {
            Some(assignment)
                if assignment.tenant_id == tenant_id && assignment.lifecycle.is_flagged_active() =>
            {
                assignment.lifecycle = assignment.lifecycle.revoked(at);
                Ok(())
            }
            _ => Err(AppError::NotFound(format!(
                "member '{member_id}' holds no active role '{role_id}' in tenant '{tenant_id}'"
            ))),
        }
    }

    async fn add_team_member(
        &self,
        tenant_id: TenantId,
        team_id: TeamId,
        member_id: MemberId,
        at: DateTime<Utc>,
    ) -> AppResult<TeamMember> {
        let mut state = self.state.write().await;
        state.team_in_tenant(tenant_id, team_id)?;
        state.member_in_tenant(tenant_id, member_id)?;

        let membership = state
            .team_members
            .entry((team_id, member_id))
            .and_modify(|existing| {
                if !existing.lifecycle.is_flagged_active() {
                    existing.lifecycle = Lifecycle::started_at(at);
                }
            })
            .or_insert(TeamMember {
                tenant_id,
                team_id,
                member_id,
                lifecycle: Lifecycle::started_at(at),
            });

        Ok(*membership)
    }

    async fn remove_team_member(
        &self,
        tenant_id: TenantId,
        team_id: TeamId,
        member_id: MemberId,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        match state.team_members.get_mut(&(team_id, member_id)) {
            Some(membership)
                if membership.tenant_id == tenant_id && membership.lifecycle.is_flagged_active() =>
            {
                membership.lifecycle = membership.lifecycle.revoked(at);
                Ok(())
            }
            _ => Err(AppError::NotFound(format!(
                "member '{member_id}' is not an active member of team '{team_id}'"
            ))),
        }
    }

    async fn assign_team_role(
        &self,
        tenant_id: TenantId,
        team_id: TeamId,
        role_id: RoleId,
        assigned_by: Option<MemberId>,
        at: DateTime<Utc>,
    ) -> AppResult<TeamRole> {
        let mut state = self.state.write().await;
        state.team_in_tenant(tenant_id, team_id)?;
        state.visible_role(tenant_id, role_id)?;

        let assignment = state
            .team_roles
            .entry((team_id, role_id))
            .and_modify(|existing| {
                if !existing.lifecycle.is_flagged_active() {
                    existing.assigned_by = assigned_by;
                    existing.lifecycle = Lifecycle::started_at(at);
                }
            })
            .or_insert(TeamRole {
                tenant_id,
                team_id,
                role_id,
                assigned_by,
                lifecycle: Lifecycle::started_at(at),
            });

        Ok(*assignment)
    }

    async fn revoke_team_role(
        &self,
        tenant_id: TenantId,
        team_id: TeamId,
        role_id: RoleId,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        match state.team_roles.get_mut(&(team_id, role_id)) {
            Some(assignment)
                if assignment.tenant_id == tenant_id && assignment.lifecycle.is_flagged_active() =>
            {
                assignment.lifecycle = assignment.lifecycle.revoked(at);
                Ok(())
            }
            _ => Err(AppError::NotFound(format!(
                "team '{team_id}' holds no active role '{role_id}' in tenant '{tenant_id}'"
            ))),
        }
    }

    async fn upsert_member_override(&self, value: &MemberPermissionOverride) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.member_in_tenant(value.tenant_id(), value.member_id())?;

        state.overrides.insert(
            (value.member_id(), value.permission_key().clone()),
            value.clone(),
        );

        Ok(())
    }

    async fn delete_member_override(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
        permission_key: &PermissionKey,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        match state.overrides.get_mut(&(member_id, permission_key.clone())) {
            Some(value) if value.tenant_id() == tenant_id && !value.is_deleted() => {
                *value = value.clone().deleted(at);
                Ok(())
            }
            _ => Err(AppError::NotFound(format!(
                "member '{member_id}' has no override for '{permission_key}'"
            ))),
        }
    }

    async fn upsert_resource_grant(&self, grant: &ResourceGrant) -> AppResult<()> {
        let mut state = self.state.write().await;
        match grant.subject() {
            GrantSubject::Member(member_id) => state.member_in_tenant(grant.tenant_id(), member_id)?,
            GrantSubject::Team(team_id) => state.team_in_tenant(grant.tenant_id(), team_id)?,
        }

        state.resource_grants.insert(
            (grant.tenant_id(), grant.subject(), grant.resource().clone()),
            grant.clone(),
        );

        Ok(())
    }

    async fn delete_resource_grant(
        &self,
        tenant_id: TenantId,
        subject: GrantSubject,
        resource: &ResourceRef,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        match state
            .resource_grants
            .get_mut(&(tenant_id, subject, resource.clone()))
        {
            Some(grant) if !grant.is_deleted() => {
                *grant = grant.clone().deleted(at);
                Ok(())
            }
            _ => Err(AppError::NotFound(format!(
                "no live grant on '{resource}' for {} '{}'",
                subject.kind(),
                subject.id()
            ))),
        }
    }
}
