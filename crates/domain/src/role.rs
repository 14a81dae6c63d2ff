use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tessera_core::{AppError, AppResult, NonEmptyString, RoleId, TenantId};

use crate::{Condition, Effect, PermissionKey};

/// Ownership of a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "tenant_id", rename_all = "snake_case")]
pub enum RoleScope {
    /// Shared read-only template usable by every tenant.
    System,
    /// Owned by exactly one tenant.
    Tenant(TenantId),
}

impl RoleScope {
    /// Builds a scope from a nullable tenant column.
    #[must_use]
    pub fn from_tenant_column(tenant_id: Option<TenantId>) -> Self {
        tenant_id.map_or(Self::System, Self::Tenant)
    }

    /// Returns the owning tenant, if any.
    #[must_use]
    pub fn tenant_id(&self) -> Option<TenantId> {
        match self {
            Self::System => None,
            Self::Tenant(tenant_id) => Some(*tenant_id),
        }
    }

    /// Returns whether a principal of `tenant_id` may hold this role.
    #[must_use]
    pub fn is_visible_to(&self, tenant_id: TenantId) -> bool {
        match self {
            Self::System => true,
            Self::Tenant(owner) => *owner == tenant_id,
        }
    }

    /// Returns whether this is a system template.
    #[must_use]
    pub fn is_system(&self) -> bool {
        matches!(self, Self::System)
    }
}

/// Built-in role templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemRole {
    /// Tenant owner.
    Owner,
    /// Tenant administrator.
    Admin,
    /// Regular member.
    Member,
    /// Read-only member.
    Viewer,
}

impl SystemRole {
    /// Returns the stable role key.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
            Self::Viewer => "viewer",
        }
    }

    /// Returns all system role templates.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[SystemRole] = &[
            SystemRole::Owner,
            SystemRole::Admin,
            SystemRole::Member,
            SystemRole::Viewer,
        ];

        ALL
    }
}

impl FromStr for SystemRole {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            "member" => Ok(Self::Member),
            "viewer" => Ok(Self::Viewer),
            _ => Err(AppError::Validation(format!(
                "unknown system role '{value}'"
            ))),
        }
    }
}

/// Named container of permission grants.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleDefinition {
    id: RoleId,
    scope: RoleScope,
    key: NonEmptyString,
    name: NonEmptyString,
    description: Option<String>,
    is_active: bool,
    deleted_at: Option<DateTime<Utc>>,
}

impl RoleDefinition {
    /// Creates a validated role.
    pub fn new(
        id: RoleId,
        scope: RoleScope,
        key: impl Into<String>,
        name: impl Into<String>,
        description: Option<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            scope,
            key: NonEmptyString::new(key)?,
            name: NonEmptyString::new(name)?,
            description,
            is_active: true,
            deleted_at: None,
        })
    }

    /// Creates the template for a built-in role.
    pub fn system(id: RoleId, role: SystemRole) -> AppResult<Self> {
        let mut name = role.as_str().to_owned();
        if let Some(first) = name.get_mut(0..1) {
            first.make_ascii_uppercase();
        }

        Self::new(id, RoleScope::System, role.as_str(), name, None)
    }

    /// Returns the role with the stored lifecycle flags applied.
    #[must_use]
    pub fn with_status(mut self, is_active: bool, deleted_at: Option<DateTime<Utc>>) -> Self {
        self.is_active = is_active;
        self.deleted_at = deleted_at;
        self
    }

    /// Returns the role id.
    #[must_use]
    pub fn id(&self) -> RoleId {
        self.id
    }

    /// Returns the role ownership.
    #[must_use]
    pub fn scope(&self) -> RoleScope {
        self.scope
    }

    /// Returns the key, unique within the owning tenant.
    #[must_use]
    pub fn key(&self) -> &NonEmptyString {
        &self.key
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns whether the role is a shared template.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.scope.is_system()
    }

    /// Returns when the role was soft-deleted.
    #[must_use]
    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    /// Returns whether the role may contribute grants.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.is_active && self.deleted_at.is_none()
    }
}

/// Role to permission edge. At most one exists per (role, permission).
#[derive(Debug, Clone, PartialEq)]
pub struct RolePermission {
    role_id: RoleId,
    role_scope: RoleScope,
    permission_key: PermissionKey,
    effect: Effect,
    conditions: Option<Condition>,
}

impl RolePermission {
    /// Creates a role permission edge.
    #[must_use]
    pub fn new(
        role_id: RoleId,
        role_scope: RoleScope,
        permission_key: PermissionKey,
        effect: Effect,
        conditions: Option<Condition>,
    ) -> Self {
        Self {
            role_id,
            role_scope,
            permission_key,
            effect,
            conditions,
        }
    }

    /// Returns the granting role.
    #[must_use]
    pub fn role_id(&self) -> RoleId {
        self.role_id
    }

    /// Returns the ownership of the granting role.
    #[must_use]
    pub fn role_scope(&self) -> RoleScope {
        self.role_scope
    }

    /// Returns the granted permission.
    #[must_use]
    pub fn permission_key(&self) -> &PermissionKey {
        &self.permission_key
    }

    /// Returns the edge effect.
    #[must_use]
    pub fn effect(&self) -> Effect {
        self.effect
    }

    /// Returns the optional attribute conditions.
    #[must_use]
    pub fn conditions(&self) -> Option<&Condition> {
        self.conditions.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use tessera_core::{RoleId, TenantId};

    use super::{RoleDefinition, RoleScope, SystemRole};

    #[test]
    fn system_scope_is_visible_to_every_tenant() {
        assert!(RoleScope::System.is_visible_to(TenantId::new()));
    }

    #[test]
    fn tenant_scope_is_only_visible_to_its_owner() {
        let owner = TenantId::new();
        let scope = RoleScope::Tenant(owner);

        assert!(scope.is_visible_to(owner));
        assert!(!scope.is_visible_to(TenantId::new()));
        assert_eq!(RoleScope::from_tenant_column(Some(owner)), scope);
    }

    #[test]
    fn system_templates_are_named_after_their_key() {
        let role = RoleDefinition::system(RoleId::new(), SystemRole::Viewer);
        assert!(role.is_ok());

        let role = role.unwrap_or_else(|_| unreachable!());
        assert!(role.is_system());
        assert_eq!(role.key().as_str(), "viewer");
        assert_eq!(role.name().as_str(), "Viewer");
    }

    #[test]
    fn deleted_roles_are_not_live() {
        let role = RoleDefinition::new(
            RoleId::new(),
            RoleScope::Tenant(TenantId::new()),
            "sales_admin",
            "Sales admin",
            None,
        )
        .unwrap_or_else(|_| unreachable!())
        .with_status(true, Some(chrono::Utc::now()));

        assert!(!role.is_live());
    }

    #[test]
    fn system_role_keys_parse_back() {
        for role in SystemRole::all() {
            assert_eq!(SystemRole::from_str(role.as_str()).ok(), Some(*role));
        }
        assert!(SystemRole::from_str("superuser").is_err());
    }
}
