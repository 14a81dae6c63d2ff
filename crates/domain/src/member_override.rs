use chrono::{DateTime, Utc};
use tessera_core::{MemberId, TenantId};

use crate::{Condition, Effect, PermissionKey};

/// Per-member exception that bypasses role aggregation.
///
/// Unique per (member, permission). Deleting one sets `deleted_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberPermissionOverride {
    tenant_id: TenantId,
    member_id: MemberId,
    permission_key: PermissionKey,
    effect: Effect,
    conditions: Option<Condition>,
    deleted_at: Option<DateTime<Utc>>,
}

impl MemberPermissionOverride {
    /// Creates a live override.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        member_id: MemberId,
        permission_key: PermissionKey,
        effect: Effect,
        conditions: Option<Condition>,
    ) -> Self {
        Self {
            tenant_id,
            member_id,
            permission_key,
            effect,
            conditions,
            deleted_at: None,
        }
    }

    /// Returns the override soft-deleted at the given instant.
    #[must_use]
    pub fn deleted(mut self, at: DateTime<Utc>) -> Self {
        self.deleted_at = Some(at);
        self
    }

    /// Returns the owning tenant.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the member the override applies to.
    #[must_use]
    pub fn member_id(&self) -> MemberId {
        self.member_id
    }

    /// Returns the overridden permission.
    #[must_use]
    pub fn permission_key(&self) -> &PermissionKey {
        &self.permission_key
    }

    /// Returns the override effect.
    #[must_use]
    pub fn effect(&self) -> Effect {
        self.effect
    }

    /// Returns the optional attribute conditions.
    #[must_use]
    pub fn conditions(&self) -> Option<&Condition> {
        self.conditions.as_ref()
    }

    /// Returns whether the override was soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
