use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tessera_core::{AppError, AppResult, MemberId, NonEmptyString, RoleId, TeamId, TenantId};

use crate::Lifecycle;

/// Tenant member being authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Member identifier.
    pub member_id: MemberId,
    /// Tenant owning the membership.
    pub tenant_id: TenantId,
    /// False once the membership or its tenant is deactivated or deleted.
    pub is_active: bool,
}

/// Tenant-scoped grouping of members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    id: TeamId,
    tenant_id: TenantId,
    name: NonEmptyString,
    slug: NonEmptyString,
    deleted_at: Option<DateTime<Utc>>,
}

impl Team {
    /// Creates a validated team.
    pub fn new(
        id: TeamId,
        tenant_id: TenantId,
        name: impl Into<String>,
        slug: impl Into<String>,
    ) -> AppResult<Self> {
        let slug = slug.into();
        if !slug
            .chars()
            .all(|character| character.is_ascii_lowercase() || character.is_ascii_digit() || character == '-')
        {
            return Err(AppError::Validation(format!(
                "team slug '{slug}' must use lowercase ascii letters, digits and dashes"
            )));
        }

        Ok(Self {
            id,
            tenant_id,
            name: NonEmptyString::new(name)?,
            slug: NonEmptyString::new(slug)?,
            deleted_at: None,
        })
    }

    /// Returns the team soft-deleted at the given instant.
    #[must_use]
    pub fn deleted(mut self, at: DateTime<Utc>) -> Self {
        self.deleted_at = Some(at);
        self
    }

    /// Returns the team id.
    #[must_use]
    pub fn id(&self) -> TeamId {
        self.id
    }

    /// Returns the owning tenant.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the slug, unique per tenant.
    #[must_use]
    pub fn slug(&self) -> &NonEmptyString {
        &self.slug
    }

    /// Returns whether the team was soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Direct role assignment for a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberRole {
    /// Tenant owning the assignment.
    pub tenant_id: TenantId,
    /// Assignee.
    pub member_id: MemberId,
    /// Assigned role.
    pub role_id: RoleId,
    /// Member who made the assignment.
    pub assigned_by: Option<MemberId>,
    /// Assignment and revocation timestamps.
    pub lifecycle: Lifecycle,
}

/// Team membership. `created_at` is the join time, `revoked_at` the leave time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamMember {
    /// Tenant owning the team.
    pub tenant_id: TenantId,
    /// Team joined.
    pub team_id: TeamId,
    /// Joining member.
    pub member_id: MemberId,
    /// Join and leave timestamps.
    pub lifecycle: Lifecycle,
}

/// Role assignment inherited by every active member of a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamRole {
    /// Tenant owning the team.
    pub tenant_id: TenantId,
    /// Team holding the role.
    pub team_id: TeamId,
    /// Assigned role.
    pub role_id: RoleId,
    /// Member who made the assignment.
    pub assigned_by: Option<MemberId>,
    /// Assignment and revocation timestamps.
    pub lifecycle: Lifecycle,
}

#[cfg(test)]
mod tests {
    use tessera_core::{TeamId, TenantId};

    use super::Team;

    #[test]
    fn team_slug_rejects_uppercase_and_spaces() {
        assert!(Team::new(TeamId::new(), TenantId::new(), "Sales", "Sales Team").is_err());
        assert!(Team::new(TeamId::new(), TenantId::new(), "Sales", "sales-emea").is_ok());
    }

    #[test]
    fn deleted_team_reports_deletion() {
        let team = Team::new(TeamId::new(), TenantId::new(), "Sales", "sales")
            .unwrap_or_else(|_| unreachable!())
            .deleted(chrono::Utc::now());

        assert!(team.is_deleted());
    }
}
