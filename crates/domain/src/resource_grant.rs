use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tessera_core::{AppError, AppResult, MemberId, NonEmptyString, TeamId, TenantId};

use crate::{AccessLevel, Condition};

/// Holder of a resource grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "subject_type", content = "subject_id", rename_all = "snake_case")]
pub enum GrantSubject {
    /// A single tenant member.
    Member(MemberId),
    /// Every active member of a team.
    Team(TeamId),
}

impl GrantSubject {
    /// Returns the stable storage value of the subject type.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Member(_) => "member",
            Self::Team(_) => "team",
        }
    }

    /// Returns the subject id as a raw UUID.
    #[must_use]
    pub fn id(&self) -> uuid::Uuid {
        match self {
            Self::Member(member_id) => member_id.as_uuid(),
            Self::Team(team_id) => team_id.as_uuid(),
        }
    }

    /// Rebuilds a subject from its stored columns.
    pub fn from_parts(kind: &str, id: uuid::Uuid) -> AppResult<Self> {
        match kind {
            "member" => Ok(Self::Member(MemberId::from_uuid(id))),
            "team" => Ok(Self::Team(TeamId::from_uuid(id))),
            _ => Err(AppError::Validation(format!(
                "unknown grant subject type '{kind}'"
            ))),
        }
    }
}

/// Reference to one resource instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceRef {
    resource_type: NonEmptyString,
    resource_id: NonEmptyString,
}

impl ResourceRef {
    /// Creates a validated resource reference.
    pub fn new(resource_type: impl Into<String>, resource_id: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            resource_type: NonEmptyString::new(resource_type)?,
            resource_id: NonEmptyString::new(resource_id)?,
        })
    }

    /// Returns the resource type, e.g. `business`.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        self.resource_type.as_str()
    }

    /// Returns the resource instance id.
    #[must_use]
    pub fn resource_id(&self) -> &str {
        self.resource_id.as_str()
    }
}

impl Display for ResourceRef {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}:{}", self.resource_type, self.resource_id)
    }
}

/// Object-level access record, independent of roles.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceGrant {
    tenant_id: TenantId,
    subject: GrantSubject,
    resource: ResourceRef,
    access_level: AccessLevel,
    conditions: Option<Condition>,
    deleted_at: Option<DateTime<Utc>>,
}

impl ResourceGrant {
    /// Creates a live grant.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        subject: GrantSubject,
        resource: ResourceRef,
        access_level: AccessLevel,
        conditions: Option<Condition>,
    ) -> Self {
        Self {
            tenant_id,
            subject,
            resource,
            access_level,
            conditions,
            deleted_at: None,
        }
    }

    /// Returns the grant soft-deleted at the given instant.
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

    /// Returns the grant holder.
    #[must_use]
    pub fn subject(&self) -> GrantSubject {
        self.subject
    }

    /// Returns the granted resource.
    #[must_use]
    pub fn resource(&self) -> &ResourceRef {
        &self.resource
    }

    /// Returns the granted access level.
    #[must_use]
    pub fn access_level(&self) -> AccessLevel {
        self.access_level
    }

    /// Returns the optional attribute conditions.
    #[must_use]
    pub fn conditions(&self) -> Option<&Condition> {
        self.conditions.as_ref()
    }

    /// Returns whether the grant was soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Maps permission actions to the access level they need on a resource.
///
/// Actions without a mapping require [`AccessLevel::Full`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionAccessPolicy {
    levels: BTreeMap<String, AccessLevel>,
}

impl ActionAccessPolicy {
    /// Creates a policy with no mapped actions.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            levels: BTreeMap::new(),
        }
    }

    /// Returns the policy with one action mapped.
    #[must_use]
    pub fn with_action(mut self, action: impl Into<String>, level: AccessLevel) -> Self {
        self.levels.insert(action.into(), level);
        self
    }

    /// Returns the explicitly mapped level for an action.
    #[must_use]
    pub fn mapped_level(&self, action: &str) -> Option<AccessLevel> {
        self.levels.get(action).copied()
    }

    /// Returns the level an action needs.
    #[must_use]
    pub fn required_level(&self, action: &str) -> AccessLevel {
        self.mapped_level(action).unwrap_or(AccessLevel::Full)
    }
}

impl Default for ActionAccessPolicy {
    fn default() -> Self {
        const DEFAULT_LEVELS: &[(&str, AccessLevel)] = &[
            ("read", AccessLevel::Read),
            ("list", AccessLevel::Read),
            ("view", AccessLevel::Read),
            ("export", AccessLevel::Read),
            ("write", AccessLevel::Write),
            ("create", AccessLevel::Write),
            ("update", AccessLevel::Write),
            ("edit", AccessLevel::Write),
            ("delete", AccessLevel::Admin),
            ("manage", AccessLevel::Admin),
            ("share", AccessLevel::Admin),
            ("assign", AccessLevel::Admin),
            ("admin", AccessLevel::Admin),
        ];

        DEFAULT_LEVELS
            .iter()
            .fold(Self::empty(), |policy, (action, level)| {
                policy.with_action(*action, *level)
            })
    }
}

#[cfg(test)]
mod tests {
    use tessera_core::MemberId;

    use super::{ActionAccessPolicy, GrantSubject, ResourceRef};
    use crate::AccessLevel;

    #[test]
    fn default_policy_maps_common_actions() {
        let policy = ActionAccessPolicy::default();

        assert_eq!(policy.required_level("read"), AccessLevel::Read);
        assert_eq!(policy.required_level("update"), AccessLevel::Write);
        assert_eq!(policy.required_level("delete"), AccessLevel::Admin);
    }

    #[test]
    fn unmapped_actions_require_full_access() {
        let policy = ActionAccessPolicy::empty().with_action("approve", AccessLevel::Write);

        assert_eq!(policy.required_level("approve"), AccessLevel::Write);
        assert_eq!(policy.required_level("transfer"), AccessLevel::Full);
        assert_eq!(policy.mapped_level("transfer"), None);
    }

    #[test]
    fn subject_round_trips_through_storage_columns() {
        let subject = GrantSubject::Member(MemberId::new());
        let rebuilt = GrantSubject::from_parts(subject.kind(), subject.id());

        assert!(matches!(rebuilt, Ok(value) if value == subject));
        assert!(GrantSubject::from_parts("group", subject.id()).is_err());
    }

    #[test]
    fn resource_ref_requires_type_and_id() {
        assert!(ResourceRef::new("business", " ").is_err());
        assert!(ResourceRef::new("", "B1").is_err());

        let resource = ResourceRef::new("business", "B1").unwrap_or_else(|_| unreachable!());
        assert_eq!(resource.to_string(), "business:B1");
    }
}
