//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod condition;
mod decision;
mod lifecycle;
mod member_override;
mod membership;
mod permission;
mod resource_grant;
mod role;

pub use condition::{Attributes, CompareOperator, Condition, ConditionOutcome};
pub use decision::{Decision, DecisionReason};
pub use lifecycle::Lifecycle;
pub use member_override::MemberPermissionOverride;
pub use membership::{MemberRole, Principal, Team, TeamMember, TeamRole};
pub use permission::{AccessLevel, Effect, PermissionDefinition, PermissionKey};
pub use resource_grant::{ActionAccessPolicy, GrantSubject, ResourceGrant, ResourceRef};
pub use role::{RoleDefinition, RolePermission, RoleScope, SystemRole};
