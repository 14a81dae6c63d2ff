use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tessera_core::{AppError, AppResult, NonEmptyString};

/// Stable permission key in `<resource>.<action>` form, e.g. `contacts.read`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionKey(String);

impl PermissionKey {
    /// Creates a validated permission key.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();

        let Some((resource, action)) = trimmed.split_once('.') else {
            return Err(AppError::Validation(format!(
                "permission key '{trimmed}' must have the form '<resource>.<action>'"
            )));
        };

        if !is_key_segment(resource) || !is_key_segment(action) {
            return Err(AppError::Validation(format!(
                "permission key '{trimmed}' must use lowercase ascii segments '<resource>.<action>'"
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the resource category segment.
    #[must_use]
    pub fn resource(&self) -> &str {
        self.0
            .split_once('.')
            .map(|(resource, _)| resource)
            .unwrap_or_default()
    }

    /// Returns the action segment.
    #[must_use]
    pub fn action(&self) -> &str {
        self.0
            .split_once('.')
            .map(|(_, action)| action)
            .unwrap_or_default()
    }
}

fn is_key_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|character| character.is_ascii_lowercase() || character.is_ascii_digit() || character == '_')
}

impl FromStr for PermissionKey {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::new(value)
    }
}

impl TryFrom<String> for PermissionKey {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PermissionKey> for String {
    fn from(value: PermissionKey) -> Self {
        value.0
    }
}

impl Display for PermissionKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Catalog entry describing one permission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionDefinition {
    key: PermissionKey,
    name: NonEmptyString,
    description: Option<String>,
    is_active: bool,
}

impl PermissionDefinition {
    /// Creates a validated catalog entry.
    pub fn new(
        key: PermissionKey,
        name: impl Into<String>,
        description: Option<String>,
        is_active: bool,
    ) -> AppResult<Self> {
        Ok(Self {
            key,
            name: NonEmptyString::new(name)?,
            description,
            is_active,
        })
    }

    /// Returns the stable permission key.
    #[must_use]
    pub fn key(&self) -> &PermissionKey {
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

    /// Returns the resource category.
    #[must_use]
    pub fn resource(&self) -> &str {
        self.key.resource()
    }

    /// Returns the action.
    #[must_use]
    pub fn action(&self) -> &str {
        self.key.action()
    }

    /// Returns whether the permission participates in decisions.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }
}

/// Outcome attached to a grant edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    /// Grants the permission.
    Allow,
    /// Refuses the permission.
    Deny,
}

impl Effect {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }
}

impl FromStr for Effect {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "allow" => Ok(Self::Allow),
            "deny" => Ok(Self::Deny),
            _ => Err(AppError::Validation(format!("unknown effect value '{value}'"))),
        }
    }
}

/// Object-level access level. Ordered: `Full ⊇ Admin ⊇ Write ⊇ Read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// Read the resource.
    Read,
    /// Modify the resource.
    Write,
    /// Administer the resource, including sharing.
    Admin,
    /// Unrestricted access.
    Full,
}

impl AccessLevel {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Admin => "admin",
            Self::Full => "full",
        }
    }

    /// Returns all levels from weakest to strongest.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[AccessLevel] = &[
            AccessLevel::Read,
            AccessLevel::Write,
            AccessLevel::Admin,
            AccessLevel::Full,
        ];

        ALL
    }

    /// Returns whether this level includes the required level.
    #[must_use]
    pub fn satisfies(&self, required: AccessLevel) -> bool {
        *self >= required
    }
}

impl FromStr for AccessLevel {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            "admin" => Ok(Self::Admin),
            "full" => Ok(Self::Full),
            _ => Err(AppError::Validation(format!(
                "unknown access level value '{value}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use proptest::prelude::*;

    use super::{AccessLevel, Effect, PermissionKey};

    #[test]
    fn permission_key_splits_resource_and_action() {
        let key = PermissionKey::new("contacts.read");
        assert!(key.is_ok());

        let key = key.unwrap_or_else(|_| unreachable!());
        assert_eq!(key.resource(), "contacts");
        assert_eq!(key.action(), "read");
    }

    #[test]
    fn permission_key_rejects_malformed_values() {
        for value in ["contacts", ".read", "contacts.", "contacts.read.all", "Contacts.Read", ""] {
            assert!(PermissionKey::new(value).is_err(), "accepted '{value}'");
        }
    }

    #[test]
    fn effect_rejects_unknown_storage_value() {
        assert!(Effect::from_str("maybe").is_err());
    }

    #[test]
    fn access_levels_form_a_total_order() {
        assert!(AccessLevel::Full.satisfies(AccessLevel::Admin));
        assert!(AccessLevel::Admin.satisfies(AccessLevel::Write));
        assert!(AccessLevel::Write.satisfies(AccessLevel::Read));
        assert!(!AccessLevel::Read.satisfies(AccessLevel::Write));
    }

    proptest! {
        #[test]
        fn access_level_satisfaction_follows_declaration_order(
            left in 0_usize..4,
            right in 0_usize..4,
        ) {
            let levels = AccessLevel::all();
            prop_assert_eq!(levels[left].satisfies(levels[right]), left >= right);
        }
    }
}
