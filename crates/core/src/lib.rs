//! Shared primitives for all Rust crates in Tessera.

#![forbid(unsafe_code)]

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Result type used across Tessera crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

impl Display for NonEmptyString {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID value.
            #[must_use]
            pub fn from_uuid(value: Uuid) -> Self {
                Self(value)
            }

            /// Parses an identifier from its transport representation.
            pub fn parse(value: &str) -> AppResult<Self> {
                Uuid::parse_str(value.trim())
                    .map(Self)
                    .map_err(|error| {
                        AppError::Validation(format!("invalid {} '{value}': {error}", $label))
                    })
            }

            /// Returns the underlying UUID value.
            #[must_use]
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }
    };
}

uuid_identifier!(
    /// Tenant identifier used as the partition key for every persisted resource.
    TenantId,
    "tenant id"
);

uuid_identifier!(
    /// Tenant member (principal) identifier.
    MemberId,
    "member id"
);

uuid_identifier!(
    /// Tenant-scoped team identifier.
    TeamId,
    "team id"
);

uuid_identifier!(
    /// Role identifier, tenant-owned or a shared system template.
    RoleId,
    "role id"
);

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller is not authenticated.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but blocked by policy.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Permission key is not in the catalog or is inactive.
    #[error("unknown permission: {0}")]
    UnknownPermission(String),

    /// The principal belongs to a different tenant than the one requested.
    #[error("tenant mismatch: principal belongs to tenant '{actual}' but tenant '{requested}' was requested")]
    TenantMismatch {
        /// Tenant supplied by the caller.
        requested: TenantId,
        /// Tenant that owns the principal.
        actual: TenantId,
    },

    /// A backing store lookup failed.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::{AppError, MemberId, NonEmptyString, TenantId};

    #[test]
    fn non_empty_string_rejects_whitespace() {
        let result = NonEmptyString::new("   ");
        assert!(result.is_err());
    }

    #[test]
    fn tenant_id_formats_as_uuid() {
        let tenant_id = TenantId::new();
        assert_eq!(tenant_id.to_string().len(), 36);
    }

    #[test]
    fn member_id_parses_its_display_form() {
        let member_id = MemberId::new();
        let parsed = MemberId::parse(member_id.to_string().as_str());
        assert!(matches!(parsed, Ok(value) if value == member_id));
    }

    #[test]
    fn malformed_identifier_is_a_validation_error() {
        let parsed = TenantId::parse("not-a-uuid");
        assert!(matches!(parsed, Err(AppError::Validation(_))));
    }

    #[test]
    fn tenant_mismatch_message_names_both_tenants() {
        let requested = TenantId::new();
        let actual = TenantId::new();
        let message = AppError::TenantMismatch { requested, actual }.to_string();

        assert!(message.contains(requested.to_string().as_str()));
        assert!(message.contains(actual.to_string().as_str()));
    }
}
