use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tessera_core::AppError;

/// Why a decision was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionReason {
    /// A member override granted the permission.
    OverrideAllow,
    /// A member override refused the permission.
    OverrideDeny,
    /// A held role granted the permission.
    RoleAllow,
    /// A held role refused the permission.
    RoleDeny,
    /// A resource grant confirmed the required access level.
    GrantConfirmed,
    /// Resource grants are missing or below the required access level.
    InsufficientGrant,
    /// Nothing matched. The default outcome.
    NoMatchingRule,
}

impl DecisionReason {
    /// Returns the stable reason code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OverrideAllow => "OVERRIDE_ALLOW",
            Self::OverrideDeny => "OVERRIDE_DENY",
            Self::RoleAllow => "ROLE_ALLOW",
            Self::RoleDeny => "ROLE_DENY",
            Self::GrantConfirmed => "GRANT_CONFIRMED",
            Self::InsufficientGrant => "INSUFFICIENT_GRANT",
            Self::NoMatchingRule => "NO_MATCHING_RULE",
        }
    }

    /// Returns whether the reason grants access.
    #[must_use]
    pub fn is_allow(&self) -> bool {
        matches!(
            self,
            Self::OverrideAllow | Self::RoleAllow | Self::GrantConfirmed
        )
    }
}

impl FromStr for DecisionReason {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "OVERRIDE_ALLOW" => Ok(Self::OverrideAllow),
            "OVERRIDE_DENY" => Ok(Self::OverrideDeny),
            "ROLE_ALLOW" => Ok(Self::RoleAllow),
            "ROLE_DENY" => Ok(Self::RoleDeny),
            "GRANT_CONFIRMED" => Ok(Self::GrantConfirmed),
            "INSUFFICIENT_GRANT" => Ok(Self::InsufficientGrant),
            "NO_MATCHING_RULE" => Ok(Self::NoMatchingRule),
            _ => Err(AppError::Validation(format!(
                "unknown decision reason '{value}'"
            ))),
        }
    }
}

/// Authorization outcome returned to callers.
///
/// `allowed` is always derived from the reason, so an allow can only be
/// produced by one of the granting reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DecisionRecord", into = "DecisionRecord")]
pub struct Decision {
    reason: DecisionReason,
    evaluated_at: DateTime<Utc>,
    degraded: bool,
}

impl Decision {
    /// Creates a definitive decision.
    #[must_use]
    pub fn from_reason(reason: DecisionReason, evaluated_at: DateTime<Utc>) -> Self {
        Self {
            reason,
            evaluated_at,
            degraded: false,
        }
    }

    /// Creates the deny returned when a backing store could not be read.
    #[must_use]
    pub fn fail_closed(evaluated_at: DateTime<Utc>) -> Self {
        Self {
            reason: DecisionReason::NoMatchingRule,
            evaluated_at,
            degraded: true,
        }
    }

    /// Returns whether access is granted.
    #[must_use]
    pub fn allowed(&self) -> bool {
        self.reason.is_allow()
    }

    /// Returns the reason code.
    #[must_use]
    pub fn reason(&self) -> DecisionReason {
        self.reason
    }

    /// Returns when the decision was computed.
    #[must_use]
    pub fn evaluated_at(&self) -> DateTime<Utc> {
        self.evaluated_at
    }

    /// Returns whether the decision was produced by the fail-closed path.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }
}

#[derive(Serialize, Deserialize)]
struct DecisionRecord {
    allowed: bool,
    reason_code: DecisionReason,
    evaluated_at: DateTime<Utc>,
    #[serde(default)]
    degraded: bool,
}

impl From<Decision> for DecisionRecord {
    fn from(value: Decision) -> Self {
        Self {
            allowed: value.allowed(),
            reason_code: value.reason,
            evaluated_at: value.evaluated_at,
            degraded: value.degraded,
        }
    }
}

impl TryFrom<DecisionRecord> for Decision {
    type Error = AppError;

    fn try_from(value: DecisionRecord) -> Result<Self, Self::Error> {
        if value.allowed != value.reason_code.is_allow() {
            return Err(AppError::Validation(format!(
                "decision allowed={} contradicts reason {}",
                value.allowed,
                value.reason_code.as_str()
            )));
        }

        if value.degraded && value.allowed {
            return Err(AppError::Validation(
                "degraded decisions must deny".to_owned(),
            ));
        }

        Ok(Self {
            reason: value.reason_code,
            evaluated_at: value.evaluated_at,
            degraded: value.degraded,
        })
    }
}
