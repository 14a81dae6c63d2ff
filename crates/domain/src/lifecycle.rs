use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Activity window shared by every revocable edge.
///
/// Edges are never hard-deleted. Revoking one records the timestamp and
/// clears the active flag so the row stays available for audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    created_at: DateTime<Utc>,
    revoked_at: Option<DateTime<Utc>>,
    is_active: bool,
}

impl Lifecycle {
    /// Creates an active lifecycle starting at the given instant.
    #[must_use]
    pub fn started_at(created_at: DateTime<Utc>) -> Self {
        Self {
            created_at,
            revoked_at: None,
            is_active: true,
        }
    }

    /// Rebuilds a lifecycle from stored columns.
    #[must_use]
    pub fn from_parts(
        created_at: DateTime<Utc>,
        revoked_at: Option<DateTime<Utc>>,
        is_active: bool,
    ) -> Self {
        Self {
            created_at,
            revoked_at,
            is_active,
        }
    }

    /// Returns when the edge was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the edge was revoked, if ever.
    #[must_use]
    pub fn revoked_at(&self) -> Option<DateTime<Utc>> {
        self.revoked_at
    }

    /// Returns the stored active flag.
    #[must_use]
    pub fn is_flagged_active(&self) -> bool {
        self.is_active
    }

    /// Returns the lifecycle revoked at the given instant.
    ///
    /// Revoking an already revoked edge keeps the first timestamp.
    #[must_use]
    pub fn revoked(self, at: DateTime<Utc>) -> Self {
        Self {
            created_at: self.created_at,
            revoked_at: Some(self.revoked_at.unwrap_or(at)),
            is_active: false,
        }
    }

    /// Returns whether the edge takes part in decisions at `now`.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.created_at <= now
            && self.revoked_at.is_none_or(|revoked_at| revoked_at > now)
    }

    /// Returns whether the edge is active right now.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active_at(Utc::now())
    }
}
