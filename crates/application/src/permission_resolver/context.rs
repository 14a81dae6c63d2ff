use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tessera_core::{AppResult, MemberId, TeamId, TenantId};
use tessera_domain::{GrantSubject, Principal};

use crate::MembershipGraph;

/// Identity facts resolved once per request and threaded through every
/// resolution step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionContext {
    /// Tenant every lookup is filtered by.
    pub tenant_id: TenantId,
    /// Principal being authorized.
    pub principal_id: MemberId,
    /// Teams the principal actively belongs to.
    pub team_ids: BTreeSet<TeamId>,
    /// Instant lifecycles are evaluated at.
    pub evaluated_at: DateTime<Utc>,
}

impl PermissionContext {
    /// Loads the active teams of a principal.
    pub async fn load(
        memberships: &dyn MembershipGraph,
        principal: &Principal,
        evaluated_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        let team_ids = memberships
            .active_teams_for(principal.tenant_id, principal.member_id, evaluated_at)
            .await?;

        Ok(Self {
            tenant_id: principal.tenant_id,
            principal_id: principal.member_id,
            team_ids,
            evaluated_at,
        })
    }

    /// Returns the principal and its teams as grant subjects.
    #[must_use]
    pub fn grant_subjects(&self) -> Vec<GrantSubject> {
        std::iter::once(GrantSubject::Member(self.principal_id))
            .chain(self.team_ids.iter().copied().map(GrantSubject::Team))
            .collect()
    }
}
