use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tessera_application::{DecisionCache, DecisionCacheKey};
use tessera_core::{AppResult, MemberId, TenantId};
use tessera_domain::Decision;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy)]
struct DecisionCacheEntry {
    decision: Decision,
    expires_at: Instant,
}

/// In-memory cache adapter for resolved decisions.
#[derive(Default)]
pub struct InMemoryDecisionCache {
    entries: RwLock<HashMap<DecisionCacheKey, DecisionCacheEntry>>,
}

impl InMemoryDecisionCache {
    /// Creates an empty in-memory decision cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DecisionCache for InMemoryDecisionCache {
    async fn get_decision(&self, key: &DecisionCacheKey) -> AppResult<Option<Decision>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Ok(Some(entry.decision));
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        let mut entries = self.entries.write().await;
        if entries
            .get(key)
            .is_some_and(|entry| entry.expires_at <= Instant::now())
        {
            entries.remove(key);
        }

        Ok(None)
    }

    async fn set_decision(
        &self,
        key: &DecisionCacheKey,
        decision: Decision,
        ttl_seconds: u32,
    ) -> AppResult<()> {
        if ttl_seconds == 0 || decision.is_degraded() {
            return Ok(());
        }

        let now = Instant::now();
        let expires_at = now
            .checked_add(Duration::from_secs(u64::from(ttl_seconds)))
            .unwrap_or(now);

        self.entries.write().await.insert(
            key.clone(),
            DecisionCacheEntry {
                decision,
                expires_at,
            },
        );

        Ok(())
    }

    async fn invalidate_principal(
        &self,
        tenant_id: TenantId,
        principal_id: MemberId,
    ) -> AppResult<()> {
        self.entries
            .write()
            .await
            .retain(|key, _| key.tenant_id != tenant_id || key.principal_id != principal_id);

        Ok(())
    }

    async fn invalidate_tenant(&self, tenant_id: TenantId) -> AppResult<()> {
        self.entries
            .write()
            .await
            .retain(|key, _| key.tenant_id != tenant_id);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tessera_application::{DecisionCache, DecisionCacheKey};
    use tessera_core::{MemberId, TenantId};
    use tessera_domain::{Attributes, Decision, DecisionReason, PermissionKey};

    use super::InMemoryDecisionCache;

    fn key(tenant_id: TenantId, principal_id: MemberId) -> DecisionCacheKey {
        DecisionCacheKey::new(
            tenant_id,
            principal_id,
            PermissionKey::new("contacts.read").unwrap_or_else(|_| unreachable!()),
            None,
            &Attributes::new(),
        )
        .unwrap_or_else(|_| unreachable!())
    }

    fn allow() -> Decision {
        Decision::from_reason(DecisionReason::RoleAllow, Utc::now())
    }

    #[tokio::test]
    async fn stored_decision_is_returned_until_invalidated() {
        let cache = InMemoryDecisionCache::new();
        let tenant_id = TenantId::new();
        let member_key = key(tenant_id, MemberId::new());
        let other_key = key(tenant_id, MemberId::new());

        assert!(cache.set_decision(&member_key, allow(), 30).await.is_ok());
        assert!(cache.set_decision(&other_key, allow(), 30).await.is_ok());
        assert!(matches!(cache.get_decision(&member_key).await, Ok(Some(_))));

        assert!(
            cache
                .invalidate_principal(tenant_id, member_key.principal_id)
                .await
                .is_ok()
        );
        assert!(matches!(cache.get_decision(&member_key).await, Ok(None)));
        assert!(matches!(cache.get_decision(&other_key).await, Ok(Some(_))));
    }

    #[tokio::test]
    async fn tenant_invalidation_keeps_other_tenants() {
        let cache = InMemoryDecisionCache::new();
        let first = key(TenantId::new(), MemberId::new());
        let second = key(TenantId::new(), MemberId::new());

        assert!(cache.set_decision(&first, allow(), 30).await.is_ok());
        assert!(cache.set_decision(&second, allow(), 30).await.is_ok());
        assert!(cache.invalidate_tenant(first.tenant_id).await.is_ok());

        assert!(matches!(cache.get_decision(&first).await, Ok(None)));
        assert!(matches!(cache.get_decision(&second).await, Ok(Some(_))));
    }

    #[tokio::test]
    async fn zero_ttl_and_degraded_decisions_are_not_stored() {
        let cache = InMemoryDecisionCache::new();
        let cache_key = key(TenantId::new(), MemberId::new());

        assert!(cache.set_decision(&cache_key, allow(), 0).await.is_ok());
        assert!(
            cache
                .set_decision(&cache_key, Decision::fail_closed(Utc::now()), 30)
                .await
                .is_ok()
        );

        assert!(matches!(cache.get_decision(&cache_key).await, Ok(None)));
    }
}
