//! Redis-backed decision cache.
//!
//! Invalidation bumps a generation counter instead of scanning keys: every
//! decision key embeds the current tenant and principal generations, so
//! entries written before a bump are never read again and expire by ttl.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use tessera_application::{DecisionCache, DecisionCacheKey};
use tessera_core::{AppError, AppResult, MemberId, TenantId};
use tessera_domain::Decision;

/// Redis implementation of the decision cache port.
#[derive(Clone)]
pub struct RedisDecisionCache {
    client: redis::Client,
    key_prefix: String,
}

impl RedisDecisionCache {
    /// Creates a cache adapter with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn tenant_generation_key(&self, tenant_id: TenantId) -> String {
        format!("{}:gen:{tenant_id}", self.key_prefix)
    }

    fn principal_generation_key(&self, tenant_id: TenantId, principal_id: MemberId) -> String {
        format!("{}:gen:{tenant_id}:{principal_id}", self.key_prefix)
    }

    fn decision_key(
        &self,
        key: &DecisionCacheKey,
        tenant_generation: u64,
        principal_generation: u64,
    ) -> String {
        format!(
            "{}:decision:{}:{tenant_generation}:{}:{principal_generation}:{}",
            self.key_prefix,
            key.tenant_id,
            key.principal_id,
            key.decision_scope()
        )
    }

    async fn connection(&self) -> AppResult<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| {
                AppError::StoreUnavailable(format!("failed to connect to redis: {error}"))
            })
    }

    async fn current_decision_key(
        &self,
        connection: &mut MultiplexedConnection,
        key: &DecisionCacheKey,
    ) -> AppResult<String> {
        let generation_keys = vec![
            self.tenant_generation_key(key.tenant_id),
            self.principal_generation_key(key.tenant_id, key.principal_id),
        ];

        let generations: Vec<Option<u64>> =
            connection.mget(generation_keys).await.map_err(|error| {
                AppError::StoreUnavailable(format!(
                    "failed to read decision cache generations: {error}"
                ))
            })?;

        let tenant_generation = generations.first().copied().flatten().unwrap_or(0);
        let principal_generation = generations.get(1).copied().flatten().unwrap_or(0);

        Ok(self.decision_key(key, tenant_generation, principal_generation))
    }

    async fn bump_generation(&self, generation_key: String) -> AppResult<()> {
        let mut connection = self.connection().await?;

        let _: u64 = connection.incr(generation_key, 1).await.map_err(|error| {
            AppError::StoreUnavailable(format!(
                "failed to bump decision cache generation: {error}"
            ))
        })?;

        Ok(())
    }
}

#[async_trait]
impl DecisionCache for RedisDecisionCache {
    async fn get_decision(&self, key: &DecisionCacheKey) -> AppResult<Option<Decision>> {
        let mut connection = self.connection().await?;
        let decision_key = self.current_decision_key(&mut connection, key).await?;

        let encoded: Option<String> = connection.get(decision_key).await.map_err(|error| {
            AppError::StoreUnavailable(format!("failed to read decision cache entry: {error}"))
        })?;

        encoded
            .as_deref()
            .map(|value| {
                serde_json::from_str::<Decision>(value).map_err(|error| {
                    AppError::Internal(format!("invalid decision cache entry '{value}': {error}"))
                })
            })
            .transpose()
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

        let value = serde_json::to_string(&decision).map_err(|error| {
            AppError::Internal(format!("failed to encode decision cache entry: {error}"))
        })?;
        let mut connection = self.connection().await?;
        let decision_key = self.current_decision_key(&mut connection, key).await?;

        connection
            .set_ex(decision_key, value, u64::from(ttl_seconds))
            .await
            .map_err(|error| {
                AppError::StoreUnavailable(format!(
                    "failed to write decision cache entry: {error}"
                ))
            })
    }

    async fn invalidate_principal(
        &self,
        tenant_id: TenantId,
        principal_id: MemberId,
    ) -> AppResult<()> {
        self.bump_generation(self.principal_generation_key(tenant_id, principal_id))
            .await
    }

    async fn invalidate_tenant(&self, tenant_id: TenantId) -> AppResult<()> {
        self.bump_generation(self.tenant_generation_key(tenant_id))
            .await
    }
}
