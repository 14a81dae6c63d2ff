use sqlx::PgPool;
use tessera_application::PermissionResolver;
use tessera_core::AppError;

use crate::api_config::{ApiConfig, DecisionCacheConfig};
use crate::state::AppState;

use super::redis::build_redis_client;

mod caches;
mod stores;

pub async fn build_app_state(
    pool: Option<PgPool>,
    config: &ApiConfig,
) -> Result<AppState, AppError> {
    let redis_client = match &config.decision_cache {
        DecisionCacheConfig::Redis { redis_url, .. } => Some(build_redis_client(redis_url)?),
        DecisionCacheConfig::Disabled | DecisionCacheConfig::InMemory => None,
    };

    let stores = stores::build_permission_stores(pool.clone(), config).await?;
    let mut permission_resolver = PermissionResolver::new(stores);
    if let Some(decision_cache) = caches::build_decision_cache(config, redis_client.clone())? {
        permission_resolver =
            permission_resolver.with_cache(decision_cache, config.decision_cache_ttl_seconds);
    }

    Ok(AppState {
        permission_resolver,
        internal_shared_secret: config.internal_shared_secret.clone(),
        postgres_pool: pool,
        redis_client,
        redis_required: config.requires_redis(),
    })
}
