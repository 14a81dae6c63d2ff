use std::sync::Arc;

use tessera_application::DecisionCache;
use tessera_core::{AppError, AppResult};
use tessera_infrastructure::{InMemoryDecisionCache, RedisDecisionCache};

use crate::api_config::{ApiConfig, DecisionCacheConfig};

pub(super) fn build_decision_cache(
    config: &ApiConfig,
    redis_client: Option<redis::Client>,
) -> AppResult<Option<Arc<dyn DecisionCache>>> {
    if config.decision_cache_ttl_seconds == 0 {
        return Ok(None);
    }

    match &config.decision_cache {
        DecisionCacheConfig::Disabled => Ok(None),
        DecisionCacheConfig::InMemory => Ok(Some(Arc::new(InMemoryDecisionCache::new()))),
        DecisionCacheConfig::Redis { key_prefix, .. } => {
            let redis_client = redis_client.ok_or_else(|| {
                AppError::Validation(
                    "REDIS_URL is required when DECISION_CACHE_BACKEND=redis".to_owned(),
                )
            })?;
            Ok(Some(Arc::new(RedisDecisionCache::new(
                redis_client,
                key_prefix.clone(),
            ))))
        }
    }
}
