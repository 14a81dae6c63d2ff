use std::sync::Arc;

use sqlx::PgPool;
use tessera_application::PermissionStores;
use tessera_core::{AppError, AppResult};
use tessera_infrastructure::{InMemoryAuthorizationRepository, PostgresAuthorizationRepository};
use tracing::warn;

use crate::api_config::{ApiConfig, StoreConfig};
use crate::dev_seed;

pub(super) async fn build_permission_stores(
    pool: Option<PgPool>,
    config: &ApiConfig,
) -> AppResult<PermissionStores> {
    match (&config.store, pool) {
        (StoreConfig::Postgres { .. }, Some(pool)) => Ok(PermissionStores::from_shared(Arc::new(
            PostgresAuthorizationRepository::new(pool),
        ))),
        (StoreConfig::Postgres { .. }, None) => Err(AppError::Internal(
            "postgres store selected but no connection pool was created".to_owned(),
        )),
        (StoreConfig::InMemory, _) => {
            warn!("using the in-memory authorization store with development seed data");
            let repository = Arc::new(InMemoryAuthorizationRepository::new());
            dev_seed::run(repository.clone()).await?;
            Ok(PermissionStores::from_shared(repository))
        }
    }
}
