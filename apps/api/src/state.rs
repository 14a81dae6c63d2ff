use tessera_application::PermissionResolver;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub permission_resolver: PermissionResolver,
    pub internal_shared_secret: String,
    pub postgres_pool: Option<sqlx::PgPool>,
    pub redis_client: Option<redis::Client>,
    pub redis_required: bool,
}
