use redis::AsyncCommands;

use crate::dto::HealthDependencyStatus;

pub(super) async fn check_postgres(pool: sqlx::PgPool) -> HealthDependencyStatus {
    let check = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&pool)
        .await;

    match check {
        Ok(_) => HealthDependencyStatus::ok(),
        Err(error) => HealthDependencyStatus::error(format!("postgres check failed: {error}")),
    }
}

pub(super) async fn check_redis(
    redis_client: Option<redis::Client>,
    redis_required: bool,
) -> HealthDependencyStatus {
    let Some(redis_client) = redis_client else {
        return if redis_required {
            HealthDependencyStatus::error("redis client is not configured".to_owned())
        } else {
            HealthDependencyStatus::disabled()
        };
    };

    let mut connection = match redis_client.get_multiplexed_async_connection().await {
        Ok(connection) => connection,
        Err(error) => {
            return HealthDependencyStatus::error(format!("redis connection failed: {error}"));
        }
    };

    match connection.ping::<String>().await {
        Ok(value) if value.eq_ignore_ascii_case("pong") => HealthDependencyStatus::ok(),
        Ok(value) => {
            HealthDependencyStatus::error(format!("unexpected redis ping response: {value}"))
        }
        Err(error) => HealthDependencyStatus::error(format!("redis ping failed: {error}")),
    }
}

#[cfg(test)]
mod tests {
    use super::check_redis;

    #[tokio::test]
    async fn missing_redis_client_is_disabled_unless_required() {
        assert_eq!(check_redis(None, false).await.status, "disabled");
        assert_eq!(check_redis(None, true).await.status, "error");
    }
}
