use super::*;

impl PostgresAuthorizationRepository {
    pub(super) async fn find_permission_impl(
        &self,
        key: &PermissionKey,
    ) -> AppResult<Option<PermissionDefinition>> {
        let row = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT key, name, description, is_active
            FROM permissions
            WHERE key = $1
            "#,
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| read_error("load permission", error))?;

        row.map(PermissionDefinition::try_from).transpose()
    }
}
