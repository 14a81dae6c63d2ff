use super::*;

impl PostgresAuthorizationRepository {
    pub(super) async fn list_role_permissions_impl(
        &self,
        tenant_id: TenantId,
        role_ids: &[RoleId],
        permission_key: &PermissionKey,
    ) -> AppResult<Vec<RolePermission>> {
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }

        let role_ids: Vec<uuid::Uuid> = role_ids.iter().map(RoleId::as_uuid).collect();
        let rows = sqlx::query_as::<_, RolePermissionRow>(
            r#"
            SELECT
                role_permissions.role_id,
                roles.tenant_id AS role_tenant_id,
                role_permissions.permission_key,
                role_permissions.effect,
                role_permissions.conditions
            FROM role_permissions
            INNER JOIN roles
                ON roles.id = role_permissions.role_id
            LEFT JOIN tenants
                ON tenants.id = roles.tenant_id
            WHERE role_permissions.role_id = ANY($2)
                AND role_permissions.permission_key = $3
                AND (roles.tenant_id = $1 OR roles.tenant_id IS NULL)
                AND roles.is_active
                AND roles.deleted_at IS NULL
                AND tenants.deleted_at IS NULL
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_ids)
        .bind(permission_key.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| read_error("load role permissions", error))?;

        rows.into_iter().map(RolePermission::try_from).collect()
    }
}
