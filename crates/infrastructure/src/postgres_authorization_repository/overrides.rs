use super::*;

impl PostgresAuthorizationRepository {
    pub(super) async fn find_member_override_impl(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
        permission_key: &PermissionKey,
    ) -> AppResult<Option<MemberPermissionOverride>> {
        let row = sqlx::query_as::<_, OverrideRow>(
            r#"
            SELECT
                overrides.tenant_id,
                overrides.membership_id,
                overrides.permission_key,
                overrides.effect,
                overrides.conditions
            FROM member_permission_overrides AS overrides
            INNER JOIN tenants
                ON tenants.id = overrides.tenant_id
            WHERE overrides.tenant_id = $1
                AND overrides.membership_id = $2
                AND overrides.permission_key = $3
                AND overrides.deleted_at IS NULL
                AND tenants.deleted_at IS NULL
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(member_id.as_uuid())
        .bind(permission_key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| read_error("load member override", error))?;

        row.map(MemberPermissionOverride::try_from).transpose()
    }
}
