use super::*;

impl PostgresAuthorizationRepository {
    pub(super) async fn list_resource_grants_impl(
        &self,
        tenant_id: TenantId,
        resource: &ResourceRef,
        subjects: &[GrantSubject],
    ) -> AppResult<Vec<ResourceGrant>> {
        let (member_ids, team_ids): (Vec<uuid::Uuid>, Vec<uuid::Uuid>) = subjects.iter().fold(
            (Vec::new(), Vec::new()),
            |(mut member_ids, mut team_ids), subject| {
                match subject {
                    GrantSubject::Member(member_id) => member_ids.push(member_id.as_uuid()),
                    GrantSubject::Team(team_id) => team_ids.push(team_id.as_uuid()),
                }
                (member_ids, team_ids)
            },
        );

        if member_ids.is_empty() && team_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, ResourceGrantRow>(
            r#"
            SELECT
                grants.tenant_id,
                grants.subject_type,
                grants.subject_id,
                grants.resource_type,
                grants.resource_id,
                grants.access_level,
                grants.conditions
            FROM resource_grants AS grants
            INNER JOIN tenants
                ON tenants.id = grants.tenant_id
            WHERE grants.tenant_id = $1
                AND grants.resource_type = $2
                AND grants.resource_id = $3
                AND grants.deleted_at IS NULL
                AND tenants.deleted_at IS NULL
                AND (
                    (grants.subject_type = 'member' AND grants.subject_id = ANY($4))
                    OR (grants.subject_type = 'team' AND grants.subject_id = ANY($5))
                )
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(resource.resource_type())
        .bind(resource.resource_id())
        .bind(member_ids)
        .bind(team_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| read_error("load resource grants", error))?;

        rows.into_iter().map(ResourceGrant::try_from).collect()
    }
}
