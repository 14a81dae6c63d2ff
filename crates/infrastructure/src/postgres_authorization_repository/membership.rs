use super::*;

impl PostgresAuthorizationRepository {
    pub(super) async fn find_principal_impl(
        &self,
        member_id: MemberId,
    ) -> AppResult<Option<Principal>> {
        let row = sqlx::query_as::<_, PrincipalRow>(
            r#"
            SELECT
                memberships.id AS member_id,
                memberships.tenant_id,
                (
                    memberships.is_active
                    AND memberships.deleted_at IS NULL
                    AND tenants.deleted_at IS NULL
                ) AS is_active
            FROM memberships
            INNER JOIN tenants
                ON tenants.id = memberships.tenant_id
            WHERE memberships.id = $1
            "#,
        )
        .bind(member_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| read_error("load principal", error))?;

        Ok(row.map(Principal::from))
    }

    pub(super) async fn list_member_roles_impl(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
    ) -> AppResult<Vec<MemberRole>> {
        let rows = sqlx::query_as::<_, MemberRoleRow>(
            r#"
            SELECT
                member_roles.tenant_id,
                member_roles.membership_id,
                member_roles.role_id,
                member_roles.assigned_by,
                member_roles.is_active,
                member_roles.assigned_at,
                member_roles.revoked_at
            FROM member_roles
            INNER JOIN tenants
                ON tenants.id = member_roles.tenant_id
            WHERE member_roles.tenant_id = $1
                AND member_roles.membership_id = $2
                AND tenants.deleted_at IS NULL
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(member_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| read_error("load member roles", error))?;

        Ok(rows.into_iter().map(MemberRole::from).collect())
    }

    pub(super) async fn list_team_memberships_impl(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
    ) -> AppResult<Vec<TeamMember>> {
        let rows = sqlx::query_as::<_, TeamMemberRow>(
            r#"
            SELECT
                team_members.tenant_id,
                team_members.team_id,
                team_members.membership_id,
                team_members.is_active,
                team_members.joined_at,
                team_members.left_at
            FROM team_members
            INNER JOIN teams
                ON teams.tenant_id = team_members.tenant_id
                AND teams.id = team_members.team_id
            INNER JOIN tenants
                ON tenants.id = team_members.tenant_id
            WHERE team_members.tenant_id = $1
                AND team_members.membership_id = $2
                AND teams.deleted_at IS NULL
                AND tenants.deleted_at IS NULL
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(member_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| read_error("load team memberships", error))?;

        Ok(rows.into_iter().map(TeamMember::from).collect())
    }

    pub(super) async fn list_team_roles_impl(
        &self,
        tenant_id: TenantId,
        team_ids: &[TeamId],
    ) -> AppResult<Vec<TeamRole>> {
        if team_ids.is_empty() {
            return Ok(Vec::new());
        }

        let team_ids: Vec<uuid::Uuid> = team_ids.iter().map(TeamId::as_uuid).collect();
        let rows = sqlx::query_as::<_, TeamRoleRow>(
            r#"
            SELECT
                team_roles.tenant_id,
                team_roles.team_id,
                team_roles.role_id,
                team_roles.assigned_by,
                team_roles.is_active,
                team_roles.assigned_at,
                team_roles.revoked_at
            FROM team_roles
            INNER JOIN teams
                ON teams.tenant_id = team_roles.tenant_id
                AND teams.id = team_roles.team_id
            INNER JOIN tenants
                ON tenants.id = team_roles.tenant_id
            WHERE team_roles.tenant_id = $1
                AND team_roles.team_id = ANY($2)
                AND teams.deleted_at IS NULL
                AND tenants.deleted_at IS NULL
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(team_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| read_error("load team roles", error))?;

        Ok(rows.into_iter().map(TeamRole::from).collect())
    }
}
