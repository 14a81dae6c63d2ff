use sqlx::Row;

use super::*;

impl PostgresAuthorizationRepository {
    pub(super) async fn upsert_role_permission_impl(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
        permission_key: &PermissionKey,
        effect: Effect,
        conditions: Option<Condition>,
    ) -> AppResult<RolePermission> {
        let role = sqlx::query(
            r#"
            SELECT is_system
            FROM roles
            WHERE id = $1
                AND (tenant_id = $2 OR tenant_id IS NULL)
                AND deleted_at IS NULL
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(tenant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| read_error("load role", error))?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "role '{role_id}' does not exist for tenant '{tenant_id}'"
            ))
        })?;

        let is_system: bool = role
            .try_get("is_system")
            .map_err(|error| AppError::Internal(format!("invalid role row: {error}")))?;
        if is_system {
            return Err(AppError::Forbidden(format!(
                "system role '{role_id}' is a read-only template"
            )));
        }

        let row = sqlx::query_as::<_, RolePermissionRow>(
            r#"
            INSERT INTO role_permissions (role_id, permission_key, effect, conditions)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (role_id, permission_key) DO UPDATE
            SET effect = EXCLUDED.effect,
                conditions = EXCLUDED.conditions,
                updated_at = now()
            RETURNING
                role_id,
                $5::UUID AS role_tenant_id,
                permission_key,
                effect,
                conditions
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(permission_key.as_str())
        .bind(effect.as_str())
        .bind(encode_conditions(conditions.as_ref()))
        .bind(tenant_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| write_error("save role permission", error))?;

        RolePermission::try_from(row)
    }

    pub(super) async fn assign_member_role_impl(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
        role_id: RoleId,
        assigned_by: Option<MemberId>,
        at: DateTime<Utc>,
    ) -> AppResult<MemberRole> {
        let row = sqlx::query_as::<_, MemberRoleRow>(
            r#"
            INSERT INTO member_roles (
                tenant_id, membership_id, role_id, assigned_by, is_active, assigned_at
            )
            SELECT $1, $2, roles.id, $4, TRUE, $5
            FROM roles
            WHERE roles.id = $3
                AND (roles.tenant_id = $1 OR roles.tenant_id IS NULL)
                AND roles.deleted_at IS NULL
            ON CONFLICT (membership_id, role_id) DO UPDATE
            SET assigned_by = CASE
                    WHEN member_roles.is_active THEN member_roles.assigned_by
                    ELSE EXCLUDED.assigned_by
                END,
                assigned_at = CASE
                    WHEN member_roles.is_active THEN member_roles.assigned_at
                    ELSE EXCLUDED.assigned_at
                END,
                is_active = TRUE,
                revoked_at = NULL
            RETURNING
                tenant_id, membership_id, role_id, assigned_by, is_active, assigned_at, revoked_at
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(member_id.as_uuid())
        .bind(role_id.as_uuid())
        .bind(assigned_by.map(|value| value.as_uuid()))
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| write_error("assign member role", error))?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "role '{role_id}' does not exist for tenant '{tenant_id}'"
            ))
        })?;

        Ok(MemberRole::from(row))
    }

    pub(super) async fn revoke_member_role_impl(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
        role_id: RoleId,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE member_roles
            SET is_active = FALSE,
                revoked_at = $4
            WHERE tenant_id = $1
                AND membership_id = $2
                AND role_id = $3
                AND is_active
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(member_id.as_uuid())
        .bind(role_id.as_uuid())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|error| write_error("revoke member role", error))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "member '{member_id}' holds no active role '{role_id}' in tenant '{tenant_id}'"
            )));
        }

        Ok(())
    }

    pub(super) async fn add_team_member_impl(
        &self,
        tenant_id: TenantId,
        team_id: TeamId,
        member_id: MemberId,
        at: DateTime<Utc>,
    ) -> AppResult<TeamMember> {
        let row = sqlx::query_as::<_, TeamMemberRow>(
            r#"
            INSERT INTO team_members (tenant_id, team_id, membership_id, is_active, joined_at)
            VALUES ($1, $2, $3, TRUE, $4)
            ON CONFLICT (team_id, membership_id) DO UPDATE
            SET joined_at = CASE
                    WHEN team_members.is_active THEN team_members.joined_at
                    ELSE EXCLUDED.joined_at
                END,
                is_active = TRUE,
                left_at = NULL
            RETURNING tenant_id, team_id, membership_id, is_active, joined_at, left_at
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(team_id.as_uuid())
        .bind(member_id.as_uuid())
        .bind(at)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| write_error("add team member", error))?;

        Ok(TeamMember::from(row))
    }

    pub(super) async fn remove_team_member_impl(
        &self,
        tenant_id: TenantId,
        team_id: TeamId,
        member_id: MemberId,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE team_members
            SET is_active = FALSE,
                left_at = $4
            WHERE tenant_id = $1
                AND team_id = $2
                AND membership_id = $3
                AND is_active
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(team_id.as_uuid())
        .bind(member_id.as_uuid())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|error| write_error("remove team member", error))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "member '{member_id}' is not an active member of team '{team_id}'"
            )));
        }

        Ok(())
    }

    pub(super) async fn assign_team_role_impl(
        &self,
        tenant_id: TenantId,
        team_id: TeamId,
        role_id: RoleId,
        assigned_by: Option<MemberId>,
        at: DateTime<Utc>,
    ) -> AppResult<TeamRole> {
        let row = sqlx::query_as::<_, TeamRoleRow>(
            r#"
            INSERT INTO team_roles (tenant_id, team_id, role_id, assigned_by, is_active, assigned_at)
            SELECT $1, $2, roles.id, $4, TRUE, $5
            FROM roles
            WHERE roles.id = $3
                AND (roles.tenant_id = $1 OR roles.tenant_id IS NULL)
                AND roles.deleted_at IS NULL
            ON CONFLICT (team_id, role_id) DO UPDATE
            SET assigned_by = CASE
                    WHEN team_roles.is_active THEN team_roles.assigned_by
                    ELSE EXCLUDED.assigned_by
                END,
                assigned_at = CASE
                    WHEN team_roles.is_active THEN team_roles.assigned_at
                    ELSE EXCLUDED.assigned_at
                END,
                is_active = TRUE,
                revoked_at = NULL
            RETURNING tenant_id, team_id, role_id, assigned_by, is_active, assigned_at, revoked_at
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(team_id.as_uuid())
        .bind(role_id.as_uuid())
        .bind(assigned_by.map(|value| value.as_uuid()))
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| write_error("assign team role", error))?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "role '{role_id}' does not exist for tenant '{tenant_id}'"
            ))
        })?;

        Ok(TeamRole::from(row))
    }

    pub(super) async fn revoke_team_role_impl(
        &self,
        tenant_id: TenantId,
        team_id: TeamId,
        role_id: RoleId,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE team_roles
            SET is_active = FALSE,
                revoked_at = $4
            WHERE tenant_id = $1
                AND team_id = $2
                AND role_id = $3
                AND is_active
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(team_id.as_uuid())
        .bind(role_id.as_uuid())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|error| write_error("revoke team role", error))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "team '{team_id}' holds no active role '{role_id}' in tenant '{tenant_id}'"
            )));
        }

        Ok(())
    }

    pub(super) async fn upsert_member_override_impl(
        &self,
        value: &MemberPermissionOverride,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO member_permission_overrides (
                tenant_id, membership_id, permission_key, effect, conditions
            )
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (membership_id, permission_key) DO UPDATE
            SET effect = EXCLUDED.effect,
                conditions = EXCLUDED.conditions,
                updated_at = now(),
                deleted_at = NULL
            "#,
        )
        .bind(value.tenant_id().as_uuid())
        .bind(value.member_id().as_uuid())
        .bind(value.permission_key().as_str())
        .bind(value.effect().as_str())
        .bind(encode_conditions(value.conditions()))
        .execute(&self.pool)
        .await
        .map_err(|error| write_error("save member override", error))?;

        Ok(())
    }

    pub(super) async fn delete_member_override_impl(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
        permission_key: &PermissionKey,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE member_permission_overrides
            SET deleted_at = $4,
                updated_at = now()
            WHERE tenant_id = $1
                AND membership_id = $2
                AND permission_key = $3
                AND deleted_at IS NULL
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(member_id.as_uuid())
        .bind(permission_key.as_str())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|error| write_error("delete member override", error))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "member '{member_id}' has no override for '{permission_key}'"
            )));
        }

        Ok(())
    }

    pub(super) async fn upsert_resource_grant_impl(&self, grant: &ResourceGrant) -> AppResult<()> {
        let subject_query = match grant.subject() {
            GrantSubject::Member(_) => {
                "SELECT EXISTS (SELECT 1 FROM memberships WHERE tenant_id = $1 AND id = $2)"
            }
            GrantSubject::Team(_) => {
                "SELECT EXISTS (SELECT 1 FROM teams WHERE tenant_id = $1 AND id = $2)"
            }
        };

        let subject_exists = sqlx::query_scalar::<_, bool>(subject_query)
            .bind(grant.tenant_id().as_uuid())
            .bind(grant.subject().id())
            .fetch_one(&self.pool)
            .await
            .map_err(|error| read_error("check grant subject", error))?;

        if !subject_exists {
            return Err(AppError::NotFound(format!(
                "{} '{}' does not exist for tenant '{}'",
                grant.subject().kind(),
                grant.subject().id(),
                grant.tenant_id()
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO resource_grants (
                tenant_id, subject_type, subject_id, resource_type, resource_id,
                access_level, conditions
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (tenant_id, subject_type, subject_id, resource_type, resource_id)
            DO UPDATE
            SET access_level = EXCLUDED.access_level,
                conditions = EXCLUDED.conditions,
                updated_at = now(),
                deleted_at = NULL
            "#,
        )
        .bind(grant.tenant_id().as_uuid())
        .bind(grant.subject().kind())
        .bind(grant.subject().id())
        .bind(grant.resource().resource_type())
        .bind(grant.resource().resource_id())
        .bind(grant.access_level().as_str())
        .bind(encode_conditions(grant.conditions()))
        .execute(&self.pool)
        .await
        .map_err(|error| write_error("save resource grant", error))?;

        Ok(())
    }

    pub(super) async fn delete_resource_grant_impl(
        &self,
        tenant_id: TenantId,
        subject: GrantSubject,
        resource: &ResourceRef,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE resource_grants
            SET deleted_at = $6,
                updated_at = now()
            WHERE tenant_id = $1
                AND subject_type = $2
                AND subject_id = $3
                AND resource_type = $4
                AND resource_id = $5
                AND deleted_at IS NULL
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(subject.kind())
        .bind(subject.id())
        .bind(resource.resource_type())
        .bind(resource.resource_id())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|error| write_error("delete resource grant", error))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "no live grant on '{resource}' for {} '{}'",
                subject.kind(),
                subject.id()
            )));
        }

        Ok(())
    }
}
