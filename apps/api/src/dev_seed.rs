use std::sync::Arc;

use tessera_application::AuthorizationAdminService;
use tessera_core::{AppResult, MemberId, RoleId, TeamId, TenantId};
use tessera_domain::{
    AccessLevel, Effect, GrantSubject, PermissionDefinition, PermissionKey, Principal,
    ResourceGrant, ResourceRef, RoleDefinition, RoleScope, Team,
};
use tessera_infrastructure::InMemoryAuthorizationRepository;
use tracing::info;

const DEV_SEED_TENANT_ID: &str = "11111111-1111-1111-1111-111111111111";
const DEV_SEED_ADMIN_MEMBER_ID: &str = "a2c8ea5f-4f39-4724-97f5-932f97f54f76";
const DEV_SEED_STANDARD_MEMBER_ID: &str = "96d11e90-7403-4654-9727-cb1043f8bd31";
const DEV_SEED_VIEWER_ROLE_ID: &str = "4b0f3c51-6a0e-4d8e-9d34-0c6f1e2a7b10";
const DEV_SEED_MANAGER_ROLE_ID: &str = "c7d2a9e4-1f53-4b6a-8e0d-5a9b3c2d1e20";
const DEV_SEED_SALES_ADMIN_ROLE_ID: &str = "e1a4b7c0-9d3f-4e2a-b5c8-7f6e5d4c3b30";
const DEV_SEED_SALES_TEAM_ID: &str = "5d6e7f80-2a3b-4c5d-8e9f-0a1b2c3d4e40";
const DEV_SEED_BUSINESS_ID: &str = "B1";

const DEV_SEED_PERMISSIONS: &[(&str, &str)] = &[
    ("contacts.read", "Read contacts"),
    ("contacts.write", "Edit contacts"),
    ("deals.write", "Edit deals"),
    ("business.read", "Read businesses"),
    ("business.write", "Edit businesses"),
];

/// Fills an in-memory store with one tenant so a local API answers
/// meaningful decisions.
///
/// The admin member holds `manager` and may do everything seeded. The
/// standard member holds `viewer`, inherits `sales_admin` through the
/// `sales` team and has read access to business `B1`.
pub async fn run(repository: Arc<InMemoryAuthorizationRepository>) -> AppResult<()> {
    let tenant_id = TenantId::parse(DEV_SEED_TENANT_ID)?;
    let admin_member_id = MemberId::parse(DEV_SEED_ADMIN_MEMBER_ID)?;
    let standard_member_id = MemberId::parse(DEV_SEED_STANDARD_MEMBER_ID)?;
    let viewer_role_id = RoleId::parse(DEV_SEED_VIEWER_ROLE_ID)?;
    let manager_role_id = RoleId::parse(DEV_SEED_MANAGER_ROLE_ID)?;
    let sales_admin_role_id = RoleId::parse(DEV_SEED_SALES_ADMIN_ROLE_ID)?;
    let sales_team_id = TeamId::parse(DEV_SEED_SALES_TEAM_ID)?;

    for (key, name) in DEV_SEED_PERMISSIONS {
        repository
            .insert_permission(PermissionDefinition::new(
                PermissionKey::new(*key)?,
                *name,
                None,
                true,
            )?)
            .await;
    }

    for member_id in [admin_member_id, standard_member_id] {
        repository
            .insert_principal(Principal {
                member_id,
                tenant_id,
                is_active: true,
            })
            .await;
    }

    for (role_id, key, name) in [
        (viewer_role_id, "viewer", "Viewer"),
        (manager_role_id, "manager", "Manager"),
        (sales_admin_role_id, "sales_admin", "Sales Admin"),
    ] {
        repository
            .insert_role(RoleDefinition::new(
                role_id,
                RoleScope::Tenant(tenant_id),
                key,
                name,
                None,
            )?)
            .await;
    }

    repository
        .insert_team(Team::new(sales_team_id, tenant_id, "Sales", "sales")?)
        .await;

    let admin = AuthorizationAdminService::new(repository);

    for (key, _) in DEV_SEED_PERMISSIONS {
        admin
            .set_role_permission(
                tenant_id,
                manager_role_id,
                &PermissionKey::new(*key)?,
                Effect::Allow,
                None,
            )
            .await?;
    }

    for (role_id, key) in [
        (viewer_role_id, "contacts.read"),
        (viewer_role_id, "business.read"),
        (sales_admin_role_id, "deals.write"),
        (sales_admin_role_id, "business.write"),
    ] {
        admin
            .set_role_permission(tenant_id, role_id, &PermissionKey::new(key)?, Effect::Allow, None)
            .await?;
    }

    admin
        .assign_member_role(tenant_id, admin_member_id, manager_role_id, None)
        .await?;
    admin
        .assign_member_role(
            tenant_id,
            standard_member_id,
            viewer_role_id,
            Some(admin_member_id),
        )
        .await?;
    admin
        .add_team_member(tenant_id, sales_team_id, standard_member_id)
        .await?;
    admin
        .assign_team_role(
            tenant_id,
            sales_team_id,
            sales_admin_role_id,
            Some(admin_member_id),
        )
        .await?;

    let business = ResourceRef::new("business", DEV_SEED_BUSINESS_ID)?;
    admin
        .set_resource_grant(ResourceGrant::new(
            tenant_id,
            GrantSubject::Member(admin_member_id),
            business.clone(),
            AccessLevel::Full,
            None,
        ))
        .await?;
    admin
        .set_resource_grant(ResourceGrant::new(
            tenant_id,
            GrantSubject::Member(standard_member_id),
            business,
            AccessLevel::Read,
            None,
        ))
        .await?;

    info!(
        tenant_id = %tenant_id,
        admin_member_id = %admin_member_id,
        standard_member_id = %standard_member_id,
        "development authorization data seeded"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tessera_application::{
        AuthorizeRequest, PermissionResolver, PermissionStores, ResourceRequest,
    };
    use tessera_core::{MemberId, TenantId};
    use tessera_domain::{Attributes, DecisionReason, PermissionKey, ResourceRef};
    use tessera_infrastructure::InMemoryAuthorizationRepository;

    use super::{
        DEV_SEED_ADMIN_MEMBER_ID, DEV_SEED_BUSINESS_ID, DEV_SEED_STANDARD_MEMBER_ID,
        DEV_SEED_TENANT_ID, run,
    };

    async fn seeded_resolver() -> PermissionResolver {
        let repository = Arc::new(InMemoryAuthorizationRepository::new());
        assert!(run(repository.clone()).await.is_ok());
        PermissionResolver::new(PermissionStores::from_shared(repository))
    }

    fn request(member_id: &str, key: &str, resource: Option<ResourceRequest>) -> AuthorizeRequest {
        AuthorizeRequest {
            tenant_id: TenantId::parse(DEV_SEED_TENANT_ID).unwrap_or_else(|_| unreachable!()),
            principal_id: MemberId::parse(member_id).unwrap_or_else(|_| unreachable!()),
            permission_key: PermissionKey::new(key).unwrap_or_else(|_| unreachable!()),
            attributes: Attributes::new(),
            resource,
        }
    }

    fn business() -> Option<ResourceRequest> {
        Some(ResourceRequest {
            resource: ResourceRef::new("business", DEV_SEED_BUSINESS_ID)
                .unwrap_or_else(|_| unreachable!()),
            required_access_level: None,
        })
    }

    async fn reason(resolver: &PermissionResolver, request: &AuthorizeRequest) -> DecisionReason {
        resolver
            .authorize(request)
            .await
            .map(|decision| decision.reason())
            .unwrap_or_else(|error| panic!("seeded request failed: {error}"))
    }

    #[tokio::test]
    async fn seeded_store_answers_role_and_grant_decisions() {
        let resolver = seeded_resolver().await;

        let cases = [
            (DEV_SEED_STANDARD_MEMBER_ID, "contacts.read", None, DecisionReason::RoleAllow),
            (DEV_SEED_STANDARD_MEMBER_ID, "deals.write", None, DecisionReason::RoleAllow),
            (DEV_SEED_STANDARD_MEMBER_ID, "contacts.write", None, DecisionReason::NoMatchingRule),
            (
                DEV_SEED_STANDARD_MEMBER_ID,
                "business.write",
                business(),
                DecisionReason::InsufficientGrant,
            ),
            (DEV_SEED_ADMIN_MEMBER_ID, "business.write", business(), DecisionReason::GrantConfirmed),
        ];

        for (member_id, key, resource, expected) in cases {
            let request = request(member_id, key, resource);
            assert_eq!(reason(&resolver, &request).await, expected, "{member_id} {key}");
        }
    }

    #[tokio::test]
    async fn seeding_twice_is_harmless() {
        let repository = Arc::new(InMemoryAuthorizationRepository::new());
        assert!(run(repository.clone()).await.is_ok());
        assert!(run(repository.clone()).await.is_ok());

        let resolver = PermissionResolver::new(PermissionStores::from_shared(repository));
        let request = request(DEV_SEED_STANDARD_MEMBER_ID, "deals.write", None);
        assert_eq!(reason(&resolver, &request).await, DecisionReason::RoleAllow);
    }
}
