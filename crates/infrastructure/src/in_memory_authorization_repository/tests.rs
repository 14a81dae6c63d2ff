use std::sync::Arc;

use chrono::Utc;
use tessera_application::{
    AuthorizationAdminService, AuthorizeRequest, MembershipGraph, PermissionResolver,
    PermissionStores, ResourceRequest,
};
use tessera_core::{AppError, MemberId, RoleId, TeamId, TenantId};
use tessera_domain::{
    AccessLevel, Attributes, Condition, DecisionReason, Effect, GrantSubject,
    MemberPermissionOverride, PermissionDefinition, PermissionKey, Principal, ResourceGrant,
    ResourceRef, RoleDefinition, RoleScope, SystemRole, Team,
};

use super::InMemoryAuthorizationRepository;
use crate::InMemoryDecisionCache;

struct Fixture {
    repository: Arc<InMemoryAuthorizationRepository>,
    resolver: PermissionResolver,
    admin: AuthorizationAdminService,
}

impl Fixture {
    fn new() -> Self {
        let repository = Arc::new(InMemoryAuthorizationRepository::new());
        let cache = Arc::new(InMemoryDecisionCache::new());
        let resolver = PermissionResolver::new(PermissionStores::from_shared(repository.clone()))
            .with_cache(cache.clone(), 60);
        let admin = AuthorizationAdminService::new(repository.clone()).with_decision_cache(cache);

        Self {
            repository,
            resolver,
            admin,
        }
    }

    async fn permission(&self, key: &str) -> PermissionKey {
        let key = PermissionKey::new(key).unwrap_or_else(|_| unreachable!());
        let definition = PermissionDefinition::new(key.clone(), key.as_str(), None, true)
            .unwrap_or_else(|_| unreachable!());
        self.repository.insert_permission(definition).await;
        key
    }

    async fn member(&self, tenant_id: TenantId) -> MemberId {
        let member_id = MemberId::new();
        self.repository
            .insert_principal(Principal {
                member_id,
                tenant_id,
                is_active: true,
            })
            .await;
        member_id
    }

    async fn tenant_role(&self, tenant_id: TenantId, key: &str) -> RoleId {
        let role_id = RoleId::new();
        let role = RoleDefinition::new(role_id, RoleScope::Tenant(tenant_id), key, key, None)
            .unwrap_or_else(|_| unreachable!());
        self.repository.insert_role(role).await;
        role_id
    }

    async fn team(&self, tenant_id: TenantId, slug: &str) -> TeamId {
        let team_id = TeamId::new();
        let team = Team::new(team_id, tenant_id, slug, slug).unwrap_or_else(|_| unreachable!());
        self.repository.insert_team(team).await;
        team_id
    }

    async fn reason(&self, request: &AuthorizeRequest) -> Option<DecisionReason> {
        self.resolver
            .authorize(request)
            .await
            .map(|decision| decision.reason())
            .ok()
    }
}

fn request(tenant_id: TenantId, member_id: MemberId, key: &PermissionKey) -> AuthorizeRequest {
    AuthorizeRequest {
        tenant_id,
        principal_id: member_id,
        permission_key: key.clone(),
        attributes: Attributes::new(),
        resource: None,
    }
}

#[tokio::test]
async fn revoking_a_role_takes_effect_despite_cached_allow() {
    let fixture = Fixture::new();
    let tenant_id = TenantId::new();
    let key = fixture.permission("invoices.approve").await;
    let member_id = fixture.member(tenant_id).await;
    let role_id = fixture.tenant_role(tenant_id, "approver").await;

    assert!(
        fixture
            .admin
            .set_role_permission(tenant_id, role_id, &key, Effect::Allow, None)
            .await
            .is_ok()
    );
    assert!(
        fixture
            .admin
            .assign_member_role(tenant_id, member_id, role_id, None)
            .await
            .is_ok()
    );

    let request = request(tenant_id, member_id, &key);
    assert_eq!(fixture.reason(&request).await, Some(DecisionReason::RoleAllow));
    assert_eq!(fixture.reason(&request).await, Some(DecisionReason::RoleAllow));

    assert!(
        fixture
            .admin
            .revoke_member_role(tenant_id, member_id, role_id)
            .await
            .is_ok()
    );
    assert_eq!(
        fixture.reason(&request).await,
        Some(DecisionReason::NoMatchingRule)
    );
}

#[tokio::test]
async fn deleting_another_tenants_data_leaves_decisions_unchanged() {
    let fixture = Fixture::new();
    let tenant_id = TenantId::new();
    let other_tenant_id = TenantId::new();
    let key = fixture.permission("documents.read").await;
    let member_id = fixture.member(tenant_id).await;
    let other_member_id = fixture.member(other_tenant_id).await;
    let role_id = fixture.tenant_role(tenant_id, "reader").await;
    let other_role_id = fixture.tenant_role(other_tenant_id, "reader").await;

    for (tenant, role, member) in [
        (tenant_id, role_id, member_id),
        (other_tenant_id, other_role_id, other_member_id),
    ] {
        assert!(
            fixture
                .admin
                .set_role_permission(tenant, role, &key, Effect::Allow, None)
                .await
                .is_ok()
        );
        assert!(
            fixture
                .admin
                .assign_member_role(tenant, member, role, None)
                .await
                .is_ok()
        );
    }

    let request = request(tenant_id, member_id, &key);
    let before = fixture.reason(&request).await;

    assert!(
        fixture
            .admin
            .revoke_member_role(other_tenant_id, other_member_id, other_role_id)
            .await
            .is_ok()
    );
    fixture.repository.delete_tenant(other_tenant_id).await;

    assert_eq!(before, Some(DecisionReason::RoleAllow));
    assert_eq!(fixture.reason(&request).await, before);
}

#[tokio::test]
async fn roles_of_another_tenant_cannot_be_assigned() {
    let fixture = Fixture::new();
    let tenant_id = TenantId::new();
    let other_tenant_id = TenantId::new();
    let member_id = fixture.member(tenant_id).await;
    let foreign_role = fixture.tenant_role(other_tenant_id, "auditor").await;

    let result = fixture
        .admin
        .assign_member_role(tenant_id, member_id, foreign_role, None)
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn system_role_templates_are_assignable_but_read_only() {
    let fixture = Fixture::new();
    let tenant_id = TenantId::new();
    let key = fixture.permission("documents.read").await;
    let member_id = fixture.member(tenant_id).await;
    let viewer_id = RoleId::new();
    fixture
        .repository
        .insert_role(
            RoleDefinition::system(viewer_id, SystemRole::Viewer)
                .unwrap_or_else(|_| unreachable!()),
        )
        .await;

    let edit = fixture
        .admin
        .set_role_permission(tenant_id, viewer_id, &key, Effect::Allow, None)
        .await;
    assert!(matches!(edit, Err(AppError::Forbidden(_))));

    let assignment = fixture
        .admin
        .assign_member_role(tenant_id, member_id, viewer_id, None)
        .await;
    assert!(assignment.is_ok());
}

#[tokio::test]
async fn team_membership_is_idempotent_and_removal_is_immediate() {
    let fixture = Fixture::new();
    let tenant_id = TenantId::new();
    let key = fixture.permission("reports.export").await;
    let member_id = fixture.member(tenant_id).await;
    let team_id = fixture.team(tenant_id, "finance").await;
    let role_id = fixture.tenant_role(tenant_id, "exporter").await;

    assert!(
        fixture
            .admin
            .set_role_permission(tenant_id, role_id, &key, Effect::Allow, None)
            .await
            .is_ok()
    );
    assert!(
        fixture
            .admin
            .assign_team_role(tenant_id, team_id, role_id, None)
            .await
            .is_ok()
    );

    let first = fixture
        .admin
        .add_team_member(tenant_id, team_id, member_id)
        .await;
    let second = fixture
        .admin
        .add_team_member(tenant_id, team_id, member_id)
        .await;
    assert!(first.is_ok() && second.is_ok());
    let joined_at = first.map(|membership| membership.lifecycle.created_at()).ok();
    assert_eq!(
        second.map(|membership| membership.lifecycle.created_at()).ok(),
        joined_at
    );

    let memberships = fixture
        .repository
        .list_team_memberships(tenant_id, member_id)
        .await
        .unwrap_or_default();
    assert_eq!(memberships.len(), 1);

    let request = request(tenant_id, member_id, &key);
    assert_eq!(fixture.reason(&request).await, Some(DecisionReason::RoleAllow));

    assert!(
        fixture
            .admin
            .remove_team_member(tenant_id, team_id, member_id)
            .await
            .is_ok()
    );
    assert_eq!(
        fixture.reason(&request).await,
        Some(DecisionReason::NoMatchingRule)
    );
}

#[tokio::test]
async fn conditional_override_applies_only_to_matching_attributes() {
    let fixture = Fixture::new();
    let tenant_id = TenantId::new();
    let key = fixture.permission("documents.delete").await;
    let member_id = fixture.member(tenant_id).await;

    assert!(
        fixture
            .admin
            .set_member_override(MemberPermissionOverride::new(
                tenant_id,
                member_id,
                key.clone(),
                Effect::Allow,
                Some(Condition::equals("region", "eu")),
            ))
            .await
            .is_ok()
    );

    let mut matching = request(tenant_id, member_id, &key);
    matching.attributes = Attributes::new().with("region", "eu");
    let mut other = request(tenant_id, member_id, &key);
    other.attributes = Attributes::new().with("region", "us");

    assert_eq!(
        fixture.reason(&matching).await,
        Some(DecisionReason::OverrideAllow)
    );
    assert_eq!(
        fixture.reason(&other).await,
        Some(DecisionReason::NoMatchingRule)
    );

    assert!(
        fixture
            .admin
            .delete_member_override(tenant_id, member_id, &key)
            .await
            .is_ok()
    );
    assert_eq!(
        fixture.reason(&matching).await,
        Some(DecisionReason::NoMatchingRule)
    );
}

#[tokio::test]
async fn deleting_a_team_grant_downgrades_the_resource_decision() {
    let fixture = Fixture::new();
    let tenant_id = TenantId::new();
    let key = fixture.permission("projects.write").await;
    let member_id = fixture.member(tenant_id).await;
    let team_id = fixture.team(tenant_id, "builders").await;
    let resource = ResourceRef::new("project", "p-1").unwrap_or_else(|_| unreachable!());

    assert!(
        fixture
            .admin
            .add_team_member(tenant_id, team_id, member_id)
            .await
            .is_ok()
    );
    assert!(
        fixture
            .admin
            .set_resource_grant(ResourceGrant::new(
                tenant_id,
                GrantSubject::Team(team_id),
                resource.clone(),
                AccessLevel::Write,
                None,
            ))
            .await
            .is_ok()
    );

    let mut request = request(tenant_id, member_id, &key);
    request.resource = Some(ResourceRequest {
        resource: resource.clone(),
        required_access_level: None,
    });
    assert_eq!(
        fixture.reason(&request).await,
        Some(DecisionReason::GrantConfirmed)
    );

    assert!(
        fixture
            .admin
            .delete_resource_grant(tenant_id, GrantSubject::Team(team_id), &resource)
            .await
            .is_ok()
    );
    assert_eq!(
        fixture.reason(&request).await,
        Some(DecisionReason::NoMatchingRule)
    );
}

#[tokio::test]
async fn soft_deleted_tenant_denies_its_members() {
    let fixture = Fixture::new();
    let tenant_id = TenantId::new();
    let key = fixture.permission("documents.read").await;
    let member_id = fixture.member(tenant_id).await;

    assert!(
        fixture
            .admin
            .set_member_override(MemberPermissionOverride::new(
                tenant_id,
                member_id,
                key.clone(),
                Effect::Allow,
                None,
            ))
            .await
            .is_ok()
    );

    let request = request(tenant_id, member_id, &key);
    assert_eq!(
        fixture.reason(&request).await,
        Some(DecisionReason::OverrideAllow)
    );

    fixture.repository.delete_tenant(tenant_id).await;

    let principal = fixture.repository.find_principal(member_id).await;
    assert!(principal.is_ok_and(|principal| principal.is_some_and(|value| !value.is_active)));
    assert_eq!(
        fixture.reason(&request).await,
        Some(DecisionReason::NoMatchingRule)
    );
}

#[tokio::test]
async fn conditional_role_deny_needs_its_attribute_present() {
    let fixture = Fixture::new();
    let tenant_id = TenantId::new();
    let key = fixture.permission("contacts.read").await;
    let member_id = fixture.member(tenant_id).await;
    let viewer = fixture.tenant_role(tenant_id, "viewer").await;
    let blocker = fixture.tenant_role(tenant_id, "blocker").await;
    let blocked_ip = Condition::one_of("ip", vec!["6.6.6.6".into()]);

    for (role_id, effect, conditions) in [
        (viewer, Effect::Allow, None),
        (blocker, Effect::Deny, Some(blocked_ip)),
    ] {
        assert!(
            fixture
                .admin
                .set_role_permission(tenant_id, role_id, &key, effect, conditions)
                .await
                .is_ok()
        );
        assert!(
            fixture
                .admin
                .assign_member_role(tenant_id, member_id, role_id, None)
                .await
                .is_ok()
        );
    }

    let without_ip = request(tenant_id, member_id, &key);
    assert_eq!(
        fixture.reason(&without_ip).await,
        Some(DecisionReason::RoleAllow)
    );

    let mut from_blocked_ip = request(tenant_id, member_id, &key);
    from_blocked_ip.attributes = Attributes::new().with("ip", "6.6.6.6");
    assert_eq!(
        fixture.reason(&from_blocked_ip).await,
        Some(DecisionReason::RoleDeny)
    );
}
