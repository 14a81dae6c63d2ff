use std::sync::Arc;

use chrono::Utc;
use tessera_core::{AppError, AppResult, MemberId, TenantId};
use tessera_domain::{
    AccessLevel, ActionAccessPolicy, Attributes, Decision, DecisionReason, PermissionDefinition,
    PermissionKey, Principal, ResourceRef,
};
use tracing::{debug, error, warn};

use crate::{
    DecisionCache, DecisionCacheKey, MembershipGraph, OverrideStore, PermissionCatalog,
    ResourceGrantStore, RoleStore,
};

mod context;
mod overrides;
mod resource_grants;
mod roles;


pub use context::PermissionContext;

/// Default lifetime of cached decisions.
pub const DEFAULT_DECISION_CACHE_TTL_SECONDS: u32 = 5;

/// One authorization question.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizeRequest {
    /// Tenant the caller acts in.
    pub tenant_id: TenantId,
    /// Member being authorized.
    pub principal_id: MemberId,
    /// Requested permission.
    pub permission_key: PermissionKey,
    /// Attribute context for conditions.
    pub attributes: Attributes,
    /// Optional object-level check.
    pub resource: Option<ResourceRequest>,
}

/// Object-level part of an authorization question.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRequest {
    /// Resource instance.
    pub resource: ResourceRef,
    /// Level required on the instance. Derived from the action when absent.
    pub required_access_level: Option<AccessLevel>,
}

/// Store ports consumed by the resolver.
#[derive(Clone)]
pub struct PermissionStores {
    /// Permission catalog.
    pub catalog: Arc<dyn PermissionCatalog>,
    /// Role edges.
    pub roles: Arc<dyn RoleStore>,
    /// Principals, role assignments and teams.
    pub memberships: Arc<dyn MembershipGraph>,
    /// Member overrides.
    pub overrides: Arc<dyn OverrideStore>,
    /// Resource grants.
    pub resource_grants: Arc<dyn ResourceGrantStore>,
}

impl PermissionStores {
    /// Uses one adapter for every store port.
    #[must_use]
    pub fn from_shared<T>(store: Arc<T>) -> Self
    where
        T: PermissionCatalog
            + RoleStore
            + MembershipGraph
            + OverrideStore
            + ResourceGrantStore
            + 'static,
    {
        Self {
            catalog: store.clone(),
            roles: store.clone(),
            memberships: store.clone(),
            overrides: store.clone(),
            resource_grants: store,
        }
    }
}

/// Stateless decision engine combining overrides, roles and resource grants.
#[derive(Clone)]
pub struct PermissionResolver {
    stores: PermissionStores,
    cache: Option<Arc<dyn DecisionCache>>,
    cache_ttl_seconds: u32,
    action_policy: ActionAccessPolicy,
}

impl PermissionResolver {
    /// Creates a resolver without decision caching.
    #[must_use]
    pub fn new(stores: PermissionStores) -> Self {
        Self {
            stores,
            cache: None,
            cache_ttl_seconds: DEFAULT_DECISION_CACHE_TTL_SECONDS,
            action_policy: ActionAccessPolicy::default(),
        }
    }

    /// Enables decision caching. A ttl of zero disables it again.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn DecisionCache>, ttl_seconds: u32) -> Self {
        self.cache = (ttl_seconds > 0).then_some(cache);
        self.cache_ttl_seconds = ttl_seconds;
        self
    }

    /// Replaces the action to required-level mapping for resource checks.
    #[must_use]
    pub fn with_action_policy(mut self, action_policy: ActionAccessPolicy) -> Self {
        self.action_policy = action_policy;
        self
    }

    /// Decides one request.
    ///
    /// Unknown permissions, unknown members and tenant mismatches are
    /// errors, as are store failures. Use [`Self::decide`] to turn store
    /// failures into a degraded deny.
    pub async fn authorize(&self, request: &AuthorizeRequest) -> AppResult<Decision> {
        let permission = self.active_permission(&request.permission_key).await?;
        let principal = self.principal_for(request).await?;
        let evaluated_at = Utc::now();

        if !principal.is_active {
            debug!(
                tenant_id = %request.tenant_id,
                principal_id = %request.principal_id,
                permission = %request.permission_key,
                "principal is inactive"
            );
            return Ok(Decision::from_reason(
                DecisionReason::NoMatchingRule,
                evaluated_at,
            ));
        }

        let resource = request.resource.as_ref().map(|resource| {
            let required_level = resource
                .required_access_level
                .unwrap_or_else(|| self.action_policy.required_level(permission.action()));
            (resource.resource.clone(), required_level)
        });

        let cache_key = match self.cache {
            Some(_) => Some(DecisionCacheKey::new(
                request.tenant_id,
                request.principal_id,
                request.permission_key.clone(),
                resource.clone(),
                &request.attributes,
            )?),
            None => None,
        };

        if let Some(decision) = self.cached_decision(cache_key.as_ref()).await {
            return Ok(decision);
        }

        let context = PermissionContext::load(
            self.stores.memberships.as_ref(),
            &principal,
            evaluated_at,
        )
        .await?;
        let reason = self.resolve(&context, request, resource.as_ref()).await?;
        let decision = Decision::from_reason(reason, evaluated_at);

        debug!(
            tenant_id = %request.tenant_id,
            principal_id = %request.principal_id,
            permission = %request.permission_key,
            reason = reason.as_str(),
            allowed = decision.allowed(),
            "authorization decided"
        );

        self.remember_decision(cache_key.as_ref(), decision).await;

        Ok(decision)
    }

    /// Decides one request, denying with a degraded decision when a store
    /// lookup fails.
    pub async fn decide(&self, request: &AuthorizeRequest) -> AppResult<Decision> {
        match self.authorize(request).await {
            Err(AppError::StoreUnavailable(detail)) => {
                error!(
                    tenant_id = %request.tenant_id,
                    principal_id = %request.principal_id,
                    permission = %request.permission_key,
                    detail = %detail,
                    "store unavailable, denying"
                );
                Ok(Decision::fail_closed(Utc::now()))
            }
            result => result,
        }
    }

    async fn resolve(
        &self,
        context: &PermissionContext,
        request: &AuthorizeRequest,
        resource: Option<&(ResourceRef, AccessLevel)>,
    ) -> AppResult<DecisionReason> {
        if let Some(reason) = self.override_reason(context, request).await? {
            return Ok(reason);
        }

        let role_reason = self.role_reason(context, request).await?;

        match (role_reason, resource) {
            (Some(DecisionReason::RoleDeny), _) => Ok(DecisionReason::RoleDeny),
            (Some(reason), None) => Ok(reason),
            (None, None) => Ok(DecisionReason::NoMatchingRule),
            (tentative, Some((resource, required_level))) => {
                self.resource_reason(
                    context,
                    request,
                    resource,
                    *required_level,
                    tentative.is_some(),
                )
                .await
            }
        }
    }

    async fn active_permission(&self, key: &PermissionKey) -> AppResult<PermissionDefinition> {
        match self.stores.catalog.find_permission(key).await? {
            Some(permission) if permission.is_active() && permission.key() == key => Ok(permission),
            _ => Err(AppError::UnknownPermission(key.to_string())),
        }
    }

    async fn principal_for(&self, request: &AuthorizeRequest) -> AppResult<Principal> {
        let principal = self
            .stores
            .memberships
            .find_principal(request.principal_id)
            .await?
            .filter(|principal| principal.member_id == request.principal_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("principal '{}' not found", request.principal_id))
            })?;

        if principal.tenant_id != request.tenant_id {
            return Err(AppError::TenantMismatch {
                requested: request.tenant_id,
                actual: principal.tenant_id,
            });
        }

        Ok(principal)
    }

    async fn cached_decision(&self, key: Option<&DecisionCacheKey>) -> Option<Decision> {
        let (cache, key) = (self.cache.as_ref()?, key?);

        match cache.get_decision(key).await {
            Ok(decision) => decision.filter(|decision| !decision.is_degraded()),
            Err(error) => {
                warn!(
                    tenant_id = %key.tenant_id,
                    principal_id = %key.principal_id,
                    error = %error,
                    "decision cache read failed, resolving from stores"
                );
                None
            }
        }
    }

    async fn remember_decision(&self, key: Option<&DecisionCacheKey>, decision: Decision) {
        let (Some(cache), Some(key)) = (self.cache.as_ref(), key) else {
            return;
        };

        if decision.is_degraded() {
            return;
        }

        if let Err(error) = cache
            .set_decision(key, decision, self.cache_ttl_seconds)
            .await
        {
            warn!(
                tenant_id = %key.tenant_id,
                principal_id = %key.principal_id,
                error = %error,
                "decision cache write failed"
            );
        }
    }
}
