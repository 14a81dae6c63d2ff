//! Application services and ports.

#![forbid(unsafe_code)]

mod authorization_admin_service;
mod authorization_ports;
mod permission_resolver;

pub use authorization_admin_service::AuthorizationAdminService;
pub use authorization_ports::{
    AuthorizationAdminRepository, DecisionCache, DecisionCacheKey, MembershipGraph,
    OverrideStore, PermissionCatalog, ResourceGrantStore, RoleStore,
};
pub use permission_resolver::{
    AuthorizeRequest, DEFAULT_DECISION_CACHE_TTL_SECONDS, PermissionContext, PermissionResolver,
    PermissionStores, ResourceRequest,
};
