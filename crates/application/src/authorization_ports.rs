mod admin;
mod cache;
mod stores;

pub use admin::AuthorizationAdminRepository;
pub use cache::{DecisionCache, DecisionCacheKey};
pub use stores::{MembershipGraph, OverrideStore, PermissionCatalog, ResourceGrantStore, RoleStore};
