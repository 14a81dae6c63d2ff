use std::fmt::Write as _;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tessera_core::{AppError, AppResult, MemberId, TenantId};
use tessera_domain::{AccessLevel, Attributes, Decision, PermissionKey, ResourceRef};

/// Identity of one cached decision.
///
/// Decisions depend on the attribute context through conditions, so the
/// key carries a fingerprint of the attributes besides the request scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DecisionCacheKey {
    /// Tenant the decision was computed in.
    pub tenant_id: TenantId,
    /// Principal the decision applies to.
    pub principal_id: MemberId,
    /// Requested permission.
    pub permission_key: PermissionKey,
    /// Resource and effective required level, when object-level checked.
    pub resource: Option<(ResourceRef, AccessLevel)>,
    /// SHA-256 hex digest of the canonical attribute JSON.
    pub attributes_fingerprint: String,
}

impl DecisionCacheKey {
    /// Builds a key for one request.
    pub fn new(
        tenant_id: TenantId,
        principal_id: MemberId,
        permission_key: PermissionKey,
        resource: Option<(ResourceRef, AccessLevel)>,
        attributes: &Attributes,
    ) -> AppResult<Self> {
        Ok(Self {
            tenant_id,
            principal_id,
            permission_key,
            resource,
            attributes_fingerprint: fingerprint_attributes(attributes)?,
        })
    }

    /// Returns the part of the key below the tenant and principal scope.
    #[must_use]
    pub fn decision_scope(&self) -> String {
        let resource = self
            .resource
            .as_ref()
            .map(|(resource, level)| format!("{resource}@{}", level.as_str()))
            .unwrap_or_else(|| "-".to_owned());

        format!(
            "{}|{}|{}",
            self.permission_key, resource, self.attributes_fingerprint
        )
    }
}

fn fingerprint_attributes(attributes: &Attributes) -> AppResult<String> {
    let canonical = serde_json::to_vec(attributes).map_err(|error| {
        AppError::Internal(format!("failed to serialize attribute context: {error}"))
    })?;

    let digest = Sha256::digest(canonical);
    let mut fingerprint = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(fingerprint, "{byte:02x}");
    }

    Ok(fingerprint)
}

/// Optional cache port for resolved decisions.
#[async_trait]
pub trait DecisionCache: Send + Sync {
    /// Returns a cached decision for one key.
    async fn get_decision(&self, key: &DecisionCacheKey) -> AppResult<Option<Decision>>;

    /// Stores a decision for one key with ttl.
    async fn set_decision(
        &self,
        key: &DecisionCacheKey,
        decision: Decision,
        ttl_seconds: u32,
    ) -> AppResult<()>;

    /// Drops every cached decision of one principal.
    async fn invalidate_principal(
        &self,
        tenant_id: TenantId,
        principal_id: MemberId,
    ) -> AppResult<()>;

    /// Drops every cached decision of one tenant.
    async fn invalidate_tenant(&self, tenant_id: TenantId) -> AppResult<()>;
}

#[cfg(test)]
mod tests {
    use tessera_core::{MemberId, TenantId};
    use tessera_domain::{Attributes, PermissionKey};

    use super::DecisionCacheKey;

    fn key(attributes: &Attributes) -> DecisionCacheKey {
        DecisionCacheKey::new(
            TenantId::new(),
            MemberId::new(),
            PermissionKey::new("contacts.read").unwrap_or_else(|_| unreachable!()),
            None,
            attributes,
        )
        .unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn fingerprint_ignores_insertion_order() {
        let first = Attributes::new().with("ip", "10.0.0.1").with("amount", 5);
        let second = Attributes::new().with("amount", 5).with("ip", "10.0.0.1");

        assert_eq!(
            key(&first).attributes_fingerprint,
            key(&second).attributes_fingerprint
        );
    }

    #[test]
    fn fingerprint_changes_with_attribute_values() {
        let low = key(&Attributes::new().with("amount", 5));
        let high = key(&Attributes::new().with("amount", 500));

        assert_ne!(low.attributes_fingerprint, high.attributes_fingerprint);
        assert_eq!(low.attributes_fingerprint.len(), 64);
    }
}
