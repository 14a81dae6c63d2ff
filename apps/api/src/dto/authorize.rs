use std::collections::BTreeMap;

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tessera_application::{AuthorizeRequest, ResourceRequest};
use tessera_core::{AppError, MemberId, TenantId};
use tessera_domain::{AccessLevel, Attributes, Decision, PermissionKey, ResourceRef};
use ts_rs::TS;

/// Incoming authorization question from a trusted collaborator.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "authorize-request-body.ts"
)]
pub struct AuthorizeRequestBody {
    pub tenant_id: String,
    pub principal_id: String,
    pub permission_key: String,
    #[serde(default)]
    #[ts(type = "Record<string, unknown>")]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default)]
    pub resource: Option<ResourceRequestBody>,
}

/// Object-level part of an authorization question.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "resource-request-body.ts"
)]
pub struct ResourceRequestBody {
    pub resource_type: String,
    pub resource_id: String,
    #[serde(default)]
    pub required_access_level: Option<String>,
}

/// API representation of a decision.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "decision-response.ts"
)]
pub struct DecisionResponse {
    pub allowed: bool,
    pub reason_code: String,
    pub evaluated_at: String,
    pub degraded: bool,
}

impl TryFrom<AuthorizeRequestBody> for AuthorizeRequest {
    type Error = AppError;

    fn try_from(body: AuthorizeRequestBody) -> Result<Self, Self::Error> {
        let resource = body
            .resource
            .map(|resource| {
                Ok::<_, AppError>(ResourceRequest {
                    resource: ResourceRef::new(resource.resource_type, resource.resource_id)?,
                    required_access_level: resource
                        .required_access_level
                        .as_deref()
                        .map(str::parse::<AccessLevel>)
                        .transpose()?,
                })
            })
            .transpose()?;

        Ok(Self {
            tenant_id: TenantId::parse(body.tenant_id.as_str())?,
            principal_id: MemberId::parse(body.principal_id.as_str())?,
            permission_key: PermissionKey::new(body.permission_key)?,
            attributes: Attributes::from(body.attributes),
            resource,
        })
    }
}

impl From<Decision> for DecisionResponse {
    fn from(decision: Decision) -> Self {
        Self {
            allowed: decision.allowed(),
            reason_code: decision.reason().as_str().to_owned(),
            evaluated_at: decision
                .evaluated_at()
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            degraded: decision.is_degraded(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;
    use tessera_application::AuthorizeRequest;
    use tessera_core::AppError;
    use tessera_domain::{AccessLevel, Decision, DecisionReason};

    use super::{AuthorizeRequestBody, DecisionResponse};

    fn body(value: serde_json::Value) -> AuthorizeRequestBody {
        serde_json::from_value(value).unwrap_or_else(|error| panic!("invalid body: {error}"))
    }

    #[test]
    fn request_body_converts_with_resource_and_attributes() {
        let request = AuthorizeRequest::try_from(body(json!({
            "tenant_id": "6f1b2c9e-2d7a-4c53-9a43-0d8f1f7c2a10",
            "principal_id": "1d3c7e55-8a0b-4f6e-b2c1-9e4a5d6f7a81",
            "permission_key": "documents.edit",
            "attributes": { "region": "eu" },
            "resource": {
                "resource_type": "document",
                "resource_id": "doc-42",
                "required_access_level": "admin"
            }
        })));

        let request = request.unwrap_or_else(|error| panic!("conversion failed: {error}"));
        assert_eq!(request.permission_key.as_str(), "documents.edit");
        assert_eq!(request.attributes.get("region"), Some(&json!("eu")));
        let resource = request.resource.unwrap_or_else(|| unreachable!());
        assert_eq!(resource.resource.to_string(), "document:doc-42");
        assert_eq!(resource.required_access_level, Some(AccessLevel::Admin));
    }

    #[test]
    fn malformed_identifiers_are_validation_errors() {
        let request = AuthorizeRequest::try_from(body(json!({
            "tenant_id": "not-a-uuid",
            "principal_id": "1d3c7e55-8a0b-4f6e-b2c1-9e4a5d6f7a81",
            "permission_key": "documents.edit"
        })));

        assert!(matches!(request, Err(AppError::Validation(_))));
    }

    #[test]
    fn decision_response_uses_stable_reason_codes() {
        let response = DecisionResponse::from(Decision::fail_closed(Utc::now()));

        assert!(!response.allowed);
        assert!(response.degraded);
        assert_eq!(
            response.reason_code,
            DecisionReason::NoMatchingRule.as_str()
        );
        assert!(response.evaluated_at.ends_with('Z'));
    }
}
