//! Discovery documents: `/ServiceProviderConfig`, `/ResourceTypes`, `/Schemas`.
//!
//! Everything here is synthesized from the same mapping trees the mutation
//! path consults, so advertised mutability always agrees with enforced
//! mutability.

use crate::USER_SCHEMA_URI;
use crate::config::ProvisioningConfig;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;

/// URN of the Schema resource description.
const SCHEMA_URI: &str = "urn:ietf:params:scim:schemas:core:2.0:Schema";

/// Capability flag with no further detail.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Supported {
    pub supported: bool,
}

/// Bulk capability block; always disabled on this surface.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BulkCapability {
    pub supported: bool,
    #[serde(rename = "maxOperations")]
    pub max_operations: u32,
    #[serde(rename = "maxPayloadSize")]
    pub max_payload_size: u64,
}

/// Filter capability block.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FilterCapability {
    pub supported: bool,
    #[serde(rename = "maxResults")]
    pub max_results: u32,
}

/// Authentication scheme advertisement.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AuthenticationScheme {
    #[serde(rename = "type")]
    pub auth_type: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "specUri")]
    pub spec_uri: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub primary: bool,
}

/// Service provider configuration document (RFC 7644 §4).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ServiceProviderConfig {
    pub schemas: Vec<String>,
    #[serde(rename = "documentationUri")]
    pub documentation_uri: String,
    pub patch: Supported,
    pub bulk: BulkCapability,
    pub filter: FilterCapability,
    #[serde(rename = "changePassword")]
    pub change_password: Supported,
    pub sort: Supported,
    pub etag: Supported,
    #[serde(rename = "authenticationSchemes")]
    pub authentication_schemes: Vec<AuthenticationScheme>,
    pub meta: Value,
}

/// Synthesizes the discovery documents for one configured directory.
#[derive(Debug, Clone)]
pub struct DiscoveryEndpoint {
    config: Arc<ProvisioningConfig>,
}

impl DiscoveryEndpoint {
    pub fn new(config: Arc<ProvisioningConfig>) -> Self {
        Self { config }
    }

    /// Schema ids served by this directory: the core User schema plus every
    /// configured extension namespace.
    pub fn schema_ids(&self) -> Vec<String> {
        let mut ids = vec![USER_SCHEMA_URI.to_string()];
        ids.extend(self.config.descriptor_builder().extension_schema_ids());
        ids
    }

    /// GET /ServiceProviderConfig.
    pub fn service_provider_config(&self, base_url: &str) -> ServiceProviderConfig {
        ServiceProviderConfig {
            schemas: vec![
                "urn:ietf:params:scim:schemas:core:2.0:ServiceProviderConfig".to_string(),
            ],
            documentation_uri: "https://tools.ietf.org/html/rfc7644".into(),
            patch: Supported { supported: true },
            bulk: BulkCapability {
                supported: false,
                max_operations: 0,
                max_payload_size: 0,
            },
            filter: FilterCapability {
                supported: false,
                max_results: 100,
            },
            change_password: Supported { supported: false },
            sort: Supported { supported: false },
            etag: Supported { supported: false },
            authentication_schemes: vec![
                AuthenticationScheme {
                    auth_type: "httpbasic".into(),
                    name: "Http Basic".into(),
                    description: "Authentication scheme using the HTTP Basic Standard".into(),
                    spec_uri: "http://www.rfc-editor.org/info/rfc2617".into(),
                    primary: false,
                },
                AuthenticationScheme {
                    auth_type: "oauthbearertoken".into(),
                    name: "Oauth Bearer Token".into(),
                    description: "Authentication scheme using the OAuth Bearer Token Standard"
                        .into(),
                    spec_uri: "http://www.rfc-editor.org/info/rfc6750".into(),
                    primary: true,
                },
            ],
            meta: json!({
                "location": format!("{base_url}/ServiceProviderConfig"),
                "resourceType": "ServiceProviderConfig",
            }),
        }
    }

    /// GET /ResourceTypes.
    pub fn resource_types(&self, base_url: &str) -> Value {
        let extensions: Vec<Value> = self
            .config
            .descriptor_builder()
            .extension_schema_ids()
            .into_iter()
            .map(|schema| json!({"schema": schema, "required": false}))
            .collect();

        json!([{
            "schemas": ["urn:ietf:params:scim:schemas:core:2.0:ResourceType"],
            "id": "User",
            "name": "User",
            "endpoint": "/Users",
            "description": "User Account",
            "schema": USER_SCHEMA_URI,
            "schemaExtensions": extensions,
            "meta": {
                "location": format!("{base_url}/ResourceTypes/User"),
                "resourceType": "ResourceType",
            },
        }])
    }

    /// GET /Schemas.
    pub fn schemas(&self, base_url: &str) -> Value {
        let builder = self.config.descriptor_builder();
        let documents: Vec<Value> = self
            .schema_ids()
            .into_iter()
            .map(|schema_id| {
                let name = schema_id
                    .rsplit_once(':')
                    .map(|(_, name)| name.to_string())
                    .unwrap_or_else(|| schema_id.clone());
                let attributes = if schema_id == USER_SCHEMA_URI {
                    builder.schema(None)
                } else {
                    builder.schema(Some(schema_id.as_str()))
                };
                json!({
                    "schemas": [SCHEMA_URI],
                    "id": schema_id,
                    "name": name,
                    "description": name,
                    "attributes": attributes,
                    "meta": {
                        "location": format!("{base_url}/Schemas/{schema_id}"),
                        "resourceType": "Schema",
                    },
                })
            })
            .collect();
        Value::Array(documents)
    }
}
