//! Transport-agnostic protocol surface.
//!
//! These endpoints implement the SCIM semantics for `/Users` and the
//! discovery documents; HTTP routing, header parsing, and body serialization
//! stay outside the crate. Every method takes an already-authenticated
//! tenant and a [`RequestContext`] for log correlation.

pub mod discovery;
pub mod render;
pub mod users;

pub use discovery::{AuthenticationScheme, DiscoveryEndpoint, ServiceProviderConfig};
pub use render::render_user;
pub use users::{ListParams, UsersEndpoint};

use crate::LIST_RESPONSE_URI;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Request context carried through endpoint calls for logging and auditing.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique identifier for this request
    pub request_id: String,
    /// Tenant the request was authenticated for, once known
    pub tenant_id: Option<String>,
}

impl RequestContext {
    /// Create a context with a specific request ID.
    pub fn new(request_id: String) -> Self {
        Self {
            request_id,
            tenant_id: None,
        }
    }

    /// Create a context with a generated request ID.
    pub fn with_generated_id() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            tenant_id: None,
        }
    }

    /// Attach the authenticated tenant.
    pub fn for_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::with_generated_id()
    }
}

/// SCIM list-response envelope (RFC 7644 §3.4.2).
#[derive(Debug, Clone, Serialize)]
pub struct ListResponse {
    pub schemas: Vec<String>,
    #[serde(rename = "totalResults")]
    pub total_results: usize,
    #[serde(rename = "startIndex")]
    pub start_index: usize,
    #[serde(rename = "itemsPerPage")]
    pub items_per_page: usize,
    #[serde(rename = "Resources")]
    pub resources: Vec<Value>,
}

impl ListResponse {
    pub fn new(total_results: usize, start_index: usize, resources: Vec<Value>) -> Self {
        Self {
            schemas: vec![LIST_RESPONSE_URI.to_string()],
            total_results,
            start_index,
            items_per_page: resources.len(),
            resources,
        }
    }
}
