//! SCIM 2.0 provisioning surface for multi-tenant identity directories.
//!
//! Maps a per-tenant declarative attribute schema onto a backing directory:
//! SCIM attribute paths and filter expressions resolve to backend field keys,
//! discovery documents are synthesized from the same mapping, and
//! PATCH/PUT/CREATE mutations are reduced to flat field updates applied
//! atomically by the directory.
//!
//! # Core Components
//!
//! - [`AttributeMapping`] - Immutable SCIM-name ⇄ backend-key tree
//! - [`ProvisioningConfig`] - Per-tenant mapping, auth, and lifecycle configuration
//! - [`DirectoryProvider`] - Trait the backing directory implements
//! - [`UsersEndpoint`] - Protocol semantics for the `/Users` surface
//! - [`DiscoveryEndpoint`] - `/ServiceProviderConfig`, `/ResourceTypes`, `/Schemas`
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use scim_bridge::{ProvisioningConfig, UsersEndpoint};
//! use scim_bridge::provider::InMemoryDirectory;
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(ProvisioningConfig::builder()
//!     .user_schema(serde_json::json!({
//!         "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
//!         "id": "id",
//!         "userName": "email",
//!         "active": "active",
//!     }))
//!     .build()?);
//! let directory = InMemoryDirectory::new();
//! let users = UsersEndpoint::new(config, directory);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod filter;
pub mod patch;
pub mod provider;
pub mod schema;

// Re-export commonly used types for convenience
pub use auth::{AuthSelector, AuthStrategy, SigningAlgorithm};
pub use config::{ConfigRegistry, ProvisioningConfig, ProvisioningConfigBuilder};
pub use endpoints::{DiscoveryEndpoint, ListParams, ListResponse, RequestContext, UsersEndpoint};
pub use error::{ConfigError, ConfigResult, ErrorResponse, ScimError, ScimResult};
pub use filter::FilterClause;
pub use patch::{PatchEngine, PatchOperation, PatchOutcome};
pub use provider::{DirectoryError, DirectoryProvider, DirectoryTenant, DirectoryUser};
pub use schema::{
    AttributeDescriptor, AttributeMapping, ColumnKind, DescriptorBuilder, FieldDescriptor,
    FieldRegistry, MappingNode, PathStep,
};

/// Media type for every SCIM request and response body.
pub const SCIM_MEDIA_TYPE: &str = "application/scim+json";

/// URN of the core User schema.
pub const USER_SCHEMA_URI: &str = "urn:ietf:params:scim:schemas:core:2.0:User";

/// URN of the list-response envelope.
pub const LIST_RESPONSE_URI: &str = "urn:ietf:params:scim:api:messages:2.0:ListResponse";
