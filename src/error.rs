//! Error types for the SCIM provisioning surface.
//!
//! Every protocol-visible failure maps to exactly one variant with a fixed
//! HTTP status, and all of them render through the same SCIM error envelope.

use serde::Serialize;

/// Main error type for SCIM provisioning operations.
///
/// Each variant corresponds to one protocol outcome. Authentication failures
/// are deliberately collapsed into the single [`ScimError::InvalidCredentials`]
/// variant so that a caller cannot distinguish an unknown tenant from a wrong
/// credential or a malformed header.
#[derive(Debug, thiserror::Error)]
pub enum ScimError {
    /// Authentication failed, for any reason
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// A unique field already holds the submitted value
    #[error("Duplicate value for unique attribute '{attribute}'")]
    Uniqueness { attribute: String },

    /// The backing store rejected the submitted field set
    #[error("Validation failed: {detail}")]
    ValidationFailed { detail: String },

    /// A PATCH operation arrived without a value
    #[error("Unsupported PATCH request: operation is missing a value")]
    UnsupportedPatchRequest,

    /// A remove operation arrived without a path
    #[error("No target: remove operation requires a path")]
    NoTarget,

    /// A filter referenced an attribute absent from the schema
    #[error("Unknown filter attribute '{attribute}'")]
    UnknownFilterAttribute { attribute: String },

    /// A filter used an operator or shape this surface does not support
    #[error("Unsupported filter: {detail}")]
    UnsupportedFilter { detail: String },

    /// Resource lookup miss
    #[error("Resource not found: {resource_type} with ID {id}")]
    NotFound { resource_type: String, id: String },

    /// Malformed request body
    #[error("Invalid request body: {0}")]
    Json(#[from] serde_json::Error),

    /// Backing-store failure outside the protocol taxonomy
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ScimError {
    /// Create a resource not found error.
    pub fn not_found(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    /// Create a validation failure.
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::ValidationFailed {
            detail: detail.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// The HTTP status this error maps to at the transport boundary.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidCredentials => 401,
            Self::Uniqueness { .. } => 409,
            Self::ValidationFailed { .. } | Self::UnsupportedPatchRequest => 422,
            Self::NoTarget
            | Self::UnknownFilterAttribute { .. }
            | Self::UnsupportedFilter { .. }
            | Self::Json(_) => 400,
            Self::NotFound { .. } => 404,
            Self::Internal { .. } => 500,
        }
    }

    /// Render this error as a SCIM error envelope.
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            schemas: vec![ERROR_SCHEMA_URI.to_string()],
            detail: self.to_string(),
            status: self.http_status().to_string(),
        }
    }
}

/// URN carried by every SCIM error envelope.
pub const ERROR_SCHEMA_URI: &str = "urn:ietf:params:scim:api:messages:2.0:Error";

/// SCIM error envelope as defined in RFC 7644 §3.12.
///
/// `status` is a string per the RFC, not a number.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub schemas: Vec<String>,
    pub detail: String,
    pub status: String,
}

/// Errors raised while building a [`crate::config::ProvisioningConfig`].
///
/// These are programming/configuration errors and surface at startup,
/// never at request time.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Two siblings at the same level of a mapping tree share a SCIM name
    #[error("Duplicate attribute '{name}' under '{parent}'")]
    DuplicateAttribute { name: String, parent: String },

    /// A multi-valued node was declared without exactly one template element
    #[error("Multi-valued attribute '{name}' must have a single template element")]
    InvalidTemplate { name: String },

    /// A configured mutable attribute has no leaf in the write schema
    #[error("Mutable attribute '{attribute}' is not mapped in the write schema")]
    UnmappedMutableAttribute { attribute: String },

    /// A required queryable attribute is missing from the configuration
    #[error("Queryable attribute '{attribute}' is not configured")]
    MissingQueryableAttribute { attribute: String },

    /// General configuration error
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl ConfigError {
    /// Create a general configuration error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }
}

// Result type aliases for convenience
pub type ScimResult<T> = Result<T, ScimError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
