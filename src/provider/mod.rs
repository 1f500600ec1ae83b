//! The backing-store collaborator contract.
//!
//! The core never talks to a database directly: every store round trip goes
//! through [`DirectoryProvider`], the one blocking boundary of this surface.
//! Implementations are expected to provide transactional isolation for a
//! single record's multi-field update; the core performs no locking and no
//! retries of its own.

pub mod in_memory;

pub use in_memory::InMemoryDirectory;

use crate::error::ScimError;
use serde_json::{Map, Value};
use std::future::Future;

/// Typed failures a directory implementation can report.
///
/// Each variant maps onto exactly one protocol error; anything outside this
/// taxonomy belongs in [`DirectoryError::Backend`].
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// Lookup miss for a tenant or user
    #[error("record not found")]
    NotFound,

    /// A unique field already holds the submitted value
    #[error("duplicate value for unique field '{field}'")]
    Uniqueness { field: String },

    /// A store-side constraint rejected the submitted field set
    #[error("validation failed: {detail}")]
    Validation { detail: String },

    /// Infrastructure failure
    #[error("directory backend error: {message}")]
    Backend { message: String },
}

impl DirectoryError {
    /// Map this failure onto the protocol taxonomy, naming the resource a
    /// lookup miss was for.
    pub fn into_scim(self, resource_type: &str, id: &str) -> ScimError {
        match self {
            Self::NotFound => ScimError::not_found(resource_type, id),
            Self::Uniqueness { field } => ScimError::Uniqueness { attribute: field },
            Self::Validation { detail } => ScimError::ValidationFailed { detail },
            Self::Backend { message } => ScimError::internal(message),
        }
    }
}

/// A tenant record, as resolved by authentication.
#[derive(Debug, Clone)]
pub struct DirectoryTenant {
    /// Stable tenant identifier, used to scope every subsequent store call
    pub id: String,
    /// Tenant attributes, including the searchable and authenticatable ones
    pub attributes: Map<String, Value>,
}

impl DirectoryTenant {
    pub fn new(id: impl Into<String>, attributes: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            attributes,
        }
    }

    /// The stored value of an authenticatable attribute, if it is a string.
    pub fn credential(&self, attribute: &str) -> Option<&str> {
        self.attributes.get(attribute)?.as_str()
    }
}

/// A user record: a flat map of backend field keys to values.
///
/// Accessor-backed keys (like an `active` flag derived from an archive
/// timestamp) appear in `fields` exactly like stored columns.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryUser {
    /// Store-assigned identifier, as a string for protocol addressing
    pub id: String,
    pub fields: Map<String, Value>,
}

impl DirectoryUser {
    /// Look up a backend field value.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// Ordering for user listings.
#[derive(Debug, Clone)]
pub struct ListOrder {
    pub column: String,
    pub descending: bool,
}

impl Default for ListOrder {
    fn default() -> Self {
        Self {
            column: "id".into(),
            descending: false,
        }
    }
}

impl ListOrder {
    pub fn ascending(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    pub fn descending(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }
}

/// An equality restriction on one backend column (`whereEqual`).
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub column: String,
    pub value: Value,
}

/// Abstract contract the backing directory implements.
///
/// All methods are tenant-scoped. Failures are reported through
/// [`DirectoryError`] and propagate to the caller immediately; the core
/// never retries.
pub trait DirectoryProvider: Send + Sync {
    /// Look up exactly one tenant by a searchable attribute value.
    fn find_tenant(
        &self,
        attribute: &str,
        value: &str,
    ) -> impl Future<Output = Result<Option<DirectoryTenant>, DirectoryError>> + Send;

    /// List a tenant's users in the given order, optionally restricted to
    /// one column equality.
    fn list_users(
        &self,
        tenant_id: &str,
        order: &ListOrder,
        filter: Option<&FieldFilter>,
    ) -> impl Future<Output = Result<Vec<DirectoryUser>, DirectoryError>> + Send;

    /// Create a user from a flat field set.
    fn create_user(
        &self,
        tenant_id: &str,
        fields: Map<String, Value>,
    ) -> impl Future<Output = Result<DirectoryUser, DirectoryError>> + Send;

    /// Find one user by an identifying field value.
    fn find_user(
        &self,
        tenant_id: &str,
        id_field: &str,
        id_value: &str,
    ) -> impl Future<Output = Result<DirectoryUser, DirectoryError>> + Send;

    /// Apply a flat field-update set to one user as a single atomic write.
    fn update_user(
        &self,
        tenant_id: &str,
        user_id: &str,
        fields: Map<String, Value>,
    ) -> impl Future<Output = Result<DirectoryUser, DirectoryError>> + Send;

    /// Mark a user active. Idempotent.
    fn reprovision_user(
        &self,
        tenant_id: &str,
        user_id: &str,
    ) -> impl Future<Output = Result<(), DirectoryError>> + Send;

    /// Mark a user inactive. Idempotent.
    fn deprovision_user(
        &self,
        tenant_id: &str,
        user_id: &str,
    ) -> impl Future<Output = Result<(), DirectoryError>> + Send;
}
