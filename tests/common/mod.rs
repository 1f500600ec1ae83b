//! Shared fixtures for integration tests.

// Each integration test binary compiles its own copy of this module and uses
// a different subset of it.
#![allow(dead_code)]

use scim_bridge::provider::{
    DirectoryError, DirectoryProvider, DirectoryTenant, DirectoryUser, FieldFilter,
    InMemoryDirectory, ListOrder,
};
use scim_bridge::{
    ColumnKind, FieldDescriptor, FieldRegistry, ProvisioningConfig, RequestContext, UsersEndpoint,
};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const ENTERPRISE: &str = "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";

/// Initialize logging once for test output.
#[allow(dead_code)]
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// The canonical read view used across the integration suite.
pub fn user_schema() -> Value {
    json!({
        "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
        "id": "id",
        "userName": "email",
        "name": {"givenName": "first_name", "familyName": "last_name"},
        "emails": [{"value": "email"}],
        "active": "active",
        (ENTERPRISE): {"employeeNumber": "employee_id"},
    })
}

/// The write view: what mutation requests may touch. `active` is absent on
/// purpose; provisioning state changes only through the hooks.
pub fn mutable_schema() -> Value {
    json!({
        "name": {"givenName": "first_name", "familyName": "last_name"},
        "emails": [{"value": "email"}],
        (ENTERPRISE): {"employeeNumber": "employee_id"},
    })
}

pub fn field_registry() -> FieldRegistry {
    FieldRegistry::new()
        .with_field(FieldDescriptor::column("id", ColumnKind::PrimaryKey))
        .with_field(
            FieldDescriptor::column("email", ColumnKind::String)
                .required()
                .unique(),
        )
        .with_field(FieldDescriptor::column("first_name", ColumnKind::String).required())
        .with_field(FieldDescriptor::column("last_name", ColumnKind::String).required())
        .with_field(FieldDescriptor::accessor("active", json!(true)))
        .with_field(FieldDescriptor::column("employee_id", ColumnKind::String))
}

pub fn config() -> Arc<ProvisioningConfig> {
    Arc::new(
        ProvisioningConfig::builder()
            .user_schema(user_schema())
            .mutable_schema(mutable_schema())
            .field_registry(field_registry())
            .build()
            .expect("fixture config should build"),
    )
}

/// A directory enforcing the same constraints the registry declares.
pub fn directory() -> InMemoryDirectory {
    InMemoryDirectory::new()
        .with_required_fields(["email", "first_name", "last_name"])
        .with_unique_fields(["email"])
}

pub async fn tenant(directory: &InMemoryDirectory) -> DirectoryTenant {
    let mut attributes = Map::new();
    attributes.insert("subdomain".into(), json!("acme"));
    attributes.insert("api_token".into(), json!("s3cret"));
    directory.add_tenant("acme", attributes).await;
    directory
        .find_tenant("subdomain", "acme")
        .await
        .expect("directory lookup should succeed")
        .expect("tenant was just added")
}

pub fn endpoint<P: DirectoryProvider>(provider: P) -> UsersEndpoint<P> {
    UsersEndpoint::new(config(), provider)
}

/// Delegating provider that counts store calls, for asserting exactly-once
/// hook dispatch and zero-mutation aborts.
#[derive(Clone)]
pub struct CountingDirectory {
    pub inner: InMemoryDirectory,
    pub updates: Arc<AtomicUsize>,
    pub reprovisions: Arc<AtomicUsize>,
    pub deprovisions: Arc<AtomicUsize>,
}

impl CountingDirectory {
    pub fn new(inner: InMemoryDirectory) -> Self {
        Self {
            inner,
            updates: Arc::new(AtomicUsize::new(0)),
            reprovisions: Arc::new(AtomicUsize::new(0)),
            deprovisions: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn reprovision_count(&self) -> usize {
        self.reprovisions.load(Ordering::SeqCst)
    }

    pub fn deprovision_count(&self) -> usize {
        self.deprovisions.load(Ordering::SeqCst)
    }
}

impl DirectoryProvider for CountingDirectory {
    async fn find_tenant(
        &self,
        attribute: &str,
        value: &str,
    ) -> Result<Option<DirectoryTenant>, DirectoryError> {
        self.inner.find_tenant(attribute, value).await
    }

    async fn list_users(
        &self,
        tenant_id: &str,
        order: &ListOrder,
        filter: Option<&FieldFilter>,
    ) -> Result<Vec<DirectoryUser>, DirectoryError> {
        self.inner.list_users(tenant_id, order, filter).await
    }

    async fn create_user(
        &self,
        tenant_id: &str,
        fields: Map<String, Value>,
    ) -> Result<DirectoryUser, DirectoryError> {
        self.inner.create_user(tenant_id, fields).await
    }

    async fn find_user(
        &self,
        tenant_id: &str,
        id_field: &str,
        id_value: &str,
    ) -> Result<DirectoryUser, DirectoryError> {
        self.inner.find_user(tenant_id, id_field, id_value).await
    }

    async fn update_user(
        &self,
        tenant_id: &str,
        user_id: &str,
        fields: Map<String, Value>,
    ) -> Result<DirectoryUser, DirectoryError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update_user(tenant_id, user_id, fields).await
    }

    async fn reprovision_user(&self, tenant_id: &str, user_id: &str) -> Result<(), DirectoryError> {
        self.reprovisions.fetch_add(1, Ordering::SeqCst);
        self.inner.reprovision_user(tenant_id, user_id).await
    }

    async fn deprovision_user(&self, tenant_id: &str, user_id: &str) -> Result<(), DirectoryError> {
        self.deprovisions.fetch_add(1, Ordering::SeqCst);
        self.inner.deprovision_user(tenant_id, user_id).await
    }
}

pub fn context() -> RequestContext {
    RequestContext::with_generated_id().for_tenant("acme")
}

/// Seed one user with the standard field shape. Returns the assigned id.
#[allow(dead_code)]
pub async fn seed_user(
    directory: &InMemoryDirectory,
    first_name: &str,
    last_name: &str,
    email: &str,
) -> String {
    let fields = json!({
        "first_name": first_name,
        "last_name": last_name,
        "email": email,
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z",
    });
    directory
        .seed_user("acme", fields.as_object().cloned().unwrap())
        .await
}
