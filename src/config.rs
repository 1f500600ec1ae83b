//! Per-tenant provisioning configuration.
//!
//! A [`ProvisioningConfig`] is built once, validated eagerly, and shared
//! immutably for the life of the process. It carries the read and write
//! mapping trees, the field registry, authentication settings, and the
//! optional lifecycle callbacks: everything a request needs, injected
//! explicitly rather than discovered at request time.

use crate::auth::{AuthSelector, AuthSettings, SigningAlgorithm};
use crate::error::{ConfigError, ConfigResult};
use crate::patch::PatchEngine;
use crate::provider::{DirectoryTenant, DirectoryUser, ListOrder};
use crate::schema::{
    AttributeMapping, DescriptorBuilder, FieldRegistry, MappingNode, attribute_for, path_for,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Callback invoked with a user record after create/delete.
pub type UserCallback = Arc<dyn Fn(&DirectoryUser) + Send + Sync>;

/// Callback that may name an existing (archived) user to recover instead of
/// inserting a new record. Receives the tenant and the extracted field set,
/// returns the recoverable user's directory id.
pub type RetrieveCallback =
    Arc<dyn Fn(&DirectoryTenant, &Map<String, Value>) -> Option<String> + Send + Sync>;

/// Normalization applied to a filter literal before it reaches the store.
#[derive(Clone)]
pub enum FilterNormalizer {
    /// Lowercase the literal (case-insensitive columns)
    Lowercase,
    /// Arbitrary transform
    Custom(Arc<dyn Fn(&str) -> String + Send + Sync>),
}

impl FilterNormalizer {
    fn apply(&self, value: &str) -> String {
        match self {
            Self::Lowercase => value.to_lowercase(),
            Self::Custom(transform) => transform(value),
        }
    }
}

/// Immutable provisioning configuration for one tenant directory.
pub struct ProvisioningConfig {
    user_schema: AttributeMapping,
    mutable_schema: AttributeMapping,
    mutable_attributes: Vec<String>,
    queryable_attributes: HashMap<String, String>,
    field_registry: FieldRegistry,
    id_field: String,
    list_order: ListOrder,
    created_field: String,
    updated_field: String,
    auth: AuthSettings,
    filter_normalizers: HashMap<String, FilterNormalizer>,
    on_created_user: Option<UserCallback>,
    on_deleted_user: Option<UserCallback>,
    on_retrieve_user: Option<RetrieveCallback>,
}

impl std::fmt::Debug for ProvisioningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisioningConfig")
            .field("mutable_attributes", &self.mutable_attributes)
            .field("id_field", &self.id_field)
            .field("list_order", &self.list_order)
            .field("on_created_user", &self.on_created_user.is_some())
            .field("on_deleted_user", &self.on_deleted_user.is_some())
            .field("on_retrieve_user", &self.on_retrieve_user.is_some())
            .finish()
    }
}

impl ProvisioningConfig {
    pub fn builder() -> ProvisioningConfigBuilder {
        ProvisioningConfigBuilder::default()
    }

    /// Read view: attributes returned in representations.
    pub fn user_schema(&self) -> &AttributeMapping {
        &self.user_schema
    }

    /// Write view: attributes accepted in mutations.
    pub fn mutable_schema(&self) -> &AttributeMapping {
        &self.mutable_schema
    }

    /// Backend keys accepted in mutations, in declaration order.
    pub fn mutable_attributes(&self) -> &[String] {
        &self.mutable_attributes
    }

    /// SCIM name → backend column map for query prechecks.
    pub fn queryable_attributes(&self) -> &HashMap<String, String> {
        &self.queryable_attributes
    }

    pub fn field_registry(&self) -> &FieldRegistry {
        &self.field_registry
    }

    /// Backend column protocol resource ids address.
    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    pub fn list_order(&self) -> &ListOrder {
        &self.list_order
    }

    pub fn created_field(&self) -> &str {
        &self.created_field
    }

    pub fn updated_field(&self) -> &str {
        &self.updated_field
    }

    pub fn auth_settings(&self) -> &AuthSettings {
        &self.auth
    }

    /// Selector configured for this directory's auth settings.
    pub fn auth_selector(&self) -> AuthSelector {
        AuthSelector::new(self.auth.clone())
    }

    /// Descriptor builder over this configuration's views and registry.
    pub fn descriptor_builder(&self) -> DescriptorBuilder<'_> {
        DescriptorBuilder::new(&self.user_schema, &self.mutable_schema, &self.field_registry)
    }

    /// Patch engine over this configuration's write view.
    pub fn patch_engine(&self) -> PatchEngine<'_> {
        PatchEngine::new(&self.mutable_schema, &self.mutable_attributes)
    }

    /// Apply the configured normalizer, if any, to a filter literal.
    pub fn normalize_filter_value(&self, column: &str, value: String) -> String {
        match self.filter_normalizers.get(column) {
            Some(normalizer) => normalizer.apply(&value),
            None => value,
        }
    }

    pub fn on_created_user(&self) -> Option<&UserCallback> {
        self.on_created_user.as_ref()
    }

    pub fn on_deleted_user(&self) -> Option<&UserCallback> {
        self.on_deleted_user.as_ref()
    }

    pub fn on_retrieve_user(&self) -> Option<&RetrieveCallback> {
        self.on_retrieve_user.as_ref()
    }
}

/// Builder for [`ProvisioningConfig`]; `build` validates the whole shape
/// eagerly.
#[derive(Default)]
pub struct ProvisioningConfigBuilder {
    user_schema: Option<Value>,
    mutable_schema: Option<Value>,
    mutable_attributes: Vec<String>,
    queryable_attributes: HashMap<String, String>,
    field_registry: FieldRegistry,
    list_order: Option<ListOrder>,
    created_field: Option<String>,
    updated_field: Option<String>,
    auth: AuthSettings,
    filter_normalizers: HashMap<String, FilterNormalizer>,
    on_created_user: Option<UserCallback>,
    on_deleted_user: Option<UserCallback>,
    on_retrieve_user: Option<RetrieveCallback>,
}

impl ProvisioningConfigBuilder {
    /// The read view, as its JSON declaration. Required.
    pub fn user_schema(mut self, schema: Value) -> Self {
        self.user_schema = Some(schema);
        self
    }

    /// The write view. Defaults to the read view when omitted.
    pub fn mutable_schema(mut self, schema: Value) -> Self {
        self.mutable_schema = Some(schema);
        self
    }

    /// Backend keys accepted in mutations. Defaults to every leaf of the
    /// write view outside the reserved top-level keys.
    pub fn mutable_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mutable_attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// Declare a queryable attribute (SCIM name → backend column).
    pub fn queryable_attribute(
        mut self,
        scim_name: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        self.queryable_attributes
            .insert(scim_name.into(), column.into());
        self
    }

    pub fn field_registry(mut self, registry: FieldRegistry) -> Self {
        self.field_registry = registry;
        self
    }

    pub fn list_order(mut self, order: ListOrder) -> Self {
        self.list_order = Some(order);
        self
    }

    pub fn created_field(mut self, key: impl Into<String>) -> Self {
        self.created_field = Some(key.into());
        self
    }

    pub fn updated_field(mut self, key: impl Into<String>) -> Self {
        self.updated_field = Some(key.into());
        self
    }

    pub fn auth(mut self, settings: AuthSettings) -> Self {
        self.auth = settings;
        self
    }

    /// Attach a normalizer to a backend column's filter literals.
    pub fn filter_normalizer(
        mut self,
        column: impl Into<String>,
        normalizer: FilterNormalizer,
    ) -> Self {
        self.filter_normalizers.insert(column.into(), normalizer);
        self
    }

    pub fn on_created_user(mut self, callback: UserCallback) -> Self {
        self.on_created_user = Some(callback);
        self
    }

    pub fn on_deleted_user(mut self, callback: UserCallback) -> Self {
        self.on_deleted_user = Some(callback);
        self
    }

    pub fn on_retrieve_user(mut self, callback: RetrieveCallback) -> Self {
        self.on_retrieve_user = Some(callback);
        self
    }

    /// Parse and validate the configuration.
    pub fn build(self) -> ConfigResult<ProvisioningConfig> {
        let user_schema_value = self
            .user_schema
            .ok_or_else(|| ConfigError::invalid("user_schema is required"))?;
        let user_schema = AttributeMapping::from_value(&user_schema_value)?;
        if user_schema.entries().is_empty() {
            return Err(ConfigError::invalid("user_schema must not be empty"));
        }

        let mutable_schema = match &self.mutable_schema {
            Some(value) => AttributeMapping::from_value(value)?,
            None => user_schema.clone(),
        };

        let id_field = user_schema
            .get("id")
            .and_then(MappingNode::leaf)
            .unwrap_or("id")
            .to_string();

        let mutable_attributes = if self.mutable_attributes.is_empty() {
            derived_mutable_attributes(&mutable_schema, &id_field)
        } else {
            self.mutable_attributes
        };
        for attribute in &mutable_attributes {
            if path_for(attribute, &mutable_schema).is_none() {
                return Err(ConfigError::UnmappedMutableAttribute {
                    attribute: attribute.clone(),
                });
            }
        }

        let mut queryable_attributes = self.queryable_attributes;
        if !queryable_attributes.contains_key("userName") {
            let merged = user_schema.merged_with(&mutable_schema);
            match attribute_for(Some("userName"), &merged) {
                Some(column) => {
                    queryable_attributes.insert("userName".into(), column.to_string());
                }
                None => {
                    return Err(ConfigError::MissingQueryableAttribute {
                        attribute: "userName".into(),
                    });
                }
            }
        }

        if self.auth.algorithm == SigningAlgorithm::Hs256 && self.auth.signing_secret.is_none() {
            return Err(ConfigError::invalid(
                "HS256 signing requires a signing_secret",
            ));
        }

        Ok(ProvisioningConfig {
            user_schema,
            mutable_schema,
            mutable_attributes,
            queryable_attributes,
            field_registry: self.field_registry,
            id_field,
            list_order: self.list_order.unwrap_or_default(),
            created_field: self.created_field.unwrap_or_else(|| "created_at".into()),
            updated_field: self.updated_field.unwrap_or_else(|| "updated_at".into()),
            auth: self.auth,
            filter_normalizers: self.filter_normalizers,
            on_created_user: self.on_created_user,
            on_deleted_user: self.on_deleted_user,
            on_retrieve_user: self.on_retrieve_user,
        })
    }
}

/// Every distinct leaf key of the write view outside `schemas`/`meta`,
/// excluding the id column, in declaration order.
fn derived_mutable_attributes(mutable_schema: &AttributeMapping, id_field: &str) -> Vec<String> {
    let mut keys = Vec::new();
    for (name, node) in mutable_schema.entries() {
        if name == "schemas" || name == "meta" {
            continue;
        }
        collect_leaves(node, id_field, &mut keys);
    }
    keys
}

fn collect_leaves(node: &MappingNode, id_field: &str, keys: &mut Vec<String>) {
    match node {
        MappingNode::Leaf(key) => {
            if key != id_field && !keys.iter().any(|existing| existing == key) {
                keys.push(key.clone());
            }
        }
        MappingNode::Complex(entries) => {
            for (_, child) in entries {
                collect_leaves(child, id_field, keys);
            }
        }
        MappingNode::Multi(template) => collect_leaves(template, id_field, keys),
    }
}

/// Per-tenant configuration lookup with a process-wide default.
#[derive(Debug, Clone)]
pub struct ConfigRegistry {
    default: Arc<ProvisioningConfig>,
    tenants: HashMap<String, Arc<ProvisioningConfig>>,
}

impl ConfigRegistry {
    pub fn new(default: Arc<ProvisioningConfig>) -> Self {
        Self {
            default,
            tenants: HashMap::new(),
        }
    }

    /// Override the configuration for one tenant.
    pub fn with_tenant_config(
        mut self,
        tenant_id: impl Into<String>,
        config: Arc<ProvisioningConfig>,
    ) -> Self {
        self.tenants.insert(tenant_id.into(), config);
        self
    }

    /// The configuration in effect for a tenant.
    pub fn for_tenant(&self, tenant_id: &str) -> &Arc<ProvisioningConfig> {
        self.tenants.get(tenant_id).unwrap_or(&self.default)
    }
}
