//! In-memory directory implementation.
//!
//! Thread-safe reference implementation of [`DirectoryProvider`] using a
//! HashMap behind an async RwLock. Suitable for tests, development, and
//! examples; constraint checking (presence and uniqueness) is declared per
//! instance so validation failures can be exercised without a real database.

use super::{
    DirectoryError, DirectoryProvider, DirectoryTenant, DirectoryUser, FieldFilter, ListOrder,
};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Thread-safe in-memory directory.
///
/// Users live in per-tenant lists with store-assigned integer ids. The
/// configured status field is what reprovision/deprovision flip; it shows up
/// in each user's field map like any stored column.
#[derive(Clone)]
pub struct InMemoryDirectory {
    state: Arc<RwLock<State>>,
    required_fields: Arc<[String]>,
    unique_fields: Arc<[String]>,
    status_field: String,
}

#[derive(Default)]
struct State {
    tenants: HashMap<String, TenantState>,
}

#[derive(Default)]
struct TenantState {
    tenant_attributes: Map<String, Value>,
    users: Vec<Map<String, Value>>,
    next_id: i64,
}

impl InMemoryDirectory {
    /// Create an empty directory with no declared constraints and the status
    /// field `active`.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            required_fields: Arc::from(Vec::new()),
            unique_fields: Arc::from(Vec::new()),
            status_field: "active".into(),
        }
    }

    /// Declare presence constraints, checked on create and update.
    pub fn with_required_fields(mut self, keys: impl IntoIterator<Item = &'static str>) -> Self {
        self.required_fields = keys.into_iter().map(String::from).collect();
        self
    }

    /// Declare uniqueness constraints, checked on create and update.
    pub fn with_unique_fields(mut self, keys: impl IntoIterator<Item = &'static str>) -> Self {
        self.unique_fields = keys.into_iter().map(String::from).collect();
        self
    }

    /// Use a different backend key for the provisioned/deprovisioned flag.
    pub fn with_status_field(mut self, key: impl Into<String>) -> Self {
        self.status_field = key.into();
        self
    }

    /// Register a tenant with its attribute map.
    pub async fn add_tenant(&self, id: impl Into<String>, attributes: Map<String, Value>) {
        let mut state = self.state.write().await;
        state.tenants.insert(
            id.into(),
            TenantState {
                tenant_attributes: attributes,
                ..TenantState::default()
            },
        );
    }

    /// Seed a user directly, bypassing constraint checks. Returns its id.
    pub async fn seed_user(&self, tenant_id: &str, mut fields: Map<String, Value>) -> String {
        let mut state = self.state.write().await;
        let tenant = state.tenants.entry(tenant_id.to_string()).or_default();
        tenant.next_id += 1;
        let id = tenant.next_id;
        fields.insert("id".into(), Value::from(id));
        fields
            .entry(self.status_field.clone())
            .or_insert(Value::Bool(true));
        tenant.users.push(fields);
        id.to_string()
    }

    fn check_constraints(
        &self,
        users: &[Map<String, Value>],
        fields: &Map<String, Value>,
        skip_id: Option<i64>,
    ) -> Result<(), DirectoryError> {
        for key in self.required_fields.iter() {
            if fields.get(key).is_none_or(Value::is_null) {
                return Err(DirectoryError::Validation {
                    detail: format!("{key} can't be blank"),
                });
            }
        }
        for key in self.unique_fields.iter() {
            let Some(value) = fields.get(key) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            let taken = users.iter().any(|user| {
                user.get(key) == Some(value) && user_id(user) != skip_id
            });
            if taken {
                return Err(DirectoryError::Uniqueness { field: key.clone() });
            }
        }
        Ok(())
    }
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

fn user_id(fields: &Map<String, Value>) -> Option<i64> {
    fields.get("id").and_then(Value::as_i64)
}

fn as_user(fields: &Map<String, Value>) -> DirectoryUser {
    let id = fields
        .get("id")
        .map(value_text)
        .unwrap_or_default();
    DirectoryUser {
        id,
        fields: fields.clone(),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn matches_filter(fields: &Map<String, Value>, filter: &FieldFilter) -> bool {
    match fields.get(&filter.column) {
        Some(stored) => stored == &filter.value || value_text(stored) == value_text(&filter.value),
        None => false,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(x), Some(y)) => value_text(x).cmp(&value_text(y)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

impl DirectoryProvider for InMemoryDirectory {
    async fn find_tenant(
        &self,
        attribute: &str,
        value: &str,
    ) -> Result<Option<DirectoryTenant>, DirectoryError> {
        let state = self.state.read().await;
        let found = state.tenants.iter().find(|(_, tenant)| {
            tenant
                .tenant_attributes
                .get(attribute)
                .is_some_and(|stored| value_text(stored) == value)
        });
        Ok(found.map(|(id, tenant)| DirectoryTenant::new(id.clone(), tenant.tenant_attributes.clone())))
    }

    async fn list_users(
        &self,
        tenant_id: &str,
        order: &ListOrder,
        filter: Option<&FieldFilter>,
    ) -> Result<Vec<DirectoryUser>, DirectoryError> {
        let state = self.state.read().await;
        let tenant = state.tenants.get(tenant_id).ok_or(DirectoryError::NotFound)?;

        let mut users: Vec<&Map<String, Value>> = tenant
            .users
            .iter()
            .filter(|fields| filter.is_none_or(|filter| matches_filter(fields, filter)))
            .collect();
        users.sort_by(|a, b| {
            let ordering = compare_values(a.get(&order.column), b.get(&order.column));
            if order.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
        Ok(users.into_iter().map(as_user).collect())
    }

    async fn create_user(
        &self,
        tenant_id: &str,
        mut fields: Map<String, Value>,
    ) -> Result<DirectoryUser, DirectoryError> {
        let mut state = self.state.write().await;
        let status_field = self.status_field.clone();
        let tenant = state
            .tenants
            .get_mut(tenant_id)
            .ok_or(DirectoryError::NotFound)?;

        self.check_constraints(&tenant.users, &fields, None)?;

        tenant.next_id += 1;
        fields.insert("id".into(), Value::from(tenant.next_id));
        fields.entry(status_field).or_insert(Value::Bool(true));
        let created = as_user(&fields);
        tenant.users.push(fields);
        Ok(created)
    }

    async fn find_user(
        &self,
        tenant_id: &str,
        id_field: &str,
        id_value: &str,
    ) -> Result<DirectoryUser, DirectoryError> {
        let state = self.state.read().await;
        let tenant = state.tenants.get(tenant_id).ok_or(DirectoryError::NotFound)?;
        tenant
            .users
            .iter()
            .find(|fields| {
                fields
                    .get(id_field)
                    .is_some_and(|stored| value_text(stored) == id_value)
            })
            .map(as_user)
            .ok_or(DirectoryError::NotFound)
    }

    async fn update_user(
        &self,
        tenant_id: &str,
        user_id_value: &str,
        updates: Map<String, Value>,
    ) -> Result<DirectoryUser, DirectoryError> {
        let mut state = self.state.write().await;
        let tenant = state
            .tenants
            .get_mut(tenant_id)
            .ok_or(DirectoryError::NotFound)?;

        let index = tenant
            .users
            .iter()
            .position(|fields| {
                fields
                    .get("id")
                    .is_some_and(|stored| value_text(stored) == user_id_value)
            })
            .ok_or(DirectoryError::NotFound)?;

        // Validate the merged record before writing anything.
        let mut merged = tenant.users[index].clone();
        for (key, value) in updates {
            merged.insert(key, value);
        }
        let skip = user_id(&tenant.users[index]);
        self.check_constraints(&tenant.users, &merged, skip)?;

        tenant.users[index] = merged;
        Ok(as_user(&tenant.users[index]))
    }

    async fn reprovision_user(
        &self,
        tenant_id: &str,
        user_id_value: &str,
    ) -> Result<(), DirectoryError> {
        self.set_status(tenant_id, user_id_value, true).await
    }

    async fn deprovision_user(
        &self,
        tenant_id: &str,
        user_id_value: &str,
    ) -> Result<(), DirectoryError> {
        self.set_status(tenant_id, user_id_value, false).await
    }
}

impl InMemoryDirectory {
    async fn set_status(
        &self,
        tenant_id: &str,
        user_id_value: &str,
        active: bool,
    ) -> Result<(), DirectoryError> {
        let mut state = self.state.write().await;
        let status_field = self.status_field.clone();
        let tenant = state
            .tenants
            .get_mut(tenant_id)
            .ok_or(DirectoryError::NotFound)?;
        let user = tenant
            .users
            .iter_mut()
            .find(|fields| {
                fields
                    .get("id")
                    .is_some_and(|stored| value_text(stored) == user_id_value)
            })
            .ok_or(DirectoryError::NotFound)?;
        user.insert(status_field, Value::Bool(active));
        Ok(())
    }
}
