//! Protocol semantics for the `/Users` surface.
//!
//! Each method implements one operation of the SCIM user-provisioning
//! protocol against the injected configuration and directory. A PATCH (or
//! whole-resource PUT/CREATE) reduces to a single flat field update applied
//! by one directory call, so atomicity is exactly the store's transactional
//! boundary. The active-status hook dispatches at most once per request,
//! after the update committed.

use super::render::render_user;
use super::{ListResponse, RequestContext};
use crate::config::ProvisioningConfig;
use crate::error::{ScimError, ScimResult};
use crate::filter::FilterClause;
use crate::patch::{PatchRequest, active_in_resource};
use crate::provider::{DirectoryProvider, DirectoryTenant, DirectoryUser, FieldFilter};
use log::{debug, info};
use serde_json::Value;
use std::sync::Arc;

/// Default page size when a list request carries no `count`.
const DEFAULT_PAGE_SIZE: usize = 100;

/// Query parameters of a list request.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    /// Single-clause filter expression, if any
    pub filter: Option<String>,
    /// 1-based index of the first resource to return
    pub start_index: Option<usize>,
    /// Page size
    pub count: Option<usize>,
}

/// The `/Users` endpoint for one configured directory.
pub struct UsersEndpoint<P: DirectoryProvider> {
    config: Arc<ProvisioningConfig>,
    provider: P,
}

impl<P: DirectoryProvider> UsersEndpoint<P> {
    pub fn new(config: Arc<ProvisioningConfig>, provider: P) -> Self {
        Self { config, provider }
    }

    pub fn config(&self) -> &Arc<ProvisioningConfig> {
        &self.config
    }

    /// GET /Users: list with optional filter and pagination.
    pub async fn list(
        &self,
        tenant: &DirectoryTenant,
        params: &ListParams,
        context: &RequestContext,
    ) -> ScimResult<ListResponse> {
        let field_filter = match params.filter.as_deref() {
            Some(expression) => {
                let clause = FilterClause::parse(expression, self.config.user_schema())?;
                let literal = self
                    .config
                    .normalize_filter_value(&clause.attribute, clause.value);
                Some(FieldFilter {
                    column: clause.attribute,
                    value: Value::String(literal),
                })
            }
            None => None,
        };

        let users = self
            .provider
            .list_users(&tenant.id, self.config.list_order(), field_filter.as_ref())
            .await
            .map_err(|error| error.into_scim("Tenant", &tenant.id))?;

        let total = users.len();
        let start_index = params.start_index.unwrap_or(1).max(1);
        let count = params.count.unwrap_or(DEFAULT_PAGE_SIZE);
        let resources: Vec<Value> = users
            .iter()
            .skip(start_index - 1)
            .take(count)
            .map(|user| render_user(&self.config, user))
            .collect();

        debug!(
            "[{}] listed {} of {} users for tenant '{}'",
            context.request_id,
            resources.len(),
            total,
            tenant.id
        );
        Ok(ListResponse::new(total, start_index, resources))
    }

    /// POST /Users: create, possibly recovering an archived record.
    pub async fn create(
        &self,
        tenant: &DirectoryTenant,
        resource: &Value,
        context: &RequestContext,
    ) -> ScimResult<Value> {
        let fields = self.config.patch_engine().full_field_set(resource);

        // A user that already exists under the userName column is a conflict,
        // surfaced before the store's own constraint gets a chance to.
        if let Some(column) = self.config.queryable_attributes().get("userName") {
            if let Some(value) = fields.get(column).filter(|value| !value.is_null()) {
                let existing = self
                    .provider
                    .list_users(
                        &tenant.id,
                        self.config.list_order(),
                        Some(&FieldFilter {
                            column: column.clone(),
                            value: value.clone(),
                        }),
                    )
                    .await
                    .map_err(|error| error.into_scim("Tenant", &tenant.id))?;
                if !existing.is_empty() {
                    return Err(ScimError::Uniqueness {
                        attribute: column.clone(),
                    });
                }
            }
        }

        let recovered_id = self
            .config
            .on_retrieve_user()
            .and_then(|callback| callback(tenant, &fields));

        let user = match recovered_id {
            Some(id) => {
                info!(
                    "[{}] recovering archived user {} for tenant '{}'",
                    context.request_id, id, tenant.id
                );
                self.provider
                    .reprovision_user(&tenant.id, &id)
                    .await
                    .map_err(|error| error.into_scim("User", &id))?;
                self.provider
                    .update_user(&tenant.id, &id, fields)
                    .await
                    .map_err(|error| error.into_scim("User", &id))?
            }
            None => self
                .provider
                .create_user(&tenant.id, fields)
                .await
                .map_err(|error| error.into_scim("User", "new"))?,
        };

        if let Some(callback) = self.config.on_created_user() {
            callback(&user);
        }

        info!(
            "[{}] created user {} for tenant '{}'",
            context.request_id, user.id, tenant.id
        );
        let rendered = render_user(&self.config, &user);
        self.apply_active(tenant, &user.id, active_in_resource(resource), context)
            .await?;
        Ok(rendered)
    }

    /// GET /Users/{id}.
    pub async fn get(
        &self,
        tenant: &DirectoryTenant,
        id: &str,
        _context: &RequestContext,
    ) -> ScimResult<Value> {
        let user = self.load_user(tenant, id).await?;
        Ok(render_user(&self.config, &user))
    }

    /// PUT /Users/{id}: full replacement of the mutable attribute set.
    pub async fn replace(
        &self,
        tenant: &DirectoryTenant,
        id: &str,
        resource: &Value,
        context: &RequestContext,
    ) -> ScimResult<Value> {
        let user = self.load_user(tenant, id).await?;
        let fields = self.config.patch_engine().full_field_set(resource);
        let updated = self
            .provider
            .update_user(&tenant.id, &user.id, fields)
            .await
            .map_err(|error| error.into_scim("User", id))?;

        info!(
            "[{}] replaced user {} for tenant '{}'",
            context.request_id, user.id, tenant.id
        );
        let rendered = render_user(&self.config, &updated);
        self.apply_active(tenant, &user.id, active_in_resource(resource), context)
            .await?;
        Ok(rendered)
    }

    /// PATCH /Users/{id}: apply the operation set atomically.
    pub async fn patch(
        &self,
        tenant: &DirectoryTenant,
        id: &str,
        body: &Value,
        context: &RequestContext,
    ) -> ScimResult<Value> {
        let user = self.load_user(tenant, id).await?;
        let request: PatchRequest = serde_json::from_value(body.clone())?;
        let outcome = self.config.patch_engine().apply(&request.operations)?;

        let updated = if outcome.updates.is_empty() {
            user.clone()
        } else {
            self.provider
                .update_user(&tenant.id, &user.id, outcome.updates.clone())
                .await
                .map_err(|error| error.into_scim("User", id))?
        };

        info!(
            "[{}] patched user {} for tenant '{}' ({} field update(s))",
            context.request_id,
            user.id,
            tenant.id,
            outcome.updates.len()
        );
        let rendered = render_user(&self.config, &updated);
        self.apply_active(tenant, &user.id, outcome.active, context)
            .await?;
        Ok(rendered)
    }

    /// DELETE /Users/{id}: deprovision, never hard-delete.
    pub async fn delete(
        &self,
        tenant: &DirectoryTenant,
        id: &str,
        context: &RequestContext,
    ) -> ScimResult<()> {
        let user = self.load_user(tenant, id).await?;
        self.provider
            .deprovision_user(&tenant.id, &user.id)
            .await
            .map_err(|error| error.into_scim("User", id))?;

        if let Some(callback) = self.config.on_deleted_user() {
            callback(&user);
        }
        info!(
            "[{}] deprovisioned user {} for tenant '{}'",
            context.request_id, user.id, tenant.id
        );
        Ok(())
    }

    async fn load_user(&self, tenant: &DirectoryTenant, id: &str) -> ScimResult<DirectoryUser> {
        self.provider
            .find_user(&tenant.id, self.config.id_field(), id)
            .await
            .map_err(|error| error.into_scim("User", id))
    }

    /// Dispatch the reprovision/deprovision hook, exactly once per request,
    /// outside the field-update write.
    async fn apply_active(
        &self,
        tenant: &DirectoryTenant,
        user_id: &str,
        directive: Option<bool>,
        context: &RequestContext,
    ) -> ScimResult<()> {
        match directive {
            Some(true) => {
                info!(
                    "[{}] reprovisioning user {} for tenant '{}'",
                    context.request_id, user_id, tenant.id
                );
                self.provider
                    .reprovision_user(&tenant.id, user_id)
                    .await
                    .map_err(|error| error.into_scim("User", user_id))
            }
            Some(false) => {
                info!(
                    "[{}] deprovisioning user {} for tenant '{}'",
                    context.request_id, user_id, tenant.id
                );
                self.provider
                    .deprovision_user(&tenant.id, user_id)
                    .await
                    .map_err(|error| error.into_scim("User", user_id))
            }
            None => Ok(()),
        }
    }
}
