//! The PATCH operation state machine.
//!
//! One PATCH request is one atomic unit: `Begin → ApplyOperations(0..n) →
//! Commit | Abort`. The engine is pure: it reduces the operation list to a
//! flat field-update set (plus an active-status directive) without touching
//! the store. The caller applies the whole set in a single directory update,
//! so an abort anywhere leaves nothing partially written.

use crate::error::{ScimError, ScimResult};
use crate::schema::{AttributeMapping, attribute_for, path_for, resolve_value};
use serde::Deserialize;
use serde_json::{Map, Value};

/// One `{op, path, value}` instruction within a PATCH request body.
#[derive(Debug, Clone, Deserialize)]
pub struct PatchOperation {
    pub op: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
}

/// A SCIM PatchOp request body (RFC 7644 §3.5.2).
#[derive(Debug, Clone, Deserialize)]
pub struct PatchRequest {
    #[serde(default)]
    pub schemas: Vec<String>,
    #[serde(rename = "Operations", default)]
    pub operations: Vec<PatchOperation>,
}

/// Result of reducing a PATCH request: the flat update set to apply in one
/// store call, and the resolved active-status directive, if any.
#[derive(Debug, Clone, Default)]
pub struct PatchOutcome {
    /// Backend field updates, later operations overwriting earlier ones
    pub updates: Map<String, Value>,
    /// `Some(true)` → reprovision, `Some(false)` → deprovision, `None` → no hook
    pub active: Option<bool>,
}

/// Reduces PATCH operations (and PUT/CREATE resource bodies) to backend field
/// sets against a tenant's write view.
#[derive(Debug, Clone, Copy)]
pub struct PatchEngine<'a> {
    write: &'a AttributeMapping,
    mutable_attributes: &'a [String],
}

impl<'a> PatchEngine<'a> {
    pub fn new(write: &'a AttributeMapping, mutable_attributes: &'a [String]) -> Self {
        Self {
            write,
            mutable_attributes,
        }
    }

    /// Run the operation list through the state machine.
    ///
    /// Per operation:
    /// 1. a missing `value` aborts the whole request with
    ///    [`ScimError::UnsupportedPatchRequest`], regardless of `op`; remove
    ///    operations also require an explicit value on this surface;
    /// 2. `add`/`replace` without a path treat `value` as a whole resource
    ///    and extract every configured mutable attribute (misses dropped);
    ///    with a resolved path they update that single field; with an
    ///    unresolved path they are a no-op;
    /// 3. `remove` without a path aborts with [`ScimError::NoTarget`]; an
    ///    unresolved path is a no-op; a resolved one sets the field to null;
    /// 4. an unrecognized `op` is a no-op.
    pub fn apply(&self, operations: &[PatchOperation]) -> ScimResult<PatchOutcome> {
        let mut updates = Map::new();

        for operation in operations {
            let value = operation
                .value
                .as_ref()
                .ok_or(ScimError::UnsupportedPatchRequest)?;
            let attribute = attribute_for(operation.path.as_deref(), self.write);

            match operation.op.to_ascii_lowercase().as_str() {
                "add" | "replace" => match (&operation.path, attribute) {
                    (None, _) => updates.extend(self.submitted_fields(value)),
                    (Some(_), Some(attribute)) => {
                        updates.insert(attribute.to_string(), value.clone());
                    }
                    (Some(_), None) => {}
                },
                "remove" => {
                    if operation.path.is_none() {
                        return Err(ScimError::NoTarget);
                    }
                    if let Some(attribute) = attribute {
                        updates.insert(attribute.to_string(), Value::Null);
                    }
                }
                _ => {}
            }
        }

        Ok(PatchOutcome {
            active: active_in_operations(operations),
            updates,
        })
    }

    /// Extract the configured mutable attributes present in a submitted
    /// resource; attributes the resource does not carry are dropped.
    ///
    /// Used for whole-resource PATCH values.
    pub fn submitted_fields(&self, resource: &Value) -> Map<String, Value> {
        self.extract(resource, false)
    }

    /// Extract every configured mutable attribute from a submitted resource;
    /// attributes the resource does not carry become explicit nulls.
    ///
    /// Used for PUT and CREATE, where the submitted document is the full
    /// intended state.
    pub fn full_field_set(&self, resource: &Value) -> Map<String, Value> {
        self.extract(resource, true)
    }

    fn extract(&self, resource: &Value, fill_missing: bool) -> Map<String, Value> {
        let mut fields = Map::new();
        for attribute in self.mutable_attributes {
            let Some(steps) = path_for(attribute, self.write) else {
                continue;
            };
            match resolve_value(resource, &steps) {
                Some(value) => {
                    fields.insert(attribute.clone(), value.clone());
                }
                None if fill_missing => {
                    fields.insert(attribute.clone(), Value::Null);
                }
                None => {}
            }
        }
        fields
    }
}

/// Resolve the active-status directive of a PATCH operation set.
///
/// An operation matches when its path is literally `active`, or when it has
/// no path and its whole-resource value embeds an `active` member. The LAST
/// matching operation's raw submitted value decides the direction.
pub fn active_in_operations(operations: &[PatchOperation]) -> Option<bool> {
    let mut directive = None;
    for operation in operations {
        if operation.path.as_deref() == Some("active") {
            if let Some(value) = &operation.value {
                directive = Some(truthy(value));
            }
        } else if operation.path.is_none() {
            if let Some(value) = operation.value.as_ref().and_then(|value| value.get("active")) {
                directive = Some(truthy(value));
            }
        }
    }
    directive
}

/// Resolve the active-status directive of a flat submitted resource
/// (PUT/CREATE bodies).
pub fn active_in_resource(resource: &Value) -> Option<bool> {
    resource.get("active").map(truthy)
}

/// The accepted truthy literals are exactly `1`, `true`, `"TRUE"`, `"True"`,
/// and `"true"`; everything else is falsy.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_i64() == Some(1),
        Value::String(text) => matches!(text.as_str(), "TRUE" | "True" | "true"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_view() -> AttributeMapping {
        AttributeMapping::from_value(&json!({
            "name": {"givenName": "first_name", "familyName": "last_name"},
            "emails": [{"value": "email"}],
            "active": "active",
        }))
        .unwrap()
    }

    fn mutable() -> Vec<String> {
        vec![
            "first_name".into(),
            "last_name".into(),
            "email".into(),
            "active".into(),
        ]
    }

    fn operation(op: &str, path: Option<&str>, value: Option<Value>) -> PatchOperation {
        PatchOperation {
            op: op.into(),
            path: path.map(str::to_string),
            value,
        }
    }

    #[test]
    fn missing_value_aborts_regardless_of_op() {
        let write = write_view();
        let mutable = mutable();
        let engine = PatchEngine::new(&write, &mutable);

        for op in ["add", "replace", "remove", "bogus"] {
            let error = engine.apply(&[operation(op, Some("active"), None)]).unwrap_err();
            assert!(matches!(error, ScimError::UnsupportedPatchRequest));
        }
    }

    #[test]
    fn missing_value_mid_batch_discards_earlier_operations() {
        let write = write_view();
        let mutable = mutable();
        let engine = PatchEngine::new(&write, &mutable);

        let error = engine
            .apply(&[
                operation("add", Some("name.familyName"), Some(json!("Shellstrop"))),
                operation("replace", None, None),
            ])
            .unwrap_err();
        assert!(matches!(error, ScimError::UnsupportedPatchRequest));
    }

    #[test]
    fn remove_without_path_is_no_target() {
        let write = write_view();
        let mutable = mutable();
        let engine = PatchEngine::new(&write, &mutable);

        let error = engine
            .apply(&[operation("remove", None, Some(json!("anything")))])
            .unwrap_err();
        assert!(matches!(error, ScimError::NoTarget));
    }

    #[test]
    fn remove_with_resolved_path_nulls_the_field() {
        let write = write_view();
        let mutable = mutable();
        let engine = PatchEngine::new(&write, &mutable);

        let outcome = engine
            .apply(&[operation(
                "remove",
                Some("name.familyName"),
                Some(json!("ignored")),
            )])
            .unwrap();
        assert_eq!(outcome.updates.get("last_name"), Some(&Value::Null));
    }

    #[test]
    fn unresolved_paths_are_no_ops() {
        let write = write_view();
        let mutable = mutable();
        let engine = PatchEngine::new(&write, &mutable);

        let outcome = engine
            .apply(&[
                operation("add", Some("nickName"), Some(json!("Chidi"))),
                operation("remove", Some("nickName"), Some(json!("x"))),
            ])
            .unwrap();
        assert!(outcome.updates.is_empty());
    }

    #[test]
    fn unrecognized_op_is_a_no_op() {
        let write = write_view();
        let mutable = mutable();
        let engine = PatchEngine::new(&write, &mutable);

        let outcome = engine
            .apply(&[operation("move", Some("name.givenName"), Some(json!("X")))])
            .unwrap();
        assert!(outcome.updates.is_empty());
    }

    #[test]
    fn op_matching_is_case_insensitive() {
        let write = write_view();
        let mutable = mutable();
        let engine = PatchEngine::new(&write, &mutable);

        let outcome = engine
            .apply(&[operation("Replace", Some("name.givenName"), Some(json!("Otto")))])
            .unwrap();
        assert_eq!(outcome.updates.get("first_name"), Some(&json!("Otto")));
    }

    #[test]
    fn two_operations_accumulate_into_one_update_set() {
        let write = write_view();
        let mutable = mutable();
        let engine = PatchEngine::new(&write, &mutable);

        let outcome = engine
            .apply(&[
                operation("Add", Some("name.familyName"), Some(json!("User Family Name"))),
                operation("Add", Some("name.givenName"), Some(json!("Otto II"))),
            ])
            .unwrap();
        assert_eq!(outcome.updates.len(), 2);
        assert_eq!(
            outcome.updates.get("last_name"),
            Some(&json!("User Family Name"))
        );
        assert_eq!(outcome.updates.get("first_name"), Some(&json!("Otto II")));
    }

    #[test]
    fn whole_resource_value_extracts_configured_attributes_and_drops_misses() {
        let write = write_view();
        let mutable = mutable();
        let engine = PatchEngine::new(&write, &mutable);

        let outcome = engine
            .apply(&[operation(
                "replace",
                None,
                Some(json!({
                    "name": {"givenName": "Eleanor"},
                    "emails": [{"value": "eleanor@example.com"}],
                    "unconfigured": "dropped",
                })),
            )])
            .unwrap();

        assert_eq!(outcome.updates.get("first_name"), Some(&json!("Eleanor")));
        assert_eq!(
            outcome.updates.get("email"),
            Some(&json!("eleanor@example.com"))
        );
        assert!(!outcome.updates.contains_key("last_name"));
        assert!(!outcome.updates.contains_key("unconfigured"));
    }

    #[test]
    fn full_field_set_nulls_missing_attributes() {
        let write = write_view();
        let mutable = mutable();
        let engine = PatchEngine::new(&write, &mutable);

        let fields = engine.full_field_set(&json!({
            "name": {"givenName": "Eleanor"},
        }));
        assert_eq!(fields.get("first_name"), Some(&json!("Eleanor")));
        assert_eq!(fields.get("last_name"), Some(&Value::Null));
        assert_eq!(fields.get("email"), Some(&Value::Null));
    }

    #[test]
    fn active_directive_from_pathed_operation() {
        let ops = [operation("add", Some("active"), Some(json!("False")))];
        assert_eq!(active_in_operations(&ops), Some(false));

        let ops = [operation("replace", Some("active"), Some(json!(true)))];
        assert_eq!(active_in_operations(&ops), Some(true));
    }

    #[test]
    fn active_directive_from_whole_resource_value() {
        let ops = [operation("replace", None, Some(json!({"active": "false"})))];
        assert_eq!(active_in_operations(&ops), Some(false));
    }

    #[test]
    fn last_matching_operation_wins() {
        let ops = [
            operation("replace", Some("active"), Some(json!("true"))),
            operation("replace", None, Some(json!({"active": "false"}))),
        ];
        assert_eq!(active_in_operations(&ops), Some(false));
    }

    #[test]
    fn no_active_operation_means_no_hook() {
        let ops = [operation("add", Some("name.givenName"), Some(json!("X")))];
        assert_eq!(active_in_operations(&ops), None);
    }

    #[test]
    fn truthy_literal_table() {
        assert!(truthy(&json!(1)));
        assert!(truthy(&json!(true)));
        assert!(truthy(&json!("TRUE")));
        assert!(truthy(&json!("True")));
        assert!(truthy(&json!("true")));

        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!(2)));
        assert!(!truthy(&json!(false)));
        assert!(!truthy(&json!("yes")));
        assert!(!truthy(&json!("t")));
        assert!(!truthy(&json!(null)));
    }

    #[test]
    fn active_in_resource_reads_the_top_level_member() {
        assert_eq!(active_in_resource(&json!({"active": "true"})), Some(true));
        assert_eq!(active_in_resource(&json!({"active": 0})), Some(false));
        assert_eq!(active_in_resource(&json!({"userName": "x"})), None);
    }
}
