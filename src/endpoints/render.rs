//! SCIM representation synthesis from the read view.
//!
//! A user document is the read-view tree with every leaf replaced by the
//! user's backend field value. The reserved `schemas` entry passes its
//! declared URNs through verbatim, and `meta` is synthesized from the
//! configured timestamp fields rather than mapped.

use crate::config::ProvisioningConfig;
use crate::provider::DirectoryUser;
use crate::schema::MappingNode;
use serde_json::{Map, Value, json};

/// Render a user record as its SCIM representation.
pub fn render_user(config: &ProvisioningConfig, user: &DirectoryUser) -> Value {
    let mut document = Map::new();
    for (name, node) in config.user_schema().entries() {
        if name == "meta" {
            continue;
        }
        if name == "schemas" {
            document.insert(name.clone(), literal_values(node));
            continue;
        }
        document.insert(name.clone(), render_node(node, user));
    }
    document.insert("meta".into(), meta(config, user));
    Value::Object(document)
}

fn render_node(node: &MappingNode, user: &DirectoryUser) -> Value {
    match node {
        MappingNode::Leaf(key) => user.field(key).cloned().unwrap_or(Value::Null),
        MappingNode::Complex(entries) => {
            let mut object = Map::new();
            for (name, child) in entries {
                object.insert(name.clone(), render_node(child, user));
            }
            Value::Object(object)
        }
        MappingNode::Multi(template) => json!([render_node(template, user)]),
    }
}

/// The `schemas` entry declares literal URNs, not field keys.
fn literal_values(node: &MappingNode) -> Value {
    match node {
        MappingNode::Leaf(text) => json!([text]),
        MappingNode::Multi(template) => literal_values(template),
        MappingNode::Complex(_) => json!([]),
    }
}

fn meta(config: &ProvisioningConfig, user: &DirectoryUser) -> Value {
    let mut meta = Map::new();
    meta.insert("resourceType".into(), json!("User"));
    if let Some(created) = user.field(config.created_field()) {
        meta.insert("created".into(), created.clone());
    }
    if let Some(updated) = user.field(config.updated_field()) {
        meta.insert("lastModified".into(), updated.clone());
    }
    Value::Object(meta)
}
