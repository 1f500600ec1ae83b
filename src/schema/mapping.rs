//! The attribute-mapping data model.
//!
//! An [`AttributeMapping`] is an immutable tree built once at configuration
//! time. Each leaf maps a SCIM attribute name to a backend field key, each
//! branch nests a sub-tree, and each multi-valued node holds a single template
//! element that all real instances share. The root may carry extension
//! sub-trees keyed by URN strings alongside the core namespace.

use crate::error::{ConfigError, ConfigResult};
use serde_json::Value;

/// One node of an attribute-mapping tree.
///
/// The three shapes the original heterogeneous tree could take are an explicit
/// tagged variant here, so every walk is a total match instead of open-ended
/// dynamic dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum MappingNode {
    /// Maps a SCIM attribute to a backend field key or accessor name
    Leaf(String),
    /// Nested attributes, in declaration order
    Complex(Vec<(String, MappingNode)>),
    /// Multi-valued attribute; the boxed node is the single template element
    Multi(Box<MappingNode>),
}

impl MappingNode {
    /// Look up a direct child by SCIM name. Only `Complex` nodes have children.
    pub fn get(&self, name: &str) -> Option<&MappingNode> {
        match self {
            MappingNode::Complex(entries) => entries
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, node)| node),
            _ => None,
        }
    }

    /// The backend key, if this node is a leaf.
    pub fn leaf(&self) -> Option<&str> {
        match self {
            MappingNode::Leaf(key) => Some(key),
            _ => None,
        }
    }
}

/// An immutable SCIM-name ⇄ backend-key mapping tree.
///
/// Two instances with the same shape but different leaf sets form the read
/// view (attributes returned in representations) and the write view
/// (attributes accepted in mutations) of a tenant's user schema.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeMapping {
    entries: Vec<(String, MappingNode)>,
}

impl AttributeMapping {
    /// Build a mapping from its JSON declaration.
    ///
    /// Strings become leaves, objects become branches, and single-element
    /// arrays become multi-valued templates. Duplicate sibling names and
    /// malformed templates fail here, at configuration time, never at
    /// request time.
    pub fn from_value(value: &Value) -> ConfigResult<Self> {
        let object = value.as_object().ok_or_else(|| {
            ConfigError::invalid("attribute mapping must be a JSON object at the top level")
        })?;

        let mut entries = Vec::with_capacity(object.len());
        for (name, child) in object {
            entries.push((name.clone(), Self::node_from_value(name, child)?));
        }
        let mapping = Self { entries };
        mapping.check_unique_siblings("", &mapping.entries)?;
        Ok(mapping)
    }

    /// Build a mapping from already-constructed nodes.
    ///
    /// Used by adapters that assemble trees programmatically; the same
    /// sibling-uniqueness validation applies.
    pub fn from_entries(entries: Vec<(String, MappingNode)>) -> ConfigResult<Self> {
        let mapping = Self { entries };
        mapping.check_unique_siblings("", &mapping.entries)?;
        Ok(mapping)
    }

    /// An empty mapping (no attributes readable or writable).
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn node_from_value(name: &str, value: &Value) -> ConfigResult<MappingNode> {
        match value {
            Value::String(key) => Ok(MappingNode::Leaf(key.clone())),
            Value::Object(children) => {
                let mut entries = Vec::with_capacity(children.len());
                for (child_name, child) in children {
                    entries.push((child_name.clone(), Self::node_from_value(child_name, child)?));
                }
                Ok(MappingNode::Complex(entries))
            }
            Value::Array(elements) => {
                // Exactly one template element, and never an array itself.
                if elements.len() != 1 || elements[0].is_array() {
                    return Err(ConfigError::InvalidTemplate { name: name.into() });
                }
                let template = Self::node_from_value(name, &elements[0])?;
                Ok(MappingNode::Multi(Box::new(template)))
            }
            _ => Err(ConfigError::invalid(format!(
                "attribute '{name}' must map to a string, object, or single-element array"
            ))),
        }
    }

    fn check_unique_siblings(
        &self,
        parent: &str,
        entries: &[(String, MappingNode)],
    ) -> ConfigResult<()> {
        for (index, (name, node)) in entries.iter().enumerate() {
            if entries[..index].iter().any(|(other, _)| other == name) {
                return Err(ConfigError::DuplicateAttribute {
                    name: name.clone(),
                    parent: if parent.is_empty() { "<root>" } else { parent }.into(),
                });
            }
            match node {
                MappingNode::Complex(children) => self.check_unique_siblings(name, children)?,
                MappingNode::Multi(template) => match template.as_ref() {
                    MappingNode::Complex(children) => {
                        self.check_unique_siblings(name, children)?;
                    }
                    MappingNode::Multi(_) => {
                        return Err(ConfigError::InvalidTemplate { name: name.clone() });
                    }
                    MappingNode::Leaf(_) => {}
                },
                MappingNode::Leaf(_) => {}
            }
        }
        Ok(())
    }

    /// Top-level entries in declaration order.
    pub fn entries(&self) -> &[(String, MappingNode)] {
        &self.entries
    }

    /// Look up a top-level attribute by SCIM name.
    pub fn get(&self, name: &str) -> Option<&MappingNode> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, node)| node)
    }

    /// Follow a resolved path through the tree.
    ///
    /// `Attribute` steps descend into branches, `Index` steps into
    /// multi-valued templates. Returns `None` as soon as a step misses.
    pub fn dig(&self, steps: &[super::PathStep]) -> Option<&MappingNode> {
        use super::PathStep;

        let mut iter = steps.iter();
        let mut node = match iter.next()? {
            PathStep::Attribute(name) => self.get(name)?,
            PathStep::Index(_) => return None,
        };
        for step in iter {
            node = match (step, node) {
                (PathStep::Attribute(name), current) => current.get(name)?,
                (PathStep::Index(_), MappingNode::Multi(template)) => template,
                (PathStep::Index(_), _) => return None,
            };
        }
        Some(node)
    }

    /// Deep-merge another mapping over this one, the other side winning.
    ///
    /// Matching branches merge recursively, matching multi-valued nodes merge
    /// their templates, and anything else is replaced by the other side's
    /// node. Entries unique to either side are kept, this side's first.
    pub fn merged_with(&self, other: &AttributeMapping) -> AttributeMapping {
        AttributeMapping {
            entries: Self::merge_entries(&self.entries, &other.entries),
        }
    }

    fn merge_entries(
        base: &[(String, MappingNode)],
        overlay: &[(String, MappingNode)],
    ) -> Vec<(String, MappingNode)> {
        let mut merged: Vec<(String, MappingNode)> = Vec::with_capacity(base.len());
        for (name, node) in base {
            let combined = match overlay.iter().find(|(other, _)| other == name) {
                Some((_, over)) => Self::merge_nodes(node, over),
                None => node.clone(),
            };
            merged.push((name.clone(), combined));
        }
        for (name, node) in overlay {
            if !base.iter().any(|(existing, _)| existing == name) {
                merged.push((name.clone(), node.clone()));
            }
        }
        merged
    }

    fn merge_nodes(base: &MappingNode, overlay: &MappingNode) -> MappingNode {
        match (base, overlay) {
            (MappingNode::Complex(a), MappingNode::Complex(b)) => {
                MappingNode::Complex(Self::merge_entries(a, b))
            }
            (MappingNode::Multi(a), MappingNode::Multi(b)) => {
                MappingNode::Multi(Box::new(Self::merge_nodes(a, b)))
            }
            (_, over) => over.clone(),
        }
    }
}
