//! Synthesis of SCIM schema documents from the mapping trees.
//!
//! A [`DescriptorBuilder`] walks the merged read/write views together with
//! the field registry and derives one [`AttributeDescriptor`] per attribute.
//! Discovery documents and mutation handling consult the identical mapping
//! instances, so mutability advertised here is exactly what the PATCH path
//! enforces.

use super::fields::FieldRegistry;
use super::mapping::{AttributeMapping, MappingNode};
use super::path::PathStep;
use serde::{Deserialize, Serialize};

/// SCIM attribute data types (RFC 7643 §2.3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ScimType {
    String,
    Boolean,
    Decimal,
    Integer,
    DateTime,
    Reference,
    Complex,
}

/// Attribute mutability characteristics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Mutability {
    ReadOnly,
    ReadWrite,
    Immutable,
    WriteOnly,
}

/// When an attribute appears in representations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Returned {
    Always,
    Never,
}

/// Attribute uniqueness constraints.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Uniqueness {
    None,
    Server,
    Global,
}

/// One attribute of a synthesized schema document.
///
/// Derived per request from the mapping trees and field registry; never
/// stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub data_type: ScimType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_attributes: Option<Vec<AttributeDescriptor>>,
    pub multi_valued: bool,
    pub required: bool,
    pub case_exact: bool,
    pub mutability: Mutability,
    pub returned: Returned,
    pub uniqueness: Uniqueness,
}

/// Builds schema documents from a tenant's read view, write view, and field
/// registry.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorBuilder<'a> {
    read: &'a AttributeMapping,
    write: &'a AttributeMapping,
    registry: &'a FieldRegistry,
}

impl<'a> DescriptorBuilder<'a> {
    pub fn new(
        read: &'a AttributeMapping,
        write: &'a AttributeMapping,
        registry: &'a FieldRegistry,
    ) -> Self {
        Self {
            read,
            write,
            registry,
        }
    }

    /// Build the attribute list for a schema document.
    ///
    /// The read and write views are deep-merged (write fields additive over
    /// read), reserved top-level keys (`schemas`, `meta`) are dropped, and
    /// with a `schema_id` the walk is scoped to that extension sub-tree. Any
    /// entry whose name still contains `:` is excluded: extension roots never
    /// surface as plain attributes.
    pub fn schema(&self, schema_id: Option<&str>) -> Vec<AttributeDescriptor> {
        let merged = self.read.merged_with(self.write);
        match schema_id {
            None => merged
                .entries()
                .iter()
                .filter(|(name, _)| {
                    name != "schemas" && name != "meta" && !name.contains(':')
                })
                .map(|(name, node)| {
                    self.build_attribute(name, node, &[PathStep::attribute(name.clone())])
                })
                .collect(),
            Some(id) => match merged.get(id) {
                Some(MappingNode::Complex(entries)) => entries
                    .iter()
                    .filter(|(name, _)| !name.contains(':'))
                    .map(|(name, node)| {
                        self.build_attribute(
                            name,
                            node,
                            &[PathStep::attribute(id), PathStep::attribute(name.clone())],
                        )
                    })
                    .collect(),
                _ => Vec::new(),
            },
        }
    }

    /// Extension schema ids: every top-level key of the merged views whose
    /// name contains `:`.
    pub fn extension_schema_ids(&self) -> Vec<String> {
        self.read
            .merged_with(self.write)
            .entries()
            .iter()
            .filter(|(name, _)| name.contains(':'))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Derive the descriptor for one attribute.
    ///
    /// `path` is the node's full path from the root of the mapping trees,
    /// including the node itself; mutability and returned-ness test that path
    /// against the read and write views.
    pub fn build_attribute(
        &self,
        name: &str,
        node: &MappingNode,
        path: &[PathStep],
    ) -> AttributeDescriptor {
        let multi_valued = matches!(node, MappingNode::Multi(_));
        let element = match node {
            MappingNode::Multi(template) => template.as_ref(),
            other => other,
        };

        match element {
            MappingNode::Complex(entries) => {
                let sub_attributes: Vec<AttributeDescriptor> = entries
                    .iter()
                    .map(|(child_name, child)| {
                        let mut child_path = path.to_vec();
                        if multi_valued {
                            child_path.push(PathStep::Index(0));
                        }
                        child_path.push(PathStep::attribute(child_name.clone()));
                        self.build_attribute(child_name, child, &child_path)
                    })
                    .collect();

                AttributeDescriptor {
                    name: name.into(),
                    description: humanize(name),
                    data_type: ScimType::Complex,
                    multi_valued,
                    required: sub_attributes.iter().any(|sub| sub.required),
                    case_exact: true,
                    mutability: deferred_mutability(&sub_attributes),
                    returned: self.returned(path),
                    uniqueness: Uniqueness::None,
                    sub_attributes: Some(sub_attributes),
                }
            }
            MappingNode::Leaf(key) => AttributeDescriptor {
                name: name.into(),
                description: humanize(name),
                data_type: self.registry.scim_type(key),
                sub_attributes: None,
                multi_valued,
                required: self.registry.is_required(key),
                case_exact: true,
                mutability: self.leaf_mutability(path),
                returned: self.returned(path),
                uniqueness: if self.registry.is_unique(key) {
                    Uniqueness::Server
                } else {
                    Uniqueness::None
                },
            },
            // A multi template can only be a leaf or a branch.
            MappingNode::Multi(_) => unreachable!("nested multi-valued template"),
        }
    }

    fn leaf_mutability(&self, path: &[PathStep]) -> Mutability {
        let mutable = self.write.dig(path).is_some();
        let returned = self.read.dig(path).is_some();
        match (mutable, returned) {
            (true, true) => Mutability::ReadWrite,
            (true, false) => Mutability::WriteOnly,
            (false, _) => Mutability::ReadOnly,
        }
    }

    fn returned(&self, path: &[PathStep]) -> Returned {
        if self.read.dig(path).is_some() {
            Returned::Always
        } else {
            Returned::Never
        }
    }
}

/// A complex node's mutability, deferred to its children: readWrite when any
/// child is readWrite or children mix readOnly and writeOnly; writeOnly when
/// the only writable children are write-only; readOnly otherwise.
fn deferred_mutability(sub_attributes: &[AttributeDescriptor]) -> Mutability {
    let any_read_write = sub_attributes
        .iter()
        .any(|sub| sub.mutability == Mutability::ReadWrite);
    let any_read_only = sub_attributes
        .iter()
        .any(|sub| sub.mutability == Mutability::ReadOnly);
    let any_write_only = sub_attributes
        .iter()
        .any(|sub| sub.mutability == Mutability::WriteOnly);

    if any_read_write || (any_read_only && any_write_only) {
        Mutability::ReadWrite
    } else if any_write_only {
        Mutability::WriteOnly
    } else {
        Mutability::ReadOnly
    }
}

fn humanize(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}
