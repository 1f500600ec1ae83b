//! Attribute-mapping schema trees and everything derived from them.
//!
//! The mapping tree is the single source of truth for this surface: path
//! resolution, filter resolution, discovery documents, and mutation handling
//! all consult the same immutable [`AttributeMapping`] instances.
//!
//! # Key Types
//!
//! - [`AttributeMapping`] / [`MappingNode`] - SCIM-name ⇄ backend-key tree
//! - [`PathStep`] - one step of a resolved path
//! - [`FieldRegistry`] / [`FieldDescriptor`] - backing-store field metadata
//! - [`DescriptorBuilder`] / [`AttributeDescriptor`] - schema-document synthesis

pub mod descriptor;
pub mod fields;
pub mod mapping;
pub mod path;

pub use descriptor::{
    AttributeDescriptor, DescriptorBuilder, Mutability, Returned, ScimType, Uniqueness,
};
pub use fields::{ColumnKind, FieldDescriptor, FieldRegistry};
pub use mapping::{AttributeMapping, MappingNode};
pub use path::{PathStep, attribute_for, format_path, path_for, resolve_value};
