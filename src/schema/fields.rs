//! Backing-store field metadata, declared at configuration time.
//!
//! The original system introspected column types and validators at request
//! time; here that becomes a one-time adapter step producing a
//! [`FieldRegistry`] the descriptor builder reads from. Keys absent from the
//! registry fall back to string-typed, optional, non-unique fields.

use super::descriptor::ScimType;
use serde_json::Value;
use std::collections::HashMap;

/// Storage column kinds, mirroring the database-agnostic set the original
/// mapped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    PrimaryKey,
    Integer,
    BigInt,
    Float,
    Decimal,
    Numeric,
    DateTime,
    Date,
    Time,
    Boolean,
    Binary,
    String,
    Text,
}

impl ColumnKind {
    /// The SCIM attribute type a stored column of this kind surfaces as.
    pub fn scim_type(self) -> ScimType {
        match self {
            Self::PrimaryKey | Self::Integer | Self::BigInt => ScimType::Integer,
            Self::Float | Self::Decimal | Self::Numeric => ScimType::Decimal,
            Self::DateTime | Self::Date | Self::Time => ScimType::DateTime,
            Self::Boolean | Self::Binary => ScimType::Boolean,
            Self::String | Self::Text => ScimType::String,
        }
    }
}

/// Declared metadata for one backend field key.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Backend field key or accessor name
    pub key: String,
    /// Column kind for stored fields; `None` for accessor-backed keys
    pub kind: Option<ColumnKind>,
    /// Whether the store declares a presence constraint
    pub required: bool,
    /// Whether the store declares a uniqueness constraint
    pub unique: bool,
    /// Representative default value, used to type accessor-backed keys
    pub default_value: Option<Value>,
}

impl FieldDescriptor {
    /// A stored column with a declared kind.
    pub fn column(key: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            key: key.into(),
            kind: Some(kind),
            required: false,
            unique: false,
            default_value: None,
        }
    }

    /// An accessor-backed key typed by a representative default value.
    pub fn accessor(key: impl Into<String>, default_value: Value) -> Self {
        Self {
            key: key.into(),
            kind: None,
            required: false,
            unique: false,
            default_value: Some(default_value),
        }
    }

    /// Mark the field as carrying a presence constraint.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark the field as carrying a uniqueness constraint.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Per-tenant table of [`FieldDescriptor`]s, keyed by backend field key.
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    fields: HashMap<String, FieldDescriptor>,
}

impl FieldRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field descriptor, replacing any previous entry for its key.
    pub fn with_field(mut self, descriptor: FieldDescriptor) -> Self {
        self.fields.insert(descriptor.key.clone(), descriptor);
        self
    }

    /// Look up a descriptor by backend key.
    pub fn get(&self, key: &str) -> Option<&FieldDescriptor> {
        self.fields.get(key)
    }

    /// Declared column kind for a stored field, if any.
    pub fn column_kind(&self, key: &str) -> Option<ColumnKind> {
        self.get(key).and_then(|field| field.kind)
    }

    /// Whether the store declares a presence constraint on `key`.
    pub fn is_required(&self, key: &str) -> bool {
        self.get(key).is_some_and(|field| field.required)
    }

    /// Whether the store declares a uniqueness constraint on `key`.
    pub fn is_unique(&self, key: &str) -> bool {
        self.get(key).is_some_and(|field| field.unique)
    }

    /// Declared default value for an accessor-backed key.
    pub fn default_value(&self, key: &str) -> Option<&Value> {
        self.get(key).and_then(|field| field.default_value.as_ref())
    }

    /// SCIM type for a backend key: the column-kind table when the key names
    /// a stored field, otherwise the runtime type of the declared default
    /// value, in priority order boolean > decimal > integer > dateTime >
    /// string.
    pub fn scim_type(&self, key: &str) -> ScimType {
        if let Some(kind) = self.column_kind(key) {
            return kind.scim_type();
        }
        match self.default_value(key) {
            Some(Value::Bool(_)) => ScimType::Boolean,
            Some(Value::Number(number)) if number.is_f64() => ScimType::Decimal,
            Some(Value::Number(_)) => ScimType::Integer,
            Some(Value::String(text))
                if chrono::DateTime::parse_from_rfc3339(text).is_ok() =>
            {
                ScimType::DateTime
            }
            _ => ScimType::String,
        }
    }
}
