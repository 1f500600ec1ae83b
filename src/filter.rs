//! Parsing and resolution of SCIM filter expressions.
//!
//! This surface supports a single `attribute eq literal` clause. The
//! attribute resolves through the path resolver against the read view, and a
//! resolution miss is a protocol error surfaced before any store query runs,
//! distinct from a well-formed filter that matches zero records.

use crate::error::{ScimError, ScimResult};
use crate::schema::{AttributeMapping, attribute_for};

/// A parsed, resolved filter clause ready to hand to the backing store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterClause {
    /// Backend column the filter targets (already resolved)
    pub attribute: String,
    /// SCIM attribute name as submitted, kept for error reporting
    pub scim_attribute: String,
    /// Comparison literal, quotes stripped
    pub value: String,
}

impl FilterClause {
    /// Parse `<attribute> eq <literal>` and resolve the attribute against the
    /// read view.
    ///
    /// The literal may be quoted or bare and may contain spaces. Any operator
    /// other than `eq` is rejected as unsupported; an attribute with no
    /// mapping is rejected as unknown.
    pub fn parse(filter: &str, read: &AttributeMapping) -> ScimResult<Self> {
        let mut parts = filter.trim().splitn(3, ' ');
        let (Some(attribute), Some(operator), Some(literal)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(ScimError::UnsupportedFilter {
                detail: format!("expected '<attribute> eq <value>', got '{filter}'"),
            });
        };

        if !operator.eq_ignore_ascii_case("eq") {
            return Err(ScimError::UnsupportedFilter {
                detail: format!("operator '{operator}' is not supported"),
            });
        }

        let backend_key = attribute_for(Some(attribute), read).ok_or_else(|| {
            ScimError::UnknownFilterAttribute {
                attribute: attribute.to_string(),
            }
        })?;

        Ok(Self {
            attribute: backend_key.to_string(),
            scim_attribute: attribute.to_string(),
            value: literal.trim().trim_matches('"').to_string(),
        })
    }
}
