//! Bidirectional resolution between SCIM path strings and backend field keys.
//!
//! [`attribute_for`] turns an opaque protocol path like
//! `emails[type eq "work"].value` into the backend key it maps to;
//! [`path_for`] finds the path a backend key lives at, for digging values out
//! of submitted resources. No other module walks mapping trees by hand.

use super::mapping::{AttributeMapping, MappingNode};
use serde_json::Value;

/// One step of a resolved attribute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    /// Descend into a named attribute
    Attribute(String),
    /// Select an element of a multi-valued attribute (always 0, the template)
    Index(usize),
}

impl PathStep {
    /// Convenience constructor for attribute steps.
    pub fn attribute(name: impl Into<String>) -> Self {
        Self::Attribute(name.into())
    }
}

/// A bracketed filter suffix on one path step: `[field op "literal"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StepFilter<'a> {
    field: &'a str,
    literal: &'a str,
}

/// Split one step token into its attribute name and optional filter suffix.
///
/// Returns `None` for a structurally broken suffix (unbalanced bracket or a
/// filter without three tokens), which the caller treats as a resolution miss.
fn parse_step(token: &str) -> Option<(&str, Option<StepFilter<'_>>)> {
    let Some(open) = token.find('[') else {
        return Some((token, None));
    };
    let rest = &token[open..];
    if !rest.ends_with(']') {
        return None;
    }
    let inner = &rest[1..rest.len() - 1];
    let mut parts = inner.splitn(3, ' ');
    let field = parts.next()?;
    let _operator = parts.next()?;
    let literal = parts.next()?;
    // Quotes may arrive raw or JSON-escaped; both forms strip to the bare literal.
    let literal = literal.trim_matches(|c| c == '"' || c == '\\');
    Some((&token[..open], Some(StepFilter { field, literal })))
}

/// Resolve a SCIM attribute path to a backend field key.
///
/// A `None` path yields `None`, signalling a whole-resource operation to the
/// caller. A leading `namespace:` segment (everything before the last `:`)
/// selects an extension sub-tree before the remaining dotted path is walked.
/// Matching is exact and case-sensitive; any miss short-circuits to `None`.
/// Total over every input: never panics.
pub fn attribute_for<'a>(path: Option<&str>, mapping: &'a AttributeMapping) -> Option<&'a str> {
    let path = path?;

    let (namespace, remainder) = match path.rsplit_once(':') {
        Some((namespace, remainder)) => (Some(namespace), remainder),
        None => (None, path),
    };

    let mut current: Option<&MappingNode> = match namespace {
        Some(namespace) => mapping.get(namespace),
        None => None,
    };

    let mut steps = remainder.split('.');
    if namespace.is_none() {
        let first = steps.next()?;
        current = lookup_root(mapping, first);
    }

    for token in steps {
        current = lookup_child(current?, token);
    }

    current?.leaf()
}

fn lookup_root<'a>(mapping: &'a AttributeMapping, token: &str) -> Option<&'a MappingNode> {
    let (name, filter) = parse_step(token)?;
    select(mapping.get(name)?, filter)
}

fn lookup_child<'a>(node: &'a MappingNode, token: &str) -> Option<&'a MappingNode> {
    let (name, filter) = parse_step(token)?;
    select(node.get(name)?, filter)
}

/// Apply multi-valued selection to a looked-up node.
///
/// With a filter, the template is selected only when its `field` leaf carries
/// the filter's literal as a backend key; without one, the sole template
/// element is taken. A filter on a non-multi node is ignored, as in the
/// original resolver.
fn select<'a>(node: &'a MappingNode, filter: Option<StepFilter<'_>>) -> Option<&'a MappingNode> {
    match node {
        MappingNode::Multi(template) => match filter {
            Some(filter) => {
                let field_key = template.get(filter.field)?.leaf()?;
                (field_key == filter.literal).then(|| template.as_ref())
            }
            None => Some(template),
        },
        other => Some(other),
    }
}

/// Find the path at which a backend key is mapped.
///
/// Depth-first, pre-order, in declaration order: each node's leaf value is
/// checked before its children are descended into. For a multi-valued node
/// only the template is visited, and a match inside it carries an explicit
/// `Index(0)` step. Returns `None` when no leaf holds `backend_key`.
pub fn path_for(backend_key: &str, mapping: &AttributeMapping) -> Option<Vec<PathStep>> {
    for (name, node) in mapping.entries() {
        if let Some(mut path) = path_for_node(backend_key, node) {
            path.insert(0, PathStep::attribute(name.clone()));
            return Some(path);
        }
    }
    None
}

fn path_for_node(backend_key: &str, node: &MappingNode) -> Option<Vec<PathStep>> {
    match node {
        MappingNode::Leaf(key) => (key == backend_key).then(Vec::new),
        MappingNode::Complex(entries) => {
            for (name, child) in entries {
                if let Some(mut path) = path_for_node(backend_key, child) {
                    path.insert(0, PathStep::attribute(name.clone()));
                    return Some(path);
                }
            }
            None
        }
        MappingNode::Multi(template) => {
            let mut path = path_for_node(backend_key, template)?;
            path.insert(0, PathStep::Index(0));
            Some(path)
        }
    }
}

/// Render a resolved path back into protocol path syntax.
///
/// Index steps are elided (an unfiltered step already selects the template),
/// and a leading extension URN joins with `:` instead of `.`, so the output
/// always resolves back through [`attribute_for`].
pub fn format_path(steps: &[PathStep]) -> String {
    let names: Vec<&str> = steps
        .iter()
        .filter_map(|step| match step {
            PathStep::Attribute(name) => Some(name.as_str()),
            PathStep::Index(_) => None,
        })
        .collect();
    match names.split_first() {
        None => String::new(),
        // An extension root contains ':'; joining its remainder with ':'
        // matches the namespace split attribute_for performs.
        Some((first, rest)) if first.contains(':') && !rest.is_empty() => {
            format!("{}:{}", first, rest.join("."))
        }
        _ => names.join("."),
    }
}

/// Dig a value out of a submitted JSON resource by a resolved path.
///
/// `Attribute` steps index objects, `Index` steps index arrays. Returns
/// `None` on any miss, which mutation handling treats as "not submitted".
pub fn resolve_value<'a>(value: &'a Value, steps: &[PathStep]) -> Option<&'a Value> {
    let mut current = value;
    for step in steps {
        current = match step {
            PathStep::Attribute(name) => current.get(name.as_str())?,
            PathStep::Index(index) => current.get(*index)?,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ENTERPRISE: &str = "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";

    fn user_mapping() -> AttributeMapping {
        AttributeMapping::from_value(&json!({
            "title": "job",
            "name": {"givenName": "first_name", "familyName": "last_name"},
            "emails": [{"type": "work", "value": "email"}],
            (ENTERPRISE): {"employeeNumber": "employee_id"},
        }))
        .expect("mapping should build")
    }

    #[test]
    fn resolves_a_simple_path() {
        assert_eq!(attribute_for(Some("title"), &user_mapping()), Some("job"));
    }

    #[test]
    fn resolves_a_nested_path() {
        assert_eq!(
            attribute_for(Some("name.givenName"), &user_mapping()),
            Some("first_name")
        );
    }

    #[test]
    fn misses_on_an_unknown_nested_attribute() {
        assert_eq!(attribute_for(Some("name.somethingElse"), &user_mapping()), None);
    }

    #[test]
    fn resolves_through_an_extension_namespace() {
        let path = format!("{ENTERPRISE}:employeeNumber");
        assert_eq!(
            attribute_for(Some(&path), &user_mapping()),
            Some("employee_id")
        );
    }

    #[test]
    fn resolves_a_matching_filter() {
        assert_eq!(
            attribute_for(Some("emails[type eq \"work\"].value"), &user_mapping()),
            Some("email")
        );
    }

    #[test]
    fn misses_when_the_filter_literal_does_not_match() {
        assert_eq!(
            attribute_for(Some("emails[type eq \"something\"].value"), &user_mapping()),
            None
        );
    }

    #[test]
    fn misses_when_the_filter_field_is_not_in_the_template() {
        let mapping = AttributeMapping::from_value(&json!({
            "emails": [{"value": "email"}],
        }))
        .unwrap();
        assert_eq!(
            attribute_for(Some("emails[type eq \"work\"].value"), &mapping),
            None
        );
    }

    #[test]
    fn unfiltered_multi_step_takes_the_template() {
        assert_eq!(
            attribute_for(Some("emails.value"), &user_mapping()),
            Some("email")
        );
    }

    #[test]
    fn no_path_means_whole_resource() {
        assert_eq!(attribute_for(None, &user_mapping()), None);
    }

    #[test]
    fn never_panics_on_garbage() {
        let mapping = user_mapping();
        for path in ["", ".", "..", "a[", "a[b]", "emails[type eq]", "a.b.c.d", ":", "x:y"] {
            let _ = attribute_for(Some(path), &mapping);
        }
    }

    #[test]
    fn finds_the_path_of_a_nested_key() {
        assert_eq!(
            path_for("first_name", &user_mapping()),
            Some(vec![
                PathStep::attribute("name"),
                PathStep::attribute("givenName"),
            ])
        );
    }

    #[test]
    fn finds_a_key_inside_a_template_with_an_explicit_index() {
        assert_eq!(
            path_for("email", &user_mapping()),
            Some(vec![
                PathStep::attribute("emails"),
                PathStep::Index(0),
                PathStep::attribute("value"),
            ])
        );
    }

    #[test]
    fn misses_an_unmapped_key() {
        assert_eq!(path_for("middle_name", &user_mapping()), None);
    }

    #[test]
    fn round_trips_every_leaf() {
        let mapping = user_mapping();
        for key in ["job", "first_name", "last_name", "email", "employee_id"] {
            let path = path_for(key, &mapping).expect(key);
            let rendered = format_path(&path);
            assert_eq!(
                attribute_for(Some(&rendered), &mapping),
                Some(key),
                "round trip failed for {key} via {rendered}"
            );
        }
    }

    #[test]
    fn digs_submitted_values_by_resolved_path() {
        let resource = json!({
            "name": {"givenName": "Eleanor"},
            "emails": [{"value": "eleanor@example.com"}],
        });
        let path = vec![
            PathStep::attribute("emails"),
            PathStep::Index(0),
            PathStep::attribute("value"),
        ];
        assert_eq!(
            resolve_value(&resource, &path),
            Some(&json!("eleanor@example.com"))
        );
        assert_eq!(
            resolve_value(&resource, &[PathStep::attribute("missing")]),
            None
        );
    }
}
