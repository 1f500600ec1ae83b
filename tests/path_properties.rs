//! Property coverage for the path resolver.

use proptest::prelude::*;
use scim_bridge::schema::{AttributeMapping, MappingNode, attribute_for, format_path, path_for};

fn leaf() -> impl Strategy<Value = MappingNode> {
    "[a-z_]{1,10}".prop_map(MappingNode::Leaf)
}

fn node() -> impl Strategy<Value = MappingNode> {
    leaf().prop_recursive(3, 24, 4, |inner| {
        let complex = prop::collection::btree_map("[a-zA-Z]{1,8}", inner, 1..4)
            .prop_map(|entries| MappingNode::Complex(entries.into_iter().collect()));
        prop_oneof![
            complex.clone(),
            complex.prop_map(|template| MappingNode::Multi(Box::new(template))),
            leaf().prop_map(|template| MappingNode::Multi(Box::new(template))),
        ]
    })
}

fn mapping() -> impl Strategy<Value = AttributeMapping> {
    prop::collection::btree_map("[a-zA-Z]{1,8}", node(), 1..5).prop_map(|entries| {
        AttributeMapping::from_entries(entries.into_iter().collect())
            .expect("generated siblings are unique by construction")
    })
}

fn leaf_keys(tree: &AttributeMapping) -> Vec<String> {
    fn collect(node: &MappingNode, keys: &mut Vec<String>) {
        match node {
            MappingNode::Leaf(key) => keys.push(key.clone()),
            MappingNode::Complex(entries) => {
                for (_, child) in entries {
                    collect(child, keys);
                }
            }
            MappingNode::Multi(template) => collect(template, keys),
        }
    }
    let mut keys = Vec::new();
    for (_, node) in tree.entries() {
        collect(node, &mut keys);
    }
    keys
}

proptest! {
    /// Every mapped backend key survives the path round trip:
    /// resolving the rendered form of its path finds the key again.
    #[test]
    fn path_round_trip(tree in mapping()) {
        for key in leaf_keys(&tree) {
            let steps = path_for(&key, &tree);
            prop_assert!(steps.is_some(), "'{key}' is mapped but has no path");
            let rendered = format_path(&steps.unwrap());
            prop_assert_eq!(
                attribute_for(Some(&rendered), &tree),
                Some(key.as_str()),
                "round trip through '{}' failed", rendered
            );
        }
    }

    /// Resolution is total: no input path can panic it.
    #[test]
    fn attribute_for_never_panics(path in ".{0,40}", tree in mapping()) {
        let _ = attribute_for(Some(&path), &tree);
    }

    /// Unmapped keys resolve to nothing.
    #[test]
    fn path_for_misses_unmapped_keys(tree in mapping(), key in "[A-Z0-9]{4,12}") {
        // Generated leaf keys are lowercase; this key cannot collide.
        prop_assert!(path_for(&key, &tree).is_none());
    }
}
