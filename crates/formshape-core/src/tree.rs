//! Path tree reconstruction: from a flat [`PathMap`] (or a raw nested
//! input already supplied by a request) back to nested structure.
//!
//! Insertion is a genuine recursive write with no depth ceiling. An item
//! identifier that matches no loaded related item is not special-cased
//! here: the segment passes through unchanged so a persistence
//! collaborator can recognize the brand-new item downstream.

use crate::{
    path::{self, PathSegment},
    pathmap::PathMap,
    value::{Value, ValueMap},
};

/// The documented "missing" sentinel returned by read-path navigation.
const EMPTY: Value = Value::Null;

/// Rebuild the nested structure described by every path in the map.
#[must_use]
pub fn unflatten(map: &PathMap) -> Value {
    let mut root = ValueMap::new();

    for (path, value) in map.iter() {
        let segments = path::decode(path);
        insert_path(&mut root, &segments, value.clone());
    }

    Value::Map(root)
}

/// Rebuild only the subtree rooted at `selector`.
///
/// An absent root segment yields an empty collection, never an error.
#[must_use]
pub fn unflatten_at(map: &PathMap, selector: &str) -> Value {
    let tree = unflatten(map);

    match extract_at(&tree, selector) {
        Value::Null => Value::Map(ValueMap::new()),
        found => found.clone(),
    }
}

/// Navigate a nested structure by path for read access.
///
/// Returns the `Value::Null` sentinel when any segment along the way is
/// missing; never an error.
#[must_use]
pub fn extract_at<'a>(nested: &'a Value, path: &str) -> &'a Value {
    let mut current = nested;

    for segment in path::decode(path) {
        // trailing multi-value marker addresses the list itself
        if segment.is_empty() {
            continue;
        }

        let key = segment.key();
        match current {
            Value::Map(map) => match map.get(&key) {
                Some(next) => current = next,
                None => return &EMPTY,
            },
            _ => return &EMPTY,
        }
    }

    current
}

fn insert_path(node: &mut ValueMap, segments: &[PathSegment], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };
    let key = head.key();

    // a lone trailing Empty segment marks the multi-value assignment
    let rest = match rest {
        [PathSegment::Empty] => &[][..],
        other => other,
    };

    if rest.is_empty() {
        node.insert(key, value);
        return;
    }

    // scalar collisions are overwritten; the deeper path wins
    if !matches!(node.get(&key), Some(Value::Map(_))) {
        node.insert(key.clone(), Value::Map(ValueMap::new()));
    }
    if let Some(Value::Map(child)) = node.get_mut(&key) {
        insert_path(child, rest, value);
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::{FlattenConfig, Flattener};
    use proptest::prelude::*;

    fn map_of(entries: &[(&str, Value)]) -> PathMap {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn unflatten_rebuilds_nested_structure() {
        let flat = map_of(&[
            ("name", "Ada".into()),
            ("address.city", "Oslo".into()),
            ("address.geo.lat", "59.9".into()),
        ]);

        let tree = unflatten(&flat);

        assert_eq!(
            extract_at(&tree, "address.geo.lat"),
            &Value::Text("59.9".to_string())
        );
        assert_eq!(extract_at(&tree, "name"), &Value::Text("Ada".to_string()));
    }

    #[test]
    fn depth_is_unbounded() {
        let deep = "a.b.c.d.e.f.g.h.i.j.k";
        let flat = map_of(&[(deep, Value::Uint(1))]);

        assert_eq!(extract_at(&unflatten(&flat), deep), &Value::Uint(1));
    }

    #[test]
    fn trailing_dot_assigns_the_list() {
        let flat = map_of(&[("tags.", Value::from_slice(&["a", "b"]))]);
        let tree = unflatten(&flat);

        assert_eq!(extract_at(&tree, "tags"), &Value::from_slice(&["a", "b"]));
    }

    #[test]
    fn selector_returns_subtree() {
        let flat = map_of(&[
            ("order.status", "open".into()),
            ("order.total", 40_u64.into()),
            ("customer.name", "Ada".into()),
        ]);

        let subtree = unflatten_at(&flat, "order");
        let map = subtree.as_map().unwrap();

        assert_eq!(map.get("status"), Some(&Value::Text("open".into())));
        assert_eq!(map.get("total"), Some(&Value::Uint(40)));
        assert!(map.get("name").is_none());
    }

    #[test]
    fn absent_selector_root_yields_empty_collection() {
        let flat = map_of(&[("order.status", "open".into())]);

        assert_eq!(
            unflatten_at(&flat, "missing.branch"),
            Value::Map(ValueMap::new())
        );
    }

    #[test]
    fn extract_at_returns_null_sentinel() {
        let tree = unflatten(&map_of(&[("a.b", 1_u64.into())]));

        assert_eq!(extract_at(&tree, "a.x.y"), &Value::Null);
        assert_eq!(extract_at(&tree, "z"), &Value::Null);
    }

    #[test]
    fn unknown_relation_identifiers_pass_through() {
        // an identifier that matches no loaded item stays addressable so
        // persistence can treat it as a brand-new item
        let flat = map_of(&[("members.77.pivot.role", "admin".into())]);
        let tree = unflatten(&flat);

        assert_eq!(
            extract_at(&tree, "members.77.pivot.role"),
            &Value::Text("admin".to_string())
        );
    }

    ///
    /// PROPERTY
    ///

    fn arb_scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int),
            any::<u64>().prop_map(Value::Uint),
            // no JSON-literal lookalikes, no colons
            "[a-z0-9 ]{0,12}".prop_map(Value::Text),
        ]
    }

    fn arb_key() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9]{0,6}"
    }

    fn arb_nested() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            arb_scalar(),
            prop::collection::vec(arb_scalar(), 0..4).prop_map(Value::List),
        ];

        leaf.prop_recursive(4, 24, 4, |inner| {
            prop::collection::vec((arb_key(), inner), 1..4)
                .prop_map(|entries| Value::Map(entries.into_iter().collect()))
        })
    }

    proptest! {
        #[test]
        fn flatten_unflatten_round_trip(
            entries in prop::collection::vec((arb_key(), arb_nested()), 0..4)
        ) {
            let fields: ValueMap = entries.into_iter().collect();
            let flattener =
                Flattener::new(FlattenConfig::new().without_formatted_suffix());

            let flat = flattener.flatten(&fields, &[]);
            prop_assert_eq!(unflatten(&flat), Value::Map(fields));
        }
    }
}
