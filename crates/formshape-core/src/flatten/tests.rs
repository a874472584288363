use super::*;
use crate::trace::test_support::RecordingSink;

fn fields(entries: &[(&str, Value)]) -> ValueMap {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

fn item(entries: &[(&str, Value)]) -> RelatedItem {
    RelatedItem::new(fields(entries))
}

fn flattener() -> Flattener {
    Flattener::new(FlattenConfig::new())
}

#[test]
fn scalar_fields_map_to_plain_paths() {
    let map = flattener().flatten(
        &fields(&[("name", "Ada".into()), ("age", 36_u64.into())]),
        &[],
    );

    assert_eq!(map.get("name"), Some(&Value::Text("Ada".to_string())));
    assert_eq!(map.get("age"), Some(&Value::Uint(36)));
}

#[test]
fn formatted_suffix_collapses_onto_canonical_path() {
    let map = flattener().flatten(&fields(&[("total_formatted", "1,200.00".into())]), &[]);

    assert_eq!(
        map.get("total"),
        Some(&Value::Text("1,200.00".to_string()))
    );
    assert!(!map.contains_path("total_formatted"));
}

#[test]
fn json_object_literal_expands_without_raw_emission() {
    let map = flattener().flatten(
        &fields(&[("meta", r#"{"color":"red","size":9}"#.into())]),
        &[],
    );

    assert_eq!(map.get("meta.color"), Some(&Value::Text("red".to_string())));
    assert_eq!(map.get("meta.size"), Some(&Value::Uint(9)));
    assert!(!map.contains_path("meta"));
}

#[test]
fn json_array_literal_becomes_multi_value_path() {
    let map = flattener().flatten(&fields(&[("tags", r#"["a","b"]"#.into())]), &[]);

    assert_eq!(
        map.get("tags."),
        Some(&Value::from_slice(&["a", "b"]))
    );
    assert!(!map.contains_path("tags"));
}

#[test]
fn malformed_literal_stays_opaque_and_traces() {
    let sink = std::sync::Arc::new(RecordingSink::default());
    let flattener = flattener().with_trace(sink.clone());

    let raw = r#"["a" or "b"]"#;
    let map = flattener.flatten(&fields(&[("tags", raw.into())]), &[]);

    assert_eq!(map.get("tags"), Some(&Value::Text(raw.to_string())));
    assert_eq!(
        sink.events.lock().unwrap().as_slice(),
        &[ShapeTraceEvent::MalformedLiteral {
            path: "tags".to_string()
        }]
    );
}

#[test]
fn explicit_ids_key_relation_paths() {
    let relation = Relation::full(
        "members",
        vec![
            item(&[("id", 5_u64.into()), ("name", "ann".into())]),
            item(&[("id", 9_u64.into()), ("name", "bob".into())]),
            item(&[("id", 2_u64.into()), ("name", "cyd".into())]),
        ],
    );
    let map = flattener().flatten(&ValueMap::new(), &[relation]);

    assert_eq!(map.get("members.5.name"), Some(&Value::Text("ann".into())));
    assert_eq!(map.get("members.9.name"), Some(&Value::Text("bob".into())));
    assert_eq!(map.get("members.2.name"), Some(&Value::Text("cyd".into())));
    assert!(!map.contains_path("members.1.name"));
}

#[test]
fn positional_fallback_counts_from_one() {
    let relation = Relation::full(
        "notes",
        vec![item(&[("body", "x".into())]), item(&[("body", "y".into())])],
    );
    let map = flattener().flatten(&ValueMap::new(), &[relation]);

    assert_eq!(map.get("notes.1.body"), Some(&Value::Text("x".into())));
    assert_eq!(map.get("notes.2.body"), Some(&Value::Text("y".into())));
}

#[test]
fn number_field_locator_beats_position() {
    let config = FlattenConfig::new().with_number_field(["details", "number"]);
    let inner = fields(&[("number", 77_u64.into())]);
    let relation = Relation::full(
        "lines",
        vec![item(&[("details", Value::Map(inner)), ("qty", 3_u64.into())])],
    );
    let map = Flattener::new(config).flatten(&ValueMap::new(), &[relation]);

    assert_eq!(map.get("lines.77.qty"), Some(&Value::Uint(3)));
}

#[test]
fn pivot_fields_nest_under_single_pivot_segment() {
    let relation = Relation::full(
        "roles",
        vec![
            item(&[("id", 4_u64.into()), ("label", "admin".into())])
                .with_pivot(fields(&[("granted_by", 1_u64.into())])),
        ],
    );
    let map = flattener().flatten(&ValueMap::new(), &[relation]);

    assert_eq!(map.get("roles.4.label"), Some(&Value::Text("admin".into())));
    assert_eq!(map.get("roles.4.pivot.granted_by"), Some(&Value::Uint(1)));
    assert!(!map.contains_path("roles.4.pivot.pivot.granted_by"));
}

#[test]
fn single_field_mode_builds_positional_list() {
    let relation = Relation::single_field(
        "tags",
        "name",
        vec![
            item(&[("id", 8_u64.into()), ("name", "red".into())]),
            item(&[("id", 3_u64.into()), ("name", "blue".into())]),
        ],
    );
    let map = flattener().flatten(&ValueMap::new(), &[relation]);

    // ids never become path segments in this mode
    assert_eq!(map.get("tags"), Some(&Value::from_slice(&["red", "blue"])));
    assert!(!map.contains_path("tags.8.name"));
}

#[test]
fn time_fields_expand_additively() {
    let map = flattener().flatten(&fields(&[("meeting_time", "14:30:00".into())]), &[]);

    assert_eq!(
        map.get("meeting_time"),
        Some(&Value::Text("14:30:00".to_string()))
    );
    assert_eq!(
        map.get("meeting_time_hour"),
        Some(&Value::Text("2".to_string()))
    );
    assert_eq!(
        map.get("meeting_time_minutes"),
        Some(&Value::Text("30".to_string()))
    );
    assert_eq!(
        map.get("meeting_time_meridiem"),
        Some(&Value::Text("pm".to_string()))
    );
}

#[test]
fn midnight_and_noon_render_twelve() {
    let map = flattener().flatten(
        &fields(&[
            ("time_open", "00:15".into()),
            ("time_close", "12:45".into()),
        ]),
        &[],
    );

    assert_eq!(map.get("time_open_hour"), Some(&Value::Text("12".into())));
    assert_eq!(
        map.get("time_open_meridiem"),
        Some(&Value::Text("am".into()))
    );
    assert_eq!(map.get("time_close_hour"), Some(&Value::Text("12".into())));
    assert_eq!(
        map.get("time_close_meridiem"),
        Some(&Value::Text("pm".into()))
    );
}

#[test]
fn nested_map_fields_flatten_recursively() {
    let address = fields(&[("city", "Oslo".into()), ("zip", "0150".into())]);
    let map = flattener().flatten(&fields(&[("address", Value::Map(address))]), &[]);

    assert_eq!(map.get("address.city"), Some(&Value::Text("Oslo".into())));
    assert_eq!(map.get("address.zip"), Some(&Value::Text("0150".into())));
}

#[test]
fn prefix_applies_to_fields_and_relations() {
    let relation = Relation::full("lines", vec![item(&[("id", 1_u64.into())])]);
    let map = flattener().flatten_with_prefix(
        &fields(&[("status", "open".into())]),
        &[relation],
        "order",
    );

    assert_eq!(map.get("order.status"), Some(&Value::Text("open".into())));
    assert_eq!(map.get("order.lines.1.id"), Some(&Value::Uint(1)));
}
