// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Framebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Framebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use rstest::{fixture, rstest};
use serde_json::json;

use super::*;
use crate::model::{DocumentModel, Geometry, MemoryGraph};

struct Mixed {
    graph: MemoryGraph,
    vertices: Vec<CellId>,
    edges: Vec<CellId>,
}

/// Two vertices joined by three parallel edges.
#[fixture]
fn mixed() -> Mixed {
    let mut graph = MemoryGraph::new();
    let a = graph.add_vertex("A", "", Geometry::new(0.0, 0.0, 120.0, 50.0));
    let b = graph.add_vertex("B", "", Geometry::new(0.0, 120.0, 120.0, 50.0));
    let edges = (0..3).map(|_| graph.add_edge(&a, &b, "").expect("edge")).collect();
    Mixed { graph, vertices: vec![a, b], edges }
}

fn as_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn kind_of<T: std::fmt::Debug>(result: Result<T, Rejection>) -> ErrorKind {
    result.expect_err("expected rejection").kind
}

#[rstest]
#[case("fillColor", PropertyKind::Color, false)]
#[case("fontSize", PropertyKind::Numeric, false)]
#[case("startSize", PropertyKind::Numeric, true)]
#[case("curved", PropertyKind::Boolean, true)]
#[case("dashed", PropertyKind::Boolean, false)]
#[case("endArrow", PropertyKind::Enum, true)]
#[case("verticalAlign", PropertyKind::Enum, false)]
#[case("whiteSpace", PropertyKind::Plain, false)]
fn rule_table_classifies_properties(
    #[case] name: &str,
    #[case] kind: PropertyKind,
    #[case] edge_only: bool,
) {
    let rule = rule_for(name);
    assert_eq!(rule.kind, kind);
    assert_eq!(rule.edge_only, edge_only);
}

#[rstest]
#[case(json!({"styles": {"fillColor": "#fff"}}), ErrorKind::InvalidFormat)]
#[case(json!({"target": "", "styles": {"fillColor": "#fff"}}), ErrorKind::InvalidFormat)]
#[case(json!({"target": "nodes", "styles": {"fillColor": "#fff"}}), ErrorKind::InvalidTarget)]
#[case(json!({"target": 3, "styles": {"fillColor": "#fff"}}), ErrorKind::InvalidTarget)]
#[case(json!({"target": "all"}), ErrorKind::InvalidFormat)]
#[case(json!({"target": "all", "styles": {}, "operations": {}}), ErrorKind::InvalidFormat)]
#[case(json!({"target": "all", "styles": "fillColor=red"}), ErrorKind::InvalidFormat)]
fn malformed_requests_are_rejected(#[case] payload: Value, #[case] expected: ErrorKind) {
    assert_eq!(kind_of(validate_request(&as_map(payload))), expected);
}

#[test]
fn request_with_operations_only_is_accepted() {
    let request = validate_request(&as_map(json!({
        "action": "modifyStyle",
        "target": "edges",
        "operations": {"strokeWidth": {"op": "increase", "value": 1}}
    })))
    .expect("valid request");
    assert_eq!(request.target, TargetSelector::Edges);
    assert_eq!(request.styles, None);
    assert_eq!(request.operations.map(|ops| ops.len()), Some(1));
}

#[rstest]
fn targets_enumerate_the_default_layer(mixed: Mixed) {
    assert_eq!(resolve_targets(TargetSelector::Edges, &mixed.graph), Ok(mixed.edges.clone()));
    assert_eq!(resolve_targets(TargetSelector::Vertices, &mixed.graph), Ok(mixed.vertices.clone()));
    assert_eq!(resolve_targets(TargetSelector::All, &mixed.graph).map(|cells| cells.len()), Ok(5));
}

#[rstest]
fn empty_selection_is_no_target_cells(mixed: Mixed) {
    assert_eq!(
        kind_of(resolve_targets(TargetSelector::Selected, &mixed.graph)),
        ErrorKind::NoTargetCells
    );
}

#[rstest]
fn selected_target_follows_the_selection(mut mixed: Mixed) {
    mixed.graph.set_selection(&mixed.vertices[..1]);
    assert_eq!(
        resolve_targets(TargetSelector::Selected, &mixed.graph),
        Ok(vec![mixed.vertices[0].clone()])
    );
}

#[rstest]
fn edge_only_properties_skip_vertices(mixed: Mixed) {
    let all = mixed.graph.child_cells(ChildFilter::All);
    assert_eq!(filter_for_property(&all, "startArrow", &mixed.graph), mixed.edges);
    assert_eq!(filter_for_property(&all, "fillColor", &mixed.graph).len(), 5);
}

#[rstest]
#[case("align", json!("left"), Ok("left"))]
#[case("endArrow", json!("diamondThin"), Ok("diamondThin"))]
#[case("opacity", json!(150), Ok("100"))]
#[case("rotation", json!("400"), Ok("360"))]
#[case("fontSize", json!(0), Ok("1"))]
#[case("strokeWidth", json!(2.5), Ok("2.5"))]
#[case("dashed", json!(true), Ok("1"))]
#[case("rounded", json!("0"), Ok("0"))]
#[case("fillColor", json!("#ff0000"), Ok("#ff0000"))]
#[case("whiteSpace", json!("wrap"), Ok("wrap"))]
#[case("align", json!("justify"), Err(ErrorKind::InvalidValue))]
#[case("endArrow", json!(1), Err(ErrorKind::InvalidValue))]
#[case("opacity", json!("half"), Err(ErrorKind::InvalidValue))]
#[case("shadow", json!(2), Err(ErrorKind::InvalidValue))]
#[case("fillColor", json!(255), Err(ErrorKind::InvalidValue))]
#[case("fillColor", json!("red;locked=1"), Err(ErrorKind::InvalidValue))]
#[case("whiteSpace", json!({"x": 1}), Err(ErrorKind::InvalidValue))]
#[case("", json!("x"), Err(ErrorKind::InvalidProperty))]
#[case("fill=Color", json!("x"), Err(ErrorKind::InvalidProperty))]
fn absolute_values_are_validated(
    #[case] name: &str,
    #[case] value: Value,
    #[case] expected: Result<&str, ErrorKind>,
) {
    let actual = validate_property(name, &value);
    match expected {
        Ok(stored) => assert_eq!(actual, Ok(stored.to_owned())),
        Err(kind) => assert_eq!(kind_of(actual), kind),
    }
}

#[test]
fn enum_rejection_lists_valid_values() {
    let rejection = validate_property("verticalAlign", &json!("center")).unwrap_err();
    assert_eq!(
        rejection.message,
        "Invalid value for verticalAlign: center. Valid values: top, middle, bottom"
    );
}

#[rstest]
#[case("rotation", OpKind::Set, 400.0, 90.0, 360.0)]
#[case("strokeWidth", OpKind::Decrease, 5.0, 2.0, 0.0)]
#[case("strokeWidth", OpKind::Increase, 1.5, 2.0, 3.5)]
#[case("opacity", OpKind::Multiply, 3.0, 50.0, 100.0)]
#[case("fontSize", OpKind::Decrease, 20.0, 11.0, 1.0)]
#[case("spacing", OpKind::Decrease, 10.0, 4.0, -6.0)]
#[case("whiteSpaceWidth", OpKind::Multiply, 2.0, 7.0, 14.0)]
fn operations_resolve_and_clamp(
    #[case] name: &str,
    #[case] op: OpKind,
    #[case] value: f64,
    #[case] current: f64,
    #[case] expected: f64,
) {
    assert_eq!(resolve_operation(name, op, value, current), Ok(expected));
}

#[test]
fn increase_twice_adds_twice_the_operand() {
    let once = resolve_operation("strokeWidth", OpKind::Increase, 2.0, 1.0).expect("first");
    let twice = resolve_operation("strokeWidth", OpKind::Increase, 2.0, once).expect("second");
    assert_eq!(twice, 5.0);
}

#[rstest]
#[case("fillColor", OpKind::Increase)]
#[case("dashed", OpKind::Multiply)]
#[case("align", OpKind::Decrease)]
fn non_numeric_kinds_only_support_set(#[case] name: &str, #[case] op: OpKind) {
    assert_eq!(kind_of(resolve_operation(name, op, 1.0, 0.0)), ErrorKind::UnsupportedOperation);
}

#[test]
fn overflowing_operation_is_invalid_value() {
    assert_eq!(
        kind_of(resolve_operation("spacing", OpKind::Multiply, f64::MAX, f64::MAX)),
        ErrorKind::InvalidValue
    );
}

#[rstest]
#[case(json!({"op": "increase", "value": 2}), Ok(OpKind::Increase))]
#[case(json!({"op": "set", "value": "#fff"}), Ok(OpKind::Set))]
#[case(json!({"op": "divide", "value": 2}), Err("Invalid operation type: divide"))]
#[case(json!({"op": "increase"}), Err("Invalid operation structure"))]
#[case(json!({"value": 2}), Err("Invalid operation structure"))]
#[case(json!(5), Err("Invalid operation structure"))]
fn operation_objects_are_parsed(#[case] raw: Value, #[case] expected: Result<OpKind, &str>) {
    match (parse_operation(&raw), expected) {
        (Ok((op, _)), Ok(kind)) => assert_eq!(op, kind),
        (Err(rejection), Err(message)) => {
            assert_eq!(rejection.kind, ErrorKind::InvalidOperation);
            assert_eq!(rejection.message, message);
        }
        (actual, expected) => panic!("got {actual:?}, expected {expected:?}"),
    }
}

#[rstest]
#[case(Some("2.5"), 2.5)]
#[case(Some(" 4 "), 4.0)]
#[case(Some("wide"), 0.0)]
#[case(None, 0.0)]
fn current_values_parse_leniently(#[case] raw: Option<&str>, #[case] expected: f64) {
    assert_eq!(current_number(raw), expected);
}

#[test]
fn numbers_render_without_trailing_zero() {
    assert_eq!(format_number(3.0), "3");
    assert_eq!(format_number(-0.0), "0");
    assert_eq!(format_number(0.25), "0.25");
}
