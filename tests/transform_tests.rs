use resolve_json::{
    Document, NodeKind, Value, Variables, parse_path, resolve, resolve_at, to_plain_object,
};
use serde_json::json;

/// Evaluate a standalone transform with no surrounding document.
fn transform(expr: serde_json::Value) -> Value {
    transform_at(json!({ "xf": expr }), "xf", json!({}))
}

/// Evaluate the expression at `path` inside `root`.
fn transform_at(root: serde_json::Value, path: &str, vars: serde_json::Value) -> Value {
    let mut doc = Document::from_json(root);
    resolve_at(&mut doc, &parse_path(path), &Variables::from_json(vars)).unwrap()
}

fn resolved_node(root: serde_json::Value, path: &str, vars: serde_json::Value) -> (NodeKind, Value) {
    let mut doc = Document::from_json(root);
    resolve(&mut doc, &Variables::from_json(vars)).unwrap();
    let node = doc.node_at(&parse_path(path)).unwrap();
    (node.kind.clone(), node.value.clone())
}

// ============================================================================
// xf_bool / xf_invert / xf_eq
// ============================================================================

#[test]
fn test_bool_all_truthy() {
    assert_eq!(
        transform(json!(["xf_bool", true, 1, "hello", {}, []])),
        Value::Boolean(true)
    );
}

#[test]
fn test_bool_false_on_zero() {
    assert_eq!(
        transform(json!(["xf_bool", true, {}, [], 42, 0])),
        Value::Boolean(false)
    );
}

#[test]
fn test_bool_false_on_empty_string() {
    assert_eq!(
        transform(json!(["xf_bool", true, {}, [], 42, ""])),
        Value::Boolean(false)
    );
}

#[test]
fn test_bool_false_on_false() {
    assert_eq!(
        transform(json!(["xf_bool", true, {}, [], 42, false])),
        Value::Boolean(false)
    );
}

#[test]
fn test_invert() {
    assert_eq!(transform(json!(["xf_invert", 0])), Value::Boolean(true));
    assert_eq!(transform(json!(["xf_invert", "x"])), Value::Boolean(false));
}

#[test]
fn test_eq_with_return_value() {
    assert_eq!(transform(json!(["xf_eq", 1, 1.0, "same"])), Value::from("same"));
    assert_eq!(transform(json!(["xf_eq", 1, 2, "same"])), Value::Boolean(false));
    assert_eq!(transform(json!(["xf_not_eq", "a", "b"])), Value::Boolean(true));
    assert_eq!(
        transform(json!(["xf_eq", {"a": [1]}, {"a": [1]}])),
        Value::Boolean(true)
    );
}

// ============================================================================
// xf_concat / xf_join / xf_hoist
// ============================================================================

#[test]
fn test_concat_flattens_one_level() {
    assert_eq!(
        transform(json!(["xf_concat", 1, 2, [3, 4], 5])).to_json(),
        json!([1, 2, 3, 4, 5])
    );
}

#[test]
fn test_concat_wraps_single_value() {
    assert_eq!(transform(json!(["xf_concat", 12])).to_json(), json!([12]));
}

#[test]
fn test_join_skips_null() {
    assert_eq!(
        transform(json!(["xf_join", "a", null, 1, 2.5, true])),
        Value::from("a12.5true")
    );
}

#[test]
fn test_hoist_of_empty_array_is_unresolved() {
    assert!(transform(json!(["xf_hoist", []])).is_unresolved());
    assert_eq!(transform(json!(["xf_hoist", [[1], 2]])).to_json(), json!([1]));
}

// ============================================================================
// xf_dateformat
// ============================================================================

#[test]
fn test_dateformat_token_array() {
    let result = transform(json!([
        "xf_dateformat",
        "2022-12-31T03:30:02",
        ["MM", "/", "dd", "/", "yyyy", " @ ", "h", ":", "mm", "a"],
    ]));
    assert_eq!(result, Value::from("12/31/2022 @ 3:30am"));
}

#[test]
fn test_dateformat_from_variable() {
    let result = transform_at(
        json!({"xf": ["xf_dateformat", "$when", "yyyy-MM-dd"]}),
        "xf",
        json!({"when": "2021-06-01T12:00:00Z"}),
    );
    assert_eq!(result, Value::from("2021-06-01"));
}

// ============================================================================
// xf_first
// ============================================================================

#[test]
fn test_first_returns_first_passing() {
    let result = transform(json!([
        "xf_first",
        [["xf_eq", 1, 1, "first"], ["xf_not_eq", 1, 2, "second"]],
    ]));
    assert_eq!(result, Value::from("first"));
}

#[test]
fn test_first_returns_last_passing() {
    let result = transform(json!([
        "xf_first",
        [
            ["xf_eq", 1, 2, "first"],
            ["xf_not_eq", 1, 1, "second"],
            ["xf_some", [1, 2, 3], 2, "third"],
        ],
    ]));
    assert_eq!(result, Value::from("third"));
}

#[test]
fn test_first_absolute_reference_as_return_value() {
    let result = transform_at(
        json!({
            "data": 42,
            "xf": ["xf_first", [["xf_eq", 1, 2, "not_eq"], ["xf_eq", 1, 1, "@/data"]]],
        }),
        "xf",
        json!({}),
    );
    assert_eq!(result, Value::Integer(42));
}

#[test]
fn test_first_relative_reference_as_return_value() {
    let result = transform_at(
        json!({
            "nesting": {
                "data": 42,
                "xf": [
                    "xf_first",
                    [["xf_eq", 1, 1, "@data"], ["xf_eq", 1, 1, "should not reach me"]],
                ],
            },
        }),
        "nesting/xf",
        json!({}),
    );
    assert_eq!(result, Value::Integer(42));
}

#[test]
fn test_first_skips_pending_candidates() {
    let result = transform_at(
        json!({"xf": ["xf_first", ["$missing", "fallback"]]}),
        "xf",
        json!({}),
    );
    assert_eq!(result, Value::from("fallback"));
}

#[test]
fn test_first_with_nothing_passing_is_unresolved() {
    assert!(transform(json!(["xf_first", [["xf_eq", 1, 2]]])).is_unresolved());
}

// ============================================================================
// xf_map
// ============================================================================

#[test]
fn test_map_with_join() {
    let result = transform(json!([
        "xf_map",
        ["Alice", "Frank", "Zorp"],
        ["xf_join", "__", "$", "__"],
    ]));
    assert_eq!(result.to_json(), json!(["__Alice__", "__Frank__", "__Zorp__"]));
}

#[test]
fn test_map_with_pick() {
    let result = transform(json!([
        "xf_map",
        [{"name": "Alice"}, {"name": "Frank"}, {"name": "Zorp"}],
        ["xf_pick", "$", ["name"]],
    ]));
    assert_eq!(result.to_json(), json!(["Alice", "Frank", "Zorp"]));
}

#[test]
fn test_map_with_bool() {
    let result = transform(json!([
        "xf_map",
        [0, false, "", 1, true, "testing"],
        ["xf_bool", "$"],
    ]));
    assert_eq!(
        result.to_json(),
        json!([false, false, false, true, true, true])
    );
}

#[test]
fn test_map_over_map() {
    let (kind, value) = resolved_node(
        json!({
            "xf": [
                "xf_map",
                ["xf_map", "$users", ["xf_pick", "$", ["name"]]],
                ["xf_join", "__", "$", "__"],
            ],
        }),
        "xf",
        json!({"users": [{"name": "Alice"}, {"name": "Frank"}, {"name": "Zorp"}]}),
    );
    assert!(matches!(kind, NodeKind::Transform { .. }));
    assert_eq!(value.to_json(), json!(["__Alice__", "__Frank__", "__Zorp__"]));
}

#[test]
fn test_map_over_concat() {
    let result = transform_at(
        json!({
            "data": {"one": "one", "two": "two", "three": "three"},
            "numbers": [1, 2, 3],
            "xf": [
                "xf_map",
                ["xf_concat", "@/numbers", "@/data/one", "@/data/two", "@/data/three"],
                ["xf_pick", "$"],
            ],
        }),
        "xf",
        json!({}),
    );
    assert_eq!(result.to_json(), json!([1, 2, 3, "one", "two", "three"]));
}

#[test]
fn test_map_source_absolute_string_reference() {
    let (_, value) = resolved_node(
        json!({
            "nesting": {"names": ["xf_map", "@/users", ["xf_pick", "$", ["name"]]]},
            "users": [{"name": "Alice"}, {"name": "Frank"}, {"name": "Zorp"}],
        }),
        "nesting/names",
        json!({}),
    );
    assert_eq!(value.to_json(), json!(["Alice", "Frank", "Zorp"]));
}

#[test]
fn test_map_source_absolute_array_reference() {
    let (_, value) = resolved_node(
        json!({
            "nesting": {
                "names": ["xf_map", ["@@/users", "$object_type"], ["xf_pick", "$", ["name"]]],
            },
            "users": {"client_client": [{"name": "Alice"}, {"name": "Frank"}, {"name": "Zorp"}]},
        }),
        "nesting/names",
        json!({"object_type": "client_client"}),
    );
    assert_eq!(value.to_json(), json!(["Alice", "Frank", "Zorp"]));
}

#[test]
fn test_map_source_relative_string_reference() {
    let (_, value) = resolved_node(
        json!({
            "names": ["xf_map", "@users", ["xf_pick", "$", ["name"]]],
            "users": [{"name": "Alice"}, {"name": "Frank"}, {"name": "Zorp"}],
        }),
        "names",
        json!({}),
    );
    assert_eq!(value.to_json(), json!(["Alice", "Frank", "Zorp"]));
}

#[test]
fn test_map_source_relative_array_reference() {
    let (_, value) = resolved_node(
        json!({
            "nesting": {
                "users": {"client_client": [{"name": "Alice"}, {"name": "Frank"}, {"name": "Zorp"}]},
                "names": ["xf_map", ["@@users", "$object_type"], ["xf_pick", "$", ["name"]]],
            },
        }),
        "nesting/names",
        json!({"object_type": "client_client"}),
    );
    assert_eq!(value.to_json(), json!(["Alice", "Frank", "Zorp"]));
}

#[test]
fn test_map_with_object_template() {
    let (_, value) = resolved_node(
        json!({
            "names": [
                "xf_map",
                "$users",
                {
                    "full_name": [
                        "xf_join",
                        ["xf_pick", "$", ["first_name"]],
                        " ",
                        ["xf_pick", "$", ["last_name"]],
                    ],
                },
            ],
        }),
        "names",
        json!({"users": [
            {"first_name": "Alice", "last_name": "Smith"},
            {"first_name": "Frank", "last_name": "Smith"},
            {"first_name": "Zorp", "last_name": "Smith"},
        ]}),
    );
    assert_eq!(
        value.to_json(),
        json!([
            {"full_name": "Alice Smith"},
            {"full_name": "Frank Smith"},
            {"full_name": "Zorp Smith"},
        ])
    );
}

#[test]
fn test_map_template_reference_leaves_document_alone() {
    let mut doc = Document::from_json(json!({
        "prefix": "__",
        "nesting": {
            "names": [
                "xf_map",
                ["xf_map", "$users", ["xf_pick", "$", ["name"]]],
                {"data": ["xf_join", "@/prefix", "$"]},
            ],
        },
    }));
    let vars = Variables::from_json(json!({
        "users": [{"name": "Alice"}, {"name": "Frank"}, {"name": "Zorp"}],
    }));
    resolve(&mut doc, &vars).unwrap();

    let result = to_plain_object(&doc).to_json();
    assert_eq!(
        result["nesting"]["names"],
        json!([{"data": "__Alice"}, {"data": "__Frank"}, {"data": "__Zorp"}])
    );
    assert_eq!(result["nesting"].get("prefix"), None);
}

#[test]
fn test_map_with_pending_element_is_unresolved() {
    let result = transform_at(
        json!({"xf": ["xf_map", [1, 2], ["xf_join", "$", "$suffix"]]}),
        "xf",
        json!({}),
    );
    assert!(result.is_unresolved());
}

#[test]
fn test_map_over_non_array_is_unresolved() {
    assert!(transform(json!(["xf_map", "nope", ["xf_pick", "$"]])).is_unresolved());
}

// ============================================================================
// xf_pick
// ============================================================================

#[test]
fn test_pick_nested_path() {
    let result = transform_at(
        json!({"data": {"array": ["one", "two"]}, "xf": ["xf_pick", "@/data", ["array", 1]]}),
        "xf",
        json!({}),
    );
    assert_eq!(result, Value::from("two"));
}

#[test]
fn test_pick_without_path_is_identity() {
    let result = transform_at(
        json!({"data": "data", "xf": ["xf_pick", "@/data"]}),
        "xf",
        json!({}),
    );
    assert_eq!(result, Value::from("data"));
}

#[test]
fn test_pick_with_empty_path_is_identity() {
    let result = transform_at(
        json!({"data": "data", "xf": ["xf_pick", "@/data", []]}),
        "xf",
        json!({}),
    );
    assert_eq!(result, Value::from("data"));
}

// ============================================================================
// xf_some
// ============================================================================

#[test]
fn test_some_with_boolean_comparator() {
    let result = transform_at(
        json!({"xf": ["xf_some", "$users", ["xf_eq", ["xf_pick", "$", ["name"]], "Zorp"]]}),
        "xf",
        json!({"users": [{"name": "Alice"}, {"name": "Frank"}, {"name": "Zorp"}]}),
    );
    assert_eq!(result, Value::Boolean(true));
}

#[test]
fn test_some_with_absolute_reference_comparator() {
    let result = transform_at(
        json!({"data": "Frank", "xf": ["xf_some", ["Alice", "Frank", "Zorp"], "@/data"]}),
        "xf",
        json!({}),
    );
    assert_eq!(result, Value::Boolean(true));
}

#[test]
fn test_some_with_relative_reference_comparator() {
    let result = transform_at(
        json!({
            "nesting": {"data": "Frank", "xf": ["xf_some", ["Alice", "Frank", "Zorp"], "@data"]},
        }),
        "nesting/xf",
        json!({}),
    );
    assert_eq!(result, Value::Boolean(true));
}

#[test]
fn test_some_with_return_value() {
    assert_eq!(
        transform(json!(["xf_some", [1, 2, 3], 2, "found"])),
        Value::from("found")
    );
    assert_eq!(
        transform(json!(["xf_some", [1, 2, 3], 4, "found"])),
        Value::Boolean(false)
    );
}

#[test]
fn test_some_waits_for_its_comparator() {
    let mut doc = Document::from_json(json!({
        "t": ["xf_some", "$items", ["xf_eq", "$", "$target"]],
    }));

    resolve(&mut doc, &Variables::from_json(json!({"items": [1, 2, 3]}))).unwrap();
    assert!(to_plain_object(&doc).get_field("t").unwrap().is_unresolved());

    resolve(&mut doc, &Variables::from_json(json!({"items": [1, 2, 3], "target": 2}))).unwrap();
    assert_eq!(to_plain_object(&doc).get_field("t"), Some(&Value::Boolean(true)));
}
