// Integration tests for parser + evaluator
//
// These drive complete expressions end to end: parse, evaluate against
// JSON data, compare results structurally.

use jmespath_core::{parse, search, Error, RuntimeError, Value};
use serde_json::json;

fn run(expr: &str, data: serde_json::Value) -> Result<Value, Error> {
    search(expr, &Value::from(data))
}

fn ok(expr: &str, data: serde_json::Value) -> Value {
    run(expr, data).unwrap_or_else(|e| panic!("search({:?}) failed: {}", expr, e))
}

fn expect(expr: &str, data: serde_json::Value, want: serde_json::Value) {
    assert_eq!(ok(expr, data), Value::from(want), "expression: {}", expr);
}

#[test]
fn test_field_chains() {
    expect("a.b", json!({"a": {"b": "foo"}}), json!("foo"));
    expect("a.b.c.d", json!({"a": {"b": {"c": {"d": 42}}}}), json!(42));
    // missing fields are null, not errors
    expect("foo.bar", json!({"foo": {"baz": 1}}), json!(null));
    expect("foo.bar.baz", json!({}), json!(null));
}

#[test]
fn test_quoted_identifiers() {
    expect("\"a b\".c", json!({"a b": {"c": 1}}), json!(1));
    expect("\"odd.key\"", json!({"odd.key": 7}), json!(7));
}

#[test]
fn test_identity() {
    let data = json!({"a": [1, 2], "b": {"c": null}});
    expect("@", data.clone(), data);
    expect("@", json!(null), json!(null));
}

#[test]
fn test_indexing() {
    expect("a[1]", json!({"a": [10, 20, 30]}), json!(20));
    expect("a[-1]", json!({"a": [10, 20, 30]}), json!(30));
    expect("a[-1]", json!({"a": []}), json!(null));
    expect("a[5]", json!({"a": [10]}), json!(null));
    // chained indexes
    expect("a[0][1]", json!({"a": [[1, 2]]}), json!(2));
}

#[test]
fn test_slices() {
    let data = json!({"a": [0, 1, 2, 3, 4]});
    expect("a[1:3]", data.clone(), json!([1, 2]));
    expect("a[::2]", data.clone(), json!([0, 2, 4]));
    expect("a[::-1]", data.clone(), json!([4, 3, 2, 1, 0]));
    expect("s[2:]", json!({"s": "hello"}), json!("llo"));

    let err = run("a[::0]", data).unwrap_err();
    assert!(matches!(err, Error::Runtime(RuntimeError::InvalidSlice)));
}

#[test]
fn test_array_projections() {
    expect(
        "a[*].b",
        json!({"a": [{"b": 1}, {"b": 2}, {"c": 3}]}),
        json!([1, 2]),
    );
    expect("a[*].b", json!({"a": []}), json!([]));
    expect("a[*].b", json!({"a": {"b": 1}}), json!(null));
    // projections never contain null elements
    let result = ok("a[*].b", json!({"a": [{"b": null}, {"b": 1}, {}]}));
    assert!(!result.as_array().unwrap().iter().any(Value::is_null));
}

#[test]
fn test_object_projections() {
    expect(
        "ops.*.numArgs",
        json!({"ops": {"add": {"numArgs": 2}, "neg": {"numArgs": 1}, "nop": {}}}),
        json!([2, 1]),
    );
    expect("*.b", json!({"x": {"b": 1}, "y": {"c": 2}}), json!([1]));
}

#[test]
fn test_flatten() {
    expect("a[]", json!({"a": [[1, 2], [3], [[4]]]}), json!([1, 2, 3, [4]]));
    expect(
        "a[].b",
        json!({"a": [[{"b": 1}], [{"b": 2}, {"b": 3}]]}),
        json!([1, 2, 3]),
    );
    expect("a[]", json!({"a": "not an array"}), json!(null));
}

#[test]
fn test_filters() {
    let data = json!({"a": [{"b": 1}, {"b": 2}, {"b": 3}]});
    expect("a[?b > `1`]", data.clone(), json!([{"b": 2}, {"b": 3}]));
    expect("a[?b >= `2`].b", data.clone(), json!([2, 3]));
    expect("a[?b == `1`]", data.clone(), json!([{"b": 1}]));
    expect("a[?b != `1`].b", data, json!([2, 3]));
    // equality filters compare structurally
    expect(
        "a[?b == `[1, 2]`]",
        json!({"a": [{"b": [1, 2]}, {"b": [3]}]}),
        json!([{"b": [1, 2]}]),
    );
    // ordering a string against a number is null, which is falsy
    expect("a[?b > `1`]", json!({"a": [{"b": "x"}]}), json!([]));
}

#[test]
fn test_pipe_stops_projection() {
    let data = json!({"a": [{"b": 1}, {"b": 2}]});
    // projected: b applies per element
    expect("a[*].b", data.clone(), json!([1, 2]));
    // piped: the right side sees the whole array at once
    expect("a[*] | b", data.clone(), json!(null));
    expect("a[*].b | [0]", data, json!(1));
}

#[test]
fn test_pipe_agrees_with_subexpression_without_projections() {
    let data = Value::from(json!({"a": {"b": {"c": 3}}}));
    assert_eq!(
        search("a.b", &data).unwrap(),
        search("a | b", &data).unwrap()
    );
    assert_eq!(
        search("a.b.c", &data).unwrap(),
        search("a | b | c", &data).unwrap()
    );
}

#[test]
fn test_or_falls_through_falsy_values() {
    let data = json!({"n": null, "f": false, "s": "", "l": [], "o": {}, "v": "hit"});
    for falsy in ["n", "f", "s", "l", "o", "missing"] {
        expect(&format!("{} || v", falsy), data.clone(), json!("hit"));
    }
    expect("v || n", data.clone(), json!("hit"));
    // `a || b` equals `b` when a is falsy, `a` otherwise
    expect("n || f", data, json!(false));
}

#[test]
fn test_multi_select_lists() {
    expect("[a, b]", json!({"a": 1, "b": 2}), json!([1, 2]));
    expect("[a, missing]", json!({"a": 1}), json!([1, null]));
    expect(
        "a[*].[b, c]",
        json!({"a": [{"b": 1, "c": 2}, {"b": 3, "c": 4}]}),
        json!([[1, 2], [3, 4]]),
    );
    // a multi-select against null stays null
    expect("missing.[a, b]", json!({}), json!(null));
}

#[test]
fn test_multi_select_hashes() {
    expect(
        "{x: a, y: b.c}",
        json!({"a": 1, "b": {"c": 2}}),
        json!({"x": 1, "y": 2}),
    );
    expect("missing.{x: a}", json!({}), json!(null));

    // key order follows the expression, not the data
    let result = ok("{z: a, m: b, a: c}", json!({"a": 1, "b": 2, "c": 3}));
    let keys: Vec<&String> = result.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["z", "m", "a"]);
}

#[test]
fn test_literals() {
    expect("`null`", json!({"anything": true}), json!(null));
    expect("`{\"a\": 1}`", json!({}), json!({"a": 1}));
    expect("`\"quoted\"`", json!({}), json!("quoted"));
    expect("`bare`", json!({}), json!("bare"));
    expect("a[?b == `zap`]", json!({"a": [{"b": "zap"}]}), json!([{"b": "zap"}]));
}

#[test]
fn test_functions_end_to_end() {
    expect("length(@)", json!([1, 2, 3]), json!(3));
    expect("length(name)", json!({"name": "héllo"}), json!(5));
    expect("keys(@)", json!({"x": 1, "y": 2}), json!(["x", "y"]));
    expect("values(@)", json!({"x": 1, "y": 2}), json!([1, 2]));
    expect("sum(a)", json!({"a": [1, 2, 3]}), json!(6.0));
    expect("avg(a[*].n)", json!({"a": [{"n": 2}, {"n": 4}]}), json!(3.0));
    expect("max(a)", json!({"a": [2, 8, 5]}), json!(8));
    expect("min(a)", json!({"a": ["b", "a"]}), json!("a"));
    expect("abs(`-3`)", json!({}), json!(3.0));
    expect("ceil(`1.1`)", json!({}), json!(2.0));
    expect("floor(`1.9`)", json!({}), json!(1.0));
    expect(r#"join(`", "`, a)"#, json!({"a": ["x", "y"]}), json!("x, y"));
    expect("reverse(a)", json!({"a": [1, 2, 3]}), json!([3, 2, 1]));
    expect("contains(a, `2`)", json!({"a": [1, 2]}), json!(true));
    expect("starts_with(s, `ab`)", json!({"s": "abc"}), json!(true));
    expect("ends_with(s, `bc`)", json!({"s": "abc"}), json!(true));
    expect("to_array(`1`)", json!({}), json!([1]));
    expect("to_number(s)", json!({"s": "2.5"}), json!(2.5));
    expect("to_string(`2`)", json!({}), json!("2"));
    expect("type(a)", json!({"a": []}), json!("array"));
    expect("not_null(a, b, c)", json!({"b": null, "c": 3}), json!(3));
    expect("sort(a)", json!({"a": [3, 1, 2]}), json!([1, 2, 3]));
}

#[test]
fn test_functions_compose_with_projections() {
    let data = json!({"people": [
        {"name": "bo", "age": 25},
        {"name": "al", "age": 35},
        {"name": "cy", "age": 30}
    ]});
    expect("max(people[*].age)", data.clone(), json!(35));
    expect("sort(people[*].name)", data.clone(), json!(["al", "bo", "cy"]));
    expect("length(people[?age > `26`])", data, json!(2));
}

#[test]
fn test_expression_references() {
    expect(
        "sort_by(a, &n)",
        json!({"a": [{"n": 3}, {"n": 1}, {"n": 2}]}),
        json!([{"n": 1}, {"n": 2}, {"n": 3}]),
    );
    expect(
        "sort_by(people, &name)[0]",
        json!({"people": [{"name": "b"}, {"name": "a"}]}),
        json!({"name": "a"}),
    );
    expect(
        "max_by(a, &b.c)",
        json!({"a": [{"b": {"c": 1}}, {"b": {"c": 9}}]}),
        json!({"b": {"c": 9}}),
    );
    expect(
        "min_by(a, &n)",
        json!({"a": [{"n": 3}, {"n": 1}]}),
        json!({"n": 1}),
    );
    expect(
        "map(&b, a)",
        json!({"a": [{"b": 1}, {"c": 2}, {"b": 3}]}),
        json!([1, null, 3]),
    );
}

#[test]
fn test_boundary_cases() {
    // empty expression fails at position 1
    let err = parse("").unwrap_err();
    assert_eq!(err.pos, 1);

    // trailing garbage cites the stray token
    let err = parse("foo bar").unwrap_err();
    assert_eq!(err.pos, 5);

    // unterminated literals fail in the lexer, surfaced as parse errors
    assert!(parse("`abc").is_err());
    assert!(parse("\"abc").is_err());

    // length(null) is a runtime type error; length("") is 0
    assert!(matches!(
        run("length(missing)", json!({})).unwrap_err(),
        Error::Runtime(RuntimeError::InvalidType { .. })
    ));
    expect("length(s)", json!({"s": ""}), json!(0));

    // unknown functions are runtime errors
    assert!(matches!(
        run("frobnicate(@)", json!({})).unwrap_err(),
        Error::Runtime(RuntimeError::UnknownFunction { .. })
    ));
}

#[test]
fn test_parse_is_idempotent() {
    let exprs = [
        "a.b.c",
        "a[*].b[?c > `1`].d",
        "sort_by(a, &n)[0:2] | [0]",
        "{x: a[].b, y: `null`}",
    ];
    for expr in exprs {
        assert_eq!(parse(expr).unwrap(), parse(expr).unwrap());
    }
}

#[test]
fn test_errors_abort_projections() {
    // a runtime error on one element aborts the whole search, projections
    // only swallow nulls
    let err = run("a[*].length(b)", json!({"a": [{"b": "ok"}, {"b": 1}]})).unwrap_err();
    assert!(matches!(
        err,
        Error::Runtime(RuntimeError::InvalidType { .. })
    ));
}

#[test]
fn test_deeply_chained_query() {
    let data = json!({
        "reservations": [
            {"instances": [{"state": "running", "tags": ["a", "b"]},
                           {"state": "stopped", "tags": ["c"]}]},
            {"instances": [{"state": "running", "tags": []}]}
        ]
    });
    expect(
        "reservations[].instances[?state == `running`].state | []",
        data.clone(),
        json!(["running", "running"]),
    );
    expect(
        "reservations[].instances[].tags[] | length(@)",
        data,
        json!(3),
    );
}
