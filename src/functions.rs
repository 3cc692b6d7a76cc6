// Built-in function implementations
// Each entry validates its Signature, then runs; dispatch is a name match

use std::cmp::Ordering;

use crate::evaluator::RuntimeError;
use crate::signature::{ParamType, Signature};
use crate::value::{ExpressionRef, Value};

/// Dispatch a built-in function call with already evaluated arguments.
///
/// This is also the default registry behind [`Runtime`](crate::Runtime):
/// a custom dispatcher may delegate here for any names it does not override.
pub fn dispatch(name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match name {
        "abs" => abs(&args),
        "avg" => avg(&args),
        "ceil" => ceil(&args),
        "contains" => contains(&args),
        "ends_with" => ends_with(&args),
        "floor" => floor(&args),
        "join" => join(&args),
        "keys" => keys(&args),
        "length" => length(&args),
        "map" => map(&args),
        "max" => max(&args),
        "max_by" => max_by(&args),
        "min" => min(&args),
        "min_by" => min_by(&args),
        "not_null" => not_null(&args),
        "reverse" => reverse(&args),
        "sort" => sort(&args),
        "sort_by" => sort_by(&args),
        "starts_with" => starts_with(&args),
        "sum" => sum(&args),
        "to_array" => to_array(&args),
        "to_number" => to_number(&args),
        "to_string" => to_string(&args),
        "type" => value_type(&args),
        "values" => values(&args),
        _ => Err(RuntimeError::UnknownFunction {
            function: name.to_string(),
        }),
    }
}

// ── Signature helpers ────────────────────────────────────────────────────────

const EMPTY: &Vec<Value> = &Vec::new();

fn number_or_string() -> ParamType {
    ParamType::Union(vec![ParamType::Number, ParamType::String])
}

fn array_of(elem: ParamType) -> ParamType {
    ParamType::Array(Some(Box::new(elem)))
}

/// Typed reduce over a number-or-string array: every element must share the
/// first element's concrete type. The signature has already restricted the
/// element types; this enforces homogeneity.
fn require_homogeneous(function: &str, position: usize, arr: &[Value]) -> Result<(), RuntimeError> {
    let expected = match arr.first() {
        Some(first) => first.type_of(),
        None => return Ok(()),
    };
    for v in arr {
        if v.type_of() != expected {
            return Err(RuntimeError::InvalidType {
                function: function.to_string(),
                position,
                expected: expected.to_string(),
                actual: v.type_of().to_string(),
            });
        }
    }
    Ok(())
}

/// Total order over homogeneous number-or-string values.
fn order_cmp(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// Decorate each element with the key computed by an expression reference.
/// Keys must be homogeneous numbers or strings.
fn keyed_elements(
    function: &str,
    arr: &[Value],
    expr: &ExpressionRef,
) -> Result<Vec<(Value, Value)>, RuntimeError> {
    let mut decorated = Vec::with_capacity(arr.len());
    for item in arr {
        let key = expr.apply(item)?;
        if !matches!(key, Value::Number(_) | Value::String(_)) {
            return Err(RuntimeError::InvalidType {
                function: function.to_string(),
                position: 2,
                expected: "number or string".to_string(),
                actual: key.type_of().to_string(),
            });
        }
        decorated.push((key, item.clone()));
    }
    if let Some((first, _)) = decorated.first() {
        let expected = first.type_of();
        for (key, _) in &decorated {
            if key.type_of() != expected {
                return Err(RuntimeError::InvalidType {
                    function: function.to_string(),
                    position: 2,
                    expected: expected.to_string(),
                    actual: key.type_of().to_string(),
                });
            }
        }
    }
    Ok(decorated)
}

// ── Implementations ──────────────────────────────────────────────────────────

fn abs(args: &[Value]) -> Result<Value, RuntimeError> {
    Signature::new(vec![ParamType::Number]).validate("abs", args)?;
    Ok(Value::Number(args[0].as_f64().unwrap_or_default().abs()))
}

fn avg(args: &[Value]) -> Result<Value, RuntimeError> {
    Signature::new(vec![array_of(ParamType::Number)]).validate("avg", args)?;
    let arr = args[0].as_array().unwrap_or(EMPTY);
    if arr.is_empty() {
        return Ok(Value::Null);
    }
    let total: f64 = arr.iter().filter_map(Value::as_f64).sum();
    Ok(Value::Number(total / arr.len() as f64))
}

fn ceil(args: &[Value]) -> Result<Value, RuntimeError> {
    Signature::new(vec![ParamType::Number]).validate("ceil", args)?;
    Ok(Value::Number(args[0].as_f64().unwrap_or_default().ceil()))
}

fn contains(args: &[Value]) -> Result<Value, RuntimeError> {
    Signature::new(vec![
        ParamType::Union(vec![ParamType::Array(None), ParamType::String]),
        ParamType::Any,
    ])
    .validate("contains", args)?;
    let found = match &args[0] {
        Value::Array(arr) => arr.iter().any(|v| v == &args[1]),
        Value::String(s) => match args[1].as_str() {
            Some(needle) => s.contains(needle),
            // a non-string needle is never contained in a string
            None => false,
        },
        _ => false,
    };
    Ok(Value::Bool(found))
}

fn ends_with(args: &[Value]) -> Result<Value, RuntimeError> {
    Signature::new(vec![ParamType::String, ParamType::String]).validate("ends_with", args)?;
    let subject = args[0].as_str().unwrap_or_default();
    let suffix = args[1].as_str().unwrap_or_default();
    Ok(Value::Bool(subject.ends_with(suffix)))
}

fn floor(args: &[Value]) -> Result<Value, RuntimeError> {
    Signature::new(vec![ParamType::Number]).validate("floor", args)?;
    Ok(Value::Number(args[0].as_f64().unwrap_or_default().floor()))
}

fn join(args: &[Value]) -> Result<Value, RuntimeError> {
    Signature::new(vec![ParamType::String, array_of(ParamType::String)]).validate("join", args)?;
    let sep = args[0].as_str().unwrap_or_default();
    let arr = args[1].as_array().unwrap_or(EMPTY);
    let parts: Vec<&str> = arr.iter().filter_map(Value::as_str).collect();
    Ok(Value::string(parts.join(sep)))
}

fn keys(args: &[Value]) -> Result<Value, RuntimeError> {
    Signature::new(vec![ParamType::Object]).validate("keys", args)?;
    let map = args[0].as_object().expect("validated as object");
    Ok(Value::array(
        map.keys().map(|k| Value::string(k.as_str())).collect(),
    ))
}

fn length(args: &[Value]) -> Result<Value, RuntimeError> {
    Signature::new(vec![ParamType::Union(vec![
        ParamType::Array(None),
        ParamType::String,
        ParamType::Object,
    ])])
    .validate("length", args)?;
    let n = match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::Array(arr) => arr.len(),
        Value::Object(map) => map.len(),
        _ => 0,
    };
    Ok(Value::from(n))
}

fn map(args: &[Value]) -> Result<Value, RuntimeError> {
    Signature::new(vec![ParamType::Expression, ParamType::Array(None)]).validate("map", args)?;
    let expr = args[0].as_expression().expect("validated as expression");
    let arr = args[1].as_array().unwrap_or(EMPTY);
    let mut result = Vec::with_capacity(arr.len());
    for item in arr {
        // unlike a projection, map keeps null results
        result.push(expr.apply(item)?);
    }
    Ok(Value::array(result))
}

fn max(args: &[Value]) -> Result<Value, RuntimeError> {
    Signature::new(vec![array_of(number_or_string())]).validate("max", args)?;
    let arr = args[0].as_array().unwrap_or(EMPTY);
    require_homogeneous("max", 1, arr)?;
    let mut best: Option<&Value> = None;
    for v in arr {
        match best {
            Some(b) if order_cmp(v, b) != Ordering::Greater => {}
            _ => best = Some(v),
        }
    }
    Ok(best.cloned().unwrap_or(Value::Null))
}

fn max_by(args: &[Value]) -> Result<Value, RuntimeError> {
    Signature::new(vec![ParamType::Array(None), ParamType::Expression])
        .validate("max_by", args)?;
    let arr = args[0].as_array().unwrap_or(EMPTY);
    let expr = args[1].as_expression().expect("validated as expression");
    let decorated = keyed_elements("max_by", arr, expr)?;
    let best = decorated
        .into_iter()
        .reduce(|best, cur| {
            if order_cmp(&cur.0, &best.0) == Ordering::Greater {
                cur
            } else {
                best
            }
        })
        .map(|(_, v)| v);
    Ok(best.unwrap_or(Value::Null))
}

fn min(args: &[Value]) -> Result<Value, RuntimeError> {
    Signature::new(vec![array_of(number_or_string())]).validate("min", args)?;
    let arr = args[0].as_array().unwrap_or(EMPTY);
    require_homogeneous("min", 1, arr)?;
    let mut best: Option<&Value> = None;
    for v in arr {
        match best {
            Some(b) if order_cmp(v, b) != Ordering::Less => {}
            _ => best = Some(v),
        }
    }
    Ok(best.cloned().unwrap_or(Value::Null))
}

fn min_by(args: &[Value]) -> Result<Value, RuntimeError> {
    Signature::new(vec![ParamType::Array(None), ParamType::Expression])
        .validate("min_by", args)?;
    let arr = args[0].as_array().unwrap_or(EMPTY);
    let expr = args[1].as_expression().expect("validated as expression");
    let decorated = keyed_elements("min_by", arr, expr)?;
    let best = decorated
        .into_iter()
        .reduce(|best, cur| {
            if order_cmp(&cur.0, &best.0) == Ordering::Less {
                cur
            } else {
                best
            }
        })
        .map(|(_, v)| v);
    Ok(best.unwrap_or(Value::Null))
}

fn not_null(args: &[Value]) -> Result<Value, RuntimeError> {
    Signature::variadic(vec![ParamType::Any]).validate("not_null", args)?;
    Ok(args
        .iter()
        .find(|v| !v.is_null())
        .cloned()
        .unwrap_or(Value::Null))
}

fn reverse(args: &[Value]) -> Result<Value, RuntimeError> {
    Signature::new(vec![ParamType::Union(vec![
        ParamType::Array(None),
        ParamType::String,
    ])])
    .validate("reverse", args)?;
    match &args[0] {
        Value::Array(arr) => Ok(Value::array(arr.iter().rev().cloned().collect())),
        Value::String(s) => Ok(Value::string(s.chars().rev().collect::<String>())),
        _ => Ok(Value::Null),
    }
}

fn sort(args: &[Value]) -> Result<Value, RuntimeError> {
    Signature::new(vec![array_of(number_or_string())]).validate("sort", args)?;
    let arr = args[0].as_array().unwrap_or(EMPTY);
    require_homogeneous("sort", 1, arr)?;
    let mut items = arr.clone();
    // Vec::sort_by is stable, so equal elements keep their input order
    items.sort_by(order_cmp);
    Ok(Value::array(items))
}

fn sort_by(args: &[Value]) -> Result<Value, RuntimeError> {
    Signature::new(vec![ParamType::Array(None), ParamType::Expression])
        .validate("sort_by", args)?;
    let arr = args[0].as_array().unwrap_or(EMPTY);
    let expr = args[1].as_expression().expect("validated as expression");
    let mut decorated = keyed_elements("sort_by", arr, expr)?;
    decorated.sort_by(|a, b| order_cmp(&a.0, &b.0));
    Ok(Value::array(decorated.into_iter().map(|(_, v)| v).collect()))
}

fn starts_with(args: &[Value]) -> Result<Value, RuntimeError> {
    Signature::new(vec![ParamType::String, ParamType::String]).validate("starts_with", args)?;
    let subject = args[0].as_str().unwrap_or_default();
    let prefix = args[1].as_str().unwrap_or_default();
    Ok(Value::Bool(subject.starts_with(prefix)))
}

fn sum(args: &[Value]) -> Result<Value, RuntimeError> {
    Signature::new(vec![array_of(ParamType::Number)]).validate("sum", args)?;
    let arr = args[0].as_array().unwrap_or(EMPTY);
    let total: f64 = arr.iter().filter_map(Value::as_f64).sum();
    Ok(Value::Number(total))
}

fn to_array(args: &[Value]) -> Result<Value, RuntimeError> {
    Signature::new(vec![ParamType::Any]).validate("to_array", args)?;
    match &args[0] {
        Value::Array(_) => Ok(args[0].clone()),
        other => Ok(Value::array(vec![other.clone()])),
    }
}

fn to_number(args: &[Value]) -> Result<Value, RuntimeError> {
    Signature::new(vec![ParamType::Any]).validate("to_number", args)?;
    match &args[0] {
        Value::Number(n) => Ok(Value::Number(*n)),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Value::Number(n)),
            _ => Ok(Value::Null),
        },
        _ => Ok(Value::Null),
    }
}

fn to_string(args: &[Value]) -> Result<Value, RuntimeError> {
    Signature::new(vec![ParamType::Any]).validate("to_string", args)?;
    match &args[0] {
        Value::String(_) => Ok(args[0].clone()),
        // Display renders compact JSON
        other => Ok(Value::string(other.to_string())),
    }
}

fn value_type(args: &[Value]) -> Result<Value, RuntimeError> {
    Signature::new(vec![ParamType::Any]).validate("type", args)?;
    Ok(Value::string(args[0].type_of()))
}

fn values(args: &[Value]) -> Result<Value, RuntimeError> {
    Signature::new(vec![ParamType::Object]).validate("values", args)?;
    let map = args[0].as_object().expect("validated as object");
    Ok(Value::array(map.values().cloned().collect()))
}

// ── Tests ────────────────────────────────────────────────────────────────────
