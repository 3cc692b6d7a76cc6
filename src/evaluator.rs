// Expression evaluator
// Tree-walking interpreter: one eval rule per AST variant

use std::rc::Rc;

use thiserror::Error;

use crate::ast::{AstNode, Comparator};
use crate::functions;
use crate::value::{ExpressionRef, Value};

/// A function dispatcher: receives the function name and the already
/// evaluated arguments. Installing one on a [`Runtime`](crate::Runtime)
/// replaces built-in dispatch entirely; the override may delegate to
/// [`functions::dispatch`] for names it does not handle.
pub type FnDispatcher = Rc<dyn Fn(&str, Vec<Value>) -> Result<Value, RuntimeError>>;

/// Runtime errors. These are the only failures evaluation can produce;
/// everything else in a well-typed expression degrades to null.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("Call to undefined function {function}")]
    UnknownFunction { function: String },

    #[error("Not enough arguments calling {function}: expected {expected}, found {actual}")]
    NotEnoughArguments {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error("Too many arguments calling {function}: expected {expected}, found {actual}")]
    TooManyArguments {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error("Argument {position} of {function} expects type {expected}, given {actual}")]
    InvalidType {
        function: String,
        position: usize,
        expected: String,
        actual: String,
    },

    #[error("Invalid slice: step cannot be zero")]
    InvalidSlice,

    #[error("Maximum recursion depth ({max}) exceeded")]
    RecursionLimit { max: usize },
}

const MAX_RECURSION_DEPTH: usize = 200;

/// Evaluator for parsed JMESPath expressions.
///
/// Holds no per-evaluation state beyond the recursion counter, so one
/// evaluator can run any number of searches. Input data is never mutated;
/// results share structure with the input through Rc.
pub struct Evaluator {
    dispatcher: Option<FnDispatcher>,
    depth: usize,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::with_dispatcher(None)
    }

    pub fn with_dispatcher(dispatcher: Option<FnDispatcher>) -> Self {
        Evaluator {
            dispatcher,
            depth: 0,
        }
    }

    /// Evaluate an AST node against data.
    ///
    /// Recursion depth equals AST depth; pathological nesting fails with
    /// `RecursionLimit` instead of overflowing the native stack.
    pub fn evaluate(&mut self, node: &AstNode, data: &Value) -> Result<Value, RuntimeError> {
        self.depth += 1;
        if self.depth > MAX_RECURSION_DEPTH {
            self.depth -= 1;
            return Err(RuntimeError::RecursionLimit {
                max: MAX_RECURSION_DEPTH,
            });
        }

        let result = self.evaluate_node(node, data);

        self.depth -= 1;
        result
    }

    fn evaluate_node(&mut self, node: &AstNode, data: &Value) -> Result<Value, RuntimeError> {
        match node {
            AstNode::Current => Ok(data.clone()),

            AstNode::Literal { value } => Ok(value.clone()),

            AstNode::Field { name } => Ok(data.get(name).cloned().unwrap_or(Value::Null)),

            AstNode::Index { index } => Ok(index_array(data, *index)),

            AstNode::Slice { start, stop, step } => slice_value(data, *start, *stop, *step),

            // A pipe evaluates exactly like a subexpression; it stops
            // projections purely through parse structure, because its left
            // subtree contains the whole projection.
            AstNode::Subexpression { left, right } | AstNode::Pipe { left, right } => {
                let l = self.evaluate(left, data)?;
                self.evaluate(right, &l)
            }

            AstNode::Or { left, right } => {
                let l = self.evaluate(left, data)?;
                if l.is_truthy() {
                    Ok(l)
                } else {
                    self.evaluate(right, data)
                }
            }

            AstNode::And { left, right } => {
                let l = self.evaluate(left, data)?;
                if l.is_truthy() {
                    self.evaluate(right, data)
                } else {
                    Ok(l)
                }
            }

            AstNode::Not { child } => Ok(Value::Bool(!self.evaluate(child, data)?.is_truthy())),

            AstNode::Flatten { child } => {
                let value = self.evaluate(child, data)?;
                match value {
                    Value::Array(arr) => {
                        let mut result = Vec::new();
                        for item in arr.iter() {
                            match item {
                                Value::Array(inner) => result.extend(inner.iter().cloned()),
                                other => result.push(other.clone()),
                            }
                        }
                        Ok(Value::array(result))
                    }
                    _ => Ok(Value::Null),
                }
            }

            AstNode::ArrayProjection { left, right } => {
                let l = self.evaluate(left, data)?;
                match l {
                    Value::Array(arr) => {
                        let mut result = Vec::new();
                        for item in arr.iter() {
                            let value = self.evaluate(right, item)?;
                            if !value.is_null() {
                                result.push(value);
                            }
                        }
                        Ok(Value::array(result))
                    }
                    _ => Ok(Value::Null),
                }
            }

            AstNode::ObjectProjection { left, right } => {
                let l = self.evaluate(left, data)?;
                match l {
                    Value::Object(map) => {
                        let mut result = Vec::new();
                        for item in map.values() {
                            let value = self.evaluate(right, item)?;
                            if !value.is_null() {
                                result.push(value);
                            }
                        }
                        Ok(Value::array(result))
                    }
                    _ => Ok(Value::Null),
                }
            }

            AstNode::MultiSelectList { children } => {
                if data.is_null() {
                    return Ok(Value::Null);
                }
                let mut result = Vec::with_capacity(children.len());
                for child in children {
                    result.push(self.evaluate(child, data)?);
                }
                Ok(Value::array(result))
            }

            AstNode::MultiSelectHash { pairs } => {
                if data.is_null() {
                    return Ok(Value::Null);
                }
                let mut map = indexmap::IndexMap::with_capacity(pairs.len());
                for (key, child) in pairs {
                    map.insert(key.clone(), self.evaluate(child, data)?);
                }
                Ok(Value::object(map))
            }

            AstNode::Comparison { op, left, right } => {
                let a = self.evaluate(left, data)?;
                let b = self.evaluate(right, data)?;
                Ok(compare(*op, &a, &b))
            }

            AstNode::Condition { predicate, then } => {
                if self.evaluate(predicate, data)?.is_truthy() {
                    self.evaluate(then, data)
                } else {
                    Ok(Value::Null)
                }
            }

            AstNode::Function { name, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.evaluate(arg, data)?);
                }
                self.call_function(name, values)
            }

            AstNode::Expref { child } => Ok(Value::Expression(ExpressionRef::new(
                Rc::new((**child).clone()),
                self.dispatcher.clone(),
            ))),
        }
    }

    fn call_function(&self, name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
        match &self.dispatcher {
            Some(dispatch) => dispatch(name, args),
            None => functions::dispatch(name, args),
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn index_array(data: &Value, index: i64) -> Value {
    match data.as_array() {
        Some(arr) => {
            let len = arr.len() as i64;
            let i = if index < 0 { index + len } else { index };
            if (0..len).contains(&i) {
                arr[i as usize].clone()
            } else {
                Value::Null
            }
        }
        None => Value::Null,
    }
}

fn slice_value(
    data: &Value,
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
) -> Result<Value, RuntimeError> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(RuntimeError::InvalidSlice);
    }

    match data {
        Value::Array(arr) => {
            let items = slice_indices(arr.len(), start, stop, step)
                .into_iter()
                .map(|i| arr[i].clone())
                .collect();
            Ok(Value::array(items))
        }
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let sliced: String = slice_indices(chars.len(), start, stop, step)
                .into_iter()
                .map(|i| chars[i])
                .collect();
            Ok(Value::string(sliced))
        }
        _ => Ok(Value::Null),
    }
}

/// Python-style slice index resolution: negative bounds count from the end,
/// bounds are clamped, and a negative step walks backwards.
fn slice_indices(len: usize, start: Option<i64>, stop: Option<i64>, step: i64) -> Vec<usize> {
    let len = len as i64;

    let resolve = |bound: Option<i64>, default: i64| match bound {
        Some(b) => {
            let b = if b < 0 { b + len } else { b };
            if step > 0 {
                b.clamp(0, len)
            } else {
                b.clamp(-1, len - 1)
            }
        }
        None => default,
    };

    let (start, stop) = if step > 0 {
        (resolve(start, 0), resolve(stop, len))
    } else {
        (resolve(start, len - 1), resolve(stop, -1))
    };

    let mut indices = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        indices.push(i as usize);
        i += step;
    }
    indices
}

fn compare(op: Comparator, a: &Value, b: &Value) -> Value {
    match op {
        Comparator::Eq => Value::Bool(a == b),
        Comparator::Ne => Value::Bool(a != b),
        // ordering is defined for numbers only; anything else is null
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => Value::Bool(match op {
                Comparator::Lt => x < y,
                Comparator::Lte => x <= y,
                Comparator::Gt => x > y,
                Comparator::Gte => x >= y,
                Comparator::Eq | Comparator::Ne => unreachable!(),
            }),
            _ => Value::Null,
        },
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
