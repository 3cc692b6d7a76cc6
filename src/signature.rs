// Function parameter typing and validation
// Every built-in declares a Signature; dispatch validates before running

use crate::evaluator::RuntimeError;
use crate::value::Value;

/// Parameter type for built-in function arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    Any,
    Number,
    String,
    Boolean,
    Null,
    Object,
    Expression,
    /// Array with an optional element type, e.g. an array of numbers
    Array(Option<Box<ParamType>>),
    /// Union type, e.g. number-or-string
    Union(Vec<ParamType>),
}

impl ParamType {
    /// Check if a value matches this type.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (ParamType::Any, _) => true,
            (ParamType::Null, Value::Null) => true,
            (ParamType::Number, Value::Number(_)) => true,
            (ParamType::String, Value::String(_)) => true,
            (ParamType::Boolean, Value::Bool(_)) => true,
            (ParamType::Object, Value::Object(_)) => true,
            (ParamType::Expression, Value::Expression(_)) => true,
            (ParamType::Array(elem_type), Value::Array(arr)) => {
                if let Some(expected) = elem_type {
                    arr.iter().all(|v| expected.matches(v))
                } else {
                    true
                }
            }
            (ParamType::Union(types), _) => types.iter().any(|t| t.matches(value)),
            _ => false,
        }
    }

    /// A human-readable name for error messages.
    pub fn type_name(&self) -> String {
        match self {
            ParamType::Any => "any".to_string(),
            ParamType::Number => "number".to_string(),
            ParamType::String => "string".to_string(),
            ParamType::Boolean => "boolean".to_string(),
            ParamType::Null => "null".to_string(),
            ParamType::Object => "object".to_string(),
            ParamType::Expression => "expression".to_string(),
            ParamType::Array(None) => "array".to_string(),
            ParamType::Array(Some(elem)) => format!("array of {}", elem.type_name()),
            ParamType::Union(types) => {
                let names: Vec<String> = types.iter().map(|t| t.type_name()).collect();
                names.join(" or ")
            }
        }
    }
}

/// A built-in function's signature: fixed parameter types, optionally
/// accepting extra trailing arguments matched against the last parameter.
#[derive(Debug, Clone)]
pub struct Signature {
    pub params: Vec<ParamType>,
    pub variadic: bool,
}

impl Signature {
    pub fn new(params: Vec<ParamType>) -> Self {
        Signature {
            params,
            variadic: false,
        }
    }

    pub fn variadic(params: Vec<ParamType>) -> Self {
        Signature {
            params,
            variadic: true,
        }
    }

    /// Validate argument count and per-argument types, reporting positions
    /// 1-based.
    pub fn validate(&self, function: &str, args: &[Value]) -> Result<(), RuntimeError> {
        if args.len() < self.params.len() {
            return Err(RuntimeError::NotEnoughArguments {
                function: function.to_string(),
                expected: self.params.len(),
                actual: args.len(),
            });
        }
        if !self.variadic && args.len() > self.params.len() {
            return Err(RuntimeError::TooManyArguments {
                function: function.to_string(),
                expected: self.params.len(),
                actual: args.len(),
            });
        }

        for (i, arg) in args.iter().enumerate() {
            let param = if i < self.params.len() {
                &self.params[i]
            } else {
                // extra variadic arguments validate against the last parameter
                self.params.last().expect("variadic signature has no params")
            };
            if !param.matches(arg) {
                return Err(RuntimeError::InvalidType {
                    function: function.to_string(),
                    position: i + 1,
                    expected: param.type_name(),
                    actual: arg.type_of().to_string(),
                });
            }
        }

        Ok(())
    }
}
