// jmespath-core - JMESPath query engine for JSON-shaped data
// Licensed under the MIT License

//! # jmespath-core
//!
//! A JMESPath query engine: parse a declarative expression, evaluate it
//! against JSON-shaped data, get the extracted or transformed result back.
//!
//! ## Architecture
//!
//! The engine is the classic three-stage pipeline:
//!
//! - `parser` - lexer and Pratt parser (expression strings to AST)
//! - `evaluator` - tree-walking interpreter (AST plus data to a value)
//! - `functions` - built-in function library with signature validation
//! - `signature` - argument arity and type checking
//! - `ast` - abstract syntax tree definitions
//! - `value` - the dynamically-typed value model (Rc-backed, order-preserving
//!   objects)
//!
//! ## Searching
//!
//! ```
//! use jmespath_core::{search, Value};
//!
//! let data = Value::from_json_str(r#"{"foo": {"bar": "baz"}}"#).unwrap();
//! assert_eq!(search("foo.bar", &data).unwrap(), Value::string("baz"));
//! ```
//!
//! Expressions parsed through [`search`] are cached, so repeated searches
//! with the same expression skip the parser. To hold a parsed expression
//! yourself, use [`parse`] and an [`Evaluator`].
//!
//! ## Custom functions
//!
//! A [`Runtime`] binds a function dispatcher to `search`. The dispatcher
//! replaces built-in dispatch and may delegate to [`functions::dispatch`]
//! for everything it does not handle:
//!
//! ```
//! use std::rc::Rc;
//! use jmespath_core::{functions, Runtime, Value};
//!
//! let runtime = Runtime::with_dispatcher(Rc::new(|name, args| match name {
//!     "double" => Ok(Value::Number(args[0].as_f64().unwrap_or(0.0) * 2.0)),
//!     _ => functions::dispatch(name, args),
//! }));
//!
//! let data = Value::from_json_str(r#"{"n": 21}"#).unwrap();
//! assert_eq!(runtime.search("double(n)", &data).unwrap(), Value::Number(42.0));
//! ```

use std::cell::RefCell;
use std::num::NonZeroUsize;
use std::rc::Rc;

use lru::LruCache;
use thiserror::Error;

pub mod ast;
pub mod evaluator;
pub mod functions;
pub mod parser;
pub mod signature;
pub mod value;

pub use ast::{AstNode, Comparator};
pub use evaluator::{Evaluator, FnDispatcher, RuntimeError};
pub use parser::{parse, tokenize, LexError, ParseError, Token, TokenKind};
pub use value::{ExpressionRef, Value};

/// Aggregate JMESPath error for both parse and runtime failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// An error occurred while parsing an expression.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    /// An error occurred while evaluating an expression.
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

const EXPRESSION_CACHE_SIZE: usize = 1024;

/// A bound search runtime: an optional custom function dispatcher plus an
/// LRU cache of parsed expressions.
///
/// Expression references created during a runtime's evaluations capture the
/// runtime's dispatcher, so `*_by` callbacks resolve functions the same way
/// their enclosing expression does.
pub struct Runtime {
    dispatcher: Option<FnDispatcher>,
    cache: RefCell<LruCache<String, Rc<AstNode>>>,
}

impl Runtime {
    pub fn new() -> Self {
        Runtime {
            dispatcher: None,
            cache: RefCell::new(LruCache::new(
                NonZeroUsize::new(EXPRESSION_CACHE_SIZE).expect("cache size is nonzero"),
            )),
        }
    }

    /// A runtime whose function calls go through `dispatcher` instead of the
    /// built-in registry.
    pub fn with_dispatcher(dispatcher: FnDispatcher) -> Self {
        Runtime {
            dispatcher: Some(dispatcher),
            ..Runtime::new()
        }
    }

    /// Parse an expression through the cache.
    fn cached_parse(&self, expression: &str) -> Result<Rc<AstNode>, ParseError> {
        let mut cache = self.cache.borrow_mut();
        if let Some(ast) = cache.get(expression) {
            return Ok(ast.clone());
        }
        let ast = Rc::new(parse(expression)?);
        cache.put(expression.to_string(), ast.clone());
        Ok(ast)
    }

    /// Parse (or fetch the cached AST for) an expression and evaluate it
    /// against `data`.
    pub fn search(&self, expression: &str, data: &Value) -> Result<Value, Error> {
        let ast = self.cached_parse(expression)?;
        Evaluator::with_dispatcher(self.dispatcher.clone())
            .evaluate(&ast, data)
            .map_err(Error::from)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

thread_local! {
    static DEFAULT_RUNTIME: Runtime = Runtime::new();
}

/// Parse an expression and evaluate it against `data`.
///
/// Parsed expressions are cached in a thread-local default [`Runtime`], so
/// repeated searches with the same expression skip the parser.
pub fn search(expression: &str, data: &Value) -> Result<Value, Error> {
    DEFAULT_RUNTIME.with(|runtime| runtime.search(expression, data))
}
