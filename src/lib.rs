//! exprkit - embedded expression interpreter
//!
//! Evaluates short Go-flavoured expressions (arithmetic, comparisons, calls,
//! member access, composite literals) to a dynamically typed [`Value`].
//! Configuration tooling uses it to compute defaults and validate fields:
//!
//! ```
//! use exprkit::{eval, EvalOptions, Environment, Value};
//!
//! assert_eq!(eval("min(200, 150)", EvalOptions::new()).unwrap(), Value::Int(150));
//!
//! let env = Environment::new().bind("self", ":8080");
//! let ok = eval("split_addr().port > 1024", EvalOptions::new().with_env(env)).unwrap();
//! assert_eq!(ok, Value::Bool(true));
//! ```

pub mod ast;
pub mod duration;
pub mod error;
pub mod evaluator;
pub mod format;
pub mod function;
pub mod functions;
pub mod host;
pub mod lexer;
pub mod operators;
pub mod packages;
pub mod token_parser;
pub mod value;

// CLI-only modules
#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "cli")]
pub mod repl;

// Re-export commonly used types
pub use ast::{BinaryOperator, Element, Expression, LiteralKind, UnaryOperator};
pub use duration::Duration;
pub use error::{ConversionError, EvalError, ParseError, Result};
pub use evaluator::{Environment, Evaluator};
pub use function::{Arity, Function, ParamKind};
pub use functions::{disable_test_mode, enable_test_mode, is_test_mode};
pub use host::{FromValue, HostObject, ToValue};
pub use lexer::{Lexer, Token, TokenKind};
pub use token_parser::{parse, TokenParser};
pub use value::{Aggregate, Value, ValueKind};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Options for a single evaluation
#[derive(Debug, Clone, Default)]
pub struct EvalOptions {
    env: Environment,
}

impl EvalOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate against `env` instead of an empty environment
    pub fn with_env(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }
}

/// Parse and evaluate `source`
pub fn eval(source: &str, options: EvalOptions) -> Result<Value> {
    tracing::debug!(source, bindings = options.env.len(), "evaluating expression");
    let expr = parse(source)?;
    let value = Evaluator::new(&options.env).evaluate(&expr)?;
    tracing::debug!(kind = %value.kind(), "evaluated expression");
    Ok(value)
}
