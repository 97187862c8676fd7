//! Error types and formatting for expression evaluation
//!
//! Every failure path of parsing and evaluation is a variant of [`EvalError`];
//! conversion failures raised while extracting or coercing values are
//! [`ConversionError`]s and lift into `EvalError::Unconvertible`.

use colored::Colorize;
use thiserror::Error;

use crate::ast::{BinaryOperator, UnaryOperator};
use crate::function::Arity;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, EvalError>;

/// A malformed expression, with the 1-based position where it went wrong
#[derive(Error, Debug, Clone, PartialEq)]
#[error("parse error at {line}:{column}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

/// A value could not be converted to the requested kind
#[derive(Error, Debug, Clone, PartialEq)]
#[error("cannot convert {from} to {to}")]
pub struct ConversionError {
    pub from: String,
    pub to: String,
}

impl ConversionError {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Everything that can go wrong while evaluating an expression
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("undefined: {name}")]
    Undefined { name: String },

    #[error("cannot find {member} in package {namespace}")]
    UnknownMember { namespace: String, member: String },

    #[error("{type_name} has no field or method {member}")]
    NoSuchMember { type_name: String, member: String },

    #[error("unknown field {key} in {type_name} literal")]
    UnknownField { type_name: String, key: String },

    #[error("func {function}() takes {expected} args, received {received}")]
    ArityMismatch {
        function: String,
        expected: Arity,
        received: usize,
    },

    #[error("argument {index} of {function}(): cannot convert {from} to {to}")]
    ArgumentConversion {
        function: String,
        index: usize,
        from: String,
        to: String,
    },

    #[error("invalid operation: operator {op} not defined on {kind}")]
    UnsupportedUnary { op: UnaryOperator, kind: String },

    #[error("invalid operation: operator {op} not defined on {lhs} and {rhs}")]
    UnsupportedBinary {
        op: BinaryOperator,
        lhs: String,
        rhs: String,
    },

    #[error("invalid operation: mismatched types {lhs} {op} {rhs}")]
    IncompatibleTypes {
        op: BinaryOperator,
        lhs: String,
        rhs: String,
    },

    #[error("index {index} out of range [0:{len}]")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("unsupported: {what}")]
    Unsupported { what: String },

    #[error(transparent)]
    Unconvertible(#[from] ConversionError),

    #[error("cannot call non-function {type_name}")]
    NotCallable { type_name: String },

    #[error("{function}(): {message}")]
    CallFailed { function: String, message: String },

    #[error("integer divide by zero")]
    DivisionByZero,

    #[error("negative shift count {count}")]
    NegativeShift { count: i64 },
}

impl EvalError {
    /// Shorthand for a function body that failed on valid arguments
    pub fn call_failed(function: impl Into<String>, message: impl std::fmt::Display) -> Self {
        EvalError::CallFailed {
            function: function.into(),
            message: message.to_string(),
        }
    }

    pub fn unsupported(what: impl Into<String>) -> Self {
        EvalError::Unsupported { what: what.into() }
    }
}

/// Format an error for terminal output.
///
/// Parse errors get a source excerpt with a caret under the offending column;
/// everything else is a single colored line.
pub fn format_error(error: &EvalError, input: &str) -> String {
    match error {
        EvalError::Parse(parse) => format_parse_error(parse, input),
        other => format!("{} {}\n", "Evaluation error:".red().bold(), other),
    }
}

/// Format a parse error with context and helpful information
pub fn format_parse_error(error: &ParseError, input: &str) -> String {
    let mut output = String::new();
    let (line, col) = (error.line, error.column);

    output.push_str(&format!(
        "{} {}\n",
        "Parse error:".red().bold(),
        error.message
    ));

    output.push_str(&format!(
        "  {} {}:{}\n",
        "-->".blue().bold(),
        "input".dimmed(),
        format!("{}:{}", line, col).cyan()
    ));

    let lines: Vec<&str> = input.lines().collect();
    if line > 0 && line <= lines.len() {
        let line_idx = line - 1;

        output.push_str(&format!("   {}\n", "|".blue()));

        if line_idx > 0 {
            output.push_str(&format!(
                " {} | {}\n",
                format!("{:3}", line - 1).blue().dimmed(),
                lines[line_idx - 1].dimmed()
            ));
        }

        output.push_str(&format!(
            " {} | {}\n",
            format!("{:3}", line).blue().bold(),
            lines[line_idx]
        ));

        let indicator = format!("{}^", " ".repeat(col.saturating_sub(1) + 7));
        output.push_str(&format!("   {} {}\n", "|".blue(), indicator.red().bold()));

        output.push_str(&format!("   {}\n", "|".blue()));
    }

    output.push_str(&error_hint(lines.get(line.saturating_sub(1))));

    output
}

/// Get a helpful hint based on the offending line
fn error_hint(line: Option<&&str>) -> String {
    let Some(line_text) = line else {
        return String::new();
    };
    let line = line_text.trim();

    let opens = |open: char, close: char| {
        line.chars().filter(|c| *c == open).count() > line.chars().filter(|c| *c == close).count()
    };

    if opens('(', ')') {
        return format!(
            "\n  {} Missing closing parenthesis ')'\n",
            "Hint:".yellow().bold()
        );
    }

    if opens('{', '}') {
        return format!(
            "\n  {} Missing closing brace '}}' for composite literal\n",
            "Hint:".yellow().bold()
        );
    }

    if line.contains(" = ") {
        return format!(
            "\n  {} Use '==' for equality comparison, not '='\n",
            "Hint:".yellow().bold()
        );
    }

    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new("expected expression", 1, 5);
        assert_eq!(err.to_string(), "parse error at 1:5: expected expression");
    }

    #[test]
    fn test_conversion_error_lifts_into_eval_error() {
        let err: EvalError = ConversionError::new("string", "int64").into();
        assert!(matches!(err, EvalError::Unconvertible(_)));
        assert_eq!(err.to_string(), "cannot convert string to int64");
    }

    #[test]
    fn test_arity_mismatch_display() {
        let err = EvalError::ArityMismatch {
            function: "upper".to_string(),
            expected: Arity::Fixed(1),
            received: 2,
        };
        assert_eq!(err.to_string(), "func upper() takes 1 args, received 2");
    }

    #[test]
    fn test_format_parse_error_points_at_column() {
        colored::control::set_override(false);
        let err = ParseError::new("unexpected ')'", 1, 7);
        let formatted = format_parse_error(&err, "upper())");
        assert!(formatted.contains("Parse error: unexpected ')'"));
        assert!(formatted.contains("input:1:7"));
        assert!(formatted.contains("upper())"));
        assert!(formatted.contains(&format!("{}^", " ".repeat(13))));
    }

    #[test]
    fn test_hint_for_unbalanced_parenthesis() {
        colored::control::set_override(false);
        let err = ParseError::new("unexpected end of input", 1, 7);
        let formatted = format_parse_error(&err, "upper(");
        assert!(formatted.contains("Missing closing parenthesis"));
    }

    #[test]
    fn test_format_error_for_evaluation_failure() {
        colored::control::set_override(false);
        let err = EvalError::Undefined {
            name: "nope".to_string(),
        };
        assert_eq!(format_error(&err, "nope"), "Evaluation error: undefined: nope\n");
    }
}
