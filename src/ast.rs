//! Abstract Syntax Tree definitions
//!
//! The grammar is the expression subset of a statically typed C-family
//! language: literals, identifiers, unary/binary operators, calls, member
//! selectors, composite literals and index expressions. Literals keep their
//! raw source text; the evaluator decodes them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::lexer::Span;

/// Source location information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpan {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
    pub length: usize,
}

impl From<&Span> for SourceSpan {
    fn from(span: &Span) -> Self {
        SourceSpan {
            line: span.start.line,
            column: span.start.column,
            offset: span.start.offset,
            length: span.text.len(),
        }
    }
}

/// Lexical category of a literal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiteralKind {
    Int,
    Float,
    /// Interpreted (`"..."`) or raw (`` `...` ``) string
    String,
    /// Single-quoted literal, evaluated as a string
    Char,
    Bool,
}

/// Expression (produces a value)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// Literal with its raw source text, quotes included
    Literal {
        kind: LiteralKind,
        text: String,
        span: Option<SourceSpan>,
    },

    /// Name lookup: environment, then builtins, then packages
    Identifier {
        name: String,
        span: Option<SourceSpan>,
    },

    /// Parenthesized expression: `(expr)`
    Paren {
        inner: Box<Expression>,
        span: Option<SourceSpan>,
    },

    /// Pointer dereference: `*expr` (transparent)
    Star {
        operand: Box<Expression>,
        span: Option<SourceSpan>,
    },

    /// Unary operation: `-a`, `!a`, `^a`
    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
        span: Option<SourceSpan>,
    },

    /// Binary operation: `a + b`, `a == b`, etc.
    Binary {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
        span: Option<SourceSpan>,
    },

    /// Call: `f(args)`, `pkg.Func(args)`, `value.Method(args)`
    Call {
        callee: Box<Expression>,
        args: Vec<Expression>,
        span: Option<SourceSpan>,
    },

    /// Member selector: `x.Name`
    Selector {
        object: Box<Expression>,
        member: String,
        span: Option<SourceSpan>,
    },

    /// Composite literal: `Type{...}`
    Composite {
        type_expr: Box<Expression>,
        elements: Vec<Element>,
        span: Option<SourceSpan>,
    },

    /// Index access: `xs[i]`
    Index {
        object: Box<Expression>,
        index: Box<Expression>,
        span: Option<SourceSpan>,
    },

    /// Slice access: `xs[lo:hi]` (parsed, rejected at evaluation)
    Slice {
        object: Box<Expression>,
        low: Option<Box<Expression>>,
        high: Option<Box<Expression>>,
        span: Option<SourceSpan>,
    },
}

impl Expression {
    /// Get the span of this expression, if available
    pub fn span(&self) -> Option<&SourceSpan> {
        match self {
            Expression::Literal { span, .. } => span.as_ref(),
            Expression::Identifier { span, .. } => span.as_ref(),
            Expression::Paren { span, .. } => span.as_ref(),
            Expression::Star { span, .. } => span.as_ref(),
            Expression::Unary { span, .. } => span.as_ref(),
            Expression::Binary { span, .. } => span.as_ref(),
            Expression::Call { span, .. } => span.as_ref(),
            Expression::Selector { span, .. } => span.as_ref(),
            Expression::Composite { span, .. } => span.as_ref(),
            Expression::Index { span, .. } => span.as_ref(),
            Expression::Slice { span, .. } => span.as_ref(),
        }
    }

    /// Whether this expression can name a type in a composite literal
    /// (`T`, `pkg.T`)
    pub fn is_type_name(&self) -> bool {
        match self {
            Expression::Identifier { .. } => true,
            Expression::Selector { object, .. } => object.is_type_name(),
            _ => false,
        }
    }
}

/// Element of a composite literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Element {
    /// `Field: value`
    Keyed { key: String, value: Expression },
    /// `value`
    Positional(Expression),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    // Arithmetic
    Add,      // +
    Subtract, // -
    Multiply, // *
    Divide,   // /
    Modulo,   // %

    // Bitwise
    BitAnd,     // &
    BitOr,      // |
    BitXor,     // ^
    ShiftLeft,  // <<
    ShiftRight, // >>

    // Comparison
    Equal,              // ==
    NotEqual,           // !=
    LessThan,           // <
    LessThanOrEqual,    // <=
    GreaterThan,        // >
    GreaterThanOrEqual, // >=

    // Logical
    And, // &&
    Or,  // ||
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::BitOr => "|",
            BinaryOperator::BitXor => "^",
            BinaryOperator::ShiftLeft => "<<",
            BinaryOperator::ShiftRight => ">>",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanOrEqual => ">=",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
        }
    }

    /// Comparison operators always produce a Bool
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::LessThan
                | BinaryOperator::LessThanOrEqual
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterThanOrEqual
        )
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOperator {
    Plus,       // +
    Negate,     // -
    Not,        // !
    Complement, // ^
    /// `&` behaves as bitwise complement
    Ampersand,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOperator::Plus => "+",
            UnaryOperator::Negate => "-",
            UnaryOperator::Not => "!",
            UnaryOperator::Complement => "^",
            UnaryOperator::Ampersand => "&",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Expression {
        Expression::Identifier {
            name: name.to_string(),
            span: None,
        }
    }

    #[test]
    fn test_type_name_detection() {
        assert!(ident("Something").is_type_name());

        let qualified = Expression::Selector {
            object: Box::new(ident("time")),
            member: "Time".to_string(),
            span: None,
        };
        assert!(qualified.is_type_name());

        let call = Expression::Call {
            callee: Box::new(ident("now")),
            args: vec![],
            span: None,
        };
        assert!(!call.is_type_name());
    }

    #[test]
    fn test_operator_display() {
        assert_eq!(BinaryOperator::ShiftLeft.to_string(), "<<");
        assert_eq!(BinaryOperator::Or.to_string(), "||");
        assert_eq!(UnaryOperator::Complement.to_string(), "^");
        assert!(BinaryOperator::GreaterThanOrEqual.is_comparison());
        assert!(!BinaryOperator::And.is_comparison());
    }

    #[test]
    fn test_span_from_lexer_span() {
        let tokens = crate::lexer::tokenize("  abc").unwrap();
        let span = SourceSpan::from(&tokens[0].span);
        assert_eq!(span.line, 1);
        assert_eq!(span.column, 3);
        assert_eq!(span.offset, 2);
        assert_eq!(span.length, 3);
    }
}
