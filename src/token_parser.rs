//! Token-based parser for expressions
//!
//! A recursive descent parser that consumes tokens from the lexer and builds
//! an [`Expression`] tree. Binary precedence, lowest to highest:
//!
//! | level | operators                |
//! |-------|--------------------------|
//! | 1     | `\|\|`                   |
//! | 2     | `&&`                     |
//! | 3     | `==` `!=` `<` `<=` `>` `>=` |
//! | 4     | `+` `-` `\|` `^`         |
//! | 5     | `*` `/` `%` `<<` `>>` `&` |
//!
//! All binary operators are left-associative.

use crate::ast::{BinaryOperator, Element, Expression, LiteralKind, SourceSpan, UnaryOperator};
use crate::error::{ParseError, Result};
use crate::lexer::{Token, TokenKind};

/// Parser that consumes tokens to produce an AST
pub struct TokenParser {
    tokens: Vec<Token>,
    position: usize,
}

impl TokenParser {
    /// Create a new parser from a token stream
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    /// Parse a single expression that must span the whole input
    pub fn parse_complete(&mut self) -> Result<Expression> {
        if self.is_at_end() {
            return Err(self.error("expected expression, found end of input"));
        }
        let expr = self.parse_expression()?;
        if !self.is_at_end() {
            return Err(self.error(format!(
                "unexpected {} after expression",
                self.current().kind.describe()
            )));
        }
        Ok(expr)
    }

    fn parse_expression(&mut self) -> Result<Expression> {
        self.parse_or()
    }

    /// Parse or expression
    fn parse_or(&mut self) -> Result<Expression> {
        let start = self.mark_position();
        let mut left = self.parse_and()?;

        while self.check(&TokenKind::OrOr) {
            self.advance();
            let right = self.parse_and()?;
            left = Expression::Binary {
                op: BinaryOperator::Or,
                left: Box::new(left),
                right: Box::new(right),
                span: self.span_from(start),
            };
        }

        Ok(left)
    }

    /// Parse and expression
    fn parse_and(&mut self) -> Result<Expression> {
        let start = self.mark_position();
        let mut left = self.parse_comparison()?;

        while self.check(&TokenKind::AndAnd) {
            self.advance();
            let right = self.parse_comparison()?;
            left = Expression::Binary {
                op: BinaryOperator::And,
                left: Box::new(left),
                right: Box::new(right),
                span: self.span_from(start),
            };
        }

        Ok(left)
    }

    /// Parse equality and ordering comparisons (one precedence level)
    fn parse_comparison(&mut self) -> Result<Expression> {
        let start = self.mark_position();
        let mut left = self.parse_additive()?;

        loop {
            let op = match self.current().kind {
                TokenKind::EqualEqual => BinaryOperator::Equal,
                TokenKind::NotEqual => BinaryOperator::NotEqual,
                TokenKind::Less => BinaryOperator::LessThan,
                TokenKind::LessEqual => BinaryOperator::LessThanOrEqual,
                TokenKind::Greater => BinaryOperator::GreaterThan,
                TokenKind::GreaterEqual => BinaryOperator::GreaterThanOrEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = Expression::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                span: self.span_from(start),
            };
        }

        Ok(left)
    }

    /// Parse `+ - | ^`
    fn parse_additive(&mut self) -> Result<Expression> {
        let start = self.mark_position();
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current().kind {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Subtract,
                TokenKind::Pipe => BinaryOperator::BitOr,
                TokenKind::Caret => BinaryOperator::BitXor,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expression::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                span: self.span_from(start),
            };
        }

        Ok(left)
    }

    /// Parse `* / % << >> &`
    fn parse_multiplicative(&mut self) -> Result<Expression> {
        let start = self.mark_position();
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.current().kind {
                TokenKind::Star => BinaryOperator::Multiply,
                TokenKind::Slash => BinaryOperator::Divide,
                TokenKind::Percent => BinaryOperator::Modulo,
                TokenKind::ShiftLeft => BinaryOperator::ShiftLeft,
                TokenKind::ShiftRight => BinaryOperator::ShiftRight,
                TokenKind::Ampersand => BinaryOperator::BitAnd,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expression::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                span: self.span_from(start),
            };
        }

        Ok(left)
    }

    /// Parse unary expression
    fn parse_unary(&mut self) -> Result<Expression> {
        let start = self.mark_position();

        if self.check(&TokenKind::Star) {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expression::Star {
                operand: Box::new(operand),
                span: self.span_from(start),
            });
        }

        let op = match self.current().kind {
            TokenKind::Plus => UnaryOperator::Plus,
            TokenKind::Minus => UnaryOperator::Negate,
            TokenKind::Bang => UnaryOperator::Not,
            TokenKind::Caret => UnaryOperator::Complement,
            TokenKind::Ampersand => UnaryOperator::Ampersand,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expression::Unary {
            op,
            operand: Box::new(operand),
            span: self.span_from(start),
        })
    }

    /// Parse postfix expressions (calls, selectors, indexing, composite literals)
    fn parse_postfix(&mut self) -> Result<Expression> {
        let start_pos = self.mark_position();
        let mut expr = self.parse_primary()?;

        loop {
            if self.check(&TokenKind::LeftParen) {
                self.advance();
                let args = if !self.check(&TokenKind::RightParen) {
                    self.parse_argument_list(&TokenKind::RightParen)?
                } else {
                    Vec::new()
                };
                self.expect(&TokenKind::RightParen)?;
                expr = Expression::Call {
                    callee: Box::new(expr),
                    args,
                    span: self.span_from(start_pos),
                };
            } else if self.check(&TokenKind::Dot) {
                self.advance();
                let member = self.parse_identifier()?;
                expr = Expression::Selector {
                    object: Box::new(expr),
                    member,
                    span: self.span_from(start_pos),
                };
            } else if self.check(&TokenKind::LeftBracket) {
                self.advance();
                expr = self.parse_index_or_slice(expr, start_pos)?;
            } else if self.check(&TokenKind::LeftBrace) && expr.is_type_name() {
                self.advance();
                let elements = self.parse_elements()?;
                self.expect(&TokenKind::RightBrace)?;
                expr = Expression::Composite {
                    type_expr: Box::new(expr),
                    elements,
                    span: self.span_from(start_pos),
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// Parse the remainder of `x[i]` or `x[lo:hi]` after the opening bracket
    fn parse_index_or_slice(&mut self, object: Expression, start_pos: usize) -> Result<Expression> {
        let mut low = None;

        if !self.check(&TokenKind::Colon) {
            let first = self.parse_expression()?;
            if !self.check(&TokenKind::Colon) {
                self.expect(&TokenKind::RightBracket)?;
                return Ok(Expression::Index {
                    object: Box::new(object),
                    index: Box::new(first),
                    span: self.span_from(start_pos),
                });
            }
            low = Some(Box::new(first));
        }

        self.expect(&TokenKind::Colon)?;
        let high = if self.check(&TokenKind::RightBracket) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.expect(&TokenKind::RightBracket)?;

        Ok(Expression::Slice {
            object: Box::new(object),
            low,
            high,
            span: self.span_from(start_pos),
        })
    }

    /// Parse comma-separated arguments up to (not including) the closing token
    fn parse_argument_list(&mut self, close: &TokenKind) -> Result<Vec<Expression>> {
        let mut args = vec![self.parse_expression()?];
        while self.check(&TokenKind::Comma) {
            self.advance();
            if self.check(close) {
                break;
            }
            args.push(self.parse_expression()?);
        }
        Ok(args)
    }

    /// Parse composite literal elements: `Key: value` or `value`, trailing comma allowed
    fn parse_elements(&mut self) -> Result<Vec<Element>> {
        let mut elements = Vec::new();

        while !self.check(&TokenKind::RightBrace) {
            let keyed = matches!(self.current().kind, TokenKind::Identifier(_))
                && matches!(self.peek_kind(1), Some(TokenKind::Colon));

            if keyed {
                let key = self.parse_identifier()?;
                self.expect(&TokenKind::Colon)?;
                let value = self.parse_expression()?;
                elements.push(Element::Keyed { key, value });
            } else {
                elements.push(Element::Positional(self.parse_expression()?));
            }

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        Ok(elements)
    }

    /// Parse primary expression
    fn parse_primary(&mut self) -> Result<Expression> {
        let span = self.current_span();

        let (kind, text) = match &self.current().kind {
            TokenKind::LeftParen => {
                let start = self.mark_position();
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(&TokenKind::RightParen)?;
                return Ok(Expression::Paren {
                    inner: Box::new(inner),
                    span: self.span_from(start),
                });
            }
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                return Ok(Expression::Identifier { name, span });
            }
            TokenKind::Integer(text) => (LiteralKind::Int, text.clone()),
            TokenKind::Float(text) => (LiteralKind::Float, text.clone()),
            TokenKind::String(text) | TokenKind::RawString(text) => {
                (LiteralKind::String, text.clone())
            }
            TokenKind::Char(text) => (LiteralKind::Char, text.clone()),
            TokenKind::True => (LiteralKind::Bool, "true".to_string()),
            TokenKind::False => (LiteralKind::Bool, "false".to_string()),
            other => {
                return Err(self.error(format!("expected expression, found {}", other.describe())))
            }
        };

        self.advance();
        Ok(Expression::Literal { kind, text, span })
    }

    /// Parse an identifier
    fn parse_identifier(&mut self) -> Result<String> {
        match &self.current().kind {
            TokenKind::Identifier(name) => {
                let n = name.clone();
                self.advance();
                Ok(n)
            }
            other => Err(self.error(format!("expected identifier, found {}", other.describe()))),
        }
    }

    // Helper methods

    fn current(&self) -> &Token {
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self, ahead: usize) -> Option<&TokenKind> {
        self.tokens.get(self.position + ahead).map(|t| &t.kind)
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.position += 1;
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current().kind) == std::mem::discriminant(kind)
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<()> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!(
                "expected {}, found {}",
                kind.describe(),
                self.current().kind.describe()
            )))
        }
    }

    fn error(&self, message: impl Into<String>) -> crate::error::EvalError {
        let start = &self.current().span.start;
        ParseError::new(message, start.line, start.column).into()
    }

    /// Mark the current position to start tracking a span
    fn mark_position(&self) -> usize {
        self.position
    }

    /// Create a SourceSpan from a marked position to the last consumed token
    fn span_from(&self, start_pos: usize) -> Option<SourceSpan> {
        let start_token = self.tokens.get(start_pos)?;
        let end_token = self.tokens.get(self.position.saturating_sub(1))?;

        Some(SourceSpan {
            line: start_token.span.start.line,
            column: start_token.span.start.column,
            offset: start_token.span.start.offset,
            length: end_token
                .span
                .end
                .offset
                .saturating_sub(start_token.span.start.offset),
        })
    }

    /// Get the span of the current token
    fn current_span(&self) -> Option<SourceSpan> {
        self.tokens.get(self.position).map(|t| SourceSpan::from(&t.span))
    }
}

/// Parse expression source text into an AST
pub fn parse(source: &str) -> Result<Expression> {
    let tokens = crate::lexer::tokenize(source)?;
    let mut parser = TokenParser::new(tokens);
    parser.parse_complete()
}
