//! Lexer for expression source text
//!
//! Tokenization is the first of two phases:
//! 1. Lexer: source text → token stream (this module, driven by `lexer.pest`)
//! 2. Parser: token stream → AST (see `token_parser`)
//!
//! Literal tokens keep their raw source text. Decoding numbers and strings
//! into values is the evaluator's job, so a malformed literal surfaces as an
//! evaluation error pointing at the literal.

use crate::error::{ParseError, Result};
use pest::error::LineColLocation;
use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "lexer.pest"]
struct LexerParser;

/// Position information for a token
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

/// A token with its kind and position
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Span of source text
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
    pub text: String,
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Keywords
    True,
    False,

    // Literals (raw source text)
    Identifier(String),
    Integer(String),
    Float(String),
    String(String),
    Char(String),
    RawString(String),

    // Operators
    Plus,         // +
    Minus,        // -
    Star,         // *
    Slash,        // /
    Percent,      // %
    Ampersand,    // &
    Pipe,         // |
    Caret,        // ^
    ShiftLeft,    // <<
    ShiftRight,   // >>
    AndAnd,       // &&
    OrOr,         // ||
    EqualEqual,   // ==
    NotEqual,     // !=
    Less,         // <
    LessEqual,    // <=
    Greater,      // >
    GreaterEqual, // >=
    Bang,         // !
    Colon,        // :

    // Punctuation
    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]
    LeftBrace,    // {
    RightBrace,   // }
    Comma,        // ,
    Dot,          // .

    // Special
    Eof,
}

impl TokenKind {
    /// Short human-readable description used in parse errors
    pub fn describe(&self) -> String {
        match self {
            TokenKind::True => "'true'".to_string(),
            TokenKind::False => "'false'".to_string(),
            TokenKind::Identifier(name) => format!("identifier '{}'", name),
            TokenKind::Integer(text) | TokenKind::Float(text) => format!("number {}", text),
            TokenKind::String(text) | TokenKind::Char(text) | TokenKind::RawString(text) => {
                format!("string {}", text)
            }
            TokenKind::Eof => "end of input".to_string(),
            other => format!("'{}'", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Ampersand => "&",
            TokenKind::Pipe => "|",
            TokenKind::Caret => "^",
            TokenKind::ShiftLeft => "<<",
            TokenKind::ShiftRight => ">>",
            TokenKind::AndAnd => "&&",
            TokenKind::OrOr => "||",
            TokenKind::EqualEqual => "==",
            TokenKind::NotEqual => "!=",
            TokenKind::Less => "<",
            TokenKind::LessEqual => "<=",
            TokenKind::Greater => ">",
            TokenKind::GreaterEqual => ">=",
            TokenKind::Bang => "!",
            TokenKind::Colon => ":",
            TokenKind::LeftParen => "(",
            TokenKind::RightParen => ")",
            TokenKind::LeftBracket => "[",
            TokenKind::RightBracket => "]",
            TokenKind::LeftBrace => "{",
            TokenKind::RightBrace => "}",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            _ => "?",
        }
    }
}

/// Lexer that converts source text to tokens
pub struct Lexer<'a> {
    source: &'a str,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source
    pub fn new(source: &'a str) -> Self {
        Self { source }
    }

    /// Tokenize the source text, appending a trailing `Eof` token
    pub fn tokenize(&self) -> Result<Vec<Token>> {
        let pairs = LexerParser::parse(Rule::tokens, self.source).map_err(|e| {
            let (line, column) = match e.line_col {
                LineColLocation::Pos(pos) => pos,
                LineColLocation::Span(start, _) => start,
            };
            ParseError::new(format!("invalid token: {}", e.variant.message()), line, column)
        })?;

        let mut tokens = Vec::new();
        for pair in pairs {
            if pair.as_rule() != Rule::tokens {
                continue;
            }
            for inner in pair.into_inner() {
                if inner.as_rule() == Rule::token {
                    if let Some(token) = self.process_token(inner)? {
                        tokens.push(token);
                    }
                }
            }
        }

        let eof_pos = self.position_from_offset(self.source.len());
        tokens.push(Token {
            kind: TokenKind::Eof,
            span: Span {
                start: eof_pos.clone(),
                end: eof_pos,
                text: String::new(),
            },
        });

        Ok(tokens)
    }

    /// Process a single token pair
    fn process_token(&self, pair: pest::iterators::Pair<Rule>) -> Result<Option<Token>> {
        let span = self.span_from_pair(&pair);
        let position = span.start.clone();

        for inner in pair.into_inner() {
            let text = inner.as_str().to_string();
            let kind = match inner.as_rule() {
                Rule::keyword_token => match text.as_str() {
                    "true" => TokenKind::True,
                    "false" => TokenKind::False,
                    kw => return Err(self.error_at(&position, format!("unknown keyword: {}", kw))),
                },

                Rule::identifier_token => TokenKind::Identifier(text),

                Rule::number_token => match inner.into_inner().next().map(|n| n.as_rule()) {
                    Some(Rule::float_token) => TokenKind::Float(text),
                    _ => TokenKind::Integer(text),
                },

                Rule::string_token => match inner.into_inner().next().map(|s| s.as_rule()) {
                    Some(Rule::char_token) => TokenKind::Char(text),
                    Some(Rule::raw_string_token) => TokenKind::RawString(text),
                    _ => TokenKind::String(text),
                },

                Rule::operator_token => match text.as_str() {
                    "<<" => TokenKind::ShiftLeft,
                    ">>" => TokenKind::ShiftRight,
                    "&&" => TokenKind::AndAnd,
                    "||" => TokenKind::OrOr,
                    "==" => TokenKind::EqualEqual,
                    "!=" => TokenKind::NotEqual,
                    "<=" => TokenKind::LessEqual,
                    ">=" => TokenKind::GreaterEqual,
                    "+" => TokenKind::Plus,
                    "-" => TokenKind::Minus,
                    "*" => TokenKind::Star,
                    "/" => TokenKind::Slash,
                    "%" => TokenKind::Percent,
                    "&" => TokenKind::Ampersand,
                    "|" => TokenKind::Pipe,
                    "^" => TokenKind::Caret,
                    "<" => TokenKind::Less,
                    ">" => TokenKind::Greater,
                    "!" => TokenKind::Bang,
                    ":" => TokenKind::Colon,
                    op => return Err(self.error_at(&position, format!("unknown operator: {}", op))),
                },

                Rule::punctuation_token => match text.as_str() {
                    "(" => TokenKind::LeftParen,
                    ")" => TokenKind::RightParen,
                    "[" => TokenKind::LeftBracket,
                    "]" => TokenKind::RightBracket,
                    "{" => TokenKind::LeftBrace,
                    "}" => TokenKind::RightBrace,
                    "," => TokenKind::Comma,
                    "." => TokenKind::Dot,
                    p => return Err(self.error_at(&position, format!("unknown punctuation: {}", p))),
                },

                _ => continue,
            };

            return Ok(Some(Token { kind, span }));
        }

        Ok(None)
    }

    fn error_at(&self, position: &Position, message: String) -> crate::error::EvalError {
        ParseError::new(message, position.line, position.column).into()
    }

    /// Create a Span from a pest Pair
    fn span_from_pair(&self, pair: &pest::iterators::Pair<Rule>) -> Span {
        let pest_span = pair.as_span();
        Span {
            start: self.position_from_offset(pest_span.start()),
            end: self.position_from_offset(pest_span.end()),
            text: pair.as_str().to_string(),
        }
    }

    /// Calculate line and column from byte offset
    fn position_from_offset(&self, offset: usize) -> Position {
        let mut line = 1;
        let mut column = 1;

        for (i, c) in self.source.char_indices() {
            if i >= offset {
                break;
            }
            if c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }

        Position {
            line,
            column,
            offset,
        }
    }
}

/// Convenience function to tokenize a string
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    Lexer::new(source).tokenize()
}
