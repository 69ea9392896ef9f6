//! Error types for expression parsing.

use source_map::Span;
use std::fmt;

/// Result type for expression operations.
pub type ExprResult<T> = Result<T, ExprError>;

/// A syntax error in an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprError {
    /// The error message.
    pub message: String,
    /// The span where the error occurred, relative to the expression text.
    pub span: Span,
    /// The error code.
    pub code: ExprErrorCode,
}

impl ExprError {
    /// Create a new expression error.
    pub fn new(message: impl Into<String>, span: Span, code: ExprErrorCode) -> Self {
        Self {
            message: message.into(),
            span,
            code,
        }
    }

    /// Create an invalid token error.
    pub fn invalid_token(text: &str, span: Span) -> Self {
        Self::new(
            format!("invalid token {:?}", text),
            span,
            ExprErrorCode::InvalidToken,
        )
    }

    /// Create an unexpected token error.
    pub fn unexpected_token(expected: &str, found: &str, span: Span) -> Self {
        Self::new(
            format!("expected {}, found {:?}", expected, found),
            span,
            ExprErrorCode::UnexpectedToken,
        )
    }

    /// Create an unexpected end of input error.
    pub fn unexpected_end(expected: &str, offset: u32) -> Self {
        Self::new(
            format!("expected {}, found end of expression", expected),
            Span::empty(offset),
            ExprErrorCode::UnexpectedEnd,
        )
    }

    /// Create an invalid literal error.
    pub fn invalid_literal(text: &str, span: Span) -> Self {
        Self::new(
            format!("invalid literal {}", text),
            span,
            ExprErrorCode::InvalidLiteral,
        )
    }
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid syntax: {}", self.message)
    }
}

impl std::error::Error for ExprError {}

/// Error codes for expression parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprErrorCode {
    /// Text that is not a token.
    InvalidToken,
    /// Token in a position the grammar does not allow.
    UnexpectedToken,
    /// Input ended early.
    UnexpectedEnd,
    /// Number or string literal that cannot be decoded.
    InvalidLiteral,
}

impl ExprErrorCode {
    /// Get the error code as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidToken => "invalid-token",
            Self::UnexpectedToken => "unexpected-token",
            Self::UnexpectedEnd => "unexpected-end",
            Self::InvalidLiteral => "invalid-literal",
        }
    }
}

impl fmt::Display for ExprErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
