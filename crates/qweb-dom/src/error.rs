//! Error types for template document parsing.

use source_map::Span;
use std::fmt;

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// An error that occurred while parsing a template document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// The error message.
    pub message: String,
    /// The span where the error occurred.
    pub span: Span,
    /// The error code.
    pub code: ParseErrorCode,
}

impl ParseError {
    /// Create a new parse error.
    pub fn new(message: impl Into<String>, span: Span, code: ParseErrorCode) -> Self {
        Self {
            message: message.into(),
            span,
            code,
        }
    }

    /// Create an unexpected token error.
    pub fn unexpected_token(expected: &str, found: &str, span: Span) -> Self {
        Self::new(
            format!("Expected {}, found {}", expected, found),
            span,
            ParseErrorCode::UnexpectedToken,
        )
    }

    /// Create an unclosed element error.
    pub fn unclosed_element(tag: &str, span: Span) -> Self {
        Self::new(
            format!("Unclosed element: <{}>", tag),
            span,
            ParseErrorCode::UnclosedElement,
        )
    }

    /// Create a mismatched closing tag error.
    pub fn mismatched_tag(expected: &str, found: &str, span: Span) -> Self {
        Self::new(
            format!("Closing tag </{}> does not match <{}>", found, expected),
            span,
            ParseErrorCode::MismatchedTag,
        )
    }

    /// Create an unbound namespace prefix error.
    pub fn unbound_prefix(prefix: &str, span: Span) -> Self {
        Self::new(
            format!("Namespace prefix {} is not defined", prefix),
            span,
            ParseErrorCode::UnboundPrefix,
        )
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Error codes for document parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorCode {
    /// Unexpected token.
    UnexpectedToken,
    /// Element never closed before end of input.
    UnclosedElement,
    /// Closing tag name differs from the opening one.
    MismatchedTag,
    /// Element or attribute uses an undeclared prefix.
    UnboundPrefix,
    /// Same attribute given twice on one element.
    DuplicateAttribute,
    /// Input holds no element and no text.
    EmptyDocument,
}

impl ParseErrorCode {
    /// Get the error code as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnexpectedToken => "unexpected-token",
            Self::UnclosedElement => "unclosed-element",
            Self::MismatchedTag => "mismatched-tag",
            Self::UnboundPrefix => "unbound-prefix",
            Self::DuplicateAttribute => "duplicate-attribute",
            Self::EmptyDocument => "empty-document",
        }
    }
}

impl fmt::Display for ParseErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
