//! Run-time errors raised by generated code.

use smol_str::SmolStr;
use std::fmt;
use thiserror::Error;

/// Result type for evaluation.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// An error raised while executing generated code.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct RuntimeError {
    /// What went wrong.
    pub kind: ErrorKind,
    /// Generated-code frames, innermost first.
    pub trace: Vec<Frame>,
}

/// Categories of run-time errors.
#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("NameError: {0}")]
    Name(String),
    #[error("AttributeError: {0}")]
    Attribute(String),
    #[error("TypeError: {0}")]
    Type(String),
    #[error("ValueError: {0}")]
    Value(String),
    #[error("KeyError: {0}")]
    Key(String),
    #[error("IndexError: {0}")]
    Index(String),
    #[error("ZeroDivisionError: {0}")]
    ZeroDivision(String),
    #[error("OverflowError: {0}")]
    Overflow(String),
    /// Generated code that does not parse.
    #[error("SyntaxError: {0}")]
    Syntax(String),
    /// Raised by a host object or callable.
    #[error("{0}")]
    Host(Box<dyn std::error::Error + 'static>),
}

/// One generated-code stack frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Generated function name.
    pub function: SmolStr,
    /// 1-based line in the generated source.
    pub line: u32,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  line {}, in {}", self.line, self.function)
    }
}

impl RuntimeError {
    fn from_kind(kind: ErrorKind) -> Self {
        Self {
            kind,
            trace: Vec::new(),
        }
    }

    pub fn name(name: &str) -> Self {
        Self::from_kind(ErrorKind::Name(format!("name '{}' is not defined", name)))
    }

    pub fn attribute(type_name: &str, attr: &str) -> Self {
        Self::from_kind(ErrorKind::Attribute(format!(
            "'{}' object has no attribute '{}'",
            type_name, attr
        )))
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::from_kind(ErrorKind::Type(message.into()))
    }

    pub fn value_error(message: impl Into<String>) -> Self {
        Self::from_kind(ErrorKind::Value(message.into()))
    }

    pub fn key(repr: impl Into<String>) -> Self {
        Self::from_kind(ErrorKind::Key(repr.into()))
    }

    pub fn index(message: impl Into<String>) -> Self {
        Self::from_kind(ErrorKind::Index(message.into()))
    }

    pub fn zero_division() -> Self {
        Self::from_kind(ErrorKind::ZeroDivision("division by zero".into()))
    }

    pub fn overflow() -> Self {
        Self::from_kind(ErrorKind::Overflow("integer overflow".into()))
    }

    pub fn syntax(error: &crate::program::ProgramError) -> Self {
        Self::from_kind(ErrorKind::Syntax(error.to_string()))
    }

    /// Wrap an error raised outside generated code.
    pub fn host(error: impl std::error::Error + 'static) -> Self {
        Self::from_kind(ErrorKind::Host(Box::new(error)))
    }

    /// Wrap an already boxed host error.
    pub fn host_boxed(error: Box<dyn std::error::Error + 'static>) -> Self {
        Self::from_kind(ErrorKind::Host(error))
    }

    /// Record the frame the error is leaving.
    pub fn push_frame(mut self, function: &SmolStr, line: u32) -> Self {
        self.trace.push(Frame {
            function: function.clone(),
            line,
        });
        self
    }

    /// Line of the innermost frame.
    pub fn line(&self) -> Option<u32> {
        self.trace.first().map(|frame| frame.line)
    }

    /// Frames formatted outermost first.
    pub fn traceback(&self) -> String {
        let mut out = String::from("Traceback (most recent call last):\n");
        for frame in self.trace.iter().rev() {
            out.push_str(&frame.to_string());
            out.push('\n');
        }
        out
    }

    /// Take the host error out, if this error carries one.
    pub fn into_host(self) -> Result<Box<dyn std::error::Error + 'static>, Self> {
        match self.kind {
            ErrorKind::Host(error) => Ok(error),
            kind => Err(Self {
                kind,
                trace: self.trace,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_traceback() {
        let err = RuntimeError::name("x")
            .push_frame(&"inner".into(), 7)
            .push_frame(&"template_1".into(), 3);
        assert_eq!(err.to_string(), "NameError: name 'x' is not defined");
        assert_eq!(err.line(), Some(7));
        assert_eq!(
            err.traceback(),
            "Traceback (most recent call last):\n  line 3, in template_1\n  line 7, in inner\n"
        );
    }

    #[test]
    fn test_into_host() {
        let err = RuntimeError::host(std::fmt::Error);
        assert!(err.into_host().is_ok());
        assert!(RuntimeError::zero_division().into_host().is_err());
    }
}
