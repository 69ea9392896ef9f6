//! Error types for template compilation and rendering.

use qweb_expr::ExprError;
use source_map::Span;
use std::fmt;
use thiserror::Error;

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;

/// A structural error found while compiling a template node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    /// The error message.
    pub message: String,
    /// The span of the offending node.
    pub span: Span,
    /// The error code.
    pub code: CompileErrorCode,
}

impl CompileError {
    /// Create a new compile error.
    pub fn new(message: impl Into<String>, span: Span, code: CompileErrorCode) -> Self {
        Self {
            message: message.into(),
            span,
            code,
        }
    }

    /// Create an unknown directive error.
    pub fn unknown_directive(node: &str, directive: &str, span: Span) -> Self {
        Self::new(
            format!("Unknown directive on {}: {}", node, directive),
            span,
            CompileErrorCode::UnknownDirective,
        )
    }

    /// Create an invalid expression error.
    pub fn invalid_expression(expr: &str, error: &ExprError, span: Span) -> Self {
        Self::new(
            format!("Invalid expression {:?}: {}", expr, error),
            span,
            CompileErrorCode::InvalidExpression,
        )
    }

    /// Create a misplaced directive error.
    pub fn misplaced(message: impl Into<String>, span: Span) -> Self {
        Self::new(message, span, CompileErrorCode::MisplacedDirective)
    }

    /// Create a missing attribute error.
    pub fn missing_attribute(directive: &str, attribute: &str, span: Span) -> Self {
        Self::new(
            format!("{} directive requires a {} attribute", directive, attribute),
            span,
            CompileErrorCode::MissingAttribute,
        )
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CompileError {}

/// Error codes for template compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompileErrorCode {
    /// A `t-` attribute that no directive handles.
    UnknownDirective,
    /// An expression that does not parse.
    InvalidExpression,
    /// A directive used where it is not allowed.
    MisplacedDirective,
    /// A directive without its companion attribute.
    MissingAttribute,
    /// A write to a reserved name.
    ReservedName,
    /// A hook failed at compile time.
    Hook,
}

impl CompileErrorCode {
    /// Get the error code as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownDirective => "unknown-directive",
            Self::InvalidExpression => "invalid-expression",
            Self::MisplacedDirective => "misplaced-directive",
            Self::MissingAttribute => "missing-attribute",
            Self::ReservedName => "reserved-name",
            Self::Hook => "hook",
        }
    }
}

impl fmt::Display for CompileErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error raised by a [`Hooks`](crate::Hooks) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HookError {
    pub message: String,
    /// A transactional conflict; it is never wrapped.
    pub rollback: bool,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            rollback: false,
        }
    }

    /// A transactional conflict that outer layers may retry.
    pub fn rollback(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            rollback: true,
        }
    }
}

/// An invalid configuration detected while rendering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ConfigError(pub String);

/// What a [`TemplateError`] was raised by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateErrorKind {
    /// The template could not be found or read.
    Load,
    /// A directive was used incorrectly.
    Compile,
    /// The generated source did not parse.
    CodeCompile,
    /// Rendering failed.
    Render,
    /// The environment is misconfigured.
    Config,
}

impl TemplateErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Compile => "compile",
            Self::CodeCompile => "code-compile",
            Self::Render => "render",
            Self::Config => "config",
        }
    }
}

impl fmt::Display for TemplateErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A failure wrapped with the template context it happened in.
#[derive(Debug)]
pub struct TemplateError {
    pub kind: TemplateErrorKind,
    /// The underlying error, first line of the report.
    pub error: String,
    /// Interpreter stack of the generated code.
    pub stack: Option<String>,
    /// What was being done.
    pub message: String,
    /// Template reference.
    pub template: Option<String>,
    /// Last tracked template path.
    pub path: Option<String>,
    /// Serialized node at `path`.
    pub node: Option<String>,
    /// 1-based template line and column.
    pub location: Option<(usize, usize)>,
    /// Generated source, kept in developer mode only.
    pub code: Option<String>,
    pub source: Option<Box<dyn std::error::Error + 'static>>,
}

impl TemplateError {
    pub fn new(kind: TemplateErrorKind, error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            error: error.into(),
            stack: None,
            message: message.into(),
            template: None,
            path: None,
            node: None,
            location: None,
            code: None,
            source: None,
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn with_path(mut self, path: Option<String>) -> Self {
        self.path = path;
        self
    }

    pub fn with_node(mut self, node: Option<String>) -> Self {
        self.node = node;
        self
    }

    pub fn with_location(mut self, location: Option<(usize, usize)>) -> Self {
        self.location = location;
        self
    }

    pub fn with_stack(mut self, stack: Option<String>) -> Self {
        self.stack = stack.filter(|stack| !stack.is_empty());
        self
    }

    pub fn with_code(mut self, code: Option<String>) -> Self {
        self.code = code;
        self
    }

    pub fn with_source(mut self, source: Box<dyn std::error::Error + 'static>) -> Self {
        self.source = Some(source);
        self
    }
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        if let Some(stack) = &self.stack {
            write!(f, "\n{}", stack.trim_end())?;
        }
        write!(f, "\n{}", self.message)?;
        if let Some(template) = &self.template {
            write!(f, "\nTemplate: {}", template)?;
        }
        if let Some(path) = &self.path {
            write!(f, "\nPath: {}", path)?;
        }
        if let Some(node) = &self.node {
            write!(f, "\nNode: {}", node)?;
        }
        if let Some((line, column)) = self.location {
            write!(f, "\nLine: {}, column {}", line, column)?;
        }
        if let Some(code) = &self.code {
            write!(f, "\nCompiled code:\n{}", code.trim_end())?;
        }
        Ok(())
    }
}

impl std::error::Error for TemplateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_deref()
    }
}

/// Errors returned by [`QWeb`](crate::QWeb).
#[derive(Debug, Error)]
pub enum Error {
    /// A failure wrapped with its template context.
    #[error(transparent)]
    Template(#[from] TemplateError),
    /// A transactional conflict raised by a hook, passed through unchanged.
    #[error(transparent)]
    Rollback(HookError),
}

impl Error {
    /// The wrapped template error, if any.
    pub fn as_template(&self) -> Option<&TemplateError> {
        match self {
            Self::Template(err) => Some(err),
            Self::Rollback(_) => None,
        }
    }

    /// Kind of the wrapped error.
    pub fn kind(&self) -> Option<TemplateErrorKind> {
        self.as_template().map(|err| err.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_report_order() {
        let err = TemplateError::new(TemplateErrorKind::Render, "KeyError: 'x'", "Error while rendering the template")
            .with_stack(Some("Traceback (most recent call last):\n  line 3, in template_a\n".into()))
            .with_template("a")
            .with_path(Some("/t/p".into()))
            .with_node(Some("<p t-esc=\"x['y']\"/>".into()))
            .with_location(Some((2, 5)));
        assert_eq!(
            err.to_string(),
            "KeyError: 'x'\n\
             Traceback (most recent call last):\n  line 3, in template_a\n\
             Error while rendering the template\n\
             Template: a\n\
             Path: /t/p\n\
             Node: <p t-esc=\"x['y']\"/>\n\
             Line: 2, column 5"
        );
    }

    #[test]
    fn test_code_only_when_present() {
        let err = TemplateError::new(TemplateErrorKind::CodeCompile, "line 2: unexpected ':'", "Error while compiling the generated code")
            .with_code(Some("def f(self, values, log):\n    yield :\n".into()));
        insta::assert_snapshot!(err.to_string(), @r"
        line 2: unexpected ':'
        Error while compiling the generated code
        Compiled code:
        def f(self, values, log):
            yield :
        ");
    }

    #[test]
    fn test_error_kind() {
        let err = Error::from(TemplateError::new(TemplateErrorKind::Load, "not found", "Error while loading"));
        assert_eq!(err.kind(), Some(TemplateErrorKind::Load));
        let err = Error::Rollback(HookError::rollback("serialization failure"));
        assert_eq!(err.kind(), None);
        assert_eq!(err.to_string(), "serialization failure");
        assert_eq!(CompileErrorCode::UnknownDirective.as_str(), "unknown-directive");
    }
}
