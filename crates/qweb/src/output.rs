//! Output formatting for template errors.

use crate::cli::OutputFormat;
use crate::loader::IndexError;
use crate::orchestrator::CheckResult;
use qweb_compiler::Error;

/// Formatter for error output.
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print a compile or render error of `template`.
    pub fn print_error(&self, template: &str, error: &Error) {
        let line = match self.format {
            OutputFormat::Human => format_human(template, error),
            OutputFormat::Json => format_json(template, error),
            OutputFormat::Machine => format_machine(template, error),
        };
        eprintln!("{}", line);
    }

    /// Print a file that could not be indexed.
    pub fn print_index_error(&self, error: &IndexError) {
        match self.format {
            OutputFormat::Human => {
                eprintln!("{}: \x1b[31merror\x1b[0m: {}", error.path, error.message);
            }
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "type": "index",
                    "file": error.path.as_str(),
                    "message": error.message,
                });
                eprintln!("{}", json);
            }
            OutputFormat::Machine => {
                eprintln!("{}:index:{}", error.path, error.message.replace(':', "\\:"));
            }
        }
    }

    /// Print the summary.
    pub fn print_summary(&self, result: &CheckResult) {
        match self.format {
            OutputFormat::Human => {
                if result.error_count == 0 {
                    eprintln!(
                        "\x1b[32m✓\x1b[0m {} templates compiled ({}ms)",
                        result.template_count, result.duration_ms
                    );
                } else {
                    eprintln!(
                        "\x1b[31m✗\x1b[0m Found {} error{} in {} templates ({}ms)",
                        result.error_count,
                        if result.error_count == 1 { "" } else { "s" },
                        result.template_count,
                        result.duration_ms
                    );
                }
            }
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "type": "summary",
                    "templates": result.template_count,
                    "errors": result.error_count,
                    "duration_ms": result.duration_ms,
                });
                eprintln!("{}", json);
            }
            OutputFormat::Machine => {}
        }
    }
}

fn format_human(template: &str, error: &Error) -> String {
    let header = match error.as_template().and_then(|err| err.location) {
        Some((line, column)) => format!("{}:{}:{}", template, line, column),
        None => template.to_string(),
    };
    format!("{}: \x1b[31merror\x1b[0m: {}", header, error)
}

fn format_json(template: &str, error: &Error) -> String {
    let json = match error.as_template() {
        Some(err) => serde_json::json!({
            "type": "template",
            "template": err.template.as_deref().unwrap_or(template),
            "kind": err.kind.as_str(),
            "error": err.error,
            "message": err.message,
            "path": err.path,
            "node": err.node,
            "line": err.location.map(|(line, _)| line),
            "column": err.location.map(|(_, column)| column),
        }),
        None => serde_json::json!({
            "type": "rollback",
            "template": template,
            "error": error.to_string(),
        }),
    };
    json.to_string()
}

fn format_machine(template: &str, error: &Error) -> String {
    let (kind, message, line, column) = match error.as_template() {
        Some(err) => {
            let (line, column) = err.location.unwrap_or((0, 0));
            (err.kind.as_str(), err.error.clone(), line, column)
        }
        None => ("rollback", error.to_string(), 0, 0),
    };
    format!(
        "{}:{}:{}:{}:{}",
        template,
        line,
        column,
        kind,
        message.replace(':', "\\:")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use qweb_compiler::{HookError, TemplateError, TemplateErrorKind};

    fn compile_error() -> Error {
        TemplateError::new(
            TemplateErrorKind::Compile,
            "Unknown directive on <p>: t-foo",
            "Error while compiling the template",
        )
        .with_template("web.page")
        .with_path(Some("/div/p".into()))
        .with_location(Some((3, 5)))
        .into()
    }

    #[test]
    fn test_machine_format() {
        assert_eq!(
            format_machine("web.page", &compile_error()),
            "web.page:3:5:compile:Unknown directive on <p>\\: t-foo"
        );
        let rollback = Error::Rollback(HookError::rollback("conflict"));
        assert_eq!(format_machine("web.page", &rollback), "web.page:0:0:rollback:conflict");
    }

    #[test]
    fn test_json_format() {
        let json: serde_json::Value =
            serde_json::from_str(&format_json("web.page", &compile_error())).unwrap();
        assert_eq!(json["kind"], "compile");
        assert_eq!(json["path"], "/div/p");
        assert_eq!(json["line"], 3);
        assert_eq!(json["node"], serde_json::Value::Null);
    }
}
