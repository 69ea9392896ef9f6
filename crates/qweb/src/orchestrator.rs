//! Orchestrator for the render and check commands.

use crate::cli::Args;
use crate::config::Config;
use crate::loader::TemplateIndex;
use crate::output::OutputFormatter;
use miette::{miette, IntoDiagnostic, Result, WrapErr};
use qweb_compiler::QWeb;
use qweb_runtime::{Dict, Value};
use std::io::{self, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

/// Result of a check run.
#[derive(Debug, Default)]
pub struct CheckResult {
    /// Number of templates compiled.
    pub template_count: usize,
    /// Number of errors, unreadable files included when checking everything.
    pub error_count: usize,
    /// Time taken.
    pub duration_ms: u64,
}

/// Orchestrator for running qweb.
pub struct Orchestrator {
    config: Config,
    qweb: QWeb,
    /// Indexed template names, in discovery order.
    names: Vec<String>,
    /// Files that could not be indexed.
    index_errors: usize,
    formatter: OutputFormatter,
}

impl Orchestrator {
    /// Create a new orchestrator.
    pub fn new(workspace: PathBuf, args: &Args) -> Result<Self> {
        let config = Config::load(&workspace, args)?;
        let index = TemplateIndex::build(&config);
        let formatter = OutputFormatter::new(args.output);
        for error in index.errors() {
            formatter.print_index_error(error);
        }
        let names = index.names().map(str::to_string).collect();
        let index_errors = index.errors().len();

        Ok(Self {
            config,
            qweb: QWeb::new(index),
            names,
            index_errors,
            formatter,
        })
    }

    /// Render `template` to stdout.
    pub fn render(
        &self,
        template: &str,
        values: Option<&str>,
        values_file: Option<&Path>,
        emit_code: bool,
    ) -> Result<ExitCode> {
        let options = self.config.compile_options();
        if emit_code {
            return match self.qweb.compile(template, &options) {
                Ok(compiled) => {
                    print!("{}", compiled.code());
                    Ok(ExitCode::SUCCESS)
                }
                Err(err) => {
                    self.formatter.print_error(template, &err);
                    Ok(ExitCode::FAILURE)
                }
            };
        }

        let overrides = match (values, values_file) {
            (Some(values), _) => Some(values.to_string()),
            (None, Some(path)) => Some(
                std::fs::read_to_string(path)
                    .into_diagnostic()
                    .wrap_err_with(|| format!("failed to read {}", path.display()))?,
            ),
            (None, None) => None,
        };
        let values = self.values(overrides.as_deref())?;

        let stdout = io::stdout();
        let mut stdout = stdout.lock();
        let mut write_error = None;
        let mut sink = |chunk: &str| match stdout.write_all(chunk.as_bytes()) {
            Ok(()) => ControlFlow::Continue(()),
            Err(err) => {
                write_error = Some(err);
                ControlFlow::Break(())
            }
        };
        let started = Instant::now();
        let result = self.qweb.render_to(template, &values, &options, &mut sink);
        tracing::debug!(template, elapsed_ms = started.elapsed().as_millis() as u64, "rendered");

        match write_error {
            Some(err) if err.kind() == io::ErrorKind::BrokenPipe => return Ok(ExitCode::SUCCESS),
            Some(err) => return Err(err).into_diagnostic(),
            None => {}
        }
        match result {
            Ok(_) => {
                stdout.flush().into_diagnostic()?;
                Ok(ExitCode::SUCCESS)
            }
            Err(err) => {
                self.formatter.print_error(template, &err);
                Ok(ExitCode::FAILURE)
            }
        }
    }

    /// Compile `templates`, or every indexed template, and report errors.
    pub fn check(&self, templates: &[String]) -> CheckResult {
        let start = Instant::now();
        let all = templates.is_empty();
        let templates = if all { &self.names[..] } else { templates };
        let options = self.config.compile_options();

        let mut result = CheckResult {
            template_count: templates.len(),
            error_count: if all { self.index_errors } else { 0 },
            ..CheckResult::default()
        };
        for template in templates {
            if let Err(err) = self.qweb.compile(template.as_str(), &options) {
                self.formatter.print_error(template, &err);
                result.error_count += 1;
            }
        }
        result.duration_ms = start.elapsed().as_millis() as u64;
        self.formatter.print_summary(&result);
        result
    }

    /// Project values, overridden by a JSON object.
    fn values(&self, overrides: Option<&str>) -> Result<Dict> {
        let values = Dict::new();
        for (key, value) in &self.config.values {
            values.set(key, Value::from(value));
        }
        let Some(overrides) = overrides else {
            return Ok(values);
        };
        let overrides: serde_json::Value = serde_json::from_str(overrides)
            .into_diagnostic()
            .wrap_err("values must be valid JSON")?;
        let serde_json::Value::Object(overrides) = overrides else {
            return Err(miette!("values must be a JSON object"));
        };
        for (key, value) in &overrides {
            values.set(key, Value::from(value));
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    fn workspace(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, source) in files {
            std::fs::write(dir.path().join(name), source).unwrap();
        }
        dir
    }

    #[test]
    fn test_check_counts_errors() {
        let dir = workspace(&[
            ("good.xml", r#"<t t-name="good"><p t-esc="x"/></t>"#),
            ("bad.xml", r#"<t t-name="bad"><p t-foo="x"/></t>"#),
            ("broken.xml", "<p>"),
        ]);
        let args = Args::parse_from(["qweb", "check", "--output", "machine"]);
        let orchestrator = Orchestrator::new(dir.path().to_path_buf(), &args).unwrap();
        let result = orchestrator.check(&[]);
        assert_eq!(result.template_count, 2);
        assert_eq!(result.error_count, 2);

        let result = orchestrator.check(&["good".to_string(), "missing".to_string()]);
        assert_eq!(result.template_count, 2);
        assert_eq!(result.error_count, 1);
    }

    #[test]
    fn test_values_override_project_values() {
        let dir = workspace(&[("qweb.json", r#"{"values": {"a": 1, "b": "x"}}"#)]);
        let args = Args::parse_from(["qweb", "check"]);
        let orchestrator = Orchestrator::new(dir.path().to_path_buf(), &args).unwrap();

        let values = orchestrator.values(Some(r#"{"b": [1, 2]}"#)).unwrap();
        assert_eq!(values.get_str("a"), Some(Value::Int(1)));
        assert_eq!(values.get_str("b").map(|b| b.repr()).as_deref(), Some("[1, 2]"));
        assert!(orchestrator.values(Some("[1]")).is_err());
        assert!(orchestrator.values(Some("{")).is_err());
    }
}
