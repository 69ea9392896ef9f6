//! qweb - Render and check Qweb templates.

use clap::Parser;
use miette::Result;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod loader;
mod orchestrator;
mod output;

use cli::{Args, Command};
use orchestrator::Orchestrator;

fn main() -> ExitCode {
    let args = Args::parse();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    let level = args.log_level();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "qweb={0},qweb_compiler={0},qweb_runtime={0}",
            level
        ))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(args) {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("{:?}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let workspace = args
        .workspace
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    let orchestrator = Orchestrator::new(workspace, &args)?;

    match &args.command {
        Command::Render {
            template,
            values,
            values_file,
            emit_code,
        } => orchestrator.render(
            template,
            values.as_deref(),
            values_file.as_deref(),
            *emit_code,
        ),
        Command::Check { names } => {
            let result = orchestrator.check(names);
            if result.error_count > 0 {
                Ok(ExitCode::from(1))
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}
