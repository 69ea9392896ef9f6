//! Configuration loading and management.

use crate::cli::Args;
use globset::{Glob, GlobSet, GlobSetBuilder};
use miette::{miette, IntoDiagnostic, Result, WrapErr};
use qweb_compiler::CompileOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Name of the project file looked up in the workspace.
pub const PROJECT_FILE: &str = "qweb.json";

/// Contents of `qweb.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectFile {
    /// Template directories, relative to the file.
    pub templates: Vec<PathBuf>,
    pub dev_mode: bool,
    pub lang: Option<String>,
    /// Values every render starts from.
    pub values: serde_json::Map<String, serde_json::Value>,
    pub ignore: Vec<String>,
}

impl ProjectFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&text)
            .into_diagnostic()
            .wrap_err_with(|| format!("invalid project file {}", path.display()))
    }
}

/// Configuration for a qweb run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Workspace root directory.
    pub workspace: PathBuf,
    /// Directories searched for templates.
    pub template_dirs: Vec<PathBuf>,
    pub dev_mode: bool,
    pub lang: Option<String>,
    /// Values from the project file.
    pub values: serde_json::Map<String, serde_json::Value>,
    ignore: GlobSet,
}

impl Config {
    /// Load configuration from CLI arguments and workspace.
    pub fn load(workspace: &Path, args: &Args) -> Result<Self> {
        let project_path = args
            .config
            .clone()
            .or_else(|| Some(workspace.join(PROJECT_FILE)).filter(|path| path.is_file()));
        let project = match &project_path {
            Some(path) => ProjectFile::load(path)?,
            None => ProjectFile::default(),
        };
        let base = project_path
            .as_deref()
            .and_then(Path::parent)
            .unwrap_or(workspace);

        let mut template_dirs: Vec<PathBuf> =
            project.templates.iter().map(|dir| base.join(dir)).collect();
        template_dirs.extend(args.templates.iter().cloned());
        if template_dirs.is_empty() {
            template_dirs.push(workspace.to_path_buf());
        }

        let mut patterns = vec!["**/.git/**".to_string(), "**/node_modules/**".to_string()];
        patterns.extend(project.ignore);
        patterns.extend(args.ignore.iter().cloned());
        let mut ignore = GlobSetBuilder::new();
        for pattern in &patterns {
            let glob = Glob::new(pattern)
                .map_err(|err| miette!("invalid ignore pattern {:?}: {}", pattern, err))?;
            ignore.add(glob);
        }
        let ignore = ignore.build().into_diagnostic()?;

        Ok(Self {
            workspace: workspace.to_path_buf(),
            template_dirs,
            dev_mode: args.dev || project.dev_mode,
            lang: args.lang.clone().or(project.lang),
            values: project.values,
            ignore,
        })
    }

    /// Check if a file should be indexed.
    pub fn should_process(&self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == "xml") && !self.ignore.is_match(path)
    }

    pub fn compile_options(&self) -> CompileOptions {
        let options = CompileOptions::new().dev_mode(self.dev_mode);
        match &self.lang {
            Some(lang) => options.lang(lang.as_str()),
            None => options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_project_file_and_flags() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PROJECT_FILE),
            r#"{"templates": ["views"], "lang": "fr_FR", "values": {"site": "x"}, "ignore": ["**/legacy/**"]}"#,
        )
        .unwrap();
        let args = Args::parse_from(["qweb", "check", "--dev", "-I", "extra"]);
        let config = Config::load(dir.path(), &args).unwrap();

        assert_eq!(
            config.template_dirs,
            vec![dir.path().join("views"), PathBuf::from("extra")]
        );
        assert!(config.dev_mode);
        assert_eq!(config.lang.as_deref(), Some("fr_FR"));
        assert_eq!(config.values.get("site"), Some(&serde_json::json!("x")));
        assert!(config.should_process(Path::new("views/page.xml")));
        assert!(!config.should_process(Path::new("views/legacy/page.xml")));
        assert!(!config.should_process(Path::new("views/page.html")));

        let options = config.compile_options();
        assert!(options.dev_mode);
        assert_eq!(options.lang.as_deref(), Some("fr_FR"));
    }

    #[test]
    fn test_defaults_without_project_file() {
        let dir = tempfile::tempdir().unwrap();
        let args = Args::parse_from(["qweb", "check", "--lang", "en_US"]);
        let config = Config::load(dir.path(), &args).unwrap();
        assert_eq!(config.template_dirs, vec![dir.path().to_path_buf()]);
        assert!(!config.dev_mode);
        assert_eq!(config.lang.as_deref(), Some("en_US"));
    }

    #[test]
    fn test_unknown_project_key() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(PROJECT_FILE), r#"{"templatez": []}"#).unwrap();
        let args = Args::parse_from(["qweb", "check"]);
        assert!(Config::load(dir.path(), &args).is_err());
    }
}
