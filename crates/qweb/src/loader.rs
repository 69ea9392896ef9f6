//! Filesystem template lookup.
//!
//! Template files are indexed by the `t-name` of their root, or of each
//! child of the root for bundle files. Files without any `t-name` are
//! indexed by their path relative to the template directory, extension
//! removed.

use crate::config::Config;
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use qweb_compiler::{
    CompileOptions, HookError, Hooks, LoadedTemplate, TemplateRef, TemplateSource,
};
use qweb_dom::parse_document;
use walkdir::WalkDir;

/// A file that could not be indexed.
#[derive(Debug, Clone)]
pub struct IndexError {
    pub path: Utf8PathBuf,
    pub message: String,
}

/// Template names found under the configured directories.
#[derive(Debug, Default)]
pub struct TemplateIndex {
    templates: IndexMap<String, Utf8PathBuf>,
    errors: Vec<IndexError>,
}

impl TemplateIndex {
    /// Walk every template directory of `config`.
    pub fn build(config: &Config) -> Self {
        let mut index = Self::default();
        for dir in &config.template_dirs {
            let entries = WalkDir::new(dir)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .filter(|entry| config.should_process(entry.path()));
            for entry in entries {
                let Ok(path) = Utf8PathBuf::from_path_buf(entry.path().to_path_buf()) else {
                    tracing::warn!(path = %entry.path().display(), "skipping non UTF-8 path");
                    continue;
                };
                let relative = entry
                    .path()
                    .strip_prefix(dir)
                    .ok()
                    .and_then(Utf8Path::from_path)
                    .map(Utf8Path::to_path_buf)
                    .unwrap_or_else(|| path.clone());
                index.add_file(path, &relative);
            }
        }
        tracing::debug!(templates = index.templates.len(), "indexed templates");
        index
    }

    fn add_file(&mut self, path: Utf8PathBuf, relative: &Utf8Path) {
        let source = match std::fs::read_to_string(&path) {
            Ok(source) => source,
            Err(err) => {
                self.errors.push(IndexError {
                    path,
                    message: err.to_string(),
                });
                return;
            }
        };
        let document = match parse_document(&source) {
            Ok(document) => document,
            Err(err) => {
                self.errors.push(IndexError {
                    path,
                    message: err.to_string(),
                });
                return;
            }
        };

        let mut names: Vec<String> = document
            .root
            .get("t-name")
            .into_iter()
            .chain(document.root.elements().filter_map(|el| el.get("t-name")))
            .map(str::to_string)
            .collect();
        if names.is_empty() {
            names.push(relative.with_extension("").as_str().replace('\\', "/"));
        }
        for name in names {
            if let Some(previous) = self.templates.insert(name.clone(), path.clone()) {
                tracing::warn!(template = %name, %previous, path = %path, "template defined twice, keeping the last one");
            }
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn path(&self, name: &str) -> Option<&Utf8Path> {
        self.templates.get(name).map(Utf8PathBuf::as_path)
    }

    pub fn errors(&self) -> &[IndexError] {
        &self.errors
    }
}

impl Hooks for TemplateIndex {
    fn load(
        &self,
        reference: &TemplateRef,
        _options: &CompileOptions,
    ) -> Result<Option<LoadedTemplate>, HookError> {
        let name = reference.to_string();
        Ok(self.path(&name).map(|path| {
            LoadedTemplate::new(
                TemplateSource::Path(path.as_std_path().to_path_buf()),
                TemplateRef::Name(name.as_str().into()),
            )
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use qweb_compiler::QWeb;
    use qweb_runtime::{Dict, Value};

    fn index(files: &[(&str, &str)]) -> (tempfile::TempDir, TemplateIndex) {
        let dir = tempfile::tempdir().unwrap();
        for (name, source) in files {
            let path = dir.path().join(name);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, source).unwrap();
        }
        let args = Args::parse_from(["qweb", "check"]);
        let config = Config::load(dir.path(), &args).unwrap();
        let index = TemplateIndex::build(&config);
        (dir, index)
    }

    #[test]
    fn test_names_from_files() {
        let (_dir, index) = index(&[
            ("bundle.xml", r#"<templates><t t-name="web.a">A</t><t t-name="web.b">B</t></templates>"#),
            ("pages/home.xml", "<h1>Home</h1>"),
            ("single.xml", r#"<div t-name="web.single"/>"#),
            ("notes.txt", "not a template"),
            ("broken.xml", "<div>"),
        ]);
        let names: Vec<&str> = index.names().collect();
        assert_eq!(names, vec!["web.a", "web.b", "pages/home", "web.single"]);
        assert_eq!(index.errors().len(), 1);
        assert!(index.errors()[0].path.as_str().ends_with("broken.xml"));
    }

    #[test]
    fn test_render_through_index() {
        let (_dir, index) = index(&[
            ("layout.xml", r#"<templates><t t-name="web.layout"><main t-out="0"/></t></templates>"#),
            ("page.xml", r#"<t t-name="web.page"><t t-call="web.layout"><h1 t-esc="title"/></t></t>"#),
        ]);
        let qweb = QWeb::new(index);
        let values = Dict::new();
        values.set("title", Value::from("Hi"));
        let html = qweb
            .render("web.page", &values, &CompileOptions::new())
            .unwrap();
        assert_eq!(html, "<main><h1>Hi</h1></main>");
        assert!(qweb
            .render("web.missing", &values, &CompileOptions::new())
            .is_err());
    }
}
