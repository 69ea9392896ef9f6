//! Compilation options.

use indexmap::IndexMap;
use qweb_dom::NsMap;
use qweb_runtime::{Dict, Value};
use smol_str::SmolStr;
use std::fmt::Write as _;

const DEV_MODE: &str = "dev_mode";
const LANG: &str = "lang";
const NSMAP: &str = "nsmap";
const CALLER_TEMPLATE: &str = "caller_template";
const LAST_PATH_NODE: &str = "last_path_node";

/// Options a template is compiled with.
///
/// The generated code sees them as the frozen `options` dict; a `t-call`
/// copies that dict, amends it and compiles the callee with the result.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Recompile on every call and keep generated code in errors.
    pub dev_mode: bool,
    /// Active language.
    pub lang: Option<SmolStr>,
    /// Namespaces declared by the calling template.
    pub nsmap: NsMap,
    /// Reference of the calling template.
    pub caller_template: Option<String>,
    /// Path of the calling node.
    pub last_path: Option<String>,
    /// Other keys, such as those passed through `t-call-options`.
    pub extra: IndexMap<SmolStr, Value>,
}

impl CompileOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = dev_mode;
        self
    }

    pub fn lang(mut self, lang: impl Into<SmolStr>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    pub fn nsmap(mut self, nsmap: NsMap) -> Self {
        self.nsmap = nsmap;
        self
    }

    pub fn caller_template(mut self, caller: impl Into<String>) -> Self {
        self.caller_template = Some(caller.into());
        self
    }

    pub fn last_path(mut self, path: impl Into<String>) -> Self {
        self.last_path = Some(path.into());
        self
    }

    /// Set an extra option.
    pub fn set(mut self, key: impl Into<SmolStr>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// The frozen dict exposed to generated code as `options`.
    pub fn to_dict(&self) -> Dict {
        let mut map = IndexMap::new();
        map.insert(Value::str(DEV_MODE), Value::Bool(self.dev_mode));
        map.insert(Value::str(LANG), self.lang.as_deref().map(Value::str).unwrap_or_default());
        let nsmap: Dict = self
            .nsmap
            .iter()
            .map(|(prefix, uri)| {
                let key = prefix.as_deref().map(Value::str).unwrap_or_default();
                (key, Value::str(uri.as_str()))
            })
            .collect();
        map.insert(Value::str(NSMAP), Value::Dict(nsmap));
        if let Some(caller) = &self.caller_template {
            map.insert(Value::str(CALLER_TEMPLATE), Value::str(caller.as_str()));
        }
        if let Some(path) = &self.last_path {
            map.insert(Value::str(LAST_PATH_NODE), Value::str(path.as_str()));
        }
        for (key, value) in &self.extra {
            map.insert(Value::str(key.as_str()), value.clone());
        }
        Dict::frozen(map)
    }

    /// The `options` global of a compiled template.
    ///
    /// A compiled template is shared by every caller with the same
    /// fingerprint, so the caller and call site are left out.
    pub fn to_cached_dict(&self) -> Dict {
        CompileOptions {
            caller_template: None,
            last_path: None,
            ..self.clone()
        }
        .to_dict()
    }

    /// Read options back from a dict built by generated code.
    pub fn from_dict(dict: &Dict) -> Self {
        let mut options = Self::default();
        for (key, value) in dict.items() {
            let Some(name) = key.as_str() else {
                continue;
            };
            match name {
                DEV_MODE => options.dev_mode = value.truthy(),
                LANG => options.lang = text(&value).map(SmolStr::from),
                NSMAP => {
                    if let Some(nsmap) = value.as_dict() {
                        options.nsmap = nsmap
                            .items()
                            .into_iter()
                            .filter_map(|(prefix, uri)| {
                                let prefix = if prefix.is_none() {
                                    None
                                } else {
                                    Some(SmolStr::from(text(&prefix)?))
                                };
                                Some((prefix, SmolStr::from(text(&uri)?)))
                            })
                            .collect();
                    }
                }
                CALLER_TEMPLATE => options.caller_template = text(&value),
                LAST_PATH_NODE => options.last_path = text(&value),
                other => {
                    options.extra.insert(SmolStr::from(other), value);
                }
            }
        }
        options
    }

    /// Digest of every option that changes the generated code.
    ///
    /// The calling template and node only feed diagnostics and are left out.
    pub fn fingerprint(&self) -> String {
        let mut out = String::new();
        let _ = write!(out, "dev={};lang={}", self.dev_mode, self.lang.as_deref().unwrap_or(""));
        for (prefix, uri) in &self.nsmap {
            let _ = write!(out, ";ns:{}={}", prefix.as_deref().unwrap_or(""), uri);
        }
        for (key, value) in &self.extra {
            let _ = write!(out, ";{}={}", key, value.repr());
        }
        out
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::None => None,
        Value::Str(s) | Value::Markup(s) => Some(s.to_string()),
        other => Some(other.py_str()),
    }
}
