//! Seams for the collaborators a template engine relies on.
//!
//! Every method has a default, so an implementation only overrides what its
//! host provides: template lookup, field and widget rendering, attribute
//! filtering.

use crate::error::HookError;
use crate::options::CompileOptions;
use indexmap::IndexMap;
use qweb_dom::Document;
use qweb_runtime::{Dict, Value};
use smol_str::SmolStr;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

/// Attributes of a tag, in output order.
pub type Attrs = IndexMap<SmolStr, Value>;

/// How a template is referred to.
#[derive(Debug, Clone)]
pub enum TemplateRef {
    /// A numeric id.
    Id(u64),
    /// A template name, usually dotted.
    Name(SmolStr),
    /// An already parsed document.
    Tree(Rc<Document>),
}

impl TemplateRef {
    /// Parse a reference string; a string of ASCII digits is an id.
    pub fn parse(reference: &str) -> Self {
        if !reference.is_empty() && reference.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = reference.parse() {
                return Self::Id(id);
            }
        }
        Self::Name(reference.into())
    }

    /// Reference from a value computed by generated code.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(id) if *id >= 0 => Some(Self::Id(*id as u64)),
            Value::Str(s) | Value::Markup(s) => Some(Self::parse(s)),
            _ => None,
        }
    }

    /// Key identifying the reference in the compiled template cache.
    pub(crate) fn cache_key(&self) -> String {
        match self {
            Self::Id(id) => format!("id:{}", id),
            Self::Name(name) => format!("name:{}", name),
            Self::Tree(doc) => format!("tree:{}", doc.source),
        }
    }
}

impl fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{}", id),
            Self::Name(name) => write!(f, "{}", name),
            Self::Tree(doc) => match doc.root.get("t-name") {
                Some(name) => write!(f, "{}", name),
                None => write!(f, "<inline>"),
            },
        }
    }
}

impl From<&str> for TemplateRef {
    fn from(reference: &str) -> Self {
        Self::parse(reference)
    }
}

impl From<u64> for TemplateRef {
    fn from(id: u64) -> Self {
        Self::Id(id)
    }
}

impl From<Document> for TemplateRef {
    fn from(doc: Document) -> Self {
        Self::Tree(Rc::new(doc))
    }
}

/// A template document in any of the forms a loader may return.
#[derive(Debug, Clone)]
pub enum TemplateSource {
    Tree(Rc<Document>),
    Xml(String),
    Path(PathBuf),
}

/// The result of a successful lookup.
#[derive(Debug, Clone)]
pub struct LoadedTemplate {
    pub document: TemplateSource,
    /// Canonical reference of the template.
    pub reference: TemplateRef,
}

impl LoadedTemplate {
    pub fn new(document: TemplateSource, reference: TemplateRef) -> Self {
        Self {
            document,
            reference,
        }
    }
}

/// What a field or widget renders to.
#[derive(Debug, Clone, Default)]
pub struct WidgetOutput {
    /// Attributes merged into the tag.
    pub attrs: Attrs,
    /// The content; `None` or `False` fall back to the default body.
    pub content: Value,
    /// Render the tag even without content.
    pub force_display: bool,
}

/// The language binding a render runs under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Env {
    pub lang: Option<SmolStr>,
}

impl Env {
    pub fn new(lang: Option<SmolStr>) -> Self {
        Self { lang }
    }

    /// The same binding under another language.
    pub fn with_lang(&self, lang: Option<SmolStr>) -> Self {
        Self { lang }
    }
}

/// External collaborators of the engine.
#[allow(unused_variables)]
pub trait Hooks {
    /// Look a template up; `None` is reported as a load error.
    fn load(
        &self,
        reference: &TemplateRef,
        options: &CompileOptions,
    ) -> Result<Option<LoadedTemplate>, HookError> {
        Ok(None)
    }

    /// Adjust the values before a top-level render.
    fn prepare_values(&self, values: &Dict) -> Result<(), HookError> {
        Ok(())
    }

    /// Filter the attributes of a tag just before they are written.
    fn post_process_attrs(
        &self,
        tag: &str,
        attrs: Attrs,
        options: &CompileOptions,
    ) -> Result<Attrs, HookError> {
        Ok(attrs)
    }

    /// Render `record.field_name` for `t-field`.
    #[allow(clippy::too_many_arguments)]
    fn get_field(
        &self,
        env: &Env,
        record: &Value,
        field_name: &str,
        expression: &str,
        tag: &str,
        field_options: &Dict,
        options: &CompileOptions,
        values: &Dict,
    ) -> Result<WidgetOutput, HookError> {
        let value = match record {
            Value::Object(object) => object.get_attr(field_name).unwrap_or_default(),
            Value::Dict(dict) => dict.get_str(field_name).unwrap_or_default(),
            _ => Value::None,
        };
        self.get_widget(env, &value, expression, tag, field_options, options, values)
    }

    /// Render a value with the widget named in `field_options`.
    #[allow(clippy::too_many_arguments)]
    fn get_widget(
        &self,
        env: &Env,
        value: &Value,
        expression: &str,
        tag: &str,
        field_options: &Dict,
        options: &CompileOptions,
        values: &Dict,
    ) -> Result<WidgetOutput, HookError> {
        Ok(WidgetOutput {
            attrs: Attrs::new(),
            content: value.clone(),
            force_display: false,
        })
    }

    /// Turn the value of `t-att` into attributes.
    fn dynamic_attrs(
        &self,
        tag: &str,
        value: &Value,
        options: &CompileOptions,
    ) -> Result<Attrs, HookError> {
        normalize_attrs(value)
    }

    /// Attach the named debugger.
    fn attach_debugger(&self, name: &str) -> Result<(), HookError> {
        tracing::debug!(debugger = name, "debugger requested");
        Ok(())
    }
}

/// Hooks with every default.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl Hooks for DefaultHooks {}

/// Attributes from a dict, a single pair, or a list of pairs.
pub fn normalize_attrs(value: &Value) -> Result<Attrs, HookError> {
    let pairs = match value {
        Value::None => return Ok(Attrs::new()),
        Value::Dict(dict) => dict.items(),
        Value::List(_) | Value::Tuple(_) => {
            let items = qweb_runtime::ops::iterate(value)
                .map_err(|err| HookError::new(err.to_string()))?;
            let single = items
                .first()
                .is_some_and(|first| !matches!(first, Value::List(_) | Value::Tuple(_)));
            let rows = if single { vec![value.clone()] } else { items };
            rows.iter().map(pair).collect::<Result<Vec<_>, _>>()?
        }
        other => {
            return Err(HookError::new(format!(
                "t-att expects a dict, a pair or a list of pairs, got '{}'",
                other.type_name()
            )))
        }
    };
    Ok(pairs
        .into_iter()
        .map(|(name, value)| (SmolStr::from(name.py_str()), value))
        .collect())
}

fn pair(row: &Value) -> Result<(Value, Value), HookError> {
    let items = qweb_runtime::ops::iterate(row).map_err(|err| HookError::new(err.to_string()))?;
    match <[Value; 2]>::try_from(items) {
        Ok([name, value]) => Ok((name, value)),
        Err(items) => Err(HookError::new(format!(
            "t-att pairs must have 2 items, got {}",
            items.len()
        ))),
    }
}

/// Convert attributes to the dict generated code works with.
pub(crate) fn attrs_to_dict(attrs: Attrs) -> Dict {
    attrs
        .into_iter()
        .map(|(name, value)| (Value::str(name.as_str()), value))
        .collect()
}

pub(crate) fn dict_to_attrs(dict: &Dict) -> Attrs {
    dict.items()
        .into_iter()
        .map(|(name, value)| (SmolStr::from(name.py_str()), value))
        .collect()
}
