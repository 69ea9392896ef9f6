//! The compiler driver and render entry points.

use crate::classify::compile_element;
use crate::context::{CompileContext, Lines};
use crate::error::{ConfigError, Error, HookError, TemplateError, TemplateErrorKind};
use crate::hooks::{Env, Hooks, TemplateRef, TemplateSource};
use crate::host::{HostHandle, TemplateCallable};
use crate::options::CompileOptions;
use qweb_dom::{parse_document, Document, Element};
use qweb_runtime::{Args, Callable, Dict, Function, Globals, Module, Output, Program, RuntimeError, Value};
use rustc_hash::FxHashMap;
use source_map::{CodeBuilder, CodeLine, LineIndex, SourceMap, Span};
use std::cell::{Cell, RefCell};
use std::error::Error as StdError;
use std::fmt;
use std::ops::ControlFlow;
use std::rc::Rc;

/// Deepest chain of nested template calls.
const MAX_CALL_DEPTH: u32 = 100;

const RENDER_MESSAGE: &str = "Error while rendering the template";

/// A template compiler and renderer.
///
/// Compiled templates are cached per reference and option fingerprint,
/// except in developer mode where every compile starts over.
///
/// # Example
///
/// ```
/// use qweb_compiler::{CompileOptions, DefaultHooks, QWeb, TemplateRef};
/// use qweb_runtime::{Dict, Value};
///
/// let qweb = QWeb::new(DefaultHooks);
/// let template = TemplateRef::from(qweb_dom::parse_document(r#"<p t-esc="name"/>"#).unwrap());
/// let values = Dict::new();
/// values.set("name", Value::from("<world>"));
/// let html = qweb.render(template, &values, &CompileOptions::new()).unwrap();
/// assert_eq!(html, "<p>&lt;world&gt;</p>");
/// ```
#[derive(Clone)]
pub struct QWeb {
    engine: Rc<Engine>,
}

impl QWeb {
    pub fn new(hooks: impl Hooks + 'static) -> Self {
        Self {
            engine: Rc::new(Engine::new(Box::new(hooks))),
        }
    }

    /// The collaborators this engine was built with.
    pub fn hooks(&self) -> &dyn Hooks {
        self.engine.hooks.as_ref()
    }

    /// Compile a template, or fetch it from the cache.
    pub fn compile(
        &self,
        reference: impl Into<TemplateRef>,
        options: &CompileOptions,
    ) -> Result<Rc<CompiledTemplate>, Error> {
        self.engine.compile(&reference.into(), options)
    }

    /// Render a template to a string.
    pub fn render(
        &self,
        reference: impl Into<TemplateRef>,
        values: &Dict,
        options: &CompileOptions,
    ) -> Result<String, Error> {
        let mut out = String::new();
        self.render_to(reference, values, options, &mut out)?;
        Ok(out)
    }

    /// Render a template into `out`, chunk by chunk.
    ///
    /// `values` is shared with the generated code, which writes `t-set` and
    /// loop variables into it. Returns `ControlFlow::Break` when `out` asked
    /// to stop.
    pub fn render_to(
        &self,
        reference: impl Into<TemplateRef>,
        values: &Dict,
        options: &CompileOptions,
        out: &mut dyn Output,
    ) -> Result<ControlFlow<()>, Error> {
        let template = self.engine.compile(&reference.into(), options)?;
        self.engine.hooks.prepare_values(values).map_err(|err| {
            hook_failure(err, TemplateErrorKind::Render, RENDER_MESSAGE, template.reference())
        })?;

        let log = Dict::new();
        log.set("last_path_node", Value::None);
        let this = HostHandle::new(self.engine.clone(), Env::new(options.lang.clone()));
        let args = Args::new(vec![
            Value::Object(Rc::new(this)),
            Value::Dict(values.clone()),
            Value::Dict(log),
        ]);
        TemplateCallable::new(self.engine.clone(), template.clone())
            .call(args, out)
            .map_err(|err| match err.into_host() {
                Ok(host) => match host.downcast::<Error>() {
                    Ok(err) => *err,
                    Err(host) => TemplateError::new(TemplateErrorKind::Render, host.to_string(), RENDER_MESSAGE)
                        .with_template(template.reference())
                        .into(),
                },
                Err(err) => template.wrap_error(err, None),
            })
    }

    /// Forget every compiled template.
    pub fn clear_cache(&self) {
        self.engine.cache.borrow_mut().clear();
    }
}

impl fmt::Debug for QWeb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.engine, f)
    }
}

/// Shared state behind a [`QWeb`] and the handles given to generated code.
pub(crate) struct Engine {
    pub(crate) hooks: Box<dyn Hooks>,
    cache: RefCell<FxHashMap<(String, String), Rc<CompiledTemplate>>>,
    depth: Cell<u32>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QWeb")
            .field("cached", &self.cache.borrow().len())
            .field("depth", &self.depth.get())
            .finish()
    }
}

/// Releases one level of call depth when dropped.
pub(crate) struct DepthGuard<'e>(&'e Cell<u32>);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

impl Engine {
    fn new(hooks: Box<dyn Hooks>) -> Self {
        Self {
            hooks,
            cache: RefCell::new(FxHashMap::default()),
            depth: Cell::new(0),
        }
    }

    /// Enter one level of template call.
    pub(crate) fn enter(&self) -> Result<DepthGuard<'_>, Error> {
        let depth = self.depth.get() + 1;
        if depth > MAX_CALL_DEPTH {
            return Err(TemplateError::new(
                TemplateErrorKind::Render,
                format!("maximum template call depth exceeded ({})", MAX_CALL_DEPTH),
                RENDER_MESSAGE,
            )
            .into());
        }
        self.depth.set(depth);
        Ok(DepthGuard(&self.depth))
    }

    pub(crate) fn compile(
        &self,
        reference: &TemplateRef,
        options: &CompileOptions,
    ) -> Result<Rc<CompiledTemplate>, Error> {
        let key = (reference.cache_key(), options.fingerprint());
        if !options.dev_mode {
            if let Some(template) = self.cache.borrow().get(&key) {
                tracing::debug!(template = %reference, "compiled template cache hit");
                return Ok(template.clone());
            }
            tracing::debug!(template = %reference, "compiled template cache miss");
        }

        let template = Rc::new(self.build(reference, options)?);
        if !options.dev_mode {
            self.cache.borrow_mut().insert(key, template.clone());
        }
        Ok(template)
    }

    fn build(
        &self,
        reference: &TemplateRef,
        options: &CompileOptions,
    ) -> Result<CompiledTemplate, Error> {
        let (document, canonical) = self.load(reference, options)?;
        let name = canonical.to_string();
        let root = match reference {
            TemplateRef::Name(wanted) => document.template(wanted).unwrap_or(&document.root),
            _ => &document.root,
        };
        let function_name = format!("template_{}", sanitize(&name));

        let mut ctx = CompileContext::new(self.hooks.as_ref(), options, &document, name.clone());
        let (code, source_map) = match generate(&mut ctx, root, &function_name) {
            Ok(generated) => generated,
            Err(err) => {
                let path = ctx.current_path.clone();
                let node = path.as_deref().and_then(|path| document.find_by_path(path));
                return Err(TemplateError::new(
                    TemplateErrorKind::Compile,
                    err.to_string(),
                    "Error while compiling the template",
                )
                .with_template(name)
                .with_node(node.map(Element::to_xml))
                .with_path(path)
                .with_location(Some(location(&document, err.span)))
                .with_source(Box::new(err))
                .into());
            }
        };
        tracing::debug!(
            template = %name,
            function = %function_name,
            lines = source_map.len(),
            "compiled template"
        );
        tracing::trace!(template = %name, "generated code:\n{}", code);

        let code_error = |error: String| {
            TemplateError::new(
                TemplateErrorKind::CodeCompile,
                error,
                "Error while compiling the generated code",
            )
            .with_template(name.clone())
            .with_code(options.dev_mode.then(|| code.clone()))
        };
        let program = Program::parse(&code).map_err(|err| code_error(err.to_string()))?;
        let mut globals = Globals::new();
        globals.insert("options", Value::Dict(options.to_cached_dict()));
        let function = Module::new(program, globals)
            .function(&function_name)
            .ok_or_else(|| code_error(format!("function '{}' is not defined", function_name)))?;

        Ok(CompiledTemplate {
            reference: name,
            function_name,
            code,
            source_map,
            function,
            document,
            dev_mode: options.dev_mode,
        })
    }

    fn load(
        &self,
        reference: &TemplateRef,
        options: &CompileOptions,
    ) -> Result<(Rc<Document>, TemplateRef), Error> {
        if let TemplateRef::Tree(document) = reference {
            return Ok((document.clone(), reference.clone()));
        }
        tracing::debug!(template = %reference, "loading template");
        let name = reference.to_string();
        let loaded = match self.hooks.load(reference, options) {
            Ok(Some(loaded)) => loaded,
            Ok(None) => {
                return Err(TemplateError::new(
                    TemplateErrorKind::Load,
                    format!("Template not found: {}", name),
                    "Error while loading the template",
                )
                .with_template(name)
                .into())
            }
            Err(err) => {
                return Err(hook_failure(
                    err,
                    TemplateErrorKind::Load,
                    "Error while loading the template",
                    &name,
                ))
            }
        };

        let load_error = |error: String| {
            TemplateError::new(TemplateErrorKind::Load, error, "Error while loading the template")
                .with_template(name.clone())
        };
        let document = match loaded.document {
            TemplateSource::Tree(document) => document,
            TemplateSource::Xml(xml) => Rc::new(parse_xml(&xml).map_err(load_error)?),
            TemplateSource::Path(path) => {
                let xml = std::fs::read_to_string(&path)
                    .map_err(|err| load_error(format!("{}: {}", path.display(), err)))?;
                Rc::new(parse_xml(&xml).map_err(load_error)?)
            }
        };
        Ok((document, loaded.reference))
    }
}

fn parse_xml(xml: &str) -> Result<Document, String> {
    parse_document(xml).map_err(|err| {
        let (line, column) = LineIndex::new(xml).line_col(err.span.start).to_display();
        format!("{} (line {}, column {})", err, line, column)
    })
}

/// Generate the source of one template function.
fn generate(
    ctx: &mut CompileContext<'_>,
    root: &Element,
    function_name: &str,
) -> crate::error::CompileResult<(String, SourceMap)> {
    let mut out = Lines::new();
    out.push(CodeLine::new(0, format!("def {}(self, values, log):", function_name)));
    let body = compile_element(ctx, root, &[], 0, 1)?;
    out.extend(body);
    ctx.flush(&mut out);
    if !out.iter().skip(1).any(|line| line.text.starts_with("yield")) {
        out.push(CodeLine::new(1, "yield ''"));
    }

    let mut builder = CodeBuilder::new();
    builder.extend(&out);
    Ok(builder.finish())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn location(document: &Document, span: Span) -> (usize, usize) {
    let (line, column) = LineIndex::new(&document.source).line_col(span.start).to_display();
    (line as usize, column as usize)
}

fn hook_failure(err: HookError, kind: TemplateErrorKind, message: &str, template: &str) -> Error {
    if err.rollback {
        return Error::Rollback(err);
    }
    TemplateError::new(kind, err.to_string(), message)
        .with_template(template)
        .with_source(Box::new(err))
        .into()
}

/// Sort a host error raised inside generated code.
///
/// Already wrapped errors and transactional conflicts come back as `Err` and
/// are passed on unchanged.
fn host_failure(
    host: Box<dyn StdError>,
) -> Result<(TemplateErrorKind, Box<dyn StdError>), Error> {
    let host = match host.downcast::<Error>() {
        Ok(err) => return Err(*err),
        Err(host) => host,
    };
    let host = match host.downcast::<HookError>() {
        Ok(err) if err.rollback => return Err(Error::Rollback(*err)),
        Ok(err) => return Ok((TemplateErrorKind::Render, err as Box<dyn StdError>)),
        Err(host) => host,
    };
    if host.is::<ConfigError>() {
        return Ok((TemplateErrorKind::Config, host));
    }
    Ok((TemplateErrorKind::Render, host))
}

/// A compiled template.
#[derive(Debug)]
pub struct CompiledTemplate {
    reference: String,
    function_name: String,
    code: String,
    source_map: SourceMap,
    function: Rc<Function>,
    document: Rc<Document>,
    dev_mode: bool,
}

impl CompiledTemplate {
    /// Canonical reference the template was compiled for.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Name of the generated top-level function.
    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    /// The generated source.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Template span of each generated line.
    pub fn source_map(&self) -> &SourceMap {
        &self.source_map
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub(crate) fn function(&self) -> &Rc<Function> {
        &self.function
    }

    /// Wrap an error raised by this template's code with its context.
    pub(crate) fn wrap_error(&self, err: RuntimeError, log: Option<&Dict>) -> Error {
        let line = err.line();
        let stack = line.map(|_| err.traceback());
        let (kind, source): (TemplateErrorKind, Box<dyn StdError>) = match err.into_host() {
            Ok(host) => match host_failure(host) {
                Ok(failure) => failure,
                Err(passed) => return passed,
            },
            Err(err) => (TemplateErrorKind::Render, Box::new(err)),
        };

        let path = log
            .and_then(|log| log.get_str("last_path_node"))
            .and_then(|path| path.as_str().map(str::to_string));
        let node = path.as_deref().and_then(|path| self.document.find_by_path(path));
        let span = line
            .and_then(|line| self.source_map.nearest_origin(line))
            .or_else(|| node.map(|node| node.open_span));
        tracing::debug!(template = %self.reference, error = %source, "render failed");

        TemplateError::new(kind, source.to_string(), RENDER_MESSAGE)
            .with_stack(stack)
            .with_template(self.reference.clone())
            .with_node(node.map(Element::to_xml))
            .with_path(path)
            .with_location(span.map(|span| location(&self.document, span)))
            .with_code(self.dev_mode.then(|| self.code.clone()))
            .with_source(source)
            .into()
    }
}
