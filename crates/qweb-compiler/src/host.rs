//! Objects the generated code calls back into.
//!
//! Generated functions receive a [`HostHandle`] as `self`. Its methods are
//! the only way generated code reaches the engine: compiling callees,
//! running the attribute and widget hooks, and attaching a debugger.

use crate::driver::{CompiledTemplate, Engine};
use crate::error::ConfigError;
use crate::hooks::{attrs_to_dict, dict_to_attrs, Env, TemplateRef, WidgetOutput};
use crate::options::CompileOptions;
use qweb_runtime::{Args, Callable, Dict, Object, Output, RuntimeError, RuntimeResult, Value};
use smol_str::SmolStr;
use std::fmt;
use std::ops::ControlFlow;
use std::rc::Rc;

/// Debuggers `t-debug` may name.
const DEBUGGERS: &[&str] = &["pdb", "ipdb", "pudb", "wdb"];

/// The `self` of generated code.
pub(crate) struct HostHandle {
    engine: Rc<Engine>,
    env: Env,
}

impl HostHandle {
    pub(crate) fn new(engine: Rc<Engine>, env: Env) -> Self {
        Self { engine, env }
    }

    fn compile(&self, args: &Args) -> RuntimeResult<Value> {
        let reference = args.require(0, "template", "_compile")?;
        let reference = TemplateRef::from_value(reference).ok_or_else(|| {
            RuntimeError::type_error(format!(
                "template reference must be an id or a name, not '{}'",
                reference.type_name()
            ))
        })?;
        let options = options_arg(args, 1);
        let template = self
            .engine
            .compile(&reference, &options)
            .map_err(RuntimeError::host)?;
        Ok(Value::Callable(Rc::new(TemplateCallable::new(
            self.engine.clone(),
            template,
        ))))
    }

    fn post_process_attrs(&self, args: &Args) -> RuntimeResult<Value> {
        let tag = text_arg(args, 0, "tag", "_post_processing_att")?;
        let attrs = dict_arg(args, 1, "attrs", "_post_processing_att")?;
        let options = options_arg(args, 2);
        let attrs = self
            .engine
            .hooks
            .post_process_attrs(&tag, dict_to_attrs(&attrs), &options)
            .map_err(RuntimeError::host)?;
        Ok(Value::Dict(attrs_to_dict(attrs)))
    }

    fn dynamic_attrs(&self, args: &Args) -> RuntimeResult<Value> {
        let tag = text_arg(args, 0, "tag", "_get_dynamic_att")?;
        let value = args.require(1, "value", "_get_dynamic_att")?;
        let options = options_arg(args, 2);
        let attrs = self
            .engine
            .hooks
            .dynamic_attrs(&tag, value, &options)
            .map_err(RuntimeError::host)?;
        Ok(Value::Dict(attrs_to_dict(attrs)))
    }

    fn field(&self, args: &Args) -> RuntimeResult<Value> {
        const NAME: &str = "_get_field";
        let record = args.require(0, "record", NAME)?;
        let field_name = text_arg(args, 1, "field_name", NAME)?;
        let expression = text_arg(args, 2, "expression", NAME)?;
        let tag = text_arg(args, 3, "tag", NAME)?;
        let field_options = dict_arg(args, 4, "field_options", NAME)?;
        let options = options_arg(args, 5);
        let values = dict_arg(args, 6, "values", NAME)?;
        let output = self
            .engine
            .hooks
            .get_field(
                &self.env,
                record,
                &field_name,
                &expression,
                &tag,
                &field_options,
                &options,
                &values,
            )
            .map_err(RuntimeError::host)?;
        Ok(widget_tuple(output))
    }

    fn widget(&self, args: &Args) -> RuntimeResult<Value> {
        const NAME: &str = "_get_widget";
        let value = args.require(0, "value", NAME)?;
        let expression = text_arg(args, 1, "expression", NAME)?;
        let tag = text_arg(args, 2, "tag", NAME)?;
        let field_options = dict_arg(args, 3, "field_options", NAME)?;
        let options = options_arg(args, 4);
        let values = dict_arg(args, 5, "values", NAME)?;
        let output = self
            .engine
            .hooks
            .get_widget(
                &self.env,
                value,
                &expression,
                &tag,
                &field_options,
                &options,
                &values,
            )
            .map_err(RuntimeError::host)?;
        Ok(widget_tuple(output))
    }

    fn debug(&self, args: &Args) -> RuntimeResult<Value> {
        let name = text_arg(args, 0, "debugger", "_debug")?;
        if !DEBUGGERS.contains(&name.as_str()) {
            return Err(RuntimeError::host(ConfigError(format!(
                "unsupported t-debug value: {}",
                name
            ))));
        }
        self.engine
            .hooks
            .attach_debugger(&name)
            .map_err(RuntimeError::host)?;
        Ok(Value::None)
    }

    fn with_lang(&self, args: &Args) -> RuntimeResult<Value> {
        let lang = match args.get(0, "lang") {
            None | Some(Value::None) => None,
            Some(lang) => Some(SmolStr::from(lang.py_str())),
        };
        Ok(Value::Object(Rc::new(Self::new(
            self.engine.clone(),
            self.env.with_lang(lang),
        ))))
    }
}

impl fmt::Debug for HostHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostHandle").field("env", &self.env).finish()
    }
}

impl Object for HostHandle {
    fn type_name(&self) -> &str {
        "QWeb"
    }

    fn get_attr(&self, name: &str) -> Option<Value> {
        match name {
            "lang" => Some(self.env.lang.as_deref().map(Value::str).unwrap_or_default()),
            _ => None,
        }
    }

    fn call_method(&self, name: &str, args: Args) -> RuntimeResult<Value> {
        match name {
            "_compile" => self.compile(&args),
            "_post_processing_att" => self.post_process_attrs(&args),
            "_get_dynamic_att" => self.dynamic_attrs(&args),
            "_get_field" => self.field(&args),
            "_get_widget" => self.widget(&args),
            "_debug" => self.debug(&args),
            "with_lang" => self.with_lang(&args),
            _ => Err(RuntimeError::attribute(self.type_name(), name)),
        }
    }
}

/// A compiled template as a value of generated code.
///
/// Errors raised by the template are wrapped with its context before they
/// leave it, so the caller sees them as host errors and passes them on.
#[derive(Debug)]
pub(crate) struct TemplateCallable {
    engine: Rc<Engine>,
    template: Rc<CompiledTemplate>,
}

impl TemplateCallable {
    pub(crate) fn new(engine: Rc<Engine>, template: Rc<CompiledTemplate>) -> Self {
        Self { engine, template }
    }
}

impl Callable for TemplateCallable {
    fn name(&self) -> &str {
        self.template.function_name()
    }

    fn call(&self, args: Args, out: &mut dyn Output) -> RuntimeResult<ControlFlow<()>> {
        let log = args.positional.get(2).and_then(Value::as_dict).cloned();
        let _depth = self.engine.enter().map_err(RuntimeError::host)?;
        self.template
            .function()
            .call(args, out)
            .map_err(|err| RuntimeError::host(self.template.wrap_error(err, log.as_ref())))
    }
}

fn widget_tuple(output: WidgetOutput) -> Value {
    Value::tuple(vec![
        Value::Dict(attrs_to_dict(output.attrs)),
        output.content,
        Value::Bool(output.force_display),
    ])
}

fn text_arg(args: &Args, index: usize, name: &str, function: &str) -> RuntimeResult<String> {
    match args.require(index, name, function)? {
        Value::None => Ok(String::new()),
        value => Ok(value.py_str()),
    }
}

fn dict_arg(args: &Args, index: usize, name: &str, function: &str) -> RuntimeResult<Dict> {
    match args.require(index, name, function)? {
        Value::Dict(dict) => Ok(dict.clone()),
        Value::None => Ok(Dict::new()),
        other => Err(RuntimeError::type_error(format!(
            "{}() argument '{}' must be a dict, not '{}'",
            function,
            name,
            other.type_name()
        ))),
    }
}

fn options_arg(args: &Args, index: usize) -> CompileOptions {
    match args.get(index, "options") {
        Some(Value::Dict(dict)) => CompileOptions::from_dict(dict),
        _ => CompileOptions::default(),
    }
}
