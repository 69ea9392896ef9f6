//! Extension points for host code.

use crate::error::{RuntimeError, RuntimeResult};
use crate::value::Value;
use smol_str::SmolStr;
use std::fmt;
use std::ops::ControlFlow;

/// Receiver of rendered output.
///
/// Returning `ControlFlow::Break` stops the rendering early; generated code
/// is not resumed afterwards.
pub trait Output {
    fn write(&mut self, chunk: &str) -> ControlFlow<()>;
}

impl<F: FnMut(&str) -> ControlFlow<()>> Output for F {
    fn write(&mut self, chunk: &str) -> ControlFlow<()> {
        self(chunk)
    }
}

impl Output for String {
    fn write(&mut self, chunk: &str) -> ControlFlow<()> {
        self.push_str(chunk);
        ControlFlow::Continue(())
    }
}

/// Output collected as a list of chunks.
#[derive(Debug, Default)]
pub struct Chunks(pub Vec<Value>);

impl Output for Chunks {
    fn write(&mut self, chunk: &str) -> ControlFlow<()> {
        self.0.push(Value::str(chunk));
        ControlFlow::Continue(())
    }
}

/// Arguments of a call.
#[derive(Debug, Clone, Default)]
pub struct Args {
    pub positional: Vec<Value>,
    pub keywords: Vec<(SmolStr, Value)>,
}

impl Args {
    pub fn new(positional: Vec<Value>) -> Self {
        Self {
            positional,
            keywords: Vec::new(),
        }
    }

    /// Argument by position or keyword.
    pub fn get(&self, index: usize, name: &str) -> Option<&Value> {
        self.positional.get(index).or_else(|| self.keyword(name))
    }

    pub fn keyword(&self, name: &str) -> Option<&Value> {
        self.keywords
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Required argument.
    pub fn require(&self, index: usize, name: &str, function: &str) -> RuntimeResult<&Value> {
        self.get(index, name).ok_or_else(|| {
            RuntimeError::type_error(format!(
                "{}() missing required argument: '{}'",
                function, name
            ))
        })
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A function that writes its result to an [`Output`].
///
/// Generated functions are callables. When one is called inside an
/// expression, its output is collected into a list of strings.
pub trait Callable: fmt::Debug {
    fn name(&self) -> &str;

    fn call(&self, args: Args, out: &mut dyn Output) -> RuntimeResult<ControlFlow<()>>;
}

/// A host object reachable from generated code.
pub trait Object: fmt::Debug {
    fn type_name(&self) -> &str;

    /// Attribute read (`obj.name`).
    fn get_attr(&self, _name: &str) -> Option<Value> {
        None
    }

    /// Item read (`obj[key]`); string keys fall back to attributes.
    fn get_item(&self, key: &Value) -> Option<Value> {
        key.as_str().and_then(|name| self.get_attr(name))
    }

    /// Method call (`obj.name(...)`).
    fn call_method(&self, name: &str, _args: Args) -> RuntimeResult<Value> {
        Err(RuntimeError::attribute(self.type_name(), name))
    }

    fn to_text(&self) -> String {
        format!("<{}>", self.type_name())
    }

    fn truthy(&self) -> bool {
        true
    }

    /// Items when the object is iterable.
    fn iter(&self) -> Option<Vec<Value>> {
        None
    }

    fn len(&self) -> Option<usize> {
        self.iter().map(|items| items.len())
    }
}
