//! Runtime for compiled templates.
//!
//! Compiled templates are emitted as source text in a small, indentation
//! based statement language whose expressions are template expressions.
//! This crate provides:
//!
//! - [`Value`]: the dynamic value model (dicts, lists, markup, host objects)
//! - [`Program`]: the parser for generated source
//! - [`Module`]: a parsed program bound to its globals, whose functions are
//!   [`Callable`]s writing to an [`Output`]
//!
//! # Example
//!
//! ```
//! use qweb_runtime::{Args, Callable, Dict, Globals, Module, Program, Value};
//!
//! let program = Program::parse("def main(values):\n    yield values['name']\n").unwrap();
//! let module = Module::new(program, Globals::new());
//! let values = Dict::new();
//! values.set("name", "world".into());
//! let mut out = String::new();
//! module.function("main").unwrap().call(Args::new(vec![Value::Dict(values)]), &mut out).unwrap();
//! assert_eq!(out, "world");
//! ```

pub mod builtins;
pub mod error;
pub mod interp;
pub mod object;
pub mod ops;
pub mod program;
pub mod value;

pub use builtins::Builtin;
pub use error::{ErrorKind, Frame, RuntimeError, RuntimeResult};
pub use interp::{call_value, Function, Globals, Module};
pub use object::{Args, Callable, Chunks, Object, Output};
pub use program::{Program, ProgramError};
pub use value::{escape, html_escape, Dict, List, Range, Value};
