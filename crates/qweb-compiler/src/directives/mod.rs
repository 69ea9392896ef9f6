//! Directive compilers.
//!
//! Each compiler consumes its own attributes from the [`Work`] item and is
//! responsible for compiling whatever directives remain after it.
//!
//! [`Work`]: crate::classify::Work

mod call;
mod conditional;
mod content;
mod debug;
mod foreach;
mod output;
mod set;

pub(crate) use call::compile_call;
pub(crate) use conditional::{compile_elif, compile_else, compile_if};
pub(crate) use content::{compile_content, compile_content_directive};
pub(crate) use debug::compile_debug;
pub(crate) use foreach::compile_foreach;
pub(crate) use output::{compile_esc, compile_field, compile_out, compile_raw};
pub(crate) use set::compile_set;
