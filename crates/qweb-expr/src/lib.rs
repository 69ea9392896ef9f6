//! Expressions embedded in qweb templates.
//!
//! This crate tokenizes and parses the Python-like expression language used
//! in directive attributes, rewrites free names into lookups on the render
//! values, and compiles `#{...}` / `{{...}}` interpolated strings into
//! expressions.

pub mod ast;
pub mod error;
pub mod format;
pub mod literal;
pub mod parser;
pub mod rewrite;
pub mod token;

pub use ast::*;
pub use error::{ExprError, ExprErrorCode, ExprResult};
pub use format::{compile_format, has_interpolation};
pub use literal::{decode_string_literal, string_literal};
pub use parser::{parse_expression, Parser};
pub use rewrite::{rewrite, Rewriter, GLOBAL_NAMES};
pub use token::{tokenize, Token, TokenKind};
