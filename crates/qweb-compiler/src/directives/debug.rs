//! The `t-debug` directive.

use crate::classify::{compile_directives, Work};
use crate::context::{CompileContext, Lines};
use crate::error::CompileResult;
use qweb_expr::string_literal;

/// Break into a debugger before the rest of the element, in dev mode only.
pub(crate) fn compile_debug(
    ctx: &mut CompileContext<'_>,
    work: &mut Work<'_>,
    indent: u32,
) -> CompileResult<Lines> {
    let debugger = work.take("t-debug").unwrap_or_default();
    let mut out = Lines::new();
    if ctx.options.dev_mode {
        let name: String = debugger.chars().filter(char::is_ascii_alphabetic).collect();
        ctx.line(&mut out, indent, format!("self._debug({})", string_literal(&name)));
    } else {
        tracing::warn!(
            template = %ctx.template,
            path = %work.el.path,
            "t-debug is ignored outside of dev mode"
        );
    }
    out.extend(compile_directives(ctx, work, indent)?);
    Ok(out)
}
