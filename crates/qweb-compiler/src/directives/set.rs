//! The `t-set` directive.

use crate::classify::Work;
use crate::context::{CompileContext, Lines};
use crate::directives::compile_content;
use crate::error::{CompileError, CompileErrorCode, CompileResult};
use qweb_expr::string_literal;

/// Bind a name in `values` to an expression, a format string or the
/// rendered body of the element. The element itself writes nothing.
pub(crate) fn compile_set(
    ctx: &mut CompileContext<'_>,
    work: &mut Work<'_>,
    indent: u32,
) -> CompileResult<Lines> {
    let el = work.el;
    let name = work.take("t-set").unwrap_or_default();
    let name = name.trim();
    let target = format!("values[{}]", string_literal(name));
    let value = work.take("t-value");
    let valuef = work.take("t-valuef");
    if name == "0" && (value.is_some() || valuef.is_some()) {
        return Err(CompileError::new(
            "t-set=\"0\" can not be given a value: \"0\" holds the body passed to t-call",
            el.open_span,
            CompileErrorCode::ReservedName,
        ));
    }

    let mut out = Lines::new();
    if let Some(value) = value {
        let value = ctx.expr(&value)?;
        ctx.line(&mut out, indent, format!("{} = {}", target, value));
    } else if let Some(valuef) = valuef {
        let value = ctx.format(&valuef)?;
        ctx.line(&mut out, indent, format!("{} = {}", target, value));
    } else if el.has_content() {
        let def = ctx.unique_id("t_set");
        ctx.def(&mut out, indent, &def, |ctx, indent| compile_content(ctx, el, indent))?;
        ctx.line(
            &mut out,
            indent,
            format!("{} = Markup(''.join({}(self, values, log)))", target, def),
        );
    } else {
        ctx.line(&mut out, indent, format!("{} = ''", target));
    }
    Ok(out)
}
