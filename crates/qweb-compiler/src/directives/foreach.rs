//! The `t-foreach` directive.

use crate::classify::{compile_directives, Work};
use crate::context::{CompileContext, Lines};
use crate::error::{CompileError, CompileResult};
use qweb_expr::string_literal;

/// Loop over an iterable, a mapping or an integer count.
///
/// Besides the item, each iteration writes `<name>_value`, `_index`,
/// `_first`, `_odd`, `_even` and `_parity`, plus `_size` and `_last` when
/// the iterable is sized. The variables are written into `values` directly
/// and stay visible after the loop.
pub(crate) fn compile_foreach(
    ctx: &mut CompileContext<'_>,
    work: &mut Work<'_>,
    indent: u32,
) -> CompileResult<Lines> {
    let iterable = work.take("t-foreach").unwrap_or_default();
    let Some(name) = work.take("t-as") else {
        return Err(CompileError::missing_attribute(
            "t-foreach",
            "t-as",
            work.el.open_span,
        ));
    };
    let name = name.trim().replace('.', "_");
    let key = |suffix: &str| format!("values[{}]", string_literal(&format!("{}{}", name, suffix)));

    let id = ctx.next_id();
    let items = format!("t_foreach_{}", id);
    let size = format!("t_size_{}", id);
    let has_value = format!("t_has_value_{}", id);
    let index = format!("t_index_{}", id);
    let item = format!("t_item_{}", id);

    let mut out = Lines::new();
    let iterable = ctx.expr(&iterable)?;
    let inner = indent + 1;
    let lines = [
        (indent, format!("{} = {}", items, iterable)),
        (indent, format!("if is_integer({}):", items)),
        (inner, format!("{} = range({})", items, items)),
        (indent, format!("{} = len({}) if is_sized({}) else None", size, items, items)),
        (indent, format!("{} = is_mapping({})", has_value, items)),
        (indent, format!("if {}:", has_value)),
        (inner, format!("{} = {}.items()", items, items)),
        (indent, format!("{} = -1", index)),
        (indent, format!("for {} in {} or ():", item, items)),
        (inner, format!("{} = {} + 1", index, index)),
        (inner, format!("{} = {}[0] if {} else {}", key(""), item, has_value, item)),
        (inner, format!("{} = {}[1] if {} else {}", key("_value"), item, has_value, item)),
        (inner, format!("{} = {}", key("_index"), index)),
        (inner, format!("{} = {} == 0", key("_first"), index)),
        (inner, format!("if {} is not None:", size)),
        (inner + 1, format!("{} = {}", key("_size"), size)),
        (inner + 1, format!("{} = {} + 1 == {}", key("_last"), index, size)),
        (inner, format!("{} = {} % 2 == 1", key("_odd"), index)),
        (inner, format!("{} = {} % 2 == 0", key("_even"), index)),
        (inner, format!("{} = 'odd' if {} % 2 else 'even'", key("_parity"), index)),
    ];
    for (level, line) in lines {
        ctx.line(&mut out, level, line);
    }

    let marker = out.len();
    let body = compile_directives(ctx, work, inner)?;
    out.extend(body);
    ctx.close_block(&mut out, marker, inner, "continue");
    Ok(out)
}
