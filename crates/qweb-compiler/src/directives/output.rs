//! Output directives: `t-field`, `t-esc`, `t-out` and `t-raw`.
//!
//! Each one computes `t_attrs`, `content` and `force_display`, then writes
//! the element around the escaped content. When the content is `None` or
//! `False` the element's own body is the fallback; with no body either, the
//! element is written empty if the widget forces it.

use crate::attrs::compile_tag;
use crate::classify::{is_grouping, Work};
use crate::context::{CompileContext, Lines};
use crate::directives::compile_content;
use crate::error::{CompileError, CompileResult};
use qweb_expr::string_literal;

/// Tags an inline field editor cannot be attached to.
const FIELD_FORBIDDEN_TAGS: &[&str] = &[
    "table", "tbody", "thead", "tfoot", "tr", "td", "li", "ul", "ol", "dl", "dt", "dd",
];

pub(crate) fn compile_field(
    ctx: &mut CompileContext<'_>,
    work: &mut Work<'_>,
    indent: u32,
) -> CompileResult<Lines> {
    let el = work.el;
    let expression = work.take("t-field").unwrap_or_default();
    let expression = expression.trim();
    if FIELD_FORBIDDEN_TAGS.contains(&el.local_name()) {
        return Err(CompileError::misplaced(
            format!("RTE widgets do not work correctly on {:?} elements", el.local_name()),
            el.open_span,
        ));
    }
    if is_grouping(el) {
        return Err(CompileError::misplaced(
            "t-field can not be used on a t element, provide an actual HTML node",
            el.open_span,
        ));
    }
    let Some((record, field_name)) = expression.rsplit_once('.') else {
        return Err(CompileError::misplaced(
            "t-field must have at least a dot like 'record.field_name'",
            el.open_span,
        ));
    };

    let mut out = Lines::new();
    let field_options = widget_options(ctx, work, indent, &mut out)?;
    let record = ctx.expr(record)?;
    ctx.line(
        &mut out,
        indent,
        format!(
            "t_attrs, content, force_display = self._get_field({}, {}, {}, {}, {}, options, values)",
            record,
            string_literal(field_name),
            string_literal(expression),
            string_literal(&el.qualified_name()),
            field_options.as_deref().unwrap_or("{}"),
        ),
    );
    out.extend(compile_widget(ctx, work, indent)?);
    Ok(out)
}

pub(crate) fn compile_esc(
    ctx: &mut CompileContext<'_>,
    work: &mut Work<'_>,
    indent: u32,
) -> CompileResult<Lines> {
    compile_value(ctx, work, "t-esc", false, indent)
}

pub(crate) fn compile_out(
    ctx: &mut CompileContext<'_>,
    work: &mut Work<'_>,
    indent: u32,
) -> CompileResult<Lines> {
    compile_value(ctx, work, "t-out", false, indent)
}

/// Legacy unescaped output: strings are trusted as markup.
pub(crate) fn compile_raw(
    ctx: &mut CompileContext<'_>,
    work: &mut Work<'_>,
    indent: u32,
) -> CompileResult<Lines> {
    compile_value(ctx, work, "t-raw", true, indent)
}

fn compile_value(
    ctx: &mut CompileContext<'_>,
    work: &mut Work<'_>,
    directive: &str,
    raw: bool,
    indent: u32,
) -> CompileResult<Lines> {
    let expression = work.take(directive).unwrap_or_default();
    let expression = expression.trim();
    let mut out = Lines::new();
    let field_options = widget_options(ctx, work, indent, &mut out)?;
    // `0` is the body passed by the caller of a `t-call`.
    let value = if expression == "0" {
        "values.get('0', '')".to_string()
    } else {
        ctx.expr(expression)?
    };

    match field_options {
        Some(field_options) => {
            ctx.line(&mut out, indent, format!("content = {}", value));
            ctx.line(
                &mut out,
                indent,
                format!(
                    "t_attrs, content, force_display = self._get_widget(content, {}, {}, {}, options, values)",
                    string_literal(expression),
                    string_literal(&work.el.qualified_name()),
                    field_options,
                ),
            );
        }
        None => {
            ctx.line(&mut out, indent, "t_attrs = {}");
            ctx.line(&mut out, indent, format!("content = {}", value));
            ctx.line(&mut out, indent, "force_display = None");
        }
    }
    if raw {
        ctx.line(&mut out, indent, "if is_string(content):");
        ctx.line(&mut out, indent + 1, "content = Markup(content)");
    }
    out.extend(compile_widget(ctx, work, indent)?);
    Ok(out)
}

/// Compile `t-options` and `t-options-*` into an expression, if present.
fn widget_options(
    ctx: &mut CompileContext<'_>,
    work: &mut Work<'_>,
    indent: u32,
    out: &mut Lines,
) -> CompileResult<Option<String>> {
    let base = work.take("t-options");
    let keys = take_option_keys(work);
    if keys.is_empty() {
        return base.map(|base| ctx.expr(&base)).transpose();
    }

    let name = ctx.unique_id("t_options");
    let base = match base {
        Some(base) => ctx.expr(&base)?,
        None => String::new(),
    };
    ctx.line(out, indent, format!("{} = dict({})", name, base));
    for (key, expression) in keys {
        let value = ctx.expr(&expression)?;
        ctx.line(out, indent, format!("{}[{}] = {}", name, string_literal(&key), value));
    }
    Ok(Some(name))
}

/// Remove the `t-options-*` attributes, returning `(key, expression)` pairs.
pub(crate) fn take_option_keys(work: &mut Work<'_>) -> Vec<(String, String)> {
    let names: Vec<_> = work
        .attrs
        .keys()
        .filter(|name| name.starts_with("t-options-"))
        .cloned()
        .collect();
    names
        .into_iter()
        .filter_map(|name| {
            let key = name.strip_prefix("t-options-")?.to_string();
            let expression = work.take(&name)?;
            Some((key, expression))
        })
        .collect()
}

/// Write the element for `content`, falling back to the body.
fn compile_widget(
    ctx: &mut CompileContext<'_>,
    work: &mut Work<'_>,
    indent: u32,
) -> CompileResult<Lines> {
    work.take("t-tag");
    let el = work.el;
    let mut out = Lines::new();

    ctx.line(&mut out, indent, "if content is not None and content is not False:");
    let marker = out.len();
    let tag = compile_tag(ctx, work, indent + 1, true, false, |ctx, _, indent| {
        yield_line(ctx, indent, "yield escape(content)")
    })?;
    out.extend(tag);
    ctx.close_block(&mut out, marker, indent + 1, "pass");

    let (fallback, fallback_indent) = if el.has_content() {
        let id = ctx.next_id();
        let def = format!("t_default_{}", id);
        let text = format!("t_default_content_{}", id);
        ctx.line(&mut out, indent, "else:");
        let marker = out.len();
        ctx.def(&mut out, indent + 1, &def, |ctx, indent| compile_content(ctx, el, indent))?;
        ctx.line(
            &mut out,
            indent + 1,
            format!("{} = Markup(''.join({}(self, values, log)))", text, def),
        );
        ctx.line(&mut out, indent + 1, format!("if {}:", text));
        let inner = out.len();
        let tag = compile_tag(ctx, work, indent + 2, true, false, |ctx, _, indent| {
            yield_line(ctx, indent, &format!("yield {}", text))
        })?;
        out.extend(tag);
        ctx.close_block(&mut out, inner, indent + 2, "pass");
        (Some(marker), indent + 1)
    } else {
        (None, indent)
    };

    ctx.line(&mut out, fallback_indent, "elif force_display:");
    let marker = out.len();
    let tag = compile_tag(ctx, work, fallback_indent + 1, true, false, |_, _, _| Ok(Lines::new()))?;
    out.extend(tag);
    ctx.close_block(&mut out, marker, fallback_indent + 1, "pass");
    if let Some(marker) = fallback {
        ctx.close_block(&mut out, marker, indent + 1, "pass");
    }
    Ok(out)
}

fn yield_line(ctx: &mut CompileContext<'_>, indent: u32, line: &str) -> CompileResult<Lines> {
    let mut lines = Lines::new();
    ctx.line(&mut lines, indent, line);
    Ok(lines)
}
