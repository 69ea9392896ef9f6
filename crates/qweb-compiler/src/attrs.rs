//! Tag and attribute assembly.
//!
//! Static elements are written out at compile time, attributes included.
//! Dynamic tags build a `t_attrs` dict at render time: static attributes
//! first, then `t-att-*`, `t-attf-*` and `t-att` in document order. The dict
//! goes through the attribute hook before it is serialized.

use crate::classify::{compile_directives, is_grouping, Work};
use crate::context::{CompileContext, Lines};
use crate::directives::compile_content;
use crate::error::{CompileError, CompileErrorCode, CompileResult};
use crate::hooks::Attrs;
use qweb_dom::{is_void_element, qualify_name, Element, NsMap};
use qweb_expr::string_literal;
use qweb_runtime::{escape, html_escape, Value};
use smol_str::SmolStr;
use std::fmt::Write as _;

/// Namespace declarations of `el` not already in scope.
fn new_namespaces<'e>(scope: &NsMap, el: &'e Element) -> Vec<(String, &'e SmolStr)> {
    el.nsmap
        .iter()
        .filter(|(prefix, uri)| scope.get(*prefix) != Some(*uri))
        .map(|(prefix, uri)| {
            let name = match prefix {
                Some(prefix) => format!("xmlns:{}", prefix),
                None => "xmlns".to_string(),
            };
            (name, uri)
        })
        .collect()
}

fn attribute_name(name: &str, el: &Element) -> String {
    qualify_name(name, &el.nsmap).unwrap_or_else(|| name.to_string())
}

/// Serialize one attribute; falsy non-string values are dropped.
fn serialize_attr(name: &str, value: &Value) -> Option<String> {
    if !(value.truthy() || value.is_string()) {
        return None;
    }
    Some(format!(" {}=\"{}\"", name, escape(value).to_text()))
}

/// Write a static element and its content.
pub(crate) fn compile_static(
    ctx: &mut CompileContext<'_>,
    el: &Element,
    indent: u32,
) -> CompileResult<Lines> {
    let tag = el.qualified_name();
    let mut attrs = Attrs::new();
    for (name, uri) in new_namespaces(&ctx.nsmap, el) {
        attrs.insert(name.into(), Value::str(uri.as_str()));
    }
    for (name, value) in &el.attrs {
        attrs.insert(attribute_name(name, el).into(), Value::str(value.as_str()));
    }
    let attrs = ctx
        .hooks
        .post_process_attrs(&tag, attrs, ctx.options)
        .map_err(|err| CompileError::new(err.message, el.open_span, CompileErrorCode::Hook))?;

    let mut open = format!("<{}", tag);
    for (name, value) in &attrs {
        if let Some(attr) = serialize_attr(name, value) {
            open.push_str(&attr);
        }
    }

    let mut out = Lines::new();
    let closed = is_void_element(el.local_name()) || (el.self_closing && !el.has_content());
    open.push_str(if closed { "/>" } else { ">" });
    ctx.text(&mut out, indent, &open);

    let saved = ctx.enter_namespaces(&el.nsmap);
    let content = compile_content(ctx, el, indent);
    ctx.exit_namespaces(saved);
    out.extend(content?);

    if !closed {
        ctx.text(&mut out, indent, &format!("</{}>", tag));
    }
    Ok(out)
}

/// The `t-tag` directive: write the element around its remaining directives.
pub(crate) fn compile_tag_directive(
    ctx: &mut CompileContext<'_>,
    work: &mut Work<'_>,
    indent: u32,
) -> CompileResult<Lines> {
    work.take("t-tag");
    let self_close = !work.el.has_content() && !work.has("t-call");
    compile_tag(ctx, work, indent, false, self_close, compile_directives)
}

/// Write the element of `work` with `content` between its tags.
///
/// With `attrs_ready`, a `t_attrs` dict already exists in the generated code
/// and the element's attributes are merged into it. A `t` element writes
/// its content only.
pub(crate) fn compile_tag<'a, 'w>(
    ctx: &mut CompileContext<'a>,
    work: &mut Work<'w>,
    indent: u32,
    attrs_ready: bool,
    self_close: bool,
    content: impl FnOnce(&mut CompileContext<'a>, &mut Work<'w>, u32) -> CompileResult<Lines>,
) -> CompileResult<Lines> {
    let el = work.el;
    if is_grouping(el) {
        let saved = ctx.enter_namespaces(&el.nsmap);
        let body = content(ctx, work, indent);
        ctx.exit_namespaces(saved);
        return body;
    }

    let tag = el.qualified_name();
    let mut out = Lines::new();
    let mut open = format!("<{}", tag);
    for (name, uri) in new_namespaces(&ctx.nsmap, el) {
        let _ = write!(open, " {}=\"{}\"", name, html_escape(uri));
    }
    ctx.text(&mut out, indent, &open);
    compile_attributes(ctx, work, &tag, indent, attrs_ready, &mut out)?;

    let closed = is_void_element(el.local_name()) || (self_close && el.self_closing);
    ctx.text(&mut out, indent, if closed { "/>" } else { ">" });

    let saved = ctx.enter_namespaces(&el.nsmap);
    let body = content(ctx, work, indent);
    ctx.exit_namespaces(saved);
    out.extend(body?);

    if !closed {
        ctx.text(&mut out, indent, &format!("</{}>", tag));
    }
    Ok(out)
}

fn compile_attributes(
    ctx: &mut CompileContext<'_>,
    work: &Work<'_>,
    tag: &str,
    indent: u32,
    attrs_ready: bool,
    out: &mut Lines,
) -> CompileResult<()> {
    let el = work.el;
    let statics: Vec<(String, &String)> = work
        .attrs
        .iter()
        .filter(|(name, _)| !name.starts_with("t-"))
        .map(|(name, value)| (attribute_name(name, el), value))
        .collect();
    let dynamics: Vec<(&SmolStr, &String)> = work
        .attrs
        .iter()
        .filter(|(name, _)| *name == "t-att" || name.starts_with("t-att-") || name.starts_with("t-attf-"))
        .collect();
    if !attrs_ready && statics.is_empty() && dynamics.is_empty() {
        return Ok(());
    }

    if !attrs_ready {
        ctx.line(out, indent, "t_attrs = {}");
    }
    for (name, value) in statics {
        ctx.line(
            out,
            indent,
            format!("t_attrs[{}] = {}", string_literal(&name), string_literal(value)),
        );
    }
    for (name, value) in dynamics {
        let line = if let Some(attr) = name.strip_prefix("t-attf-") {
            format!("t_attrs[{}] = {}", string_literal(attr), ctx.format(value)?)
        } else if let Some(attr) = name.strip_prefix("t-att-") {
            format!("t_attrs[{}] = {}", string_literal(attr), ctx.expr(value)?)
        } else {
            format!(
                "t_attrs.update(self._get_dynamic_att({}, {}, options, values))",
                string_literal(tag),
                ctx.expr(value)?
            )
        };
        ctx.line(out, indent, line);
    }
    ctx.line(
        out,
        indent,
        format!(
            "t_attrs = self._post_processing_att({}, t_attrs, options)",
            string_literal(tag)
        ),
    );
    ctx.line(out, indent, "for t_name, t_value in t_attrs.items():");
    ctx.line(out, indent + 1, "if t_value or is_string(t_value):");
    ctx.line(
        out,
        indent + 2,
        "yield ' {}=\"{}\"'.format(t_name, escape(t_value))",
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_serialize_attr() {
        assert_eq!(serialize_attr("a", &Value::from("x\"y")).as_deref(), Some(" a=\"x&#34;y\""));
        assert_eq!(serialize_attr("a", &Value::from("")).as_deref(), Some(" a=\"\""));
        assert_eq!(serialize_attr("a", &Value::Int(0)), None);
        assert_eq!(serialize_attr("a", &Value::None), None);
        assert_eq!(serialize_attr("a", &Value::Int(3)).as_deref(), Some(" a=\"3\""));
    }

    #[test]
    fn test_new_namespaces() {
        let doc = qweb_dom::parse_document(
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xl="http://www.w3.org/1999/xlink"/>"#,
        )
        .unwrap();
        let mut scope = NsMap::new();
        scope.insert(None, "http://www.w3.org/2000/svg".into());
        let names: Vec<String> = new_namespaces(&scope, &doc.root)
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["xmlns:xl".to_string()]);
    }
}
