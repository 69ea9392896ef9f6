//! Node classification and directive dispatch.
//!
//! A node is static when it is not a `t` element and carries no `t-`
//! attribute; its markup is written at compile time. Every other node is
//! dynamic: its directives run in a fixed order, each one compiling the
//! directives left after it.

use crate::attrs::{compile_static, compile_tag_directive};
use crate::context::{CompileContext, Lines};
use crate::directives::{
    compile_call, compile_content_directive, compile_debug, compile_elif, compile_else,
    compile_esc, compile_field, compile_foreach, compile_if, compile_out, compile_raw,
    compile_set,
};
use crate::error::{CompileError, CompileResult};
use indexmap::IndexMap;
use qweb_dom::{Element, Node};
use qweb_expr::string_literal;
use smol_str::SmolStr;

/// Signature shared by directive compilers.
pub(crate) type DirectiveFn =
    for<'a, 'w> fn(&mut CompileContext<'a>, &mut Work<'w>, u32) -> CompileResult<Lines>;

/// Directives in the order they apply.
const DIRECTIVES: &[(&str, DirectiveFn)] = &[
    ("t-debug", compile_debug),
    ("t-foreach", compile_foreach),
    ("t-if", compile_if),
    ("t-elif", compile_elif),
    ("t-else", compile_else),
    ("t-field", compile_field),
    ("t-esc", compile_esc),
    ("t-out", compile_out),
    ("t-raw", compile_raw),
    ("t-tag", compile_tag_directive),
    ("t-call", compile_call),
    ("t-set", compile_set),
    ("t-content", compile_content_directive),
];

/// Attributes read by a directive rather than dispatched.
const COMPANIONS: &[&str] = &[
    "t-as",
    "t-value",
    "t-valuef",
    "t-options",
    "t-call-options",
    "t-att",
    "t-name",
];

const COMPANION_PREFIXES: &[&str] = &["t-att-", "t-attf-", "t-options-"];

/// Directives that write the element themselves.
const OUTPUT_DIRECTIVES: &[&str] = &["t-field", "t-esc", "t-out", "t-raw"];

/// An element whose directives are being compiled.
///
/// Directives consume their attributes from `attrs`, so each compiler only
/// sees what is left for it.
#[derive(Debug)]
pub struct Work<'w> {
    pub el: &'w Element,
    pub attrs: IndexMap<SmolStr, String>,
    /// Siblings of `el`, for `t-if` alternatives.
    pub siblings: &'w [Node],
    /// Position of `el` in `siblings`.
    pub index: usize,
}

impl<'w> Work<'w> {
    pub fn new(el: &'w Element, siblings: &'w [Node], index: usize) -> Self {
        Self {
            el,
            attrs: el.attrs.clone(),
            siblings,
            index,
        }
    }

    /// Remove and return an attribute.
    pub fn take(&mut self, name: &str) -> Option<String> {
        self.attrs.shift_remove(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }
}

/// Check if an element is a grouping `t` element.
pub(crate) fn is_grouping(el: &Element) -> bool {
    el.tag == "t"
}

/// Check if an element can be written at compile time.
pub fn is_static(el: &Element) -> bool {
    !is_grouping(el) && !el.attrs.keys().any(|name| name.starts_with("t-"))
}

fn is_known(name: &str) -> bool {
    DIRECTIVES.iter().any(|(directive, _)| *directive == name)
        || COMPANIONS.contains(&name)
        || COMPANION_PREFIXES
            .iter()
            .any(|prefix| name.starts_with(prefix))
}

/// Compile one child node, skipping nodes an earlier `t-if` took over.
pub(crate) fn compile_node(
    ctx: &mut CompileContext<'_>,
    siblings: &[Node],
    index: usize,
    indent: u32,
) -> CompileResult<Lines> {
    let mut out = Lines::new();
    match &siblings[index] {
        Node::Element(el) => {
            if !ctx.claimed.contains(&el.id) {
                out = compile_element(ctx, el, siblings, index, indent)?;
            }
        }
        Node::Text(text) => {
            if !ctx.claimed.contains(&text.id) {
                let saved = ctx.origin.replace(text.span);
                ctx.text(&mut out, indent, &text.content);
                ctx.origin = saved;
            }
        }
        Node::Comment(_) => {}
    }
    Ok(out)
}

/// Compile an element, static or dynamic.
///
/// On error the context keeps the path of the failing element.
pub(crate) fn compile_element(
    ctx: &mut CompileContext<'_>,
    el: &Element,
    siblings: &[Node],
    index: usize,
    indent: u32,
) -> CompileResult<Lines> {
    let saved_origin = ctx.origin.replace(el.open_span);
    let saved_path = ctx.current_path.replace(el.path.clone());

    let out = if is_static(el) {
        compile_static(ctx, el, indent)?
    } else {
        compile_dynamic(ctx, Work::new(el, siblings, index), indent)?
    };

    ctx.origin = saved_origin;
    ctx.current_path = saved_path;
    Ok(out)
}

fn compile_dynamic(
    ctx: &mut CompileContext<'_>,
    mut work: Work<'_>,
    indent: u32,
) -> CompileResult<Lines> {
    let el = work.el;
    if let Some(name) = work.attrs.keys().find(|name| name.starts_with("t-") && !is_known(name)) {
        return Err(CompileError::unknown_directive(
            &format!("<{}>", el.qualified_name()),
            name,
            el.open_span,
        ));
    }
    work.take("t-name");

    let mut out = Lines::new();
    if ctx.last_path.as_deref() != Some(el.path.as_str()) {
        ctx.line(
            &mut out,
            indent,
            format!("log['last_path_node'] = {}", string_literal(&el.path)),
        );
        ctx.last_path = Some(el.path.clone());
    }

    work.attrs
        .entry("t-tag".into())
        .or_insert_with(|| el.qualified_name());
    if !OUTPUT_DIRECTIVES.iter().any(|directive| work.has(directive)) {
        work.attrs.entry("t-content".into()).or_default();
    }

    out.extend(compile_directives(ctx, &mut work, indent)?);
    Ok(out)
}

/// Run the first remaining directive; it compiles the rest.
pub(crate) fn compile_directives(
    ctx: &mut CompileContext<'_>,
    work: &mut Work<'_>,
    indent: u32,
) -> CompileResult<Lines> {
    match DIRECTIVES.iter().find(|(name, _)| work.has(name)) {
        Some((_, compile)) => compile(ctx, work, indent),
        None => Ok(Lines::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qweb_dom::parse_document;

    fn root(source: &str) -> Element {
        parse_document(source).unwrap().root
    }

    #[test]
    fn test_static_classification() {
        assert!(is_static(&root(r#"<div class="a"><span/></div>"#)));
        assert!(!is_static(&root("<t>x</t>")));
        assert!(!is_static(&root(r#"<div t-att-class="a"/>"#)));
        assert!(!is_static(&root(r#"<p t-esc="x"/>"#)));
    }

    #[test]
    fn test_known_attributes() {
        for name in ["t-if", "t-as", "t-att-href", "t-attf-class", "t-options-widget", "t-name"] {
            assert!(is_known(name), "{}", name);
        }
        assert!(!is_known("t-bogus"));
        assert!(!is_known("t-attribute"));
    }

    #[test]
    fn test_work_consumes_attributes() {
        let el = root(r#"<p t-if="a" class="b"/>"#);
        let mut work = Work::new(&el, &[], 0);
        assert_eq!(work.take("t-if").as_deref(), Some("a"));
        assert!(!work.has("t-if"));
        assert!(work.has("class"));
        assert!(el.has_attr("t-if"));
    }
}
