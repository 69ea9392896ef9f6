//! Element content.

use crate::classify::{compile_node, Work};
use crate::context::{CompileContext, Lines};
use crate::error::CompileResult;
use qweb_dom::Element;

/// The `t-content` directive: the children of the element.
pub(crate) fn compile_content_directive(
    ctx: &mut CompileContext<'_>,
    work: &mut Work<'_>,
    indent: u32,
) -> CompileResult<Lines> {
    work.take("t-content");
    compile_content(ctx, work.el, indent)
}

/// Compile the children of `el` in order.
pub(crate) fn compile_content(
    ctx: &mut CompileContext<'_>,
    el: &Element,
    indent: u32,
) -> CompileResult<Lines> {
    let mut out = Lines::new();
    for index in 0..el.children.len() {
        out.extend(compile_node(ctx, &el.children, index, indent)?);
    }
    Ok(out)
}
