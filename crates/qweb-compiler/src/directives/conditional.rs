//! `t-if`, `t-elif` and `t-else`.
//!
//! The alternative of a `t-if` is the next sibling element, as long as only
//! comments and whitespace separate them. It is compiled in the `else:`
//! branch and marked as claimed so the parent does not compile it again.

use crate::classify::{compile_directives, compile_element, Work};
use crate::context::{CompileContext, Lines};
use crate::error::{CompileError, CompileResult};
use qweb_dom::{Element, Node};

pub(crate) fn compile_if(
    ctx: &mut CompileContext<'_>,
    work: &mut Work<'_>,
    indent: u32,
) -> CompileResult<Lines> {
    let test = work.take("t-if").unwrap_or_default();
    compile_branch(ctx, work, &test, indent)
}

pub(crate) fn compile_elif(
    ctx: &mut CompileContext<'_>,
    work: &mut Work<'_>,
    indent: u32,
) -> CompileResult<Lines> {
    let test = work.take("t-elif").unwrap_or_default();
    if !std::mem::take(&mut ctx.pending_else) {
        return Err(CompileError::misplaced(
            "t-elif directive must be preceded by t-if directive",
            work.el.open_span,
        ));
    }
    compile_branch(ctx, work, &test, indent)
}

pub(crate) fn compile_else(
    ctx: &mut CompileContext<'_>,
    work: &mut Work<'_>,
    indent: u32,
) -> CompileResult<Lines> {
    work.take("t-else");
    if !std::mem::take(&mut ctx.pending_else) {
        return Err(CompileError::misplaced(
            "t-else directive must be preceded by t-if directive",
            work.el.open_span,
        ));
    }
    compile_directives(ctx, work, indent)
}

fn compile_branch(
    ctx: &mut CompileContext<'_>,
    work: &mut Work<'_>,
    test: &str,
    indent: u32,
) -> CompileResult<Lines> {
    let alternative = find_alternative(ctx, work)?;
    let mut out = Lines::new();
    let test = ctx.expr(test)?;
    ctx.line(&mut out, indent, format!("if {}:", test));
    let marker = out.len();
    let body = compile_directives(ctx, work, indent + 1)?;
    out.extend(body);
    ctx.close_block(&mut out, marker, indent + 1, "pass");

    if let Some((index, el)) = alternative {
        ctx.line(&mut out, indent, "else:");
        let marker = out.len();
        ctx.pending_else = true;
        let body = compile_element(ctx, el, work.siblings, index, indent + 1);
        ctx.pending_else = false;
        out.extend(body?);
        ctx.close_block(&mut out, marker, indent + 1, "pass");
    }
    Ok(out)
}

/// Find and claim the `t-elif`/`t-else` sibling following `work`.
fn find_alternative<'w>(
    ctx: &mut CompileContext<'_>,
    work: &Work<'w>,
) -> CompileResult<Option<(usize, &'w Element)>> {
    let mut between = Vec::new();
    let mut stray_text = false;
    for (index, node) in work.siblings.iter().enumerate().skip(work.index + 1) {
        match node {
            Node::Comment(comment) => between.push(comment.id),
            Node::Text(text) => {
                stray_text |= !text.is_whitespace();
                between.push(text.id);
            }
            Node::Element(next) => {
                if !(next.has_attr("t-elif") || next.has_attr("t-else")) {
                    return Ok(None);
                }
                if stray_text {
                    return Err(CompileError::misplaced(
                        "Unexpected non-whitespace characters between t-if and t-else directives",
                        next.open_span,
                    ));
                }
                ctx.claimed.extend(between);
                ctx.claimed.insert(next.id);
                return Ok(Some((index, next)));
            }
        }
    }
    Ok(None)
}
