//! The `t-call` directive.

use super::output::take_option_keys;
use crate::classify::Work;
use crate::context::{CompileContext, Lines};
use crate::directives::compile_content;
use crate::error::CompileResult;
use qweb_dom::NsMap;
use qweb_expr::string_literal;

/// Render another template with a copy of the current values.
///
/// The body of the calling element is rendered first, against the copy,
/// and handed to the callee as markup under the key `0`. Assignments made by
/// the callee never reach the caller's values.
pub(crate) fn compile_call(
    ctx: &mut CompileContext<'_>,
    work: &mut Work<'_>,
    indent: u32,
) -> CompileResult<Lines> {
    let el = work.el;
    let template = work.take("t-call").unwrap_or_default();
    let call_options = work.take("t-call-options");
    let widget_options = work.take("t-options");
    let option_keys = take_option_keys(work);

    let id = ctx.next_id();
    let values = format!("t_call_values_{}", id);
    let options = format!("t_call_options_{}", id);
    let this = format!("t_call_self_{}", id);

    let mut out = Lines::new();
    ctx.line(&mut out, indent, format!("{} = values.copy()", values));
    if el.has_content() {
        let def = format!("t_call_content_{}", id);
        ctx.def(&mut out, indent, &def, |ctx, indent| compile_content(ctx, el, indent))?;
        ctx.line(
            &mut out,
            indent,
            format!("{}['0'] = Markup(''.join({}(self, {}, log)))", values, def, values),
        );
    } else {
        ctx.line(&mut out, indent, format!("{}['0'] = Markup('')", values));
    }

    ctx.line(&mut out, indent, format!("{} = options.copy()", options));
    let overridden = call_options.is_some() || widget_options.is_some() || !option_keys.is_empty();
    for expression in call_options.iter().chain(widget_options.iter()) {
        let expression = ctx.expr(expression)?;
        ctx.line(&mut out, indent, format!("{}.update({})", options, expression));
    }
    for (key, expression) in option_keys {
        let expression = ctx.expr(&expression)?;
        ctx.line(
            &mut out,
            indent,
            format!("{}[{}] = {}", options, string_literal(&key), expression),
        );
    }
    if !ctx.nsmap.is_empty() {
        let nsmap = nsmap_literal(&ctx.nsmap);
        ctx.line(&mut out, indent, format!("{}['nsmap'] = {}", options, nsmap));
    }
    ctx.line(
        &mut out,
        indent,
        format!("{}['caller_template'] = {}", options, string_literal(&ctx.template)),
    );
    ctx.line(
        &mut out,
        indent,
        format!("{}['last_path_node'] = {}", options, string_literal(&el.path)),
    );

    ctx.line(&mut out, indent, format!("{} = self", this));
    if overridden {
        ctx.line(
            &mut out,
            indent,
            format!("if {}.get('lang') != options.get('lang'):", options),
        );
        ctx.line(
            &mut out,
            indent + 1,
            format!("{} = self.with_lang({}.get('lang'))", this, options),
        );
    }
    let template = ctx.format(&template)?;
    ctx.line(
        &mut out,
        indent,
        format!(
            "yield from {}._compile({}, {})({}, {}, log)",
            this, template, options, this, values
        ),
    );
    Ok(out)
}

fn nsmap_literal(nsmap: &NsMap) -> String {
    let entries: Vec<String> = nsmap
        .iter()
        .map(|(prefix, uri)| {
            let prefix = prefix
                .as_deref()
                .map(string_literal)
                .unwrap_or_else(|| "None".to_string());
            format!("{}: {}", prefix, string_literal(uri))
        })
        .collect();
    format!("{{{}}}", entries.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nsmap_literal() {
        let mut nsmap = NsMap::new();
        nsmap.insert(None, "urn:a".into());
        nsmap.insert(Some("x".into()), "urn:x".into());
        assert_eq!(nsmap_literal(&nsmap), "{None: 'urn:a', 'x': 'urn:x'}");
    }
}
