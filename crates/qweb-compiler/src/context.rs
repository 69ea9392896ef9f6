//! Compilation context.

use crate::error::{CompileError, CompileResult};
use crate::hooks::Hooks;
use crate::options::CompileOptions;
use qweb_dom::{Document, NodeId, NsMap};
use qweb_expr::{compile_format, rewrite, string_literal};
use rustc_hash::FxHashSet;
use source_map::{CodeLine, Span};

/// Generated lines, with absolute indentation.
pub type Lines = Vec<CodeLine>;

/// State threaded through the compilation of one template.
pub struct CompileContext<'a> {
    /// Collaborators, for compile-time attribute filtering.
    pub hooks: &'a dyn Hooks,
    /// The options the template is compiled with.
    pub options: &'a CompileOptions,
    /// The document being compiled.
    pub document: &'a Document,
    /// Canonical reference, for diagnostics and `t-call`.
    pub template: String,
    /// Namespaces in scope for the node being compiled.
    pub nsmap: NsMap,
    /// Last path written to `log` by the generated code.
    pub last_path: Option<String>,
    /// Path of the element being compiled.
    pub current_path: Option<String>,
    /// Nodes already compiled as the alternative of a `t-if`.
    pub claimed: FxHashSet<NodeId>,
    /// Set while compiling the alternative of a `t-if`.
    pub pending_else: bool,
    /// Template span the emitted lines come from.
    pub origin: Option<Span>,
    /// Counter for generating unique names.
    pub counter: u32,
    text: TextBuffer,
}

/// Literal output waiting to be written as a single `yield`.
#[derive(Debug, Default)]
struct TextBuffer {
    text: String,
    indent: u32,
    origin: Option<Span>,
}

impl<'a> CompileContext<'a> {
    /// Create a new compilation context.
    pub fn new(
        hooks: &'a dyn Hooks,
        options: &'a CompileOptions,
        document: &'a Document,
        template: impl Into<String>,
    ) -> Self {
        Self {
            hooks,
            options,
            document,
            template: template.into(),
            nsmap: options.nsmap.clone(),
            last_path: None,
            current_path: None,
            claimed: FxHashSet::default(),
            pending_else: false,
            origin: None,
            counter: 0,
            text: TextBuffer::default(),
        }
    }

    /// Next value of the name counter.
    pub fn next_id(&mut self) -> u32 {
        self.counter += 1;
        self.counter
    }

    /// Generate a unique identifier.
    pub fn unique_id(&mut self, prefix: &str) -> String {
        format!("{}_{}", prefix, self.next_id())
    }

    /// Queue literal output.
    pub fn text(&mut self, out: &mut Lines, indent: u32, text: &str) {
        if text.is_empty() {
            return;
        }
        if !self.text.text.is_empty() && self.text.indent != indent {
            self.flush(out);
        }
        if self.text.text.is_empty() {
            self.text.indent = indent;
            self.text.origin = self.origin;
        }
        self.text.text.push_str(text);
    }

    /// Write queued output at the indentation it was queued at.
    pub fn flush(&mut self, out: &mut Lines) {
        if self.text.text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.text.text);
        out.push(
            CodeLine::new(self.text.indent, format!("yield {}", string_literal(&text)))
                .with_origin(self.text.origin),
        );
    }

    /// Emit one line after any queued output.
    pub fn line(&mut self, out: &mut Lines, indent: u32, text: impl Into<String>) {
        self.flush(out);
        out.push(CodeLine::new(indent, text).with_origin(self.origin));
    }

    /// End a block opened at `marker`, keeping it syntactically valid.
    pub fn close_block(&mut self, out: &mut Lines, marker: usize, indent: u32, filler: &str) {
        self.flush(out);
        if out.len() == marker {
            out.push(CodeLine::new(indent, filler).with_origin(self.origin));
        }
    }

    /// Emit a nested function whose body is produced by `body`.
    ///
    /// Generated functions do not close over their caller, so every nested
    /// function takes `self`, `values` and `log` explicitly.
    pub fn def(
        &mut self,
        out: &mut Lines,
        indent: u32,
        name: &str,
        body: impl FnOnce(&mut Self, u32) -> CompileResult<Lines>,
    ) -> CompileResult<()> {
        self.line(out, indent, format!("def {}(self, values, log):", name));
        let marker = out.len();
        let lines = body(self, indent + 1)?;
        out.extend(lines);
        self.close_block(out, marker, indent + 1, "pass");
        Ok(())
    }

    /// Rewrite a template expression, failing on the current node.
    pub fn expr(&self, expression: &str) -> CompileResult<String> {
        let expression = expression.trim();
        let source = if expression.is_empty() { "None" } else { expression };
        rewrite(source, false).map_err(|err| {
            CompileError::invalid_expression(expression, &err, self.origin.unwrap_or_default())
        })
    }

    /// Compile an interpolated string.
    pub fn format(&self, template: &str) -> CompileResult<String> {
        compile_format(template).map_err(|err| {
            CompileError::invalid_expression(template, &err, self.origin.unwrap_or_default())
        })
    }

    /// Set the namespaces in scope, returning the previous ones.
    pub fn enter_namespaces(&mut self, declared: &NsMap) -> NsMap {
        let saved = self.nsmap.clone();
        for (prefix, uri) in declared {
            self.nsmap.insert(prefix.clone(), uri.clone());
        }
        saved
    }

    /// Restore namespaces saved by [`enter_namespaces`](Self::enter_namespaces).
    pub fn exit_namespaces(&mut self, saved: NsMap) {
        self.nsmap = saved;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::DefaultHooks;
    use pretty_assertions::assert_eq;
    use source_map::CodeBuilder;

    fn render(lines: &Lines) -> String {
        let mut builder = CodeBuilder::new();
        builder.extend(lines);
        builder.finish().0
    }

    #[test]
    fn test_text_is_batched_per_indent() {
        let document = qweb_dom::parse_document("<t/>").unwrap();
        let options = CompileOptions::new();
        let mut ctx = CompileContext::new(&DefaultHooks, &options, &document, "t");
        let mut out = Lines::new();
        ctx.text(&mut out, 1, "<div>");
        ctx.text(&mut out, 1, "hello");
        ctx.line(&mut out, 1, "if values.get('x'):");
        let marker = out.len();
        ctx.text(&mut out, 2, "<b>");
        ctx.close_block(&mut out, marker, 2, "pass");
        ctx.line(&mut out, 1, "else:");
        let marker = out.len();
        ctx.close_block(&mut out, marker, 2, "pass");
        ctx.text(&mut out, 1, "</div>");
        ctx.flush(&mut out);
        assert_eq!(
            render(&out),
            "    yield '<div>hello'\n    if values.get('x'):\n        yield '<b>'\n    else:\n        pass\n    yield '</div>'\n"
        );
    }

    #[test]
    fn test_unique_ids_and_defs() {
        let document = qweb_dom::parse_document("<t/>").unwrap();
        let options = CompileOptions::new();
        let mut ctx = CompileContext::new(&DefaultHooks, &options, &document, "t");
        let mut out = Lines::new();
        let name = ctx.unique_id("t_set");
        ctx.def(&mut out, 1, &name, |ctx, indent| {
            let mut body = Lines::new();
            ctx.text(&mut body, indent, "x");
            Ok(body)
        })
        .unwrap();
        assert_eq!(name, "t_set_1");
        assert_eq!(ctx.next_id(), 2);
        assert_eq!(ctx.unique_id("t_foreach"), "t_foreach_3");
        assert_eq!(
            render(&out),
            "    def t_set_1(self, values, log):\n        yield 'x'\n"
        );
    }

    #[test]
    fn test_expression_errors_point_at_origin() {
        let document = qweb_dom::parse_document("<t/>").unwrap();
        let options = CompileOptions::new();
        let mut ctx = CompileContext::new(&DefaultHooks, &options, &document, "t");
        ctx.origin = Some(Span::new(3, 8));
        let err = ctx.expr("a +").unwrap_err();
        assert_eq!(err.span, Span::new(3, 8));
        assert_eq!(ctx.expr("").unwrap(), "None");
    }
}
