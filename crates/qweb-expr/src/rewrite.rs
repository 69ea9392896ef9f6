//! Free-variable rewriting.
//!
//! Template expressions are written against an implicit data context. Every
//! name that is not bound locally (by a `lambda` parameter or a comprehension
//! target) and is not a runtime global is rewritten into a lookup on the
//! `values` mapping. Binding is decided on the parsed expression; the rewritten
//! text is produced by splicing replacements into the original token stream,
//! so spacing between tokens is kept.

use crate::ast::*;
use crate::error::ExprResult;
use crate::literal::string_literal;
use crate::parser::Parser;
use crate::token::tokenize;
use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use source_map::Span;

/// Names resolved from the runtime globals instead of the values context.
pub const GLOBAL_NAMES: &[&str] = &[
    "len", "str", "int", "float", "bool", "list", "tuple", "dict", "range", "enumerate", "zip",
    "sorted", "reversed", "min", "max", "sum", "abs", "round", "any", "all", "repr", "Markup",
    "escape", "to_text", "is_sized", "is_mapping", "is_integer", "is_string",
];

/// Rewrite free names of `expression` into `values` lookups.
///
/// With `raise_on_missing`, or when a name is dereferenced right away
/// (`a.b`, `a[0]`, `a()`), the lookup is `values['a']` and fails on a missing
/// key; otherwise it is `values.get('a')`.
pub fn rewrite(expression: &str, raise_on_missing: bool) -> ExprResult<String> {
    Rewriter::new(raise_on_missing).rewrite(expression)
}

/// Expression rewriter.
#[derive(Debug, Clone)]
pub struct Rewriter {
    raise_on_missing: bool,
    globals: FxHashSet<SmolStr>,
}

/// A name occurrence to replace.
struct Replacement {
    span: Span,
    text: String,
}

impl Rewriter {
    /// Create a rewriter with the default global names.
    pub fn new(raise_on_missing: bool) -> Self {
        Self {
            raise_on_missing,
            globals: GLOBAL_NAMES.iter().map(|name| SmolStr::from(*name)).collect(),
        }
    }

    /// Rewrite one expression.
    pub fn rewrite(&self, expression: &str) -> ExprResult<String> {
        let tokens = tokenize(expression)?;
        let mut parser = Parser::new(expression, &tokens);
        let expr = parser.test_list()?;
        parser.expect_end()?;

        let mut scope = Scope::default();
        let mut replacements = Vec::new();
        self.visit(&expr, false, &mut scope, &mut replacements);
        replacements.sort_by_key(|r| r.span.start);

        let mut out = String::with_capacity(expression.len() + replacements.len() * 16);
        let mut pending = replacements.into_iter().peekable();
        let mut previous_end: Option<u32> = None;
        for token in &tokens {
            if let Some(end) = previous_end {
                let gap = &expression[end as usize..token.span.start as usize];
                if gap.contains(['\n', '\r']) {
                    out.push(' ');
                } else {
                    out.push_str(gap);
                }
            }
            match pending.next_if(|r| r.span == token.span) {
                Some(replacement) => out.push_str(&replacement.text),
                None => out.push_str(token.text(expression)),
            }
            previous_end = Some(token.span.end);
        }
        Ok(out)
    }

    fn lookup(&self, name: &Name, strict: bool) -> String {
        let key = string_literal(&name.id);
        if strict || self.raise_on_missing {
            format!("values[{}]", key)
        } else {
            format!("values.get({})", key)
        }
    }

    /// Collect replacements. `deref` is set when the expression is the object
    /// of an attribute access, subscript or call.
    fn visit(&self, expr: &Expr, deref: bool, scope: &mut Scope, out: &mut Vec<Replacement>) {
        match expr {
            Expr::Literal(_) => {}
            Expr::Name(name) => {
                if !scope.is_bound(&name.id) && !self.globals.contains(&name.id) {
                    out.push(Replacement {
                        span: name.span,
                        text: self.lookup(name, deref),
                    });
                }
            }
            Expr::List(items) | Expr::Tuple(items) => {
                for item in items {
                    self.visit(item, false, scope, out);
                }
            }
            Expr::Dict(items) => {
                for (key, value) in items {
                    self.visit(key, false, scope, out);
                    self.visit(value, false, scope, out);
                }
            }
            Expr::Attribute { value, .. } => self.visit(value, true, scope, out),
            Expr::Subscript { value, index } => {
                self.visit(value, true, scope, out);
                self.visit(index, false, scope, out);
            }
            Expr::Slice { lower, upper, step } => {
                for part in [lower, upper, step].into_iter().flatten() {
                    self.visit(part, false, scope, out);
                }
            }
            Expr::Call { func, args, kwargs } => {
                self.visit(func, true, scope, out);
                for arg in args {
                    self.visit(arg, false, scope, out);
                }
                for (_, value) in kwargs {
                    self.visit(value, false, scope, out);
                }
            }
            Expr::Unary { operand, .. } => self.visit(operand, false, scope, out),
            Expr::Binary { left, right, .. } | Expr::BoolOp { left, right, .. } => {
                self.visit(left, false, scope, out);
                self.visit(right, false, scope, out);
            }
            Expr::Compare { left, ops } => {
                self.visit(left, false, scope, out);
                for (_, right) in ops {
                    self.visit(right, false, scope, out);
                }
            }
            Expr::IfExp { test, body, orelse } => {
                self.visit(test, false, scope, out);
                self.visit(body, false, scope, out);
                self.visit(orelse, false, scope, out);
            }
            Expr::Lambda { params, body } => {
                for default in params.iter().filter_map(|p| p.default.as_ref()) {
                    self.visit(default, false, scope, out);
                }
                let marker = scope.enter();
                for param in params {
                    scope.bind(&param.name.id);
                }
                self.visit(body, false, scope, out);
                scope.exit(marker);
            }
            Expr::ListComp {
                element,
                generators,
            } => {
                let marker = scope.enter();
                self.visit_generators(generators, scope, out);
                self.visit(element, false, scope, out);
                scope.exit(marker);
            }
            Expr::DictComp {
                key,
                value,
                generators,
            } => {
                let marker = scope.enter();
                self.visit_generators(generators, scope, out);
                self.visit(key, false, scope, out);
                self.visit(value, false, scope, out);
                scope.exit(marker);
            }
        }
    }

    /// Each iterable sees the targets of the clauses before it only.
    fn visit_generators(
        &self,
        generators: &[Comprehension],
        scope: &mut Scope,
        out: &mut Vec<Replacement>,
    ) {
        for generator in generators {
            self.visit(&generator.iter, false, scope, out);
            for name in generator.target.names() {
                scope.bind(&name.id);
            }
            for condition in &generator.ifs {
                self.visit(condition, false, scope, out);
            }
        }
    }
}

/// Locally bound names, innermost last.
#[derive(Debug, Default)]
struct Scope {
    names: Vec<SmolStr>,
}

impl Scope {
    /// Enter a new scope, returning a marker.
    fn enter(&self) -> usize {
        self.names.len()
    }

    /// Exit a scope, removing names bound since the marker.
    fn exit(&mut self, marker: usize) {
        self.names.truncate(marker);
    }

    fn bind(&mut self, name: &SmolStr) {
        self.names.push(name.clone());
    }

    fn is_bound(&self, name: &str) -> bool {
        self.names.iter().any(|bound| bound == name)
    }
}
