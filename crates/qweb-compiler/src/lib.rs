//! Qweb template compiler.
//!
//! Templates are XML documents whose `t-` attributes are directives. This
//! crate compiles a template into the source of one render function, parses
//! that source with [`qweb_runtime`] and caches the result:
//!
//! - [`QWeb`]: the driver, with the `compile`, `render` and `render_to`
//!   entry points
//! - [`Hooks`]: the collaborators the driver relies on, such as template
//!   lookup and field rendering
//! - [`CompileOptions`]: options the generated code depends on
//! - [`Error`]: failures wrapped with their template context

mod attrs;
mod classify;
mod context;
mod directives;
mod driver;
pub mod error;
pub mod hooks;
mod host;
pub mod options;

pub use classify::is_static;
pub use driver::{CompiledTemplate, QWeb};
pub use error::{
    CompileError, CompileErrorCode, CompileResult, ConfigError, Error, HookError, TemplateError,
    TemplateErrorKind,
};
pub use hooks::{
    normalize_attrs, Attrs, DefaultHooks, Env, Hooks, LoadedTemplate, TemplateRef,
    TemplateSource, WidgetOutput,
};
pub use options::CompileOptions;

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;
    use qweb_runtime::{Dict, Value};
    use std::ops::ControlFlow;
    use std::rc::Rc;

    /// Templates kept in memory, with a few test widgets.
    #[derive(Default)]
    struct MemoryHooks {
        templates: IndexMap<String, String>,
        rollback_on_att: bool,
    }

    impl MemoryHooks {
        fn with(templates: &[(&str, &str)]) -> Self {
            Self {
                templates: templates
                    .iter()
                    .map(|(name, xml)| (name.to_string(), xml.to_string()))
                    .collect(),
                ..Self::default()
            }
        }
    }

    impl Hooks for MemoryHooks {
        fn load(
            &self,
            reference: &TemplateRef,
            _options: &CompileOptions,
        ) -> Result<Option<LoadedTemplate>, HookError> {
            Ok(self.templates.get(&reference.to_string()).map(|xml| {
                LoadedTemplate::new(TemplateSource::Xml(xml.clone()), reference.clone())
            }))
        }

        fn post_process_attrs(
            &self,
            _tag: &str,
            mut attrs: Attrs,
            _options: &CompileOptions,
        ) -> Result<Attrs, HookError> {
            attrs.shift_remove("secret");
            Ok(attrs)
        }

        fn get_widget(
            &self,
            env: &Env,
            value: &Value,
            _expression: &str,
            _tag: &str,
            field_options: &Dict,
            _options: &CompileOptions,
            _values: &Dict,
        ) -> Result<WidgetOutput, HookError> {
            let widget = field_options.get_str("widget").map(|w| w.py_str());
            let mut output = WidgetOutput {
                content: value.clone(),
                ..WidgetOutput::default()
            };
            match widget.as_deref() {
                Some("upper") => {
                    output.attrs.insert("data-widget".into(), Value::from("upper"));
                    if let Some(text) = value.as_str() {
                        output.content = Value::from(text.to_uppercase());
                    }
                    output.force_display = true;
                }
                Some("lang") => {
                    output.content = env.lang.as_deref().map(Value::from).unwrap_or_default();
                }
                _ => {}
            }
            Ok(output)
        }

        fn dynamic_attrs(
            &self,
            _tag: &str,
            value: &Value,
            _options: &CompileOptions,
        ) -> Result<Attrs, HookError> {
            if self.rollback_on_att {
                return Err(HookError::rollback("could not serialize access"));
            }
            normalize_attrs(value)
        }
    }

    fn values(pairs: &[(&str, Value)]) -> Dict {
        pairs
            .iter()
            .map(|(key, value)| (Value::from(*key), value.clone()))
            .collect()
    }

    fn render_inline(source: &str, pairs: &[(&str, Value)]) -> Result<String, Error> {
        let document = qweb_dom::parse_document(source).unwrap();
        QWeb::new(MemoryHooks::default()).render(document, &values(pairs), &CompileOptions::new())
    }

    fn render(source: &str, pairs: &[(&str, Value)]) -> String {
        render_inline(source, pairs).unwrap()
    }

    fn compile_error(source: &str) -> TemplateError {
        match render_inline(source, &[]) {
            Err(Error::Template(err)) => {
                assert_eq!(err.kind, TemplateErrorKind::Compile, "{}", err);
                err
            }
            other => panic!("expected a compile error, got {:?}", other),
        }
    }

    #[test]
    fn test_conditional_branches() {
        let source = r#"<p t-if="x">A</p><p t-else="">B</p>"#;
        assert_eq!(render(source, &[("x", Value::Bool(true))]), "<p>A</p>");
        assert_eq!(render(source, &[("x", Value::Bool(false))]), "<p>B</p>");

        let chain = r#"<t t-if="n == 1">one</t>
            <!-- between -->
            <t t-elif="n == 2">two</t>
            <t t-else="">many</t>"#;
        assert_eq!(render(chain, &[("n", Value::Int(1))]).trim(), "one");
        assert_eq!(render(chain, &[("n", Value::Int(2))]).trim(), "two");
        assert_eq!(render(chain, &[("n", Value::Int(5))]).trim(), "many");
    }

    #[test]
    fn test_none_output_renders_nothing() {
        assert_eq!(render(r#"<span t-esc="None"/>"#, &[]), "");
        assert_eq!(render(r#"<span t-out="False"/>"#, &[]), "");
        assert_eq!(render(r#"<span t-esc="missing"/>"#, &[("other", Value::Int(1))]), "");
    }

    #[test]
    fn test_loop_over_integer() {
        assert_eq!(render(r#"<t t-foreach="3" t-as="i"><t t-esc="i"/></t>"#, &[]), "012");
    }

    #[test]
    fn test_dynamic_attribute_on_self_closing_tag() {
        assert_eq!(render(r#"<div t-att-data-x="1+1"/>"#, &[]), r#"<div data-x="2"/>"#);
    }

    #[test]
    fn test_generated_code_is_deterministic() {
        let source = r#"<div t-foreach="items" t-as="item"><t t-set="x" t-value="item"/><p t-if="x" t-esc="x"/><t t-call="other"/></div>"#;
        let options = CompileOptions::new().dev_mode(true);
        let qweb = QWeb::new(MemoryHooks::default());
        let first = qweb.compile(qweb_dom::parse_document(source).unwrap(), &options).unwrap();
        let second = qweb.compile(qweb_dom::parse_document(source).unwrap(), &options).unwrap();
        assert!(!Rc::ptr_eq(&first, &second));
        assert_eq!(first.code(), second.code());
        assert_eq!(first.function_name(), "template__inline_");
        assert_eq!(first.source_map().len(), first.code().lines().count());
    }

    #[test]
    fn test_static_template_ignores_values() {
        let source = r#"<div class="a"><p>Hello</p><br/></div>"#;
        let empty = render(source, &[]);
        let other = render(source, &[("class", Value::from("b")), ("p", Value::Int(1))]);
        assert_eq!(empty, other);
        assert_eq!(empty, r#"<div class="a"><p>Hello</p><br/></div>"#);

        let qweb = QWeb::new(MemoryHooks::default());
        let compiled = qweb
            .compile(qweb_dom::parse_document(source).unwrap(), &CompileOptions::new())
            .unwrap();
        assert_eq!(
            compiled.code(),
            "def template__inline_(self, values, log):\n    yield '<div class=\"a\"><p>Hello</p><br/></div>'\n"
        );
    }

    #[test]
    fn test_static_attributes_round_trip() {
        let source = r#"<div b="2" a="x&amp;y" data-q="say &quot;hi&quot;">text &amp; more<img src="i.png"/></div>"#;
        assert_eq!(
            render(source, &[]),
            r#"<div b="2" a="x&amp;y" data-q="say &#34;hi&#34;">text &amp; more<img src="i.png"/></div>"#
        );
    }

    #[test]
    fn test_loop_companions() {
        let source = r#"<t t-foreach="['a', 'b', 'c']" t-as="x"><t t-esc="x_index"/><t t-if="x_first">F</t><t t-if="x_last">L</t><t t-esc="x_parity"/>|</t>"#;
        assert_eq!(render(source, &[]), "0Feven|1odd|2Leven|");
    }

    #[test]
    fn test_loop_over_mapping_keeps_variables() {
        let source = r#"<t><t t-foreach="{'a': 1, 'b': 2}" t-as="k"><t t-esc="k"/>=<t t-esc="k_value"/>;</t><t t-esc="k_size"/></t>"#;
        assert_eq!(render(source, &[]), "a=1;b=2;2");
    }

    #[test]
    fn test_loop_requires_as() {
        let err = compile_error(r#"<t t-foreach="items"/>"#);
        assert!(err.error.contains("t-as"), "{}", err.error);
    }

    #[test]
    fn test_escaping_rules() {
        let source = r#"<p><t t-esc="v"/><t t-raw="v"/><t t-out="m"/><t t-out="v"/></p>"#;
        let pairs = [("v", Value::from("<b>")), ("m", Value::markup("<i>"))];
        assert_eq!(render(source, &pairs), "<p>&lt;b&gt;<b><i>&lt;b&gt;</p>");
    }

    #[test]
    fn test_default_body() {
        let source = r#"<span t-esc="name">nobody</span>"#;
        assert_eq!(render(source, &[]), "<span>nobody</span>");
        assert_eq!(render(source, &[("name", Value::from("Ann"))]), "<span>Ann</span>");
        assert_eq!(render(r#"<span t-esc="''">x</span>"#, &[]), "<span></span>");
    }

    #[test]
    fn test_widget_options_and_force_display() {
        let source = r#"<span t-esc="name" t-options-widget="'upper'"/>"#;
        assert_eq!(
            render(source, &[("name", Value::from("bob"))]),
            r#"<span data-widget="upper">BOB</span>"#
        );
        assert_eq!(render(source, &[]), r#"<span data-widget="upper"></span>"#);
        let source = r#"<span t-esc="name" t-options="{'widget': 'upper'}"/>"#;
        assert_eq!(
            render(source, &[("name", Value::from("x"))]),
            r#"<span data-widget="upper">X</span>"#
        );
    }

    #[test]
    fn test_field_reads_record() {
        let record = values(&[("name", Value::from("Bob & co"))]);
        assert_eq!(
            render(r#"<span t-field="record.name"/>"#, &[("record", Value::Dict(record))]),
            "<span>Bob &amp; co</span>"
        );
    }

    #[test]
    fn test_field_placement_checks() {
        let err = compile_error(r#"<td t-field="record.name"/>"#);
        assert_eq!(err.error, "RTE widgets do not work correctly on \"td\" elements");
        let err = compile_error(r#"<t t-field="record.name"/>"#);
        assert!(err.error.starts_with("t-field can not be used on a t element"));
        let err = compile_error(r#"<span t-field="name"/>"#);
        assert!(err.error.contains("at least a dot"));
    }

    #[test]
    fn test_set_forms() {
        let source = r#"<t><t t-set="a" t-value="1 + 1"/><t t-set="b" t-valuef="n#{a}"/><t t-set="c"><i t-esc="b"/></t><t t-set="d"/><t t-esc="a"/>,<t t-esc="b"/>,<t t-out="c"/>,<t t-esc="d"/>.</t>"#;
        assert_eq!(render(source, &[]), "2,n2,<i>n2</i>,.");
    }

    #[test]
    fn test_set_zero_is_reserved() {
        let err = compile_error(r#"<t t-set="0" t-value="1"/>"#);
        assert!(err.error.contains("\"0\""), "{}", err.error);
    }

    #[test]
    fn test_dangling_alternatives() {
        let err = compile_error(r#"<div><p t-else="">B</p></div>"#);
        assert_eq!(err.error, "t-else directive must be preceded by t-if directive");
        assert_eq!(err.path.as_deref(), Some("/div/p"));
        assert_eq!(err.location, Some((1, 6)));

        let err = compile_error(r#"<div><p t-elif="x">B</p></div>"#);
        assert_eq!(err.error, "t-elif directive must be preceded by t-if directive");
    }

    #[test]
    fn test_text_between_if_and_else() {
        let err = compile_error(r#"<div><p t-if="x">A</p> oops <p t-else="">B</p></div>"#);
        assert_eq!(
            err.error,
            "Unexpected non-whitespace characters between t-if and t-else directives"
        );
    }

    #[test]
    fn test_unknown_directive() {
        let err = compile_error(r#"<p t-bogus="x"/>"#);
        assert_eq!(err.error, "Unknown directive on <p>: t-bogus");
        assert!(err.node.as_deref().is_some_and(|node| node.contains("t-bogus")));
    }

    #[test]
    fn test_invalid_expression() {
        let err = compile_error(r#"<p t-esc="a +"/>"#);
        assert!(err.error.starts_with("Invalid expression \"a +\""), "{}", err.error);
    }

    #[test]
    fn test_attribute_assembly() {
        let source = r#"<a class="btn" t-att="{'href': '/x'}" t-attf-title="n#{1+1}" t-att-hidden="False" t-att-data-e="''"/>"#;
        assert_eq!(
            render(source, &[]),
            r#"<a class="btn" href="/x" title="n2" data-e=""/>"#
        );
        let pairs = render(r#"<a t-att="[('a', 1), ('b', 2)]">x</a>"#, &[]);
        assert_eq!(pairs, r#"<a a="1" b="2">x</a>"#);
        let single = render(r#"<a t-att="('a', '<')"/>"#, &[]);
        assert_eq!(single, r#"<a a="&lt;"/>"#);
    }

    #[test]
    fn test_attribute_hook_runs_for_static_and_dynamic_tags() {
        assert_eq!(render(r#"<div secret="1" a="2"/>"#, &[]), r#"<div a="2"/>"#);
        assert_eq!(render(r#"<div secret="1" t-att-a="2"/>"#, &[]), r#"<div a="2"/>"#);
    }

    #[test]
    fn test_namespaces() {
        let source = r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink"><use xlink:href="#a"/><g t-att-class="c"/></svg>"##;
        assert_eq!(
            render(source, &[("c", Value::from("x"))]),
            r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink"><use xlink:href="#a"/><g class="x"/></svg>"##
        );
    }

    #[test]
    fn test_call_namespace_propagation() {
        let source = r#"<svg xmlns="http://www.w3.org/2000/svg"><t t-call="shape"/></svg>"#;
        let qweb = QWeb::new(MemoryHooks::default());
        let compiled = qweb
            .compile(qweb_dom::parse_document(source).unwrap(), &CompileOptions::new())
            .unwrap();
        assert!(compiled
            .code()
            .contains("['nsmap'] = {None: 'http://www.w3.org/2000/svg'}"));

        let compiled = qweb
            .compile(
                qweb_dom::parse_document(r#"<p><t t-call="shape"/></p>"#).unwrap(),
                &CompileOptions::new(),
            )
            .unwrap();
        assert!(!compiled.code().contains("nsmap"));
    }

    #[test]
    fn test_call_passes_body_and_isolates_values() {
        let qweb = QWeb::new(MemoryHooks::with(&[
            (
                "caller",
                r#"<div><t t-call="callee"><b t-esc="name"/></t><t t-esc="leak"/></div>"#,
            ),
            (
                "callee",
                r#"<t t-set="leak" t-value="'x'"/><section t-out="0"/><t t-esc="name"/>"#,
            ),
        ]));
        let values = values(&[("name", Value::from("Ann"))]);
        let html = qweb.render("caller", &values, &CompileOptions::new()).unwrap();
        assert_eq!(html, "<div><section><b>Ann</b></section>Ann</div>");
        assert_eq!(values.get_str("leak"), None);
        assert_eq!(values.get_str("0"), None);
    }

    #[test]
    fn test_call_with_interpolated_reference_and_lang() {
        let qweb = QWeb::new(MemoryHooks::with(&[
            (
                "caller",
                r#"<t t-call="callee_#{kind}" t-call-options="{'lang': 'fr_FR'}"/>"#,
            ),
            ("callee_a", r#"<span t-esc="1" t-options-widget="'lang'"/>"#),
        ]));
        let values = values(&[("kind", Value::from("a"))]);
        let html = qweb.render("caller", &values, &CompileOptions::new()).unwrap();
        assert_eq!(html, "<span>fr_FR</span>");
    }

    #[test]
    fn test_missing_template_is_load_error() {
        let qweb = QWeb::new(MemoryHooks::default());
        let err = qweb.render("nope", &Dict::new(), &CompileOptions::new()).unwrap_err();
        assert_eq!(err.kind(), Some(TemplateErrorKind::Load));

        let qweb = QWeb::new(MemoryHooks::with(&[("caller", r#"<t t-call="nope"/>"#)]));
        let err = qweb.render("caller", &Dict::new(), &CompileOptions::new()).unwrap_err();
        let err = err.as_template().unwrap();
        assert_eq!(err.kind, TemplateErrorKind::Load);
        assert_eq!(err.template.as_deref(), Some("nope"));
    }

    #[test]
    fn test_render_error_context() {
        let qweb = QWeb::new(MemoryHooks::with(&[(
            "broken",
            "<div>\n  <p t-esc=\"a['b']\"/>\n</div>",
        )]));
        let values = values(&[("a", Value::Dict(Dict::new()))]);
        let err = qweb.render("broken", &values, &CompileOptions::new()).unwrap_err();
        let err = err.as_template().unwrap();
        assert_eq!(err.kind, TemplateErrorKind::Render);
        assert!(err.error.starts_with("KeyError"), "{}", err.error);
        assert_eq!(err.template.as_deref(), Some("broken"));
        assert_eq!(err.path.as_deref(), Some("/div/p"));
        assert_eq!(err.node.as_deref(), Some(r#"<p t-esc="a['b']"/>"#));
        assert_eq!(err.location, Some((2, 3)));
        assert!(err.stack.is_some());
        assert!(err.code.is_none());

        let dev = CompileOptions::new().dev_mode(true);
        let err = qweb.render("broken", &values, &dev).unwrap_err();
        assert!(err.as_template().unwrap().code.is_some());
    }

    #[test]
    fn test_nested_errors_are_not_wrapped_twice() {
        let qweb = QWeb::new(MemoryHooks::with(&[
            ("outer", r#"<div><t t-call="inner"/></div>"#),
            ("inner", r#"<p t-esc="1 // 0"/>"#),
        ]));
        let err = qweb.render("outer", &Dict::new(), &CompileOptions::new()).unwrap_err();
        let err = err.as_template().unwrap();
        assert_eq!(err.template.as_deref(), Some("inner"));
        assert_eq!(err.path.as_deref(), Some("/p"));
        assert!(err.error.starts_with("ZeroDivisionError"));
    }

    #[test]
    fn test_rollback_passes_through() {
        let hooks = MemoryHooks {
            rollback_on_att: true,
            ..MemoryHooks::with(&[("t", r#"<p t-att="{'a': 1}"/>"#)])
        };
        let err = QWeb::new(hooks)
            .render("t", &Dict::new(), &CompileOptions::new())
            .unwrap_err();
        assert!(matches!(err, Error::Rollback(_)));
    }

    #[test]
    fn test_debug_directive() {
        let dev = CompileOptions::new().dev_mode(true);
        let qweb = QWeb::new(MemoryHooks::with(&[
            ("ok", r#"<p t-debug="pdb"/>"#),
            ("bad", r#"<p t-debug="gdb"/>"#),
        ]));
        assert_eq!(qweb.render("ok", &Dict::new(), &dev).unwrap(), "<p/>");
        let err = qweb.render("bad", &Dict::new(), &dev).unwrap_err();
        assert_eq!(err.kind(), Some(TemplateErrorKind::Config));
        assert_eq!(
            qweb.render("bad", &Dict::new(), &CompileOptions::new()).unwrap(),
            "<p/>"
        );
    }

    #[test]
    fn test_render_to_stops_early() {
        let qweb = QWeb::new(MemoryHooks::default());
        let document = qweb_dom::parse_document(r#"<t t-foreach="5" t-as="i"><t t-esc="i"/></t>"#).unwrap();
        let mut seen = Vec::new();
        let mut sink = |chunk: &str| {
            seen.push(chunk.to_string());
            if seen.len() == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        };
        let flow = qweb
            .render_to(document, &Dict::new(), &CompileOptions::new(), &mut sink)
            .unwrap();
        assert_eq!(flow, ControlFlow::Break(()));
        assert_eq!(seen, vec!["0".to_string(), "1".to_string()]);
    }

    #[test]
    fn test_foreach_over_huge_count_is_lazy() {
        let qweb = QWeb::new(MemoryHooks::default());
        let document = qweb_dom::parse_document(
            r#"<t t-foreach="9223372036854775807" t-as="i"><t t-esc="i"/>/<t t-esc="i_size"/>;</t>"#,
        )
        .unwrap();
        let mut seen = String::new();
        let mut sink = |chunk: &str| {
            seen.push_str(chunk);
            if seen.ends_with("1/9223372036854775807;") {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        };
        let flow = qweb
            .render_to(document, &Dict::new(), &CompileOptions::new(), &mut sink)
            .unwrap();
        assert_eq!(flow, ControlFlow::Break(()));
        assert_eq!(seen, "0/9223372036854775807;1/9223372036854775807;");
    }

    #[test]
    fn test_range_near_integer_limit() {
        assert_eq!(
            render(r#"<t t-esc="range(9223372036854775807)[-1]"/>"#, &[]),
            "9223372036854775806"
        );
        assert_eq!(
            render(
                r#"<t t-foreach="range(9223372036854775806, 9223372036854775807, 2)" t-as="n"><t t-esc="n"/>,<t t-esc="n_last"/></t>"#,
                &[]
            ),
            "9223372036854775806,True"
        );
    }

    #[test]
    fn test_compiled_templates_are_cached() {
        let qweb = QWeb::new(MemoryHooks::with(&[("t", "<p>x</p>")]));
        let options = CompileOptions::new();
        let first = qweb.compile("t", &options).unwrap();
        let second = qweb.compile("t", &options.clone().caller_template("other")).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        let french = qweb.compile("t", &options.clone().lang("fr_FR")).unwrap();
        assert!(!Rc::ptr_eq(&first, &french));
        let dev = qweb.compile("t", &options.clone().dev_mode(true)).unwrap();
        assert!(!Rc::ptr_eq(&first, &dev));
        qweb.clear_cache();
        assert!(!Rc::ptr_eq(&first, &qweb.compile("t", &options).unwrap()));
    }

    #[test]
    fn test_named_template_in_shared_document() {
        struct Bundle;
        impl Hooks for Bundle {
            fn load(
                &self,
                reference: &TemplateRef,
                _options: &CompileOptions,
            ) -> Result<Option<LoadedTemplate>, HookError> {
                let xml = r#"<templates><t t-name="a">A<t t-call="b"/></t><t t-name="b">B</t></templates>"#;
                Ok(Some(LoadedTemplate::new(
                    TemplateSource::Xml(xml.to_string()),
                    reference.clone(),
                )))
            }
        }
        let html = QWeb::new(Bundle)
            .render("a", &Dict::new(), &CompileOptions::new())
            .unwrap();
        assert_eq!(html, "AB");
    }

    #[test]
    fn test_path_loader() {
        struct Directory(std::path::PathBuf);
        impl Hooks for Directory {
            fn load(
                &self,
                reference: &TemplateRef,
                _options: &CompileOptions,
            ) -> Result<Option<LoadedTemplate>, HookError> {
                let path = self.0.join(format!("{}.xml", reference));
                Ok(path
                    .exists()
                    .then(|| LoadedTemplate::new(TemplateSource::Path(path), reference.clone())))
            }
        }
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("page.xml"), r#"<h1 t-esc="title"/>"#).unwrap();
        let qweb = QWeb::new(Directory(dir.path().to_path_buf()));
        let values = values(&[("title", Value::from("Home"))]);
        assert_eq!(qweb.render("page", &values, &CompileOptions::new()).unwrap(), "<h1>Home</h1>");
        assert!(qweb.render("other", &values, &CompileOptions::new()).is_err());
    }
}
