//! XML template tree for the qweb compiler.
//!
//! Documents are parsed into an ordered tree of elements, text and comments.
//! Namespaced tag and attribute names are resolved to `{uri}local` form and
//! every element records the namespaces in scope, its stable path from the
//! root, and the span it was parsed from.

pub mod ast;
pub mod error;
pub mod parser;

pub use ast::*;
pub use error::{ParseError, ParseErrorCode, ParseResult};
pub use parser::{decode_entities, parse_document};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_lookup() {
        let doc = parse_document(
            r#"<templates><t t-name="a">A</t><t t-name="b">B</t></templates>"#,
        )
        .unwrap();
        assert_eq!(doc.template("b").map(|el| el.path.as_str()), Some("/templates/t[2]"));
        assert!(doc.template("c").is_none());

        let single = parse_document(r#"<t t-name="only"><p/></t>"#).unwrap();
        assert_eq!(single.template("only").map(|el| el.id), Some(single.root.id));
    }

    #[test]
    fn test_find_by_path() {
        let doc = parse_document("<a><b/><b><c/></b></a>").unwrap();
        let c = doc.find_by_path("/a/b[2]/c").unwrap();
        assert_eq!(c.tag, "c");
        assert!(doc.find_by_path("/a/d").is_none());
    }
}
