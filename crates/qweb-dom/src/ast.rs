//! Tree types for parsed template documents.

use indexmap::IndexMap;
use smol_str::SmolStr;
use source_map::Span;
use std::fmt::Write as _;

/// Namespace prefix (`None` for the default namespace) to namespace URI.
pub type NsMap = IndexMap<Option<SmolStr>, SmolStr>;

/// The namespace bound to the reserved `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Tags rendered without a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "menuitem",
    "meta", "param", "source", "track", "wbr",
];

/// Check if a local tag name is a void element.
pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Identity of a node within one parsed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub u32);

/// A parsed template document.
#[derive(Debug, Clone)]
pub struct Document {
    /// The document element, or a synthetic `t` grouping several top-level nodes.
    pub root: Element,
    /// The text the document was parsed from.
    pub source: String,
}

impl Document {
    /// Find the template named `name`.
    ///
    /// The root itself matches when it carries `t-name="name"`, otherwise the
    /// first root child that does.
    pub fn template(&self, name: &str) -> Option<&Element> {
        if self.root.get("t-name") == Some(name) {
            return Some(&self.root);
        }
        self.root.elements().find(|el| el.get("t-name") == Some(name))
    }

    /// Find the element with the given stable path.
    pub fn find_by_path(&self, path: &str) -> Option<&Element> {
        self.root.find_by_path(path)
    }
}

/// A node in the template tree.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Node {
    /// An element.
    Element(Element),
    /// Character data, kept exactly as written.
    Text(Text),
    /// A comment.
    Comment(Comment),
}

impl Node {
    /// Get the id of this node.
    pub fn id(&self) -> NodeId {
        match self {
            Self::Element(n) => n.id,
            Self::Text(n) => n.id,
            Self::Comment(n) => n.id,
        }
    }

    /// Get the span of this node.
    pub fn span(&self) -> Span {
        match self {
            Self::Element(n) => n.span,
            Self::Text(n) => n.span,
            Self::Comment(n) => n.span,
        }
    }

    /// The element, if this node is one.
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(el) => Some(el),
            _ => None,
        }
    }
}

/// An element node.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Element {
    /// Node identity.
    pub id: NodeId,
    /// Tag name, written `{uri}local` when the element is in a namespace.
    pub tag: SmolStr,
    /// Prefix the tag was written with.
    pub prefix: Option<SmolStr>,
    /// Attributes in document order; namespaced names use `{uri}local`.
    /// Values have entities decoded.
    pub attrs: IndexMap<SmolStr, String>,
    /// Namespaces in scope on this element, inherited ones included.
    pub nsmap: NsMap,
    /// Child nodes.
    pub children: Vec<Node>,
    /// Written as `<tag/>`.
    pub self_closing: bool,
    /// Stable path of this element from the document root.
    pub path: String,
    /// Source span.
    pub span: Span,
    /// Span of the opening tag.
    pub open_span: Span,
}

impl Element {
    /// Local part of the tag.
    pub fn local_name(&self) -> &str {
        split_clark(&self.tag).1
    }

    /// Namespace URI of the tag.
    pub fn namespace(&self) -> Option<&str> {
        split_clark(&self.tag).0
    }

    /// Tag as written in the source, `prefix:local` or `local`.
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local_name()),
            None => self.local_name().to_string(),
        }
    }

    /// Get an attribute value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Check for an attribute.
    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    /// Iterate over element children.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Check if the element has any child element or non-empty text.
    pub fn has_content(&self) -> bool {
        self.children.iter().any(|child| match child {
            Node::Element(_) => true,
            Node::Text(text) => !text.content.is_empty(),
            Node::Comment(_) => false,
        })
    }

    /// Find a descendant (or self) by stable path.
    pub fn find_by_path(&self, path: &str) -> Option<&Element> {
        if self.path == path {
            return Some(self);
        }
        if !path.starts_with(self.path.as_str()) {
            return None;
        }
        self.elements().find_map(|child| child.find_by_path(path))
    }

    /// Serialize this element and its subtree to XML.
    ///
    /// Namespaces in scope are declared on the outermost element written.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_xml(&mut out, &NsMap::new());
        out
    }

    fn write_xml(&self, out: &mut String, inherited: &NsMap) {
        let name = self.qualified_name();
        out.push('<');
        out.push_str(&name);
        for (prefix, uri) in &self.nsmap {
            if inherited.get(prefix) == Some(uri) {
                continue;
            }
            match prefix {
                Some(prefix) => {
                    let _ = write!(out, " xmlns:{}=\"{}\"", prefix, escape_attr(uri));
                }
                None => {
                    let _ = write!(out, " xmlns=\"{}\"", escape_attr(uri));
                }
            }
        }
        for (key, value) in &self.attrs {
            let key = qualify_name(key, &self.nsmap).unwrap_or_else(|| key.to_string());
            let _ = write!(out, " {}=\"{}\"", key, escape_attr(value));
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            match child {
                Node::Element(el) => el.write_xml(out, &self.nsmap),
                Node::Text(text) => out.push_str(&text.content),
                Node::Comment(comment) => {
                    let _ = write!(out, "<!--{}-->", comment.content);
                }
            }
        }
        let _ = write!(out, "</{}>", name);
    }
}

/// A run of character data.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Text {
    /// Node identity.
    pub id: NodeId,
    /// Raw text, entities untouched.
    pub content: String,
    /// Source span.
    pub span: Span,
}

impl Text {
    /// Check if the text holds only whitespace.
    pub fn is_whitespace(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// A comment node.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Comment {
    /// Node identity.
    pub id: NodeId,
    /// Comment body.
    pub content: String,
    /// Source span.
    pub span: Span,
}

/// Split `{uri}local` into its namespace and local parts.
pub fn split_clark(name: &str) -> (Option<&str>, &str) {
    if let Some(rest) = name.strip_prefix('{') {
        if let Some((uri, local)) = rest.split_once('}') {
            return (Some(uri), local);
        }
    }
    (None, name)
}

/// Render a `{uri}local` name as `prefix:local` using `nsmap`.
///
/// When several prefixes map to the same URI the one declared last wins.
/// Returns `None` for names outside any namespace.
pub fn qualify_name(name: &str, nsmap: &NsMap) -> Option<String> {
    let (uri, local) = split_clark(name);
    let uri = uri?;
    if uri == XML_NAMESPACE {
        return Some(format!("xml:{}", local));
    }
    let prefix = nsmap
        .iter()
        .rev()
        .find(|(_, bound)| bound.as_str() == uri)
        .map(|(prefix, _)| prefix.clone());
    Some(match prefix {
        Some(Some(prefix)) => format!("{}:{}", prefix, local),
        _ => local.to_string(),
    })
}

/// Escape an attribute value for XML output.
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_clark() {
        assert_eq!(split_clark("{urn:a}div"), (Some("urn:a"), "div"));
        assert_eq!(split_clark("div"), (None, "div"));
    }

    #[test]
    fn test_qualify_name_prefers_latest_prefix() {
        let mut nsmap = NsMap::new();
        nsmap.insert(Some("a".into()), "urn:x".into());
        nsmap.insert(Some("b".into()), "urn:x".into());
        assert_eq!(qualify_name("{urn:x}href", &nsmap).as_deref(), Some("b:href"));
        assert_eq!(qualify_name("href", &nsmap), None);
        assert_eq!(
            qualify_name(&format!("{{{}}}lang", XML_NAMESPACE), &nsmap).as_deref(),
            Some("xml:lang")
        );
    }

    #[test]
    fn test_void_elements() {
        assert!(is_void_element("br"));
        assert!(is_void_element("wbr"));
        assert!(!is_void_element("div"));
    }
}
