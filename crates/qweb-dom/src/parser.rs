//! Parser for XML template documents.

use crate::ast::*;
use crate::error::{ParseError, ParseErrorCode, ParseResult};
use indexmap::IndexMap;
use smol_str::SmolStr;
use source_map::Span;

/// Parse a template document.
///
/// Several top-level nodes are accepted; they are grouped under a synthetic
/// `t` element so the result always has a single root.
pub fn parse_document(source: &str) -> ParseResult<Document> {
    let mut parser = DocumentParser::new(source);
    let root = parser.parse()?;
    Ok(Document {
        root,
        source: source.to_string(),
    })
}

/// Parser for template documents.
struct DocumentParser<'a> {
    source: &'a str,
    pos: usize,
    next_id: u32,
}

/// An attribute as written, before namespace resolution.
struct RawAttribute {
    name: SmolStr,
    value: String,
    span: Span,
}

impl<'a> DocumentParser<'a> {
    /// Create a new parser.
    fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            next_id: 0,
        }
    }

    /// Parse the whole document.
    fn parse(&mut self) -> ParseResult<Element> {
        let mut nodes = self.parse_children(None, &NsMap::new())?;
        if !self.is_eof() {
            return Err(ParseError::unexpected_token(
                "end of document",
                "closing tag",
                self.span_from(self.pos),
            ));
        }

        let element_count = nodes.iter().filter(|n| matches!(n, Node::Element(_))).count();
        let has_text = nodes
            .iter()
            .any(|n| matches!(n, Node::Text(text) if !text.is_whitespace()));

        let mut root = if element_count == 1 && !has_text {
            match nodes.into_iter().find_map(|n| match n {
                Node::Element(el) => Some(el),
                _ => None,
            }) {
                Some(el) => el,
                None => return Err(self.empty_document()),
            }
        } else if element_count == 0 && !has_text {
            return Err(self.empty_document());
        } else {
            nodes.retain(|n| !matches!(n, Node::Comment(_)));
            Element {
                id: self.alloc_id(),
                tag: "t".into(),
                prefix: None,
                attrs: IndexMap::new(),
                nsmap: NsMap::new(),
                children: nodes,
                self_closing: false,
                path: String::new(),
                span: Span::new(0, self.source.len() as u32),
                open_span: Span::empty(0),
            }
        };

        root.path = format!("/{}", root.qualified_name());
        assign_paths(&mut root);
        Ok(root)
    }

    fn empty_document(&self) -> ParseError {
        ParseError::new(
            "Document contains no template",
            Span::new(0, self.source.len() as u32),
            ParseErrorCode::EmptyDocument,
        )
    }

    fn alloc_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Get remaining source.
    fn remaining(&self) -> &'a str {
        &self.source[self.pos..]
    }

    /// Check if at end.
    fn is_eof(&self) -> bool {
        self.pos >= self.source.len()
    }

    /// Peek at next char.
    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    /// Consume next char.
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Check if remaining starts with string.
    fn starts_with(&self, s: &str) -> bool {
        self.remaining().starts_with(s)
    }

    /// Consume string if it matches.
    fn consume(&mut self, s: &str) -> bool {
        if self.starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    /// Consume a string or fail.
    fn expect(&mut self, s: &str) -> ParseResult<()> {
        if self.consume(s) {
            return Ok(());
        }
        let found = self.peek().map(|c| c.to_string()).unwrap_or_else(|| "end of input".into());
        Err(ParseError::unexpected_token(
            &format!("'{}'", s),
            &found,
            self.span_from(self.pos),
        ))
    }

    /// Skip whitespace.
    fn skip_whitespace(&mut self) {
        self.read_while(char::is_whitespace);
    }

    /// Read until predicate is false.
    fn read_while<F: Fn(char) -> bool>(&mut self, pred: F) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if pred(c) {
                self.advance();
            } else {
                break;
            }
        }
        &self.source[start..self.pos]
    }

    /// Read until string is found.
    fn read_until(&mut self, s: &str) -> &'a str {
        let start = self.pos;
        while !self.is_eof() && !self.starts_with(s) {
            self.advance();
        }
        &self.source[start..self.pos]
    }

    /// Read an XML name.
    fn read_name(&mut self) -> &'a str {
        self.read_while(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(start as u32, self.pos.max(start) as u32)
    }

    /// Parse children until the closing tag of `parent` or EOF.
    fn parse_children(&mut self, parent: Option<(&str, Span)>, nsmap: &NsMap) -> ParseResult<Vec<Node>> {
        let mut children = Vec::new();

        loop {
            if self.is_eof() {
                if let Some((tag, span)) = parent {
                    return Err(ParseError::unclosed_element(tag, span));
                }
                break;
            }

            if self.starts_with("</") {
                break;
            }

            let start = self.pos;
            if self.consume("<!--") {
                let content = self.read_until("-->").to_string();
                self.expect("-->")?;
                children.push(Node::Comment(Comment {
                    id: self.alloc_id(),
                    content,
                    span: self.span_from(start),
                }));
            } else if self.starts_with("<![CDATA[") {
                self.read_until("]]>");
                self.expect("]]>")?;
                let content = self.source[start..self.pos].to_string();
                self.push_text(&mut children, content, start);
            } else if self.consume("<?") {
                self.read_until("?>");
                self.expect("?>")?;
            } else if self.consume("<!") {
                self.read_until(">");
                self.expect(">")?;
            } else if self.starts_with("<") {
                let element = self.parse_element(nsmap)?;
                children.push(Node::Element(element));
            } else {
                let content = self.read_until("<").to_string();
                self.push_text(&mut children, content, start);
            }
        }

        Ok(children)
    }

    /// Append text, merging with a preceding text node.
    fn push_text(&mut self, children: &mut Vec<Node>, content: String, start: usize) {
        let span = self.span_from(start);
        if let Some(Node::Text(last)) = children.last_mut() {
            last.content.push_str(&content);
            last.span = last.span.merge(span);
            return;
        }
        children.push(Node::Text(Text {
            id: self.alloc_id(),
            content,
            span,
        }));
    }

    /// Parse an element.
    fn parse_element(&mut self, inherited: &NsMap) -> ParseResult<Element> {
        let start = self.pos;
        let id = self.alloc_id();
        self.expect("<")?;

        let raw_tag = self.read_name();
        if raw_tag.is_empty() {
            return Err(ParseError::unexpected_token(
                "tag name",
                self.peek().map(String::from).as_deref().unwrap_or("end of input"),
                self.span_from(start),
            ));
        }

        let raw_attrs = self.parse_attributes()?;
        let self_closing = self.consume("/>");
        if !self_closing {
            self.expect(">")?;
        }
        let open_span = self.span_from(start);

        // Declarations on this element extend the inherited scope.
        let mut nsmap = inherited.clone();
        let mut plain = Vec::with_capacity(raw_attrs.len());
        for attr in raw_attrs {
            if attr.name == "xmlns" {
                nsmap.shift_remove(&None);
                nsmap.insert(None, attr.value.into());
            } else if let Some(prefix) = attr.name.strip_prefix("xmlns:") {
                let key = Some(SmolStr::from(prefix));
                nsmap.shift_remove(&key);
                nsmap.insert(key, attr.value.into());
            } else {
                plain.push(attr);
            }
        }

        let (prefix, local) = match raw_tag.split_once(':') {
            Some((prefix, local)) => (Some(SmolStr::from(prefix)), local),
            None => (None, raw_tag),
        };
        let tag: SmolStr = match nsmap.get(&prefix) {
            Some(uri) => format!("{{{}}}{}", uri, local).into(),
            None if prefix.is_some() => {
                return Err(ParseError::unbound_prefix(
                    prefix.as_deref().unwrap_or_default(),
                    open_span,
                ))
            }
            None => local.into(),
        };

        let mut attrs = IndexMap::with_capacity(plain.len());
        for attr in plain {
            let name = resolve_attribute_name(&attr.name, &nsmap);
            if attrs.contains_key(&name) {
                return Err(ParseError::new(
                    format!("Duplicate attribute: {}", attr.name),
                    attr.span,
                    ParseErrorCode::DuplicateAttribute,
                ));
            }
            attrs.insert(name, attr.value);
        }

        // Unclosed void tags are tolerated the way HTML authors write them.
        let implicit_void = !self_closing
            && is_void_element(local)
            && !self.remaining().starts_with(&format!("</{}", raw_tag));
        let children = if self_closing || implicit_void {
            Vec::new()
        } else {
            let children = self.parse_children(Some((raw_tag, open_span)), &nsmap)?;
            let close_start = self.pos;
            self.expect("</")?;
            let closing = self.read_name();
            if closing != raw_tag {
                return Err(ParseError::mismatched_tag(raw_tag, closing, self.span_from(close_start)));
            }
            self.skip_whitespace();
            self.expect(">")?;
            children
        };

        Ok(Element {
            id,
            tag,
            prefix,
            attrs,
            nsmap,
            children,
            self_closing,
            path: String::new(),
            span: self.span_from(start),
            open_span,
        })
    }

    /// Parse attributes up to the end of the opening tag.
    fn parse_attributes(&mut self) -> ParseResult<Vec<RawAttribute>> {
        let mut attrs = Vec::new();

        loop {
            self.skip_whitespace();
            if self.is_eof() || self.starts_with(">") || self.starts_with("/>") {
                break;
            }

            let attr_start = self.pos;
            let name = self.read_name();
            if name.is_empty() {
                let found = self.peek().map(String::from).unwrap_or_default();
                return Err(ParseError::unexpected_token(
                    "attribute name",
                    &found,
                    self.span_from(attr_start),
                ));
            }

            self.skip_whitespace();
            let value = if self.consume("=") {
                self.skip_whitespace();
                self.parse_attribute_value()?
            } else {
                String::new()
            };

            attrs.push(RawAttribute {
                name: name.into(),
                value,
                span: self.span_from(attr_start),
            });
        }

        Ok(attrs)
    }

    /// Parse a quoted attribute value, decoding entities.
    fn parse_attribute_value(&mut self) -> ParseResult<String> {
        let start = self.pos;
        let quote = match self.peek() {
            Some(q @ ('"' | '\'')) => q,
            _ => {
                return Err(ParseError::unexpected_token(
                    "quoted attribute value",
                    self.peek().map(String::from).as_deref().unwrap_or("end of input"),
                    self.span_from(start),
                ))
            }
        };
        self.advance();
        let raw = self.read_while(|c| c != quote);
        if self.advance().is_none() {
            return Err(ParseError::new(
                "Unterminated attribute value",
                self.span_from(start),
                ParseErrorCode::UnexpectedToken,
            ));
        }
        Ok(decode_entities(raw))
    }
}

/// Resolve a written attribute name to `{uri}local` form.
///
/// Unprefixed attributes never take the default namespace. A prefix with no
/// binding leaves the name as written.
fn resolve_attribute_name(name: &str, nsmap: &NsMap) -> SmolStr {
    let Some((prefix, local)) = name.split_once(':') else {
        return name.into();
    };
    if prefix == "xml" {
        return format!("{{{}}}{}", XML_NAMESPACE, local).into();
    }
    match nsmap.get(&Some(SmolStr::from(prefix))) {
        Some(uri) => format!("{{{}}}{}", uri, local).into(),
        None => name.into(),
    }
}

/// Compute the stable path of every descendant element.
///
/// A position index is added only when several siblings share a tag.
fn assign_paths(element: &mut Element) {
    let mut totals: IndexMap<String, usize> = IndexMap::new();
    for child in element.elements() {
        *totals.entry(child.qualified_name()).or_default() += 1;
    }
    let mut seen: IndexMap<String, usize> = IndexMap::new();
    let base = element.path.clone();
    for child in element.children.iter_mut() {
        if let Node::Element(child) = child {
            let name = child.qualified_name();
            let position = seen.entry(name.clone()).or_default();
            *position += 1;
            child.path = if totals.get(&name).copied().unwrap_or(0) > 1 {
                format!("{}/{}[{}]", base, name, position)
            } else {
                format!("{}/{}", base, name)
            };
            assign_paths(child);
        }
    }
}

/// Decode XML character and entity references.
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').and_then(|semi| {
            let entity = &rest[1..semi];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            c.map(|c| (c, semi))
        });
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn root(source: &str) -> Element {
        parse_document(source).unwrap().root
    }

    #[test]
    fn test_parse_single_root() {
        let el = root(r#"<div class="a" id="b"><span>hi</span></div>"#);
        assert_eq!(el.tag, "div");
        assert_eq!(el.path, "/div");
        assert_eq!(el.attrs.keys().collect::<Vec<_>>(), vec!["class", "id"]);
        let span = el.elements().next().unwrap();
        assert_eq!(span.path, "/div/span");
        assert!(matches!(&span.children[0], Node::Text(t) if t.content == "hi"));
    }

    #[test]
    fn test_parse_fragment_wraps_in_t() {
        let el = root(r#"<p t-if="x">A</p><p t-else="">B</p>"#);
        assert_eq!(el.tag, "t");
        assert_eq!(el.path, "/t");
        let paths: Vec<_> = el.elements().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["/t/p[1]", "/t/p[2]"]);
    }

    #[test]
    fn test_parse_self_closing_and_void() {
        let el = root(r#"<div><br><img src="a.png"/><span/></div>"#);
        let children: Vec<_> = el.elements().collect();
        assert_eq!(children.len(), 3);
        assert!(!children[0].self_closing);
        assert!(children[1].self_closing);
        assert!(children[2].self_closing);
    }

    #[test]
    fn test_attribute_entities_decoded_text_kept() {
        let el = root(r#"<a title="x &amp; y &#65;">1 &lt; 2</a>"#);
        assert_eq!(el.get("title"), Some("x & y A"));
        assert!(matches!(&el.children[0], Node::Text(t) if t.content == "1 &lt; 2"));
    }

    #[test]
    fn test_namespaces_resolved() {
        let el = root(
            r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink"><use xlink:href="#a"/></svg>"##,
        );
        assert_eq!(el.tag, "{http://www.w3.org/2000/svg}svg");
        assert_eq!(el.local_name(), "svg");
        assert_eq!(el.nsmap.len(), 2);
        assert!(el.attrs.is_empty());
        let child = el.elements().next().unwrap();
        assert_eq!(child.get("{http://www.w3.org/1999/xlink}href"), Some("#a"));
        assert_eq!(child.nsmap.len(), 2);
    }

    #[test]
    fn test_unbound_prefix() {
        let err = parse_document("<x:div/>").unwrap_err();
        assert_eq!(err.code, ParseErrorCode::UnboundPrefix);
    }

    #[test]
    fn test_mismatched_and_unclosed() {
        assert_eq!(
            parse_document("<div><span></div>").unwrap_err().code,
            ParseErrorCode::MismatchedTag
        );
        assert_eq!(
            parse_document("<div>").unwrap_err().code,
            ParseErrorCode::UnclosedElement
        );
        assert_eq!(
            parse_document("  ").unwrap_err().code,
            ParseErrorCode::EmptyDocument
        );
    }

    #[test]
    fn test_duplicate_attribute() {
        let err = parse_document(r#"<div a="1" a="2"/>"#).unwrap_err();
        assert_eq!(err.code, ParseErrorCode::DuplicateAttribute);
    }

    #[test]
    fn test_prolog_and_comments() {
        let el = root("<?xml version=\"1.0\"?>\n<!-- top --><templates><!-- c --><t t-name=\"a\"/></templates>");
        assert_eq!(el.tag, "templates");
        assert!(matches!(&el.children[0], Node::Comment(c) if c.content == " c "));
    }

    #[test]
    fn test_node_ids_are_preorder() {
        let el = root("<a><b/>x<c/></a>");
        assert_eq!(el.id, NodeId(0));
        let ids: Vec<_> = el.children.iter().map(Node::id).collect();
        assert_eq!(ids, vec![NodeId(1), NodeId(2), NodeId(3)]);
    }

    #[test]
    fn test_to_xml_round_trip() {
        let source = r#"<div xmlns:x="urn:x" class="a &amp; b"><x:item x:k="v">t</x:item><br/></div>"#;
        let el = root(source);
        assert_eq!(el.to_xml(), source);
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &lt;b&gt; &#x41;&unknown; &"), "a <b> A&unknown; &");
    }
}
