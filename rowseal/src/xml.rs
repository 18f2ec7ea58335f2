//! Minimal XML element tree used by the tabular codec and the wire format.
//!
//! Character data is kept exactly as written: no trimming, no whitespace
//! normalisation. Text split by child elements is concatenated into the
//! parent's `text`.

use std::borrow::Cow;

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::CodecError;

/// An XML element with attributes, character data and child elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Qualified name as written (`xsd:element`, `Row`).
    pub name: String,
    /// Attributes in document order, with qualified names.
    pub attributes: Vec<(String, String)>,
    /// Child elements in document order.
    pub children: Vec<Element>,
    /// Unescaped character data directly inside this element.
    pub text: String,
}

impl Element {
    /// Creates an empty element.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    /// Creates an element holding only `text`.
    #[must_use]
    pub fn leaf(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name).with_text(text)
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Sets the character data.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Appends a child element.
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Appends a child element in place.
    pub fn push(&mut self, child: Self) {
        self.children.push(child);
    }

    /// Name without namespace prefix.
    #[must_use]
    pub fn local_name(&self) -> &str {
        local(&self.name)
    }

    /// Returns `true` if the local name matches `name` (case-insensitive).
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.local_name().eq_ignore_ascii_case(name)
    }

    /// Attribute value by qualified or local name. Namespace declarations
    /// are never matched by local name.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .or_else(|| {
                self.attributes.iter().find(|(k, _)| {
                    !k.starts_with("xmlns") && local(k).eq_ignore_ascii_case(local(name))
                })
            })
            .map(|(_, v)| v.as_str())
    }

    /// First child with the given local name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|c| c.is(name))
    }

    /// All children with the given local name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        self.children.iter().filter(move |c| c.is(name))
    }

    /// Text of the first child with the given local name.
    #[must_use]
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.as_str())
    }

    /// Every element below this one, in document order.
    #[must_use]
    pub fn descendants(&self) -> Vec<&Self> {
        let mut out = Vec::new();
        let mut stack: Vec<&Self> = self.children.iter().rev().collect();
        while let Some(el) = stack.pop() {
            out.push(el);
            stack.extend(el.children.iter().rev());
        }
        out
    }

    /// Parses a document and returns its root element.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Xml`] if the input is not well-formed or has no
    /// root element.
    pub fn parse(input: &str) -> Result<Self, CodecError> {
        let mut reader = Reader::from_str(input);
        let mut stack: Vec<Self> = Vec::new();
        let mut root: Option<Self> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => stack.push(open(&start)?),
                Event::Empty(start) => {
                    let el = open(&start)?;
                    close(el, &mut stack, &mut root)?;
                }
                Event::End(_) => {
                    let el = stack
                        .pop()
                        .ok_or_else(|| CodecError::Xml("unbalanced end tag".to_string()))?;
                    close(el, &mut stack, &mut root)?;
                }
                Event::Text(text) => {
                    let text = text.unescape()?;
                    match stack.last_mut() {
                        Some(top) => top.text.push_str(&text),
                        None if text.trim().is_empty() => {}
                        None => {
                            return Err(CodecError::Xml("text outside the root element".into()))
                        }
                    }
                }
                Event::CData(data) => {
                    let bytes = data.into_inner();
                    let text = std::str::from_utf8(&bytes)
                        .map_err(|e| CodecError::Xml(format!("invalid UTF-8 in CDATA: {e}")))?;
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(text);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(CodecError::Xml(format!("unclosed element: {}", stack[0].name)));
        }
        root.ok_or_else(|| CodecError::Xml("document has no root element".to_string()))
    }

    /// Serialises the element without indentation.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_into(&mut out);
        out
    }

    fn write_into(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape(value.as_str()));
            out.push('"');
        }
        if self.children.is_empty() && self.text.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        out.push_str(&escape(self.text.as_str()));
        for child in &self.children {
            child.write_into(out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

fn local(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

fn open(start: &BytesStart<'_>) -> Result<Element, CodecError> {
    let name = utf8(start.name().as_ref())?.into_owned();
    let mut el = Element::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| CodecError::Xml(e.to_string()))?;
        let key = utf8(attr.key.as_ref())?.into_owned();
        let value = attr.unescape_value()?.into_owned();
        el.attributes.push((key, value));
    }
    Ok(el)
}

fn close(el: Element, stack: &mut [Element], root: &mut Option<Element>) -> Result<(), CodecError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(el);
    } else if root.is_none() {
        *root = Some(el);
    } else {
        return Err(CodecError::Xml("multiple root elements".to_string()));
    }
    Ok(())
}

fn utf8(bytes: &[u8]) -> Result<Cow<'_, str>, CodecError> {
    std::str::from_utf8(bytes)
        .map(Cow::Borrowed)
        .map_err(|e| CodecError::Xml(format!("invalid UTF-8 in name: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_is_not_trimmed() {
        let el = Element::parse("<v>  padded  </v>").unwrap();
        assert_eq!(el.text, "  padded  ");
    }

    #[test]
    fn test_escaping_round_trip() {
        let el = Element::new("v").with_attr("Name", "a\"<b>&").with_text("x < y & 'z'");
        let parsed = Element::parse(&el.to_xml()).unwrap();
        assert_eq!(parsed, el);
    }

    #[test]
    fn test_empty_and_self_closing_are_equivalent() {
        let a = Element::parse("<v></v>").unwrap();
        let b = Element::parse("<v/>").unwrap();
        assert_eq!(a, b);
        assert!(a.text.is_empty());
    }

    #[test]
    fn test_local_name_lookup() {
        let el = Element::parse(
            r#"<xsd:element xmlns:xsd="http://www.w3.org/2001/XMLSchema" name="age" type="sqltypes:int"/>"#,
        )
        .unwrap();
        assert_eq!(el.local_name(), "element");
        assert!(el.is("ELEMENT"));
        assert_eq!(el.attr("type"), Some("sqltypes:int"));
        assert_eq!(el.attr("xsd"), None);
    }

    #[test]
    fn test_descendants_in_document_order() {
        let el = Element::parse("<a><b><c/></b><d/></a>").unwrap();
        let names: Vec<_> = el.descendants().into_iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c", "d"]);
    }

    #[test]
    fn test_cdata_is_text() {
        let el = Element::parse("<v><![CDATA[<raw> & ]]></v>").unwrap();
        assert_eq!(el.text, "<raw> & ");
    }

    #[test]
    fn test_malformed_documents_rejected() {
        assert!(matches!(Element::parse("<a><b></a>"), Err(CodecError::Xml(_))));
        assert!(matches!(Element::parse("<a>"), Err(CodecError::Xml(_))));
        assert!(matches!(Element::parse(""), Err(CodecError::Xml(_))));
        assert!(matches!(Element::parse("<a/><b/>"), Err(CodecError::Xml(_))));
    }

    #[test]
    fn test_declaration_and_comments_skipped() {
        let el = Element::parse("<?xml version=\"1.0\"?><!-- c --><a>1</a>").unwrap();
        assert_eq!(el.text, "1");
    }
}
