//! Immutable XML elements.
//!
//! An [`Element`] is a cheaply clonable handle to an immutable node:
//! name, text, attributes and children. All mutation goes through
//! [`Builder`](crate::builder::Builder), which produces a fresh element
//! and leaves every previously returned handle untouched.

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use crate::escape::escape_text;
use crate::pool;

/// Well-known attribute labels.
pub const ID: &str = "id";
pub const LANGUAGE: &str = "xml:lang";
pub const FROM: &str = "from";
pub const TO: &str = "to";
pub const TYPE: &str = "type";
pub const VERSION: &str = "version";
pub const NAMESPACE: &str = "xmlns";
pub const STREAM_NAMESPACE: &str = "xmlns:stream";

/// A label/value attribute pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub label: String,
    pub value: String,
}

impl Attribute {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Attribute {
            label: label.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Inner {
    pub(crate) name: String,
    pub(crate) text: String,
    pub(crate) attributes: Vec<Attribute>,
    pub(crate) children: Vec<Element>,
}

/// An immutable XML element node.
///
/// Clones share the underlying node, so passing elements around is a
/// reference-count bump, not a tree copy.
#[derive(Debug, Clone)]
pub struct Element(pub(crate) Arc<Inner>);

impl Element {
    pub(crate) fn new(inner: Inner) -> Self {
        Element(Arc::new(inner))
    }

    /// The element name, including any prefix.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// The element text, or an empty string when there is none.
    pub fn text(&self) -> &str {
        &self.0.text
    }

    /// Look up an attribute value by label.
    pub fn attribute(&self, label: &str) -> Option<&str> {
        self.0
            .attributes
            .iter()
            .find(|a| a.label == label)
            .map(|a| a.value.as_str())
    }

    pub fn attribute_count(&self) -> usize {
        self.0.attributes.len()
    }

    pub fn all_attributes(&self) -> &[Attribute] {
        &self.0.attributes
    }

    /// The first child with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.0.children.iter().find(|c| c.name() == name)
    }

    /// All children with the given name.
    pub fn children(&self, name: &str) -> Vec<Element> {
        self.0
            .children
            .iter()
            .filter(|c| c.name() == name)
            .cloned()
            .collect()
    }

    /// The first child with the given name and `xmlns` value.
    pub fn child_ns(&self, name: &str, ns: &str) -> Option<&Element> {
        self.0
            .children
            .iter()
            .find(|c| c.name() == name && c.attribute(NAMESPACE) == Some(ns))
    }

    /// All children with the given name and `xmlns` value.
    pub fn children_ns(&self, name: &str, ns: &str) -> Vec<Element> {
        self.0
            .children
            .iter()
            .filter(|c| c.name() == name && c.attribute(NAMESPACE) == Some(ns))
            .cloned()
            .collect()
    }

    pub fn children_count(&self) -> usize {
        self.0.children.len()
    }

    pub fn all_children(&self) -> &[Element] {
        &self.0.children
    }

    /// Serialize to XML.
    ///
    /// When `include_closing` is false the element is rendered as an
    /// unclosed open tag, which is how a `stream:stream` header goes on
    /// the wire.
    pub fn to_xml<W: Write>(&self, w: &mut W, include_closing: bool) -> io::Result<()> {
        w.write_all(b"<")?;
        w.write_all(self.0.name.as_bytes())?;
        for attr in &self.0.attributes {
            if attr.value.is_empty() {
                continue;
            }
            w.write_all(b" ")?;
            w.write_all(attr.label.as_bytes())?;
            w.write_all(b"='")?;
            escape_text(w, &attr.value)?;
            w.write_all(b"'")?;
        }
        if self.0.text.is_empty() && self.0.children.is_empty() {
            if include_closing {
                w.write_all(b"/>")?;
            } else {
                w.write_all(b">")?;
            }
            return Ok(());
        }
        w.write_all(b">")?;
        if !self.0.text.is_empty() {
            escape_text(w, &self.0.text)?;
        }
        for child in &self.0.children {
            child.to_xml(w, true)?;
        }
        if include_closing {
            w.write_all(b"</")?;
            w.write_all(self.0.name.as_bytes())?;
            w.write_all(b">")?;
        }
        Ok(())
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        self.0.name == other.0.name
            && self.0.text == other.0.text
            && self.0.attributes == other.0.attributes
            && self.0.children == other.0.children
    }
}

impl Eq for Element {}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Writes into a Vec<u8> cannot fail.
        let xml = pool::render(|buf| {
            let _ = self.to_xml(buf, true);
        });
        f.write_str(&xml)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::builder::Builder;

    #[test]
    fn reads_attributes_and_children() {
        let el = Builder::new("iq")
            .with_attribute(ID, "42")
            .with_attribute(TYPE, "get")
            .with_child(
                Builder::new("query")
                    .with_attribute(NAMESPACE, "jabber:iq:roster")
                    .build(),
            )
            .build();
        assert_eq!(el.attribute(ID), Some("42"));
        assert_eq!(el.attribute("missing"), None);
        assert_eq!(el.attribute_count(), 2);
        assert_eq!(el.children_count(), 1);
        assert!(el.child("query").is_some());
        assert!(el.child_ns("query", "jabber:iq:roster").is_some());
        assert!(el.child_ns("query", "jabber:iq:other").is_none());
    }

    #[test]
    fn display_serializes_and_escapes() {
        let el = Builder::new("message")
            .with_attribute("from", "a&b")
            .with_child(Builder::new("body").with_text("1 < 2").build())
            .build();
        assert_eq!(
            el.to_string(),
            "<message from='a&amp;b'><body>1 &lt; 2</body></message>"
        );
    }

    #[test]
    fn empty_attribute_values_are_omitted() {
        let el = Builder::new("presence").with_attribute(TYPE, "").build();
        assert_eq!(el.to_string(), "<presence/>");
    }

    #[test]
    fn open_tag_rendering() {
        let el = Builder::new("stream:stream")
            .with_attribute(NAMESPACE, "jabber:client")
            .build();
        let xml = pool::render(|buf| el.to_xml(buf, false).unwrap());
        assert_eq!(xml, "<stream:stream xmlns='jabber:client'>");
    }

    #[test]
    fn structural_equality_ignores_sharing() {
        let a = Builder::new("a").with_text("x").build();
        let b = Builder::new("a").with_text("x").build();
        let c = a.clone();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_ne!(a, Builder::new("a").with_text("y").build());
    }
}
