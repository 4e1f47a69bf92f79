//! Element construction.
//!
//! [`Builder`] is the only way to make or derive an [`Element`]. It owns
//! its state and is consumed by every `with_`/`without_` call, so a chain
//! moves one builder along without cloning. Deriving from an existing
//! element copies the attribute vector but shares the children, which are
//! immutable handles anyway.

use std::io::Read;

use crate::binary::BinaryError;
use crate::element::{Attribute, Element, Inner};
use crate::error::BuildError;
use crate::stanza::{Iq, Message, Presence, Stanza};

/// A mutable recipe for an element.
#[derive(Debug, Default)]
pub struct Builder {
    name: String,
    text: String,
    attributes: Vec<Attribute>,
    children: Vec<Element>,
}

impl Builder {
    pub fn new(name: impl Into<String>) -> Self {
        Builder {
            name: name.into(),
            ..Builder::default()
        }
    }

    pub fn message() -> Self {
        Builder::new("message")
    }

    pub fn presence() -> Self {
        Builder::new("presence")
    }

    pub fn iq() -> Self {
        Builder::new("iq")
    }

    pub(crate) fn element_name(&self) -> &str {
        &self.name
    }

    /// Start from a copy of an existing element.
    pub fn from_element(element: &Element) -> Self {
        Builder {
            name: element.name().to_string(),
            text: element.text().to_string(),
            attributes: element.all_attributes().to_vec(),
            children: element.all_children().to_vec(),
        }
    }

    /// Start from a binary-serialized element.
    pub fn from_bytes<R: Read>(r: &mut R) -> Result<Self, BinaryError> {
        Ok(Builder::from_element(&Element::from_bytes(r)?))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set an attribute, replacing any previous value for the label.
    pub fn with_attribute(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        let label = label.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.label == label) {
            Some(attr) => attr.value = value,
            None => self.attributes.push(Attribute { label, value }),
        }
        self
    }

    pub fn with_attributes(mut self, attributes: impl IntoIterator<Item = Attribute>) -> Self {
        for attr in attributes {
            self = self.with_attribute(attr.label, attr.value);
        }
        self
    }

    pub fn without_attribute(mut self, label: &str) -> Self {
        self.attributes.retain(|a| a.label != label);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    /// Drop all children with the given name.
    pub fn without_children(mut self, name: &str) -> Self {
        self.children.retain(|c| c.name() != name);
        self
    }

    /// Drop children matching both the name and the `xmlns` value.
    /// Children that share only the name or only the namespace stay.
    pub fn without_children_ns(mut self, name: &str, ns: &str) -> Self {
        self.children
            .retain(|c| !(c.name() == name && c.attribute(crate::element::NAMESPACE) == Some(ns)));
        self
    }

    pub fn build(self) -> Element {
        Element::new(Inner {
            name: self.name,
            text: self.text,
            attributes: self.attributes,
            children: self.children,
        })
    }

    /// Build a stanza: requires valid `from` and `to` addresses and, for
    /// iq/message/presence names, the semantic rules of that stanza kind.
    pub fn build_stanza(self, validate_jids: bool) -> Result<Stanza, BuildError> {
        Stanza::from_element(self.build(), validate_jids)
    }

    pub fn build_iq(self, validate_jids: bool) -> Result<Iq, BuildError> {
        Iq::from_element(self.build(), validate_jids)
    }

    pub fn build_message(self, validate_jids: bool) -> Result<Message, BuildError> {
        Message::from_element(self.build(), validate_jids)
    }

    pub fn build_presence(self, validate_jids: bool) -> Result<Presence, BuildError> {
        Presence::from_element(self.build(), validate_jids)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::element::{NAMESPACE, TYPE};

    #[test]
    fn attribute_upsert_replaces_in_place() {
        let el = Builder::new("a")
            .with_attribute(TYPE, "get")
            .with_attribute("id", "1")
            .with_attribute(TYPE, "set")
            .build();
        assert_eq!(el.attribute_count(), 2);
        assert_eq!(el.attribute(TYPE), Some("set"));
    }

    #[test]
    fn derived_builder_leaves_original_untouched() {
        let original = Builder::new("a").with_attribute("id", "1").build();
        let derived = Builder::from_element(&original)
            .with_attribute("id", "2")
            .with_child(Builder::new("x").build())
            .build();
        assert_eq!(original.attribute("id"), Some("1"));
        assert_eq!(original.children_count(), 0);
        assert_eq!(derived.attribute("id"), Some("2"));
        assert_eq!(derived.children_count(), 1);
    }

    #[test]
    fn without_children_filters_by_name() {
        let el = Builder::new("a")
            .with_child(Builder::new("x").build())
            .with_child(Builder::new("y").build())
            .with_child(Builder::new("x").build())
            .without_children("x")
            .build();
        assert_eq!(el.children_count(), 1);
        assert_eq!(el.all_children()[0].name(), "y");
    }

    #[test]
    fn without_children_ns_requires_both_to_match() {
        let el = Builder::new("a")
            .with_child(Builder::new("x").with_attribute(NAMESPACE, "ns1").build())
            .with_child(Builder::new("x").with_attribute(NAMESPACE, "ns2").build())
            .with_child(Builder::new("y").with_attribute(NAMESPACE, "ns1").build())
            .without_children_ns("x", "ns1")
            .build();
        assert_eq!(el.children_count(), 2);
        assert!(el.child_ns("x", "ns2").is_some());
        assert!(el.child_ns("y", "ns1").is_some());
    }

    #[test]
    fn round_trips_through_bytes() {
        let el = Builder::new("iq")
            .with_attribute("id", "1")
            .with_child(Builder::new("ping").build())
            .build();
        let mut buf = Vec::new();
        el.to_bytes(&mut buf).unwrap();
        let rebuilt = Builder::from_bytes(&mut buf.as_slice()).unwrap().build();
        assert_eq!(el, rebuilt);
    }
}
