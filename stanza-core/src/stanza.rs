//! Typed XMPP stanzas on top of [`Element`].
//!
//! A [`Stanza`] pairs an element with its parsed `from`/`to` addresses;
//! [`Iq`], [`Message`] and [`Presence`] add the semantic checks of their
//! kind. All of them deref down to the element, so the read API stays
//! available throughout.

use std::ops::Deref;

use crate::builder::Builder;
use crate::element::{Element, FROM, ID, LANGUAGE, NAMESPACE, TO, TYPE};
use crate::error::BuildError;
use crate::jid::Jid;

pub const ERROR_TYPE: &str = "error";

pub const GET_TYPE: &str = "get";
pub const SET_TYPE: &str = "set";
pub const RESULT_TYPE: &str = "result";

pub const NORMAL_TYPE: &str = "normal";
pub const HEADLINE_TYPE: &str = "headline";
pub const CHAT_TYPE: &str = "chat";
pub const GROUPCHAT_TYPE: &str = "groupchat";

pub const AVAILABLE_TYPE: &str = "";
pub const UNAVAILABLE_TYPE: &str = "unavailable";
pub const SUBSCRIBE_TYPE: &str = "subscribe";
pub const UNSUBSCRIBE_TYPE: &str = "unsubscribe";
pub const SUBSCRIBED_TYPE: &str = "subscribed";
pub const UNSUBSCRIBED_TYPE: &str = "unsubscribed";
pub const PROBE_TYPE: &str = "probe";

const CAPABILITIES_NAMESPACE: &str = "http://jabber.org/protocol/caps";

/// An addressed stanza: an element plus its parsed endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stanza {
    element: Element,
    from_jid: Jid,
    to_jid: Jid,
}

impl Stanza {
    /// Validate and wrap an element as a stanza.
    ///
    /// `from` and `to` must both be present and parse as addresses; when
    /// `validate_jids` is false the addresses are taken verbatim. An
    /// iq/message/presence name additionally gets the rules of that kind.
    pub fn from_element(element: Element, validate_jids: bool) -> Result<Stanza, BuildError> {
        let from = element
            .attribute(FROM)
            .ok_or(BuildError::MissingAddress(FROM))?;
        let to = element.attribute(TO).ok_or(BuildError::MissingAddress(TO))?;
        let from_jid = Jid::parse(from, !validate_jids)?;
        let to_jid = Jid::parse(to, !validate_jids)?;
        match element.name() {
            "iq" => validate_iq(&element)?,
            "message" => validate_message(&element)?,
            "presence" => validate_presence(&element)?,
            _ => {}
        }
        Ok(Stanza {
            element,
            from_jid,
            to_jid,
        })
    }

    pub fn element(&self) -> &Element {
        &self.element
    }

    pub fn from_jid(&self) -> &Jid {
        &self.from_jid
    }

    pub fn to_jid(&self) -> &Jid {
        &self.to_jid
    }

    pub fn id(&self) -> &str {
        self.element.attribute(ID).unwrap_or_default()
    }

    pub fn namespace(&self) -> &str {
        self.element.attribute(NAMESPACE).unwrap_or_default()
    }

    pub fn stanza_type(&self) -> &str {
        self.element.attribute(TYPE).unwrap_or_default()
    }

    pub fn is_error(&self) -> bool {
        self.stanza_type() == ERROR_TYPE
    }

    pub fn error_element(&self) -> Option<&Element> {
        self.element.child("error")
    }
}

impl Deref for Stanza {
    type Target = Element;

    fn deref(&self) -> &Element {
        &self.element
    }
}

/// An `<iq/>` request/response stanza.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Iq(Stanza);

impl Iq {
    pub fn from_element(element: Element, validate_jids: bool) -> Result<Iq, BuildError> {
        if element.name() != "iq" {
            return Err(BuildError::WrongName {
                expected: "iq",
                found: element.name().to_string(),
            });
        }
        Ok(Iq(Stanza::from_element(element, validate_jids)?))
    }

    pub fn is_get(&self) -> bool {
        self.stanza_type() == GET_TYPE
    }

    pub fn is_set(&self) -> bool {
        self.stanza_type() == SET_TYPE
    }

    pub fn is_result(&self) -> bool {
        self.stanza_type() == RESULT_TYPE
    }

    /// Derive the empty `result` reply: same id, endpoints swapped.
    pub fn result_iq(&self) -> Result<Iq, BuildError> {
        let mut builder = Builder::iq()
            .with_attribute(TYPE, RESULT_TYPE)
            .with_attribute(ID, self.id())
            .with_attribute(FROM, self.to_jid().to_string())
            .with_attribute(TO, self.from_jid().to_string());
        let ns = self.namespace();
        if !ns.is_empty() {
            builder = builder.with_attribute(NAMESPACE, ns);
        }
        builder.build_iq(false)
    }
}

impl Deref for Iq {
    type Target = Stanza;

    fn deref(&self) -> &Stanza {
        &self.0
    }
}

/// A `<message/>` stanza.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message(Stanza);

impl Message {
    pub fn from_element(element: Element, validate_jids: bool) -> Result<Message, BuildError> {
        if element.name() != "message" {
            return Err(BuildError::WrongName {
                expected: "message",
                found: element.name().to_string(),
            });
        }
        Ok(Message(Stanza::from_element(element, validate_jids)?))
    }

    /// An absent type means `normal`.
    pub fn is_normal(&self) -> bool {
        let t = self.stanza_type();
        t.is_empty() || t == NORMAL_TYPE
    }

    pub fn is_headline(&self) -> bool {
        self.stanza_type() == HEADLINE_TYPE
    }

    pub fn is_chat(&self) -> bool {
        self.stanza_type() == CHAT_TYPE
    }

    pub fn is_groupchat(&self) -> bool {
        self.stanza_type() == GROUPCHAT_TYPE
    }

    pub fn is_message_with_body(&self) -> bool {
        self.child("body").is_some()
    }
}

impl Deref for Message {
    type Target = Stanza;

    fn deref(&self) -> &Stanza {
        &self.0
    }
}

/// Availability substate carried in a presence `<show/>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShowState {
    #[default]
    Available,
    Away,
    Chat,
    DoNotDisturb,
    ExtendedAway,
}

/// Entity capabilities advertised in a presence stanza (XEP-0115).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub node: String,
    pub hash: String,
    pub ver: String,
}

/// A `<presence/>` stanza.
///
/// Show state and priority are extracted once at build time; the
/// validation pass has already guaranteed they are well formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presence {
    stanza: Stanza,
    show_state: ShowState,
    priority: i8,
}

impl Presence {
    pub fn from_element(element: Element, validate_jids: bool) -> Result<Presence, BuildError> {
        if element.name() != "presence" {
            return Err(BuildError::WrongName {
                expected: "presence",
                found: element.name().to_string(),
            });
        }
        let show_state = match element.child("show").map(Element::text) {
            Some("away") => ShowState::Away,
            Some("chat") => ShowState::Chat,
            Some("dnd") => ShowState::DoNotDisturb,
            Some("xa") => ShowState::ExtendedAway,
            _ => ShowState::Available,
        };
        let priority = element
            .child("priority")
            .and_then(|p| p.text().parse().ok())
            .unwrap_or(0);
        Ok(Presence {
            stanza: Stanza::from_element(element, validate_jids)?,
            show_state,
            priority,
        })
    }

    pub fn is_available(&self) -> bool {
        self.stanza_type() == AVAILABLE_TYPE
    }

    pub fn is_unavailable(&self) -> bool {
        self.stanza_type() == UNAVAILABLE_TYPE
    }

    pub fn is_subscribe(&self) -> bool {
        self.stanza_type() == SUBSCRIBE_TYPE
    }

    pub fn is_unsubscribe(&self) -> bool {
        self.stanza_type() == UNSUBSCRIBE_TYPE
    }

    pub fn is_subscribed(&self) -> bool {
        self.stanza_type() == SUBSCRIBED_TYPE
    }

    pub fn is_unsubscribed(&self) -> bool {
        self.stanza_type() == UNSUBSCRIBED_TYPE
    }

    pub fn is_probe(&self) -> bool {
        self.stanza_type() == PROBE_TYPE
    }

    pub fn show_state(&self) -> ShowState {
        self.show_state
    }

    /// The advertised priority; 0 when absent.
    pub fn priority(&self) -> i8 {
        self.priority
    }

    /// The first `<status/>` text.
    pub fn status(&self) -> Option<&str> {
        self.child("status").map(Element::text)
    }

    pub fn capabilities(&self) -> Option<Capabilities> {
        let c = self.child_ns("c", CAPABILITIES_NAMESPACE)?;
        Some(Capabilities {
            node: c.attribute("node").unwrap_or_default().to_string(),
            hash: c.attribute("hash").unwrap_or_default().to_string(),
            ver: c.attribute("ver").unwrap_or_default().to_string(),
        })
    }
}

impl Deref for Presence {
    type Target = Stanza;

    fn deref(&self) -> &Stanza {
        &self.stanza
    }
}

fn validate_iq(element: &Element) -> Result<(), BuildError> {
    if element.attribute(ID).is_none() {
        return Err(BuildError::MissingId);
    }
    let iq_type = element.attribute(TYPE).ok_or(BuildError::MissingType)?;
    match iq_type {
        GET_TYPE | SET_TYPE => {
            if element.children_count() != 1 {
                return Err(BuildError::IqChildCount);
            }
        }
        RESULT_TYPE => {
            if element.children_count() > 1 {
                return Err(BuildError::IqResultChildCount);
            }
        }
        ERROR_TYPE => {}
        _ => {
            return Err(BuildError::InvalidType {
                element: "iq",
                value: iq_type.to_string(),
            })
        }
    }
    Ok(())
}

fn validate_message(element: &Element) -> Result<(), BuildError> {
    match element.attribute(TYPE).unwrap_or_default() {
        AVAILABLE_TYPE | NORMAL_TYPE | HEADLINE_TYPE | CHAT_TYPE | GROUPCHAT_TYPE | ERROR_TYPE => {
            Ok(())
        }
        other => Err(BuildError::InvalidType {
            element: "message",
            value: other.to_string(),
        }),
    }
}

fn validate_presence(element: &Element) -> Result<(), BuildError> {
    match element.attribute(TYPE).unwrap_or_default() {
        AVAILABLE_TYPE | UNAVAILABLE_TYPE | SUBSCRIBE_TYPE | UNSUBSCRIBE_TYPE | SUBSCRIBED_TYPE
        | UNSUBSCRIBED_TYPE | PROBE_TYPE | ERROR_TYPE => {}
        other => {
            return Err(BuildError::InvalidType {
                element: "presence",
                value: other.to_string(),
            })
        }
    }
    for status in element.children("status") {
        let foreign = status
            .all_attributes()
            .iter()
            .any(|attr| attr.label != LANGUAGE);
        if foreign {
            return Err(BuildError::PresenceStatusAttributes);
        }
    }
    let shows = element.children("show");
    if shows.len() > 1 {
        return Err(BuildError::MultipleShowElements);
    }
    if let Some(show) = shows.first() {
        if show.attribute_count() > 0 {
            return Err(BuildError::PresenceShowAttributes);
        }
        match show.text() {
            "away" | "chat" | "dnd" | "xa" => {}
            other => return Err(BuildError::InvalidShowState(other.to_string())),
        }
    }
    let priorities = element.children("priority");
    if priorities.len() > 1 {
        return Err(BuildError::MultiplePriorityElements);
    }
    if let Some(priority) = priorities.first() {
        let value: i64 = priority
            .text()
            .parse()
            .map_err(|_| BuildError::InvalidPriority(priority.text().to_string()))?;
        if !(-128..=127).contains(&value) {
            return Err(BuildError::PriorityOutOfRange);
        }
    }
    Ok(())
}
