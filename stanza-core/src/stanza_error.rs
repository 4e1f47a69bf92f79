//! Stanza-level error replies (RFC 6120 §8.3).
//!
//! A [`StanzaError`] derives the error reply for a stanza that could not
//! be processed: endpoints swapped, `type='error'`, and an `<error/>`
//! child carrying the defined condition, the legacy numeric code, and an
//! optional human-readable text or application-defined element.

use crate::builder::Builder;
use crate::element::{Attribute, Element, FROM, LANGUAGE, NAMESPACE, TO, TYPE};
use crate::error::BuildError;
use crate::stanza::{Stanza, ERROR_TYPE};

const STANZAS_NAMESPACE: &str = "urn:ietf:params:xml:ns:xmpp-stanzas";

/// Who is expected to act on the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    /// Retry after providing credentials.
    Auth,
    /// Do not retry: the error cannot be remedied.
    Cancel,
    /// Retry after changing the data sent.
    Modify,
    /// Retry after waiting.
    Wait,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Auth => "auth",
            ErrorType::Cancel => "cancel",
            ErrorType::Modify => "modify",
            ErrorType::Wait => "wait",
        }
    }
}

/// Defined stanza error conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    BadRequest,
    Conflict,
    FeatureNotImplemented,
    Forbidden,
    Gone,
    InternalServerError,
    ItemNotFound,
    JidMalformed,
    NotAcceptable,
    NotAllowed,
    NotAuthorized,
    PaymentRequired,
    RecipientUnavailable,
    Redirect,
    RegistrationRequired,
    RemoteServerNotFound,
    RemoteServerTimeout,
    ResourceConstraint,
    ServiceUnavailable,
    SubscriptionRequired,
    UndefinedCondition,
    UnexpectedCondition,
    UnexpectedRequest,
}

impl Reason {
    /// Legacy numeric error code.
    pub fn code(&self) -> u16 {
        match self {
            Reason::BadRequest => 400,
            Reason::Conflict => 409,
            Reason::FeatureNotImplemented => 501,
            Reason::Forbidden => 403,
            Reason::Gone => 302,
            Reason::InternalServerError => 500,
            Reason::ItemNotFound => 404,
            Reason::JidMalformed => 400,
            Reason::NotAcceptable => 406,
            Reason::NotAllowed => 405,
            Reason::NotAuthorized => 401,
            Reason::PaymentRequired => 402,
            Reason::RecipientUnavailable => 404,
            Reason::Redirect => 302,
            Reason::RegistrationRequired => 407,
            Reason::RemoteServerNotFound => 404,
            Reason::RemoteServerTimeout => 504,
            Reason::ResourceConstraint => 500,
            Reason::ServiceUnavailable => 503,
            Reason::SubscriptionRequired => 407,
            Reason::UndefinedCondition => 500,
            Reason::UnexpectedCondition => 400,
            Reason::UnexpectedRequest => 400,
        }
    }

    pub fn error_type(&self) -> ErrorType {
        match self {
            Reason::BadRequest => ErrorType::Modify,
            Reason::Conflict => ErrorType::Cancel,
            Reason::FeatureNotImplemented => ErrorType::Cancel,
            Reason::Forbidden => ErrorType::Auth,
            Reason::Gone => ErrorType::Modify,
            Reason::InternalServerError => ErrorType::Wait,
            Reason::ItemNotFound => ErrorType::Cancel,
            Reason::JidMalformed => ErrorType::Modify,
            Reason::NotAcceptable => ErrorType::Modify,
            Reason::NotAllowed => ErrorType::Cancel,
            Reason::NotAuthorized => ErrorType::Auth,
            Reason::PaymentRequired => ErrorType::Auth,
            Reason::RecipientUnavailable => ErrorType::Wait,
            Reason::Redirect => ErrorType::Modify,
            Reason::RegistrationRequired => ErrorType::Auth,
            Reason::RemoteServerNotFound => ErrorType::Cancel,
            Reason::RemoteServerTimeout => ErrorType::Wait,
            Reason::ResourceConstraint => ErrorType::Wait,
            Reason::ServiceUnavailable => ErrorType::Cancel,
            Reason::SubscriptionRequired => ErrorType::Auth,
            Reason::UndefinedCondition => ErrorType::Modify,
            Reason::UnexpectedCondition => ErrorType::Wait,
            Reason::UnexpectedRequest => ErrorType::Wait,
        }
    }

    /// The defined-condition element name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::BadRequest => "bad-request",
            Reason::Conflict => "conflict",
            Reason::FeatureNotImplemented => "feature-not-implemented",
            Reason::Forbidden => "forbidden",
            Reason::Gone => "gone",
            Reason::InternalServerError => "internal-server-error",
            Reason::ItemNotFound => "item-not-found",
            Reason::JidMalformed => "jid-malformed",
            Reason::NotAcceptable => "not-acceptable",
            Reason::NotAllowed => "not-allowed",
            Reason::NotAuthorized => "not-authorized",
            Reason::PaymentRequired => "payment-required",
            Reason::RecipientUnavailable => "recipient-unavailable",
            Reason::Redirect => "redirect",
            Reason::RegistrationRequired => "registration-required",
            Reason::RemoteServerNotFound => "remote-server-not-found",
            Reason::RemoteServerTimeout => "remote-server-timeout",
            Reason::ResourceConstraint => "resource-constraint",
            Reason::ServiceUnavailable => "service-unavailable",
            Reason::SubscriptionRequired => "subscription-required",
            Reason::UndefinedCondition => "undefined-condition",
            Reason::UnexpectedCondition => "unexpected-condition",
            Reason::UnexpectedRequest => "unexpected-request",
        }
    }
}

/// An error reply under construction for a previously received stanza.
#[derive(Debug, Clone)]
pub struct StanzaError {
    reason: Reason,
    sent_element: Element,
    lang: Option<String>,
    text: Option<String>,
    application_element: Option<Element>,
}

impl StanzaError {
    pub fn new(sent_element: Element, reason: Reason) -> Self {
        StanzaError {
            reason,
            sent_element,
            lang: None,
            text: None,
            application_element: None,
        }
    }

    /// Attach a human-readable `<text/>` description.
    pub fn with_text(mut self, lang: impl Into<String>, text: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self.text = Some(text.into());
        self
    }

    /// Attach an application-defined condition element.
    pub fn with_application_element(mut self, element: Element) -> Self {
        self.application_element = Some(element);
        self
    }

    pub fn reason(&self) -> Reason {
        self.reason
    }

    /// Render the error reply element.
    pub fn element(&self) -> Element {
        let mut error = Builder::new("error")
            .with_attribute("code", self.reason.code().to_string())
            .with_attribute(TYPE, self.reason.error_type().as_str())
            .with_child(
                Builder::new(self.reason.as_str())
                    .with_attribute(NAMESPACE, STANZAS_NAMESPACE)
                    .build(),
            );
        if let (Some(lang), Some(text)) = (&self.lang, &self.text) {
            error = error.with_child(
                Builder::new("text")
                    .with_attribute(NAMESPACE, STANZAS_NAMESPACE)
                    .with_attribute(LANGUAGE, lang)
                    .with_text(text)
                    .build(),
            );
        }
        if let Some(app) = &self.application_element {
            error = error.with_child(app.clone());
        }

        let from = self.sent_element.attribute(TO).unwrap_or_default();
        let to = self.sent_element.attribute(FROM).unwrap_or_default();
        Builder::from_element(&self.sent_element)
            .with_attributes([
                Attribute::new(TYPE, ERROR_TYPE),
                Attribute::new(FROM, from),
                Attribute::new(TO, to),
            ])
            .without_children("error")
            .with_child(error.build())
            .build()
    }

    /// Render the error reply as a validated stanza.
    pub fn stanza(&self, validate_jids: bool) -> Result<Stanza, BuildError> {
        Stanza::from_element(self.element(), validate_jids)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::element::ID;

    fn sent() -> Element {
        Builder::message()
            .with_attribute(ID, "1")
            .with_attribute(FROM, "noelia@jackal.im/yard")
            .with_attribute(TO, "ortuman@jackal.im/balcony")
            .with_child(Builder::new("body").with_text("Hi!").build())
            .build()
    }

    #[test]
    fn reply_swaps_endpoints_and_sets_error_type() {
        let reply = StanzaError::new(sent(), Reason::ItemNotFound).element();
        assert_eq!(reply.attribute(FROM), Some("ortuman@jackal.im/balcony"));
        assert_eq!(reply.attribute(TO), Some("noelia@jackal.im/yard"));
        assert_eq!(reply.attribute(TYPE), Some(ERROR_TYPE));
        assert_eq!(reply.attribute(ID), Some("1"));

        let error = reply.child("error").unwrap();
        assert_eq!(error.attribute("code"), Some("404"));
        assert_eq!(error.attribute(TYPE), Some("cancel"));
        assert!(error
            .child_ns("item-not-found", STANZAS_NAMESPACE)
            .is_some());
    }

    #[test]
    fn reply_keeps_original_payload() {
        let reply = StanzaError::new(sent(), Reason::ServiceUnavailable).element();
        assert!(reply.child("body").is_some());
    }

    #[test]
    fn text_and_application_element() {
        let reply = StanzaError::new(sent(), Reason::BadRequest)
            .with_text("en", "wrong arguments")
            .with_application_element(Builder::new("too-many-pages").build())
            .element();
        let error = reply.child("error").unwrap();
        let text = error.child("text").unwrap();
        assert_eq!(text.text(), "wrong arguments");
        assert_eq!(text.attribute(LANGUAGE), Some("en"));
        assert!(error.child("too-many-pages").is_some());
    }

    #[test]
    fn reply_is_a_valid_stanza() {
        let stanza = StanzaError::new(sent(), Reason::Forbidden)
            .stanza(true)
            .unwrap();
        assert!(stanza.is_error());
        assert!(stanza.error_element().is_some());
    }

    #[test]
    fn reason_table_is_consistent() {
        assert_eq!(Reason::Forbidden.code(), 403);
        assert_eq!(Reason::Forbidden.error_type(), ErrorType::Auth);
        assert_eq!(Reason::Forbidden.as_str(), "forbidden");
        assert_eq!(Reason::RemoteServerTimeout.code(), 504);
        assert_eq!(Reason::RemoteServerTimeout.error_type(), ErrorType::Wait);
    }
}
