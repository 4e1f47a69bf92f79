//! Stream-level error conditions (RFC 6120 §4.9).
//!
//! Unlike stanza errors these are terminal: a `<stream:error/>` is the
//! last thing written before the stream closes. [`StreamError`] can wrap
//! an underlying error for logging while the element carries only the
//! defined condition.

use std::error::Error;
use std::fmt;

use crate::builder::Builder;
use crate::element::{Element, NAMESPACE};

const STREAMS_NAMESPACE: &str = "urn:ietf:params:xml:ns:xmpp-stanzas";

/// Defined stream error conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    InvalidXml,
    InvalidNamespace,
    HostUnknown,
    InvalidFrom,
    PolicyViolation,
    RemoteConnectionFailed,
    Conflict,
    ConnectionTimeout,
    UnsupportedStanzaType,
    UnsupportedVersion,
    NotAuthorized,
    ResourceConstraint,
    SystemShutdown,
    UndefinedCondition,
    InternalServerError,
}

impl Reason {
    /// The defined-condition element name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::InvalidXml => "invalid-xml",
            Reason::InvalidNamespace => "invalid-namespace",
            Reason::HostUnknown => "host-unknown",
            Reason::InvalidFrom => "invalid-from",
            Reason::PolicyViolation => "policy-violation",
            Reason::RemoteConnectionFailed => "remote-connection-failed",
            Reason::Conflict => "conflict",
            Reason::ConnectionTimeout => "connection-timeout",
            Reason::UnsupportedStanzaType => "unsupported-stanza-type",
            Reason::UnsupportedVersion => "unsupported-version",
            Reason::NotAuthorized => "not-authorized",
            Reason::ResourceConstraint => "resource-constraint",
            Reason::SystemShutdown => "system-shutdown",
            Reason::UndefinedCondition => "undefined-condition",
            Reason::InternalServerError => "internal-server-error",
        }
    }
}

/// A terminal stream error, optionally wrapping its cause.
#[derive(Debug)]
pub struct StreamError {
    reason: Reason,
    err: Option<Box<dyn Error + Send + Sync>>,
    application_element: Option<Element>,
}

impl StreamError {
    pub fn new(reason: Reason) -> Self {
        StreamError {
            reason,
            err: None,
            application_element: None,
        }
    }

    pub fn with_cause(reason: Reason, err: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        StreamError {
            reason,
            err: Some(err.into()),
            application_element: None,
        }
    }

    /// Attach an application-defined condition element.
    pub fn with_application_element(mut self, element: Element) -> Self {
        self.application_element = Some(element);
        self
    }

    pub fn reason(&self) -> Reason {
        self.reason
    }

    /// Render the `<stream:error/>` element to put on the wire.
    pub fn element(&self) -> Element {
        let mut builder = Builder::new("stream:error").with_child(
            Builder::new(self.reason.as_str())
                .with_attribute(NAMESPACE, STREAMS_NAMESPACE)
                .build(),
        );
        if let Some(app) = &self.application_element {
            builder = builder.with_child(app.clone());
        }
        builder.build()
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.err {
            Some(err) => write!(f, "{}: {}", self.reason.as_str(), err),
            None => f.write_str(self.reason.as_str()),
        }
    }
}

impl Error for StreamError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.err.as_deref().map(|e| e as &(dyn Error + 'static))
    }
}
