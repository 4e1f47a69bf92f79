//! Error taxonomy for parsing and stanza construction.
//!
//! Every failure is a returned value. I/O errors from the byte source are
//! propagated verbatim and kept distinct from a clean end of input; the
//! size-budget and peer-closure conditions get their own variants so
//! callers can apply different policy to each.

use std::io;

use thiserror::Error;

use crate::jid::JidError;

/// Errors surfaced by the tokenizer and the stack parser.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Read failure from the underlying byte source.
    #[error("io: {0}")]
    Io(#[from] io::Error),

    /// Clean end of input. In socket-stream mode this is only expected
    /// between frames; mid-frame it means the peer vanished.
    #[error("unexpected end of input")]
    Eof,

    /// An end tag that does not match the innermost open element, or an
    /// end tag with no element open at all.
    #[error("unexpected end element </{0}>")]
    UnexpectedEndElement(String),

    /// Attribute without a `=` between name and value, or an unquoted
    /// attribute value.
    #[error("malformed attribute")]
    MalformedAttribute,

    /// `<!` followed by something that is neither a comment nor CDATA.
    #[error("invalid markup: comment or CDATA expected")]
    InvalidMarkup,

    /// End of input inside a comment.
    #[error("unterminated comment")]
    UnterminatedComment,

    /// End of input inside a processing instruction.
    #[error("unterminated processing instruction")]
    UnterminatedProcInst,

    /// CDATA sections are rejected, not silently skipped.
    #[error("CDATA sections are not supported")]
    CdataUnsupported,

    /// The current frame exceeded the configured maximum stanza size.
    /// Distinct from malformed input: the usual policy is to drop the
    /// connection rather than log and continue.
    #[error("too large stanza")]
    TooLargeStanza,

    /// A literal `</stream:stream>` arrived in socket-stream mode: the
    /// peer closed the stream in an orderly fashion.
    #[error("stream closed by peer")]
    StreamClosedByPeer,
}

/// Errors returned by the validated stanza build entry points.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("wrong {expected} element name: {found}")]
    WrongName {
        expected: &'static str,
        found: String,
    },

    #[error(r#"iq "id" attribute is required"#)]
    MissingId,

    #[error(r#"iq "type" attribute is required"#)]
    MissingType,

    #[error(r#"invalid {element} "type" attribute: {value}"#)]
    InvalidType {
        element: &'static str,
        value: String,
    },

    #[error(r#"an iq stanza of type "get" or "set" must contain one and only one child element"#)]
    IqChildCount,

    #[error(r#"an iq stanza of type "result" must include zero or one child elements"#)]
    IqResultChildCount,

    #[error(r#"stanza "{0}" attribute is required"#)]
    MissingAddress(&'static str),

    #[error(transparent)]
    Jid(#[from] JidError),

    #[error("presence <status/> element must not possess attributes other than 'xml:lang'")]
    PresenceStatusAttributes,

    #[error("presence <show/> element must not possess any attributes")]
    PresenceShowAttributes,

    #[error("invalid presence show state: {0}")]
    InvalidShowState(String),

    #[error("presence stanza must not contain more than one <show/> element")]
    MultipleShowElements,

    #[error("invalid presence priority: {0}")]
    InvalidPriority(String),

    #[error("presence priority value must be an integer between -128 and +127")]
    PriorityOutOfRange,

    #[error("presence stanza must not contain more than one <priority/> element")]
    MultiplePriorityElements,
}
