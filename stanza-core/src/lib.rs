//! Stanza Core
//!
//! Streaming XML tokenizer and incremental element-tree builder for
//! XMPP-style framed streams. Decodes one stanza at a time from a
//! long-lived connection without buffering the whole document.
//!
//! # Architecture
//!
//! - **tokenizer.rs** - Windowed streaming tokenizer over any `Read`
//! - **token.rs** - Token model with scratch-buffer spans
//! - **parser.rs** - Builder-stack frame assembly, stream framing modes
//! - **element.rs** / **builder.rs** - Immutable elements and their builder
//! - **stanza.rs** - Typed iq/message/presence surface
//! - **jid.rs** - XMPP address parsing and matching
//! - **stanza_error.rs** / **stream_error.rs** - Protocol error replies

pub mod binary;
pub mod builder;
pub mod element;
pub mod error;
pub mod escape;
pub mod jid;
pub mod parser;
mod pool;
pub mod stanza;
pub mod stanza_error;
pub mod stream_error;
pub mod token;
pub mod tokenizer;

pub use builder::Builder;
pub use element::{Attribute, Element, FROM, ID, LANGUAGE, NAMESPACE, STREAM_NAMESPACE, TO, TYPE, VERSION};
pub use error::{BuildError, ParseError};
pub use jid::{Jid, JidError, MatchingOptions};
pub use parser::{Parser, ParsingMode};
pub use stanza::{Capabilities, Iq, Message, Presence, ShowState, Stanza};
pub use token::{Attr, BufSpan, Name, QuoteStyle, Token, TokenKind};
pub use tokenizer::Tokenizer;
