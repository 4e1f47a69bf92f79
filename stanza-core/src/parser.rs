//! Incremental element-tree assembly over the token stream.
//!
//! [`Parser`] folds tokenizer output into complete [`Element`] trees, one
//! per `parse` call. A builder stack mirrors the open-element nesting:
//! a start tag pushes, an end tag pops and attaches the built element to
//! its parent, and popping the last builder completes a frame.
//!
//! In [`ParsingMode::SocketStream`] the `<stream:stream>` header is
//! returned as its own frame the moment its start tag arrives, and the
//! matching end tag surfaces as [`ParseError::StreamClosedByPeer`].

use std::io::Read;

use crate::builder::Builder;
use crate::element::{Attribute, Element};
use crate::error::ParseError;
use crate::escape::unescape;
use crate::token::{Token, TokenKind};
use crate::tokenizer::Tokenizer;

/// How the input framing is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParsingMode {
    /// A self-contained document: no stream header handling.
    #[default]
    WholeDocument,
    /// A long-lived XMPP connection: `stream:stream` open and close tags
    /// frame the session rather than any element.
    SocketStream,
}

/// Streaming element parser over any byte source.
pub struct Parser<R> {
    tokenizer: Tokenizer<R>,
    mode: ParsingMode,
    /// Per-frame byte budget; 0 disables the check.
    max_stanza_size: u64,
    stack: Vec<Builder>,
    /// Input offset at the end of the previous completed frame.
    last_offset: u64,
}

impl<R: Read> Parser<R> {
    pub fn new(rd: R, mode: ParsingMode, max_stanza_size: u64) -> Self {
        Parser {
            tokenizer: Tokenizer::new(rd),
            mode,
            max_stanza_size,
            stack: Vec::with_capacity(8),
            last_offset: 0,
        }
    }

    /// Reset to a new byte source, dropping any partially built frame.
    pub fn reset(&mut self, rd: R) {
        self.tokenizer.reset(rd);
        self.stack.clear();
        self.last_offset = 0;
    }

    /// Consume tokens until the next complete frame.
    ///
    /// Errors are not recoverable: after anything other than `Ok` the
    /// parser must be reset before further use.
    pub fn parse(&mut self) -> Result<Element, ParseError> {
        let mut token = Token::new();
        loop {
            self.tokenizer.next_token(&mut token)?;
            if self.max_stanza_size > 0
                && self.tokenizer.input_offset() - self.last_offset > self.max_stanza_size
            {
                return Err(ParseError::TooLargeStanza);
            }
            match token.kind {
                TokenKind::StartElement => {
                    if let Some(element) = self.start_element(&token) {
                        return Ok(element);
                    }
                }
                TokenKind::EndElement => {
                    if let Some(element) = self.end_element(&token)? {
                        return Ok(element);
                    }
                }
                TokenKind::Text => {
                    if let Some(builder) = self.stack.pop() {
                        let text = String::from_utf8_lossy(self.tokenizer.resolve(token.data));
                        self.stack.push(builder.with_text(unescape(&text).into_owned()));
                    }
                }
                TokenKind::ProcInst => {}
            }
        }
    }

    /// Push a builder for the start tag. Returns the completed frame when
    /// the tag is a socket-stream session header.
    fn start_element(&mut self, token: &Token) -> Option<Element> {
        let name = self.tokenizer.name_str(&token.name);
        let mut attributes = Vec::with_capacity(self.tokenizer.attributes(token).len());
        for attr in self.tokenizer.attributes(token) {
            let value = String::from_utf8_lossy(self.tokenizer.resolve(attr.value));
            attributes.push(Attribute {
                label: self.tokenizer.name_str(&attr.name),
                value: unescape(&value).into_owned(),
            });
        }
        let builder = Builder::new(name).with_attributes(attributes);

        if self.mode == ParsingMode::SocketStream
            && self.stack.is_empty()
            && self.tokenizer.name_matches(&token.name, b"stream", b"stream")
        {
            // The session header never closes under normal operation, so
            // it is surfaced as a frame of its own right away.
            return Some(self.complete_frame(builder.build()));
        }
        self.stack.push(builder);
        None
    }

    fn end_element(&mut self, token: &Token) -> Result<Option<Element>, ParseError> {
        // Orderly closure outranks the mismatch check: the peer may tear
        // the session down while a stanza is still open.
        if self.mode == ParsingMode::SocketStream
            && self.tokenizer.name_matches(&token.name, b"stream", b"stream")
        {
            log::debug!("stream closed by peer");
            return Err(ParseError::StreamClosedByPeer);
        }
        let name = self.tokenizer.name_str(&token.name);
        let builder = match self.stack.pop() {
            Some(builder) if builder.element_name() == name => builder,
            _ => return Err(ParseError::UnexpectedEndElement(name)),
        };
        let element = builder.build();
        match self.stack.pop() {
            Some(parent) => {
                self.stack.push(parent.with_child(element));
                Ok(None)
            }
            None => Ok(Some(self.complete_frame(element))),
        }
    }

    fn complete_frame(&mut self, element: Element) -> Element {
        self.last_offset = self.tokenizer.input_offset();
        log::trace!(
            "completed frame <{}> at offset {}",
            element.name(),
            self.last_offset
        );
        element
    }
}
