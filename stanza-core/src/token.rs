//! Lexical token model - the output of the streaming tokenizer.
//!
//! Token payloads are not owned copies: names, attribute values and text
//! runs live in the tokenizer's scratch buffer and are referenced through
//! [`BufSpan`] index pairs, resolved via [`Tokenizer::resolve`]. A span is
//! valid until the next `next_token` call; once the element that produced
//! it closes, the scratch region is reclaimed.
//!
//! [`Tokenizer::resolve`]: crate::tokenizer::Tokenizer::resolve

/// A byte range inside the tokenizer scratch buffer.
///
/// 8 bytes instead of a fat pointer, and carries no lifetime, so the
/// reused [`Token`] can be overwritten in place between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufSpan {
    /// Start offset within the scratch buffer.
    pub start: u32,
    /// End offset within the scratch buffer (exclusive).
    pub end: u32,
}

impl BufSpan {
    /// Create a new span.
    #[inline]
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start: start as u32,
            end: end as u32,
        }
    }

    /// Length of the span in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    /// Check if the span is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A possibly-prefixed XML name.
///
/// The string form is `prefix:local`, or just `local` when no prefix was
/// present. Prefixes are opaque here: no namespace resolution is performed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Name {
    pub prefix: Option<BufSpan>,
    pub local: BufSpan,
}

/// Attribute quote style, preserved from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuoteStyle {
    #[default]
    Single,
    Double,
}

/// A single attribute inside a start tag.
#[derive(Debug, Clone, Copy, Default)]
pub struct Attr {
    pub name: Name,
    pub value: BufSpan,
    pub quote: QuoteStyle,
}

/// Kind of the decoded token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenKind {
    /// Start tag: `<name attr='v'>` (also emitted for the opening half of
    /// a self-closing tag).
    StartElement,
    /// End tag: `</name>`, or the synthetic close of a self-closing tag.
    EndElement,
    /// A run of character data between tags.
    #[default]
    Text,
    /// Processing instruction: `<?name data?>`.
    ProcInst,
}

/// A decoded token, reused across `next_token` calls.
///
/// Only the fields relevant for the active [`TokenKind`] are written on
/// each call; the others keep stale values from a previous token and must
/// not be read.
#[derive(Debug, Clone, Default)]
pub struct Token {
    pub kind: TokenKind,
    /// Tag or processing-instruction name (start/end/proc-inst tokens).
    pub name: Name,
    /// Text content or processing-instruction data.
    pub data: BufSpan,
    /// Index range into the tokenizer attribute stack (start tags only).
    pub attrs: (u32, u32),
}

impl Token {
    /// Create an empty token to be filled by `next_token`.
    pub fn new() -> Self {
        Self::default()
    }
}
