//! Streaming XML tokenizer.
//!
//! Pulls bytes from any `std::io::Read` source into a fixed-size read
//! window and emits one [`Token`] per `next_token` call. All token
//! payloads accumulate in an append-only scratch buffer owned by the
//! tokenizer; tokens reference it through [`BufSpan`] index pairs.
//!
//! # Memory discipline
//!
//! One [`Frame`] is pushed per open element, recording the scratch-buffer
//! and attribute-stack extents at open time. Closing an element restores
//! both to exactly those extents - an O(1) truncation, not a walk. The
//! truncation is deferred to the top of the *next* `next_token` call so
//! that an `EndElement`'s name span stays readable until then, which is
//! the documented lifetime of any returned span.
//!
//! Bulk scanning (text runs, quoted values, comment bodies) goes through
//! `memchr`, which dispatches to SSE2/AVX2/NEON at runtime and falls back
//! to a scalar loop; name boundaries use a 256-entry separator table.

use std::io::Read;

use memchr::memchr;

use crate::error::ParseError;
use crate::token::{Attr, BufSpan, Name, QuoteStyle, Token, TokenKind};

const READ_BUF_LEN: usize = 2048;

/// Identifier terminators: whitespace, `/`, `:`, `=`, `>`.
static SEPARATORS: [bool; 256] = build_separator_table();

const fn build_separator_table() -> [bool; 256] {
    let mut table = [false; 256];
    table[b'\t' as usize] = true;
    table[b'\n' as usize] = true;
    table[b'\r' as usize] = true;
    table[b' ' as usize] = true;
    table[b'/' as usize] = true;
    table[b':' as usize] = true;
    table[b'=' as usize] = true;
    table[b'>' as usize] = true;
    table
}

#[inline]
fn is_separator(b: u8) -> bool {
    SEPARATORS[b as usize]
}

#[inline]
fn is_whitespace(b: u8) -> bool {
    b <= b' '
}

/// Per-depth bookkeeping, pushed when an element opens.
#[derive(Debug, Clone, Copy)]
struct Frame {
    /// Attribute-stack length at open.
    attr_mark: usize,
    /// Scratch-buffer length at open.
    scratch_mark: usize,
    /// Whether `xml:space='preserve'` is in effect at this depth.
    preserve_ws: bool,
}

/// Streaming pull tokenizer over a byte source.
///
/// Not safe for concurrent use: the read window, scratch buffer and
/// attribute stack are mutated in place and reused across calls.
pub struct Tokenizer<R> {
    rd: R,
    rb: Box<[u8; READ_BUF_LEN]>,
    /// Read cursor into the window.
    r: usize,
    /// Fill cursor into the window.
    w: usize,
    /// Absolute stream offset of the read cursor.
    offset: u64,
    scratch: Vec<u8>,
    attrs: Vec<Attr>,
    frames: Vec<Frame>,
    /// Name of the most recently opened element, for the synthetic close
    /// of `.../>`.
    last_open: Name,
    /// Set between a StartElement and the `>` or `/>` that terminates its
    /// tag; a `/` seen while set folds into an immediate EndElement.
    last_start_element: bool,
    /// Scratch/attr extents to restore before decoding the next token.
    pending_trunc: Option<(usize, usize)>,
}

impl<R: Read> Tokenizer<R> {
    pub fn new(rd: R) -> Self {
        Tokenizer {
            rd,
            rb: Box::new([0; READ_BUF_LEN]),
            r: 0,
            w: 0,
            offset: 0,
            scratch: Vec::with_capacity(256),
            attrs: Vec::with_capacity(16),
            frames: Vec::with_capacity(16),
            last_open: Name::default(),
            last_start_element: false,
            pending_trunc: None,
        }
    }

    /// Absolute offset in the input stream: total bytes consumed so far.
    #[inline]
    pub fn input_offset(&self) -> u64 {
        self.offset
    }

    /// Reset to a new byte source, clearing all window, scratch and frame
    /// state.
    pub fn reset(&mut self, rd: R) {
        self.rd = rd;
        self.r = 0;
        self.w = 0;
        self.offset = 0;
        self.scratch.clear();
        self.attrs.clear();
        self.frames.clear();
        self.last_start_element = false;
        self.pending_trunc = None;
    }

    /// Resolve a span into the scratch buffer.
    ///
    /// Valid only for spans of the current token.
    #[inline]
    pub fn resolve(&self, span: BufSpan) -> &[u8] {
        &self.scratch[span.start as usize..span.end as usize]
    }

    /// The attributes of a start-element token.
    #[inline]
    pub fn attributes(&self, token: &Token) -> &[Attr] {
        &self.attrs[token.attrs.0 as usize..token.attrs.1 as usize]
    }

    /// Render a token name as `prefix:local` / `local`.
    pub fn name_str(&self, name: &Name) -> String {
        let local = String::from_utf8_lossy(self.resolve(name.local));
        match name.prefix {
            Some(prefix) => format!("{}:{}", String::from_utf8_lossy(self.resolve(prefix)), local),
            None => local.into_owned(),
        }
    }

    /// Check a token name against a literal prefix and local part.
    pub fn name_matches(&self, name: &Name, prefix: &[u8], local: &[u8]) -> bool {
        self.resolve(name.local) == local
            && name
                .prefix
                .map_or(false, |span| self.resolve(span) == prefix)
    }

    /// Decode the next token into `token`.
    ///
    /// Comments and insignificant whitespace runs are consumed without
    /// producing a token. Returns [`ParseError::Eof`] once the source is
    /// exhausted.
    pub fn next_token(&mut self, token: &mut Token) -> Result<(), ParseError> {
        if let Some((scratch_mark, attr_mark)) = self.pending_trunc.take() {
            self.scratch.truncate(scratch_mark);
            self.attrs.truncate(attr_mark);
        }
        loop {
            let b = self.read_byte()?;
            match b {
                b'>' => {
                    // The previous start tag just got properly ended; the
                    // byte was left unconsumed in case it was a '/>'.
                    self.last_start_element = false;
                }
                b'/' => {
                    if self.last_start_element {
                        // Self-closing sugar: consume the '>' and emit the
                        // EndElement for the tag we just opened.
                        self.discard(1)?;
                        self.last_start_element = false;
                        let name = self.last_open;
                        return self.end_element(token, name);
                    }
                    self.unread_byte();
                    if !self.decode_text(token)? {
                        return Ok(());
                    }
                }
                b'<' => {
                    let b = self.read_byte()?;
                    match b {
                        b'?' => {
                            self.last_start_element = false;
                            return self.decode_proc_inst(token);
                        }
                        b'!' => match self.read_byte()? {
                            b'-' => self.skip_comment()?,
                            b'[' => return Err(ParseError::CdataUnsupported),
                            _ => return Err(ParseError::InvalidMarkup),
                        },
                        b'/' => {
                            let (name, _) = self.read_name()?;
                            self.last_start_element = false;
                            return self.end_element(token, name);
                        }
                        _ => {
                            self.unread_byte();
                            self.last_start_element = true;
                            return self.start_element(token);
                        }
                    }
                }
                _ => {
                    self.last_start_element = false;
                    self.unread_byte();
                    if !self.decode_text(token)? {
                        return Ok(());
                    }
                }
            }
        }
    }

    // ---- window plumbing ----

    /// Compact the window and refill it from the source.
    fn read0(&mut self) -> Result<(), ParseError> {
        if self.r > 0 {
            self.rb.copy_within(self.r..self.w, 0);
            self.w -= self.r;
            self.r = 0;
        }
        let n = self.rd.read(&mut self.rb[self.w..])?;
        if n == 0 {
            return Err(ParseError::Eof);
        }
        self.w += n;
        Ok(())
    }

    #[inline]
    fn read_byte(&mut self) -> Result<u8, ParseError> {
        while self.r == self.w {
            self.read0()?;
        }
        let b = self.rb[self.r];
        self.r += 1;
        self.offset += 1;
        Ok(b)
    }

    #[inline]
    fn unread_byte(&mut self) {
        self.r -= 1;
        self.offset -= 1;
    }

    /// Advance past `n` bytes known to be in the window.
    #[inline]
    fn advance(&mut self, n: usize) {
        self.r += n;
        self.offset += n as u64;
    }

    fn discard(&mut self, n: usize) -> Result<(), ParseError> {
        while self.r + n > self.w {
            self.read0()?;
        }
        self.advance(n);
        Ok(())
    }

    fn skip_whitespace(&mut self, mut b: u8) -> Result<u8, ParseError> {
        while is_whitespace(b) {
            b = self.read_byte()?;
        }
        Ok(b)
    }

    // ---- token decoders ----

    fn start_element(&mut self, token: &mut Token) -> Result<(), ParseError> {
        // The new depth inherits the parent's whitespace preservation.
        let preserve_ws = self.frames.last().map_or(false, |f| f.preserve_ws);
        let frame = Frame {
            attr_mark: self.attrs.len(),
            scratch_mark: self.scratch.len(),
            preserve_ws,
        };
        self.frames.push(frame);

        let (name, b) = self.read_name()?;
        self.decode_attributes(b)?;
        self.last_open = name;

        token.kind = TokenKind::StartElement;
        token.name = name;
        token.attrs = (frame.attr_mark as u32, self.attrs.len() as u32);
        Ok(())
    }

    fn end_element(&mut self, token: &mut Token, name: Name) -> Result<(), ParseError> {
        if let Some(frame) = self.frames.pop() {
            // Reclaimed at the top of the next call; the name span must
            // stay valid until the caller has consumed this token.
            self.pending_trunc = Some((frame.scratch_mark, frame.attr_mark));
        }
        token.kind = TokenKind::EndElement;
        token.name = name;
        Ok(())
    }

    /// Scan a text run up to the next `<`.
    ///
    /// Returns `Ok(true)` when the run was whitespace-only and suppressed,
    /// in which case the caller keeps looping.
    fn decode_text(&mut self, token: &mut Token) -> Result<bool, ParseError> {
        let start = self.scratch.len();
        let preserve_ws = self.frames.last().map_or(false, |f| f.preserve_ws);
        let mut only_ws = true;
        loop {
            let window = &self.rb[self.r..self.w];
            match memchr(b'<', window) {
                Some(k) => {
                    if only_ws {
                        only_ws = window[..k].iter().all(|&b| is_whitespace(b));
                    }
                    if only_ws && !preserve_ws {
                        self.advance(k);
                        self.scratch.truncate(start);
                        return Ok(true);
                    }
                    self.scratch.extend_from_slice(&self.rb[self.r..self.r + k]);
                    self.advance(k);
                    token.kind = TokenKind::Text;
                    token.data = BufSpan::new(start, self.scratch.len());
                    return Ok(false);
                }
                None => {
                    if only_ws {
                        only_ws = window.iter().all(|&b| is_whitespace(b));
                    }
                    self.scratch.extend_from_slice(&self.rb[self.r..self.w]);
                    self.advance(self.w - self.r);
                    self.read0()?;
                }
            }
        }
    }

    fn decode_proc_inst(&mut self, token: &mut Token) -> Result<(), ParseError> {
        let result = self.decode_proc_inst_inner(token);
        match result {
            Err(ParseError::Eof) => Err(ParseError::UnterminatedProcInst),
            other => other,
        }
    }

    fn decode_proc_inst_inner(&mut self, token: &mut Token) -> Result<(), ParseError> {
        let (name, b) = self.read_name()?;
        let mut b = self.skip_whitespace(b)?;
        let start = self.scratch.len();
        // End of the data run with trailing whitespace trimmed.
        let mut trimmed = start;
        loop {
            if b == b'?' {
                loop {
                    let b2 = self.read_byte()?;
                    if b2 == b'>' {
                        token.kind = TokenKind::ProcInst;
                        token.name = name;
                        token.data = BufSpan::new(start, trimmed);
                        return Ok(());
                    } else if b2 != b'?' {
                        self.scratch.push(b'?');
                        self.scratch.push(b2);
                        if !is_whitespace(b2) {
                            trimmed = self.scratch.len();
                        }
                        break;
                    }
                    self.scratch.push(b2);
                    trimmed = self.scratch.len();
                }
            } else {
                self.scratch.push(b);
                if !is_whitespace(b) {
                    trimmed = self.scratch.len();
                }
            }
            b = self.read_byte()?;
        }
    }

    /// Consume a comment without emitting a token.
    fn skip_comment(&mut self) -> Result<(), ParseError> {
        match self.skip_comment_inner() {
            Err(ParseError::Eof) => Err(ParseError::UnterminatedComment),
            other => other,
        }
    }

    fn skip_comment_inner(&mut self) -> Result<(), ParseError> {
        if self.read_byte()? != b'-' {
            return Err(ParseError::InvalidMarkup);
        }
        loop {
            while self.r < self.w {
                match memchr(b'-', &self.rb[self.r..self.w]) {
                    Some(k) => {
                        self.advance(k + 1);
                        if self.read_byte()? == b'-' {
                            loop {
                                let b = self.read_byte()?;
                                if b == b'>' {
                                    return Ok(());
                                }
                                if b != b'-' {
                                    break;
                                }
                            }
                        }
                    }
                    None => {
                        self.advance(self.w - self.r);
                    }
                }
            }
            self.read0()?;
        }
    }

    /// Read a possibly-prefixed name; returns the name and the separator
    /// byte that terminated it.
    fn read_name(&mut self) -> Result<(Name, u8), ParseError> {
        let (local_or_prefix, b) = self.read_simple_name()?;
        if b == b':' {
            let (local, b) = self.read_simple_name()?;
            Ok((
                Name {
                    prefix: Some(local_or_prefix),
                    local,
                },
                b,
            ))
        } else {
            Ok((
                Name {
                    prefix: None,
                    local: local_or_prefix,
                },
                b,
            ))
        }
    }

    /// Scan an identifier up to the next separator using the byte
    /// classification table; the separator is consumed and returned.
    fn read_simple_name(&mut self) -> Result<(BufSpan, u8), ParseError> {
        let start = self.scratch.len();
        loop {
            let found = self.rb[self.r..self.w]
                .iter()
                .position(|&b| is_separator(b));
            match found {
                Some(k) => {
                    let sep = self.rb[self.r + k];
                    self.scratch.extend_from_slice(&self.rb[self.r..self.r + k]);
                    self.advance(k + 1);
                    return Ok((BufSpan::new(start, self.scratch.len()), sep));
                }
                None => {
                    self.scratch.extend_from_slice(&self.rb[self.r..self.w]);
                    self.advance(self.w - self.r);
                    self.read0()?;
                }
            }
        }
    }

    fn decode_attributes(&mut self, mut b: u8) -> Result<(), ParseError> {
        loop {
            b = self.skip_whitespace(b)?;
            match b {
                b'/' | b'>' => {
                    // Leave the terminator for the main loop: a '/' still
                    // has to fold into the synthetic EndElement.
                    self.unread_byte();
                    return Ok(());
                }
                _ => {
                    self.unread_byte();
                    let attr = self.decode_attribute()?;
                    self.attrs.push(attr);
                    b = self.read_byte()?;
                }
            }
        }
    }

    fn decode_attribute(&mut self) -> Result<Attr, ParseError> {
        let (name, b) = self.read_name()?;
        let b = self.skip_whitespace(b)?;
        if b != b'=' {
            return Err(ParseError::MalformedAttribute);
        }
        let b = self.read_byte()?;
        let b = self.skip_whitespace(b)?;
        let (value, quote) = self.read_quoted(b)?;

        // xml:space toggles whitespace preservation for this depth.
        if self.name_matches(&name, b"xml", b"space") {
            let preserve = self.resolve(value) == b"preserve";
            if let Some(frame) = self.frames.last_mut() {
                frame.preserve_ws = preserve;
            }
        }
        Ok(Attr { name, value, quote })
    }

    /// Read a quoted attribute value; `delim` is the opening quote.
    fn read_quoted(&mut self, delim: u8) -> Result<(BufSpan, QuoteStyle), ParseError> {
        let quote = match delim {
            b'\'' => QuoteStyle::Single,
            b'"' => QuoteStyle::Double,
            _ => return Err(ParseError::MalformedAttribute),
        };
        let start = self.scratch.len();
        loop {
            match memchr(delim, &self.rb[self.r..self.w]) {
                Some(k) => {
                    self.scratch.extend_from_slice(&self.rb[self.r..self.r + k]);
                    self.advance(k + 1);
                    return Ok((BufSpan::new(start, self.scratch.len()), quote));
                }
                None => {
                    self.scratch.extend_from_slice(&self.rb[self.r..self.w]);
                    self.advance(self.w - self.r);
                    self.read0()?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenizer(input: &[u8]) -> Tokenizer<&[u8]> {
        Tokenizer::new(input)
    }

    fn collect(input: &[u8]) -> Vec<(TokenKind, String)> {
        let mut tk = tokenizer(input);
        let mut token = Token::new();
        let mut out = Vec::new();
        loop {
            match tk.next_token(&mut token) {
                Ok(()) => {
                    let label = match token.kind {
                        TokenKind::StartElement | TokenKind::EndElement | TokenKind::ProcInst => {
                            tk.name_str(&token.name)
                        }
                        TokenKind::Text => {
                            String::from_utf8_lossy(tk.resolve(token.data)).into_owned()
                        }
                    };
                    out.push((token.kind, label));
                }
                Err(ParseError::Eof) => return out,
                Err(err) => panic!("unexpected error: {err}"),
            }
        }
    }

    #[test]
    fn start_end_and_text() {
        let tokens = collect(b"<a>hello</a>");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::StartElement, "a".to_string()),
                (TokenKind::Text, "hello".to_string()),
                (TokenKind::EndElement, "a".to_string()),
            ]
        );
    }

    #[test]
    fn self_closing_emits_synthetic_end() {
        let tokens = collect(b"<a/>");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::StartElement, "a".to_string()),
                (TokenKind::EndElement, "a".to_string()),
            ]
        );
    }

    #[test]
    fn prefixed_names() {
        let tokens = collect(b"<stream:stream></stream:stream>");
        assert_eq!(tokens[0].1, "stream:stream");
        assert_eq!(tokens[1].1, "stream:stream");
    }

    #[test]
    fn whitespace_only_text_is_suppressed() {
        let tokens = collect(b"<a> \t\n </a>");
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn xml_space_preserve_keeps_whitespace() {
        let tokens = collect(b"<a xml:space='preserve'> </a>");
        assert_eq!(tokens[1], (TokenKind::Text, " ".to_string()));
    }

    #[test]
    fn preserve_is_inherited_and_resettable() {
        let tokens = collect(b"<a xml:space='preserve'><b> </b><c xml:space='default'> </c></a>");
        let texts: Vec<_> = tokens
            .iter()
            .filter(|(kind, _)| *kind == TokenKind::Text)
            .collect();
        // <b> inherits preserve; <c> overrides it back off.
        assert_eq!(texts.len(), 1);
    }

    #[test]
    fn attributes_are_collected_in_order() {
        let mut tk = tokenizer(b"<a one='1' two=\"2\"/>");
        let mut token = Token::new();
        tk.next_token(&mut token).unwrap();
        let attrs = tk.attributes(&token);
        assert_eq!(attrs.len(), 2);
        assert_eq!(tk.name_str(&attrs[0].name), "one");
        assert_eq!(tk.resolve(attrs[0].value), b"1");
        assert_eq!(attrs[0].quote, QuoteStyle::Single);
        assert_eq!(tk.name_str(&attrs[1].name), "two");
        assert_eq!(attrs[1].quote, QuoteStyle::Double);
    }

    #[test]
    fn comments_are_suppressed() {
        let tokens = collect(b"<a><!-- note - with -- dashes --></a>");
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn processing_instruction_data_is_trimmed() {
        let mut tk = tokenizer(b"<?xml version='1.0'  ?>");
        let mut token = Token::new();
        tk.next_token(&mut token).unwrap();
        assert_eq!(token.kind, TokenKind::ProcInst);
        assert_eq!(tk.name_str(&token.name), "xml");
        assert_eq!(tk.resolve(token.data), b"version='1.0'");
    }

    #[test]
    fn missing_equals_is_a_hard_error() {
        let mut tk = tokenizer(b"<a broken'1'/>");
        let mut token = Token::new();
        assert!(matches!(
            tk.next_token(&mut token),
            Err(ParseError::MalformedAttribute)
        ));
    }

    #[test]
    fn unquoted_value_is_a_hard_error() {
        let mut tk = tokenizer(b"<a x=1/>");
        let mut token = Token::new();
        assert!(matches!(
            tk.next_token(&mut token),
            Err(ParseError::MalformedAttribute)
        ));
    }

    #[test]
    fn cdata_is_rejected() {
        let mut tk = tokenizer(b"<a><![CDATA[x]]></a>");
        let mut token = Token::new();
        tk.next_token(&mut token).unwrap();
        assert!(matches!(
            tk.next_token(&mut token),
            Err(ParseError::CdataUnsupported)
        ));
    }

    #[test]
    fn unterminated_comment() {
        let mut tk = tokenizer(b"<!-- never ends");
        let mut token = Token::new();
        assert!(matches!(
            tk.next_token(&mut token),
            Err(ParseError::UnterminatedComment)
        ));
    }

    #[test]
    fn input_offset_tracks_consumed_bytes() {
        let mut tk = tokenizer(b"<a/><b/>");
        let mut token = Token::new();
        tk.next_token(&mut token).unwrap();
        tk.next_token(&mut token).unwrap();
        assert_eq!(tk.input_offset(), 4);
    }

    #[test]
    fn scratch_is_reclaimed_after_close() {
        let mut tk = tokenizer(b"<a x='0123456789'>t</a><b/>");
        let mut token = Token::new();
        for _ in 0..3 {
            tk.next_token(&mut token).unwrap();
        }
        // After <a>'s close is consumed, its scratch extent is released
        // on the next call.
        tk.next_token(&mut token).unwrap();
        assert_eq!(token.kind, TokenKind::StartElement);
        assert_eq!(tk.resolve(token.name.local), b"b");
        assert_eq!(token.name.local.start, 0);
    }

    #[test]
    fn reset_clears_state() {
        let mut tk = tokenizer(b"<a>");
        let mut token = Token::new();
        tk.next_token(&mut token).unwrap();
        tk.reset(b"<b/>");
        assert_eq!(tk.input_offset(), 0);
        tk.next_token(&mut token).unwrap();
        assert_eq!(tk.resolve(token.name.local), b"b");
    }

    #[test]
    fn tokens_spanning_window_refills() {
        // Force the value across multiple 2048-byte reads.
        let big = "v".repeat(3 * READ_BUF_LEN);
        let doc = format!("<a x='{big}'>{big}</a>");
        let mut tk = tokenizer(doc.as_bytes());
        let mut token = Token::new();
        tk.next_token(&mut token).unwrap();
        let attrs = tk.attributes(&token);
        assert_eq!(attrs[0].value.len(), big.len());
        tk.next_token(&mut token).unwrap();
        assert_eq!(token.kind, TokenKind::Text);
        assert_eq!(token.data.len(), big.len());
    }
}
