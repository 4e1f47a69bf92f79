//! XML character-data escaping and entity decoding.
//!
//! Serialization escapes the five XML special characters but leaves
//! already-encoded references (`&amp;`, `&#10;`, ...) intact, so escaping
//! is idempotent. Decoding resolves the five predefined entities plus
//! decimal/hex character references and passes unknown references through
//! verbatim.

use std::borrow::Cow;
use std::io::{self, Write};

use phf::phf_map;

/// Predefined XML entities.
static ENTITIES: phf::Map<&'static str, char> = phf_map! {
    "amp" => '&',
    "lt" => '<',
    "gt" => '>',
    "apos" => '\'',
    "quot" => '"',
};

/// Longest reference body we are willing to look ahead for: `#x10FFFF`.
const MAX_ENTITY_LEN: usize = 8;

#[inline]
fn escaped(b: u8) -> Option<&'static str> {
    match b {
        b'&' => Some("&amp;"),
        b'<' => Some("&lt;"),
        b'>' => Some("&gt;"),
        b'\'' => Some("&apos;"),
        b'"' => Some("&quot;"),
        _ => None,
    }
}

/// Check whether `s` begins with a complete, recognizable entity
/// reference (without the leading `&`).
fn starts_with_reference(s: &str) -> bool {
    let Some(semi) = s.bytes().take(MAX_ENTITY_LEN + 1).position(|b| b == b';') else {
        return false;
    };
    let body = &s[..semi];
    if let Some(num) = body.strip_prefix('#') {
        return decode_char_ref(num).is_some();
    }
    ENTITIES.contains_key(body)
}

fn decode_char_ref(num: &str) -> Option<char> {
    let code = if let Some(hex) = num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        num.parse::<u32>().ok()?
    };
    char::from_u32(code)
}

/// Write `text` with the five XML special characters escaped.
///
/// A `&` that already begins an encoded reference is written through
/// unchanged rather than double-escaped.
pub fn escape_text<W: Write>(w: &mut W, text: &str) -> io::Result<()> {
    let bytes = text.as_bytes();
    let mut flushed = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(rep) = escaped(b) {
            if b == b'&' && starts_with_reference(&text[i + 1..]) {
                i += 1;
                continue;
            }
            w.write_all(&bytes[flushed..i])?;
            w.write_all(rep.as_bytes())?;
            i += 1;
            flushed = i;
        } else {
            i += 1;
        }
    }
    w.write_all(&bytes[flushed..])
}

/// Decode entity references in parsed character data.
///
/// Returns the input unchanged (borrowed) when it contains no `&`.
pub fn unescape(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp + 1..];
        match tail
            .bytes()
            .take(MAX_ENTITY_LEN + 1)
            .position(|b| b == b';')
        {
            Some(semi) => {
                let body = &tail[..semi];
                let decoded = if let Some(num) = body.strip_prefix('#') {
                    decode_char_ref(num)
                } else {
                    ENTITIES.get(body).copied()
                };
                match decoded {
                    Some(c) => {
                        out.push(c);
                        rest = &tail[semi + 1..];
                    }
                    None => {
                        // Unknown reference: keep it verbatim.
                        out.push('&');
                        rest = tail;
                    }
                }
            }
            None => {
                out.push('&');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}
