//! Property-based tests.
//!
//! Structural invariants that must hold for any input: the parser never
//! panics, generated trees survive a serialize/reparse cycle, byte reads
//! of any granularity agree, and the vectorized scans match a scalar
//! reference.

use proptest::collection::btree_map;
use proptest::prelude::*;
use stanza_core::escape::{escape_text, unescape};
use stanza_core::{Builder, Element, Parser, ParsingMode};

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: 256,
        max_shrink_iters: 200,
        ..ProptestConfig::default()
    }
}

// =============================================================================
// Generators
// =============================================================================

fn name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,7}"
}

/// Attribute values: printable, non-empty (empty values are dropped on
/// serialization), and without '&' (a literal pre-encoded reference is
/// not reproduced by a decode/encode cycle).
fn attr_value_strategy() -> impl Strategy<Value = String> {
    "[ -%'-~]{1,16}"
}

/// Text with at least one non-whitespace character, so it is never
/// suppressed as insignificant. Same '&' exclusion as attribute values.
fn text_strategy() -> impl Strategy<Value = String> {
    "[ -%'-~]{0,8}[!-%'-~][ -%'-~]{0,8}"
}

fn leaf_strategy() -> impl Strategy<Value = Element> {
    (
        name_strategy(),
        prop_oneof![Just(String::new()), text_strategy()],
        btree_map(name_strategy(), attr_value_strategy(), 0..4),
    )
        .prop_map(|(name, text, attrs)| {
            let mut builder = Builder::new(name).with_text(text);
            for (label, value) in attrs {
                builder = builder.with_attribute(label, value);
            }
            builder.build()
        })
}

/// Trees up to depth 3. Elements carry either text or children, never
/// both, so reparsing reproduces them exactly.
fn tree_strategy() -> impl Strategy<Value = Element> {
    leaf_strategy().prop_recursive(3, 24, 4, |inner| {
        (
            name_strategy(),
            btree_map(name_strategy(), attr_value_strategy(), 0..4),
            prop::collection::vec(inner, 1..4),
        )
            .prop_map(|(name, attrs, children)| {
                let mut builder = Builder::new(name).with_children(children);
                for (label, value) in attrs {
                    builder = builder.with_attribute(label, value);
                }
                builder.build()
            })
    })
}

fn parse_all(input: &[u8]) -> Result<Vec<Element>, stanza_core::ParseError> {
    let mut parser = Parser::new(input, ParsingMode::WholeDocument, 0);
    let mut frames = Vec::new();
    loop {
        match parser.parse() {
            Ok(el) => frames.push(el),
            Err(stanza_core::ParseError::Eof) => return Ok(frames),
            Err(err) => return Err(err),
        }
    }
}

// =============================================================================
// Property: parser never panics
// =============================================================================

proptest! {
    #![proptest_config(config())]

    #[test]
    fn arbitrary_bytes_never_panic(input in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = parse_all(&input);
    }

    #[test]
    fn arbitrary_angle_soup_never_panics(input in "[<>/a-z '=&?!-]{0,128}") {
        let _ = parse_all(input.as_bytes());
    }
}

// =============================================================================
// Property: serialize / reparse identity
// =============================================================================

proptest! {
    #![proptest_config(config())]

    #[test]
    fn tree_survives_wire_round_trip(tree in tree_strategy()) {
        let wire = tree.to_string();
        let frames = parse_all(wire.as_bytes()).expect("own serialization must parse");
        prop_assert_eq!(frames.len(), 1);
        prop_assert_eq!(&frames[0], &tree);
    }

    #[test]
    fn tree_survives_binary_round_trip(tree in tree_strategy()) {
        let mut buf = Vec::new();
        tree.to_bytes(&mut buf).unwrap();
        let restored = Element::from_bytes(&mut buf.as_slice()).unwrap();
        prop_assert_eq!(restored, tree);
    }
}

// =============================================================================
// Property: read granularity is invisible
// =============================================================================

/// A reader yielding a fixed number of bytes per call.
struct Chunked<'a> {
    data: &'a [u8],
    pos: usize,
    chunk: usize,
}

impl std::io::Read for Chunked<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.chunk.min(buf.len()).min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

proptest! {
    #![proptest_config(config())]

    #[test]
    fn chunk_size_does_not_change_the_result(tree in tree_strategy(), chunk in 1usize..64) {
        let wire = tree.to_string();
        let mut parser = Parser::new(
            Chunked { data: wire.as_bytes(), pos: 0, chunk },
            ParsingMode::WholeDocument,
            0,
        );
        let el = parser.parse().expect("own serialization must parse");
        prop_assert_eq!(el, tree);
    }
}

// =============================================================================
// Property: escaping
// =============================================================================

proptest! {
    #![proptest_config(config())]

    // Restricted to inputs without '&': escaping deliberately leaves
    // pre-encoded references alone, so '&'-bearing inputs are not a
    // clean inverse pair.
    #[test]
    fn unescape_inverts_escape(s in "[ -%'-~]{0,64}") {
        let mut buf = Vec::new();
        escape_text(&mut buf, &s).unwrap();
        let escaped = String::from_utf8(buf).unwrap();
        prop_assert_eq!(unescape(&escaped).into_owned(), s);
    }

    #[test]
    fn escape_is_idempotent(s in "[ -~]{0,64}") {
        let mut once = Vec::new();
        escape_text(&mut once, &s).unwrap();
        let once = String::from_utf8(once).unwrap();
        let mut twice = Vec::new();
        escape_text(&mut twice, &once).unwrap();
        prop_assert_eq!(String::from_utf8(twice).unwrap(), once);
    }
}

// =============================================================================
// Property: vectorized scans match a scalar reference
// =============================================================================

proptest! {
    #![proptest_config(config())]

    #[test]
    fn memchr_agrees_with_scalar_scan(
        haystack in prop::collection::vec(any::<u8>(), 0..2048),
        needle in any::<u8>(),
    ) {
        let reference = haystack.iter().position(|&b| b == needle);
        prop_assert_eq!(memchr::memchr(needle, &haystack), reference);
    }
}
