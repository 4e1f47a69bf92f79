//! Process-wide pool of serialization scratch buffers.
//!
//! Rendering an element or a JID to a `String` needs a temporary output
//! buffer; pooling them avoids an allocation per render. Buffers are
//! acquired and released in strict push-pop order, so no two in-flight
//! serializations ever alias the same buffer.

use std::sync::Mutex;

const MAX_POOLED: usize = 32;

static POOL: Mutex<Vec<Vec<u8>>> = Mutex::new(Vec::new());

/// Borrow a cleared buffer from the pool, or allocate a fresh one.
pub(crate) fn acquire() -> Vec<u8> {
    POOL.lock()
        .ok()
        .and_then(|mut pool| pool.pop())
        .unwrap_or_default()
}

/// Return a buffer to the pool.
pub(crate) fn release(mut buf: Vec<u8>) {
    buf.clear();
    if let Ok(mut pool) = POOL.lock() {
        if pool.len() < MAX_POOLED {
            pool.push(buf);
        }
    }
}

/// Run `f` with a pooled buffer and return its result as a `String`.
pub(crate) fn render<F>(f: F) -> String
where
    F: FnOnce(&mut Vec<u8>),
{
    let mut buf = acquire();
    f(&mut buf);
    let out = String::from_utf8_lossy(&buf).into_owned();
    release(buf);
    out
}
