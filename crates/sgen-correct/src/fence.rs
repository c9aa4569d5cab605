//! Markdown code-fence stripping
//!
//! Generators wrap scripts in a fenced block (```` ```sql ... ``` ````). Two
//! flavours of stripping are provided:
//!
//! - [`strip_code_fence`] removes complete opening and closing fences and is
//!   used on finished text.
//! - [`strip_streaming_fence`] additionally hides fence markers that are still
//!   arriving, so a half-received ```` `` ```` never flashes on screen.

use crate::patterns::{FENCE_CLOSE, FENCE_CLOSE_PARTIAL, FENCE_OPEN, FENCE_OPEN_PARTIAL};

/// Remove a leading opening fence and a trailing closing fence
///
/// Text without fences is returned unchanged.
#[must_use]
pub fn strip_code_fence(text: &str) -> &str {
    let mut inner = text;
    if let Some(open) = FENCE_OPEN.find(inner) {
        inner = &inner[open.end()..];
    }
    if let Some(close) = FENCE_CLOSE.find(inner) {
        inner = &inner[..close.start()];
    }
    inner
}

/// Strip fences from a cumulative stream prefix
///
/// Re-applied to the whole accumulated text after every fragment, never to a
/// single fragment.
#[must_use]
pub fn strip_streaming_fence(text: &str) -> &str {
    if FENCE_OPEN_PARTIAL.is_match(text) {
        return "";
    }
    let inner = strip_code_fence(text);
    match FENCE_CLOSE_PARTIAL.find(inner) {
        Some(partial) => &inner[..partial.start()],
        None => inner,
    }
}
