//! Streaming assembly of generated fragments
//!
//! [`StreamAssembler`] accumulates raw fragments, derives the body shown while
//! the stream is running, and drives a [`Progress`] counter.

use sgen_correct::strip_streaming_fence;

/// Highest value progress can reach before the stream ends
pub const PROGRESS_CEILING: u8 = 99;

/// Progress reached once the stream ends, successfully or not
pub const PROGRESS_DONE: u8 = 100;

/// Monotonic progress counter in `[0, 100]`
///
/// # Invariants
/// - Never decreases between [`Progress::reset`] calls
/// - Stays at or below [`PROGRESS_CEILING`] until [`Progress::complete`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    value: u8,
    step: u8,
}

impl Progress {
    /// Start at zero, advancing by `step` per fragment (0 is treated as 1)
    #[inline]
    #[must_use]
    pub fn new(step: u8) -> Self {
        Self {
            value: 0,
            step: step.max(1),
        }
    }

    #[inline]
    #[must_use]
    pub fn value(&self) -> u8 {
        self.value
    }

    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.value == PROGRESS_DONE
    }

    /// Record one fragment
    pub fn advance(&mut self) -> u8 {
        if !self.is_complete() {
            self.value = self.value.saturating_add(self.step).min(PROGRESS_CEILING);
        }
        self.value
    }

    /// Mark the stream as ended
    pub fn complete(&mut self) -> u8 {
        self.value = PROGRESS_DONE;
        self.value
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new(5)
    }
}

/// Accumulates the fragments of one generation run
#[derive(Debug, Clone, Default)]
pub struct StreamAssembler {
    raw: String,
    progress: Progress,
    fragments: usize,
}

impl StreamAssembler {
    #[must_use]
    pub fn new(progress_step: u8) -> Self {
        Self {
            raw: String::new(),
            progress: Progress::new(progress_step),
            fragments: 0,
        }
    }

    /// Append a fragment and return the body to display
    ///
    /// Fence markers are stripped from the whole accumulated text, never from
    /// the fragment alone, since a marker may be split across fragments.
    pub fn push(&mut self, fragment: &str) -> &str {
        self.raw.push_str(fragment);
        self.fragments += 1;
        self.progress.advance();
        self.display_body()
    }

    /// Body as it should currently be shown
    #[inline]
    #[must_use]
    pub fn display_body(&self) -> &str {
        strip_streaming_fence(&self.raw)
    }

    /// Everything received so far, unmodified
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[inline]
    #[must_use]
    pub fn progress(&self) -> u8 {
        self.progress.value()
    }

    #[inline]
    #[must_use]
    pub fn fragment_count(&self) -> usize {
        self.fragments
    }

    /// End the stream and hand over the raw accumulated body
    pub fn finish(mut self) -> (String, u8) {
        let progress = self.progress.complete();
        (self.raw, progress)
    }
}
