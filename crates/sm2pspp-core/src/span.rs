//! Byte spans into the immutable input buffer.
//!
//! The scanner never copies bytes out of the input until the rewrite phase.
//! Every captured token, metadata value, and thumbnail payload is a `Span`
//! referencing the buffer it was scanned from.

use serde::{Deserialize, Serialize};

/// Offset value marking a span that has not been anchored yet.
const UNSET: usize = usize::MAX;

/// A reference to a contiguous byte region of the input buffer.
///
/// A span with an unset offset or a zero length means "absent"; this is
/// distinct from any captured value. Spans are only meaningful against the
/// buffer they were captured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    offset: usize,
    length: usize,
}

impl Span {
    /// Create a span covering `length` bytes starting at `offset`.
    pub const fn at(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    /// The unset sentinel.
    pub const fn unset() -> Self {
        Self {
            offset: UNSET,
            length: 0,
        }
    }

    /// Whether the span has been anchored to a buffer position.
    pub fn is_anchored(&self) -> bool {
        self.offset != UNSET
    }

    /// Whether the span references no bytes (unset or zero length).
    pub fn is_empty(&self) -> bool {
        !self.is_anchored() || self.length == 0
    }

    /// Start offset into the buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Offset one past the last referenced byte.
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// Anchor the span at `offset`, covering that single byte.
    pub fn start_at(&mut self, offset: usize) {
        self.offset = offset;
        self.length = 1;
    }

    /// Grow the span so that it covers the byte at `offset` inclusively.
    ///
    /// Bytes between the current end and `offset` become part of the span;
    /// this is how interior whitespace ends up inside comment tokens while
    /// trailing whitespace stays excluded.
    pub fn extend_to(&mut self, offset: usize) {
        debug_assert!(self.is_anchored());
        self.length = offset - self.offset + 1;
    }

    /// Grow the span by `n` bytes.
    pub fn grow(&mut self, n: usize) {
        debug_assert!(self.is_anchored());
        self.length += n;
    }

    /// Set the length so the span ends at `end` (exclusive).
    pub fn close_at(&mut self, end: usize) {
        debug_assert!(self.is_anchored());
        self.length = end - self.offset;
    }

    /// Drop the span back to the unset sentinel.
    pub fn clear(&mut self) {
        *self = Self::unset();
    }

    /// Resolve the span against its buffer. Absent spans resolve empty.
    pub fn bytes<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        if self.is_empty() {
            &[]
        } else {
            &buf[self.offset..self.offset + self.length]
        }
    }
}

impl Default for Span {
    fn default() -> Self {
        Self::unset()
    }
}
