//! Embedded preview image location and re-flow.
//!
//! Slicers embed a PNG preview as base64 text spread over comment lines
//! between `thumbnail begin` and `thumbnail end` markers. Only the first
//! block is captured; re-emission flattens it to one contiguous base64 line.

use crate::span::Span;

/// Whether a byte belongs to the base64 alphabet (including padding).
fn is_base64_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'='
}

/// Captured spans for the first embedded thumbnail block.
#[derive(Debug, Default)]
pub struct ThumbnailLocator {
    payload: Span,
    original_block: Span,
    removed_lines: u64,
}

impl ThumbnailLocator {
    /// Create a locator with nothing captured.
    pub fn new() -> Self {
        Self::default()
    }

    /// The raw payload span: every byte between the marker lines, comment
    /// markers and line breaks included.
    pub fn payload(&self) -> Span {
        self.payload
    }

    /// Whether a complete payload has been captured.
    pub fn has_payload(&self) -> bool {
        !self.payload.is_empty()
    }

    /// The original marker-delimited block, for excision from the output.
    /// Empty unless removal was enabled and the block was fully scanned.
    pub fn original_block(&self) -> Span {
        self.original_block
    }

    /// Number of input lines the excised block occupies.
    pub fn removed_lines(&self) -> u64 {
        self.removed_lines
    }

    /// Re-flow the payload into one contiguous base64 line, dropping comment
    /// markers and whitespace while preserving character order.
    pub fn reflow(&self, buf: &[u8]) -> Vec<u8> {
        self.payload
            .bytes(buf)
            .iter()
            .copied()
            .filter(|&b| is_base64_byte(b))
            .collect()
    }

    /// Record the start of the original block at its line start. Only the
    /// first block is recorded.
    pub(crate) fn begin_block(&mut self, line_start: usize) {
        if !self.original_block.is_anchored() {
            self.original_block = Span::at(line_start, 0);
            self.removed_lines = 1;
        }
    }

    /// Count a newline seen inside the block.
    pub(crate) fn count_removed_line(&mut self) {
        self.removed_lines += 1;
    }

    /// Whether the payload span has been anchored (its first line reached).
    pub(crate) fn payload_started(&self) -> bool {
        self.payload.is_anchored()
    }

    /// Anchor the payload at `offset` with nothing captured yet.
    pub(crate) fn start_payload(&mut self, offset: usize) {
        self.payload = Span::at(offset, 0);
    }

    /// Close the payload so it ends just before the closing marker's line.
    pub(crate) fn close_payload(&mut self, end_line_start: usize) {
        self.payload.close_at(end_line_start);
    }

    /// Close the original block at `end` (exclusive).
    pub(crate) fn close_block(&mut self, end: usize) {
        if self.original_block.is_anchored() {
            self.original_block.close_at(end);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflow_strips_markers_and_whitespace() {
        let buf = b"; iVBORw0KGgo=\r\n; AAAA+/42\n";
        let mut locator = ThumbnailLocator::new();
        locator.start_payload(0);
        locator.close_payload(buf.len());
        assert_eq!(locator.reflow(buf), b"iVBORw0KGgo=AAAA+/42");
    }

    #[test]
    fn test_reflow_preserves_base64_order() {
        let buf = b";AB\n;CD\n;EF\n";
        let mut locator = ThumbnailLocator::new();
        locator.start_payload(0);
        locator.close_payload(buf.len());
        assert_eq!(locator.reflow(buf), b"ABCDEF");
    }

    #[test]
    fn test_absent_payload_reflows_empty() {
        let locator = ThumbnailLocator::new();
        assert!(!locator.has_payload());
        assert_eq!(locator.reflow(b"whatever"), b"");
    }

    #[test]
    fn test_only_first_block_is_recorded() {
        let mut locator = ThumbnailLocator::new();
        locator.begin_block(10);
        locator.count_removed_line();
        locator.close_block(50);
        locator.begin_block(100);
        assert_eq!(locator.original_block().offset(), 10);
        assert_eq!(locator.removed_lines(), 2);
    }
}
