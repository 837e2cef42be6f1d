//! The single forward scan over the input buffer.
//!
//! One linear pass classifies every byte into a lexical context, decoding
//! move instructions for the bounding-box tracker, `key = value` comment
//! pairs for the metadata extractor, and the embedded thumbnail block for the
//! thumbnail locator. The scanner works on `&[u8]` and performs no I/O, so
//! it can be driven entirely from tests.

pub mod metadata;
pub mod moves;
pub mod thumbnail;

use crate::number::{parse_float, parse_uint};
use crate::span::Span;
use metadata::{MetadataExtractor, MetadataField};
use moves::{BoundingBox, MoveParams, MoveTracker, PositioningMode};
use thumbnail::ThumbnailLocator;

/// Comment text marking an already post-processed file.
pub const MARKER_POST_PROCESSED: &[u8] = b"post-processed by sm2pspp";
/// Comment text opening an embedded thumbnail block.
pub const MARKER_THUMBNAIL_BEGIN: &[u8] = b"thumbnail begin";
/// Comment text closing an embedded thumbnail block.
pub const MARKER_THUMBNAIL_END: &[u8] = b"thumbnail end";
/// Comment line marking a layer change.
pub const MARKER_LAYER_CHANGE: &[u8] = b"LAYER_CHANGE";

/// Lexical context at the current scan position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// At the start of a logical line, before any significant byte.
    LineStart,
    /// Skipping the rest of an unrecognized line.
    SeekLineStart,
    /// Inside a G instruction and its parameters.
    GCodeWord,
    /// Inside a comment, collecting its first word.
    Comment,
    /// Inside the value of a recognized `key = value` comment.
    ParameterValue,
    /// Inside the thumbnail payload, watching for the end marker.
    ThumbnailBody,
    /// Consuming the rest of the thumbnail end marker's line.
    ThumbnailTail,
}

/// Role of the numeric token currently collected in a G-code word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenRole {
    /// The instruction code following the `G` letter.
    Code,
    /// An X axis parameter.
    AxisX,
    /// A Y axis parameter.
    AxisY,
    /// A Z axis parameter.
    AxisZ,
    /// An extrusion parameter.
    AxisE,
}

/// Everything the forward scan produced.
#[derive(Debug)]
pub struct ScanOutcome {
    /// Captured metadata value spans.
    pub metadata: MetadataExtractor,
    /// Captured thumbnail spans.
    pub thumbnail: ThumbnailLocator,
    /// Extents of all extrusion moves, with the first-layer z correction
    /// already applied.
    pub bounds: BoundingBox,
    /// Line counter after the scan: 1 plus the number of newline bytes seen.
    pub line_count: u64,
    /// Whether the idempotency marker was found; the scan stops there.
    pub already_processed: bool,
}

/// The byte-driven lexical state machine.
#[derive(Debug)]
pub struct Scanner {
    state: ScanState,
    strip_original_thumbnail: bool,
    line: u64,
    line_start: usize,
    token: Span,
    role: Option<TokenRole>,
    code: Option<u64>,
    mv: MoveParams,
    target: Option<MetadataField>,
    moves: MoveTracker,
    metadata: MetadataExtractor,
    thumbnail: ThumbnailLocator,
    already_processed: bool,
}

impl Scanner {
    /// Create a scanner. `strip_original_thumbnail` additionally records the
    /// byte range of the original thumbnail block for excision.
    pub fn new(strip_original_thumbnail: bool) -> Self {
        Self {
            state: ScanState::LineStart,
            strip_original_thumbnail,
            line: 1,
            line_start: 0,
            token: Span::unset(),
            role: None,
            code: None,
            mv: MoveParams::default(),
            target: None,
            moves: MoveTracker::new(),
            metadata: MetadataExtractor::new(),
            thumbnail: ThumbnailLocator::new(),
            already_processed: false,
        }
    }

    /// Run the forward scan to completion, or until the idempotency marker.
    pub fn scan(mut self, buf: &[u8]) -> ScanOutcome {
        for (i, &b) in buf.iter().enumerate() {
            self.step(i, b, buf);
            if self.already_processed {
                break;
            }
            if b == b'\n' {
                self.line += 1;
                self.line_start = i + 1;
            } else if b == b'\r' {
                self.line_start = i + 1;
            }
        }
        // an instruction cut off by EOF without a trailing newline still counts
        if self.state == ScanState::GCodeWord {
            self.close_token(buf);
            self.evaluate_instruction();
        }
        let first_layer_height = self
            .metadata
            .is_captured(MetadataField::FirstLayerHeight)
            .then(|| parse_float(self.metadata.get(MetadataField::FirstLayerHeight).bytes(buf)));
        ScanOutcome {
            bounds: self.moves.finish(first_layer_height),
            metadata: self.metadata,
            thumbnail: self.thumbnail,
            line_count: self.line,
            already_processed: self.already_processed,
        }
    }

    fn step(&mut self, i: usize, b: u8, buf: &[u8]) {
        match self.state {
            ScanState::LineStart => {
                if b == b';' {
                    self.token.clear();
                    self.state = ScanState::Comment;
                } else if b == b'G' {
                    self.begin_instruction();
                    self.state = ScanState::GCodeWord;
                } else if !b.is_ascii_whitespace() {
                    self.state = ScanState::SeekLineStart;
                }
            }
            ScanState::SeekLineStart => {
                if b == b'\n' {
                    self.state = ScanState::LineStart;
                }
            }
            ScanState::GCodeWord => self.step_gcode_word(i, b, buf),
            ScanState::Comment => self.step_comment(i, b, buf),
            ScanState::ParameterValue => self.step_parameter_value(i, b),
            ScanState::ThumbnailBody => self.step_thumbnail_body(i, b, buf),
            ScanState::ThumbnailTail => {
                if b == b'\n' {
                    self.thumbnail.close_block(i + 1);
                    self.state = ScanState::LineStart;
                }
            }
        }
    }

    fn begin_instruction(&mut self) {
        self.token.clear();
        self.role = Some(TokenRole::Code);
        self.code = None;
        self.mv = MoveParams::default();
    }

    fn step_gcode_word(&mut self, i: usize, b: u8, buf: &[u8]) {
        match b {
            b'0'..=b'9' | b'.' if self.role.is_some() => self.extend_token(i),
            b'-' if self.role.is_some() && !self.token.is_anchored() => self.extend_token(i),
            b'X' => {
                self.close_token(buf);
                self.role = Some(TokenRole::AxisX);
            }
            b'Y' => {
                self.close_token(buf);
                self.role = Some(TokenRole::AxisY);
            }
            b'Z' => {
                self.close_token(buf);
                self.role = Some(TokenRole::AxisZ);
            }
            b'E' => {
                self.close_token(buf);
                self.role = Some(TokenRole::AxisE);
            }
            b'\n' => {
                self.close_token(buf);
                self.evaluate_instruction();
                self.state = ScanState::LineStart;
            }
            b';' => {
                self.close_token(buf);
                self.evaluate_instruction();
                self.token.clear();
                self.state = ScanState::Comment;
            }
            _ => self.close_token(buf),
        }
    }

    fn extend_token(&mut self, i: usize) {
        if self.token.is_anchored() {
            self.token.extend_to(i);
        } else {
            self.token.start_at(i);
        }
    }

    /// Dispatch the current numeric token according to its role.
    fn close_token(&mut self, buf: &[u8]) {
        if let Some(role) = self.role.take() {
            if !self.token.is_empty() {
                let bytes = self.token.bytes(buf);
                match role {
                    TokenRole::Code => self.code = Some(parse_uint(bytes)),
                    TokenRole::AxisX => self.mv.x = Some(parse_float(bytes)),
                    TokenRole::AxisY => self.mv.y = Some(parse_float(bytes)),
                    TokenRole::AxisZ => self.mv.z = Some(parse_float(bytes)),
                    TokenRole::AxisE => self.mv.e = Some(parse_float(bytes)),
                }
            }
        }
        self.token.clear();
    }

    /// Act on a fully decoded instruction.
    fn evaluate_instruction(&mut self) {
        match self.code {
            Some(0) | Some(1) => {
                tracing::trace!(line = self.line, mv = ?self.mv, "linear move");
                self.moves.apply_move(&self.mv);
            }
            Some(90) => self.moves.set_mode(PositioningMode::Absolute),
            Some(91) => self.moves.set_mode(PositioningMode::Relative),
            _ => {}
        }
        self.code = None;
        self.mv = MoveParams::default();
    }

    fn step_comment(&mut self, i: usize, b: u8, buf: &[u8]) {
        if b == b'\n' {
            if self.token.bytes(buf) == MARKER_LAYER_CHANGE {
                self.moves.on_layer_change();
            }
            self.state = ScanState::LineStart;
        } else if !self.token.is_anchored() {
            if !b.is_ascii_whitespace() {
                self.token.start_at(i);
            }
        } else if b == b' ' && self.token.len() > 0 {
            let word = self.token.bytes(buf);
            if word == MARKER_POST_PROCESSED {
                tracing::debug!(line = self.line, "idempotency marker found");
                self.already_processed = true;
            } else if word == MARKER_THUMBNAIL_BEGIN {
                if self.strip_original_thumbnail {
                    self.thumbnail.begin_block(self.line_start);
                }
                self.token.clear();
                self.state = if self.thumbnail.has_payload() {
                    // a second embedded image is skipped entirely
                    ScanState::SeekLineStart
                } else {
                    ScanState::ThumbnailBody
                };
            }
        } else if b == b'=' {
            let key = self.token.bytes(buf);
            match MetadataExtractor::match_key(key) {
                Some(field) if !self.metadata.is_captured(field) => {
                    self.target = Some(field);
                    self.state = ScanState::ParameterValue;
                }
                // unrecognized and duplicate keys resume at the next line
                _ => self.state = ScanState::SeekLineStart,
            }
            self.token.clear();
        } else if !b.is_ascii_whitespace() {
            self.token.extend_to(i);
        }
    }

    fn step_parameter_value(&mut self, i: usize, b: u8) {
        let Some(field) = self.target else {
            self.state = ScanState::SeekLineStart;
            return;
        };
        if b == b'\n' {
            self.target = None;
            self.state = ScanState::LineStart;
        } else if b == b',' && field == MetadataField::NozzleTemperature0 {
            // dual extruder temperatures are comma separated
            self.target = Some(MetadataField::NozzleTemperature1);
        } else {
            let span = self.metadata.field_mut(field);
            if !span.is_anchored() {
                if !b.is_ascii_whitespace() {
                    span.start_at(i);
                }
            } else if !b.is_ascii_whitespace() {
                span.extend_to(i);
            }
        }
    }

    fn step_thumbnail_body(&mut self, i: usize, b: u8, buf: &[u8]) {
        if self.strip_original_thumbnail && b == b'\n' {
            self.thumbnail.count_removed_line();
        }
        if !self.thumbnail.payload_started() {
            // still on the begin marker's line; payload starts after it
            if b == b'\n' {
                self.thumbnail.start_payload(i + 1);
            }
        } else if b == b';' {
            self.token = Span::at(i + 1, 0);
        } else if self.token.is_anchored() {
            if buf[self.token.offset()].is_ascii_whitespace() {
                // slide past leading whitespace after the comment marker
                self.token = Span::at(i, 1);
            } else {
                self.token.grow(1);
                if self.token.bytes(buf) == MARKER_THUMBNAIL_END {
                    self.thumbnail.close_payload(self.line_start);
                    self.token.clear();
                    if self.strip_original_thumbnail {
                        self.thumbnail.close_block(i);
                        self.state = ScanState::ThumbnailTail;
                    } else {
                        self.state = ScanState::SeekLineStart;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(input: &str) -> ScanOutcome {
        Scanner::new(true).scan(input.as_bytes())
    }

    #[test]
    fn test_absolute_moves_bound_extrusion_only() {
        let outcome = scan(
            "G90\n\
             G0 X50 Y50\n\
             G1 X10 Y10 Z0.2 E1.5\n\
             G1 X20 E0.8\n\
             G0 X90 Y90\n",
        );
        let bounds = outcome.bounds;
        assert_eq!(bounds.min_x, Some(10.0));
        assert_eq!(bounds.max_x, Some(50.0));
        assert_eq!(bounds.min_y, Some(10.0));
        assert_eq!(bounds.max_y, Some(50.0));
        assert_eq!(bounds.min_z, Some(0.2));
        assert_eq!(bounds.max_z, Some(0.2));
    }

    #[test]
    fn test_relative_mode_round_trip() {
        let outcome = scan(
            "G90\n\
             G1 X10 Y10 E1\n\
             G91\n\
             G1 X5 E1\n\
             G90\n\
             G1 X8 E1\n",
        );
        assert_eq!(outcome.bounds.max_x, Some(15.0));
        assert_eq!(outcome.bounds.min_x, Some(8.0));
    }

    #[test]
    fn test_layer_change_resets_priming_extents() {
        let outcome = scan(
            "G1 X120 Y2 E5\n\
             ;LAYER_CHANGE\n\
             G1 X10 Y10 E1\n\
             ;LAYER_CHANGE\n\
             G1 X12 Y12 E1\n",
        );
        assert_eq!(outcome.bounds.max_x, Some(12.0));
        assert_eq!(outcome.bounds.min_x, Some(10.0));
    }

    #[test]
    fn test_metadata_capture_and_duplicates() {
        let input = "; filament used [mm] = 1000\n\
                     ; layer_height = 0.2\n\
                     ; layer_height = 0.3\n\
                     ; estimated printing time (normal mode) = 1h30m\n\
                     ; max_print_speed = 100\n";
        let outcome = scan(input);
        let buf = input.as_bytes();
        let meta = &outcome.metadata;
        assert_eq!(meta.get(MetadataField::FilamentUsed).bytes(buf), b"1000");
        assert_eq!(meta.get(MetadataField::LayerHeight).bytes(buf), b"0.2");
        assert_eq!(meta.get(MetadataField::EstimatedTime).bytes(buf), b"1h30m");
        assert_eq!(meta.get(MetadataField::PrintSpeed).bytes(buf), b"100");
        assert!(!meta.is_captured(MetadataField::PlateTemperature));
    }

    #[test]
    fn test_dual_extruder_temperature_split() {
        let input = "; first_layer_temperature = 215,205\n";
        let outcome = scan(input);
        let buf = input.as_bytes();
        assert_eq!(
            outcome
                .metadata
                .get(MetadataField::NozzleTemperature0)
                .bytes(buf),
            b"215"
        );
        assert_eq!(
            outcome
                .metadata
                .get(MetadataField::NozzleTemperature1)
                .bytes(buf),
            b"205"
        );
    }

    #[test]
    fn test_single_extruder_leaves_second_absent() {
        let input = "; first_layer_temperature = 215\n";
        let outcome = scan(input);
        assert!(outcome.metadata.is_captured(MetadataField::NozzleTemperature0));
        assert!(!outcome.metadata.is_captured(MetadataField::NozzleTemperature1));
    }

    #[test]
    fn test_thumbnail_capture_and_reflow() {
        let input = "; thumbnail begin 16x16 20\n\
                     ; iVBORw0KGgo=\n\
                     ; AAAA+/42\n\
                     ; thumbnail end\n\
                     G1 X1 Y1 E1\n";
        let outcome = scan(input);
        let buf = input.as_bytes();
        assert!(outcome.thumbnail.has_payload());
        assert_eq!(outcome.thumbnail.reflow(buf), b"iVBORw0KGgo=AAAA+/42");
        // block covers the whole marker-delimited region including its newline
        let block = outcome.thumbnail.original_block();
        assert_eq!(block.offset(), 0);
        assert_eq!(
            block.bytes(buf),
            "; thumbnail begin 16x16 20\n; iVBORw0KGgo=\n; AAAA+/42\n; thumbnail end\n".as_bytes()
        );
        assert_eq!(outcome.thumbnail.removed_lines(), 4);
    }

    #[test]
    fn test_second_thumbnail_is_skipped() {
        let input = "; thumbnail begin 16x16 8\n\
                     ; AAAA\n\
                     ; thumbnail end\n\
                     ; thumbnail begin 32x32 8\n\
                     ; BBBB\n\
                     ; thumbnail end\n";
        let outcome = scan(input);
        assert_eq!(outcome.thumbnail.reflow(input.as_bytes()), b"AAAA");
    }

    #[test]
    fn test_idempotency_marker_stops_scan() {
        let outcome = scan(
            ";post-processed by sm2pspp 1.2.0 (https://github.com/daniel-starke/sm2pspp)\n\
             ; layer_height = 0.2\n",
        );
        assert!(outcome.already_processed);
        assert!(!outcome.metadata.is_captured(MetadataField::LayerHeight));
    }

    #[test]
    fn test_line_counting_with_crlf() {
        let outcome = scan("G90\r\nG1 X1 Y1 E1\r\n; layer_height = 0.2\r\n");
        assert_eq!(outcome.line_count, 4);
        assert_eq!(outcome.bounds.max_x, Some(1.0));
    }

    #[test]
    fn test_first_layer_height_lowers_min_z() {
        let outcome = scan(
            "; first_layer_height = 0.3\n\
             G1 X1 Y1 Z0.3 E1\n\
             G1 Z0.5 E1\n",
        );
        assert!((outcome.bounds.min_z.unwrap() - 0.0).abs() < 1e-9);
        assert_eq!(outcome.bounds.max_z, Some(0.5));
    }

    #[test]
    fn test_unrecognized_lines_are_ignored() {
        let outcome = scan(
            "M104 S210\n\
             T0\n\
             G28 X0\n\
             G1 X10 Y10 E1\n",
        );
        assert_eq!(outcome.bounds.max_x, Some(10.0));
        assert_eq!(outcome.line_count, 5);
    }

    #[test]
    fn test_missing_trailing_newline_still_evaluates() {
        let outcome = scan("G1 X3 Y4 E1");
        assert_eq!(outcome.bounds.max_x, Some(3.0));
        assert_eq!(outcome.bounds.max_y, Some(4.0));
    }

    #[test]
    fn test_negative_coordinates() {
        let outcome = scan("G1 X-5 Y-2.5 E1\n");
        assert_eq!(outcome.bounds.min_x, Some(-5.0));
        assert_eq!(outcome.bounds.min_y, Some(-2.5));
    }

    #[test]
    fn test_inline_comment_ends_instruction() {
        let outcome = scan("G1 X7 E1 ; perimeter\n");
        assert_eq!(outcome.bounds.max_x, Some(7.0));
    }
}
