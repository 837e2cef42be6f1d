//! # sm2pspp-core
//!
//! Single-pass scanner and header rewriter that converts PrusaSlicer
//! generated G-code for the Snapmaker 2.0 terminal.
//!
//! One forward scan over the input buffer simultaneously:
//! - tokenizes the instruction stream and computes the bounding box of all
//!   material-depositing moves,
//! - extracts structured metadata from slicer comment lines,
//! - locates the embedded base64 preview image,
//!
//! after which a replacement header is synthesized and the file rewritten in
//! place, leaving every executable instruction byte-for-byte untouched.

pub mod error;
pub mod header;
pub mod number;
pub mod process;
pub mod scanner;
pub mod span;

pub use error::{Diagnostic, DiagnosticKind, ProcessError, ProcessStatus, Result, Severity};
pub use header::{render_header, HeaderFields, TOOL_NAME, TOOL_URL, TOOL_VERSION};
pub use process::{FilePort, FsPort, ProcessOptions, Processor};
pub use scanner::metadata::{MetadataExtractor, MetadataField};
pub use scanner::moves::{BoundingBox, MoveParams, MoveTracker, Position, PositioningMode};
pub use scanner::thumbnail::ThumbnailLocator;
pub use scanner::{ScanOutcome, Scanner};
