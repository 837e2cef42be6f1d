//! Diagnostics and processing results.
//!
//! Processing reports two severities of diagnostics through a caller-supplied
//! callback: fatal I/O conditions that always abort, and per-field warnings
//! where the callback's return value decides whether processing continues.
//! All error types use `thiserror` for ergonomic error handling.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Severity of a diagnostic raised during processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Processing may continue if the callback allows it.
    Warning,
    /// Processing aborts regardless of the callback's return value.
    Fatal,
}

/// Diagnostic conditions reported through the processing callback.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// The input file does not exist.
    #[error("Input file not found.")]
    FileNotFound,

    /// The input file could not be opened for reading.
    #[error("Failed to open file for reading.")]
    FileOpen,

    /// Reading the input file failed.
    #[error("Failed to read data from file.")]
    FileRead,

    /// The output file could not be created.
    #[error("Failed to create file for writing.")]
    FileCreate,

    /// Writing the output file failed.
    #[error("Failed to write data to file.")]
    FileWrite,

    /// No `filament used [mm]` value was found.
    #[error("Filament used value not found.")]
    NoFilamentUsed,

    /// No `layer_height` value was found.
    #[error("Layer height value not found.")]
    NoLayerHeight,

    /// No estimated printing time value was found.
    #[error("Estimated time value not found.")]
    NoEstimatedTime,

    /// No first-layer nozzle temperature was found.
    #[error("Nozzle temperature value not found.")]
    NoNozzleTemperature,

    /// No first-layer bed temperature was found.
    #[error("Building plate temperature value not found.")]
    NoPlateTemperature,

    /// No maximum print speed was found.
    #[error("Print speed value not found.")]
    NoPrintSpeed,

    /// No embedded thumbnail was found.
    #[error("Thumbnail data not found.")]
    NoThumbnail,
}

impl DiagnosticKind {
    /// Severity of this diagnostic.
    pub fn severity(&self) -> Severity {
        match self {
            Self::FileNotFound
            | Self::FileOpen
            | Self::FileRead
            | Self::FileCreate
            | Self::FileWrite => Severity::Fatal,
            _ => Severity::Warning,
        }
    }
}

/// A diagnostic raised against the processed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Diagnostic {
    /// What happened.
    pub kind: DiagnosticKind,
    /// 1-based input line number, or 0 when not line-specific.
    pub line: u64,
}

impl Diagnostic {
    /// Create a diagnostic that is not tied to a specific line.
    pub fn new(kind: DiagnosticKind) -> Self {
        Self { kind, line: 0 }
    }
}

/// Terminal processing failures.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// A fatal I/O condition ended processing.
    #[error("{}: {kind}", path.display())]
    Fatal {
        /// The fatal condition.
        kind: DiagnosticKind,
        /// The file being processed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The diagnostic callback requested an abort on a warning.
    #[error("{}: aborted after: {}", path.display(), diagnostic.kind)]
    Aborted {
        /// The warning the caller aborted on.
        diagnostic: Diagnostic,
        /// The file being processed.
        path: PathBuf,
    },
}

/// Successful processing outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// The header was synthesized and the file rewritten in place.
    Rewritten,
    /// The idempotency marker was found; the file was left untouched.
    AlreadyProcessed,
    /// The input file was empty; nothing to do.
    EmptyInput,
}

/// Result type for processing operations.
pub type Result<T> = std::result::Result<T, ProcessError>;
