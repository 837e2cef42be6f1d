//! File processing orchestration: read, scan, rewrite in place.
//!
//! Processing is two-phase and non-transactional: the whole file is read into
//! memory, scanned once, and then the same path is reopened truncating. A
//! write failure therefore leaves the file truncated or partially written;
//! callers needing stronger guarantees must keep their own backup. The only
//! cancellation point is the diagnostic callback, which can abort before the
//! write phase begins but never during it.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::error::{Diagnostic, DiagnosticKind, ProcessError, ProcessStatus, Result};
use crate::header::{render_header, HeaderFields};
use crate::number::{parse_duration_secs, parse_float};
use crate::scanner::metadata::MetadataField;
use crate::scanner::{ScanOutcome, Scanner};

/// Readable-source / writable-sink abstraction over the processed file.
///
/// The filesystem implementation is the production path; tests substitute an
/// in-memory port to exercise processing without touching disk.
pub trait FilePort {
    /// Read the entire file into memory.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Open the file for writing, truncating any existing content.
    fn create(&self, path: &Path) -> io::Result<Box<dyn Write>>;
}

/// Filesystem-backed [`FilePort`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FsPort;

impl FilePort for FsPort {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn Write>> {
        Ok(Box::new(BufWriter::new(File::create(path)?)))
    }
}

/// Runtime processing options.
#[derive(Debug, Clone, Copy)]
pub struct ProcessOptions {
    /// Excise the original thumbnail block from the rewritten file. The
    /// re-flowed copy in the synthesized header is emitted either way.
    pub strip_original_thumbnail: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            strip_original_thumbnail: true,
        }
    }
}

/// In-place G-code post-processor.
pub struct Processor<P: FilePort = FsPort> {
    port: P,
    options: ProcessOptions,
}

impl Processor<FsPort> {
    /// Create a filesystem-backed processor.
    pub fn new(options: ProcessOptions) -> Self {
        Self::with_port(FsPort, options)
    }
}

impl<P: FilePort> Processor<P> {
    /// Create a processor over an explicit file port.
    pub fn with_port(port: P, options: ProcessOptions) -> Self {
        Self { port, options }
    }

    /// Process the file at `path` in place.
    ///
    /// `on_diagnostic` is invoked for every diagnostic together with the
    /// processed path. For warnings its return value decides whether
    /// processing continues; for fatal conditions it is informational only
    /// and the return value is ignored.
    pub fn process<F>(&self, path: &Path, mut on_diagnostic: F) -> Result<ProcessStatus>
    where
        F: FnMut(&Diagnostic, &Path) -> bool,
    {
        let buf = match self.port.read(path) {
            Ok(buf) => buf,
            Err(source) => {
                let kind = if source.kind() == io::ErrorKind::NotFound {
                    DiagnosticKind::FileNotFound
                } else {
                    DiagnosticKind::FileOpen
                };
                return Err(self.fatal(kind, source, path, &mut on_diagnostic));
            }
        };
        if buf.is_empty() {
            return Ok(ProcessStatus::EmptyInput);
        }

        let outcome = Scanner::new(self.options.strip_original_thumbnail).scan(&buf);
        if outcome.already_processed {
            tracing::info!(path = %path.display(), "file already post-processed");
            return Ok(ProcessStatus::AlreadyProcessed);
        }

        self.check_missing(&outcome, path, &mut on_diagnostic)?;

        let fields = self.header_fields(&buf, &outcome);
        let header = render_header(&fields);
        self.rewrite(path, &buf, &outcome, &header, &mut on_diagnostic)?;

        tracing::info!(
            path = %path.display(),
            lines = outcome.line_count,
            bounds = ?outcome.bounds,
            "rewrote file with synthesized header"
        );
        Ok(ProcessStatus::Rewritten)
    }

    /// Report each missing metadata field; the callback decides continuation.
    fn check_missing<F>(&self, outcome: &ScanOutcome, path: &Path, on_diagnostic: &mut F) -> Result<()>
    where
        F: FnMut(&Diagnostic, &Path) -> bool,
    {
        let checks = [
            (MetadataField::FilamentUsed, DiagnosticKind::NoFilamentUsed),
            (MetadataField::LayerHeight, DiagnosticKind::NoLayerHeight),
            (MetadataField::EstimatedTime, DiagnosticKind::NoEstimatedTime),
            (
                MetadataField::NozzleTemperature0,
                DiagnosticKind::NoNozzleTemperature,
            ),
            (
                MetadataField::PlateTemperature,
                DiagnosticKind::NoPlateTemperature,
            ),
            (MetadataField::PrintSpeed, DiagnosticKind::NoPrintSpeed),
        ];
        for (field, kind) in checks {
            if !outcome.metadata.is_captured(field) {
                self.warn(kind, path, on_diagnostic)?;
            }
        }
        if !outcome.thumbnail.has_payload() {
            self.warn(DiagnosticKind::NoThumbnail, path, on_diagnostic)?;
        }
        Ok(())
    }

    fn warn<F>(&self, kind: DiagnosticKind, path: &Path, on_diagnostic: &mut F) -> Result<()>
    where
        F: FnMut(&Diagnostic, &Path) -> bool,
    {
        tracing::warn!(path = %path.display(), %kind, "metadata missing");
        let diagnostic = Diagnostic::new(kind);
        if on_diagnostic(&diagnostic, path) {
            Ok(())
        } else {
            Err(ProcessError::Aborted {
                diagnostic,
                path: path.to_path_buf(),
            })
        }
    }

    /// Resolve the captured spans into header values.
    fn header_fields(&self, buf: &[u8], outcome: &ScanOutcome) -> HeaderFields {
        let meta = &outcome.metadata;
        let float = |field: MetadataField| parse_float(meta.get(field).bytes(buf));
        let excised_lines = if self.excises_thumbnail(outcome) {
            outcome.thumbnail.removed_lines()
        } else {
            0
        };
        // the scan counter is newlines plus one; a trailing newline means the
        // final counted line holds no content
        let newline_terminated = buf.last() == Some(&b'\n');
        let content_lines = outcome.line_count - u64::from(newline_terminated) - excised_lines;
        HeaderFields {
            filament_used_mm: float(MetadataField::FilamentUsed),
            layer_height: float(MetadataField::LayerHeight),
            estimated_time_secs: parse_duration_secs(
                meta.get(MetadataField::EstimatedTime).bytes(buf),
            ),
            nozzle_temperature: [
                float(MetadataField::NozzleTemperature0),
                float(MetadataField::NozzleTemperature1),
            ],
            plate_temperature: float(MetadataField::PlateTemperature),
            print_speed_mm_s: float(MetadataField::PrintSpeed),
            bounds: outcome.bounds,
            thumbnail_base64: outcome
                .thumbnail
                .has_payload()
                .then(|| outcome.thumbnail.reflow(buf)),
            content_lines,
        }
    }

    /// Whether the original thumbnail block will be cut from the output.
    fn excises_thumbnail(&self, outcome: &ScanOutcome) -> bool {
        self.options.strip_original_thumbnail && !outcome.thumbnail.original_block().is_empty()
    }

    /// Truncating rewrite: header first, then the original bytes.
    fn rewrite<F>(
        &self,
        path: &Path,
        buf: &[u8],
        outcome: &ScanOutcome,
        header: &[u8],
        on_diagnostic: &mut F,
    ) -> Result<()>
    where
        F: FnMut(&Diagnostic, &Path) -> bool,
    {
        let mut out = match self.port.create(path) {
            Ok(out) => out,
            Err(source) => {
                return Err(self.fatal(DiagnosticKind::FileCreate, source, path, on_diagnostic))
            }
        };
        self.write_content(&mut out, buf, outcome, header)
            .map_err(|source| self.fatal(DiagnosticKind::FileWrite, source, path, on_diagnostic))
    }

    fn write_content(
        &self,
        out: &mut dyn Write,
        buf: &[u8],
        outcome: &ScanOutcome,
        header: &[u8],
    ) -> io::Result<()> {
        out.write_all(header)?;
        if self.excises_thumbnail(outcome) {
            let block = outcome.thumbnail.original_block();
            out.write_all(&buf[..block.offset()])?;
            out.write_all(&buf[block.end()..])?;
        } else {
            out.write_all(buf)?;
        }
        out.flush()
    }

    /// Report a fatal condition through the callback and build the error.
    fn fatal<F>(
        &self,
        kind: DiagnosticKind,
        source: io::Error,
        path: &Path,
        on_diagnostic: &mut F,
    ) -> ProcessError
    where
        F: FnMut(&Diagnostic, &Path) -> bool,
    {
        on_diagnostic(&Diagnostic::new(kind), path);
        ProcessError::Fatal {
            kind,
            path: path.to_path_buf(),
            source,
        }
    }
}
