//! # sm2pspp
//!
//! In-place post-processor that rewrites the metadata header of PrusaSlicer
//! generated G-code so the Snapmaker 2.0 terminal can consume it. The
//! executable instructions are left untouched; only the header comment block
//! is synthesized, the embedded thumbnail is re-flowed, and the bounding box
//! of the printed object is computed from the instruction stream.
//!
//! The heavy lifting lives in the `sm2pspp-core` crate; this crate wires it
//! to the command line.

pub use sm2pspp_core::{
    BoundingBox, Diagnostic, DiagnosticKind, FilePort, FsPort, MoveTracker, Position,
    PositioningMode, ProcessError, ProcessOptions, ProcessStatus, Processor, Scanner, Severity,
    TOOL_NAME, TOOL_URL, TOOL_VERSION,
};

/// Binary version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time).
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration.
///
/// Sets up structured logging to standard error with `RUST_LOG` environment
/// variable support. Defaults to warnings only so normal runs stay quiet on
/// the console.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
