use std::path::{Path, PathBuf};
use std::process::ExitCode;

use sm2pspp::{init_logging, Diagnostic, ProcessOptions, Processor, Severity};

/// Write the help for this application to standard error.
fn print_help() {
    eprintln!("sm2pspp <g-code file>");
    eprintln!();
    eprintln!("sm2pspp {} ({})", sm2pspp::VERSION, sm2pspp::BUILD_DATE);
    eprintln!("{}", sm2pspp::TOOL_URL);
}

/// Print a diagnostic to standard error; warnings never abort processing.
fn report_diagnostic(diagnostic: &Diagnostic, path: &Path) -> bool {
    let severity = match diagnostic.kind.severity() {
        Severity::Warning => "Warning",
        Severity::Fatal => "Error",
    };
    if diagnostic.line > 0 {
        eprintln!(
            "{}:{}: {}: {}",
            path.display(),
            diagnostic.line,
            severity,
            diagnostic.kind
        );
    } else {
        eprintln!("{}: {}: {}", path.display(), severity, diagnostic.kind);
    }
    true
}

fn main() -> ExitCode {
    if let Err(err) = init_logging() {
        eprintln!("Error: failed to initialize logging: {err}");
        return ExitCode::FAILURE;
    }

    let mut args = std::env::args_os().skip(1);
    let file = match (args.next(), args.next()) {
        (Some(file), None) => file,
        _ => {
            print_help();
            return ExitCode::FAILURE;
        }
    };
    let path = PathBuf::from(file);

    let processor = Processor::new(ProcessOptions::default());
    match processor.process(&path, report_diagnostic) {
        Ok(_) => ExitCode::SUCCESS,
        // fatal and aborted conditions were already reported via the callback
        Err(_) => ExitCode::FAILURE,
    }
}
