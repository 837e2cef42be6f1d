//! End-to-end processing tests over real files and an in-memory port.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use sm2pspp_core::{
    Diagnostic, DiagnosticKind, FilePort, ProcessError, ProcessOptions, ProcessStatus, Processor,
};

const SAMPLE: &str = "; generated by PrusaSlicer 2.6.0\n\
                      ; thumbnail begin 16x16 24\n\
                      ; iVBORw0KGgoAAAANSUhEUg\n\
                      ; AA+/==\n\
                      ; thumbnail end\n\
                      ;\n\
                      M104 S215\n\
                      G90\n\
                      G28\n\
                      G1 X10 Y10 Z0.2 E1\n\
                      ;LAYER_CHANGE\n\
                      G1 X10 Y10 Z0.2 E1\n\
                      G1 X50 Y60 E2.5\n\
                      ; filament used [mm] = 2534.7\n\
                      ; first_layer_height = 0.2\n\
                      ; layer_height = 0.2\n\
                      ; estimated printing time (normal mode) = 1h30m0s\n\
                      ; first_layer_temperature = 215\n\
                      ; first_layer_bed_temperature = 60\n\
                      ; max_print_speed = 100\n";

fn write_sample(dir: &tempfile::TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("part.gcode");
    std::fs::write(&path, content).unwrap();
    path
}

fn keep_going(_diagnostic: &Diagnostic, _path: &Path) -> bool {
    true
}

#[test]
fn test_rewrite_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample(&dir, SAMPLE);

    let processor = Processor::new(ProcessOptions::default());
    let status = processor.process(&path, keep_going).unwrap();
    assert_eq!(status, ProcessStatus::Rewritten);

    let output = std::fs::read_to_string(&path).unwrap();
    assert!(output.starts_with(";post-processed by sm2pspp "));
    assert!(output.contains(";Header Start\n"));
    assert!(output.contains(";Filament used: 3m\n"));
    assert!(output.contains(";Layer height: 0.20\n"));
    assert!(output.contains(";estimated_time(s): 5400\n"));
    assert!(output.contains(";nozzle_temperature(°C): 215\n"));
    assert!(!output.contains(";nozzle_1_temperature"));
    assert!(output.contains(";build_plate_temperature(°C): 60\n"));
    assert!(output.contains(";work_speed(mm/minute): 6000\n"));
    // priming moves before the first layer change are excluded
    assert!(output.contains(";max_x(mm): 50.00\n"));
    assert!(output.contains(";max_y(mm): 60.00\n"));
    assert!(output.contains(";max_z(mm): 0.20\n"));
    assert!(output.contains(";min_x(mm): 10.00\n"));
    assert!(output.contains(";min_y(mm): 10.00\n"));
    assert!(output.contains(";min_z(mm): 0.20\n"));
    // both payload lines re-flowed onto the single header line
    assert!(output.contains(";thumbnail: data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAA+/==\n"));
    // the original block is gone, the surrounding lines are untouched
    assert!(!output.contains("thumbnail begin"));
    assert!(output.contains("; generated by PrusaSlicer 2.6.0\n;\nM104 S215\n"));
    assert!(output.ends_with("; max_print_speed = 100\n"));
    // 25 header lines plus the 16 remaining content lines
    assert!(output.contains(";file_total_lines: 41\n"));
}

#[test]
fn test_reprocessing_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample(&dir, SAMPLE);

    let processor = Processor::new(ProcessOptions::default());
    processor.process(&path, keep_going).unwrap();
    let first_pass = std::fs::read(&path).unwrap();

    let status = processor.process(&path, keep_going).unwrap();
    assert_eq!(status, ProcessStatus::AlreadyProcessed);
    assert_eq!(std::fs::read(&path).unwrap(), first_pass);
}

#[test]
fn test_missing_metadata_reports_all_warnings() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample(&dir, "G90\nG1 X1 Y1 Z0.2 E1\n");

    let mut reported = Vec::new();
    let processor = Processor::new(ProcessOptions::default());
    let status = processor
        .process(&path, |diagnostic: &Diagnostic, _path: &Path| {
            reported.push(diagnostic.kind);
            true
        })
        .unwrap();
    assert_eq!(status, ProcessStatus::Rewritten);
    assert_eq!(
        reported,
        vec![
            DiagnosticKind::NoFilamentUsed,
            DiagnosticKind::NoLayerHeight,
            DiagnosticKind::NoEstimatedTime,
            DiagnosticKind::NoNozzleTemperature,
            DiagnosticKind::NoPlateTemperature,
            DiagnosticKind::NoPrintSpeed,
            DiagnosticKind::NoThumbnail,
        ]
    );

    let output = std::fs::read_to_string(&path).unwrap();
    assert!(output.contains(";Filament used: 0m\n"));
    assert!(output.contains(";max_x(mm): 1.00\n"));
    assert!(!output.contains(";thumbnail:"));
}

#[test]
fn test_abort_on_warning_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let input = "G1 X1 Y1 E1\n";
    let path = write_sample(&dir, input);

    let processor = Processor::new(ProcessOptions::default());
    let err = processor
        .process(&path, |_diagnostic: &Diagnostic, _path: &Path| false)
        .unwrap_err();
    match err {
        ProcessError::Aborted { diagnostic, .. } => {
            assert_eq!(diagnostic.kind, DiagnosticKind::NoFilamentUsed);
        }
        other => panic!("expected abort, got {other:?}"),
    }
    assert_eq!(std::fs::read_to_string(&path).unwrap(), input);
}

#[test]
fn test_missing_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.gcode");

    let mut reported = Vec::new();
    let processor = Processor::new(ProcessOptions::default());
    let err = processor
        .process(&path, |diagnostic: &Diagnostic, _path: &Path| {
            reported.push(diagnostic.kind);
            true
        })
        .unwrap_err();
    match err {
        ProcessError::Fatal { kind, .. } => assert_eq!(kind, DiagnosticKind::FileNotFound),
        other => panic!("expected fatal error, got {other:?}"),
    }
    assert_eq!(reported, vec![DiagnosticKind::FileNotFound]);
}

#[test]
fn test_empty_file_is_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample(&dir, "");

    let processor = Processor::new(ProcessOptions::default());
    let status = processor.process(&path, keep_going).unwrap();
    assert_eq!(status, ProcessStatus::EmptyInput);
    assert!(std::fs::read(&path).unwrap().is_empty());
}

/// In-memory [`FilePort`] for exercising processing without the filesystem.
#[derive(Clone, Default)]
struct MemoryPort {
    input: Vec<u8>,
    output: Arc<Mutex<Vec<u8>>>,
}

struct MemoryWriter(Arc<Mutex<Vec<u8>>>);

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl FilePort for MemoryPort {
    fn read(&self, _path: &Path) -> io::Result<Vec<u8>> {
        Ok(self.input.clone())
    }

    fn create(&self, _path: &Path) -> io::Result<Box<dyn Write>> {
        Ok(Box::new(MemoryWriter(Arc::clone(&self.output))))
    }
}

#[test]
fn test_keeping_original_thumbnail() {
    let port = MemoryPort {
        input: SAMPLE.as_bytes().to_vec(),
        ..Default::default()
    };
    let output = Arc::clone(&port.output);
    let processor = Processor::with_port(
        port,
        ProcessOptions {
            strip_original_thumbnail: false,
        },
    );
    let status = processor
        .process(Path::new("part.gcode"), keep_going)
        .unwrap();
    assert_eq!(status, ProcessStatus::Rewritten);

    let output = String::from_utf8(output.lock().unwrap().clone()).unwrap();
    // original block stays, and the header still carries the re-flowed copy
    assert!(output.contains("; thumbnail begin 16x16 24\n"));
    assert!(output.contains(";thumbnail: data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAA+/==\n"));
    // no lines excised, so four more content lines than the stripping run
    assert!(output.contains(";file_total_lines: 45\n"));
}
