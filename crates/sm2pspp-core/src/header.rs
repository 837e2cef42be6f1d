//! Snapmaker terminal header synthesis.
//!
//! After the scan completes, the rewriter prepends a fixed-structure comment
//! header that the Snapmaker 2.0 terminal reads to display print information.
//! Field wording and blank-line placement follow what the terminal firmware
//! expects; absent metadata renders as zero.

use crate::scanner::moves::BoundingBox;

/// Name emitted in the post-processed marker line.
pub const TOOL_NAME: &str = "sm2pspp";
/// Project URL emitted in the post-processed marker line.
pub const TOOL_URL: &str = "https://github.com/daniel-starke/sm2pspp";
/// Version emitted in the post-processed marker line.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Second-extruder temperatures at or below this are treated as "not set"
/// and produce no `nozzle_1_temperature` line.
const SECOND_NOZZLE_MIN_C: f64 = 0.05;

/// Resolved values feeding the synthesized header.
#[derive(Debug, Clone, Default)]
pub struct HeaderFields {
    /// Filament usage in millimeters; emitted in meters.
    pub filament_used_mm: f64,
    /// Layer height in millimeters.
    pub layer_height: f64,
    /// Estimated print time in seconds.
    pub estimated_time_secs: u64,
    /// First-layer nozzle temperatures for extruder 0 and 1, in °C.
    pub nozzle_temperature: [f64; 2],
    /// First-layer build plate temperature in °C.
    pub plate_temperature: f64,
    /// Maximum print speed in mm/s; emitted in mm/minute.
    pub print_speed_mm_s: f64,
    /// Extents of all extrusion moves.
    pub bounds: BoundingBox,
    /// Re-flowed base64 thumbnail payload, if one was captured.
    pub thumbnail_base64: Option<Vec<u8>>,
    /// Count of content lines emitted after the header.
    pub content_lines: u64,
}

/// Render the complete replacement header.
///
/// The `file_total_lines` field reports the number of header lines actually
/// emitted plus the content lines that follow, so conditional lines (the
/// thumbnail and the second nozzle temperature) are accounted for without a
/// tuned constant.
pub fn render_header(fields: &HeaderFields) -> Vec<u8> {
    let mut head = String::new();
    head.push_str(&format!(
        ";post-processed by {TOOL_NAME} {TOOL_VERSION} ({TOOL_URL})\n"
    ));
    head.push_str(";Header Start\n\n");
    head.push_str(";FLAVOR:Marlin\n");
    head.push_str(";TIME:6666\n\n\n");
    head.push_str(&format!(
        ";Filament used: {:.0}m\n",
        fields.filament_used_mm / 1000.0
    ));
    head.push_str(&format!(";Layer height: {:.2}\n", fields.layer_height));
    head.push_str(";header_type: 3dp\n");

    let mut tail = String::new();
    tail.push_str(&format!(
        ";estimated_time(s): {}\n",
        fields.estimated_time_secs
    ));
    tail.push_str(&format!(
        ";nozzle_temperature(°C): {:.0}\n",
        fields.nozzle_temperature[0]
    ));
    if fields.nozzle_temperature[1] > SECOND_NOZZLE_MIN_C {
        tail.push_str(&format!(
            ";nozzle_1_temperature(°C): {:.0}\n",
            fields.nozzle_temperature[1]
        ));
    }
    tail.push_str(&format!(
        ";build_plate_temperature(°C): {:.0}\n",
        fields.plate_temperature
    ));
    tail.push_str(&format!(
        ";work_speed(mm/minute): {:.0}\n",
        fields.print_speed_mm_s * 60.0
    ));
    let bounds = &fields.bounds;
    tail.push_str(&format!(";max_x(mm): {:.2}\n", bounds.max_x.unwrap_or(0.0)));
    tail.push_str(&format!(";max_y(mm): {:.2}\n", bounds.max_y.unwrap_or(0.0)));
    tail.push_str(&format!(";max_z(mm): {:.2}\n", bounds.max_z.unwrap_or(0.0)));
    tail.push_str(&format!(";min_x(mm): {:.2}\n", bounds.min_x.unwrap_or(0.0)));
    tail.push_str(&format!(";min_y(mm): {:.2}\n", bounds.min_y.unwrap_or(0.0)));
    tail.push_str(&format!(
        ";min_z(mm): {:.2}\n\n",
        bounds.min_z.unwrap_or(0.0)
    ));
    tail.push_str(";Header End\n\n");

    let newlines = |s: &str| s.bytes().filter(|&b| b == b'\n').count() as u64;
    let thumbnail_lines = u64::from(fields.thumbnail_base64.is_some());
    // the file_total_lines line itself is part of the header
    let header_lines = newlines(&head) + thumbnail_lines + 1 + newlines(&tail);
    let total_lines = header_lines + fields.content_lines;

    let mut out = Vec::with_capacity(
        head.len()
            + tail.len()
            + fields
                .thumbnail_base64
                .as_ref()
                .map_or(0, |payload| payload.len() + 40)
            + 32,
    );
    out.extend_from_slice(head.as_bytes());
    if let Some(payload) = &fields.thumbnail_base64 {
        out.extend_from_slice(b";thumbnail: data:image/png;base64,");
        out.extend_from_slice(payload);
        out.push(b'\n');
    }
    out.extend_from_slice(format!(";file_total_lines: {total_lines}\n").as_bytes());
    out.extend_from_slice(tail.as_bytes());
    out
}
