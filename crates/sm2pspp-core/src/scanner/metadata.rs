//! Metadata extraction from slicer comment lines.
//!
//! PrusaSlicer embeds print settings as `; key = value` comment lines. The
//! scanner hands the key text to [`MetadataExtractor::match_key`] and then
//! accumulates the value span directly into the matched field. The first
//! occurrence of each key wins; duplicates are ignored.

use crate::span::Span;

/// One recognized comment key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    /// `filament used [mm]`
    FilamentUsed,
    /// `first_layer_height`
    FirstLayerHeight,
    /// `layer_height`
    LayerHeight,
    /// Any key starting with `estimated printing time`; the full key varies
    /// by print mode.
    EstimatedTime,
    /// First value of `first_layer_temperature`.
    NozzleTemperature0,
    /// Second, comma-separated value of `first_layer_temperature`.
    NozzleTemperature1,
    /// `first_layer_bed_temperature`
    PlateTemperature,
    /// `max_print_speed`
    PrintSpeed,
}

/// Captured metadata value spans.
#[derive(Debug, Default)]
pub struct MetadataExtractor {
    filament_used: Span,
    first_layer_height: Span,
    layer_height: Span,
    estimated_time: Span,
    nozzle_temperature: [Span; 2],
    plate_temperature: Span,
    print_speed: Span,
}

impl MetadataExtractor {
    /// Create an extractor with every field absent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a comment key (the text before `=`, trailing whitespace trimmed)
    /// to its field, if recognized.
    pub fn match_key(key: &[u8]) -> Option<MetadataField> {
        match key {
            b"filament used [mm]" => Some(MetadataField::FilamentUsed),
            b"first_layer_height" => Some(MetadataField::FirstLayerHeight),
            b"layer_height" => Some(MetadataField::LayerHeight),
            b"first_layer_temperature" => Some(MetadataField::NozzleTemperature0),
            b"first_layer_bed_temperature" => Some(MetadataField::PlateTemperature),
            b"max_print_speed" => Some(MetadataField::PrintSpeed),
            _ if key.starts_with(b"estimated printing time") => {
                Some(MetadataField::EstimatedTime)
            }
            _ => None,
        }
    }

    /// The captured span for `field` (possibly absent).
    pub fn get(&self, field: MetadataField) -> Span {
        *self.field(field)
    }

    /// Whether `field` already holds a value.
    pub fn is_captured(&self, field: MetadataField) -> bool {
        !self.field(field).is_empty()
    }

    fn field(&self, field: MetadataField) -> &Span {
        match field {
            MetadataField::FilamentUsed => &self.filament_used,
            MetadataField::FirstLayerHeight => &self.first_layer_height,
            MetadataField::LayerHeight => &self.layer_height,
            MetadataField::EstimatedTime => &self.estimated_time,
            MetadataField::NozzleTemperature0 => &self.nozzle_temperature[0],
            MetadataField::NozzleTemperature1 => &self.nozzle_temperature[1],
            MetadataField::PlateTemperature => &self.plate_temperature,
            MetadataField::PrintSpeed => &self.print_speed,
        }
    }

    /// Mutable access used by the scanner while accumulating a value.
    pub(crate) fn field_mut(&mut self, field: MetadataField) -> &mut Span {
        match field {
            MetadataField::FilamentUsed => &mut self.filament_used,
            MetadataField::FirstLayerHeight => &mut self.first_layer_height,
            MetadataField::LayerHeight => &mut self.layer_height,
            MetadataField::EstimatedTime => &mut self.estimated_time,
            MetadataField::NozzleTemperature0 => &mut self.nozzle_temperature[0],
            MetadataField::NozzleTemperature1 => &mut self.nozzle_temperature[1],
            MetadataField::PlateTemperature => &mut self.plate_temperature,
            MetadataField::PrintSpeed => &mut self.print_speed,
        }
    }
}
