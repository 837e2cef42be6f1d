//! Position and bounding-box tracking for extrusion moves.
//!
//! The scanner feeds every fully decoded `G0`/`G1` instruction into the
//! [`MoveTracker`], which maintains the current tool position and the running
//! extents of all material-depositing motion.

use serde::{Deserialize, Serialize};

/// How X/Y/Z parameters combine with the current position.
///
/// Distance mode is modal: `G90` selects absolute coordinates, `G91`
/// incremental, and the selection persists until changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PositioningMode {
    /// Coordinates are absolute machine positions (G90, the default).
    #[default]
    Absolute,
    /// Coordinates are deltas from the current position (G91).
    Relative,
}

/// Current tool position.
///
/// Each axis stays unset until an instruction supplies it; unset is distinct
/// from zero and never participates in extent comparisons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate in mm, if any move has set it.
    pub x: Option<f64>,
    /// Y coordinate in mm, if any move has set it.
    pub y: Option<f64>,
    /// Z coordinate in mm, if any move has set it.
    pub z: Option<f64>,
}

/// Running min/max extents of extrusion moves, per axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum X extent in mm.
    pub min_x: Option<f64>,
    /// Maximum X extent in mm.
    pub max_x: Option<f64>,
    /// Minimum Y extent in mm.
    pub min_y: Option<f64>,
    /// Maximum Y extent in mm.
    pub max_y: Option<f64>,
    /// Minimum Z extent in mm.
    pub min_z: Option<f64>,
    /// Maximum Z extent in mm.
    pub max_z: Option<f64>,
}

impl BoundingBox {
    fn fold(min: &mut Option<f64>, max: &mut Option<f64>, value: f64) {
        *min = Some(min.map_or(value, |m| m.min(value)));
        *max = Some(max.map_or(value, |m| m.max(value)));
    }

    /// Fold an X coordinate into the extents.
    pub fn include_x(&mut self, value: f64) {
        Self::fold(&mut self.min_x, &mut self.max_x, value);
    }

    /// Fold a Y coordinate into the extents.
    pub fn include_y(&mut self, value: f64) {
        Self::fold(&mut self.min_y, &mut self.max_y, value);
    }

    /// Fold a Z coordinate into the extents.
    pub fn include_z(&mut self, value: f64) {
        Self::fold(&mut self.min_z, &mut self.max_z, value);
    }

    /// Fold every set axis of `position` into the extents.
    pub fn include(&mut self, position: &Position) {
        if let Some(x) = position.x {
            self.include_x(x);
        }
        if let Some(y) = position.y {
            self.include_y(y);
        }
        if let Some(z) = position.z {
            self.include_z(z);
        }
    }

    /// Whether no extent has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.min_x.is_none() && self.min_y.is_none() && self.min_z.is_none()
    }

    /// Discard all recorded extents.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Decoded parameters of a single linear move instruction.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoveParams {
    /// X parameter, if present on the instruction.
    pub x: Option<f64>,
    /// Y parameter, if present on the instruction.
    pub y: Option<f64>,
    /// Z parameter, if present on the instruction.
    pub z: Option<f64>,
    /// E (extrusion) parameter, if present on the instruction.
    pub e: Option<f64>,
}

impl MoveParams {
    /// Whether this move deposits material.
    pub fn is_extruding(&self) -> bool {
        self.e.is_some_and(|e| e > 0.0)
    }
}

/// Tracks tool position and the extrusion bounding box across moves.
#[derive(Debug, Default)]
pub struct MoveTracker {
    mode: PositioningMode,
    position: Position,
    bounds: BoundingBox,
    was_extruding: bool,
    layer_seen: bool,
}

impl MoveTracker {
    /// Create a tracker in absolute mode with everything unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the distance mode (G90/G91).
    pub fn set_mode(&mut self, mode: PositioningMode) {
        self.mode = mode;
    }

    /// Current distance mode.
    pub fn mode(&self) -> PositioningMode {
        self.mode
    }

    /// Current tool position.
    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Extents recorded so far.
    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    /// Apply a fully decoded `G0`/`G1` instruction.
    ///
    /// When a move starts a new continuous extrusion run after travel, its
    /// start point belongs to the printed footprint, so the pre-move position
    /// is folded in before the axes update. After the update, only axes the
    /// instruction actually carried are folded.
    pub fn apply_move(&mut self, mv: &MoveParams) {
        let extruding = mv.is_extruding();
        if extruding && !self.was_extruding {
            self.bounds.include(&self.position);
        }
        if let Some(x) = mv.x {
            self.position.x = Some(self.target(self.position.x, x));
        }
        if let Some(y) = mv.y {
            self.position.y = Some(self.target(self.position.y, y));
        }
        if let Some(z) = mv.z {
            self.position.z = Some(self.target(self.position.z, z));
        }
        if extruding {
            if let (Some(_), Some(x)) = (mv.x, self.position.x) {
                self.bounds.include_x(x);
            }
            if let (Some(_), Some(y)) = (mv.y, self.position.y) {
                self.bounds.include_y(y);
            }
            if let (Some(_), Some(z)) = (mv.z, self.position.z) {
                self.bounds.include_z(z);
            }
        }
        self.was_extruding = extruding;
    }

    fn target(&self, current: Option<f64>, param: f64) -> f64 {
        match self.mode {
            PositioningMode::Absolute => param,
            PositioningMode::Relative => current.unwrap_or(0.0) + param,
        }
    }

    /// One-shot bounding-box reset at the first layer-change marker.
    ///
    /// Discards extents accumulated from priming and purge moves that precede
    /// the first layer. Subsequent layer changes are ignored.
    pub fn on_layer_change(&mut self) {
        if !self.layer_seen {
            self.layer_seen = true;
            tracing::debug!("first layer change, dropping pre-layer extents");
            self.bounds.reset();
        }
    }

    /// Finish tracking and return the extents.
    ///
    /// With a known first-layer height and a non-degenerate z extent, the
    /// minimum z is lowered by that height to account for the first layer's
    /// bed-contact height.
    pub fn finish(mut self, first_layer_height: Option<f64>) -> BoundingBox {
        if let (Some(height), Some(min_z), Some(max_z)) =
            (first_layer_height, self.bounds.min_z, self.bounds.max_z)
        {
            if min_z < max_z {
                self.bounds.min_z = Some(min_z - height);
            }
        }
        self.bounds
    }
}
