use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::geometry::BoundingBox;

/// Active grid of the document
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridData {
    pub snap_to_grid: bool,
    pub spacing: f32,
}

impl Default for GridData {
    fn default() -> Self {
        Self {
            snap_to_grid: true,
            spacing: 16.0,
        }
    }
}

impl GridData {
    /// Quantize every axis to the grid lattice
    pub fn snap(&self, point: Vec3) -> Vec3 {
        if self.spacing <= 0.0 {
            return point.round();
        }
        (point / self.spacing).round() * self.spacing
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionOptions {
    /// Select individual leaves instead of whole groups and entities
    pub ignore_grouping: bool,
}

/// Region outside of which the map is ignored when compiling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CordonBounds {
    pub enabled: bool,
    pub bounds: BoundingBox,
}

impl Default for CordonBounds {
    fn default() -> Self {
        Self {
            enabled: false,
            bounds: BoundingBox::new(Vec3::splat(-1024.0), Vec3::splat(1024.0)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformationFlags {
    pub texture_lock: bool,
    pub texture_scale_lock: bool,
}

impl Default for TransformationFlags {
    fn default() -> Self {
        Self {
            texture_lock: true,
            texture_scale_lock: false,
        }
    }
}

/// Metadata attached to a map
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapData {
    pub grid: GridData,
    pub selection_options: SelectionOptions,
    pub cordon: CordonBounds,
    pub transformation_flags: TransformationFlags,
}
