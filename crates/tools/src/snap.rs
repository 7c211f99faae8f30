//! Grid and selection snapping, shared by every tool.
//!
//! All points here are flat: already mapped into the camera plane with
//! [`OrthographicCamera::flatten`].

use glam::Vec3;
use shared::{Line, MapDocument, EPSILON};

use crate::input::{Key, Modifiers};
use crate::viewport::camera::OrthographicCamera;

/// Fraction of a size within which a point snaps to a center or vertex
const SNAP_TOLERANCE: f32 = 0.1;

fn grid_snap_active(document: &MapDocument, modifiers: Modifiers) -> bool {
    !modifiers.alt && document.map.data.grid.snap_to_grid
}

/// Quantize to the grid when snapping is on and alt is not held, else to whole units
pub fn snap_if_needed(document: &MapDocument, modifiers: Modifiers, point: Vec3) -> Vec3 {
    if grid_snap_active(document, modifiers) {
        document.map.data.grid.snap(point)
    } else {
        point.round()
    }
}

/// Snap a point to the selection: its center, an object center, an edge
/// vertex or midpoint, or the nearest edge. Falls back to the grid.
pub fn snap_to_selection(
    document: &MapDocument,
    modifiers: Modifiers,
    point: Vec3,
    camera: &OrthographicCamera,
) -> Vec3 {
    if !grid_snap_active(document, modifiers) {
        return point.round();
    }

    let snapped = document.map.data.grid.snap(point);
    let Some(selection_box) = document.selection_bounding_box() else {
        return snapped;
    };

    let center = camera.flatten(selection_box.center());
    if within_tolerance(center, point, camera.flatten(selection_box.dimensions())) {
        return center;
    }

    let objects = document.selected_objects();

    for &id in &objects {
        let Some(object) = document.map.get(id) else {
            continue;
        };
        if object.kind.is_aggregate() && object.has_children() {
            continue;
        }
        let Some(bounds) = document.map.bounding_box(id) else {
            continue;
        };
        let center = camera.flatten(bounds.center());
        if within_tolerance(center, point, camera.flatten(bounds.dimensions())) {
            return center;
        }
    }

    let lines = objects
        .iter()
        .filter_map(|&id| document.map.get(id))
        .flat_map(|o| o.polygons())
        .flat_map(|p| p.lines())
        .map(|l| Line::new(camera.flatten(l.start), camera.flatten(l.end)));

    let mut closest = snapped;
    for line in lines {
        // Grid point already on this edge
        if line.closest_point(snapped).abs_diff_eq(snapped, EPSILON) {
            return snapped;
        }

        let point_tolerance = line.length() * SNAP_TOLERANCE;
        if line.start.distance(point) < point_tolerance {
            return line.start;
        }
        if line.end.distance(point) < point_tolerance {
            return line.end;
        }
        let midpoint = line.midpoint();
        if midpoint.distance(point) < point_tolerance {
            return midpoint;
        }

        // Strict comparison: on a tie the earlier edge wins
        let on_line = line.closest_point(point);
        if closest.distance(point) > on_line.distance(point) {
            closest = on_line;
        }
    }
    closest
}

fn within_tolerance(center: Vec3, point: Vec3, flat_size: Vec3) -> bool {
    (center.x - point.x).abs() < flat_size.x * SNAP_TOLERANCE
        && (center.y - point.y).abs() < flat_size.y * SNAP_TOLERANCE
}

/// Flat offset for an arrow key: one grid step, or one unit when ctrl is
/// held or grid snapping is off
pub fn nudge_value(document: &MapDocument, modifiers: Modifiers, key: Key) -> Option<Vec3> {
    let grid = &document.map.data.grid;
    let step = if !modifiers.ctrl && grid.snap_to_grid {
        grid.spacing
    } else {
        1.0
    };
    match key {
        Key::Left => Some(Vec3::new(-step, 0.0, 0.0)),
        Key::Right => Some(Vec3::new(step, 0.0, 0.0)),
        Key::Up => Some(Vec3::new(0.0, step, 0.0)),
        Key::Down => Some(Vec3::new(0.0, -step, 0.0)),
        _ => None,
    }
}
