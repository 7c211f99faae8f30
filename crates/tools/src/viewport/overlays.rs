//! Overlay shapes for the plane-projected and perspective viewports

use egui::{Color32, Pos2, Shape, Stroke};
use glam::Vec3;

use super::camera::{OrthographicCamera, PerspectiveCamera};

const DASH_LENGTH: f32 = 4.0;
const GAP_LENGTH: f32 = 4.0;

/// Outline of a flat rectangle given by two world corners
pub fn rect_outline(
    camera: &OrthographicCamera,
    start: Vec3,
    end: Vec3,
    stroke: Stroke,
    stippled: bool,
) -> Vec<Shape> {
    let corners = screen_rect(camera, start, end);
    let mut shapes = Vec::new();
    for i in 0..4 {
        let a = corners[i];
        let b = corners[(i + 1) % 4];
        if stippled {
            shapes.extend(Shape::dashed_line(&[a, b], stroke, DASH_LENGTH, GAP_LENGTH));
        } else {
            shapes.push(Shape::line_segment([a, b], stroke));
        }
    }
    shapes
}

/// Translucent fill of a flat rectangle
pub fn rect_fill(camera: &OrthographicCamera, start: Vec3, end: Vec3, fill: Color32) -> Shape {
    Shape::convex_polygon(screen_rect(camera, start, end).to_vec(), fill, Stroke::NONE)
}

/// Small filled square centered on a screen point
pub fn handle_square(center: Pos2, half_size: f32, fill: Color32, outline: Stroke) -> Vec<Shape> {
    let pts = vec![
        egui::pos2(center.x - half_size, center.y - half_size),
        egui::pos2(center.x + half_size, center.y - half_size),
        egui::pos2(center.x + half_size, center.y + half_size),
        egui::pos2(center.x - half_size, center.y + half_size),
    ];
    let mut shapes = vec![Shape::convex_polygon(pts.clone(), fill, Stroke::NONE)];
    for i in 0..4 {
        shapes.push(Shape::line_segment([pts[i], pts[(i + 1) % 4]], outline));
    }
    shapes
}

pub fn handle_circle(center: Pos2, radius: f32, fill: Color32) -> Shape {
    Shape::circle_filled(center, radius, fill)
}

/// Project a world segment into a perspective view; skipped when either end
/// is behind the camera
pub fn perspective_line(
    camera: &PerspectiveCamera,
    a: Vec3,
    b: Vec3,
    stroke: Stroke,
) -> Option<Shape> {
    let a = camera.project(a)?;
    let b = camera.project(b)?;
    Some(Shape::line_segment([a, b], stroke))
}

fn screen_rect(camera: &OrthographicCamera, start: Vec3, end: Vec3) -> [Pos2; 4] {
    let s = camera.world_to_screen(start);
    let e = camera.world_to_screen(end);
    [
        egui::pos2(s.x, s.y),
        egui::pos2(e.x, s.y),
        egui::pos2(e.x, e.y),
        egui::pos2(s.x, e.y),
    ]
}
