use glam::Vec3;
use shared::BoundingBox;

/// Lines mesh: interleaved [pos.x, pos.y, pos.z, r, g, b, a]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineMeshData {
    /// 7 floats per vertex: position(3) + color(4)
    pub vertices: Vec<f32>,
}

impl LineMeshData {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 7
    }

    pub fn line_count(&self) -> usize {
        self.vertex_count() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn push_line(&mut self, a: Vec3, b: Vec3, color: [f32; 4]) {
        push_line_vert(&mut self.vertices, a, color);
        push_line_vert(&mut self.vertices, b, color);
    }

    /// The 12 edges of a box
    pub fn push_box(&mut self, bounds: &BoundingBox, color: [f32; 4]) {
        for line in bounds.lines() {
            self.push_line(line.start, line.end, color);
        }
    }

    pub fn append(&mut self, other: LineMeshData) {
        self.vertices.extend(other.vertices);
    }
}

fn push_line_vert(v: &mut Vec<f32>, p: Vec3, c: [f32; 4]) {
    v.extend_from_slice(&[p.x, p.y, p.z, c[0], c[1], c[2], c[3]]);
}

/// Convert an egui colour into the float layout of the line buffer
pub fn color_to_f32(c: egui::Color32) -> [f32; 4] {
    let [r, g, b, a] = c.to_srgba_unmultiplied();
    [
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
        a as f32 / 255.0,
    ]
}
