use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Tolerance used for point equivalence
pub const EPSILON: f32 = 0.0001;

/// Half-size of the world along an axis; used to make regions unbounded in depth
pub const WORLD_EXTENT: f32 = 100_000.0;

/// A ray in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn point_at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }
}

/// A line segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub start: Vec3,
    pub end: Vec3,
}

impl Line {
    pub fn new(start: Vec3, end: Vec3) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f32 {
        (self.end - self.start).length()
    }

    pub fn midpoint(&self) -> Vec3 {
        (self.start + self.end) / 2.0
    }

    /// Closest point on the segment to `point`
    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        let delta = self.end - self.start;
        let len_sq = delta.length_squared();
        if len_sq < f32::EPSILON {
            return self.start;
        }
        let t = ((point - self.start).dot(delta) / len_sq).clamp(0.0, 1.0);
        self.start + delta * t
    }
}

/// A planar polygon (vertex loop)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub vertices: Vec<Vec3>,
}

impl Polygon {
    pub fn new(vertices: Vec<Vec3>) -> Self {
        Self { vertices }
    }

    /// Edges of the loop, closing back to the first vertex
    pub fn lines(&self) -> Vec<Line> {
        let n = self.vertices.len();
        if n < 2 {
            return Vec::new();
        }
        (0..n)
            .map(|i| Line::new(self.vertices[i], self.vertices[(i + 1) % n]))
            .collect()
    }

    /// Distance along the ray to the polygon, using a triangle fan
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        if self.vertices.len() < 3 {
            return None;
        }
        let v0 = self.vertices[0];
        self.vertices
            .windows(2)
            .skip(1)
            .filter_map(|w| ray_triangle_intersect(ray, v0, w[0], w[1]))
            .min_by(f32::total_cmp)
    }
}

/// Axis-aligned bounding box; `start` is always the minimum corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub start: Vec3,
    pub end: Vec3,
}

impl BoundingBox {
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    /// Smallest box containing every point, or None when there are none
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { start: min, end: max })
    }

    pub fn union(boxes: impl IntoIterator<Item = BoundingBox>) -> Option<Self> {
        boxes.into_iter().reduce(|a, b| Self {
            start: a.start.min(b.start),
            end: a.end.max(b.end),
        })
    }

    /// Center of the bounding box
    pub fn center(&self) -> Vec3 {
        (self.start + self.end) * 0.5
    }

    pub fn dimensions(&self) -> Vec3 {
        self.end - self.start
    }

    /// Extent along X
    pub fn width(&self) -> f32 {
        self.end.x - self.start.x
    }

    /// Extent along Y
    pub fn length(&self) -> f32 {
        self.end.y - self.start.y
    }

    /// Extent along Z
    pub fn height(&self) -> f32 {
        self.end.z - self.start.z
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions().abs().max_element() < EPSILON
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        p.cmpge(self.start).all() && p.cmple(self.end).all()
    }

    pub fn intersects_with(&self, other: &BoundingBox) -> bool {
        self.start.cmple(other.end).all() && other.start.cmple(self.end).all()
    }

    pub fn contained_within(&self, other: &BoundingBox) -> bool {
        self.start.cmpge(other.start).all() && self.end.cmple(other.end).all()
    }

    /// Segment-box test using the slab method, clamped to the segment
    pub fn intersects_line(&self, line: &Line) -> bool {
        let dir = line.end - line.start;
        let mut tmin = 0.0_f32;
        let mut tmax = 1.0_f32;
        for axis in 0..3 {
            let origin = line.start[axis];
            let d = dir[axis];
            let (lo, hi) = (self.start[axis], self.end[axis]);
            if d.abs() < f32::EPSILON {
                if origin < lo || origin > hi {
                    return false;
                }
                continue;
            }
            let inv = 1.0 / d;
            let mut t1 = (lo - origin) * inv;
            let mut t2 = (hi - origin) * inv;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            tmin = tmin.max(t1);
            tmax = tmax.min(t2);
            if tmin > tmax {
                return false;
            }
        }
        true
    }

    /// Ray-box intersection using the slab method.
    /// Returns the distance along the ray to the nearest hit, or None.
    pub fn ray_distance(&self, ray: &Ray) -> Option<f32> {
        let inv_dir = Vec3::ONE / ray.direction;

        let t1 = (self.start - ray.origin) * inv_dir;
        let t2 = (self.end - ray.origin) * inv_dir;

        let tmin = t1.min(t2).max_element();
        let tmax = t1.max(t2).min_element();

        if tmax < 0.0 || tmin > tmax {
            return None;
        }

        Some(if tmin < 0.0 { tmax } else { tmin })
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (s, e) = (self.start, self.end);
        [
            Vec3::new(s.x, s.y, s.z),
            Vec3::new(e.x, s.y, s.z),
            Vec3::new(e.x, e.y, s.z),
            Vec3::new(s.x, e.y, s.z),
            Vec3::new(s.x, s.y, e.z),
            Vec3::new(e.x, s.y, e.z),
            Vec3::new(e.x, e.y, e.z),
            Vec3::new(s.x, e.y, e.z),
        ]
    }

    /// The 12 edges of the box
    pub fn lines(&self) -> [Line; 12] {
        let c = self.corners();
        [
            Line::new(c[0], c[1]),
            Line::new(c[1], c[2]),
            Line::new(c[2], c[3]),
            Line::new(c[3], c[0]),
            Line::new(c[4], c[5]),
            Line::new(c[5], c[6]),
            Line::new(c[6], c[7]),
            Line::new(c[7], c[4]),
            Line::new(c[0], c[4]),
            Line::new(c[1], c[5]),
            Line::new(c[2], c[6]),
            Line::new(c[3], c[7]),
        ]
    }

    /// The six faces as outward-facing quads
    pub fn polygons(&self) -> Vec<Polygon> {
        let c = self.corners();
        [
            [0, 3, 2, 1],
            [4, 5, 6, 7],
            [0, 1, 5, 4],
            [2, 3, 7, 6],
            [1, 2, 6, 5],
            [3, 0, 4, 7],
        ]
        .iter()
        .map(|q| Polygon::new(q.iter().map(|&i| c[i]).collect()))
        .collect()
    }

    /// Bounds of the transformed corners
    pub fn transform(&self, matrix: &Mat4) -> Self {
        let corners = self.corners().map(|c| matrix.transform_point3(c));
        // from_points only fails on an empty iterator
        Self::from_points(corners).unwrap_or(*self)
    }
}

/// Möller-Trumbore ray-triangle intersection algorithm.
/// Returns the distance along the ray if hit, or None if no intersection.
pub fn ray_triangle_intersect(ray: &Ray, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<f32> {
    const TRI_EPSILON: f32 = 1e-7;

    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let h = ray.direction.cross(edge2);
    let a = edge1.dot(h);

    // Ray is parallel to triangle
    if a.abs() < TRI_EPSILON {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = f * s.dot(h);

    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray.direction.dot(q);

    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);

    // Intersection is behind ray origin
    if t > TRI_EPSILON {
        Some(t)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> BoundingBox {
        BoundingBox::new(Vec3::ZERO, Vec3::ONE)
    }

    #[test]
    fn test_new_normalizes_corners() {
        let b = BoundingBox::new(Vec3::new(4.0, -2.0, 1.0), Vec3::new(-4.0, 2.0, 0.0));
        assert_eq!(b.start, Vec3::new(-4.0, -2.0, 0.0));
        assert_eq!(b.end, Vec3::new(4.0, 2.0, 1.0));
        assert_eq!(b.width(), 8.0);
        assert_eq!(b.length(), 4.0);
        assert_eq!(b.height(), 1.0);
    }

    #[test]
    fn test_intersects_and_contained() {
        let a = BoundingBox::new(Vec3::ZERO, Vec3::splat(10.0));
        let inside = BoundingBox::new(Vec3::splat(2.0), Vec3::splat(4.0));
        let partial = BoundingBox::new(Vec3::splat(8.0), Vec3::splat(12.0));
        let outside = BoundingBox::new(Vec3::splat(20.0), Vec3::splat(30.0));

        assert!(inside.contained_within(&a));
        assert!(inside.intersects_with(&a));
        assert!(!partial.contained_within(&a));
        assert!(partial.intersects_with(&a));
        assert!(!outside.intersects_with(&a));
    }

    #[test]
    fn test_intersects_line() {
        let b = unit_box();
        assert!(b.intersects_line(&Line::new(Vec3::new(-1.0, 0.5, 0.5), Vec3::new(2.0, 0.5, 0.5))));
        assert!(!b.intersects_line(&Line::new(
            Vec3::new(-3.0, 0.5, 0.5),
            Vec3::new(-2.0, 0.5, 0.5)
        )));
        // Parallel to an axis, outside the slab
        assert!(!b.intersects_line(&Line::new(
            Vec3::new(-1.0, 2.0, 0.5),
            Vec3::new(2.0, 2.0, 0.5)
        )));
    }

    #[test]
    fn test_ray_distance() {
        let b = unit_box();
        let ray = Ray::new(Vec3::new(-5.0, 0.5, 0.5), Vec3::X);
        let d = b.ray_distance(&ray).unwrap();
        assert!((d - 5.0).abs() < 1e-5);

        let miss = Ray::new(Vec3::new(-5.0, 3.0, 0.5), Vec3::X);
        assert!(b.ray_distance(&miss).is_none());
    }

    #[test]
    fn test_transform_box() {
        let b = unit_box();
        let m =
            Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0)) * Mat4::from_scale(Vec3::splat(2.0));
        let t = b.transform(&m);
        assert_eq!(t.start, Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(t.end, Vec3::new(4.0, 2.0, 2.0));
    }

    #[test]
    fn test_closest_point_clamps() {
        let line = Line::new(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(line.closest_point(Vec3::new(5.0, 3.0, 0.0)), Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(line.closest_point(Vec3::new(-5.0, 3.0, 0.0)), Vec3::ZERO);
        assert_eq!(line.closest_point(Vec3::new(15.0, 0.0, 0.0)), Vec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn test_polygon_lines_close_loop() {
        let p = Polygon::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y]);
        let lines = p.lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2].end, Vec3::ZERO);
    }

    #[test]
    fn test_box_polygons_hit_by_ray() {
        let b = BoundingBox::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let ray = Ray::new(Vec3::new(-10.0, 0.3, 0.2), Vec3::X);
        let nearest = b
            .polygons()
            .iter()
            .filter_map(|p| p.intersect_ray(&ray))
            .min_by(f32::total_cmp)
            .unwrap();
        assert!((nearest - 9.0).abs() < 1e-4);
    }
}
