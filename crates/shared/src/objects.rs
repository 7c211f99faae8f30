use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::geometry::{BoundingBox, Polygon};
use crate::id::ObjectId;

/// Half-size of the box drawn for an entity without brushes
const POINT_ENTITY_HALF_SIZE: f32 = 8.0;

/// Texture mapping of a face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Texture {
    pub name: String,
    pub u_axis: Vec3,
    pub v_axis: Vec3,
    pub x_scale: f32,
    pub y_scale: f32,
    pub x_shift: f32,
    pub y_shift: f32,
}

impl Texture {
    pub fn new(name: impl Into<String>, u_axis: Vec3, v_axis: Vec3) -> Self {
        Self {
            name: name.into(),
            u_axis,
            v_axis,
            x_scale: 1.0,
            y_scale: 1.0,
            x_shift: 0.0,
            y_shift: 0.0,
        }
    }

    /// Texture coordinates of a world point
    pub fn uv(&self, point: Vec3) -> (f32, f32) {
        (
            point.dot(self.u_axis) / self.x_scale + self.x_shift,
            point.dot(self.v_axis) / self.y_scale + self.y_shift,
        )
    }

    /// Keep the texture locked to the face under rotation, translation and
    /// uniform scale: axes follow the matrix, scales absorb its magnitude.
    pub fn transform_uniform(&mut self, matrix: &Mat4) {
        let translation = matrix.w_axis.truncate();

        let u = matrix.transform_vector3(self.u_axis);
        let v = matrix.transform_vector3(self.v_axis);
        if u.length_squared() < f32::EPSILON || v.length_squared() < f32::EPSILON {
            return;
        }

        self.x_scale *= u.length();
        self.y_scale *= v.length();
        self.u_axis = u.normalize();
        self.v_axis = v.normalize();

        self.x_shift -= translation.dot(self.u_axis) / self.x_scale;
        self.y_shift -= translation.dot(self.v_axis) / self.y_scale;
    }

    /// Stretch the texture with an axis-aligned scale; axes are untouched.
    pub fn transform_scale(&mut self, matrix: &Mat4) {
        let translation = matrix.w_axis.truncate();

        let u = matrix.transform_vector3(self.u_axis).length();
        let v = matrix.transform_vector3(self.v_axis).length();
        if u < f32::EPSILON || v < f32::EPSILON {
            return;
        }

        self.x_scale *= u;
        self.y_scale *= v;
        self.x_shift -= translation.dot(self.u_axis) / self.x_scale;
        self.y_shift -= translation.dot(self.v_axis) / self.y_scale;
    }
}

/// A face of a solid: a planar vertex loop plus its texture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub vertices: Vec<Vec3>,
    pub texture: Texture,
}

impl Face {
    pub fn polygon(&self) -> Polygon {
        Polygon::new(self.vertices.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectKind {
    Root,
    Group,
    Entity { classname: String, origin: Vec3 },
    Solid { faces: Vec<Face> },
}

impl ObjectKind {
    /// Groups and entities gather their children into one selectable unit
    pub fn is_aggregate(&self) -> bool {
        matches!(self, ObjectKind::Group | ObjectKind::Entity { .. })
    }
}

/// A node of the map tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapObject {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub parent: Option<ObjectId>,
    #[serde(default)]
    pub children: Vec<ObjectId>,
    #[serde(default)]
    pub visgroups: Vec<u32>,
    #[serde(default)]
    pub hidden: bool,
}

impl MapObject {
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            id: ObjectId::new(),
            kind,
            parent: None,
            children: Vec::new(),
            visgroups: Vec::new(),
            hidden: false,
        }
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn is_root(&self) -> bool {
        matches!(self.kind, ObjectKind::Root)
    }

    /// Polygons this object draws by itself (children excluded)
    pub fn polygons(&self) -> Vec<Polygon> {
        match &self.kind {
            ObjectKind::Solid { faces } => faces.iter().map(Face::polygon).collect(),
            ObjectKind::Entity { origin, .. } if !self.has_children() => {
                point_entity_box(*origin).polygons()
            }
            _ => Vec::new(),
        }
    }

    /// Bounds of this object's own geometry (children excluded)
    pub fn own_bounds(&self) -> Option<BoundingBox> {
        match &self.kind {
            ObjectKind::Solid { faces } => {
                BoundingBox::from_points(faces.iter().flat_map(|f| f.vertices.iter().copied()))
            }
            ObjectKind::Entity { origin, .. } if !self.has_children() => {
                Some(point_entity_box(*origin))
            }
            _ => None,
        }
    }

    pub fn transform(&mut self, matrix: &Mat4) {
        match &mut self.kind {
            ObjectKind::Solid { faces } => {
                for face in faces {
                    for v in &mut face.vertices {
                        *v = matrix.transform_point3(*v);
                    }
                }
            }
            ObjectKind::Entity { origin, .. } => *origin = matrix.transform_point3(*origin),
            ObjectKind::Root | ObjectKind::Group => {}
        }
    }

    pub fn transform_textures_uniform(&mut self, matrix: &Mat4) {
        if let ObjectKind::Solid { faces } = &mut self.kind {
            faces.iter_mut().for_each(|f| f.texture.transform_uniform(matrix));
        }
    }

    pub fn transform_textures_scale(&mut self, matrix: &Mat4) {
        if let ObjectKind::Solid { faces } = &mut self.kind {
            faces.iter_mut().for_each(|f| f.texture.transform_scale(matrix));
        }
    }
}

fn point_entity_box(origin: Vec3) -> BoundingBox {
    BoundingBox::new(
        origin - Vec3::splat(POINT_ENTITY_HALF_SIZE),
        origin + Vec3::splat(POINT_ENTITY_HALF_SIZE),
    )
}

/// A subtree lifted out of a map, ready to be attached somewhere
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetachedObject {
    pub object: MapObject,
    #[serde(default)]
    pub children: Vec<DetachedObject>,
}

impl DetachedObject {
    /// Pre-order walk over the subtree
    pub fn for_each_mut(&mut self, f: &mut impl FnMut(&mut MapObject)) {
        f(&mut self.object);
        for child in &mut self.children {
            child.for_each_mut(f);
        }
    }

    pub fn count(&self) -> usize {
        1 + self.children.iter().map(DetachedObject::count).sum::<usize>()
    }

    pub fn transform(&mut self, matrix: &Mat4) {
        self.for_each_mut(&mut |o| o.transform(matrix));
    }

    pub fn transform_textures_uniform(&mut self, matrix: &Mat4) {
        self.for_each_mut(&mut |o| o.transform_textures_uniform(matrix));
    }

    pub fn transform_textures_scale(&mut self, matrix: &Mat4) {
        self.for_each_mut(&mut |o| o.transform_textures_scale(matrix));
    }

    pub fn strip_visgroups(&mut self) {
        self.for_each_mut(&mut |o| o.visgroups.clear());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-4, "{a} != {b}");
    }

    #[test]
    fn test_uniform_texture_lock_under_translation() {
        let mut tex = Texture::new("brick", Vec3::X, -Vec3::Z);
        let point = Vec3::new(12.0, 0.0, -40.0);
        let before = tex.uv(point);

        let m = Mat4::from_translation(Vec3::new(32.0, 5.0, 16.0));
        tex.transform_uniform(&m);
        let after = tex.uv(m.transform_point3(point));

        assert_close(before.0, after.0);
        assert_close(before.1, after.1);
    }

    #[test]
    fn test_uniform_texture_lock_under_rotation() {
        let mut tex = Texture::new("brick", Vec3::X, Vec3::Y);
        let point = Vec3::new(10.0, 20.0, 0.0);
        let before = tex.uv(point);

        let m = Mat4::from_rotation_z(std::f32::consts::FRAC_PI_2);
        tex.transform_uniform(&m);
        let after = tex.uv(m.transform_point3(point));

        assert_close(before.0, after.0);
        assert_close(before.1, after.1);
    }

    #[test]
    fn test_scale_texture_keeps_axes() {
        let mut tex = Texture::new("brick", Vec3::X, Vec3::Y);
        let m = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        tex.transform_scale(&m);
        assert_eq!(tex.u_axis, Vec3::X);
        assert_close(tex.x_scale, 2.0);
        assert_close(tex.y_scale, 1.0);
    }

    #[test]
    fn test_point_entity_has_box() {
        let e = MapObject::new(ObjectKind::Entity {
            classname: "light".into(),
            origin: Vec3::new(0.0, 0.0, 64.0),
        });
        let b = e.own_bounds().unwrap();
        assert_eq!(b.start, Vec3::new(-8.0, -8.0, 56.0));
        assert_eq!(e.polygons().len(), 6);
    }

    #[test]
    fn test_detached_strip_visgroups_recurses() {
        let mut parent = MapObject::new(ObjectKind::Group);
        parent.visgroups.push(1);
        let mut child = MapObject::new(ObjectKind::Solid { faces: vec![] });
        child.visgroups.push(2);
        let mut detached = DetachedObject {
            object: parent,
            children: vec![DetachedObject { object: child, children: vec![] }],
        };
        detached.strip_visgroups();
        assert!(detached.object.visgroups.is_empty());
        assert!(detached.children[0].object.visgroups.is_empty());
        assert_eq!(detached.count(), 2);
    }
}
