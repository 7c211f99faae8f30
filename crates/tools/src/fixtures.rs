//! Factory functions for building test maps.
//!
//! Used by the unit and integration tests and by the script runner's
//! `--scene sample` option.

use glam::Vec3;
use shared::*;

/// Texture applied to every fixture face
pub const FIXTURE_TEXTURE: &str = "DEV_MEASUREGENERIC01";

// ── Object kinds ──────────────────────────────────────────────

/// World-aligned texture for a face with the given normal
fn aligned_texture(normal: Vec3) -> Texture {
    let n = normal.abs();
    let (u, v) = if n.z >= n.x && n.z >= n.y {
        (Vec3::X, Vec3::NEG_Y)
    } else if n.x >= n.y {
        (Vec3::Y, Vec3::NEG_Z)
    } else {
        (Vec3::X, Vec3::NEG_Z)
    };
    Texture::new(FIXTURE_TEXTURE, u, v)
}

/// Axis-aligned box solid spanning `min`..`max`
pub fn cuboid_kind(min: Vec3, max: Vec3) -> ObjectKind {
    let bounds = BoundingBox::new(min, max);
    let faces = bounds
        .polygons()
        .into_iter()
        .map(|polygon| {
            let count = polygon.vertices.len() as f32;
            let center = polygon.vertices.iter().copied().sum::<Vec3>() / count;
            let texture = aligned_texture(center - bounds.center());
            Face {
                vertices: polygon.vertices,
                texture,
            }
        })
        .collect();
    ObjectKind::Solid { faces }
}

// ── Map builders ──────────────────────────────────────────────

/// Add a box solid directly under the root
pub fn add_cuboid(map: &mut Map, min: Vec3, max: Vec3) -> Result<ObjectId, TransactionError> {
    let root = map.root();
    add_cuboid_to(map, root, min, max)
}

/// Add a box solid under `parent`
pub fn add_cuboid_to(
    map: &mut Map,
    parent: ObjectId,
    min: Vec3,
    max: Vec3,
) -> Result<ObjectId, TransactionError> {
    map.add(parent, cuboid_kind(min, max))
}

/// Add an empty group under `parent`
pub fn add_group(map: &mut Map, parent: ObjectId) -> Result<ObjectId, TransactionError> {
    map.add(parent, ObjectKind::Group)
}

/// Add an entity under `parent`
pub fn add_entity(
    map: &mut Map,
    parent: ObjectId,
    classname: &str,
    origin: Vec3,
) -> Result<ObjectId, TransactionError> {
    map.add(
        parent,
        ObjectKind::Entity {
            classname: classname.to_string(),
            origin,
        },
    )
}

/// Small map with loose solids, a grouped pair and a brush entity.
///
/// Layout in the top view (x right, y up):
/// - floor: -256..256 x -256..256, z -16..0
/// - pillar: 64..128 x 64..128, z 0..128
/// - group of two crates at (-128, -128) and (-64, -128), 32 units each
/// - `func_door` entity with one brush at (128..160, -160..-96)
pub fn sample_map() -> Result<Map, TransactionError> {
    let mut map = Map::new();
    let root = map.root();

    add_cuboid(&mut map, Vec3::new(-256.0, -256.0, -16.0), Vec3::new(256.0, 256.0, 0.0))?;
    add_cuboid(&mut map, Vec3::new(64.0, 64.0, 0.0), Vec3::new(128.0, 128.0, 128.0))?;

    let group = add_group(&mut map, root)?;
    add_cuboid_to(&mut map, group, Vec3::new(-128.0, -128.0, 0.0), Vec3::new(-96.0, -96.0, 32.0))?;
    add_cuboid_to(&mut map, group, Vec3::new(-64.0, -128.0, 0.0), Vec3::new(-32.0, -96.0, 32.0))?;

    let door = add_entity(&mut map, root, "func_door", Vec3::new(144.0, -128.0, 48.0))?;
    add_cuboid_to(&mut map, door, Vec3::new(128.0, -160.0, 0.0), Vec3::new(160.0, -96.0, 96.0))?;

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cuboid_kind_has_six_textured_faces() {
        let ObjectKind::Solid { faces } = cuboid_kind(Vec3::ZERO, Vec3::splat(16.0)) else {
            panic!("Expected Solid");
        };
        assert_eq!(faces.len(), 6);
        assert!(faces.iter().all(|f| f.vertices.len() == 4));
        assert!(faces.iter().all(|f| f.texture.name == FIXTURE_TEXTURE));
    }

    #[test]
    fn test_add_cuboid_bounds() {
        let mut map = Map::new();
        let id =
            add_cuboid(&mut map, Vec3::new(32.0, 0.0, 0.0), Vec3::new(0.0, 16.0, 8.0)).unwrap();
        let b = map.bounding_box(id).unwrap();
        assert_eq!(b.start, Vec3::ZERO);
        assert_eq!(b.end, Vec3::new(32.0, 16.0, 8.0));
    }

    #[test]
    fn test_sample_map_structure() {
        let map = sample_map().unwrap();
        let root = map.root();
        // root + floor + pillar + group(2) + entity(1)
        assert_eq!(map.len(), 8);
        assert!(map.has_children(root));
        let aggregates = map
            .find_all(root)
            .into_iter()
            .filter_map(|id| map.get(id))
            .filter(|o| !o.is_root() && o.kind.is_aggregate())
            .count();
        assert_eq!(aggregates, 2);
    }
}
