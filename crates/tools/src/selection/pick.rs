//! Hit testing for selection: 2D click tests, box intersections and the
//! 3D pick list that the mouse wheel cycles through.

use glam::Vec3;
use shared::{BoundingBox, Map, MapDocument, MapObject, ObjectId, Ray, WORLD_EXTENT};
use tracing::trace;

use crate::viewport::camera::OrthographicCamera;

/// Click tolerance in screen pixels
const CLICK_TOLERANCE_PIXELS: f32 = 4.0;

/// Which part of an object a 2D click has to hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectFilterPolicy {
    CenterHandlesOnly,
    EdgesOnly,
    CenterOrEdges,
}

impl SelectFilterPolicy {
    fn accepts(self, map: &Map, object: &MapObject, region: &BoundingBox) -> bool {
        match self {
            SelectFilterPolicy::CenterHandlesOnly => center_inside(map, object, region),
            SelectFilterPolicy::EdgesOnly => edge_inside(object, region),
            SelectFilterPolicy::CenterOrEdges => {
                center_inside(map, object, region) || edge_inside(object, region)
            }
        }
    }
}

fn center_inside(map: &Map, object: &MapObject, region: &BoundingBox) -> bool {
    map.bounding_box(object.id)
        .is_some_and(|b| region.contains_point(b.center()))
}

fn edge_inside(object: &MapObject, region: &BoundingBox) -> bool {
    object
        .polygons()
        .iter()
        .any(|p| p.lines().iter().any(|l| region.intersects_line(l)))
}

/// Visible non-root leaves inside `region` passing `include`. Hidden
/// subtrees and subtrees whose bounds miss the region are skipped.
fn leaves_in_region(
    map: &Map,
    region: &BoundingBox,
    include: impl Fn(&MapObject) -> bool,
) -> Vec<ObjectId> {
    map.collect(
        |o| {
            o.is_root()
                || (!o.hidden
                    && map
                        .bounding_box(o.id)
                        .is_some_and(|b| b.intersects_with(region)))
        },
        |o| !o.is_root() && !o.has_children() && include(o),
    )
}

/// Click region around a screen point, spanning the whole depth axis
pub fn click_region(camera: &OrthographicCamera, x: f32, y: f32) -> BoundingBox {
    let tolerance = camera.pixels_to_units(CLICK_TOLERANCE_PIXELS);
    let add = camera.expand(Vec3::new(tolerance, tolerance, 0.0))
        + camera.unused_coordinate(Vec3::splat(WORLD_EXTENT));
    let click = camera.screen_to_world(x, y);
    BoundingBox::new(click - add, click + add)
}

/// First leaf under a 2D click, in tree order
pub fn selection_test(
    document: &MapDocument,
    camera: &OrthographicCamera,
    x: f32,
    y: f32,
    policy: SelectFilterPolicy,
) -> Option<ObjectId> {
    let region = click_region(camera, x, y);
    let map = &document.map;
    let hit = leaves_in_region(map, &region, |o| policy.accepts(map, o, &region))
        .into_iter()
        .next();
    trace!(?hit, "Selection test");
    hit
}

/// Leaves intersecting a selection region, or only those fully inside it
pub fn box_intersections(
    document: &MapDocument,
    region: &BoundingBox,
    contained: bool,
) -> Vec<ObjectId> {
    let map = &document.map;
    leaves_in_region(map, region, |o| {
        !contained
            || map
                .bounding_box(o.id)
                .is_some_and(|b| b.contained_within(region))
    })
}

/// Objects under the cursor in a 3D view plus the one the wheel points at
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PickContext {
    pub intersecting: Vec<ObjectId>,
    pub chosen: Option<ObjectId>,
}

impl PickContext {
    /// Pick along a ray; the nearest hit starts out chosen
    pub fn from_ray(map: &Map, ray: &Ray) -> Self {
        let intersecting: Vec<ObjectId> = map
            .intersections_for_visible_objects(ray)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        Self::new(intersecting)
    }

    pub fn new(intersecting: Vec<ObjectId>) -> Self {
        let chosen = intersecting.first().copied();
        Self { intersecting, chosen }
    }

    pub fn is_capturing(&self) -> bool {
        !self.intersecting.is_empty() && self.chosen.is_some()
    }

    /// Step the chosen object by the sign of `delta`, wrapping at both
    /// ends. Returns the previous and new choice.
    pub fn cycle(&mut self, delta: i32) -> Option<(ObjectId, ObjectId)> {
        if delta == 0 || !self.is_capturing() {
            return None;
        }
        let previous = self.chosen?;
        let len = self.intersecting.len() as i64;
        let index = self
            .intersecting
            .iter()
            .position(|&id| id == previous)
            .unwrap_or(0) as i64;
        let next = (index + i64::from(delta.signum())).rem_euclid(len) as usize;
        let chosen = self.intersecting[next];
        self.chosen = Some(chosen);
        Some((previous, chosen))
    }
}
