use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::data::MapData;
use crate::geometry::{BoundingBox, Ray};
use crate::id::ObjectId;
use crate::objects::{DetachedObject, MapObject, ObjectKind};
use crate::transaction::TransactionError;

/// The hierarchical object tree of a document
#[derive(Debug, Clone, PartialEq)]
pub struct Map {
    root: ObjectId,
    objects: HashMap<ObjectId, MapObject>,
    pub data: MapData,
}

/// On-disk form: objects listed in tree order
#[derive(Serialize, Deserialize)]
struct MapFile {
    root: ObjectId,
    objects: Vec<MapObject>,
    #[serde(default)]
    data: MapData,
}

impl Default for Map {
    fn default() -> Self {
        Self::new()
    }
}

impl Map {
    pub fn new() -> Self {
        let root = MapObject::new(ObjectKind::Root);
        let id = root.id;
        Self {
            root: id,
            objects: HashMap::from([(id, root)]),
            data: MapData::default(),
        }
    }

    pub fn root(&self) -> ObjectId {
        self.root
    }

    pub fn get(&self, id: ObjectId) -> Option<&MapObject> {
        self.objects.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut MapObject> {
        self.objects.get_mut(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.len() <= 1
    }

    /// Create a new object under `parent`
    pub fn add(
        &mut self,
        parent: ObjectId,
        kind: ObjectKind,
    ) -> Result<ObjectId, TransactionError> {
        if !self.contains(parent) {
            return Err(TransactionError::UnknownParent(parent));
        }
        let mut object = MapObject::new(kind);
        let id = object.id;
        object.parent = Some(parent);
        self.objects.insert(id, object);
        if let Some(p) = self.objects.get_mut(&parent) {
            p.children.push(id);
        }
        Ok(id)
    }

    pub fn has_children(&self, id: ObjectId) -> bool {
        self.get(id).is_some_and(MapObject::has_children)
    }

    /// The object and all of its descendants, pre-order
    pub fn find_all(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        self.walk(id, &mut |o| out.push(o.id));
        out
    }

    fn walk(&self, id: ObjectId, f: &mut impl FnMut(&MapObject)) {
        let Some(object) = self.get(id) else {
            return;
        };
        f(object);
        for &child in &object.children {
            self.walk(child, f);
        }
    }

    /// Topmost object on the path from `id` up to the root (itself
    /// included) that satisfies `pred`
    pub fn find_topmost_parent(
        &self,
        id: ObjectId,
        pred: impl Fn(&MapObject) -> bool,
    ) -> Option<ObjectId> {
        let mut found = None;
        let mut current = self.get(id);
        while let Some(object) = current {
            if pred(object) {
                found = Some(object.id);
            }
            current = object.parent.and_then(|p| self.get(p));
        }
        found
    }

    /// True if the object or any of its ancestors is hidden
    pub fn is_hidden(&self, id: ObjectId) -> bool {
        let mut current = self.get(id);
        while let Some(object) = current {
            if object.hidden {
                return true;
            }
            current = object.parent.and_then(|p| self.get(p));
        }
        false
    }

    /// Bounds of the object's own geometry and its whole subtree
    pub fn bounding_box(&self, id: ObjectId) -> Option<BoundingBox> {
        let object = self.get(id)?;
        let children = object.children.iter().filter_map(|&c| self.bounding_box(c));
        BoundingBox::union(object.own_bounds().into_iter().chain(children))
    }

    /// Walk the tree from the root. Subtrees failing `descend` are pruned;
    /// visited objects passing `include` are returned in traversal order.
    pub fn collect(
        &self,
        descend: impl Fn(&MapObject) -> bool,
        include: impl Fn(&MapObject) -> bool,
    ) -> Vec<ObjectId> {
        let mut out = Vec::new();
        self.collect_from(self.root, &descend, &include, &mut out);
        out
    }

    fn collect_from(
        &self,
        id: ObjectId,
        descend: &impl Fn(&MapObject) -> bool,
        include: &impl Fn(&MapObject) -> bool,
        out: &mut Vec<ObjectId>,
    ) {
        let Some(object) = self.get(id) else {
            return;
        };
        if !descend(object) {
            return;
        }
        if include(object) {
            out.push(id);
        }
        for &child in &object.children {
            self.collect_from(child, descend, include, out);
        }
    }

    /// Visible leaf objects hit by the ray, nearest first
    pub fn intersections_for_visible_objects(&self, ray: &Ray) -> Vec<(ObjectId, f32)> {
        let mut hits = Vec::new();
        self.intersect_from(self.root, ray, &mut hits);
        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits
    }

    fn intersect_from(&self, id: ObjectId, ray: &Ray, hits: &mut Vec<(ObjectId, f32)>) {
        let Some(object) = self.get(id) else {
            return;
        };
        if object.hidden {
            return;
        }
        if !object.is_root() {
            match self.bounding_box(id) {
                Some(bounds) if bounds.ray_distance(ray).is_some() => {}
                _ => return,
            }
        }
        if !object.has_children() {
            let nearest = object
                .polygons()
                .iter()
                .filter_map(|p| p.intersect_ray(ray))
                .min_by(f32::total_cmp);
            if let Some(distance) = nearest {
                hits.push((id, distance));
            }
        }
        for &child in &object.children {
            self.intersect_from(child, ray, hits);
        }
    }

    /// Deep copy of a subtree with freshly issued ids
    pub fn copy_subtree(&self, id: ObjectId) -> Option<DetachedObject> {
        let source = self.get(id)?;
        let mut object = source.clone();
        object.id = ObjectId::new();
        object.parent = None;
        object.children.clear();
        let children = source
            .children
            .iter()
            .filter_map(|&c| self.copy_subtree(c))
            .collect();
        Some(DetachedObject { object, children })
    }

    /// Insert a detached subtree under `parent`, returning the new top id
    pub fn attach(
        &mut self,
        parent: ObjectId,
        detached: DetachedObject,
    ) -> Result<ObjectId, TransactionError> {
        if !self.contains(parent) {
            return Err(TransactionError::UnknownParent(parent));
        }
        Ok(self.attach_unchecked(parent, detached))
    }

    fn attach_unchecked(&mut self, parent: ObjectId, detached: DetachedObject) -> ObjectId {
        let DetachedObject { mut object, children } = detached;
        let id = object.id;
        object.parent = Some(parent);
        object.children.clear();
        self.objects.insert(id, object);
        if let Some(p) = self.objects.get_mut(&parent) {
            p.children.push(id);
        }
        for child in children {
            self.attach_unchecked(id, child);
        }
        id
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let objects = self
            .find_all(self.root)
            .into_iter()
            .filter_map(|id| self.get(id).cloned())
            .collect();
        serde_json::to_string_pretty(&MapFile {
            root: self.root,
            objects,
            data: self.data,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let file: MapFile = serde_json::from_str(json)?;
        let objects: HashMap<_, _> = file.objects.into_iter().map(|o| (o.id, o)).collect();
        if !objects.contains_key(&file.root) {
            return Err(serde::de::Error::custom(format!(
                "root object {} is missing",
                file.root
            )));
        }
        Ok(Self {
            root: file.root,
            objects,
            data: file.data,
        })
    }
}
