//! Document: a map, its selection, the deferred transaction queue and
//! the undo/redo history.

use std::cell::{Cell, RefCell};
use std::collections::{HashSet, VecDeque};

use tracing::{debug, warn};

use crate::geometry::BoundingBox;
use crate::id::ObjectId;
use crate::map::Map;
use crate::objects::DetachedObject;
use crate::transaction::{Change, Completion, Operation, Ticket, Transaction, TransactionError};

const MAX_UNDO: usize = 100;

/// Identity-based set of selected objects
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    ids: HashSet<ObjectId>,
}

impl Selection {
    pub fn contains(&self, id: ObjectId) -> bool {
        self.ids.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.ids.iter().copied()
    }

    fn insert(&mut self, id: ObjectId) -> bool {
        self.ids.insert(id)
    }

    fn remove(&mut self, id: ObjectId) -> bool {
        self.ids.remove(&id)
    }
}

#[derive(Debug, Default)]
pub struct MapDocument {
    pub map: Map,
    selection: Selection,
    pending: RefCell<VecDeque<(Ticket, Transaction)>>,
    next_ticket: Cell<u64>,
    undo_stack: VecDeque<(Map, Selection)>,
    redo_stack: Vec<(Map, Selection)>,
    version: u64,
}

impl MapDocument {
    pub fn new(map: Map) -> Self {
        Self {
            map,
            ..Default::default()
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn is_selected(&self, id: ObjectId) -> bool {
        self.selection.contains(id)
    }

    /// Bumped every time the map or selection changes
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Selected objects in tree order
    pub fn selected_objects(&self) -> Vec<ObjectId> {
        self.map
            .find_all(self.map.root())
            .into_iter()
            .filter(|&id| self.selection.contains(id))
            .collect()
    }

    /// Selected objects whose parent is not selected, in tree order
    pub fn selected_parents(&self) -> Vec<ObjectId> {
        self.selected_objects()
            .into_iter()
            .filter(|&id| {
                self.map
                    .get(id)
                    .and_then(|o| o.parent)
                    .map_or(true, |p| !self.selection.contains(p))
            })
            .collect()
    }

    pub fn selection_bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::union(
            self.selected_parents()
                .into_iter()
                .filter_map(|id| self.map.bounding_box(id)),
        )
    }

    /// Queue a transaction for the host to execute later
    pub fn submit(&self, transaction: Transaction) -> Ticket {
        let ticket = Ticket(self.next_ticket.get());
        self.next_ticket.set(ticket.0 + 1);
        debug!(ticket = ticket.0, operations = transaction.len(), "Transaction submitted");
        self.pending.borrow_mut().push_back((ticket, transaction));
        ticket
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.borrow().is_empty()
    }

    /// Execute every queued transaction in submission order
    pub fn process_pending(&mut self) -> Vec<Completion> {
        let queued: Vec<_> = self.pending.get_mut().drain(..).collect();
        queued
            .into_iter()
            .map(|(ticket, transaction)| {
                let result = self.perform(transaction);
                if let Err(e) = &result {
                    warn!(ticket = ticket.0, "Transaction failed: {}", e);
                }
                Completion { ticket, result }
            })
            .collect()
    }

    /// Validate the whole transaction, then apply it as one undo step
    pub fn perform(&mut self, transaction: Transaction) -> Result<Change, TransactionError> {
        for op in &transaction.operations {
            self.validate(op)?;
        }
        if transaction.is_empty() {
            return Ok(Change::default());
        }

        self.save_undo();
        let mut change = Change::default();
        for op in transaction.operations {
            self.apply(op, &mut change);
        }
        self.version += 1;
        Ok(change)
    }

    fn validate(&self, op: &Operation) -> Result<(), TransactionError> {
        let root = self.map.root();
        let check = |ids: &[ObjectId]| -> Result<(), TransactionError> {
            for &id in ids {
                if id == root {
                    return Err(TransactionError::RootNotAllowed(op.name()));
                }
                if !self.map.contains(id) {
                    return Err(TransactionError::UnknownObject(id));
                }
            }
            Ok(())
        };
        match op {
            Operation::Select { objects }
            | Operation::Deselect { objects }
            | Operation::Transform { objects, .. }
            | Operation::TransformTexturesUniform { objects, .. }
            | Operation::TransformTexturesScale { objects, .. } => check(objects),
            Operation::Attach { parent, .. } if !self.map.contains(*parent) => {
                Err(TransactionError::UnknownParent(*parent))
            }
            Operation::Attach { .. }
            | Operation::SetCordon { .. }
            | Operation::SetSelectionOptions { .. } => Ok(()),
        }
    }

    fn apply(&mut self, op: Operation, change: &mut Change) {
        match op {
            Operation::Select { objects } => {
                for id in objects {
                    change.selection_changed |= self.selection.insert(id);
                }
            }
            Operation::Deselect { objects } => {
                for id in objects {
                    change.selection_changed |= self.selection.remove(id);
                }
            }
            Operation::Attach { parent, objects } => {
                for detached in objects {
                    let mut ids = Vec::new();
                    collect_ids(&detached, &mut ids);
                    // Parent was validated, attach cannot fail here
                    if self.map.attach(parent, detached).is_ok() {
                        for id in ids {
                            self.selection.insert(id);
                        }
                        change.objects_changed = true;
                        change.selection_changed = true;
                    }
                }
            }
            Operation::Transform { matrix, objects } => {
                for id in objects {
                    for descendant in self.map.find_all(id) {
                        if let Some(o) = self.map.get_mut(descendant) {
                            o.transform(&matrix);
                        }
                    }
                }
                change.objects_changed = true;
            }
            Operation::TransformTexturesUniform { matrix, objects } => {
                for id in objects {
                    if let Some(o) = self.map.get_mut(id) {
                        o.transform_textures_uniform(&matrix);
                    }
                }
                change.objects_changed = true;
            }
            Operation::TransformTexturesScale { matrix, objects } => {
                for id in objects {
                    if let Some(o) = self.map.get_mut(id) {
                        o.transform_textures_scale(&matrix);
                    }
                }
                change.objects_changed = true;
            }
            Operation::SetCordon { cordon } => {
                self.map.data.cordon = cordon;
                change.data_changed = true;
            }
            Operation::SetSelectionOptions { options } => {
                self.map.data.selection_options = options;
                change.data_changed = true;
            }
        }
    }

    fn save_undo(&mut self) {
        self.undo_stack.push_back((self.map.clone(), self.selection.clone()));
        if self.undo_stack.len() > MAX_UNDO {
            self.undo_stack.pop_front();
        }
        self.redo_stack.clear();
    }

    /// Undo last change
    pub fn undo(&mut self) -> bool {
        let Some(prev) = self.undo_stack.pop_back() else {
            return false;
        };
        let current = (std::mem::take(&mut self.map), std::mem::take(&mut self.selection));
        self.redo_stack.push(current);
        (self.map, self.selection) = prev;
        self.version += 1;
        true
    }

    /// Redo last undone change
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.redo_stack.pop() else {
            return false;
        };
        let current = (std::mem::take(&mut self.map), std::mem::take(&mut self.selection));
        self.undo_stack.push_back(current);
        (self.map, self.selection) = next;
        self.version += 1;
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }
}

fn collect_ids(detached: &DetachedObject, out: &mut Vec<ObjectId>) {
    out.push(detached.object.id);
    for child in &detached.children {
        collect_ids(child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::ObjectKind;
    use glam::{Mat4, Vec3};

    fn doc_with_entity() -> (MapDocument, ObjectId) {
        let mut map = Map::new();
        let id = map
            .add(
                map.root(),
                ObjectKind::Entity {
                    classname: "info_player_start".into(),
                    origin: Vec3::ZERO,
                },
            )
            .unwrap();
        (MapDocument::new(map), id)
    }

    #[test]
    fn test_submit_is_deferred() {
        let (mut doc, id) = doc_with_entity();
        let ticket = doc.submit(Transaction::new(vec![Operation::Select { objects: vec![id] }]));
        assert!(!doc.is_selected(id));
        assert!(doc.has_pending());

        let done = doc.process_pending();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].ticket, ticket);
        assert!(done[0].result.as_ref().unwrap().selection_changed);
        assert!(doc.is_selected(id));
    }

    #[test]
    fn test_failed_transaction_applies_nothing() {
        let (mut doc, id) = doc_with_entity();
        let missing = ObjectId::new();
        let result = doc.perform(Transaction::new(vec![
            Operation::Select { objects: vec![id] },
            Operation::Select { objects: vec![missing] },
        ]));
        assert_eq!(result, Err(TransactionError::UnknownObject(missing)));
        assert!(!doc.is_selected(id));
        assert!(!doc.can_undo());
    }

    #[test]
    fn test_root_cannot_be_transformed() {
        let (mut doc, _) = doc_with_entity();
        let root = doc.map.root();
        let result = doc.perform(Transaction::new(vec![Operation::Transform {
            matrix: Mat4::IDENTITY,
            objects: vec![root],
        }]));
        assert!(matches!(result, Err(TransactionError::RootNotAllowed(_))));
    }

    #[test]
    fn test_undo_redo_restore_selection_and_geometry() {
        let (mut doc, id) = doc_with_entity();
        doc.perform(Transaction::new(vec![
            Operation::Select { objects: vec![id] },
            Operation::Transform {
                matrix: Mat4::from_translation(Vec3::X * 16.0),
                objects: vec![id],
            },
        ]))
        .unwrap();
        let moved = doc.map.bounding_box(id).unwrap().center();
        assert_eq!(moved, Vec3::X * 16.0);

        assert!(doc.undo());
        assert!(!doc.is_selected(id));
        assert_eq!(doc.map.bounding_box(id).unwrap().center(), Vec3::ZERO);

        assert!(doc.redo());
        assert!(doc.is_selected(id));
        assert_eq!(doc.map.bounding_box(id).unwrap().center(), moved);
    }

    #[test]
    fn test_undo_history_drops_oldest_past_cap() {
        let (mut doc, id) = doc_with_entity();
        for _ in 0..MAX_UNDO + 5 {
            doc.perform(Transaction::new(vec![Operation::Transform {
                matrix: Mat4::from_translation(Vec3::X),
                objects: vec![id],
            }]))
            .unwrap();
        }
        for _ in 0..MAX_UNDO {
            assert!(doc.undo());
        }
        assert!(!doc.undo());
        // The first five steps fell off the front
        assert_eq!(doc.map.bounding_box(id).unwrap().center(), Vec3::X * 5.0);
    }

    #[test]
    fn test_selected_parents_skip_selected_descendants() {
        let mut map = Map::new();
        let group = map.add(map.root(), ObjectKind::Group).unwrap();
        let child = map
            .add(
                group,
                ObjectKind::Entity {
                    classname: "light".into(),
                    origin: Vec3::ZERO,
                },
            )
            .unwrap();
        let mut doc = MapDocument::new(map);
        doc.perform(Transaction::new(vec![Operation::Select {
            objects: vec![group, child],
        }]))
        .unwrap();
        assert_eq!(doc.selected_objects(), vec![group, child]);
        assert_eq!(doc.selected_parents(), vec![group]);
    }
}
