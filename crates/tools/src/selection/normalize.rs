//! Selection normalization and select/deselect transactions

use std::collections::HashSet;

use shared::{Map, MapDocument, MapObject, ObjectId, Operation, Ticket, Transaction};
use tracing::debug;

fn is_aggregate(object: &MapObject) -> bool {
    object.kind.is_aggregate()
}

/// Normalize candidates for selection.
///
/// Ignoring grouping keeps only leaves. Otherwise every candidate becomes
/// its topmost group or entity (or stays itself) and is expanded to its
/// whole subtree.
pub fn normalize_selection(
    map: &Map,
    objects: impl IntoIterator<Item = ObjectId>,
    ignore_grouping: bool,
) -> Vec<ObjectId> {
    let candidates = objects
        .into_iter()
        .filter(|&id| id != map.root() && map.contains(id));

    let mut seen = HashSet::new();
    if ignore_grouping {
        return candidates
            .filter(|&id| !map.has_children(id))
            .filter(|&id| seen.insert(id))
            .collect();
    }

    let tops: Vec<ObjectId> = candidates
        .map(|id| map.find_topmost_parent(id, is_aggregate).unwrap_or(id))
        .collect();
    let mut tops_seen = HashSet::new();
    tops.into_iter()
        .filter(|&id| tops_seen.insert(id))
        .flat_map(|id| map.find_all(id))
        .filter(|&id| seen.insert(id))
        .collect()
}

/// One atomic select + deselect; anything in both sets ends up selected
pub fn build_selection_transaction(
    document: &MapDocument,
    deselect: impl IntoIterator<Item = ObjectId>,
    select: impl IntoIterator<Item = ObjectId>,
    deselect_all: bool,
    ignore_grouping: bool,
) -> Transaction {
    let deselect: Vec<ObjectId> = if deselect_all {
        document.selected_objects()
    } else {
        deselect.into_iter().collect()
    };

    let select = normalize_selection(&document.map, select, ignore_grouping);
    let keep: HashSet<ObjectId> = select.iter().copied().collect();
    let deselect: Vec<ObjectId> = normalize_selection(&document.map, deselect, ignore_grouping)
        .into_iter()
        .filter(|id| !keep.contains(id))
        .collect();

    Transaction::new(vec![
        Operation::Select { objects: select },
        Operation::Deselect { objects: deselect },
    ])
}

/// Build and submit a selection change. Nothing is submitted when both
/// normalized sets are empty, so no-op clicks leave the history alone.
pub fn set_selected(
    document: &MapDocument,
    deselect: impl IntoIterator<Item = ObjectId>,
    select: impl IntoIterator<Item = ObjectId>,
    deselect_all: bool,
    ignore_grouping: bool,
) -> Option<Ticket> {
    let transaction =
        build_selection_transaction(document, deselect, select, deselect_all, ignore_grouping);
    let [Operation::Select { objects: s }, Operation::Deselect { objects: d }] =
        transaction.operations.as_slice()
    else {
        return Some(document.submit(transaction));
    };
    if s.is_empty() && d.is_empty() {
        return None;
    }
    debug!(select = s.len(), deselect = d.len(), "Selection change");
    Some(document.submit(transaction))
}

/// Bring the current selection in line with a changed grouping option.
///
/// When grouping is ignored, aggregates drop out of the selection. When it
/// is respected, each group or entity is completed if all its leaves are
/// selected and cleared otherwise. None if nothing changes.
pub fn regroup_transaction(document: &MapDocument, ignore_grouping: bool) -> Option<Transaction> {
    let map = &document.map;
    let selected = document.selected_objects();
    let mut select = Vec::new();
    let mut deselect = Vec::new();

    if ignore_grouping {
        deselect.extend(selected.iter().copied().filter(|&id| map.has_children(id)));
    } else {
        let mut seen = HashSet::new();
        let parents = selected
            .iter()
            .map(|&id| map.find_topmost_parent(id, is_aggregate).unwrap_or(id))
            .filter(|&id| seen.insert(id))
            .collect::<Vec<_>>();
        for parent in parents {
            let subtree = map.find_all(parent);
            let all_leaves_selected = subtree
                .iter()
                .filter(|&&id| !map.has_children(id))
                .all(|&id| document.is_selected(id));
            if all_leaves_selected {
                select.extend(subtree.iter().copied().filter(|&id| !document.is_selected(id)));
            } else {
                deselect.extend(subtree.iter().copied().filter(|&id| document.is_selected(id)));
            }
        }
    }

    if select.is_empty() && deselect.is_empty() {
        return None;
    }
    Some(Transaction::new(vec![
        Operation::Select { objects: select },
        Operation::Deselect { objects: deselect },
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use glam::Vec3;

    struct Scene {
        doc: MapDocument,
        group: ObjectId,
        a: ObjectId,
        b: ObjectId,
        loose: ObjectId,
    }

    fn scene() -> Scene {
        let mut map = shared::Map::new();
        let root = map.root();
        let group = fixtures::add_group(&mut map, root).unwrap();
        let a = fixtures::add_cuboid_to(&mut map, group, Vec3::ZERO, Vec3::splat(16.0)).unwrap();
        let b =
            fixtures::add_cuboid_to(&mut map, group, Vec3::splat(32.0), Vec3::splat(48.0)).unwrap();
        let loose = fixtures::add_cuboid(&mut map, Vec3::splat(64.0), Vec3::splat(80.0)).unwrap();
        Scene {
            doc: MapDocument::new(map),
            group,
            a,
            b,
            loose,
        }
    }

    fn as_set(ids: Vec<ObjectId>) -> HashSet<ObjectId> {
        ids.into_iter().collect()
    }

    #[test]
    fn test_grouped_candidate_expands_to_group() {
        let s = scene();
        let n = normalize_selection(&s.doc.map, [s.a], false);
        assert_eq!(n, vec![s.group, s.a, s.b]);
    }

    #[test]
    fn test_ignore_grouping_keeps_leaves() {
        let s = scene();
        let n = normalize_selection(&s.doc.map, [s.group, s.a, s.loose], true);
        assert_eq!(n, vec![s.a, s.loose]);
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let s = scene();
        for ignore in [false, true] {
            let once = normalize_selection(&s.doc.map, [s.a, s.loose, s.group], ignore);
            let twice = normalize_selection(&s.doc.map, once.clone(), ignore);
            assert_eq!(as_set(once), as_set(twice));
        }
    }

    #[test]
    fn test_select_wins_ties() {
        let mut s = scene();
        let tx = build_selection_transaction(&s.doc, [s.loose], [s.loose], false, false);
        s.doc.perform(tx).unwrap();
        assert!(s.doc.is_selected(s.loose));
    }

    #[test]
    fn test_deselect_all_replaces_deselect_set() {
        let mut s = scene();
        let tx = build_selection_transaction(&s.doc, [], [s.a], false, false);
        s.doc.perform(tx).unwrap();
        assert!(s.doc.is_selected(s.b));

        let tx = build_selection_transaction(&s.doc, [], [s.loose], true, false);
        s.doc.perform(tx).unwrap();
        assert_eq!(s.doc.selected_objects(), vec![s.loose]);
    }

    #[test]
    fn test_regroup_when_grouping_restored() {
        let mut s = scene();
        // Only one leaf of the group selected while grouping was ignored
        let tx = build_selection_transaction(&s.doc, [], [s.a], false, true);
        s.doc.perform(tx).unwrap();

        let tx = regroup_transaction(&s.doc, false).unwrap();
        s.doc.perform(tx).unwrap();
        assert!(s.doc.selection().is_empty());
    }

    #[test]
    fn test_regroup_when_grouping_ignored() {
        let mut s = scene();
        let tx = build_selection_transaction(&s.doc, [], [s.a], false, false);
        s.doc.perform(tx).unwrap();
        assert!(s.doc.is_selected(s.group));

        let tx = regroup_transaction(&s.doc, true).unwrap();
        s.doc.perform(tx).unwrap();
        assert!(!s.doc.is_selected(s.group));
        assert!(s.doc.is_selected(s.a) && s.doc.is_selected(s.b));
        assert!(regroup_transaction(&s.doc, true).is_none());
    }

    #[test]
    fn test_empty_selection_change_is_not_submitted() {
        let s = scene();
        assert_eq!(set_selected(&s.doc, [], [], true, false), None);
        assert!(!s.doc.has_pending());
        assert!(set_selected(&s.doc, [], [s.loose], false, false).is_some());
        assert!(s.doc.has_pending());
    }
}
