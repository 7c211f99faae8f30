//! Applying a transformation matrix to the selection

use glam::Mat4;
use shared::{DetachedObject, MapDocument, Operation, Ticket, Transaction};
use tracing::info;

/// How face textures follow a transformation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureTransformationType {
    #[default]
    None,
    Uniform,
    Scale,
}

/// Build the transaction for transforming the selected parents.
///
/// A clone transforms fresh copies, deselects the originals and attaches the
/// copies under the root, which selects them.
pub fn build_transform_transaction(
    document: &MapDocument,
    matrix: Mat4,
    clone: bool,
    texture_transform: TextureTransformationType,
    keep_visgroups: bool,
) -> Transaction {
    let parents = document.selected_parents();
    let mut transaction = Transaction::default();

    if clone {
        let copies: Vec<DetachedObject> = parents
            .iter()
            .filter_map(|&id| document.map.copy_subtree(id))
            .map(|mut copy| {
                copy.transform(&matrix);
                match texture_transform {
                    TextureTransformationType::Uniform => copy.transform_textures_uniform(&matrix),
                    TextureTransformationType::Scale => copy.transform_textures_scale(&matrix),
                    TextureTransformationType::None => {}
                }
                if !keep_visgroups {
                    copy.strip_visgroups();
                }
                copy
            })
            .collect();

        transaction.push(Operation::Deselect {
            objects: document.selected_objects(),
        });
        transaction.push(Operation::Attach {
            parent: document.map.root(),
            objects: copies,
        });
        return transaction;
    }

    transaction.push(Operation::Transform {
        matrix,
        objects: parents.clone(),
    });
    let all = || -> Vec<_> { parents.iter().flat_map(|&id| document.map.find_all(id)).collect() };
    match texture_transform {
        TextureTransformationType::Uniform => transaction.push(Operation::TransformTexturesUniform {
            matrix,
            objects: all(),
        }),
        TextureTransformationType::Scale => transaction.push(Operation::TransformTexturesScale {
            matrix,
            objects: all(),
        }),
        TextureTransformationType::None => {}
    }
    transaction
}

/// Transform the selection as one undoable step
pub fn execute_transform(
    document: &MapDocument,
    name: &str,
    matrix: Mat4,
    clone: bool,
    texture_transform: TextureTransformationType,
    keep_visgroups: bool,
) -> Ticket {
    info!(
        transformation = name,
        clone,
        textures = ?texture_transform,
        "Transforming selection"
    );
    let transaction =
        build_transform_transaction(document, matrix, clone, texture_transform, keep_visgroups);
    document.submit(transaction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use glam::Vec3;
    use shared::{Map, ObjectId};

    fn doc_with_selected_cube() -> (MapDocument, ObjectId) {
        let mut map = Map::new();
        let id = fixtures::add_cuboid(&mut map, Vec3::ZERO, Vec3::splat(32.0)).unwrap();
        if let Some(o) = map.get_mut(id) {
            o.visgroups = vec![3];
        }
        let mut doc = MapDocument::new(map);
        doc.perform(Transaction::new(vec![Operation::Select { objects: vec![id] }]))
            .unwrap();
        (doc, id)
    }

    #[test]
    fn test_transform_moves_selection_and_textures() {
        let (mut doc, id) = doc_with_selected_cube();
        let m = Mat4::from_translation(Vec3::new(16.0, 0.0, 0.0));
        let uniform = TextureTransformationType::Uniform;
        let tx = build_transform_transaction(&doc, m, false, uniform, true);
        assert_eq!(tx.len(), 2);
        assert_eq!(tx.operations[1].name(), "transform_textures_uniform");

        doc.perform(tx).unwrap();
        let b = doc.map.bounding_box(id).unwrap();
        assert_eq!(b.start, Vec3::new(16.0, 0.0, 0.0));
        assert!(doc.is_selected(id));
    }

    #[test]
    fn test_no_texture_transform_is_single_operation() {
        let (doc, _) = doc_with_selected_cube();
        let none = TextureTransformationType::None;
        let tx = build_transform_transaction(&doc, Mat4::IDENTITY, false, none, true);
        assert_eq!(tx.len(), 1);
    }

    #[test]
    fn test_clone_moves_selection_to_copies() {
        let (mut doc, id) = doc_with_selected_cube();
        let before = doc.map.len();
        let m = Mat4::from_translation(Vec3::new(0.0, 64.0, 0.0));
        let tx = build_transform_transaction(&doc, m, true, TextureTransformationType::None, false);
        doc.perform(tx).unwrap();

        assert_eq!(doc.map.len(), before + 1);
        assert!(!doc.is_selected(id));
        let selected = doc.selected_objects();
        assert_eq!(selected.len(), 1);
        let copy = doc.map.get(selected[0]).unwrap();
        assert!(copy.visgroups.is_empty());
        assert_eq!(doc.map.bounding_box(copy.id).unwrap().start, Vec3::new(0.0, 64.0, 0.0));
        // Original untouched
        assert_eq!(doc.map.bounding_box(id).unwrap().start, Vec3::ZERO);
    }

    #[test]
    fn test_clone_keeps_visgroups_when_asked() {
        let (mut doc, _) = doc_with_selected_cube();
        let none = TextureTransformationType::None;
        let tx = build_transform_transaction(&doc, Mat4::IDENTITY, true, none, true);
        doc.perform(tx).unwrap();
        let copy = doc.selected_objects()[0];
        assert_eq!(doc.map.get(copy).unwrap().visgroups, vec![3]);
    }
}
