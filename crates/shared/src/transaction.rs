use glam::Mat4;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::{CordonBounds, SelectionOptions};
use crate::id::ObjectId;
use crate::objects::DetachedObject;

/// A single document mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Select { objects: Vec<ObjectId> },
    Deselect { objects: Vec<ObjectId> },
    /// Insert detached subtrees under `parent`; attached objects join the selection
    Attach { parent: ObjectId, objects: Vec<DetachedObject> },
    /// Apply `matrix` to each object and all of its descendants
    Transform { matrix: Mat4, objects: Vec<ObjectId> },
    TransformTexturesUniform { matrix: Mat4, objects: Vec<ObjectId> },
    TransformTexturesScale { matrix: Mat4, objects: Vec<ObjectId> },
    SetCordon { cordon: CordonBounds },
    SetSelectionOptions { options: SelectionOptions },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Select { .. } => "select",
            Operation::Deselect { .. } => "deselect",
            Operation::Attach { .. } => "attach",
            Operation::Transform { .. } => "transform",
            Operation::TransformTexturesUniform { .. } => "transform_textures_uniform",
            Operation::TransformTexturesScale { .. } => "transform_textures_scale",
            Operation::SetCordon { .. } => "set_cordon",
            Operation::SetSelectionOptions { .. } => "set_selection_options",
        }
    }
}

/// An atomic list of operations, executed in order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub operations: Vec<Operation>,
}

impl Transaction {
    pub fn new(operations: Vec<Operation>) -> Self {
        Self { operations }
    }

    pub fn push(&mut self, op: Operation) {
        self.operations.push(op);
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }
}

/// Handle identifying a submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ticket(pub u64);

/// What a performed transaction touched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Change {
    pub selection_changed: bool,
    pub objects_changed: bool,
    pub data_changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    #[error("Unknown object: {0}")]
    UnknownObject(ObjectId),
    #[error("Unknown parent: {0}")]
    UnknownParent(ObjectId),
    #[error("Operation '{0}' cannot target the root object")]
    RootNotAllowed(&'static str),
}

/// Result of executing a queued transaction
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub ticket: Ticket,
    pub result: Result<Change, TransactionError>,
}

impl Completion {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}
