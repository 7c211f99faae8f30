//! Map document model shared by the editor tools.
//!
//! The tools never mutate a map directly: they read it through [`MapDocument`]
//! and submit [`Transaction`]s, which the host executes later.

mod data;
mod document;
mod geometry;
mod id;
mod map;
mod objects;
mod transaction;

pub use data::{CordonBounds, GridData, MapData, SelectionOptions, TransformationFlags};
pub use document::{MapDocument, Selection};
pub use geometry::{ray_triangle_intersect, BoundingBox, Line, Polygon, Ray, EPSILON, WORLD_EXTENT};
pub use id::ObjectId;
pub use map::Map;
pub use objects::{DetachedObject, Face, MapObject, ObjectKind, Texture};
pub use transaction::{Change, Completion, Operation, Ticket, Transaction, TransactionError};
