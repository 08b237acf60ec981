pub mod aabb;
pub mod naming;
pub mod path;
pub mod record;

pub use aabb::{create_child_aabb, Aabb, InvalidOctant};
pub use naming::{name_slot, InvalidSlot, NodeKind, SlotName};
pub use path::{ParsePathCodeError, PathCode, ROOT_MARKER};
pub use record::OctreeNodeRecord;
