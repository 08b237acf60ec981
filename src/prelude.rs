pub use crate::metadata::CloudMetadata;
pub use crate::octree::{Aabb, OctreeNodeRecord, PathCode};
pub use crate::resource::file::{OctreeLayout, PayloadExtension};
pub use crate::resource::{HierarchySource, MemorySource};
pub use crate::sink::{NdjsonSink, RecordSink, SqlScriptSink};
pub use crate::walker::TreeWalker;

// Error types
pub use crate::hierarchy::DecodeHierarchyError;
pub use crate::metadata::ReadMetadataError;
pub use crate::resource::file::LayoutError;
pub use crate::walker::WalkError;
