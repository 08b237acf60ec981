pub mod file;

use crate::octree::PathCode;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Where the walker gets the hierarchy file of a node from.
pub trait HierarchySource {
    /// Raw content of the hierarchy file owned by `node`, or `None` when the node has none.
    fn read_hierarchy(&self, node: &PathCode) -> Result<Option<Vec<u8>>, ResourceError>;
}

impl<S: HierarchySource + ?Sized> HierarchySource for &S {
    fn read_hierarchy(&self, node: &PathCode) -> Result<Option<Vec<u8>>, ResourceError> {
        (**self).read_hierarchy(node)
    }
}

impl<S: HierarchySource + ?Sized> HierarchySource for Arc<S> {
    fn read_hierarchy(&self, node: &PathCode) -> Result<Option<Vec<u8>>, ResourceError> {
        (**self).read_hierarchy(node)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("File error on {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Hierarchy files kept in memory, keyed by the node owning them.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    files: BTreeMap<PathCode, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: PathCode, bytes: Vec<u8>) -> Option<Vec<u8>> {
        self.files.insert(node, bytes)
    }

    pub fn with(mut self, node: PathCode, bytes: Vec<u8>) -> Self {
        self.insert(node, bytes);
        self
    }
}

impl HierarchySource for MemorySource {
    fn read_hierarchy(&self, node: &PathCode) -> Result<Option<Vec<u8>>, ResourceError> {
        Ok(self.files.get(node).cloned())
    }
}
