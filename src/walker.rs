use crate::hierarchy::{parse_hierarchy, DecodeHierarchyError, HierarchySlot};
use crate::octree::{name_slot, Aabb, InvalidOctant, InvalidSlot, NodeKind, OctreeNodeRecord, PathCode};
use crate::resource::{HierarchySource, ResourceError};
use crate::sink::{RecordSink, SinkError};
use std::iter::FusedIterator;
use std::vec;
use thiserror::Error;
use tracing::{debug, info, trace};

#[derive(Error, Debug)]
pub enum WalkError {
    #[error("node {path}: {source}")]
    InvalidOctant {
        path: PathCode,
        #[source]
        source: InvalidOctant,
    },

    #[error("malformed hierarchy file for node {path}: {source}")]
    MalformedHierarchy {
        path: PathCode,
        #[source]
        source: DecodeHierarchyError,
    },

    #[error("hierarchy file for node {path}: {source}")]
    InvalidSlot {
        path: PathCode,
        #[source]
        source: InvalidSlot,
    },

    #[error("could not read hierarchy file for node {path}: {source}")]
    Resource {
        path: PathCode,
        #[source]
        source: ResourceError,
    },

    #[error("record sink rejected node {path}: {source}")]
    Sink {
        path: PathCode,
        #[source]
        source: SinkError,
    },
}

impl WalkError {
    /// Node whose processing failed.
    pub fn path(&self) -> &PathCode {
        match self {
            WalkError::InvalidOctant { path, .. }
            | WalkError::MalformedHierarchy { path, .. }
            | WalkError::InvalidSlot { path, .. }
            | WalkError::Resource { path, .. }
            | WalkError::Sink { path, .. } => path,
        }
    }
}

/// Reconstructs every node of an octree from its hierarchy files.
#[derive(Clone, Debug)]
pub struct TreeWalker<S> {
    source: S,
    root_box: Aabb,
    max_depth: u32,
    include_hierarchy_roots: bool,
}

impl<S: HierarchySource> TreeWalker<S> {
    pub fn new(source: S, root_box: Aabb, max_depth: u32) -> Self {
        Self {
            source,
            root_box,
            max_depth,
            include_hierarchy_roots: false,
        }
    }

    /// Also emit the node owning each hierarchy file, with the point count of its first record.
    pub fn include_hierarchy_roots(mut self, include: bool) -> Self {
        self.include_hierarchy_roots = include;
        self
    }

    pub fn root_box(&self) -> &Aabb {
        &self.root_box
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn walk(&self) -> Walk<'_, S> {
        self.walk_from(PathCode::root(), self.root_box)
    }

    /// Walks the subtree of `path`, whose box is `bounding_box`.
    pub fn walk_from(&self, path: PathCode, bounding_box: Aabb) -> Walk<'_, S> {
        Walk {
            walker: self,
            stack: Vec::new(),
            pending: Some((path, bounding_box)),
            done: false,
        }
    }

    /// Feeds every record to `sink` in walk order and returns how many were emitted.
    pub fn walk_into<K: RecordSink + ?Sized>(&self, sink: &mut K) -> Result<u64, WalkError> {
        let mut count = 0;
        for record in self.walk() {
            let record = record?;
            let path = record.path.clone();
            sink.accept(record)
                .map_err(|source| WalkError::Sink { path, source })?;
            count += 1;
        }
        info!(records = count, "octree walk complete");
        Ok(count)
    }
}

struct Frame {
    path: PathCode,
    bounding_box: Aabb,
    slots: vec::IntoIter<(u32, HierarchySlot)>,
}

enum Step {
    Emit(OctreeNodeRecord),
    Descend(PathCode, Aabb),
}

/// Depth-first walk over an octree, in on-disk order.
///
/// Uses an explicit stack of hierarchy files, so the depth of the tree does not grow the
/// call stack. Stops for good after the first error.
pub struct Walk<'a, S> {
    walker: &'a TreeWalker<S>,
    stack: Vec<Frame>,
    pending: Option<(PathCode, Aabb)>,
    done: bool,
}

impl<S: HierarchySource> Walk<'_, S> {
    fn enter(
        &mut self,
        path: PathCode,
        bounding_box: Aabb,
    ) -> Result<Option<OctreeNodeRecord>, WalkError> {
        let bytes = self
            .walker
            .source
            .read_hierarchy(&path)
            .map_err(|source| WalkError::Resource {
                path: path.clone(),
                source,
            })?;
        let Some(bytes) = bytes else {
            trace!(%path, "no hierarchy file");
            return Ok(None);
        };

        let table = parse_hierarchy(&bytes, self.walker.max_depth).map_err(|source| {
            WalkError::MalformedHierarchy {
                path: path.clone(),
                source,
            }
        })?;
        debug!(%path, nodes = table.len(), "decoded hierarchy file");

        let root_record = match table.own_points() {
            Some(num_points) if self.walker.include_hierarchy_roots => {
                Some(OctreeNodeRecord::new(path.clone(), num_points, bounding_box))
            }
            _ => None,
        };

        self.stack.push(Frame {
            path,
            bounding_box,
            slots: table.slots().collect::<Vec<_>>().into_iter(),
        });

        Ok(root_record)
    }

    fn fail(&mut self, error: WalkError) -> Option<Result<OctreeNodeRecord, WalkError>> {
        self.done = true;
        self.stack.clear();
        self.pending = None;
        Some(Err(error))
    }
}

fn visit_slot(
    path: &PathCode,
    bounding_box: &Aabb,
    level: u32,
    slot: &HierarchySlot,
    max_depth: u32,
) -> Result<Step, WalkError> {
    let name = name_slot(level, slot.index, path, max_depth).map_err(|source| {
        WalkError::InvalidSlot {
            path: path.clone(),
            source,
        }
    })?;

    let mut child_box = *bounding_box;
    for &octant in &name.suffix {
        child_box = child_box
            .child(octant as usize)
            .map_err(|source| WalkError::InvalidOctant {
                path: name.path.clone(),
                source,
            })?;
    }

    Ok(match name.kind {
        NodeKind::Terminal => Step::Emit(OctreeNodeRecord::new(name.path, slot.num_points, child_box)),
        NodeKind::Intermediate => Step::Descend(name.path, child_box),
    })
}

impl<S: HierarchySource> Iterator for Walk<'_, S> {
    type Item = Result<OctreeNodeRecord, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if let Some((path, bounding_box)) = self.pending.take() {
                match self.enter(path, bounding_box) {
                    Ok(Some(record)) => return Some(Ok(record)),
                    Ok(None) => {}
                    Err(error) => return self.fail(error),
                }
            }

            let Some(frame) = self.stack.last_mut() else {
                self.done = true;
                return None;
            };
            let Some((level, slot)) = frame.slots.next() else {
                self.stack.pop();
                continue;
            };

            match visit_slot(&frame.path, &frame.bounding_box, level, &slot, self.walker.max_depth) {
                Ok(Step::Emit(record)) => {
                    trace!(path = %record.path, points = record.num_points, "node");
                    return Some(Ok(record));
                }
                Ok(Step::Descend(path, bounding_box)) => self.pending = Some((path, bounding_box)),
                Err(error) => return self.fail(error),
            }
        }
    }
}

impl<S: HierarchySource> FusedIterator for Walk<'_, S> {}
