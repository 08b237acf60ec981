//! Extent index of Potree 1.x octrees.
//!
//! The bounding box and point count of every node is rebuilt from the HRC hierarchy files and
//! the root bounding box of `cloud.js`; payload files are never opened. Node boxes come from
//! octant arithmetic along each node's path code, see [`octree::create_child_aabb`].

pub mod hierarchy;
pub mod metadata;
pub mod octree;
pub mod prelude;
pub mod resource;
pub mod sink;
pub mod walker;

