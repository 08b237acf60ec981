use crate::octree::aabb::Aabb;
use crate::octree::path::PathCode;
use glam::DVec2;

/// One node of the octree as reconstructed from the hierarchy files.
#[derive(Clone, Debug, PartialEq)]
pub struct OctreeNodeRecord {
    pub path: PathCode,
    pub level: u32,
    pub num_points: u32,
    pub bounding_box: Aabb,
}

impl OctreeNodeRecord {
    pub fn new(path: PathCode, num_points: u32, bounding_box: Aabb) -> Self {
        Self {
            level: path.level(),
            path,
            num_points,
            bounding_box,
        }
    }

    pub fn min_z(&self) -> f64 {
        self.bounding_box.min.z
    }

    pub fn max_z(&self) -> f64 {
        self.bounding_box.max.z
    }

    pub fn footprint(&self) -> (DVec2, DVec2) {
        self.bounding_box.footprint()
    }
}
