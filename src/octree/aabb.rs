use glam::{BVec3, DVec2, DVec3};
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("octant index {0} is outside 0..=7")]
pub struct InvalidOctant(pub usize);

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Returns `true` when `min <= max` on every axis.
    pub fn is_valid(&self) -> bool {
        self.min.cmple(self.max).all()
    }

    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    pub fn volume(&self) -> f64 {
        let size = self.size();
        size.x * size.y * size.z
    }

    /// The (x, y) rectangle covered by the box, as `(min, max)`.
    pub fn footprint(&self) -> (DVec2, DVec2) {
        (self.min.truncate(), self.max.truncate())
    }

    pub fn child(&self, index: usize) -> Result<Aabb, InvalidOctant> {
        create_child_aabb(self, index)
    }
}

/// Box of octant `index` of `aabb`.
///
/// Bit 0 selects the upper half on z, bit 1 on y and bit 2 on x, which is the
/// numbering used by the node names on disk.
pub fn create_child_aabb(aabb: &Aabb, index: usize) -> Result<Aabb, InvalidOctant> {
    if index > 7 {
        return Err(InvalidOctant(index));
    }

    // siblings share the midpoint, so their faces meet exactly
    let mid = aabb.min + aabb.size() * 0.5;
    let upper = BVec3::new(index & 0b100 != 0, index & 0b010 != 0, index & 0b001 != 0);

    Ok(Aabb::new(
        DVec3::select(upper, mid, aabb.min),
        DVec3::select(upper, aabb.max, mid),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube(size: f64) -> Aabb {
        Aabb::new(DVec3::ZERO, DVec3::splat(size))
    }

    fn intersection(a: &Aabb, b: &Aabb) -> Option<Aabb> {
        let aabb = Aabb::new(a.min.max(b.min), a.max.min(b.max));
        aabb.is_valid().then_some(aabb)
    }

    #[test]
    fn octants_follow_on_disk_numbering() {
        let root = cube(8.0);
        let expected = [
            ((0.0, 0.0, 0.0), (4.0, 4.0, 4.0)),
            ((0.0, 0.0, 4.0), (4.0, 4.0, 8.0)),
            ((0.0, 4.0, 0.0), (4.0, 8.0, 4.0)),
            ((0.0, 4.0, 4.0), (4.0, 8.0, 8.0)),
            ((4.0, 0.0, 0.0), (8.0, 4.0, 4.0)),
            ((4.0, 0.0, 4.0), (8.0, 4.0, 8.0)),
            ((4.0, 4.0, 0.0), (8.0, 8.0, 4.0)),
            ((4.0, 4.0, 4.0), (8.0, 8.0, 8.0)),
        ];

        for (index, (min, max)) in expected.into_iter().enumerate() {
            let child = root.child(index).unwrap();
            assert_eq!(child.min, DVec3::new(min.0, min.1, min.2), "octant {index}");
            assert_eq!(child.max, DVec3::new(max.0, max.1, max.2), "octant {index}");
        }
    }

    #[test]
    fn children_partition_parent() {
        let parent = Aabb::new(DVec3::new(-3.0, 10.0, 0.5), DVec3::new(5.0, 14.0, 2.5));
        let children: Vec<Aabb> = (0..8).map(|i| parent.child(i).unwrap()).collect();

        let total: f64 = children.iter().map(Aabb::volume).sum();
        assert_eq!(total, parent.volume());

        for (i, a) in children.iter().enumerate() {
            assert!(a.is_valid());
            assert_eq!(intersection(a, &parent), Some(*a));
            for b in &children[i + 1..] {
                let shared = intersection(a, b).map(|aabb| aabb.volume()).unwrap_or(0.0);
                assert_eq!(shared, 0.0);
            }
        }
    }

    #[test]
    fn rejects_out_of_range_octant() {
        assert_eq!(cube(1.0).child(8), Err(InvalidOctant(8)));
    }

    #[test]
    fn footprint_drops_z() {
        let (min, max) = Aabb::new(DVec3::new(1.0, 2.0, 3.0), DVec3::new(4.0, 5.0, 6.0)).footprint();
        assert_eq!(min, DVec2::new(1.0, 2.0));
        assert_eq!(max, DVec2::new(4.0, 5.0));
    }
}
