use crate::octree::path::PathCode;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidSlot {
    #[error("level {level} is deeper than the hierarchy depth {max_depth}")]
    LevelOutOfRange { level: u32, max_depth: u32 },

    #[error("slot {slot} does not exist at level {level}")]
    SlotOutOfRange { level: u32, slot: u64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// A payload file described by the current hierarchy file.
    Terminal,
    /// A node owning a further hierarchy file.
    Intermediate,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotName {
    pub path: PathCode,
    pub suffix: Vec<u8>,
    pub kind: NodeKind,
}

/// Number of slots a hierarchy table level can address: `8^(level + 1)`.
pub fn slots_at_level(level: u32) -> u64 {
    1u64.checked_shl(3 * (level + 1)).unwrap_or(u64::MAX)
}

/// Octant digits addressing `slot` at `level`, most significant first.
pub fn slot_suffix(level: u32, slot: u64) -> Vec<u8> {
    (0..=level)
        .rev()
        .map(|shift| (slot.checked_shr(3 * shift).unwrap_or(0) & 0b111) as u8)
        .collect()
}

/// Resolves slot `slot` of table level `level` of the hierarchy file owned by `current`.
pub fn name_slot(
    level: u32,
    slot: u64,
    current: &PathCode,
    max_depth: u32,
) -> Result<SlotName, InvalidSlot> {
    if level > max_depth {
        return Err(InvalidSlot::LevelOutOfRange { level, max_depth });
    }
    if slot >= slots_at_level(level) {
        return Err(InvalidSlot::SlotOutOfRange { level, slot });
    }

    let suffix = slot_suffix(level, slot);
    let path = current
        .join(&suffix)
        .expect("slot digits are masked to 0..=7");
    let kind = if level == max_depth {
        NodeKind::Intermediate
    } else {
        NodeKind::Terminal
    };

    Ok(SlotName { path, suffix, kind })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_level_slot_is_the_octant() {
        for octant in 0..8u8 {
            let name = name_slot(0, octant as u64, &PathCode::root(), 2).unwrap();
            assert_eq!(name.suffix, vec![octant]);
            assert_eq!(name.path.to_string(), format!("r{octant}"));
            assert_eq!(name.kind, NodeKind::Terminal);
        }
    }

    #[test]
    fn deeper_slots_read_as_base_eight() {
        let current: PathCode = "r5".parse().unwrap();
        let name = name_slot(2, 0o123, &current, 4).unwrap();
        assert_eq!(name.suffix, vec![1, 2, 3]);
        assert_eq!(name.path.to_string(), "r5123");

        assert_eq!(slot_suffix(1, 0), vec![0, 0]);
        assert_eq!(slot_suffix(1, 63), vec![7, 7]);
    }

    #[test]
    fn last_level_is_intermediate() {
        let name = name_slot(1, 9, &PathCode::root(), 1).unwrap();
        assert_eq!(name.path.to_string(), "r11");
        assert_eq!(name.kind, NodeKind::Intermediate);
    }

    #[test]
    fn rejects_out_of_range_slots() {
        let root = PathCode::root();
        assert_eq!(
            name_slot(0, 8, &root, 3),
            Err(InvalidSlot::SlotOutOfRange { level: 0, slot: 8 })
        );
        assert_eq!(
            name_slot(1, 64, &root, 3),
            Err(InvalidSlot::SlotOutOfRange { level: 1, slot: 64 })
        );
        assert_eq!(
            name_slot(4, 0, &root, 3),
            Err(InvalidSlot::LevelOutOfRange { level: 4, max_depth: 3 })
        );
    }
}
