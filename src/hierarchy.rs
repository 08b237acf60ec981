use binrw::{binrw, BinReaderExt};
use std::io::Cursor;
use thiserror::Error;

/// Deepest table level whose slot indices still fit in a `u64`.
pub const MAX_HIERARCHY_DEPTH: u32 = 20;

pub const BYTES_PER_NODE: usize = 5;

/// One node of an HRC file.
#[binrw]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[brw(little)]
pub struct HierarchyNodeEntry {
    pub child_mask: u8,
    pub num_points: u32,
}

#[derive(Error, Debug)]
pub enum DecodeHierarchyError {
    #[error("{len} bytes is not a whole number of {size}-byte records", size = BYTES_PER_NODE)]
    RecordSize { len: usize },

    #[error("truncated at level {level}: {expected} records required, {available} present")]
    Truncated {
        level: u32,
        expected: usize,
        available: usize,
    },

    #[error("{count} trailing records after level {max_depth}")]
    TrailingRecords { count: usize, max_depth: u32 },

    #[error("depth {0} exceeds the supported maximum of {max}", max = MAX_HIERARCHY_DEPTH)]
    UnsupportedDepth(u32),

    #[error("Invalid binary data")]
    InvalidBinaryData(#[from] binrw::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HierarchySlot {
    /// Breadth-first position at its level; the base-8 digits are the octants below the owner.
    pub index: u64,
    pub num_points: u32,
    pub child_mask: u8,
}

/// Decoded content of one hierarchy file, per level below the file's own node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyTable {
    max_depth: u32,
    own: Option<HierarchyNodeEntry>,
    levels: Vec<Vec<HierarchySlot>>,
}

impl HierarchyTable {
    pub fn empty(max_depth: u32) -> Self {
        Self {
            max_depth,
            own: None,
            levels: vec![Vec::new(); max_depth as usize + 1],
        }
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Point count of the node owning the file, `None` for an empty file.
    pub fn own_points(&self) -> Option<u32> {
        self.own.map(|entry| entry.num_points)
    }

    /// Present slots of `level`, sorted by index.
    pub fn level(&self, level: u32) -> &[HierarchySlot] {
        self.levels
            .get(level as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every present slot, by increasing level then increasing index.
    pub fn slots(&self) -> impl Iterator<Item = (u32, HierarchySlot)> + '_ {
        self.levels
            .iter()
            .enumerate()
            .flat_map(|(level, slots)| slots.iter().map(move |slot| (level as u32, *slot)))
    }

    pub fn len(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decodes an HRC file holding its own node plus `max_depth + 1` levels below it.
pub fn parse_hierarchy(buf: &[u8], max_depth: u32) -> Result<HierarchyTable, DecodeHierarchyError> {
    if max_depth > MAX_HIERARCHY_DEPTH {
        return Err(DecodeHierarchyError::UnsupportedDepth(max_depth));
    }
    if buf.len() % BYTES_PER_NODE != 0 {
        return Err(DecodeHierarchyError::RecordSize { len: buf.len() });
    }

    let mut table = HierarchyTable::empty(max_depth);
    if buf.is_empty() {
        return Ok(table);
    }

    let num_nodes = buf.len() / BYTES_PER_NODE;
    let mut cursor = Cursor::new(buf);

    // the first record is always the node owning the file
    let own: HierarchyNodeEntry = cursor.read_le()?;
    table.own = Some(own);
    let mut consumed = 1;

    let mut parents = vec![(0_u64, own.child_mask)];

    for level in 0..=max_depth {
        let expected = consumed
            + parents
                .iter()
                .map(|(_, mask)| mask.count_ones() as usize)
                .sum::<usize>();
        if expected > num_nodes {
            return Err(DecodeHierarchyError::Truncated {
                level,
                expected,
                available: num_nodes,
            });
        }

        let slots = &mut table.levels[level as usize];
        for (parent_index, mask) in &parents {
            for octant in 0..8u8 {
                if (1u8 << octant) & *mask == 0 {
                    continue;
                }
                let entry: HierarchyNodeEntry = cursor.read_le()?;
                slots.push(HierarchySlot {
                    index: (*parent_index << 3) | octant as u64,
                    num_points: entry.num_points,
                    child_mask: entry.child_mask,
                });
            }
        }
        consumed = expected;

        parents = slots
            .iter()
            .map(|slot| (slot.index, slot.child_mask))
            .collect();
    }

    if consumed < num_nodes {
        return Err(DecodeHierarchyError::TrailingRecords {
            count: num_nodes - consumed,
            max_depth,
        });
    }

    Ok(table)
}
