use super::{HierarchySource, ResourceError};
use crate::hierarchy::MAX_HIERARCHY_DEPTH;
use crate::octree::{PathCode, ROOT_MARKER};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Extension shared by every payload file of an octree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadExtension {
    Las,
    Laz,
}

impl PayloadExtension {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadExtension::Las => "las",
            PayloadExtension::Laz => "laz",
        }
    }
}

impl fmt::Display for PayloadExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("{} is not found", .0.display())]
    DataFolderMissing(PathBuf),

    #[error("{} is empty", .0.display())]
    DataFolderEmpty(PathBuf),

    #[error("{} holds neither r.las nor r.laz, only las/laz octrees are supported", .0.display())]
    UnsupportedExtension(PathBuf),

    #[error("{} holds both r.las and r.laz, mixed extensions are not supported", .0.display())]
    MixedExtensions(PathBuf),

    #[error("depth {0} exceeds the supported maximum of {max}", max = MAX_HIERARCHY_DEPTH)]
    UnsupportedDepth(u32),

    #[error("File error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// On-disk arrangement of a Potree 1.x octree folder.
///
/// Every node whose level is a multiple of the hierarchy step owns a folder named after its
/// last step digits, nested in the folder of its hierarchy ancestor. A node's hierarchy and
/// payload files live in the folder of the closest such node at or above it.
#[derive(Clone, Debug)]
pub struct OctreeLayout {
    root_dir: PathBuf,
    hierarchy_step: u32,
    extension: PayloadExtension,
}

impl OctreeLayout {
    /// Validates `data_dir` and detects the payload extension from the root node folder.
    ///
    /// The folder is made absolute, so every file path derived from the layout is too.
    pub fn open(data_dir: impl AsRef<Path>, max_depth: u32) -> Result<Self, LayoutError> {
        if max_depth > MAX_HIERARCHY_DEPTH {
            return Err(LayoutError::UnsupportedDepth(max_depth));
        }
        let data_dir = data_dir.as_ref();
        if !data_dir.is_dir() {
            return Err(LayoutError::DataFolderMissing(data_dir.to_path_buf()));
        }
        let data_dir = &fs::canonicalize(data_dir).map_err(|source| LayoutError::Io {
            path: data_dir.to_path_buf(),
            source,
        })?;
        let mut entries = read_dir(data_dir)?;
        if entries.next().is_none() {
            return Err(LayoutError::DataFolderEmpty(data_dir.to_path_buf()));
        }

        let root_dir = data_dir.join(ROOT_MARKER.to_string());
        if !root_dir.is_dir() {
            return Err(LayoutError::UnsupportedExtension(root_dir));
        }

        let root_name = PathCode::root();
        let las = format!("{root_name}.{}", PayloadExtension::Las);
        let laz = format!("{root_name}.{}", PayloadExtension::Laz);
        let (mut has_las, mut has_laz) = (false, false);
        for entry in read_dir(&root_dir)? {
            let entry = entry.map_err(|source| LayoutError::Io {
                path: root_dir.clone(),
                source,
            })?;
            let name = entry.file_name();
            has_las |= name == las.as_str();
            has_laz |= name == laz.as_str();
        }

        let extension = match (has_las, has_laz) {
            (true, false) => PayloadExtension::Las,
            (false, true) => PayloadExtension::Laz,
            (true, true) => return Err(LayoutError::MixedExtensions(root_dir)),
            (false, false) => return Err(LayoutError::UnsupportedExtension(root_dir)),
        };
        debug!(root = %root_dir.display(), %extension, "detected octree layout");

        Ok(Self {
            root_dir,
            hierarchy_step: max_depth + 1,
            extension,
        })
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn extension(&self) -> PayloadExtension {
        self.extension
    }

    pub fn hierarchy_step(&self) -> u32 {
        self.hierarchy_step
    }

    pub fn node_dir(&self, node: &PathCode) -> PathBuf {
        let digits = &node.as_str()[1..];
        let step = self.hierarchy_step as usize;
        let owned = (digits.len() / step) * step;

        let mut dir = self.root_dir.clone();
        for start in (0..owned).step_by(step) {
            dir.push(&digits[start..start + step]);
        }
        dir
    }

    pub fn hierarchy_file(&self, node: &PathCode) -> PathBuf {
        self.node_dir(node).join(format!("{node}.hrc"))
    }

    pub fn payload_file(&self, node: &PathCode) -> PathBuf {
        self.node_dir(node)
            .join(format!("{node}.{}", self.extension))
    }
}

impl HierarchySource for OctreeLayout {
    fn read_hierarchy(&self, node: &PathCode) -> Result<Option<Vec<u8>>, ResourceError> {
        let path = self.hierarchy_file(node);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ResourceError::File { path, source }),
        }
    }
}

fn read_dir(dir: &Path) -> Result<fs::ReadDir, LayoutError> {
    fs::read_dir(dir).map_err(|source| LayoutError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(step: u32) -> OctreeLayout {
        OctreeLayout {
            root_dir: PathBuf::from("/cloud/data/r"),
            hierarchy_step: step,
            extension: PayloadExtension::Laz,
        }
    }

    fn path(code: &str) -> PathCode {
        code.parse().unwrap()
    }

    #[test]
    fn files_of_the_root_hierarchy_live_in_the_root_dir() {
        let layout = layout(5);
        assert_eq!(layout.hierarchy_file(&path("r")), PathBuf::from("/cloud/data/r/r.hrc"));
        assert_eq!(
            layout.payload_file(&path("r0123")),
            PathBuf::from("/cloud/data/r/r0123.laz")
        );
    }

    #[test]
    fn deeper_nodes_nest_one_folder_per_step() {
        let layout = layout(5);
        assert_eq!(
            layout.hierarchy_file(&path("r01234")),
            PathBuf::from("/cloud/data/r/01234/r01234.hrc")
        );
        assert_eq!(
            layout.payload_file(&path("r0123456")),
            PathBuf::from("/cloud/data/r/01234/r0123456.laz")
        );
        assert_eq!(
            layout.node_dir(&path("r0123456701")),
            PathBuf::from("/cloud/data/r/01234/56701")
        );
    }

    #[test]
    fn open_rejects_unsupported_depth() {
        assert!(matches!(
            OctreeLayout::open("/nonexistent", u32::MAX),
            Err(LayoutError::UnsupportedDepth(u32::MAX))
        ));
        assert!(matches!(
            OctreeLayout::open("/nonexistent", MAX_HIERARCHY_DEPTH),
            Err(LayoutError::DataFolderMissing(_))
        ));
    }
}
