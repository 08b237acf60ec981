use crate::hierarchy::MAX_HIERARCHY_DEPTH;
use crate::octree::Aabb;
use glam::DVec3;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const METADATA_FILE: &str = "cloud.js";

#[derive(Error, Debug)]
pub enum ReadMetadataError {
    #[error("Error: {} is not found", .0.display())]
    Missing(PathBuf),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid json: {0}")]
    JsonError(#[from] serde_json::error::Error),

    #[error("unsupported hierarchyStepSize {0}")]
    InvalidStepSize(u32),

    #[error("bounding box has min > max")]
    InvalidBoundingBox,
}

/// The `cloud.js` document written by PotreeConverter 1.x.
#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CloudMetadata {
    #[serde(default)]
    pub version: String,
    #[serde(default = "default_octree_dir")]
    pub octree_dir: String,
    #[serde(default)]
    pub points: u64,
    pub bounding_box: BoundingBox,
    #[serde(default)]
    pub tight_bounding_box: Option<BoundingBox>,
    #[serde(default)]
    pub spacing: f64,
    #[serde(default)]
    pub scale: f64,
    pub hierarchy_step_size: u32,
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub lx: f64,
    pub ly: f64,
    pub lz: f64,
    pub ux: f64,
    pub uy: f64,
    pub uz: f64,
}

fn default_octree_dir() -> String {
    "data".to_string()
}

impl From<BoundingBox> for Aabb {
    fn from(bounding_box: BoundingBox) -> Self {
        Aabb::new(
            DVec3::new(bounding_box.lx, bounding_box.ly, bounding_box.lz),
            DVec3::new(bounding_box.ux, bounding_box.uy, bounding_box.uz),
        )
    }
}

impl CloudMetadata {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ReadMetadataError> {
        let metadata: CloudMetadata = serde_json::from_slice(bytes)?;
        metadata.validate()?;
        Ok(metadata)
    }

    /// Reads `cloud.js` from the octree's input folder.
    pub fn from_dir(input_dir: impl AsRef<Path>) -> Result<Self, ReadMetadataError> {
        let path = input_dir.as_ref().join(METADATA_FILE);
        if !path.is_file() {
            return Err(ReadMetadataError::Missing(path));
        }
        Self::from_slice(&fs::read(path)?)
    }

    fn validate(&self) -> Result<(), ReadMetadataError> {
        if self.hierarchy_step_size == 0 || self.hierarchy_step_size > MAX_HIERARCHY_DEPTH + 1 {
            return Err(ReadMetadataError::InvalidStepSize(self.hierarchy_step_size));
        }
        if !self.root_box().is_valid() {
            return Err(ReadMetadataError::InvalidBoundingBox);
        }
        Ok(())
    }

    pub fn root_box(&self) -> Aabb {
        self.bounding_box.into()
    }

    /// Deepest level of a hierarchy table: an HRC file holds its own node plus
    /// `hierarchyStepSize` levels below it.
    pub fn max_depth(&self) -> u32 {
        self.hierarchy_step_size - 1
    }

    pub fn data_dir(&self, input_dir: impl AsRef<Path>) -> PathBuf {
        input_dir.as_ref().join(&self.octree_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLOUD_JS: &str = r#"{
        "version": "1.7",
        "octreeDir": "data",
        "points": 1234,
        "boundingBox": {"lx": 0.0, "ly": 10.0, "lz": -5.0, "ux": 64.0, "uy": 74.0, "uz": 59.0},
        "tightBoundingBox": {"lx": 1.0, "ly": 11.0, "lz": -4.0, "ux": 60.0, "uy": 70.0, "uz": 20.0},
        "pointAttributes": "LAZ",
        "spacing": 0.5,
        "scale": 0.001,
        "hierarchyStepSize": 5
    }"#;

    #[test]
    fn parses_cloud_js() {
        let metadata = CloudMetadata::from_slice(CLOUD_JS.as_bytes()).unwrap();
        assert_eq!(metadata.version, "1.7");
        assert_eq!(metadata.points, 1234);
        assert_eq!(metadata.max_depth(), 4);
        assert_eq!(
            metadata.root_box(),
            Aabb::new(DVec3::new(0.0, 10.0, -5.0), DVec3::new(64.0, 74.0, 59.0))
        );
        assert_eq!(metadata.data_dir("/cloud"), PathBuf::from("/cloud/data"));
    }

    #[test]
    fn octree_dir_defaults_to_data() {
        let json = r#"{"boundingBox": {"lx": 0, "ly": 0, "lz": 0, "ux": 1, "uy": 1, "uz": 1}, "hierarchyStepSize": 1}"#;
        let metadata = CloudMetadata::from_slice(json.as_bytes()).unwrap();
        assert_eq!(metadata.octree_dir, "data");
        assert_eq!(metadata.max_depth(), 0);
    }

    #[test]
    fn rejects_zero_step_size() {
        let json = r#"{"boundingBox": {"lx": 0, "ly": 0, "lz": 0, "ux": 1, "uy": 1, "uz": 1}, "hierarchyStepSize": 0}"#;
        assert!(matches!(
            CloudMetadata::from_slice(json.as_bytes()),
            Err(ReadMetadataError::InvalidStepSize(0))
        ));
    }

    #[test]
    fn rejects_step_size_beyond_supported_depth() {
        let json = r#"{"boundingBox": {"lx": 0, "ly": 0, "lz": 0, "ux": 1, "uy": 1, "uz": 1}, "hierarchyStepSize": 22}"#;
        assert!(matches!(
            CloudMetadata::from_slice(json.as_bytes()),
            Err(ReadMetadataError::InvalidStepSize(22))
        ));

        let json = json.replace("22", "21");
        let metadata = CloudMetadata::from_slice(json.as_bytes()).unwrap();
        assert_eq!(metadata.max_depth(), MAX_HIERARCHY_DEPTH);
    }

    #[test]
    fn rejects_inverted_box() {
        let json = r#"{"boundingBox": {"lx": 2, "ly": 0, "lz": 0, "ux": 1, "uy": 1, "uz": 1}, "hierarchyStepSize": 5}"#;
        assert!(matches!(
            CloudMetadata::from_slice(json.as_bytes()),
            Err(ReadMetadataError::InvalidBoundingBox)
        ));
    }
}
