use crate::octree::aabb::{Aabb, InvalidOctant};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const ROOT_MARKER: char = 'r';

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParsePathCodeError {
    #[error("path code {0:?} does not start with '{marker}'", marker = ROOT_MARKER)]
    MissingRootMarker(String),

    #[error("path code {0:?} contains a character that is not an octant digit")]
    InvalidDigit(String),
}

/// Address of an octree node: the root marker followed by one octant digit per level.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PathCode(String);

impl PathCode {
    pub fn root() -> Self {
        Self(ROOT_MARKER.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Depth from the tree root, counted in octant digits.
    pub fn level(&self) -> u32 {
        (self.0.len() - 1) as u32
    }

    pub fn digits(&self) -> impl DoubleEndedIterator<Item = u8> + ExactSizeIterator + '_ {
        self.0.as_bytes()[1..].iter().map(|digit| digit - b'0')
    }

    pub fn push(&mut self, octant: u8) -> Result<(), InvalidOctant> {
        if octant > 7 {
            return Err(InvalidOctant(octant as usize));
        }
        self.0.push(char::from(b'0' + octant));
        Ok(())
    }

    pub fn child(&self, octant: u8) -> Result<PathCode, InvalidOctant> {
        let mut child = self.clone();
        child.push(octant)?;
        Ok(child)
    }

    pub fn join(&self, suffix: &[u8]) -> Result<PathCode, InvalidOctant> {
        let mut path = self.clone();
        for &octant in suffix {
            path.push(octant)?;
        }
        Ok(path)
    }

    /// Narrows `root` along every digit of this path.
    pub fn bounding_box(&self, root: &Aabb) -> Aabb {
        self.digits().fold(*root, |aabb, digit| {
            aabb.child(digit as usize)
                .expect("path codes only hold octant digits")
        })
    }
}

impl Default for PathCode {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for PathCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PathCode {
    type Err = ParsePathCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(digits) = s.strip_prefix(ROOT_MARKER) else {
            return Err(ParsePathCodeError::MissingRootMarker(s.to_string()));
        };
        if !digits.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
            return Err(ParsePathCodeError::InvalidDigit(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    #[test]
    fn root_is_level_zero() {
        let root = PathCode::root();
        assert_eq!(root.as_str(), "r");
        assert_eq!(root.level(), 0);
        assert_eq!(root.digits().count(), 0);
    }

    #[test]
    fn child_appends_one_digit() {
        let path = PathCode::root().child(3).unwrap().child(7).unwrap();
        assert_eq!(path.to_string(), "r37");
        assert_eq!(path.level(), 2);
        assert_eq!(path.digits().collect::<Vec<_>>(), vec![3, 7]);
        assert_eq!(PathCode::root().child(8), Err(InvalidOctant(8)));
    }

    #[test]
    fn parse() {
        assert_eq!("r0123".parse::<PathCode>().unwrap().level(), 4);
        assert!(matches!(
            "0123".parse::<PathCode>(),
            Err(ParsePathCodeError::MissingRootMarker(_))
        ));
        assert!(matches!(
            "r018".parse::<PathCode>(),
            Err(ParsePathCodeError::InvalidDigit(_))
        ));
    }

    #[test]
    fn parse_errors_name_the_input() {
        let error = "x01".parse::<PathCode>().unwrap_err();
        assert_eq!(error.to_string(), "path code \"x01\" does not start with 'r'");
    }

    #[test]
    fn bounding_box_follows_digits() {
        let root = Aabb::new(DVec3::ZERO, DVec3::splat(8.0));
        let aabb = "r70".parse::<PathCode>().unwrap().bounding_box(&root);
        assert_eq!(aabb, Aabb::new(DVec3::splat(4.0), DVec3::splat(6.0)));
    }
}
