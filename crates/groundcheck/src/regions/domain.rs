use serde::{Deserialize, Serialize};
use std::fmt;

/// Codes of this length or shorter sit at the top of the hierarchy.
pub const ROOT_CODE_MAX_LEN: usize = 7;

/// Hierarchical administrative code; ancestors are string prefixes of descendants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionCode(String);

impl RegionCode {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.0.chars().count() <= ROOT_CODE_MAX_LEN
    }

    /// True when `self` is a proper prefix of `other`.
    pub fn is_strict_ancestor_of(&self, other: &RegionCode) -> bool {
        other.0.len() > self.0.len() && other.0.starts_with(&self.0)
    }
}

impl fmt::Display for RegionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RegionCode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Administrative region reference data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub code: RegionCode,
    pub name: String,
    /// Whether officers may register newly discovered businesses here.
    #[serde(default)]
    pub allow_new: bool,
}

impl Region {
    pub fn new(code: impl AsRef<str>, name: impl Into<String>) -> Self {
        Self {
            code: RegionCode::new(code),
            name: name.into(),
            allow_new: false,
        }
    }
}

/// Tree queries over the flat region table. Every backend evaluates these
/// with the same meaning as [`RegionQuery::matches`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionQuery {
    /// Regions whose code length is at most [`ROOT_CODE_MAX_LEN`].
    Roots,
    /// Regions whose code has the given code as a strict prefix.
    DescendantsOf(RegionCode),
    /// The region itself plus every region whose code is a prefix of it.
    PathTo(RegionCode),
}

impl RegionQuery {
    pub fn matches(&self, region: &Region) -> bool {
        match self {
            RegionQuery::Roots => region.code.is_root(),
            RegionQuery::DescendantsOf(parent) => parent.is_strict_ancestor_of(&region.code),
            RegionQuery::PathTo(target) => {
                region.code == *target || region.code.is_strict_ancestor_of(target)
            }
        }
    }
}
