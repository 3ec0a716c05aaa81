//! Creative works.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::split::SplitModel;
use crate::TypeError;

/// Work identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct WorkId(pub String);

impl WorkId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WorkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Content category; drives credit weighting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ContentCategory {
    /// Short atomic item.
    Loop,
    /// Full-length atomic item.
    Song,
    /// Multi-item pack.
    Pack,
}

impl ContentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loop => "loop",
            Self::Song => "song",
            Self::Pack => "pack",
        }
    }
}

impl FromStr for ContentCategory {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "loop" => Ok(Self::Loop),
            "song" => Ok(Self::Song),
            "pack" => Ok(Self::Pack),
            other => Err(TypeError::UnknownCategory(other.to_string())),
        }
    }
}

/// A creative work with its ownership record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct Work {
    pub id: WorkId,
    /// Identity that uploaded the work and owns its split model.
    pub uploader: String,
    pub title: String,
    pub category: ContentCategory,
    pub is_draft: bool,
    /// Direct sources for derivative recordings (max 2).
    #[serde(default)]
    pub source_work_ids: Vec<WorkId>,
    #[serde(default)]
    pub splits: SplitModel,
    /// Non-cash stake the remixer recorded in this derivative.
    pub remixer_stake_pct: Option<u8>,
    #[serde(default)]
    pub is_deleted: bool,
    /// Bumped on every split write.
    #[serde(default)]
    pub splits_version: u64,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Work {
    /// True if this work was derived from other works.
    pub fn is_derivative(&self) -> bool {
        !self.source_work_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip_strings() {
        for cat in [ContentCategory::Loop, ContentCategory::Song, ContentCategory::Pack] {
            assert_eq!(cat.as_str().parse::<ContentCategory>().expect("parse"), cat);
        }
        assert!("stem".parse::<ContentCategory>().is_err());
    }

    #[test]
    fn test_work_id_serializes_as_string() {
        let json = serde_json::to_string(&WorkId::new("w-1")).expect("serialize");
        assert_eq!(json, "\"w-1\"");
    }
}
