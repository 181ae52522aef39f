use crate::error::{AppError, Result};
use crate::model::ProcessedFile;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Name,
    Path,
    Size,
    Modified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(SortKey::Name),
            "path" => Ok(SortKey::Path),
            "size" => Ok(SortKey::Size),
            "modified" | "date" | "mtime" => Ok(SortKey::Modified),
            other => Err(AppError::InvalidArgument(format!(
                "Unknown sort key '{}' (expected name, path, size or modified)",
                other
            ))),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortKey::Name => "name",
            SortKey::Path => "path",
            SortKey::Size => "size",
            SortKey::Modified => "modified",
        })
    }
}

impl FromStr for SortOrder {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            other => Err(AppError::InvalidArgument(format!(
                "Unknown sort order '{}' (expected asc or desc)",
                other
            ))),
        }
    }
}

fn compare(a: &ProcessedFile, b: &ProcessedFile, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortKey::Path => a.path.to_lowercase().cmp(&b.path.to_lowercase()),
        SortKey::Size => a.size.cmp(&b.size),
        SortKey::Modified => a.last_modified.cmp(&b.last_modified),
    }
}

/// Stable sort; files comparing equal keep their relative order in both
/// directions.
pub fn sort_files(files: &mut [ProcessedFile], key: SortKey, order: SortOrder) {
    files.sort_by(|a, b| {
        let ordering = compare(a, b, key);
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}
