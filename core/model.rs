use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A text file accepted into the working set.
///
/// `path` is slash-separated and relative to whatever source produced the
/// file; all exclusion matching happens against it. `size` is the UTF-8 byte
/// length of `content`. Binary files never become a `ProcessedFile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedFile {
    pub id: String,
    pub name: String,
    pub path: String,
    pub content: String,
    pub size: u64,
    #[serde(default)]
    pub media_type: String,
    pub last_modified: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub is_text: bool,
}

fn default_true() -> bool {
    true
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl ProcessedFile {
    pub fn new(path: &str, content: impl Into<String>) -> Result<Self> {
        let path = normalize_path(path);
        if path.is_empty() {
            return Err(AppError::InvalidArgument(
                "File path must not be empty".to_string(),
            ));
        }
        let content = content.into();
        Ok(Self {
            id: new_id(),
            name: base_name(&path).to_string(),
            size: content.len() as u64,
            path,
            content,
            media_type: String::new(),
            last_modified: Utc::now(),
            is_text: true,
        })
    }

    /// Re-establishes the invariants of a file that came from outside the
    /// constructor, such as a deserialized collection: the path is
    /// normalized and must be non-empty, `name` follows the path and `size`
    /// is recomputed from `content`.
    pub fn revalidated(mut self) -> Result<Self> {
        let path = normalize_path(&self.path);
        if path.is_empty() {
            return Err(AppError::InvalidArgument(format!(
                "File '{}' has an empty path",
                self.id
            )));
        }
        self.name = base_name(&path).to_string();
        self.path = path;
        self.size = self.content.len() as u64;
        if self.id.trim().is_empty() {
            self.id = new_id();
        }
        Ok(self)
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = media_type.into();
        self
    }

    pub fn with_last_modified(mut self, last_modified: DateTime<Utc>) -> Self {
        self.last_modified = last_modified;
        self
    }

    /// Lower-cased extension, or the whole lower-cased name when it has no dot.
    pub fn type_key(&self) -> String {
        match self.name.rsplit_once('.') {
            Some((_, ext)) => ext.to_lowercase(),
            None => self.name.to_lowercase(),
        }
    }
}

/// Converts platform separators to `/` and strips a leading `./`.
pub fn normalize_path(path: &str) -> String {
    let unified = path.replace('\\', "/");
    unified
        .trim_start_matches("./")
        .trim_start_matches('/')
        .to_string()
}

pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderFormat {
    None,
    #[default]
    Comment,
    Markdown,
    Custom,
}

impl FromStr for HeaderFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" | "plain" => Ok(HeaderFormat::None),
            "comment" => Ok(HeaderFormat::Comment),
            "markdown" | "md" => Ok(HeaderFormat::Markdown),
            "custom" => Ok(HeaderFormat::Custom),
            other => Err(AppError::InvalidArgument(format!(
                "Unknown header format '{}' (expected none, comment, markdown or custom)",
                other
            ))),
        }
    }
}

impl fmt::Display for HeaderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HeaderFormat::None => "none",
            HeaderFormat::Comment => "comment",
            HeaderFormat::Markdown => "markdown",
            HeaderFormat::Custom => "custom",
        };
        f.write_str(s)
    }
}

/// Controls one concatenation run.
///
/// `custom_header_template` is read only when `header_format` is
/// [`HeaderFormat::Custom`]; it understands `{path}`, `{name}`, `{size}` and
/// `{modified}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConcatenationOptions {
    #[serde(default = "default_true")]
    pub include_headers: bool,
    #[serde(default)]
    pub header_format: HeaderFormat,
    #[serde(default)]
    pub custom_header_template: Option<String>,
    #[serde(default = "default_separator")]
    pub separator: String,
}

pub const DEFAULT_SEPARATOR: &str = "\n\n";

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}

impl Default for ConcatenationOptions {
    fn default() -> Self {
        Self {
            include_headers: true,
            header_format: HeaderFormat::default(),
            custom_header_template: None,
            separator: default_separator(),
        }
    }
}
