//! Validated page and folder paths.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Extension separating renderable pages from folder segments.
pub const PAGE_SUFFIX: &str = ".html";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path is empty")]
    Empty,
    #[error("path {0:?} must be relative")]
    Absolute(String),
    #[error("path {0:?} contains a backslash")]
    Backslash(String),
    #[error("path {path:?} has an invalid segment {segment:?}")]
    InvalidSegment { path: String, segment: String },
    #[error("path {0:?} does not end with .html")]
    MissingSuffix(String),
    #[error("folder segment {segment:?} of {path:?} carries the page suffix")]
    FolderSuffix { path: String, segment: String },
}

/// A slash-delimited, relative path naming one page, e.g. `blog/post.html`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PagePath(String);

impl PagePath {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let segments = split_segments(raw)?;
        let (file, folders) = segments
            .split_last()
            .ok_or(PathError::Empty)?;
        if !is_page_name(file) {
            return Err(PathError::MissingSuffix(raw.to_string()));
        }
        if let Some(segment) = folders.iter().find(|segment| is_page_name(segment)) {
            return Err(PathError::FolderSuffix {
                path: raw.to_string(),
                segment: segment.to_string(),
            });
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Final segment, e.g. `post.html`.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Containing folder, empty for pages at the root.
    pub fn folder(&self) -> &str {
        match self.0.rfind('/') {
            Some(index) => &self.0[..index],
            None => "",
        }
    }

    /// True when the page lies somewhere below `folder`.
    pub fn is_under(&self, folder: &str) -> bool {
        folder.is_empty()
            || (self.0.len() > folder.len()
                && self.0.starts_with(folder)
                && self.0.as_bytes()[folder.len()] == b'/')
    }

    /// `folder/name`, or `name` for the root folder.
    pub fn join(folder: &str, name: &str) -> Result<Self, PathError> {
        if folder.is_empty() {
            Self::parse(name)
        } else {
            Self::parse(&format!("{folder}/{name}"))
        }
    }

    /// Swap the `from` folder prefix for `to`.
    pub fn rebase(&self, from: &str, to: &str) -> Result<Self, PathError> {
        let rest = if from.is_empty() {
            self.0.as_str()
        } else {
            self.0
                .strip_prefix(from)
                .and_then(|rest| rest.strip_prefix('/'))
                .unwrap_or(self.0.as_str())
        };
        Self::join(to, rest)
    }
}

impl fmt::Display for PagePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PagePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PagePath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PagePath> for String {
    fn from(path: PagePath) -> Self {
        path.0
    }
}

/// Validate a folder path. The empty string names the root folder.
pub fn validate_folder(raw: &str) -> Result<String, PathError> {
    if raw.is_empty() {
        return Ok(String::new());
    }
    let segments = split_segments(raw)?;
    if let Some(segment) = segments.iter().find(|segment| is_page_name(segment)) {
        return Err(PathError::FolderSuffix {
            path: raw.to_string(),
            segment: segment.to_string(),
        });
    }
    Ok(raw.to_string())
}

pub fn is_page_name(segment: &str) -> bool {
    segment.len() > PAGE_SUFFIX.len() && segment.ends_with(PAGE_SUFFIX)
}

fn split_segments(raw: &str) -> Result<Vec<&str>, PathError> {
    if raw.is_empty() {
        return Err(PathError::Empty);
    }
    if raw.starts_with('/') {
        return Err(PathError::Absolute(raw.to_string()));
    }
    if raw.contains('\\') {
        return Err(PathError::Backslash(raw.to_string()));
    }
    let segments: Vec<&str> = raw.split('/').collect();
    if let Some(segment) = segments
        .iter()
        .find(|segment| segment.is_empty() || **segment == "." || **segment == "..")
    {
        return Err(PathError::InvalidSegment {
            path: raw.to_string(),
            segment: segment.to_string(),
        });
    }
    Ok(segments)
}
