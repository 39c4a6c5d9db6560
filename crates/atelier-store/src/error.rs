use std::path::PathBuf;

use thiserror::Error;

use crate::path::PathError;

/// Outcomes the Document Store refuses, leaving its state untouched.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{path} already exists")]
    AlreadyExists { path: String },

    #[error("{path} is protected and cannot be deleted")]
    ProtectedPage { path: String },

    #[error("no page or folder at {path}")]
    NotFound { path: String },

    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),

    #[error("cannot move {from} into {to}")]
    InvalidMove { from: String, to: String },

    #[error("session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("session file {path} is malformed: {source}")]
    Serde {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;
