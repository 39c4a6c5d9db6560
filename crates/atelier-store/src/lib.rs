//! Pages, their undo/redo histories and the derived folder hierarchy.
//!
//! The [`DocumentStore`] is the only owner of page state. Every mutation
//! goes through one of its operations, each of which either completes or
//! leaves the store untouched.

pub mod error;
pub mod history;
pub mod path;
pub mod persist;
pub mod store;
pub mod tree;

pub use error::{Result, StoreError};
pub use history::{History, HistoryEntry};
pub use path::{PAGE_SUFFIX, PagePath, PathError, validate_folder};
pub use persist::{SessionFile, default_session_path};
pub use store::{
    Committed, Deleted, DocumentStore, HistoryStep, ImageRecord, PageRecord, Relocation,
    StoreOptions,
};
pub use tree::{MovePlan, MoveRejection, TreeNode, VirtualTree};
