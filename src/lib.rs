//! Atelier: a browser-hosted website editor core.
//!
//! The [`Session`] ties the document store, the sandboxed preview and the
//! external collaborators together. Hosts feed it [`Command`]s and carry out
//! the [`Effect`]s it returns.

pub mod debounce;
pub mod intent;
pub mod session;

pub use debounce::Debouncer;
pub use intent::{Intent, IntentPolicy, Route, Scope};
pub use session::{
    Command, Effect, JobOutput, Notice, NoticeLevel, Session, SessionError, normalize_options,
    preview_renderer, starter_page, store_options,
};

pub use atelier_config as config;
pub use atelier_html as html;
pub use atelier_io as io;
pub use atelier_preview as preview;
pub use atelier_store as store;
