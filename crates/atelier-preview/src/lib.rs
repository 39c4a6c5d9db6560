//! Sandboxed live preview: document rendering and the message channel
//! between the host and the preview frame.

pub mod artifacts;
pub mod channel;
pub mod nav;
pub mod protocol;
pub mod render;

pub use artifacts::strip_editor_artifacts;
pub use channel::{SyncChannel, SyncEffect};
pub use nav::NAV_MARKER;
pub use protocol::{ElementKind, HostMessage, InboundEvent, OriginPolicy, ProtocolError, SandboxMessage};
pub use render::{KIND_ATTR, OVERLAY_MARKER, PreviewRenderer, SCRIPT_MARKER};
