//! Messages exchanged between the host and the sandboxed preview.

use atelier_html::ElementData;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Host → sandbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HostMessage {
    /// Replace the whole sandbox document.
    Render { html: String },
}

/// Sandbox → host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SandboxMessage {
    Navigation {
        href: String,
    },
    UpdateHtml {
        html: String,
        /// Page the document was rendered for. Absent in messages from
        /// older sandbox scripts, in which case the active page is meant.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        page: Option<String>,
    },
    FileDrop {
        #[serde(rename = "fileName")]
        file_name: String,
        #[serde(rename = "fileContent")]
        file_content: String,
    },
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("malformed sandbox message: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl HostMessage {
    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl SandboxMessage {
    pub fn decode(data: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SandboxMessage::Navigation { .. } => "navigation",
            SandboxMessage::UpdateHtml { .. } => "update-html",
            SandboxMessage::FileDrop { .. } => "file-drop",
        }
    }
}

/// Raw inbound `postMessage` event as the host sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub origin: String,
    /// JSON text of a [`SandboxMessage`].
    pub data: String,
}

impl InboundEvent {
    pub fn new(origin: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            data: data.into(),
        }
    }

    /// Event carrying `message`, mostly useful to tests and local tooling.
    pub fn from_message(origin: impl Into<String>, message: &SandboxMessage) -> Self {
        Self::new(
            origin,
            serde_json::to_string(message).unwrap_or_default(),
        )
    }
}

/// Drag-and-drop class of a preview element, computed once at render time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementKind {
    Image,
    Button,
    MapContainer,
    Generic,
}

const MAP_CLASSES: &[&str] = &["map", "map-container", "map-section"];

impl ElementKind {
    /// Classify an element. `None` means it takes no part in direct
    /// manipulation (no text of its own and no special kind).
    pub fn classify(element: &ElementData, has_own_text: bool) -> Option<Self> {
        let name = element.name.to_ascii_lowercase();
        if name == "img" || name == "picture" {
            return Some(ElementKind::Image);
        }
        if name == "button"
            || (name == "input"
                && matches!(
                    element.attr("type").map(str::to_ascii_lowercase).as_deref(),
                    Some("button" | "submit" | "reset")
                ))
        {
            return Some(ElementKind::Button);
        }
        if element.has_attr("data-map")
            || element.attr("id").map(|id| id == "map").unwrap_or(false)
            || MAP_CLASSES.iter().any(|class| element.has_class(class))
        {
            return Some(ElementKind::MapContainer);
        }
        has_own_text.then_some(ElementKind::Generic)
    }

    /// Dropping one element on another swaps their content only for equal,
    /// non-generic kinds.
    pub fn compatible(self, other: ElementKind) -> bool {
        self == other && self != ElementKind::Generic
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ElementKind::Image => "image",
            ElementKind::Button => "button",
            ElementKind::MapContainer => "map-container",
            ElementKind::Generic => "generic",
        }
    }
}

/// Origins the host accepts inbound messages from. `"*"` accepts any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginPolicy {
    allowed: Vec<String>,
}

impl OriginPolicy {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allows(&self, origin: &str) -> bool {
        self.allowed
            .iter()
            .any(|allowed| allowed == "*" || allowed == origin)
    }
}

impl Default for OriginPolicy {
    /// An opaque sandboxed frame reports the literal origin `null`.
    fn default() -> Self {
        Self::new(["null"])
    }
}
