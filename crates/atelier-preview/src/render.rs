//! Builds the document shown inside the sandboxed preview frame.

use atelier_html::{Document, ElementData, NodeId, NormalizeOptions, Normalizer};
use tracing::debug;

use crate::nav::{NAV_MARKER, install_nav};
use crate::protocol::ElementKind;

/// Marker attribute carried by every injected script.
pub const SCRIPT_MARKER: &str = "data-atelier-script";
/// Drag-and-drop kind of an element, consumed by the editor script.
pub const KIND_ATTR: &str = "data-atelier-kind";
/// Marker of nodes the editor script adds to the live document.
pub const OVERLAY_MARKER: &str = "data-atelier-overlay";

const NAV_BRIDGE_JS: &str = include_str!("../assets/nav_bridge.js");
const EDITOR_JS: &str = include_str!("../assets/editor.js");

/// Elements whose subtree never takes part in direct manipulation.
const INERT_TAGS: &[&str] = &["script", "style", "template", "noscript", "head", "title"];

#[derive(Debug, Clone)]
pub struct PreviewRenderer {
    options: NormalizeOptions,
    host_origin: String,
}

impl PreviewRenderer {
    pub fn new(options: NormalizeOptions, host_origin: impl Into<String>) -> Self {
        Self {
            options,
            host_origin: host_origin.into(),
        }
    }

    pub fn host_origin(&self) -> &str {
        &self.host_origin
    }

    /// Render `code` for the sandbox with a navigation bar over `pages`
    /// and the editing scripts injected. Rendering a rendered document
    /// yields the same document.
    pub fn render<S: AsRef<str>>(&self, code: &str, pages: &[S], active: &str) -> String {
        let normalized = Normalizer::new(self.options.clone()).normalize(code, active);
        let mut doc = Document::parse(&normalized.html);
        let (_, head, body) = doc.ensure_structure();

        install_nav(&mut doc, body, pages, active);
        annotate_kinds(&mut doc, body);
        self.inject_script(&mut doc, head, "nav-bridge", NAV_BRIDGE_JS, None);
        self.inject_script(&mut doc, head, "editor", EDITOR_JS, Some(active));

        debug!(page = active, pages = pages.len(), "rendered preview");
        doc.serialize()
    }

    /// Add a marked script at the end of `head` unless one is present.
    /// A present script only has its attributes refreshed.
    fn inject_script(
        &self,
        doc: &mut Document,
        head: NodeId,
        name: &str,
        source: &str,
        page: Option<&str>,
    ) {
        let existing = doc
            .select_in(doc.root(), |el| el.is("script") && el.attr(SCRIPT_MARKER) == Some(name))
            .into_iter()
            .next();
        let script = match existing {
            Some(script) => script,
            None => {
                let script = doc.create_text_element(
                    ElementData::new("script").with_attr(SCRIPT_MARKER, name),
                    source,
                );
                doc.append(head, script);
                script
            }
        };
        doc.update_element(script, |data| {
            if let Some(page) = page {
                data.set_attr("data-page", page);
            }
            data.set_attr("data-host-origin", self.host_origin.as_str());
        });
    }
}

/// Tag every eligible element of `body` with its [`ElementKind`].
fn annotate_kinds(doc: &mut Document, body: NodeId) {
    let mut pending = doc.children(body);
    pending.reverse();
    while let Some(id) = pending.pop() {
        let Some(data) = doc.element(id) else {
            continue;
        };
        if INERT_TAGS.iter().any(|tag| data.is(tag)) || data.has_attr(NAV_MARKER) {
            continue;
        }
        let has_text = !doc.own_text(id).trim().is_empty();
        let kind = doc
            .element(id)
            .and_then(|data| ElementKind::classify(data, has_text));
        doc.update_element(id, |el| match kind {
            Some(kind) => el.set_attr(KIND_ATTR, kind.as_str()),
            None => {
                el.remove_attr(KIND_ATTR);
            }
        });
        // A map container is moved and resized as a whole.
        if kind == Some(ElementKind::MapContainer) {
            continue;
        }
        let mut children = doc.children(id);
        children.reverse();
        pending.extend(children);
    }
}
