//! Removal of editor-only markup from documents posted back by the sandbox.

use atelier_html::Document;

use crate::render::{KIND_ATTR, OVERLAY_MARKER, SCRIPT_MARKER};

/// Attributes the editor script may leave on live elements.
const EDITOR_ATTRS: &[&str] = &["contenteditable", "data-atelier-locked"];

/// Strip injected scripts, overlay nodes and editing attributes so only
/// page content reaches the store.
pub fn strip_editor_artifacts(html: &str) -> String {
    let mut doc = Document::parse(html);
    let root = doc.root();

    for id in doc.select_in(root, |el| el.has_attr(SCRIPT_MARKER) || el.has_attr(OVERLAY_MARKER)) {
        doc.detach(id);
    }

    for id in doc.select_in(root, |_| true) {
        doc.update_element(id, |el| {
            if el.remove_attr(KIND_ATTR).is_some() {
                el.remove_attr("draggable");
            }
            for attr in EDITOR_ATTRS {
                el.remove_attr(attr);
            }
            if el.attr("style").is_some_and(|style| style.trim().is_empty()) {
                el.remove_attr("style");
            }
        });
    }

    doc.serialize()
}
