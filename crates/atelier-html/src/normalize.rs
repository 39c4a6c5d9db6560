//! Repair raw generator output into a complete, canonical page.

use std::collections::HashMap;

use ego_tree::NodeId;
use tracing::{debug, warn};

use crate::defaults::{
    COMMENTARY_MARKERS, DEFAULT_CHARSET, DEFAULT_LANG, DEFAULT_STYLESHEET, DEFAULT_VIEWPORT,
    MEANINGFUL_TAGS, PREAMBLE_TAGS,
};
use crate::dom::{Document, ElementData};
use crate::isolate::{isolate_markup, standardize_doctype};

/// Knobs for the repair pipeline.
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// Suffix of every page title ("About - {site_label}").
    pub site_label: String,
    /// Sentence written after the page name in a synthesized footer.
    pub footer_notice: String,
    /// Lower-case prefixes identifying generator meta-commentary.
    pub commentary_markers: Vec<String>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            site_label: "My Website".to_string(),
            footer_notice: "All rights reserved.".to_string(),
            commentary_markers: COMMENTARY_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// How an irrecoverable input was replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// The last page produced for the same identity was reused.
    LastKnownGood,
    /// No earlier page existed; a minimal error page was produced.
    ErrorPage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub html: String,
    pub fallback: Option<Fallback>,
}

/// Stateful normalizer remembering the last valid page of every identity.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    options: NormalizeOptions,
    last_valid: HashMap<String, String>,
}

impl Normalizer {
    pub fn new(options: NormalizeOptions) -> Self {
        Self {
            options,
            last_valid: HashMap::new(),
        }
    }

    pub fn options(&self) -> &NormalizeOptions {
        &self.options
    }

    /// Normalize `raw` for the page `identity`. Never fails.
    pub fn normalize(&mut self, raw: &str, identity: &str) -> Normalized {
        if let Some(html) = normalize_page(raw, identity, &self.options) {
            self.last_valid.insert(identity.to_string(), html.clone());
            return Normalized {
                html,
                fallback: None,
            };
        }

        if let Some(previous) = self.last_valid.get(identity) {
            warn!(identity, "irrecoverable markup, keeping last valid page");
            return Normalized {
                html: previous.clone(),
                fallback: Some(Fallback::LastKnownGood),
            };
        }

        warn!(identity, "irrecoverable markup, substituting error page");
        Normalized {
            html: error_page(identity, &self.options),
            fallback: Some(Fallback::ErrorPage),
        }
    }

    /// Record `html` as the known-valid page of `identity`.
    pub fn remember(&mut self, identity: &str, html: &str) {
        self.last_valid
            .insert(identity.to_string(), html.to_string());
    }

    pub fn forget(&mut self, identity: &str) {
        self.last_valid.remove(identity);
    }

    /// Carry the remembered page over to a new identity.
    pub fn rename(&mut self, from: &str, to: &str) {
        if let Some(html) = self.last_valid.remove(from) {
            self.last_valid.insert(to.to_string(), html);
        }
    }
}

/// Run the repair pipeline. Returns `None` when nothing usable remains
/// after stripping, leaving the fallback decision to the caller.
pub fn normalize_page(raw: &str, identity: &str, options: &NormalizeOptions) -> Option<String> {
    let isolated = isolate_markup(raw);
    if isolated.is_empty() {
        return None;
    }

    let mut doc = Document::parse(&standardize_doctype(&isolated));
    let (html, head, body) = doc.ensure_structure();

    prune_commentary(&mut doc, body, &options.commentary_markers);
    prune_preamble(&mut doc, body);
    if !has_content(&doc, head, body) {
        debug!(identity, "nothing left after pruning");
        return None;
    }

    place_footer(&mut doc, body, identity, options);
    complete_head(&mut doc, html, head);
    normalize_title(&mut doc, head, &page_title(identity, &options.site_label));
    ensure_stylesheet(&mut doc, head);

    Some(doc.serialize())
}

/// Title for a page: human-cased file stem plus the site label.
pub fn page_title(identity: &str, site_label: &str) -> String {
    format!("{} - {}", page_display_name(identity), site_label)
}

/// Human-cased file stem: `blog/our-team.html` becomes `Our Team`.
pub fn page_display_name(identity: &str) -> String {
    let file = identity.rsplit('/').next().unwrap_or(identity);
    let stem = match file.rfind('.') {
        Some(index) => &file[..index],
        None => file,
    };
    let words: Vec<String> = stem
        .split(|c: char| c == '-' || c == '_' || c == ' ' || c == '.')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect();
    if words.is_empty() {
        "Page".to_string()
    } else {
        words.join(" ")
    }
}

fn error_page(identity: &str, options: &NormalizeOptions) -> String {
    let mut escaped = String::new();
    crate::dom::escape_text(&mut escaped, identity);
    let markup = format!("<main><h1>Error: Invalid HTML generated for {escaped}</h1></main>");
    normalize_page(&markup, identity, options)
        .unwrap_or_else(|| format!("<!DOCTYPE html>\n<html><head></head><body>{markup}</body></html>"))
}

fn is_commentary(text: &str, markers: &[String]) -> bool {
    let text = text.trim().to_lowercase();
    !text.is_empty() && markers.iter().any(|marker| text.starts_with(marker.as_str()))
}

fn prune_commentary(doc: &mut Document, body: NodeId, markers: &[String]) {
    for child in doc.children(body) {
        let text = if let Some(text) = doc.text(child) {
            text.to_string()
        } else if doc.is_element(child, "p") {
            doc.text_content(child)
        } else {
            continue;
        };
        if is_commentary(&text, markers) {
            debug!(text = %text.trim(), "dropping generator commentary");
            doc.detach(child);
        }
    }
}

fn is_meaningful(doc: &Document, id: NodeId) -> bool {
    let tag_is_meaningful = |id: NodeId| {
        doc.element(id)
            .map(|el| MEANINGFUL_TAGS.contains(&el.name.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    };
    tag_is_meaningful(id) || doc.descendants(id).into_iter().any(tag_is_meaningful)
}

fn is_preamble(doc: &Document, id: NodeId) -> bool {
    if doc.text(id).is_some() {
        return true;
    }
    doc.element(id)
        .map(|el| PREAMBLE_TAGS.contains(&el.name.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Drop prose that precedes the first meaningful element of the body.
fn prune_preamble(doc: &mut Document, body: NodeId) {
    let children = doc.children(body);
    let Some(first) = children.iter().position(|id| is_meaningful(doc, *id)) else {
        return;
    };
    for id in &children[..first] {
        if is_preamble(doc, *id) {
            doc.detach(*id);
        }
    }
}

fn has_content(doc: &Document, head: NodeId, body: NodeId) -> bool {
    let body_has_content = doc.children(body).into_iter().any(|id| match doc.text(id) {
        Some(text) => !text.trim().is_empty(),
        None => true,
    });
    let head_has_content = doc
        .children(head)
        .into_iter()
        .any(|id| doc.element(id).is_some());
    body_has_content || head_has_content
}

/// Leave exactly one footer, as the last child of the body.
fn place_footer(doc: &mut Document, body: NodeId, identity: &str, options: &NormalizeOptions) {
    let footers = doc.find_all_in(body, "footer");
    let primary = match footers.first() {
        Some(id) => *id,
        None => {
            let footer = doc.create_element(ElementData::new("footer"));
            let notice = format!(
                "\u{a9} {}. {}",
                page_display_name(identity),
                options.footer_notice
            );
            let paragraph = doc.create_text_element(ElementData::new("p"), notice);
            doc.append(footer, paragraph);
            footer
        }
    };

    for extra in footers.iter().skip(1) {
        if !doc.contains(primary, *extra) {
            for child in doc.children(*extra) {
                doc.append(primary, child);
            }
        } else {
            for child in doc.children(*extra) {
                doc.insert_before(*extra, child);
            }
        }
        doc.detach(*extra);
    }

    doc.append(body, primary);
}

fn complete_head(doc: &mut Document, html: NodeId, head: NodeId) {
    doc.update_element(html, |root| {
        if !root.has_attr("lang") {
            root.set_attr("lang", DEFAULT_LANG);
        }
    });

    let metas = doc.children(head);
    let charset = metas.iter().copied().find(|id| {
        doc.element(*id)
            .map(|el| el.is("meta") && el.has_attr("charset"))
            .unwrap_or(false)
    });
    let charset = match charset {
        Some(id) => id,
        None => {
            let meta = doc.create_element(ElementData::new("meta").with_attr("charset", DEFAULT_CHARSET));
            doc.prepend(head, meta);
            meta
        }
    };

    let has_viewport = doc.children(head).into_iter().any(|id| {
        doc.element(id)
            .map(|el| {
                el.is("meta")
                    && el
                        .attr("name")
                        .map(|name| name.eq_ignore_ascii_case("viewport"))
                        .unwrap_or(false)
            })
            .unwrap_or(false)
    });
    if !has_viewport {
        let meta = doc.create_element(
            ElementData::new("meta")
                .with_attr("name", "viewport")
                .with_attr("content", DEFAULT_VIEWPORT),
        );
        doc.insert_after(charset, meta);
    }
}

/// Keep a single title, placed after the head's meta declarations.
fn normalize_title(doc: &mut Document, head: NodeId, title: &str) {
    let mut titles = doc
        .find_all("title")
        .into_iter()
        .filter(|id| !inside(doc, *id, "svg"))
        .collect::<Vec<_>>()
        .into_iter();
    let primary = match titles.next() {
        Some(id) => id,
        None => doc.create_element(ElementData::new("title")),
    };
    for extra in titles {
        doc.detach(extra);
    }
    doc.set_text(primary, title);

    let anchor = doc
        .children(head)
        .into_iter()
        .filter(|id| *id != primary && doc.element(*id).is_some())
        .take_while(|id| doc.is_element(*id, "meta"))
        .last();
    match anchor {
        Some(meta) => {
            doc.insert_after(meta, primary);
        }
        None => {
            doc.prepend(head, primary);
        }
    }
}

fn inside(doc: &Document, id: NodeId, name: &str) -> bool {
    let mut current = doc.parent(id);
    while let Some(parent) = current {
        if doc.is_element(parent, name) {
            return true;
        }
        current = doc.parent(parent);
    }
    false
}

fn ensure_stylesheet(doc: &mut Document, head: NodeId) {
    let has_style = doc
        .children(head)
        .into_iter()
        .any(|id| doc.is_element(id, "style"));
    if !has_style {
        let style = doc.create_text_element(ElementData::new("style"), DEFAULT_STYLESHEET);
        doc.append(head, style);
    }
}
