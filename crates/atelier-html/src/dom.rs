//! Owned, mutable document tree.
//!
//! `scraper` gives us a standards-compliant, error-tolerant parse; the result is
//! copied into an `ego_tree::Tree<DomNode>` that the repair passes and the
//! preview renderer can freely rearrange. Doctype, comments and processing
//! instructions are not carried over: the serializer regenerates a standard
//! doctype and comments are never part of a normalized page.

use std::ops::Deref;

use ego_tree::{NodeId, NodeRef, Tree};
use scraper::{Html, Node};

/// Elements that never carry children or an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose text children are written verbatim.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "noscript", "plaintext",
];

/// Elements whose first newline is swallowed by the parser.
const LEADING_NEWLINE_ELEMENTS: &[&str] = &["pre", "textarea", "listing"];

#[derive(Debug, Clone, PartialEq)]
pub enum DomNode {
    Document,
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementData {
    pub name: String,
    pub attrs: Vec<(String, String)>,
}

impl ElementData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .attrs
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(&name))
        {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let index = self
            .attrs
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))?;
        Some(self.attrs.remove(index).1)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|classes| classes.split_ascii_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// A parsed page that can be rearranged and serialized back to markup.
#[derive(Debug, Clone)]
pub struct Document {
    tree: Tree<DomNode>,
}

impl Document {
    /// Parse markup with the browser tree-construction rules. Never fails:
    /// malformed input is repaired the way a browser would repair it.
    pub fn parse(markup: &str) -> Self {
        let html = Html::parse_document(markup);
        let mut tree = Tree::new(DomNode::Document);
        let root = tree.root().id();
        for child in html.tree.root().children() {
            copy_node(&mut tree, root, child);
        }
        Self { tree }
    }

    pub fn root(&self) -> NodeId {
        self.tree.root().id()
    }

    pub fn node(&self, id: NodeId) -> Option<&DomNode> {
        self.tree.get(id).map(|node| node.value())
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.node(id)? {
            DomNode::Element(data) => Some(data),
            _ => None,
        }
    }

    /// Run `f` on the element data of `id`; `None` when `id` is not an element.
    pub fn update_element<R>(&mut self, id: NodeId, f: impl FnOnce(&mut ElementData) -> R) -> Option<R> {
        let mut node = self.tree.get_mut(id)?;
        match node.value() {
            DomNode::Element(data) => Some(f(data)),
            _ => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.node(id)? {
            DomNode::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId, name: &str) -> bool {
        self.element(id).map(|el| el.is(name)).unwrap_or(false)
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.tree
            .get(id)
            .map(|node| node.children().map(|child| child.id()).collect())
            .unwrap_or_default()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.tree.get(id)?.parent().map(|parent| parent.id())
    }

    /// True when `ancestor` is `node` or contains it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Descendants of `id` in document order, `id` excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        self.tree
            .get(id)
            .map(|node| node.descendants().skip(1).map(|d| d.id()).collect())
            .unwrap_or_default()
    }

    /// Elements named `name` below `scope`, in document order.
    pub fn find_all_in(&self, scope: NodeId, name: &str) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|id| self.is_element(*id, name))
            .collect()
    }

    pub fn find_all(&self, name: &str) -> Vec<NodeId> {
        self.find_all_in(self.root(), name)
    }

    pub fn find_first(&self, name: &str) -> Option<NodeId> {
        self.find_all(name).into_iter().next()
    }

    /// Elements below `scope` matching `predicate`, in document order.
    pub fn select_in<F>(&self, scope: NodeId, predicate: F) -> Vec<NodeId>
    where
        F: Fn(&ElementData) -> bool,
    {
        self.descendants(scope)
            .into_iter()
            .filter(|id| self.element(*id).map(&predicate).unwrap_or(false))
            .collect()
    }

    pub fn find_child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent)
            .into_iter()
            .find(|id| self.is_element(*id, name))
    }

    pub fn html(&self) -> Option<NodeId> {
        self.find_child(self.root(), "html")
    }

    pub fn head(&self) -> Option<NodeId> {
        self.find_child(self.html()?, "head")
    }

    pub fn body(&self) -> Option<NodeId> {
        self.find_child(self.html()?, "body")
    }

    /// Concatenated text of every descendant text node.
    pub fn text_content(&self, id: NodeId) -> String {
        let Some(node) = self.tree.get(id) else {
            return String::new();
        };
        node.descendants()
            .filter_map(|d| match d.value() {
                DomNode::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Text of the direct text children only.
    pub fn own_text(&self, id: NodeId) -> String {
        self.children(id)
            .into_iter()
            .filter_map(|child| self.text(child))
            .collect()
    }

    pub fn create_element(&mut self, data: ElementData) -> NodeId {
        self.tree.orphan(DomNode::Element(data)).id()
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.tree.orphan(DomNode::Text(text.into())).id()
    }

    /// Element with a single text child.
    pub fn create_text_element(&mut self, data: ElementData, text: impl Into<String>) -> NodeId {
        let element = self.create_element(data);
        let text = self.create_text(text);
        self.append(element, text);
        element
    }

    /// Move `child` (detaching it first) to the end of `parent`.
    /// Returns false when the move would create a cycle.
    pub fn append(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.contains(child, parent) {
            return false;
        }
        self.detach(child);
        match self.tree.get_mut(parent) {
            Some(mut node) => {
                node.append_id(child);
                true
            }
            None => false,
        }
    }

    pub fn prepend(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.contains(child, parent) {
            return false;
        }
        self.detach(child);
        match self.tree.get_mut(parent) {
            Some(mut node) => {
                node.prepend_id(child);
                true
            }
            None => false,
        }
    }

    pub fn insert_before(&mut self, sibling: NodeId, node: NodeId) -> bool {
        if sibling == node || self.contains(node, sibling) || self.parent(sibling).is_none() {
            return false;
        }
        self.detach(node);
        match self.tree.get_mut(sibling) {
            Some(mut target) => {
                target.insert_id_before(node);
                true
            }
            None => false,
        }
    }

    pub fn insert_after(&mut self, sibling: NodeId, node: NodeId) -> bool {
        if sibling == node || self.contains(node, sibling) || self.parent(sibling).is_none() {
            return false;
        }
        self.detach(node);
        match self.tree.get_mut(sibling) {
            Some(mut target) => {
                target.insert_id_after(node);
                true
            }
            None => false,
        }
    }

    pub fn detach(&mut self, id: NodeId) {
        if let Some(mut node) = self.tree.get_mut(id) {
            node.detach();
        }
    }

    /// Replace every child of `id` with a single text node.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        for child in self.children(id) {
            self.detach(child);
        }
        let text = self.create_text(text);
        self.append(id, text);
    }

    /// Guarantee the `html > head + body` skeleton, synthesizing what is missing.
    /// A `frameset` document loses its frameset in favor of a body.
    pub fn ensure_structure(&mut self) -> (NodeId, NodeId, NodeId) {
        let root = self.root();
        let html = match self.html() {
            Some(id) => id,
            None => {
                let html = self.create_element(ElementData::new("html"));
                for child in self.children(root) {
                    self.append(html, child);
                }
                self.append(root, html);
                html
            }
        };

        for frameset in self
            .children(html)
            .into_iter()
            .filter(|id| self.is_element(*id, "frameset"))
            .collect::<Vec<_>>()
        {
            self.detach(frameset);
        }

        let head = match self.find_child(html, "head") {
            Some(id) => id,
            None => {
                let head = self.create_element(ElementData::new("head"));
                self.prepend(html, head);
                head
            }
        };
        // Keep head first so serialization order matches nesting order.
        self.prepend(html, head);

        let body = match self.find_child(html, "body") {
            Some(id) => id,
            None => {
                let body = self.create_element(ElementData::new("body"));
                self.append(html, body);
                body
            }
        };
        for stray in self.children(html) {
            if stray != head && stray != body {
                let is_blank = self.text(stray).map(|t| t.trim().is_empty()).unwrap_or(false);
                if is_blank {
                    self.detach(stray);
                } else {
                    self.append(body, stray);
                }
            }
        }
        (html, head, body)
    }

    /// Serialize to canonical markup: a standard doctype, one top-level node
    /// per line inside `html`, `head` and `body`, and verbatim content below.
    pub fn serialize(&self) -> String {
        let mut out = String::from("<!DOCTYPE html>\n");
        match self.html() {
            Some(html) => self.write_html(&mut out, html),
            None => {
                for child in self.children(self.root()) {
                    self.write_node(&mut out, child, false);
                }
            }
        }
        out
    }

    /// Serialize the subtree rooted at `id` (used for fragments and tests).
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(&mut out, id, false);
        out
    }

    fn write_html(&self, out: &mut String, html: NodeId) {
        if let Some(data) = self.element(html) {
            write_start_tag(out, data);
        }
        out.push('\n');
        for child in self.children(html) {
            if self.is_element(child, "head") || self.is_element(child, "body") {
                self.write_section(out, child);
            } else if let Some(text) = self.text(child) {
                if !text.trim().is_empty() {
                    escape_text(out, text.trim());
                    out.push('\n');
                }
            } else {
                self.write_node(out, child, false);
                out.push('\n');
            }
        }
        out.push_str("</html>");
    }

    fn write_section(&self, out: &mut String, section: NodeId) {
        if let Some(data) = self.element(section) {
            write_start_tag(out, data);
            out.push('\n');
            for child in self.children(section) {
                if let Some(text) = self.text(child) {
                    let trimmed = text.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    escape_text(out, trimmed);
                } else {
                    self.write_node(out, child, false);
                }
                out.push('\n');
            }
            out.push_str("</");
            out.push_str(&data.name);
            out.push_str(">\n");
        }
    }

    fn write_node(&self, out: &mut String, id: NodeId, raw_text: bool) {
        match self.node(id) {
            Some(DomNode::Text(text)) => {
                if raw_text {
                    out.push_str(text);
                } else {
                    escape_text(out, text);
                }
            }
            Some(DomNode::Element(data)) => {
                write_start_tag(out, data);
                let name = data.name.to_ascii_lowercase();
                if VOID_ELEMENTS.contains(&name.as_str()) {
                    return;
                }
                let children = self.children(id);
                if LEADING_NEWLINE_ELEMENTS.contains(&name.as_str()) {
                    let leading_newline = children
                        .first()
                        .and_then(|first| self.text(*first))
                        .map(|text| text.starts_with('\n'))
                        .unwrap_or(false);
                    if leading_newline {
                        out.push('\n');
                    }
                }
                let raw = RAW_TEXT_ELEMENTS.contains(&name.as_str());
                for child in children {
                    self.write_node(out, child, raw);
                }
                out.push_str("</");
                out.push_str(&data.name);
                out.push('>');
            }
            Some(DomNode::Document) => {
                for child in self.children(id) {
                    self.write_node(out, child, false);
                }
            }
            None => {}
        }
    }
}

fn copy_node(tree: &mut Tree<DomNode>, parent: NodeId, source: NodeRef<'_, Node>) {
    let value = match source.value() {
        Node::Element(element) => DomNode::Element(ElementData {
            name: element.name().to_string(),
            attrs: element
                .attrs()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        }),
        Node::Text(text) => DomNode::Text(text.deref().to_string()),
        Node::Fragment | Node::Document => {
            for child in source.children() {
                copy_node(tree, parent, child);
            }
            return;
        }
        // Doctype is regenerated; comments and PIs are dropped.
        _ => return,
    };
    let id = match tree.get_mut(parent) {
        Some(mut node) => node.append(value).id(),
        None => return,
    };
    for child in source.children() {
        copy_node(tree, id, child);
    }
}

fn write_start_tag(out: &mut String, data: &ElementData) {
    out.push('<');
    out.push_str(&data.name);
    for (name, value) in &data.attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_attr(out, value);
        out.push('"');
    }
    out.push('>');
}

pub fn escape_text(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

pub fn escape_attr(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}
