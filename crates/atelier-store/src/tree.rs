//! Folder/page hierarchy derived from the page path set.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::path::{PagePath, validate_folder};

/// One node of the hierarchy, serialized as `{name, type, path, children}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TreeNode {
    File {
        name: String,
        path: String,
    },
    Folder {
        name: String,
        path: String,
        children: Vec<TreeNode>,
    },
}

impl TreeNode {
    pub fn name(&self) -> &str {
        match self {
            TreeNode::File { name, .. } | TreeNode::Folder { name, .. } => name,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            TreeNode::File { path, .. } | TreeNode::Folder { path, .. } => path,
        }
    }

    pub fn children(&self) -> &[TreeNode] {
        match self {
            TreeNode::File { .. } => &[],
            TreeNode::Folder { children, .. } => children,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, TreeNode::Folder { .. })
    }
}

/// Why a requested move leaves the hierarchy untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveRejection {
    /// Source and target are the same node.
    SelfMove,
    /// The target folder lies inside the moved folder.
    IntoDescendant,
    /// Nothing exists at the source path.
    UnknownSource,
    /// The target does not name a folder.
    NotAFolder,
    /// The source already sits directly in the target folder.
    AlreadyThere,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovePlan {
    /// Rename `from` (a page or folder path) to `to`.
    Move { from: String, to: String },
    NoOp(MoveRejection),
}

/// Read-only view of the hierarchy. Holds no state beyond what the path
/// set implies and is rebuilt whenever paths change.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VirtualTree {
    nodes: Vec<TreeNode>,
}

#[derive(Default)]
struct FolderBuilder {
    folders: BTreeMap<String, FolderBuilder>,
    files: BTreeSet<String>,
}

impl FolderBuilder {
    fn insert(&mut self, path: &PagePath) {
        let segments: Vec<&str> = path.segments().collect();
        let Some((file, folders)) = segments.split_last() else {
            return;
        };
        let mut current = self;
        for folder in folders {
            current = current.folders.entry(folder.to_string()).or_default();
        }
        current.files.insert(file.to_string());
    }

    fn finish(self, prefix: &str) -> Vec<TreeNode> {
        let join = |name: &str| {
            if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{prefix}/{name}")
            }
        };
        let mut nodes = Vec::with_capacity(self.folders.len() + self.files.len());
        for (name, folder) in self.folders {
            let path = join(&name);
            let children = folder.finish(&path);
            nodes.push(TreeNode::Folder {
                name,
                path,
                children,
            });
        }
        for name in self.files {
            let path = join(&name);
            nodes.push(TreeNode::File { name, path });
        }
        nodes
    }
}

impl VirtualTree {
    /// Folders first, then files, each in case-sensitive lexical order.
    pub fn build<'a, I>(paths: I) -> Self
    where
        I: IntoIterator<Item = &'a PagePath>,
    {
        let mut root = FolderBuilder::default();
        for path in paths {
            root.insert(path);
        }
        Self {
            nodes: root.finish(""),
        }
    }

    /// Top-level nodes.
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn find(&self, path: &str) -> Option<&TreeNode> {
        let mut level = self.nodes.as_slice();
        let mut found = None;
        for segment in path.split('/') {
            let node = level.iter().find(|node| node.name() == segment)?;
            level = node.children();
            found = Some(node);
        }
        found
    }

    /// Every node in display order, depth first.
    pub fn flatten(&self) -> Vec<&TreeNode> {
        fn walk<'a>(nodes: &'a [TreeNode], out: &mut Vec<&'a TreeNode>) {
            for node in nodes {
                out.push(node);
                walk(node.children(), out);
            }
        }
        let mut out = Vec::new();
        walk(&self.nodes, &mut out);
        out
    }

    /// Page paths in display order.
    pub fn pages(&self) -> Vec<&str> {
        self.flatten()
            .into_iter()
            .filter(|node| !node.is_folder())
            .map(|node| node.path())
            .collect()
    }

    /// Work out what moving `source` into `target_folder` (empty for the
    /// root) means for the path set. A folder that does not exist yet is a
    /// valid target: folders exist only through the pages below them.
    pub fn plan_move(&self, source: &str, target_folder: &str) -> MovePlan {
        let Some(node) = self.find(source) else {
            return MovePlan::NoOp(MoveRejection::UnknownSource);
        };
        if validate_folder(target_folder).is_err()
            || self.find(target_folder).map(|t| !t.is_folder()).unwrap_or(false)
        {
            return MovePlan::NoOp(MoveRejection::NotAFolder);
        }
        if source == target_folder {
            return MovePlan::NoOp(MoveRejection::SelfMove);
        }
        if node.is_folder()
            && target_folder.len() > source.len()
            && target_folder.starts_with(source)
            && target_folder.as_bytes()[source.len()] == b'/'
        {
            return MovePlan::NoOp(MoveRejection::IntoDescendant);
        }
        let parent = source.rfind('/').map(|i| &source[..i]).unwrap_or("");
        if parent == target_folder {
            return MovePlan::NoOp(MoveRejection::AlreadyThere);
        }
        let to = if target_folder.is_empty() {
            node.name().to_string()
        } else {
            format!("{target_folder}/{}", node.name())
        };
        MovePlan::Move {
            from: source.to_string(),
            to,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
