//! In-memory decoy filesystem.
//!
//! Nodes live in a flat map keyed by absolute, normalized path. There are no
//! parent pointers; the tree shape is carried by each directory's `children`
//! set.
//!
//! Invariant: every non-root path present has a parent that is present, is a
//! directory, and lists the path's final segment among its children; `/`
//! always exists as a directory. The reverse also holds: every listed child
//! exists.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ROOT: &str = "/";

const SNAPSHOT_CHILD_LIMIT: usize = 20;
const SNAPSHOT_PREVIEW_CHARS: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FsNode {
    Dir { children: BTreeSet<String> },
    File { content: String },
}

impl FsNode {
    pub fn empty_dir() -> Self {
        Self::Dir {
            children: BTreeSet::new(),
        }
    }

    pub fn file(content: impl Into<String>) -> Self {
        Self::File {
            content: content.into(),
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Dir { .. })
    }
}

/// Filesystem failures. `Display` renders the conventional shell reason so
/// command handlers can splice it into `<cmd>: cannot ...: <reason>` lines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsError {
    #[error("No such file or directory")]
    NotFound,
    #[error("File exists")]
    AlreadyExists,
    #[error("Is a directory")]
    IsADirectory,
    #[error("Not a directory")]
    NotADirectory,
    #[error("Device or resource busy")]
    Busy,
    #[error("inconsistent tree at '{path}': {reason}")]
    Inconsistent { path: String, reason: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, FsNode>",
    into = "BTreeMap<String, FsNode>"
)]
pub struct VirtualFs {
    nodes: BTreeMap<String, FsNode>,
}

impl Default for VirtualFs {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualFs {
    /// A filesystem holding only the root directory.
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(ROOT.to_string(), FsNode::empty_dir());
        Self { nodes }
    }

    /// Builds a filesystem from raw nodes, rejecting maps that break the tree
    /// invariant.
    pub fn from_nodes(nodes: BTreeMap<String, FsNode>) -> Result<Self, FsError> {
        let fs = Self { nodes };
        fs.check_consistency()?;
        Ok(fs)
    }

    pub fn nodes(&self) -> &BTreeMap<String, FsNode> {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn exists(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn is_dir(&self, path: &str) -> bool {
        self.nodes.get(path).is_some_and(FsNode::is_dir)
    }

    pub fn list_dir(&self, path: &str) -> Option<&BTreeSet<String>> {
        match self.nodes.get(path)? {
            FsNode::Dir { children } => Some(children),
            FsNode::File { .. } => None,
        }
    }

    pub fn read_file(&self, path: &str) -> Option<&str> {
        match self.nodes.get(path)? {
            FsNode::File { content } => Some(content),
            FsNode::Dir { .. } => None,
        }
    }

    /// Creates or replaces the file at `path`.
    pub fn write_file(&mut self, path: &str, content: impl Into<String>) -> Result<(), FsError> {
        if self.is_dir(path) {
            return Err(FsError::IsADirectory);
        }
        let (parent, name) = split_parent(path).ok_or(FsError::IsADirectory)?;
        self.parent_children_mut(parent)?;

        self.nodes.insert(path.to_string(), FsNode::file(content));
        self.parent_children_mut(parent)?.insert(name.to_string());
        Ok(())
    }

    pub fn mkdir(&mut self, path: &str) -> Result<(), FsError> {
        if self.exists(path) {
            return Err(FsError::AlreadyExists);
        }
        let (parent, name) = split_parent(path).ok_or(FsError::AlreadyExists)?;
        self.parent_children_mut(parent)?;

        self.nodes.insert(path.to_string(), FsNode::empty_dir());
        self.parent_children_mut(parent)?.insert(name.to_string());
        Ok(())
    }

    /// Removes a file or an empty directory.
    pub fn remove(&mut self, path: &str) -> Result<(), FsError> {
        match self.nodes.get(path) {
            None => return Err(FsError::NotFound),
            Some(FsNode::Dir { children }) if !children.is_empty() => {
                return Err(FsError::IsADirectory)
            }
            Some(_) => {}
        }
        let (parent, name) = split_parent(path).ok_or(FsError::Busy)?;

        self.nodes.remove(path);
        if let Ok(children) = self.parent_children_mut(parent) {
            children.remove(name);
        }
        Ok(())
    }

    /// Short human-readable preview of well-known paths, used only as prompt
    /// context. Stops after `max_lines` lines.
    pub fn snapshot(&self, home: &str, max_lines: usize) -> String {
        let candidates = [
            ROOT.to_string(),
            "/home".to_string(),
            home.to_string(),
            format!("{home}/scripts"),
            format!("{home}/.ssh"),
            "/etc".to_string(),
            "/var/log".to_string(),
            "/tmp".to_string(),
            "/etc/hostname".to_string(),
            "/etc/passwd".to_string(),
            "/etc/shadow".to_string(),
            "/var/log/auth.log".to_string(),
            format!("{home}/notes.txt"),
            format!("{home}/scripts/backup.sh"),
            format!("{home}/.ssh/authorized_keys"),
        ];

        let mut lines = Vec::new();
        for path in &candidates {
            if lines.len() >= max_lines {
                break;
            }
            match self.nodes.get(path) {
                Some(FsNode::Dir { children }) => {
                    let shown = children
                        .iter()
                        .take(SNAPSHOT_CHILD_LIMIT)
                        .map(String::as_str)
                        .collect::<Vec<_>>()
                        .join(", ");
                    let label = if path == ROOT {
                        ROOT.to_string()
                    } else {
                        format!("{path}/")
                    };
                    lines.push(format!("{label} (dir): {shown}"));
                }
                Some(FsNode::File { content }) => {
                    lines.push(format!("{path} (file): {}", preview(content)));
                }
                None => {}
            }
        }
        lines.join("\n")
    }

    /// Verifies the tree invariant in both directions.
    pub fn check_consistency(&self) -> Result<(), FsError> {
        match self.nodes.get(ROOT) {
            Some(FsNode::Dir { .. }) => {}
            _ => {
                return Err(FsError::Inconsistent {
                    path: ROOT.to_string(),
                    reason: "root must be a directory",
                })
            }
        }

        for (path, node) in &self.nodes {
            if normalize(ROOT, ROOT, path) != *path {
                return Err(FsError::Inconsistent {
                    path: path.clone(),
                    reason: "path is not normalized",
                });
            }

            if let Some((parent, name)) = split_parent(path) {
                match self.nodes.get(parent) {
                    Some(FsNode::Dir { children }) if children.contains(name) => {}
                    Some(FsNode::Dir { .. }) => {
                        return Err(FsError::Inconsistent {
                            path: path.clone(),
                            reason: "parent does not list this entry",
                        })
                    }
                    _ => {
                        return Err(FsError::Inconsistent {
                            path: path.clone(),
                            reason: "parent is missing or not a directory",
                        })
                    }
                }
            }

            if let FsNode::Dir { children } = node {
                for child in children {
                    if child.is_empty() || child.contains('/') || !self.exists(&join(path, child)) {
                        return Err(FsError::Inconsistent {
                            path: path.clone(),
                            reason: "directory lists a missing child",
                        });
                    }
                }
            }
        }

        Ok(())
    }

    fn parent_children_mut(&mut self, parent: &str) -> Result<&mut BTreeSet<String>, FsError> {
        match self.nodes.get_mut(parent) {
            Some(FsNode::Dir { children }) => Ok(children),
            _ => Err(FsError::NotFound),
        }
    }
}

impl TryFrom<BTreeMap<String, FsNode>> for VirtualFs {
    type Error = FsError;

    fn try_from(nodes: BTreeMap<String, FsNode>) -> Result<Self, Self::Error> {
        Self::from_nodes(nodes)
    }
}

impl From<VirtualFs> for BTreeMap<String, FsNode> {
    fn from(fs: VirtualFs) -> Self {
        fs.nodes
    }
}

/// Resolves `raw` against `cwd` and `home` into a canonical absolute path.
///
/// `..` at the root is a no-op, so the result never leaves the tree.
pub fn normalize(cwd: &str, home: &str, raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() || raw == "." {
        return normalize(ROOT, ROOT, cwd);
    }

    let expanded = if raw == "~" {
        home.to_string()
    } else if let Some(rest) = raw.strip_prefix("~/") {
        format!("{home}/{rest}")
    } else {
        raw.to_string()
    };

    let joined = if expanded.starts_with('/') {
        expanded
    } else {
        format!("{cwd}/{expanded}")
    };

    let mut parts: Vec<&str> = Vec::new();
    for part in joined.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            segment => parts.push(segment),
        }
    }

    if parts.is_empty() {
        ROOT.to_string()
    } else {
        format!("/{}", parts.join("/"))
    }
}

fn split_parent(path: &str) -> Option<(&str, &str)> {
    if path == ROOT {
        return None;
    }
    let (parent, name) = path.rsplit_once('/')?;
    let parent = if parent.is_empty() { ROOT } else { parent };
    Some((parent, name))
}

fn join(dir: &str, name: &str) -> String {
    if dir == ROOT {
        format!("/{name}")
    } else {
        format!("{dir}/{name}")
    }
}

fn preview(content: &str) -> String {
    let escaped = content.replace('\n', "\\n");
    match escaped.char_indices().nth(SNAPSHOT_PREVIEW_CHARS) {
        Some((index, _)) => format!("{}...", &escaped[..index]),
        None => escaped,
    }
}
