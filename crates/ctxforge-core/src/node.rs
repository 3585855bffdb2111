//! File and directory node types.

use std::cmp::Ordering;
use std::path::PathBuf;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Index of a node within its [`FileTree`](crate::FileTree) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl NodeId {
    /// Create a new NodeId from an arena index.
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Arena index of this node.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Why a node was left out of traversal and generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum IgnoreReason {
    /// Matched the repository `.gitignore`.
    #[strum(to_string = "gitignored")]
    Git,
    /// Matched the builtin defaults or the user's custom rules.
    #[strum(to_string = "ignored")]
    Custom,
}

/// A single file or directory in the tree.
///
/// Nodes live in the tree's arena; `parent` and `children` are indices into
/// it, so the tree owns every node exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileNode {
    /// Arena index of this node.
    pub id: NodeId,

    /// File/directory name (not full path).
    pub name: CompactString,

    /// Absolute path on disk.
    pub path: PathBuf,

    /// Path relative to the scan root, `/`-separated. Empty for the root.
    pub rel_path: String,

    /// Whether this node is a directory.
    pub is_dir: bool,

    /// Whether this entry is a symbolic link.
    #[serde(default)]
    pub is_symlink: bool,

    /// Size in bytes (0 for directories).
    pub size: u64,

    /// Matched the repository `.gitignore`.
    pub git_ignored: bool,

    /// Matched the builtin defaults or custom rules.
    pub custom_ignored: bool,

    /// Parent node, `None` for the root.
    pub parent: Option<NodeId>,

    /// Children in display order: directories first, then case-insensitive name.
    pub children: Vec<NodeId>,
}

impl FileNode {
    /// Create a new file node.
    pub fn new_file(
        id: NodeId,
        name: impl Into<CompactString>,
        path: impl Into<PathBuf>,
        rel_path: impl Into<String>,
        size: u64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            path: path.into(),
            rel_path: rel_path.into(),
            is_dir: false,
            is_symlink: false,
            size,
            git_ignored: false,
            custom_ignored: false,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Create a new directory node.
    pub fn new_directory(
        id: NodeId,
        name: impl Into<CompactString>,
        path: impl Into<PathBuf>,
        rel_path: impl Into<String>,
    ) -> Self {
        Self {
            is_dir: true,
            ..Self::new_file(id, name, path, rel_path, 0)
        }
    }

    /// Check if this node is a directory.
    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// Check if this node is a file.
    pub fn is_file(&self) -> bool {
        !self.is_dir
    }

    /// Whether any ignore rule matched this node.
    pub fn is_ignored(&self) -> bool {
        self.git_ignored || self.custom_ignored
    }

    /// The reason shown for an ignored node. Git wins when both apply.
    pub fn ignore_reason(&self) -> Option<IgnoreReason> {
        if self.git_ignored {
            Some(IgnoreReason::Git)
        } else if self.custom_ignored {
            Some(IgnoreReason::Custom)
        } else {
            None
        }
    }
}

/// Directories before files, then case-insensitive name ascending.
///
/// Names equal ignoring case fall back to a byte comparison so the order
/// stays total.
pub fn display_order(a_dir: bool, a_name: &str, b_dir: bool, b_name: &str) -> Ordering {
    b_dir
        .cmp(&a_dir)
        .then_with(|| {
            a_name
                .chars()
                .flat_map(char::to_lowercase)
                .cmp(b_name.chars().flat_map(char::to_lowercase))
        })
        .then_with(|| a_name.cmp(b_name))
}
