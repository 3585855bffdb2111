//! File tree container and statistics.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::config::ScanConfig;
use crate::error::ScanWarning;
use crate::node::{FileNode, NodeId};

/// Summary statistics for a scanned tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    /// Total size of materialized files in bytes.
    pub total_size: u64,
    /// Total number of files.
    pub total_files: u64,
    /// Total number of directories (excluding the root).
    pub total_dirs: u64,
    /// Entries matched by an ignore rule.
    pub ignored_entries: u64,
    /// Maximum depth reached.
    pub max_depth: u32,
}

impl TreeStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update stats with a file entry.
    pub fn record_file(&mut self, size: u64, depth: u32) {
        self.total_files += 1;
        self.total_size += size;
        self.max_depth = self.max_depth.max(depth);
    }

    /// Record a directory.
    pub fn record_dir(&mut self, depth: u32) {
        self.total_dirs += 1;
        self.max_depth = self.max_depth.max(depth);
    }

    /// Record an entry that matched an ignore rule.
    pub fn record_ignored(&mut self) {
        self.ignored_entries += 1;
    }
}

/// Complete scanned file tree.
///
/// Nodes are stored in an arena indexed by [`NodeId`]; the root is always
/// `NodeId(0)`. The tree is immutable once the scan returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileTree {
    nodes: Vec<FileNode>,

    /// Root path that was scanned.
    pub root_path: PathBuf,

    /// When this scan was performed.
    pub scanned_at: SystemTime,

    /// Duration of the scan.
    pub scan_duration: Duration,

    /// Scan configuration used.
    pub config: ScanConfig,

    /// Summary statistics.
    pub stats: TreeStats,

    /// Recovered traversal problems.
    pub warnings: Vec<ScanWarning>,
}

impl FileTree {
    /// Create a new file tree from an arena whose first node is the root.
    pub fn new(
        nodes: Vec<FileNode>,
        root_path: PathBuf,
        config: ScanConfig,
        stats: TreeStats,
        scan_duration: Duration,
        warnings: Vec<ScanWarning>,
    ) -> Self {
        debug_assert!(!nodes.is_empty(), "a tree always has a root node");
        Self {
            nodes,
            root_path,
            scanned_at: SystemTime::now(),
            scan_duration,
            config,
            stats,
            warnings,
        }
    }

    /// Id of the root node.
    pub fn root(&self) -> NodeId {
        NodeId::new(0)
    }

    /// The root node.
    pub fn root_node(&self) -> &FileNode {
        &self.nodes[0]
    }

    /// Look up a node by id.
    pub fn get(&self, id: NodeId) -> Option<&FileNode> {
        self.nodes.get(id.index())
    }

    /// Look up a node by id. Panics if the id belongs to another tree.
    pub fn node(&self, id: NodeId) -> &FileNode {
        &self.nodes[id.index()]
    }

    /// Direct children of a node, in display order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &FileNode> + '_ {
        self.node(id).children.iter().map(|child| self.node(*child))
    }

    /// Parent of a node, `None` for the root.
    pub fn parent(&self, id: NodeId) -> Option<&FileNode> {
        self.node(id).parent.map(|parent| self.node(parent))
    }

    /// Absolute path of a node.
    pub fn path_of(&self, id: NodeId) -> &Path {
        &self.node(id).path
    }

    /// Find a node by its `/`-separated path relative to the root.
    pub fn find(&self, rel_path: &str) -> Option<&FileNode> {
        let mut current = self.root_node();
        for component in rel_path.split('/').filter(|c| !c.is_empty() && *c != ".") {
            current = self
                .children(current.id)
                .find(|child| child.name.as_str() == component)?;
        }
        Some(current)
    }

    /// Pre-order traversal following child ordering.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            tree: self,
            stack: vec![self.root()],
        }
    }

    /// Number of nodes, including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds only its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Recursive size of the materialized files below a node.
    ///
    /// Node sizes are never aggregated during the scan; callers that want a
    /// directory total ask for it here. Pruned subtrees contribute nothing.
    pub fn dir_size(&self, id: NodeId) -> u64 {
        let node = self.node(id);
        if !node.is_dir {
            return node.size;
        }
        node.children.iter().map(|child| self.dir_size(*child)).sum()
    }

    /// Get the total number of files.
    pub fn total_files(&self) -> u64 {
        self.stats.total_files
    }

    /// Get the total number of directories.
    pub fn total_dirs(&self) -> u64 {
        self.stats.total_dirs
    }

    /// Check if there were any warnings during scanning.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Pre-order iterator over a [`FileTree`].
pub struct Walk<'a> {
    tree: &'a FileTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a FileNode;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = self.tree.node(id);
        self.stack.extend(node.children.iter().rev().copied());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> FileTree {
        let mut root = FileNode::new_directory(NodeId::new(0), "proj", "/proj", "");
        let mut src = FileNode::new_directory(NodeId::new(1), "src", "/proj/src", "src");
        let mut readme = FileNode::new_file(
            NodeId::new(2),
            "README.md",
            "/proj/README.md",
            "README.md",
            10,
        );
        let mut main = FileNode::new_file(
            NodeId::new(3),
            "main.rs",
            "/proj/src/main.rs",
            "src/main.rs",
            32,
        );
        root.children = vec![NodeId::new(1), NodeId::new(2)];
        src.parent = Some(NodeId::new(0));
        src.children = vec![NodeId::new(3)];
        readme.parent = Some(NodeId::new(0));
        main.parent = Some(NodeId::new(1));

        FileTree::new(
            vec![root, src, readme, main],
            PathBuf::from("/proj"),
            ScanConfig::new("/proj"),
            TreeStats::default(),
            Duration::ZERO,
            Vec::new(),
        )
    }

    #[test]
    fn test_tree_stats_record() {
        let mut stats = TreeStats::new();
        stats.record_file(1024, 2);
        stats.record_dir(1);
        stats.record_ignored();

        assert_eq!(stats.total_files, 1);
        assert_eq!(stats.total_size, 1024);
        assert_eq!(stats.total_dirs, 1);
        assert_eq!(stats.ignored_entries, 1);
        assert_eq!(stats.max_depth, 2);
    }

    #[test]
    fn test_find_and_parent() {
        let tree = sample_tree();
        let main = tree.find("src/main.rs").unwrap();
        assert_eq!(main.size, 32);
        assert_eq!(tree.parent(main.id).unwrap().name.as_str(), "src");
        assert!(tree.find("src/missing.rs").is_none());
        assert_eq!(tree.find("").unwrap().id, tree.root());
    }

    #[test]
    fn test_walk_is_preorder() {
        let tree = sample_tree();
        let order: Vec<&str> = tree.walk().map(|n| n.rel_path.as_str()).collect();
        assert_eq!(order, vec!["", "src", "src/main.rs", "README.md"]);
    }

    #[test]
    fn test_dir_size_on_request() {
        let tree = sample_tree();
        assert_eq!(tree.root_node().size, 0);
        assert_eq!(tree.dir_size(tree.root()), 42);
    }
}
