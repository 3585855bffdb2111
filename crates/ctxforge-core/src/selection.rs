//! User include/exclude overrides layered on top of ignore flags.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::node::NodeId;
use crate::tree::FileTree;

/// Relative paths the user explicitly excluded. Everything else is included.
///
/// The state only ever removes paths: an ignored node stays out of the
/// generated context no matter what the selection says.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    excluded: BTreeSet<String>,
}

impl SelectionState {
    /// Create an empty selection (everything included).
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `rel_path` is included by the user's overrides.
    pub fn is_included(&self, rel_path: &str) -> bool {
        !self.excluded.contains(normalize(rel_path))
    }

    /// Flip the inclusion of a path.
    pub fn toggle(&mut self, rel_path: &str) {
        let key = normalize(rel_path);
        if !self.excluded.remove(key) {
            self.excluded.insert(key.to_string());
        }
    }

    /// Mark a path excluded.
    pub fn exclude(&mut self, rel_path: &str) {
        self.excluded.insert(normalize(rel_path).to_string());
    }

    /// Mark several paths excluded.
    pub fn exclude_all<I, S>(&mut self, rel_paths: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for path in rel_paths {
            self.exclude(path.as_ref());
        }
    }

    /// Remove any exclusion for a path.
    pub fn include(&mut self, rel_path: &str) {
        self.excluded.remove(normalize(rel_path));
    }

    /// Clear all overrides.
    pub fn reset(&mut self) {
        self.excluded.clear();
    }

    /// Explicitly excluded paths, sorted.
    pub fn excluded(&self) -> impl Iterator<Item = &str> {
        self.excluded.iter().map(String::as_str)
    }

    /// Number of explicit exclusions.
    pub fn len(&self) -> usize {
        self.excluded.len()
    }

    /// Whether there are no overrides.
    pub fn is_empty(&self) -> bool {
        self.excluded.is_empty()
    }
}

fn normalize(rel_path: &str) -> &str {
    rel_path.trim_start_matches("./").trim_matches('/')
}

/// Flatten a tree into the relative paths of files that go into the context.
///
/// Files are yielded in tree order (directories first, then case-insensitive
/// name). Directories, ignored nodes and user-excluded nodes are skipped; an
/// excluded directory takes its whole subtree with it.
pub fn included_files(tree: &FileTree, selection: &SelectionState) -> Vec<String> {
    let mut files = Vec::new();
    collect(tree, tree.root(), selection, &mut files);
    files
}

fn collect(tree: &FileTree, id: NodeId, selection: &SelectionState, out: &mut Vec<String>) {
    for child in tree.children(id) {
        if child.is_ignored() || !selection.is_included(&child.rel_path) {
            continue;
        }
        if child.is_dir {
            collect(tree, child.id, selection, out);
        } else {
            out.push(child.rel_path.clone());
        }
    }
}
