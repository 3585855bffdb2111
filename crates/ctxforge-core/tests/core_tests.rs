use ctxforge_core::{
    FileNode, FileTree, NodeId, ScanConfig, SelectionState, TreeStats, included_files,
};
use std::path::PathBuf;
use std::time::Duration;

/// Builds:
///
/// ```text
/// proj/
/// ├── node_modules/   (custom ignored, pruned)
/// ├── src/
/// │   ├── lib.rs
/// │   └── main.rs
/// ├── a.go
/// ├── debug.log       (git ignored)
/// └── Z.md
/// ```
fn build_tree() -> FileTree {
    let entries: Vec<(&str, bool, Option<usize>)> = vec![
        ("", true, None),
        ("node_modules", true, Some(0)),
        ("src", true, Some(0)),
        ("a.go", false, Some(0)),
        ("debug.log", false, Some(0)),
        ("Z.md", false, Some(0)),
        ("src/lib.rs", false, Some(2)),
        ("src/main.rs", false, Some(2)),
    ];

    let mut nodes: Vec<FileNode> = entries
        .iter()
        .enumerate()
        .map(|(i, (rel, is_dir, _))| {
            let name = rel.rsplit('/').next().unwrap_or(rel);
            let name = if rel.is_empty() { "proj" } else { name };
            let path = PathBuf::from("/proj").join(rel);
            if *is_dir {
                FileNode::new_directory(NodeId::new(i), name, path, *rel)
            } else {
                FileNode::new_file(NodeId::new(i), name, path, *rel, 10)
            }
        })
        .collect();

    for (i, (_, _, parent)) in entries.iter().enumerate() {
        if let Some(parent) = parent {
            nodes[i].parent = Some(NodeId::new(*parent));
            nodes[*parent].children.push(NodeId::new(i));
        }
    }
    nodes[1].custom_ignored = true;
    nodes[4].git_ignored = true;

    FileTree::new(
        nodes,
        PathBuf::from("/proj"),
        ScanConfig::new("/proj"),
        TreeStats::default(),
        Duration::ZERO,
        Vec::new(),
    )
}

#[test]
fn test_included_files_follow_tree_order() {
    let tree = build_tree();
    let files = included_files(&tree, &SelectionState::new());
    assert_eq!(files, vec!["src/lib.rs", "src/main.rs", "a.go", "Z.md"]);
}

#[test]
fn test_selection_cannot_promote_ignored_nodes() {
    let tree = build_tree();
    let mut selection = SelectionState::new();
    selection.include("debug.log");
    selection.toggle("node_modules");
    selection.toggle("node_modules");

    let files = included_files(&tree, &selection);
    assert!(!files.iter().any(|f| f == "debug.log"));
    assert!(!files.iter().any(|f| f.starts_with("node_modules")));
}

#[test]
fn test_excluded_directory_drops_subtree() {
    let tree = build_tree();
    let mut selection = SelectionState::new();
    selection.exclude("src");
    selection.exclude("Z.md");

    assert_eq!(included_files(&tree, &selection), vec!["a.go"]);

    selection.reset();
    assert_eq!(included_files(&tree, &selection).len(), 4);
}

#[test]
fn test_exclude_then_include_restores_membership() {
    let tree = build_tree();
    let before = included_files(&tree, &SelectionState::new());

    let mut selection = SelectionState::new();
    selection.exclude("src/main.rs");
    assert_eq!(included_files(&tree, &selection).len(), before.len() - 1);
    selection.include("src/main.rs");
    assert_eq!(included_files(&tree, &selection), before);
}

#[test]
fn test_tree_serializes() {
    let tree = build_tree();
    let json = serde_json::to_string(&tree).unwrap();
    assert!(json.contains("\"rel_path\":\"src/main.rs\""));
}
