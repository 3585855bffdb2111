//! ASCII rendering of a scanned tree.

use humansize::{BINARY, format_size};

use ctxforge_core::{FileNode, FileTree, NodeId, RenderOptions};

/// Render `tree` as an indented ASCII listing.
///
/// ```text
/// project/
/// ├── src/
/// │   └── main.rs
/// ├── node_modules/ [ignored]
/// └── debug.log [gitignored]
/// ```
///
/// Children keep the tree's order (directories first). Entries deeper than
/// `max_depth` are folded into a single `…` line under their parent, so a
/// depth of zero prints only the root.
pub fn render_tree(tree: &FileTree, options: &RenderOptions) -> String {
    let mut out = String::new();
    let root = tree.root_node();
    out.push_str(&root.name);
    out.push_str("/\n");
    render_children(tree, tree.root(), options, "", 1, &mut out);
    out
}

fn visible_children<'a>(
    tree: &'a FileTree,
    id: NodeId,
    options: &RenderOptions,
) -> Vec<&'a FileNode> {
    tree.children(id)
        .filter(|child| options.show_ignored || !child.is_ignored())
        .collect()
}

fn render_children(
    tree: &FileTree,
    id: NodeId,
    options: &RenderOptions,
    prefix: &str,
    depth: usize,
    out: &mut String,
) {
    let children = visible_children(tree, id, options);
    if options.max_depth.is_some_and(|max| depth > max) {
        if !children.is_empty() {
            out.push_str(prefix);
            out.push_str("└── …\n");
        }
        return;
    }
    let count = children.len();

    for (i, child) in children.into_iter().enumerate() {
        let is_last = i + 1 == count;
        let connector = if is_last { "└── " } else { "├── " };

        out.push_str(prefix);
        out.push_str(connector);
        out.push_str(&label(tree, child, options));
        out.push('\n');

        if !child.is_dir {
            continue;
        }

        let child_prefix = if is_last {
            format!("{prefix}    ")
        } else {
            format!("{prefix}│   ")
        };

        render_children(tree, child.id, options, &child_prefix, depth + 1, out);
    }
}

fn label(tree: &FileTree, node: &FileNode, options: &RenderOptions) -> String {
    let mut label = node.name.to_string();
    if node.is_dir {
        label.push('/');
    }
    if let Some(reason) = node.ignore_reason() {
        label.push_str(&format!(" [{reason}]"));
    } else if options.show_size {
        let size = if node.is_dir {
            tree.dir_size(node.id)
        } else {
            node.size
        };
        label.push_str(&format!(" ({})", format_size(size, BINARY)));
    }
    label
}
