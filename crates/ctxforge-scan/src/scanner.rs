//! Recursive directory scanner with ignore pruning.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use compact_str::CompactString;
use tokio_util::sync::CancellationToken;

use ctxforge_core::{
    FileNode, FileTree, NodeId, Phase, ProgressEvent, ProgressSender, ScanConfig, ScanError,
    ScanWarning, TreeStats, WarningKind, display_order,
};

use crate::rules::{Classification, IgnoreEngine, SharedIgnoreEngine};

/// Depth-first scanner that builds a [`FileTree`].
///
/// Ignored directories are recorded as childless nodes and never read, so
/// trees like `node_modules/` cost one entry no matter their size.
#[derive(Debug, Clone, Default)]
pub struct DirectoryScanner {
    engine: SharedIgnoreEngine,
    progress: ProgressSender,
}

impl DirectoryScanner {
    /// Create a scanner classifying entries with `engine`.
    pub fn new(engine: impl Into<SharedIgnoreEngine>) -> Self {
        Self {
            engine: engine.into(),
            progress: ProgressSender::disabled(),
        }
    }

    /// Create a scanner whose rules come from a scan configuration.
    pub fn for_config(config: &ScanConfig) -> Result<Self, ScanError> {
        Ok(Self::new(IgnoreEngine::from_config(config)?))
    }

    /// Report progress through `progress`.
    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = progress;
        self
    }

    /// Handle used to swap in new rules between scans.
    pub fn engine(&self) -> &SharedIgnoreEngine {
        &self.engine
    }

    /// Scan a root with default traversal options.
    pub fn scan_path(
        &self,
        root: impl Into<PathBuf>,
        cancel: &CancellationToken,
    ) -> Result<FileTree, ScanError> {
        self.scan(&ScanConfig::new(root), cancel)
    }

    /// Perform a scan.
    ///
    /// Fails if the root is missing, not a directory, or unreadable, and
    /// with [`ScanError::Cancelled`] as soon as `cancel` fires. Subdirectories
    /// that cannot be read are kept without children and reported in
    /// [`FileTree::warnings`].
    pub fn scan(
        &self,
        config: &ScanConfig,
        cancel: &CancellationToken,
    ) -> Result<FileTree, ScanError> {
        let start = Instant::now();
        let root_path = config
            .root
            .canonicalize()
            .map_err(|e| ScanError::io(&config.root, e))?;

        if !root_path.is_dir() {
            return Err(ScanError::NotADirectory { path: root_path });
        }

        let engine = self.engine.snapshot();
        let root_name = root_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| root_path.to_string_lossy().to_string());

        let mut walk = Walk {
            config,
            engine: &engine,
            cancel,
            progress: &self.progress,
            nodes: vec![FileNode::new_directory(NodeId::new(0), root_name, &root_path, "")],
            stats: TreeStats::new(),
            warnings: Vec::new(),
            visited: HashSet::new(),
            seen: 0,
        };
        if config.follow_symlinks {
            walk.visited.insert(root_path.clone());
        }

        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }
        let entries = fs::read_dir(&root_path).map_err(|e| ScanError::io(&root_path, e))?;
        walk.visit_dir(NodeId::new(0), entries, "", 0)?;

        let Walk {
            nodes,
            stats,
            warnings,
            seen,
            ..
        } = walk;

        self.progress.emit(
            ProgressEvent::counted(Phase::Complete, seen, seen, None).with_label("scan complete"),
        );

        let scan_duration = start.elapsed();
        tracing::info!(
            root = %root_path.display(),
            files = stats.total_files,
            dirs = stats.total_dirs,
            ignored = stats.ignored_entries,
            warnings = warnings.len(),
            elapsed_ms = scan_duration.as_millis() as u64,
            "scan complete"
        );

        Ok(FileTree::new(
            nodes,
            root_path,
            config.clone(),
            stats,
            scan_duration,
            warnings,
        ))
    }
}

/// Mutable state of one scan.
struct Walk<'a> {
    config: &'a ScanConfig,
    engine: &'a IgnoreEngine,
    cancel: &'a CancellationToken,
    progress: &'a ProgressSender,
    nodes: Vec<FileNode>,
    stats: TreeStats,
    warnings: Vec<ScanWarning>,
    visited: HashSet<PathBuf>,
    seen: u64,
}

/// An entry read from a directory, before it gets a node id.
struct Entry {
    name: CompactString,
    path: PathBuf,
    rel_path: String,
    is_dir: bool,
    is_symlink: bool,
    size: u64,
    class: Classification,
}

impl Walk<'_> {
    /// Attach the entries of one directory to `id`, then recurse into the
    /// directories that are not ignored.
    fn visit_dir(
        &mut self,
        id: NodeId,
        read_dir: fs::ReadDir,
        rel_path: &str,
        depth: u32,
    ) -> Result<(), ScanError> {
        let mut entries = Vec::new();
        for entry in read_dir {
            if self.cancel.is_cancelled() {
                return Err(ScanError::Cancelled);
            }
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    self.warnings
                        .push(ScanWarning::read_error(self.nodes[id.index()].path.clone(), &err));
                    continue;
                }
            };
            if let Some(entry) = self.read_entry(&entry, rel_path) {
                entries.push(entry);
            }
        }

        entries.sort_by(|a, b| display_order(a.is_dir, &a.name, b.is_dir, &b.name));
        tracing::debug!(dir = rel_path, entries = entries.len(), "read directory");

        let child_depth = depth + 1;
        let mut descend = Vec::new();
        for entry in entries {
            let child_id = NodeId::new(self.nodes.len());
            let mut node = if entry.is_dir {
                FileNode::new_directory(child_id, entry.name, &entry.path, entry.rel_path.as_str())
            } else {
                FileNode::new_file(
                    child_id,
                    entry.name,
                    &entry.path,
                    entry.rel_path.as_str(),
                    entry.size,
                )
            };
            node.is_symlink = entry.is_symlink;
            node.git_ignored = entry.class.git_ignored;
            node.custom_ignored = entry.class.custom_ignored;
            node.parent = Some(id);

            if entry.class.is_ignored() {
                self.stats.record_ignored();
            } else if entry.is_dir {
                self.stats.record_dir(child_depth);
                let followable = !entry.is_symlink || self.config.follow_symlinks;
                if followable && self.config.may_descend(child_depth) {
                    descend.push((child_id, entry.path, entry.rel_path));
                }
            } else {
                self.stats.record_file(entry.size, child_depth);
            }

            self.nodes[id.index()].children.push(child_id);
            self.nodes.push(node);
        }

        for (child_id, path, child_rel) in descend {
            if self.cancel.is_cancelled() {
                return Err(ScanError::Cancelled);
            }
            if self.config.follow_symlinks && !self.first_visit(&path) {
                continue;
            }
            match fs::read_dir(&path) {
                Ok(read_dir) => self.visit_dir(child_id, read_dir, &child_rel, child_depth)?,
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %err,
                        "skipping unreadable directory"
                    );
                    self.warnings.push(ScanWarning::read_error(path, &err));
                }
            }
        }

        Ok(())
    }

    /// Stat and classify one directory entry. Returns `None` for skipped
    /// hidden entries and entries whose type cannot be determined.
    fn read_entry(&mut self, entry: &fs::DirEntry, parent_rel: &str) -> Option<Entry> {
        let name = entry.file_name().to_string_lossy().to_string();
        if self.config.should_skip_hidden(&name) {
            return None;
        }

        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(err) => {
                self.warnings
                    .push(ScanWarning::new(&path, err.to_string(), WarningKind::MetadataError));
                return None;
            }
        };

        let (is_dir, size) = if file_type.is_symlink() {
            match fs::metadata(&path) {
                Ok(target) if target.is_dir() => (true, 0),
                Ok(target) => (false, target.len()),
                Err(_) => {
                    self.warnings.push(ScanWarning::broken_symlink(&path));
                    (false, 0)
                }
            }
        } else if file_type.is_dir() {
            (true, 0)
        } else {
            match entry.metadata() {
                Ok(metadata) => (false, metadata.len()),
                Err(err) => {
                    self.warnings
                        .push(ScanWarning::new(&path, err.to_string(), WarningKind::MetadataError));
                    (false, 0)
                }
            }
        };

        let rel_path = if parent_rel.is_empty() {
            name.clone()
        } else {
            format!("{parent_rel}/{name}")
        };
        let class = self.engine.classify(&rel_path, is_dir);

        self.seen += 1;
        self.progress
            .emit(ProgressEvent::stage(Phase::Scanning, self.seen, rel_path.as_str()));

        Some(Entry {
            name: name.into(),
            path,
            rel_path,
            is_dir,
            is_symlink: file_type.is_symlink(),
            size,
            class,
        })
    }

    /// Loop guard for followed symlinks: true the first time a canonical
    /// directory is reached.
    fn first_visit(&mut self, path: &Path) -> bool {
        match path.canonicalize() {
            Ok(canonical) => self.visited.insert(canonical),
            Err(_) => false,
        }
    }
}
