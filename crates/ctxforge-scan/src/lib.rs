//! Ignore rules and directory scanning for ctxforge.
//!
//! # Overview
//!
//! `ctxforge-scan` turns a directory into a [`FileTree`]:
//!
//! - **Layered ignore rules**: builtin defaults, the root `.gitignore`, and
//!   custom patterns, each compiled into its own [`PatternSet`]
//! - **Pruning**: ignored directories stay visible as childless nodes but are
//!   never read
//! - **Deterministic order**: directories first, then case-insensitive name
//! - **Cooperative cancellation** via [`CancellationToken`]
//! - **Best-effort progress** through a [`ProgressSender`]
//!
//! # Example
//!
//! ```rust,no_run
//! use ctxforge_scan::{DirectoryScanner, ScanConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = ScanConfig::new("/path/to/project");
//! let scanner = DirectoryScanner::for_config(&config).unwrap();
//! let tree = scanner.scan(&config, &CancellationToken::new()).unwrap();
//!
//! println!("{} files, {} ignored", tree.total_files(), tree.stats.ignored_entries);
//! ```

mod builtin;
mod rules;
mod scanner;

pub use builtin::BUILTIN_PATTERNS;
pub use rules::{Classification, IgnoreEngine, PatternSet, SharedIgnoreEngine};
pub use scanner::DirectoryScanner;

pub use tokio_util::sync::CancellationToken;

// Re-export core types for convenience
pub use ctxforge_core::{
    FileNode, FileTree, NodeId, Phase, ProgressEvent, ProgressSender, ScanConfig, ScanError,
    ScanWarning, TreeStats, WarningKind,
};
