//! Core types for ctxforge.
//!
//! This crate provides the data structures shared by the scanning,
//! generation and diff-splitting crates: the arena-backed file tree,
//! scan and generation configuration, error types, best-effort progress
//! reporting, and the user's include/exclude selection.

mod config;
mod error;
mod node;
mod progress;
mod selection;
mod tree;

pub use config::{
    GenerateConfig, GenerateConfigBuilder, RenderOptions, ScanConfig, ScanConfigBuilder,
};
pub use error::{GenerateError, ScanError, ScanWarning, WarningKind};
pub use node::{FileNode, IgnoreReason, NodeId, display_order};
pub use progress::{PROGRESS_CHANNEL_SIZE, Phase, ProgressEvent, ProgressSender};
pub use selection::{SelectionState, included_files};
pub use tree::{FileTree, TreeStats, Walk};
