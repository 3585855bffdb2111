//! Context document generation for ctxforge.
//!
//! # Overview
//!
//! [`ContextGenerator`] reads the selected files of a scanned [`FileTree`]
//! on a bounded pool of blocking workers and assembles them into one
//! document of tagged blocks:
//!
//! ```text
//! <file path="src/main.rs">
//! fn main() {}
//! </file>
//! ```
//!
//! - **Deterministic order**: results are merged in selection order
//! - **Budgets**: per-file size (skip), file count and total size (fail)
//! - **Binary skipping**: NUL bytes or invalid UTF-8 in the first kilobyte
//! - **All-or-nothing**: any failure discards the whole document
//!
//! The rendered tree from [`render_tree`] is prepended when
//! `include_tree` is set.
//!
//! # Example
//!
//! ```rust,no_run
//! use ctxforge_core::{GenerateConfig, SelectionState, included_files};
//! use ctxforge_generate::ContextGenerator;
//! use ctxforge_scan::{CancellationToken, DirectoryScanner, ScanConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ScanConfig::new(".");
//! let cancel = CancellationToken::new();
//! let tree = DirectoryScanner::for_config(&config)?.scan(&config, &cancel)?;
//! let files = included_files(&tree, &SelectionState::new());
//!
//! let generator = ContextGenerator::new(GenerateConfig::default());
//! let document = generator.generate(&tree, &files, &cancel).await?;
//! println!("{document}");
//! # Ok(())
//! # }
//! ```

mod binary;
mod generator;
mod render;

pub use binary::{PEEK_SIZE, looks_binary};
pub use generator::{ContextGenerator, GeneratedContext, format_block};
pub use render::render_tree;

pub use ctxforge_core::{FileTree, GenerateConfig, GenerateError, RenderOptions};
