//! Unified diff splitting for ctxforge.
//!
//! Long diffs are cut into chunks of roughly a target number of lines so
//! each can be submitted on its own. Cuts only happen before a file header
//! or a hunk header, never inside a hunk body, and the chunks always
//! reassemble into the exact input. Splitting never fails: text that does
//! not look like a diff just yields coarser chunks.
//!
//! ```rust
//! use ctxforge_diff::split_text;
//!
//! let diff = "--- a/x\n+++ b/x\n@@ -1 +1 @@\n-a\n+b\n";
//! let chunks = split_text(diff, 500);
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].file_count, 1);
//! ```

mod chunker;

pub use chunker::{Chunk, DEFAULT_TARGET_LINES, format_chunk_header, split, split_text};
