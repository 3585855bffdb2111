//! Scan and generation configuration types.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Configuration for scanning operations.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Root path to scan.
    pub root: PathBuf,

    /// Follow symbolic links into directories.
    #[builder(default = "false")]
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Maximum depth to traverse (None = unlimited).
    #[builder(default)]
    #[serde(default)]
    pub max_depth: Option<u32>,

    /// Include hidden files (starting with .).
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub include_hidden: bool,

    /// Apply the compiled-in default ignore list.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub use_builtin_ignores: bool,

    /// Apply the root's `.gitignore`.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub use_gitignore: bool,

    /// Extra patterns to ignore (gitignore syntax).
    #[builder(default)]
    #[serde(default)]
    pub custom_patterns: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref root) = self.root {
            if root.as_os_str().is_empty() {
                return Err("Root path cannot be empty".to_string());
            }
        } else {
            return Err("Root path is required".to_string());
        }
        Ok(())
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a simple config for scanning a path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            follow_symlinks: false,
            max_depth: None,
            include_hidden: true,
            use_builtin_ignores: true,
            use_gitignore: true,
            custom_patterns: Vec::new(),
        }
    }

    /// Check if hidden files should be skipped.
    pub fn should_skip_hidden(&self, name: &str) -> bool {
        !self.include_hidden && name.starts_with('.')
    }

    /// Whether a directory at `depth` may be descended into.
    pub fn may_descend(&self, depth: u32) -> bool {
        self.max_depth.is_none_or(|max| depth < max)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

/// Options for the ASCII tree rendered ahead of the file blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Append a human readable size to files.
    #[serde(default)]
    pub show_size: bool,

    /// Print ignored entries with their reason marker.
    #[serde(default = "default_true")]
    pub show_ignored: bool,

    /// Deepest level printed (None = unlimited).
    #[serde(default)]
    pub max_depth: Option<usize>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_size: false,
            show_ignored: true,
            max_depth: None,
        }
    }
}

/// Budgets and options for context generation. Zero means unlimited.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into))]
pub struct GenerateConfig {
    /// Skip individual files larger than this many bytes.
    #[builder(default = "0")]
    #[serde(default)]
    pub max_file_size: u64,

    /// Fail once more than this many files would be included.
    #[builder(default = "0")]
    #[serde(default)]
    pub max_files: usize,

    /// Fail once the assembled file blocks would exceed this many bytes.
    #[builder(default = "0")]
    #[serde(default)]
    pub max_total_size: u64,

    /// Skip files whose first kilobyte looks binary.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub skip_binary: bool,

    /// Worker pool size (0 = available parallelism).
    #[builder(default = "0")]
    #[serde(default)]
    pub workers: usize,

    /// Prefix the document with the rendered tree.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub include_tree: bool,

    /// How the prefixed tree is rendered.
    #[builder(default)]
    #[serde(default)]
    pub tree: RenderOptions,
}

impl GenerateConfig {
    /// Create a new config builder.
    pub fn builder() -> GenerateConfigBuilder {
        GenerateConfigBuilder::default()
    }

    /// Effective worker count.
    pub fn worker_count(&self) -> usize {
        match self.workers {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            n => n,
        }
    }
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            max_file_size: 0,
            max_files: 0,
            max_total_size: 0,
            skip_binary: true,
            workers: 0,
            include_tree: true,
            tree: RenderOptions::default(),
        }
    }
}
