//! Layered gitignore-style classification.
//!
//! Three independently compiled pattern sets decide whether a path is
//! skipped: the builtin defaults, the scan root's `.gitignore`, and the
//! user's custom rules. The git result is reported separately so callers can
//! tell "ignored by VCS convention" apart from "ignored by local policy".

use std::fs;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use ignore::gitignore::{Gitignore, GitignoreBuilder};

use ctxforge_core::{ScanConfig, ScanError};

use crate::builtin::BUILTIN_PATTERNS;

/// A compiled list of gitignore-syntax lines.
#[derive(Debug, Clone)]
pub struct PatternSet {
    matcher: Gitignore,
}

impl PatternSet {
    /// A set that matches nothing.
    pub fn empty() -> Self {
        Self {
            matcher: Gitignore::empty(),
        }
    }

    /// Compile gitignore lines. `origin` names the source in error messages.
    ///
    /// Blank lines and `#` comments are skipped; `!pattern` re-includes paths
    /// matched by earlier lines of the same set.
    pub fn compile<I, S>(origin: &str, lines: I) -> Result<Self, ScanError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GitignoreBuilder::new(".");
        for line in lines {
            builder
                .add_line(None, line.as_ref())
                .map_err(|err| invalid_pattern(origin, &err))?;
        }
        let matcher = builder.build().map_err(|err| invalid_pattern(origin, &err))?;
        Ok(Self { matcher })
    }

    /// Whether `rel_path` (relative to the scan root, `/`-separated) is ignored.
    ///
    /// `is_dir` plays the role of a trailing separator, so directory-only
    /// patterns such as `build/` match directories and nothing else. A path
    /// below an ignored directory is ignored too.
    pub fn matches(&self, rel_path: &str, is_dir: bool) -> bool {
        if self.matcher.is_empty() {
            return false;
        }
        let rel_path = rel_path.trim_start_matches("./").trim_matches('/');
        if rel_path.is_empty() {
            return false;
        }
        self.matcher
            .matched_path_or_any_parents(Path::new(rel_path), is_dir)
            .is_ignore()
    }

    /// Number of compiled patterns, including negations.
    pub fn len(&self) -> usize {
        (self.matcher.num_ignores() + self.matcher.num_whitelists()) as usize
    }

    /// Whether the set holds no patterns.
    pub fn is_empty(&self) -> bool {
        self.matcher.is_empty()
    }
}

impl Default for PatternSet {
    fn default() -> Self {
        Self::empty()
    }
}

fn invalid_pattern(origin: &str, err: &ignore::Error) -> ScanError {
    ScanError::InvalidPattern {
        origin: origin.to_string(),
        message: err.to_string(),
    }
}

/// Result of classifying one path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classification {
    /// Matched the repository `.gitignore`.
    pub git_ignored: bool,
    /// Matched the builtin defaults or the custom rules.
    pub custom_ignored: bool,
}

impl Classification {
    /// Whether any rule matched.
    pub fn is_ignored(&self) -> bool {
        self.git_ignored || self.custom_ignored
    }
}

/// Immutable snapshot of the three compiled pattern sets.
#[derive(Debug, Clone, Default)]
pub struct IgnoreEngine {
    builtin: PatternSet,
    git: PatternSet,
    custom: PatternSet,
}

impl IgnoreEngine {
    /// An engine that ignores nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build an engine from explicit gitignore and custom lines, with the
    /// builtin defaults enabled.
    pub fn new<G, C, S>(git_lines: G, custom_lines: C) -> Result<Self, ScanError>
    where
        G: IntoIterator<Item = S>,
        C: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            builtin: Self::builtin_set()?,
            git: PatternSet::compile(".gitignore", git_lines)?,
            custom: PatternSet::compile("custom rules", custom_lines)?,
        })
    }

    /// Build an engine for a scan configuration.
    ///
    /// Reads `<root>/.gitignore` when enabled. A missing file yields an empty
    /// set; an unreadable or malformed one is a configuration error.
    pub fn from_config(config: &ScanConfig) -> Result<Self, ScanError> {
        let builtin = if config.use_builtin_ignores {
            Self::builtin_set()?
        } else {
            PatternSet::empty()
        };

        let git = if config.use_gitignore {
            load_gitignore(&config.root)?
        } else {
            PatternSet::empty()
        };

        let custom = PatternSet::compile("custom rules", &config.custom_patterns)?;

        tracing::debug!(
            builtin = builtin.len(),
            git = git.len(),
            custom = custom.len(),
            "compiled ignore rules"
        );

        Ok(Self {
            builtin,
            git,
            custom,
        })
    }

    /// Replace the custom rules, keeping the other sets.
    pub fn with_custom<I, S>(mut self, lines: I) -> Result<Self, ScanError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.custom = PatternSet::compile("custom rules", lines)?;
        Ok(self)
    }

    /// Drop the builtin defaults.
    pub fn without_builtin(mut self) -> Self {
        self.builtin = PatternSet::empty();
        self
    }

    fn builtin_set() -> Result<PatternSet, ScanError> {
        PatternSet::compile("builtin defaults", BUILTIN_PATTERNS)
    }

    /// Classify a path relative to the scan root.
    pub fn classify(&self, rel_path: &str, is_dir: bool) -> Classification {
        Classification {
            git_ignored: self.git.matches(rel_path, is_dir),
            custom_ignored: self.builtin.matches(rel_path, is_dir)
                || self.custom.matches(rel_path, is_dir),
        }
    }
}

fn load_gitignore(root: &Path) -> Result<PatternSet, ScanError> {
    let path = root.join(".gitignore");
    match fs::read_to_string(&path) {
        Ok(contents) => PatternSet::compile(".gitignore", contents.lines()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(PatternSet::empty()),
        Err(err) => Err(ScanError::io(path, err)),
    }
}

/// Swappable handle to the current [`IgnoreEngine`].
///
/// Scans take a snapshot when they start and keep using it; `replace`
/// installs a freshly compiled engine for the scans that follow. Engines
/// are never mutated in place.
#[derive(Debug, Clone, Default)]
pub struct SharedIgnoreEngine {
    current: Arc<RwLock<Arc<IgnoreEngine>>>,
}

impl SharedIgnoreEngine {
    /// Wrap an engine.
    pub fn new(engine: IgnoreEngine) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(engine))),
        }
    }

    /// The engine currently installed.
    pub fn snapshot(&self) -> Arc<IgnoreEngine> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Install a new engine, returning the previous one.
    pub fn replace(&self, engine: IgnoreEngine) -> Arc<IgnoreEngine> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(engine))
    }
}

impl From<IgnoreEngine> for SharedIgnoreEngine {
    fn from(engine: IgnoreEngine) -> Self {
        Self::new(engine)
    }
}
