//! Compiled-in default ignore patterns.

/// Patterns applied to every scan unless builtin ignores are disabled.
///
/// They cover VCS metadata, dependency and cache directories, build output,
/// media and other binary formats, archives and databases.
pub const BUILTIN_PATTERNS: &[&str] = &[
    // Version control
    ".git/",
    ".svn/",
    ".hg/",
    ".bzr/",
    // Dependencies and caches
    "node_modules/",
    "bower_components/",
    "vendor/bundle/",
    ".venv/",
    "venv/",
    "__pycache__/",
    ".pytest_cache/",
    ".mypy_cache/",
    ".tox/",
    ".gradle/",
    ".idea/",
    ".vscode/",
    ".next/",
    ".nuxt/",
    ".cache/",
    ".DS_Store",
    "Thumbs.db",
    // Build output
    "target/",
    "dist/",
    "build/",
    "out/",
    "coverage/",
    // Compiled objects and binaries
    "*.o",
    "*.a",
    "*.so",
    "*.dylib",
    "*.dll",
    "*.exe",
    "*.class",
    "*.jar",
    "*.pyc",
    "*.pyo",
    "*.wasm",
    "*.bin",
    // Images
    "*.png",
    "*.jpg",
    "*.jpeg",
    "*.gif",
    "*.bmp",
    "*.ico",
    "*.webp",
    "*.tiff",
    "*.psd",
    // Audio and video
    "*.mp3",
    "*.wav",
    "*.flac",
    "*.ogg",
    "*.mp4",
    "*.mov",
    "*.avi",
    "*.mkv",
    "*.webm",
    // Fonts and documents
    "*.woff",
    "*.woff2",
    "*.ttf",
    "*.otf",
    "*.eot",
    "*.pdf",
    // Archives
    "*.zip",
    "*.tar",
    "*.gz",
    "*.tgz",
    "*.bz2",
    "*.xz",
    "*.7z",
    "*.rar",
    // Databases
    "*.db",
    "*.sqlite",
    "*.sqlite3",
    // Generated noise
    "*.lock",
    "*.min.js",
    "*.min.css",
    "*.map",
];
