//! Diff splitting at file and hunk boundaries.

use serde::{Deserialize, Serialize};

/// Chunk size used when the caller asks for zero lines.
pub const DEFAULT_TARGET_LINES: usize = 500;

/// A contiguous run of input lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Lines exactly as given.
    pub lines: Vec<String>,
    /// File sections that start in this chunk.
    pub file_count: usize,
    /// 1-indexed line number of the first line in the input.
    pub start_line: usize,
}

impl Chunk {
    fn starting_at(start_line: usize) -> Self {
        Self {
            lines: Vec::new(),
            file_count: 0,
            start_line,
        }
    }

    /// Number of lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// 1-indexed line number of the last line (the start line when empty).
    pub fn end_line(&self) -> usize {
        self.start_line + self.lines.len().saturating_sub(1)
    }

    /// The chunk as text. Lines that lack a terminator are joined with `\n`;
    /// the last line is emitted as is.
    pub fn text(&self) -> String {
        let mut text = String::new();
        let last = self.lines.len().saturating_sub(1);
        for (i, line) in self.lines.iter().enumerate() {
            text.push_str(line);
            if i < last && !line.ends_with('\n') {
                text.push('\n');
            }
        }
        text
    }
}

fn is_git_header(line: &str) -> bool {
    line.starts_with("diff --git ")
}

fn is_hunk_header(line: &str) -> bool {
    line.starts_with("@@")
}

/// `--- a` followed by `+++ b`. The lookahead keeps a removed line that
/// happens to start with `-- ` from being taken for a header.
fn is_old_file_header(lines: &[impl AsRef<str>], i: usize) -> bool {
    lines[i].as_ref().starts_with("--- ")
        && lines
            .get(i + 1)
            .is_some_and(|next| next.as_ref().starts_with("+++ "))
}

/// Where the scan currently is within the diff.
#[derive(Debug, Clone, Copy, Default)]
struct Cursor {
    /// Inside a file section (after its first header).
    in_file: bool,
    /// Saw `diff --git` and not yet its `---` header or first hunk.
    pending_git_header: bool,
}

impl Cursor {
    /// Advance over line `i`. Returns true if it starts a new file section.
    fn advance(&mut self, lines: &[impl AsRef<str>], i: usize) -> bool {
        let line = lines[i].as_ref();
        if is_git_header(line) {
            self.in_file = true;
            self.pending_git_header = true;
            true
        } else if is_old_file_header(lines, i) {
            let new_file = !self.pending_git_header;
            self.in_file = true;
            self.pending_git_header = false;
            new_file
        } else {
            if is_hunk_header(line) {
                self.pending_git_header = false;
            }
            false
        }
    }

    /// Whether a chunk may end right before line `next`.
    fn may_split_before(&self, lines: &[impl AsRef<str>], next: usize) -> bool {
        let line = lines[next].as_ref();
        if !self.in_file || is_git_header(line) || is_hunk_header(line) {
            return true;
        }
        !self.pending_git_header && is_old_file_header(lines, next)
    }
}

/// Split diff lines into chunks of roughly `target_lines` lines.
///
/// A chunk closes once it holds at least `target_lines` lines and the next
/// line starts a new file (`diff --git`, or a `---`/`+++` pair not already
/// announced by one), starts a hunk (`@@`), or the scan is still outside any
/// file section. Hunk bodies are never cut. Concatenating the chunks'
/// lines in order yields the input.
///
/// Empty input gives one empty chunk. A target of 0 means
/// [`DEFAULT_TARGET_LINES`].
pub fn split<S: AsRef<str>>(lines: &[S], target_lines: usize) -> Vec<Chunk> {
    let target = if target_lines == 0 {
        DEFAULT_TARGET_LINES
    } else {
        target_lines
    };

    let mut chunks = Vec::new();
    let mut current = Chunk::starting_at(1);
    let mut cursor = Cursor::default();

    for i in 0..lines.len() {
        if cursor.advance(lines, i) {
            current.file_count += 1;
        }
        current.lines.push(lines[i].as_ref().to_string());

        let next = i + 1;
        if next < lines.len()
            && current.lines.len() >= target
            && cursor.may_split_before(lines, next)
        {
            let closed = std::mem::replace(&mut current, Chunk::starting_at(next + 1));
            chunks.push(closed);
        }
    }
    chunks.push(current);

    tracing::debug!(
        lines = lines.len(),
        target,
        chunks = chunks.len(),
        "split diff"
    );
    chunks
}

/// Split text on line boundaries, keeping each line's terminator so that
/// [`Chunk::text`] of every chunk concatenates back to `text`.
pub fn split_text(text: &str, target_lines: usize) -> Vec<Chunk> {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    split(&lines, target_lines)
}

/// Header line announcing a chunk, e.g. `# Part 2/5 (lines 501-980, 3 file(s))`.
///
/// `part` is 1-indexed.
pub fn format_chunk_header(part: usize, total: usize, chunk: &Chunk) -> String {
    format!(
        "# Part {part}/{total} (lines {}-{}, {} file(s))",
        chunk.start_line,
        chunk.end_line(),
        chunk.file_count
    )
}
