//! ctxforge - Assemble LLM-ready context documents from a source tree.
//!
//! Usage:
//!   ctxforge scan [PATH]          Show the classified tree
//!   ctxforge generate [PATH]      Build a context document
//!   ctxforge split-diff [FILE]    Split a unified diff into parts
//!   ctxforge --help               Show help

use std::io::{IsTerminal, Read, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Context, Result, bail};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use ctxforge_core::{
    GenerateConfig, PROGRESS_CHANNEL_SIZE, ProgressEvent, ProgressSender, RenderOptions,
    ScanConfig, SelectionState, included_files,
};
use ctxforge_diff::{DEFAULT_TARGET_LINES, format_chunk_header, split_text};
use ctxforge_generate::{ContextGenerator, render_tree};
use ctxforge_scan::{CancellationToken, DirectoryScanner, FileTree};

#[derive(Parser)]
#[command(
    name = "ctxforge",
    version,
    about = "Assemble LLM-ready context documents from a source tree",
    long_about = "ctxforge walks a project, drops what .gitignore, the builtin defaults \
                  and your own patterns exclude, and concatenates the rest into one \
                  document of <file path=\"...\"> blocks."
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a directory and show what would be included
    Scan {
        #[command(flatten)]
        rules: RuleArgs,

        /// Show file and directory sizes
        #[arg(short, long)]
        sizes: bool,

        /// Print the scanned tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate a context document
    Generate {
        #[command(flatten)]
        rules: RuleArgs,

        /// Exclude a path relative to the root (repeatable; directories take their subtree)
        #[arg(short = 'x', long = "exclude", value_name = "REL")]
        exclude: Vec<String>,

        /// Skip files larger than this (e.g., "100KB", "1.5MB")
        #[arg(long, value_name = "SIZE")]
        max_file_size: Option<String>,

        /// Fail if more than this many files would be included
        #[arg(long, default_value = "0")]
        max_files: usize,

        /// Fail if the file blocks would exceed this size
        #[arg(long, value_name = "SIZE")]
        max_total_size: Option<String>,

        /// Include files that look binary
        #[arg(long)]
        allow_binary: bool,

        /// Omit the tree listing at the top of the document
        #[arg(long)]
        no_tree: bool,

        /// Number of concurrent readers (0 = available parallelism)
        #[arg(short, long, default_value = "0")]
        workers: usize,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Split a unified diff into parts at file and hunk boundaries
    SplitDiff {
        /// Diff file ("-" or omitted for stdin)
        input: Option<PathBuf>,

        /// Target lines per part
        #[arg(short, long, default_value_t = DEFAULT_TARGET_LINES)]
        lines: usize,

        /// Write part-001.diff, part-002.diff, ... into this directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}

/// Options shared by every command that scans.
#[derive(Args)]
struct RuleArgs {
    /// Path to scan
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Extra ignore pattern in gitignore syntax (repeatable)
    #[arg(short, long = "ignore", value_name = "PATTERN")]
    ignore: Vec<String>,

    /// Do not apply the root .gitignore
    #[arg(long)]
    no_gitignore: bool,

    /// Do not apply the builtin default patterns
    #[arg(long)]
    no_builtin: bool,

    /// Include hidden entries (default)
    #[arg(long, overrides_with = "no_hidden")]
    hidden: bool,

    /// Skip entries whose name starts with a dot
    #[arg(long, overrides_with = "hidden")]
    no_hidden: bool,

    /// Maximum directory depth to descend
    #[arg(short, long)]
    depth: Option<u32>,
}

impl RuleArgs {
    fn scan_config(&self) -> Result<ScanConfig> {
        let root = self
            .path
            .canonicalize()
            .with_context(|| format!("Invalid path: {}", self.path.display()))?;

        ScanConfig::builder()
            .root(root)
            .max_depth(self.depth)
            .include_hidden(self.hidden || !self.no_hidden)
            .use_gitignore(!self.no_gitignore)
            .use_builtin_ignores(!self.no_builtin)
            .custom_patterns(self.ignore.clone())
            .build()
            .context("Invalid scan configuration")
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Scan { rules, sizes, json } => run_scan(&rules, sizes, json),
        Command::Generate {
            rules,
            exclude,
            max_file_size,
            max_files,
            max_total_size,
            allow_binary,
            no_tree,
            workers,
            output,
        } => {
            let config = GenerateConfig {
                max_file_size: parse_optional_size(max_file_size.as_deref())?,
                max_files,
                max_total_size: parse_optional_size(max_total_size.as_deref())?,
                skip_binary: !allow_binary,
                workers,
                include_tree: !no_tree,
                tree: RenderOptions::default(),
            };
            run_generate(&rules, &exclude, config, output.as_deref())
        }
        Command::SplitDiff {
            input,
            lines,
            output_dir,
        } => run_split_diff(input.as_deref(), lines, output_dir.as_deref()),
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Scan and print the classified tree.
fn run_scan(rules: &RuleArgs, sizes: bool, json: bool) -> Result<()> {
    let config = rules.scan_config()?;
    eprintln!("Scanning {}...", config.root.display());

    let scanner = DirectoryScanner::for_config(&config).context("Invalid ignore rules")?;
    let tree = scanner
        .scan(&config, &CancellationToken::new())
        .context("Scan failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tree)?);
        return Ok(());
    }

    let options = RenderOptions {
        show_size: sizes,
        ..Default::default()
    };
    print!("{}", render_tree(&tree, &options));
    print_summary(&tree);
    Ok(())
}

fn print_summary(tree: &FileTree) {
    eprintln!();
    eprintln!("{}", "─".repeat(60));
    eprintln!(
        " {} files, {} directories, {} ignored entries",
        tree.stats.total_files, tree.stats.total_dirs, tree.stats.ignored_entries
    );
    eprintln!(
        " {} in included files, scanned in {:.2}s",
        format_size(tree.stats.total_size),
        tree.scan_duration.as_secs_f64()
    );
    if tree.has_warnings() {
        eprintln!(" {} warning(s) during scan", tree.warnings.len());
        for warning in &tree.warnings {
            eprintln!("   {}", warning.message);
        }
    }
    eprintln!("{}", "─".repeat(60));
}

/// Scan, resolve the selection and assemble the document.
fn run_generate(
    rules: &RuleArgs,
    exclude: &[String],
    config: GenerateConfig,
    output: Option<&Path>,
) -> Result<()> {
    let scan_config = rules.scan_config()?;
    let scanner = DirectoryScanner::for_config(&scan_config).context("Invalid ignore rules")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;

    let generated = runtime.block_on(async move {
        let cancel = CancellationToken::new();
        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            }
        });

        let (progress, rx) = ProgressSender::channel(PROGRESS_CHANNEL_SIZE);
        let printer = tokio::spawn(print_progress(rx));

        let scanner = scanner.with_progress(progress.clone());
        let tree = tokio::task::spawn_blocking({
            let cancel = cancel.clone();
            move || scanner.scan(&scan_config, &cancel)
        })
        .await
        .context("Scan task failed")?
        .context("Scan failed")?;

        let mut selection = SelectionState::new();
        selection.exclude_all(exclude);
        let files = included_files(&tree, &selection);
        tracing::info!(files = files.len(), "resolved selection");

        let generator = ContextGenerator::new(config).with_progress(progress);
        let result = generator.generate_with_stats(&tree, &files, &cancel).await;

        // Closing every sender lets the printer finish.
        drop(generator);
        let _ = printer.await;

        result.context("Generation failed")
    })?;

    match output {
        Some(path) => {
            std::fs::write(path, &generated.document)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "Wrote {} files ({} skipped, {}) to {}",
                generated.files_included,
                generated.files_skipped,
                format_size(generated.bytes),
                path.display()
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(generated.document.as_bytes())?;
            stdout.flush()?;
        }
    }

    Ok(())
}

/// Render progress on stderr when it is a terminal; otherwise just drain.
async fn print_progress(mut rx: mpsc::Receiver<ProgressEvent>) {
    let interactive = std::io::stderr().is_terminal();
    let mut printed = false;

    while let Some(event) = rx.recv().await {
        if !interactive {
            continue;
        }
        let counter = match event.total {
            Some(total) => format!("{}/{}", event.current, total),
            None => event.current.to_string(),
        };
        let item = event.item.as_deref().unwrap_or("");
        let phase = event.phase.to_string();
        eprint!("\r\x1b[2K{phase:<9} {counter} {}", truncate(item, 60));
        printed = true;
    }

    if printed {
        eprintln!();
    }
}

/// Split a diff and print or write its parts.
fn run_split_diff(input: Option<&Path>, lines: usize, output_dir: Option<&Path>) -> Result<()> {
    let text = match input {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        _ => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            text
        }
    };

    let chunks = split_text(&text, lines);
    let total = chunks.len();

    match output_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            for (i, chunk) in chunks.iter().enumerate() {
                let path = dir.join(format!("part-{:03}.diff", i + 1));
                std::fs::write(&path, chunk.text())
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                eprintln!("{} -> {}", format_chunk_header(i + 1, total, chunk), path.display());
            }
        }
        None => {
            for (i, chunk) in chunks.iter().enumerate() {
                println!("{}", format_chunk_header(i + 1, total, chunk));
                let body = chunk.text();
                print!("{body}");
                if !body.is_empty() && !body.ends_with('\n') {
                    println!();
                }
            }
        }
    }

    Ok(())
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Truncate a string to at most `max_len` characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let tail: String = s
            .chars()
            .rev()
            .take(max_len - 1)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("…{tail}")
    }
}

fn parse_optional_size(s: Option<&str>) -> Result<u64> {
    s.map_or(Ok(0), parse_size)
}

/// Parse a size string (e.g., "512", "10KB", "1.5MB", "2G"). Units are
/// binary multiples.
fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim().to_uppercase();
    let split = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    let (num, unit) = s.split_at(split);

    let num: f64 = num
        .parse()
        .with_context(|| format!("Invalid size: {s}"))?;
    let multiplier: u64 = match unit.trim() {
        "" | "B" => 1,
        "K" | "KB" | "KIB" => 1024,
        "M" | "MB" | "MIB" => 1024 * 1024,
        "G" | "GB" | "GIB" => 1024 * 1024 * 1024,
        other => bail!("Unknown size unit: {other}"),
    };

    Ok((num * multiplier as f64) as u64)
}
