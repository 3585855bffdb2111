//! Concurrent assembly of the context document.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use ctxforge_core::{FileTree, GenerateConfig, GenerateError, Phase, ProgressEvent, ProgressSender};

use crate::binary::{PEEK_SIZE, looks_binary};
use crate::render::render_tree;

/// Outcome of one file: a formatted block, or `None` when skipped.
type Outcome = Result<Option<String>, GenerateError>;

/// A finished read on its way to the consumer. The permit travels with it
/// and is released only once the outcome has been merged in order.
struct Delivery {
    index: usize,
    outcome: Outcome,
    permit: OwnedSemaphorePermit,
}

/// A generated document with its accounting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContext {
    /// The assembled document (tree prefix plus file blocks).
    pub document: String,
    /// Files whose block made it into the document.
    pub files_included: usize,
    /// Files skipped for size or binary content.
    pub files_skipped: usize,
    /// Bytes of file blocks, excluding the tree prefix.
    pub bytes: u64,
}

/// Reads selected files on a bounded pool and assembles them in order.
#[derive(Debug, Clone, Default)]
pub struct ContextGenerator {
    config: GenerateConfig,
    progress: ProgressSender,
}

/// One file to read.
struct Job {
    index: usize,
    rel_path: String,
    path: PathBuf,
}

/// The subset of the configuration workers need.
#[derive(Clone, Copy)]
struct ReadOptions {
    max_file_size: u64,
    skip_binary: bool,
}

impl ContextGenerator {
    /// Create a generator with the given budgets.
    pub fn new(config: GenerateConfig) -> Self {
        Self {
            config,
            progress: ProgressSender::disabled(),
        }
    }

    /// Report progress through `progress`.
    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = progress;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &GenerateConfig {
        &self.config
    }

    /// Assemble the document for `files` (relative paths under the tree root).
    pub async fn generate(
        &self,
        tree: &FileTree,
        files: &[String],
        cancel: &CancellationToken,
    ) -> Result<String, GenerateError> {
        Ok(self.generate_with_stats(tree, files, cancel).await?.document)
    }

    /// Assemble the document and report what went into it.
    ///
    /// Blocks appear in the order of `files` regardless of which worker
    /// finishes first. Any read failure, budget violation or cancellation
    /// fails the whole call once every dispatched worker has finished; no
    /// partial document is returned.
    pub async fn generate_with_stats(
        &self,
        tree: &FileTree,
        files: &[String],
        cancel: &CancellationToken,
    ) -> Result<GeneratedContext, GenerateError> {
        if cancel.is_cancelled() {
            return Err(GenerateError::Cancelled);
        }

        let start = Instant::now();
        let total = files.len();
        let workers = self.config.worker_count().max(1);
        let jobs: Vec<Job> = files
            .iter()
            .enumerate()
            .map(|(index, rel_path)| Job {
                index,
                rel_path: rel_path.clone(),
                path: tree.root_path.join(rel_path),
            })
            .collect();

        tracing::debug!(files = total, workers, "dispatching reads");

        let stop = cancel.child_token();
        let (tx, mut rx) = mpsc::channel::<Delivery>(workers);
        let dispatcher = tokio::spawn(dispatch(
            jobs,
            workers,
            ReadOptions {
                max_file_size: self.config.max_file_size,
                skip_binary: self.config.skip_binary,
            },
            tx,
            stop.clone(),
        ));

        let mut assembly = Assembly::new(&self.config);
        let mut pending: BTreeMap<usize, (Outcome, OwnedSemaphorePermit)> = BTreeMap::new();
        let mut next = 0;

        loop {
            let received = tokio::select! {
                biased;
                _ = cancel.cancelled(), if assembly.failure.is_none() => {
                    assembly.fail(GenerateError::Cancelled);
                    stop.cancel();
                    continue;
                }
                received = rx.recv() => received,
            };
            let Some(Delivery {
                index,
                outcome,
                permit,
            }) = received
            else {
                break;
            };

            // Every lower index was dispatched before this one, so stopping
            // dispatch here cannot hide an earlier failure.
            if outcome.is_err() {
                stop.cancel();
            }
            pending.insert(index, (outcome, permit));

            // Parked outcomes keep their permits, so at most `workers` file
            // contents are ever held at once.
            while let Some((outcome, permit)) = pending.remove(&next) {
                let rel_path = &files[next];
                next += 1;
                assembly.merge(rel_path, outcome);
                drop(permit);
                if assembly.failure.is_some() {
                    stop.cancel();
                } else {
                    self.progress.emit(ProgressEvent::counted(
                        Phase::Reading,
                        next as u64,
                        total as u64,
                        Some(rel_path.clone()),
                    ));
                }
            }
        }

        match dispatcher.await {
            Ok(Ok(())) => {}
            Ok(Err(message)) => assembly.fail(GenerateError::Worker { message }),
            Err(err) => assembly.fail(GenerateError::Worker {
                message: err.to_string(),
            }),
        }
        if assembly.failure.is_none() && next < total {
            assembly.fail(GenerateError::Worker {
                message: format!("{} of {total} files produced no result", total - next),
            });
        }

        let Assembly {
            blocks,
            included,
            skipped,
            bytes,
            failure,
            ..
        } = assembly;

        if let Some(err) = failure {
            tracing::warn!(error = %err, "generation failed");
            return Err(err);
        }

        let document = if self.config.include_tree {
            let mut document = render_tree(tree, &self.config.tree);
            document.push('\n');
            document.push_str(&blocks);
            document
        } else {
            blocks
        };

        self.progress.emit(
            ProgressEvent::counted(Phase::Complete, total as u64, total as u64, None)
                .with_label("generation complete"),
        );
        tracing::info!(
            included,
            skipped,
            bytes,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "generation complete"
        );

        Ok(GeneratedContext {
            document,
            files_included: included,
            files_skipped: skipped,
            bytes,
        })
    }
}

/// Ordered accumulator. Only the consuming task touches it.
struct Assembly {
    max_files: usize,
    max_total_size: u64,
    blocks: String,
    included: usize,
    skipped: usize,
    bytes: u64,
    failure: Option<GenerateError>,
}

impl Assembly {
    fn new(config: &GenerateConfig) -> Self {
        Self {
            max_files: config.max_files,
            max_total_size: config.max_total_size,
            blocks: String::new(),
            included: 0,
            skipped: 0,
            bytes: 0,
            failure: None,
        }
    }

    /// Record the first failure; later ones are dropped.
    fn fail(&mut self, err: GenerateError) {
        if self.failure.is_none() {
            self.failure = Some(err);
        }
    }

    /// Merge the next outcome in index order.
    fn merge(&mut self, rel_path: &str, outcome: Outcome) {
        if self.failure.is_some() {
            return;
        }
        let block = match outcome {
            Ok(Some(block)) => block,
            Ok(None) => {
                tracing::debug!(path = rel_path, "skipped");
                self.skipped += 1;
                return;
            }
            Err(err) => {
                self.fail(err);
                return;
            }
        };

        if self.max_files > 0 && self.included >= self.max_files {
            self.fail(GenerateError::FileLimitExceeded {
                limit: self.max_files,
            });
            return;
        }

        let attempted = self.bytes + block.len() as u64;
        if self.max_total_size > 0 && attempted > self.max_total_size {
            self.fail(GenerateError::TotalSizeExceeded {
                limit: self.max_total_size,
                attempted,
            });
            return;
        }

        self.blocks.push_str(&block);
        self.bytes = attempted;
        self.included += 1;
    }
}

/// Spawn one blocking worker per job, at most `workers` at a time.
///
/// A worker's permit is handed to the consumer along with its outcome and
/// only returns to the pool once that outcome is merged, so a slow file at
/// the head of the order stalls dispatch instead of letting later contents
/// pile up. Returns once every spawned worker has finished.
async fn dispatch(
    jobs: Vec<Job>,
    workers: usize,
    options: ReadOptions,
    tx: mpsc::Sender<Delivery>,
    stop: CancellationToken,
) -> Result<(), String> {
    let semaphore = Arc::new(Semaphore::new(workers));
    let mut set = JoinSet::new();

    for job in jobs {
        let permit = tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            permit = semaphore.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };
        let tx = tx.clone();
        set.spawn_blocking(move || {
            let outcome = read_block(&job, options);
            // The consumer drains until every sender is gone, so this only
            // fails if the consumer itself was dropped.
            let _ = tx.blocking_send(Delivery {
                index: job.index,
                outcome,
                permit,
            });
        });
    }
    drop(tx);

    let mut failure = None;
    while let Some(joined) = set.join_next().await {
        if let Err(err) = joined {
            failure.get_or_insert_with(|| err.to_string());
        }
    }
    match failure {
        Some(message) => Err(message),
        None => Ok(()),
    }
}

/// Read one file and format its block.
fn read_block(job: &Job, options: ReadOptions) -> Outcome {
    let read_err = |err: std::io::Error| GenerateError::read(&job.path, err);

    let mut file = File::open(&job.path).map_err(read_err)?;
    let len = file.metadata().map_err(read_err)?.len();
    if options.max_file_size > 0 && len > options.max_file_size {
        return Ok(None);
    }

    let mut bytes = Vec::with_capacity(PEEK_SIZE);
    if options.skip_binary {
        (&mut file)
            .take(PEEK_SIZE as u64)
            .read_to_end(&mut bytes)
            .map_err(read_err)?;
        if looks_binary(&bytes) {
            return Ok(None);
        }
    }
    file.read_to_end(&mut bytes).map_err(read_err)?;

    let content = String::from_utf8_lossy(&bytes);
    Ok(Some(format_block(&job.rel_path, &content)))
}

/// Wrap `content` in a `<file path="...">` block ending in a newline.
pub fn format_block(rel_path: &str, content: &str) -> String {
    let mut block = String::with_capacity(content.len() + rel_path.len() + 24);
    block.push_str("<file path=\"");
    block.push_str(rel_path);
    block.push_str("\">\n");
    block.push_str(content);
    if !content.ends_with('\n') {
        block.push('\n');
    }
    block.push_str("</file>\n");
    block
}
