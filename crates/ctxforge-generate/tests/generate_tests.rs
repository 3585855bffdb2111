use ctxforge_core::{
    GenerateConfig, GenerateError, Phase, ProgressSender, SelectionState, included_files,
};
use ctxforge_generate::{ContextGenerator, format_block};
use ctxforge_scan::{CancellationToken, DirectoryScanner, FileTree, ScanConfig};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, contents: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

fn scan(root: &Path) -> FileTree {
    let config = ScanConfig::builder()
        .root(root)
        .use_builtin_ignores(false)
        .build()
        .unwrap();
    DirectoryScanner::for_config(&config)
        .unwrap()
        .scan(&config, &CancellationToken::new())
        .unwrap()
}

fn go_source() -> String {
    let mut source = String::from("package main\n\nfunc main() {\n");
    while source.len() < 198 {
        source.push_str("\t// x\n");
    }
    source.truncate(198);
    source.push_str("}\n");
    source
}

fn no_tree() -> GenerateConfig {
    GenerateConfig::builder()
        .include_tree(false)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_binary_file_is_skipped() {
    let temp = TempDir::new().unwrap();
    let source = go_source();
    assert_eq!(source.len(), 200);
    write(temp.path(), "main.go", source.as_bytes());
    write(temp.path(), "binary.dat", b"\x7fELF\0\0\x01");

    let tree = scan(temp.path());
    let files = included_files(&tree, &SelectionState::new());
    assert_eq!(files, vec!["binary.dat", "main.go"]);

    let generated = ContextGenerator::new(no_tree())
        .generate_with_stats(&tree, &files, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(generated.document, format_block("main.go", &source));
    assert!(!generated.document.contains("binary.dat"));
    assert_eq!(generated.files_included, 1);
    assert_eq!(generated.files_skipped, 1);
}

#[tokio::test]
async fn test_binary_file_kept_when_allowed() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "binary.dat", b"a\0b");

    let tree = scan(temp.path());
    let files = included_files(&tree, &SelectionState::new());
    let config = GenerateConfig::builder()
        .include_tree(false)
        .skip_binary(false)
        .build()
        .unwrap();

    let document = ContextGenerator::new(config)
        .generate(&tree, &files, &CancellationToken::new())
        .await
        .unwrap();
    assert!(document.starts_with("<file path=\"binary.dat\">\n"));
}

#[tokio::test]
async fn test_total_size_budget_fails_without_document() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.txt", &[b'a'; 100]);
    write(temp.path(), "b.txt", &[b'b'; 100]);

    let tree = scan(temp.path());
    let files = included_files(&tree, &SelectionState::new());
    let config = GenerateConfig::builder()
        .max_total_size(150u64)
        .build()
        .unwrap();

    let err = ContextGenerator::new(config)
        .generate(&tree, &files, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, GenerateError::TotalSizeExceeded { limit: 150, .. }));
    assert!(err.is_budget());
}

#[tokio::test]
async fn test_file_count_budget() {
    let temp = TempDir::new().unwrap();
    for name in ["a.txt", "b.txt", "c.txt"] {
        write(temp.path(), name, b"text\n");
    }

    let tree = scan(temp.path());
    let files = included_files(&tree, &SelectionState::new());

    let two = GenerateConfig::builder().max_files(2usize).build().unwrap();
    let err = ContextGenerator::new(two)
        .generate(&tree, &files, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, GenerateError::FileLimitExceeded { limit: 2 }));

    let three = GenerateConfig::builder().max_files(3usize).build().unwrap();
    let generated = ContextGenerator::new(three)
        .generate_with_stats(&tree, &files, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(generated.files_included, 3);
}

#[tokio::test]
async fn test_oversized_files_are_skipped_silently() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "big.txt", &[b'x'; 4096]);
    write(temp.path(), "small.txt", b"ok\n");

    let tree = scan(temp.path());
    let files = included_files(&tree, &SelectionState::new());
    let config = GenerateConfig::builder()
        .include_tree(false)
        .max_file_size(1024u64)
        .build()
        .unwrap();

    let document = ContextGenerator::new(config)
        .generate(&tree, &files, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(document, "<file path=\"small.txt\">\nok\n</file>\n");
}

#[tokio::test]
async fn test_missing_file_fails_whole_generation() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.txt", b"a\n");
    write(temp.path(), "gone.txt", b"soon gone\n");
    write(temp.path(), "z.txt", b"z\n");

    let tree = scan(temp.path());
    let files = included_files(&tree, &SelectionState::new());
    fs::remove_file(temp.path().join("gone.txt")).unwrap();

    let err = ContextGenerator::new(GenerateConfig::default())
        .generate(&tree, &files, &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        GenerateError::Read { path, .. } => assert!(path.ends_with("gone.txt")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_blocks_follow_selection_order() {
    let temp = TempDir::new().unwrap();
    let mut expected = String::new();
    for i in 0..40 {
        let rel = format!("dir{}/file{i:02}.txt", i % 4);
        let body = format!("body {i}\n").repeat(i + 1);
        write(temp.path(), &rel, body.as_bytes());
    }

    let tree = scan(temp.path());
    let files = included_files(&tree, &SelectionState::new());
    for rel in &files {
        let body = fs::read_to_string(temp.path().join(rel)).unwrap();
        expected.push_str(&format_block(rel, &body));
    }

    let config = GenerateConfig::builder()
        .include_tree(false)
        .workers(8usize)
        .build()
        .unwrap();
    let generator = ContextGenerator::new(config);
    for _ in 0..3 {
        let document = generator
            .generate(&tree, &files, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(document, expected);
    }
}

#[tokio::test]
async fn test_document_includes_tree_prefix() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "src/main.rs", b"fn main() {}\n");

    let tree = scan(temp.path());
    let files = included_files(&tree, &SelectionState::new());
    let document = ContextGenerator::new(GenerateConfig::default())
        .generate(&tree, &files, &CancellationToken::new())
        .await
        .unwrap();

    let root = tree.root_node().name.to_string();
    let expected = format!(
        "{root}/\n└── src/\n    └── main.rs\n\n\
         <file path=\"src/main.rs\">\nfn main() {{}}\n</file>\n"
    );
    assert_eq!(document, expected);
}

#[tokio::test]
async fn test_selection_exclusions_are_honoured() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "keep.txt", b"keep\n");
    write(temp.path(), "drop/inner.txt", b"drop\n");

    let tree = scan(temp.path());
    let mut selection = SelectionState::new();
    selection.exclude("drop");
    let files = included_files(&tree, &selection);

    let document = ContextGenerator::new(no_tree())
        .generate(&tree, &files, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(document, "<file path=\"keep.txt\">\nkeep\n</file>\n");
}

#[tokio::test]
async fn test_cancelled_generation() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.txt", b"a\n");

    let tree = scan(temp.path());
    let files = included_files(&tree, &SelectionState::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = ContextGenerator::new(GenerateConfig::default())
        .generate(&tree, &files, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, GenerateError::Cancelled));
}

#[tokio::test]
async fn test_empty_selection() {
    let temp = TempDir::new().unwrap();
    let tree = scan(temp.path());

    let generated = ContextGenerator::new(no_tree())
        .generate_with_stats(&tree, &[], &CancellationToken::new())
        .await
        .unwrap();
    assert!(generated.document.is_empty());
    assert_eq!(generated.files_included, 0);
}

#[tokio::test]
async fn test_progress_reports_reading_and_completion() {
    let temp = TempDir::new().unwrap();
    for name in ["a.txt", "b.txt", "c.txt"] {
        write(temp.path(), name, b"text\n");
    }

    let tree = scan(temp.path());
    let files = included_files(&tree, &SelectionState::new());
    let (progress, mut rx) = ProgressSender::channel(64);

    ContextGenerator::new(GenerateConfig::default())
        .with_progress(progress)
        .generate(&tree, &files, &CancellationToken::new())
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    let reading: Vec<u64> = events
        .iter()
        .filter(|e| e.phase == Phase::Reading)
        .map(|e| e.current)
        .collect();
    assert_eq!(reading, vec![1, 2, 3]);
    assert_eq!(events.last().map(|e| e.percentage()), Some(Some(100.0)));
}

/// Named pipes let a test decide exactly when a worker's read can finish.
#[cfg(unix)]
mod pipes {
    use super::*;
    use std::io::Write;
    use std::process::Command;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc as std_mpsc;
    use std::thread;
    use std::time::Duration;

    fn mkfifo(path: &Path) -> bool {
        Command::new("mkfifo")
            .arg(path)
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn open_writer(path: &Path) -> fs::File {
        fs::OpenOptions::new().write(true).open(path).unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stalled_head_file_bounds_later_reads() {
        let temp = TempDir::new().unwrap();
        let names: Vec<String> = (0..21).map(|i| format!("f{i:02}")).collect();
        for name in &names {
            if !mkfifo(&temp.path().join(name)) {
                return;
            }
        }

        let tree = scan(temp.path());
        let files = included_files(&tree, &SelectionState::new());
        assert_eq!(files, names);

        let config = GenerateConfig::builder()
            .workers(2usize)
            .include_tree(false)
            .build()
            .unwrap();
        let generation = tokio::spawn(async move {
            ContextGenerator::new(config)
                .generate_with_stats(&tree, &files, &CancellationToken::new())
                .await
        });

        // Feed every file except the first, in order. Opening a pipe for
        // writing blocks until a worker opens it for reading.
        let served = Arc::new(AtomicUsize::new(0));
        let writer = {
            let served = Arc::clone(&served);
            let paths: Vec<_> = names[1..].iter().map(|n| temp.path().join(n)).collect();
            thread::spawn(move || {
                for path in paths {
                    let mut pipe = open_writer(&path);
                    pipe.write_all(b"later\n").unwrap();
                    drop(pipe);
                    served.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        tokio::time::sleep(Duration::from_millis(500)).await;
        let served_while_stalled = served.load(Ordering::SeqCst);

        let head = temp.path().join(&names[0]);
        tokio::task::spawn_blocking(move || {
            let mut pipe = open_writer(&head);
            pipe.write_all(b"head\n").unwrap();
        })
        .await
        .unwrap();

        let generated = generation.await.unwrap().unwrap();
        writer.join().unwrap();

        assert!(
            served_while_stalled <= 2,
            "{served_while_stalled} files were read past a stalled first file"
        );
        assert_eq!(generated.files_included, 21);
        assert!(generated.document.starts_with("<file path=\"f00\">\nhead\n</file>\n"));
        assert!(generated.document.ends_with("<file path=\"f20\">\nlater\n</file>\n"));
    }

    #[tokio::test]
    async fn test_binary_pipe_skipped_without_waiting_for_eof() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("blob.bin");
        if !mkfifo(&path) {
            return;
        }

        let tree = scan(temp.path());
        let files = included_files(&tree, &SelectionState::new());
        assert_eq!(files, vec!["blob.bin"]);

        // The writer keeps the pipe open until released, so a reader that
        // waits for end of file never finishes.
        let (release, released) = std_mpsc::channel::<()>();
        let writer = thread::spawn(move || {
            let mut pipe = open_writer(&path);
            let mut bytes = vec![b'x'; 1024];
            bytes[0] = 0;
            pipe.write_all(&bytes).unwrap();
            let _ = released.recv();
        });

        let generator = ContextGenerator::new(no_tree());
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            generator.generate_with_stats(&tree, &files, &CancellationToken::new()),
        )
        .await;
        release.send(()).unwrap();
        writer.join().unwrap();

        let generated = result.expect("binary check waited for end of file").unwrap();
        assert_eq!(generated.files_skipped, 1);
        assert_eq!(generated.files_included, 0);
        assert!(generated.document.is_empty());
    }
}
