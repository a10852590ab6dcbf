mod common;

use anyhow::Result;
use common::{LineOpener, as_refs, bzip2, gzip, numbered, write_lines};
use kodegen_tools_searchbench::document::Document;
use kodegen_tools_searchbench::errors::{IngestError, WalkError};
use kodegen_tools_searchbench::pipeline::{FolderReader, SingleFileReader, document_channel};
use kodegen_tools_searchbench::walker::GlobPattern;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tempfile::TempDir;

async fn drain(rx: async_channel::Receiver<Document>) -> Vec<Document> {
    let mut docs = Vec::new();
    while let Ok(doc) = rx.recv().await {
        docs.push(doc);
    }
    docs
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn channel_closes_after_every_slow_worker() -> Result<()> {
    let dir = TempDir::new()?;
    for f in 0..12 {
        let ids = numbered(&format!("f{f}"), 4);
        write_lines(&dir.path().join(format!("part-{f:02}.txt")), &as_refs(&ids))?;
    }

    let opener = LineOpener::slow(Duration::from_millis(40));
    let (tx, rx) = document_channel(2);
    let handle = FolderReader::new(
        dir.path(),
        GlobPattern::new("*.txt")?,
        3,
        Arc::clone(&opener) as _,
    )
    .start(tx);

    let mut docs = Vec::new();
    let mut peak_active = 0;
    while let Ok(doc) = rx.recv().await {
        peak_active = peak_active.max(handle.active_workers());
        docs.push(doc);
    }
    // Closed only once no worker is inside a file
    assert_eq!(handle.active_workers(), 0);
    assert!(rx.is_closed());

    let summary = handle.join().await?;
    assert_eq!(docs.len(), 48);
    assert_eq!(summary.documents, 48);
    assert_eq!(summary.files_discovered, 12);
    assert_eq!(summary.files_processed, 12);
    assert_eq!(summary.files_failed, 0);
    assert!(summary.walk_complete);
    assert_eq!(opener.opens.load(Ordering::SeqCst), 12);
    assert!(opener.max_concurrent.load(Ordering::SeqCst) <= 3);
    assert!(peak_active <= 3);

    let unique: HashSet<&str> = docs.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(unique.len(), 48);
    Ok(())
}

#[tokio::test]
async fn empty_tree_still_closes_the_channel() -> Result<()> {
    let dir = TempDir::new()?;
    let (tx, rx) = document_channel(4);
    let handle = FolderReader::new(dir.path(), GlobPattern::new("*")?, 4, LineOpener::new()).start(tx);

    assert!(drain(rx).await.is_empty());
    let summary = handle.join().await?;
    assert_eq!(summary.files_discovered, 0);
    Ok(())
}

#[tokio::test]
async fn missing_root_fails_after_closing() -> Result<()> {
    let dir = TempDir::new()?;
    let (tx, rx) = document_channel(4);
    let handle = FolderReader::new(
        dir.path().join("missing"),
        GlobPattern::new("*")?,
        2,
        LineOpener::new(),
    )
    .start(tx);

    assert!(drain(rx).await.is_empty());
    assert!(handle.join().await.is_err());
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn unreadable_directory_fails_after_closing() -> Result<()> {
    let dir = TempDir::new()?;
    write_lines(&dir.path().join("a.txt"), &["a1", "a2"])?;
    write_lines(&dir.path().join("locked/b.txt"), &["b1"])?;
    let Some(_locked) = common::LockedDir::lock(&dir.path().join("locked"))? else {
        return Ok(());
    };

    let (tx, rx) = document_channel(8);
    let handle = FolderReader::new(dir.path(), GlobPattern::new("*.txt")?, 2, LineOpener::new()).start(tx);

    let docs = drain(rx.clone()).await;
    assert!(rx.is_closed());
    assert!(docs.iter().all(|d| d.id != "b1"));

    let result = handle.join().await;
    assert!(matches!(
        result,
        Err(IngestError::Walk(WalkError::ReadDir { .. }))
    ));
    Ok(())
}

#[tokio::test]
async fn compressed_inputs_and_corrupt_file_is_skipped() -> Result<()> {
    let dir = TempDir::new()?;
    let root = dir.path();
    std::fs::write(root.join("a.gz"), gzip(b"g1\ng2\ng3\n")?)?;
    std::fs::write(root.join("b.bz2"), bzip2(b"b1\nb2\n")?)?;
    std::fs::write(root.join("c.txt"), "p1\n")?;
    // gzip magic followed by garbage
    std::fs::write(root.join("broken.gz"), [0x1f, 0x8b, 0x08, 0x00, 0xde, 0xad, 0xbe, 0xef])?;

    let (tx, rx) = document_channel(16);
    let handle = FolderReader::new(root, GlobPattern::new("*")?, 2, LineOpener::new()).start(tx);
    let docs = drain(rx).await;
    let summary = handle.join().await?;

    let ids: HashSet<String> = docs.into_iter().map(|d| d.id).collect();
    let expected: HashSet<String> = ["g1", "g2", "g3", "b1", "b2", "p1"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(ids, expected);
    assert_eq!(summary.files_discovered, 4);
    assert_eq!(summary.files_failed, 1);
    assert_eq!(summary.files_processed, 3);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn consumer_closing_stops_producers() -> Result<()> {
    let dir = TempDir::new()?;
    for f in 0..6 {
        let ids = numbered(&format!("f{f}"), 200);
        write_lines(&dir.path().join(format!("{f}.txt")), &as_refs(&ids))?;
    }

    let (tx, rx) = document_channel(1);
    let handle = FolderReader::new(dir.path(), GlobPattern::new("*.txt")?, 2, LineOpener::new()).start(tx);

    for _ in 0..5 {
        rx.recv().await?;
    }
    rx.close();

    let summary = handle.join().await?;
    assert!(summary.documents < 1200);
    assert_eq!(
        summary.files_processed + summary.files_skipped + summary.files_failed,
        summary.files_discovered
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn single_file_reader_stops_on_request() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("big.txt");
    let ids = numbered("doc", 1000);
    write_lines(&path, &as_refs(&ids))?;

    let (tx, rx) = document_channel(1);
    let handle = SingleFileReader::new(&path, LineOpener::new()).start(tx)?;

    let mut received = Vec::new();
    for _ in 0..3 {
        received.push(rx.recv().await?);
    }
    handle.stop();
    received.extend(drain(rx).await);

    let summary = handle.join().await?;
    assert!(received.len() < 1000);
    assert_eq!(summary.documents as usize, received.len());
    assert_eq!(received[0].id, "doc-0");
    Ok(())
}

#[tokio::test]
async fn single_file_reader_reads_to_end() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("small.gz");
    std::fs::write(&path, gzip(b"x\ny\n-\nz\n")?)?;

    let (tx, rx) = document_channel(8);
    let handle = SingleFileReader::new(&path, LineOpener::new()).start(tx)?;
    let docs = drain(rx).await;
    let summary = handle.join().await?;

    let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["x", "y", "", "z"]);
    assert_eq!(summary.files_processed, 1);
    Ok(())
}

#[tokio::test]
async fn single_file_reader_reports_open_errors() -> Result<()> {
    let dir = TempDir::new()?;
    let (tx, _rx) = document_channel(1);
    let started = SingleFileReader::new(dir.path().join("nope.txt"), LineOpener::new()).start(tx);
    assert!(started.is_err());
    Ok(())
}
