//! End-to-end scenarios over a real store and in-process adapters
//!
//! # Running the tests
//!
//! ```bash
//! cargo test --test feed_scenarios
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use audiofeed::pipeline::{NoProgress, Request};
use audiofeed::{Event, Outcome, ResourceId, ResourceKind};
use common::{SlowMedia, feed_with};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn video(raw: &str) -> Request {
    Request::new(ResourceKind::Video, format!("https://youtu.be/{raw}"))
}

#[tokio::test]
async fn concurrent_duplicate_submissions_leave_one_entry() {
    let media = Arc::new(SlowMedia::new(Duration::from_millis(150)));
    let (feed, dir) = feed_with(media.clone(), 2).await;
    let pipeline = feed.pipeline().clone();
    let request = video("v1v1v1v1v1v");

    let first = {
        let pipeline = pipeline.clone();
        let request = request.clone();
        tokio::spawn(async move {
            pipeline
                .run(&request, &NoProgress, &CancellationToken::new())
                .await
        })
    };
    let second = {
        let pipeline = pipeline.clone();
        let request = request.clone();
        tokio::spawn(async move {
            pipeline
                .run(&request, &NoProgress, &CancellationToken::new())
                .await
        })
    };

    let outcomes = [
        first.await.unwrap().unwrap(),
        second.await.unwrap().unwrap(),
    ];
    let added = outcomes
        .iter()
        .filter(|o| matches!(o, Outcome::Added { .. }))
        .count();
    assert_eq!(added, 1, "{outcomes:?}");

    let entries = feed.db().load("e2e", 10).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(
        entries[0].resource_id,
        ResourceId::new(ResourceKind::Video, "v1v1v1v1v1v")
    );

    // both runs may have downloaded; the store references exactly one file
    assert!(media.downloads.load(Ordering::SeqCst) >= 1);
    assert!(Path::new(&entries[0].file_path).exists());
    assert!(entries[0].file_path.starts_with(dir.path().to_str().unwrap()));
}

#[tokio::test]
async fn retention_keeps_the_newest_two() {
    let media = Arc::new(SlowMedia::new(Duration::ZERO));
    let (feed, _dir) = feed_with(media, 2).await;
    let pipeline = feed.pipeline();
    let mut events = feed.subscribe();

    let mut files = Vec::new();
    for raw in ["AAAAAAAAAAA", "BBBBBBBBBBB", "CCCCCCCCCCC", "DDDDDDDDDDD"] {
        let outcome = pipeline
            .run(&video(raw), &NoProgress, &CancellationToken::new())
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Added { .. }));
        let entry = feed
            .db()
            .get("e2e", &ResourceId::new(ResourceKind::Video, raw))
            .await
            .unwrap()
            .unwrap();
        files.push(entry.file_path);
        // distinct publication seconds
        tokio::time::sleep(Duration::from_millis(1100)).await;
    }

    let kept: HashSet<String> = feed
        .db()
        .load("e2e", 3)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.resource_id.raw().to_string())
        .collect();
    assert_eq!(
        kept,
        HashSet::from(["CCCCCCCCCCC".to_string(), "DDDDDDDDDDD".to_string()])
    );

    assert!(!Path::new(&files[0]).exists());
    assert!(!Path::new(&files[1]).exists());
    assert!(Path::new(&files[2]).exists());
    assert!(Path::new(&files[3]).exists());

    let mut evicted = 0;
    while let Ok(event) = events.try_recv() {
        if let Event::Evicted { count, .. } = event {
            evicted += count;
        }
    }
    assert_eq!(evicted, 2);
}

#[tokio::test]
async fn deleted_entry_stays_deduplicated_until_marker_reset() {
    let media = Arc::new(SlowMedia::new(Duration::ZERO));
    let (feed, _dir) = feed_with(media.clone(), 10).await;
    let pipeline = feed.pipeline();
    let request = video("xxxxxxxxxxx");

    pipeline
        .run(&request, &NoProgress, &CancellationToken::new())
        .await
        .unwrap();
    let id = ResourceId::new(ResourceKind::Video, "xxxxxxxxxxx");
    let entry = feed.db().get("e2e", &id).await.unwrap().unwrap();
    feed.db().remove(&entry).await.unwrap();

    let again = pipeline
        .run(&request, &NoProgress, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(again, Outcome::AlreadyExists { title: None });
    assert_eq!(media.downloads.load(Ordering::SeqCst), 1);

    feed.db().reset_processed(&entry).await.unwrap();
    let third = pipeline
        .run(&request, &NoProgress, &CancellationToken::new())
        .await
        .unwrap();
    assert!(matches!(third, Outcome::Added { .. }));
    assert_eq!(media.downloads.load(Ordering::SeqCst), 2);
}
