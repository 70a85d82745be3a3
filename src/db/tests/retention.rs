use super::{test_db, video};
use std::collections::HashSet;

#[tokio::test]
async fn test_remove_old_under_limit_removes_nothing() {
    let (db, _tmp) = test_db().await;
    db.save(&video("personal", "a", 100)).await.unwrap();

    let removed = db.remove_old("personal", 5).await.unwrap();
    assert!(removed.is_empty());
    assert_eq!(db.count("personal").await.unwrap(), 1);
}

#[tokio::test]
async fn test_remove_old_keeps_newest_and_returns_evicted_paths() {
    let (db, _tmp) = test_db().await;
    for (raw, ts) in [("a", 100), ("b", 200), ("c", 300), ("d", 400)] {
        db.save(&video("personal", raw, ts)).await.unwrap();
    }

    let removed = db.remove_old("personal", 2).await.unwrap();

    let removed: HashSet<String> = removed.into_iter().collect();
    let expected: HashSet<String> = ["/audio/a.mp3", "/audio/b.mp3"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(removed, expected);

    let left: Vec<String> = db
        .load("personal", 10)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.resource_id.raw().to_string())
        .collect();
    assert_eq!(left, vec!["d", "c"]);
}

#[tokio::test]
async fn test_remove_old_uses_published_not_insertion_order() {
    let (db, _tmp) = test_db().await;
    // inserted newest-first
    for (raw, ts) in [("c", 300), ("b", 200), ("a", 100)] {
        db.save(&video("personal", raw, ts)).await.unwrap();
    }

    let removed = db.remove_old("personal", 2).await.unwrap();
    assert_eq!(removed, vec!["/audio/a.mp3".to_string()]);
}

#[tokio::test]
async fn test_remove_old_only_touches_its_feed() {
    let (db, _tmp) = test_db().await;
    for (raw, ts) in [("a", 100), ("b", 200), ("c", 300)] {
        db.save(&video("mine", raw, ts)).await.unwrap();
        db.save(&video("other", raw, ts)).await.unwrap();
    }

    let removed = db.remove_old("mine", 1).await.unwrap();
    assert_eq!(removed.len(), 2);
    assert_eq!(db.count("mine").await.unwrap(), 1);
    assert_eq!(db.count("other").await.unwrap(), 3);
}

#[tokio::test]
async fn test_retention_invariant_over_many_saves() {
    let (db, _tmp) = test_db().await;
    let max_items = 3;
    let mut all_removed = Vec::new();

    for i in 0..10 {
        db.save(&video("personal", &format!("v{i}"), 1_000 + i))
            .await
            .unwrap();
        all_removed.extend(db.remove_old("personal", max_items).await.unwrap());

        let loaded = db.load("personal", max_items + 1).await.unwrap();
        assert!(loaded.len() <= max_items);
    }

    let left: Vec<String> = db
        .load("personal", max_items + 1)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.resource_id.raw().to_string())
        .collect();
    assert_eq!(left, vec!["v9", "v8", "v7"]);
    assert_eq!(all_removed.len(), 7);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_remove_old_races_with_concurrent_saves() {
    let (db, _tmp) = test_db().await;
    let db = std::sync::Arc::new(db);
    let max_items = 2;

    let mut handles = Vec::new();
    for i in 0..100 {
        let db = db.clone();
        handles.push(tokio::spawn(async move {
            db.save(&video("racy", &format!("v{i}"), 1_000 + i)).await?;
            db.remove_old("racy", max_items).await
        }));
    }

    let mut removed = 0;
    for handle in handles {
        removed += handle
            .await
            .unwrap()
            .expect("eviction must not fail under concurrent saves")
            .len();
    }

    assert_eq!(db.count("racy").await.unwrap(), max_items);
    assert_eq!(removed, 100 - max_items);
}
