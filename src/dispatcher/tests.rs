// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::pipeline::tests::{FakeMedia, Harness, harness_configured};
use crate::types::{ResourceId, ResourceKind};
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

const OWNER: i64 = 1001;
const CHAT: i64 = 1001;

/// Transport that records every call
#[derive(Default)]
struct RecordingTransport {
    next_id: AtomicI64,
    sent: Mutex<Vec<String>>,
    edits: Mutex<Vec<(MessageRef, String)>>,
    deleted: Mutex<Vec<MessageRef>>,
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<MessageRef> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(MessageRef {
            chat_id,
            message_id: 500 + self.next_id.fetch_add(1, Ordering::SeqCst),
        })
    }

    async fn edit_message(&self, message: &MessageRef, text: &str) -> Result<()> {
        self.edits.lock().unwrap().push((*message, text.to_string()));
        Ok(())
    }

    async fn delete_message(&self, message: &MessageRef) -> Result<()> {
        self.deleted.lock().unwrap().push(*message);
        Ok(())
    }
}

impl RecordingTransport {
    fn last_sent(&self) -> String {
        self.sent.lock().unwrap().last().cloned().unwrap_or_default()
    }

    fn last_edit(&self) -> String {
        self.edits
            .lock()
            .unwrap()
            .last()
            .map(|(_, text)| text.clone())
            .unwrap_or_default()
    }
}

struct Setup {
    harness: Harness,
    transport: Arc<RecordingTransport>,
    dispatcher: Dispatcher,
    shutdown: CancellationToken,
}

async fn setup_with(media: FakeMedia) -> Setup {
    let harness = harness_configured(media, 0, |config| {
        config.dispatcher.allowed_principal = OWNER;
        config.dispatcher.cleanup_delay = Duration::ZERO;
        config.article.enabled = true;
    })
    .await;
    let transport = Arc::new(RecordingTransport::default());
    let shutdown = CancellationToken::new();
    let dispatcher = Dispatcher::new(harness.pipeline.clone(), transport.clone(), &shutdown);
    Setup {
        harness,
        transport,
        dispatcher,
        shutdown,
    }
}

async fn setup() -> Setup {
    setup_with(FakeMedia::default()).await
}

fn message(id: i64, text: &str) -> InboundMessage {
    InboundMessage {
        principal: OWNER,
        message: MessageRef {
            chat_id: CHAT,
            message_id: id,
        },
        text: text.to_string(),
    }
}

/// Let every spawned pipeline finish
async fn drain(dispatcher: &Dispatcher) {
    dispatcher.tracker.close();
    dispatcher.tracker.wait().await;
    dispatcher.tracker.reopen();
}

#[tokio::test]
async fn test_unauthorized_principal_is_denied() {
    let s = setup().await;
    let mut events = s.harness.pipeline.subscribe();

    let err = s
        .dispatcher
        .handle(InboundMessage {
            principal: 666,
            ..message(1, "https://youtu.be/dQw4w9WgXcQ")
        })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Unauthorized(666)));
    assert_eq!(s.transport.last_sent(), "Unauthorized. This bot is private.");
    assert_eq!(s.dispatcher.in_flight(), 0);
    assert!(events.try_recv().is_err(), "no pipeline was started");
}

#[tokio::test]
async fn test_submission_acknowledges_edits_and_cleans_up() {
    let s = setup().await;

    s.dispatcher
        .handle(message(7, "https://youtu.be/dQw4w9WgXcQ"))
        .await
        .unwrap();
    assert_eq!(s.transport.last_sent(), "⏳ Processing...");

    drain(&s.dispatcher).await;

    let status = MessageRef {
        chat_id: CHAT,
        message_id: 500,
    };
    let edits = s.transport.edits.lock().unwrap().clone();
    assert!(edits.iter().all(|(handle, _)| *handle == status), "only the status message is edited");
    assert_eq!(s.transport.last_edit(), "✅ Video dQw4w9WgXcQ (0:00)");
    assert_eq!(
        *s.transport.deleted.lock().unwrap(),
        vec![MessageRef {
            chat_id: CHAT,
            message_id: 7
        }]
    );
    assert_eq!(s.harness.pipeline.db.count("test").await.unwrap(), 1);
}

#[tokio::test]
async fn test_failures_are_reported_on_the_status_message() {
    let s = setup_with(FakeMedia {
        skip: true,
        ..Default::default()
    })
    .await;

    s.dispatcher
        .handle(message(7, "https://youtu.be/dQw4w9WgXcQ"))
        .await
        .unwrap();
    drain(&s.dispatcher).await;

    assert!(
        s.transport
            .last_edit()
            .starts_with("❌ Error: no content:")
    );
}

#[tokio::test]
async fn test_commands_answer_while_pipeline_is_in_flight() {
    let s = setup_with(FakeMedia {
        acquire_delay: Duration::from_secs(60),
        ..Default::default()
    })
    .await;

    s.dispatcher
        .handle(message(7, "https://youtu.be/dQw4w9WgXcQ"))
        .await
        .unwrap();
    assert_eq!(s.dispatcher.in_flight(), 1);

    s.dispatcher.handle(message(8, "/list")).await.unwrap();
    assert_eq!(s.transport.last_sent(), "No entries in feed yet.");

    s.shutdown.cancel();
    s.dispatcher.shutdown().await;

    assert_eq!(s.dispatcher.in_flight(), 0);
    assert!(s.transport.last_edit().contains("cancelled"));
    assert_eq!(s.harness.pipeline.db.count("test").await.unwrap(), 0);
}

#[tokio::test]
async fn test_submissions_after_shutdown_are_refused() {
    let s = setup().await;
    s.dispatcher.shutdown().await;

    let err = s
        .dispatcher
        .handle(message(7, "https://youtu.be/dQw4w9WgXcQ"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert_eq!(s.transport.last_sent(), "Shutting down, try again later.");
}

#[tokio::test]
async fn test_list_and_history() {
    let s = setup().await;
    for (id, raw) in [(1, "aaaaaaaaaaa"), (2, "bbbbbbbbbbb")] {
        s.dispatcher
            .handle(message(id, &format!("https://youtu.be/{raw}")))
            .await
            .unwrap();
        drain(&s.dispatcher).await;
    }

    s.dispatcher.handle(message(3, "/list")).await.unwrap();
    assert_eq!(
        s.transport.last_sent(),
        "Recent entries (2):\n\n1. Video bbbbbbbbbbb (0:00)\n2. Video aaaaaaaaaaa (0:00)\n"
    );

    s.dispatcher.handle(message(4, "/history")).await.unwrap();
    let history = s.transport.last_sent();
    assert!(history.starts_with("📜 History (2):"));
    assert!(history.contains("https://www.youtube.com/watch?v=bbbbbbbbbbb"));
}

#[tokio::test]
async fn test_delete_resets_marker_and_allows_resubmission() {
    let s = setup().await;
    let url = "https://youtu.be/dQw4w9WgXcQ";
    s.dispatcher.handle(message(1, url)).await.unwrap();
    drain(&s.dispatcher).await;

    let id = ResourceId::new(ResourceKind::Video, "dQw4w9WgXcQ");
    let file = s.harness.pipeline.audio_path(&id);
    assert!(file.exists());

    s.dispatcher.handle(message(2, "/del")).await.unwrap();
    assert_eq!(
        s.transport.last_sent(),
        "🗑 Deleted: Video dQw4w9WgXcQ\n\nFeed is now empty."
    );
    assert!(!file.exists());
    assert!(
        s.harness
            .pipeline
            .db
            .processed_at("test", &id)
            .await
            .unwrap()
            .is_none()
    );

    s.dispatcher.handle(message(3, url)).await.unwrap();
    drain(&s.dispatcher).await;
    assert!(s.transport.last_edit().starts_with("✅"));
    assert_eq!(s.harness.pipeline.db.count("test").await.unwrap(), 1);
}

#[tokio::test]
async fn test_delete_out_of_range() {
    let s = setup().await;
    s.dispatcher.handle(message(1, "/del")).await.unwrap();
    assert_eq!(s.transport.last_sent(), "Feed is empty.");

    s.dispatcher
        .handle(message(2, "https://youtu.be/dQw4w9WgXcQ"))
        .await
        .unwrap();
    drain(&s.dispatcher).await;

    s.dispatcher.handle(message(3, "/del 5")).await.unwrap();
    assert_eq!(s.transport.last_sent(), "Only 1 entries in feed.");
    assert_eq!(s.harness.pipeline.db.count("test").await.unwrap(), 1);
}

#[tokio::test]
async fn test_usage_and_unrecognized_replies() {
    let s = setup().await;

    s.dispatcher.handle(message(1, "/vo")).await.unwrap();
    assert!(s.transport.last_sent().starts_with("Usage: /vo"));

    s.dispatcher.handle(message(2, "just words")).await.unwrap();
    assert!(s.transport.last_sent().starts_with("No valid URL found."));
    assert!(s.transport.last_sent().contains("Article"));

    s.dispatcher.handle(message(3, "/help")).await.unwrap();
    assert!(s.transport.last_sent().contains("/history"));
    assert_eq!(s.dispatcher.in_flight(), 0);
}

#[tokio::test]
async fn test_run_loop_stops_when_channel_closes() {
    let s = setup().await;
    let (tx, rx) = mpsc::channel(4);
    tx.send(message(1, "/list")).await.unwrap();
    tx.send(InboundMessage {
        principal: 2,
        ..message(2, "/list")
    })
    .await
    .unwrap();
    drop(tx);

    s.dispatcher.run(rx).await;

    let sent = s.transport.sent.lock().unwrap().clone();
    assert_eq!(
        sent,
        vec!["No entries in feed yet.", "Unauthorized. This bot is private."]
    );
}
