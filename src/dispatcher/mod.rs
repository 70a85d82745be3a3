//! Command surface for the single authorized principal
//!
//! Messages are accepted one at a time. Listing, history and deletion run
//! inline against the store. Submissions get an acknowledgement right away
//! and their pipeline runs as a tracked background task, so the accept loop
//! never waits on acquisition. The acknowledgement is edited in place as the
//! pipeline progresses and once it finishes; the submitted message itself is
//! removed shortly after.

mod commands;
mod format;

pub use commands::Command;
pub use format::format_duration;

use crate::error::ErrorClass;
use crate::pipeline::{Pipeline, ProgressSink, Request, eviction::delete_file};
use crate::transport::{InboundMessage, MessageRef, Transport};
use crate::types::{Entry, Event};
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// How long shutdown waits for in-flight pipelines
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Routes principal commands to the store and to pipelines
#[derive(Clone)]
pub struct Dispatcher {
    pipeline: Pipeline,
    transport: Arc<dyn Transport>,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

/// Status message updated in place while a pipeline runs
struct StatusMessage {
    transport: Arc<dyn Transport>,
    message: MessageRef,
}

#[async_trait]
impl ProgressSink for StatusMessage {
    async fn note(&self, text: &str) {
        if let Err(e) = self
            .transport
            .edit_message(&self.message, &format!("⏳ {text}"))
            .await
        {
            tracing::warn!(error = %e, "Failed to update status message");
        }
    }
}

impl Dispatcher {
    /// Create a dispatcher whose pipelines are cancelled along with `shutdown`
    pub fn new(pipeline: Pipeline, transport: Arc<dyn Transport>, shutdown: &CancellationToken) -> Self {
        Self {
            pipeline,
            transport,
            tracker: TaskTracker::new(),
            cancel: shutdown.child_token(),
        }
    }

    /// Number of pipelines currently running
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Accept messages until the channel closes or shutdown is requested
    pub async fn run(&self, mut inbound: mpsc::Receiver<InboundMessage>) {
        loop {
            let message = tokio::select! {
                _ = self.cancel.cancelled() => break,
                message = inbound.recv() => match message {
                    Some(message) => message,
                    None => break,
                },
            };

            match self.handle(message).await {
                Ok(()) => {}
                Err(e) if e.class() == ErrorClass::Rejected => {
                    tracing::debug!(error = %e, "Message rejected");
                }
                Err(e) => tracing::error!(error = %e, "Failed to handle message"),
            }
        }
        tracing::info!("Dispatcher stopped accepting messages");
    }

    /// Handle one inbound message
    ///
    /// Returns once the message is answered. Submissions return as soon as
    /// their acknowledgement is sent.
    pub async fn handle(&self, message: InboundMessage) -> Result<()> {
        let config = &self.pipeline.config;
        let chat = message.message.chat_id;

        if message.principal != config.dispatcher.allowed_principal {
            tracing::warn!(principal = message.principal, "Rejected message from unauthorized principal");
            self.transport.send_message(chat, format::DENIAL).await?;
            return Err(Error::Unauthorized(message.principal));
        }

        match Command::parse(&message.text, config.article.enabled) {
            Command::Help => self.reply(chat, &format::help(config)).await,
            Command::List => {
                let text = match self.load(config.dispatcher.list_limit).await {
                    Ok(entries) => format::list(&entries),
                    Err(e) => format!("Error loading entries: {e}"),
                };
                self.reply(chat, &text).await
            }
            Command::History => {
                let limit = config.feed.max_items.max(config.dispatcher.list_limit);
                let text = match self.load(limit).await {
                    Ok(entries) => format::history(&entries),
                    Err(e) => format!("Error: {e}"),
                };
                self.reply(chat, &text).await
            }
            Command::Delete(n) => {
                let text = self.delete(n).await;
                self.reply(chat, &text).await
            }
            Command::Submit(request) => self.submit(message.message, request).await,
            Command::Usage(text) => self.reply(chat, text).await,
            Command::Unrecognized => {
                self.reply(chat, &format::unrecognized(config.article.enabled))
                    .await
            }
        }
    }

    async fn reply(&self, chat: i64, text: &str) -> Result<()> {
        self.transport.send_message(chat, text).await.map(|_| ())
    }

    async fn load(&self, limit: usize) -> Result<Vec<Entry>> {
        self.pipeline
            .db
            .load(&self.pipeline.config.feed.feed_name, limit)
            .await
    }

    /// Remove the n-th newest entry: store first, then its file, then its marker
    async fn delete(&self, n: usize) -> String {
        let feed = &self.pipeline.config.feed.feed_name;
        let entries = match self.load(n).await {
            Ok(entries) => entries,
            Err(e) => return format!("Error: {e}"),
        };
        if entries.is_empty() {
            return "Feed is empty.".to_string();
        }
        let Some(entry) = entries.get(n - 1) else {
            return format!("Only {} entries in feed.", entries.len());
        };

        if let Err(e) = self.pipeline.db.remove(entry).await {
            tracing::error!(feed = %feed, resource_id = %entry.resource_id, error = %e, "Failed to remove entry");
            return format!("Error removing: {e}");
        }
        delete_file(Path::new(&entry.file_path)).await;
        if let Err(e) = self.pipeline.db.reset_processed(entry).await {
            tracing::warn!(feed = %feed, resource_id = %entry.resource_id, error = %e, "Failed to reset processed marker");
        }

        tracing::info!(feed = %feed, resource_id = %entry.resource_id, title = %entry.title, "Deleted entry");
        self.pipeline.emit_event(Event::Deleted {
            feed: feed.clone(),
            resource_id: entry.resource_id.clone(),
        });

        let remaining = self.load(self.pipeline.config.dispatcher.list_limit).await;
        format::deleted(&entry.title, remaining.as_deref())
    }

    async fn submit(&self, source: MessageRef, request: Request) -> Result<()> {
        if self.cancel.is_cancelled() || self.tracker.is_closed() {
            self.reply(source.chat_id, "Shutting down, try again later.")
                .await?;
            return Err(Error::Cancelled);
        }

        let status = self
            .transport
            .send_message(source.chat_id, format::acknowledgement(request.kind))
            .await?;
        tracing::info!(kind = ?request.kind, url = %request.url, "Accepted submission");
        self.pipeline.emit_event(Event::Submitted {
            kind: request.kind,
            url: request.url.clone(),
        });

        let pipeline = self.pipeline.clone();
        let cancel = self.cancel.clone();
        let cleanup_delay = self.pipeline.config.dispatcher.cleanup_delay;
        let progress = StatusMessage {
            transport: self.transport.clone(),
            message: status,
        };

        self.tracker.spawn(async move {
            let result = pipeline.run(&request, &progress, &cancel).await;
            let text = match &result {
                Ok(outcome) => format::outcome(outcome),
                Err(e) => format::failure(e),
            };
            if let Err(e) = progress.transport.edit_message(&status, &text).await {
                tracing::warn!(error = %e, "Failed to report pipeline result");
            }

            // wait out the delay unless shutting down
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(cleanup_delay) => {}
            }
            if let Err(e) = progress.transport.delete_message(&source).await {
                tracing::debug!(error = %e, "Failed to delete source message");
            }
        });
        Ok(())
    }

    /// Stop accepting work, cancel running pipelines and wait for them
    ///
    /// Waits at most 30 seconds; pipelines still running after that are
    /// abandoned, which is safe because nothing is persisted mid-acquisition.
    pub async fn shutdown(&self) {
        tracing::info!(in_flight = self.tracker.len(), "Initiating dispatcher shutdown");
        self.tracker.close();
        self.cancel.cancel();

        if tokio::time::timeout(SHUTDOWN_TIMEOUT, self.tracker.wait())
            .await
            .is_err()
        {
            tracing::warn!("Timeout waiting for pipelines to stop, proceeding with shutdown");
        }

        self.pipeline.emit_event(Event::Shutdown);
        tracing::info!("Dispatcher shutdown complete");
    }
}

#[cfg(test)]
mod tests;
