//! # audiofeed
//!
//! Ingestion orchestrator that turns submitted video and article links into
//! a size-bounded audio feed.
//!
//! A single authorized principal sends links through a chat transport. Each
//! submission runs a pipeline that resolves a namespaced resource id, skips
//! resources already ingested, acquires audio (original track, synthesized
//! speech for articles, or a translated voiceover), persists an entry and
//! evicts the oldest entries beyond the retention bound.
//!
//! ## Quick Start
//!
//! ```no_run
//! use audiofeed::{AudioFeed, Config};
//! use audiofeed::pipeline::{NoProgress, Request};
//! use audiofeed::types::ResourceKind;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.dispatcher.allowed_principal = 12345;
//!
//!     let feed = AudioFeed::new(config).await?;
//!
//!     let mut events = feed.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let request = Request::new(ResourceKind::Video, "https://youtu.be/dQw4w9WgXcQ");
//!     let outcome = feed
//!         .pipeline()
//!         .run(&request, &NoProgress, &CancellationToken::new())
//!         .await?;
//!     println!("{outcome:?}");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// External collaborators (media host, voice translation, TTS, articles, translation)
pub mod adapters;
/// Input and tool-failure classifiers
pub mod classify;
/// Configuration types
pub mod config;
/// Entry store
pub mod db;
/// Principal command handling
pub mod dispatcher;
/// Error types
pub mod error;
/// Ordered-fallback execution
pub mod fallback;
/// Per-resource ingestion pipeline
pub mod pipeline;
/// Top-level assembly
pub mod service;
/// Chat transport
pub mod transport;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use db::Database;
pub use dispatcher::{Command, Dispatcher};
pub use error::{ArticleError, DatabaseError, Error, ErrorClass, Result};
pub use pipeline::{Pipeline, ProgressSink, Request};
pub use service::AudioFeed;
pub use transport::{InboundMessage, MessageRef, TelegramTransport, Transport};
pub use types::{
    Entry, Event, Metadata, Outcome, ResourceId, ResourceKind, Stage, VoiceoverMethod,
};

/// Run the configured bot until a termination signal arrives.
///
/// On the signal, intake stops, running pipelines are cancelled (nothing
/// half-acquired is persisted) and the store is closed.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use audiofeed::{AudioFeed, Config, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::from_json_file(std::path::Path::new("audiofeed.json"))?;
///     let feed = AudioFeed::new(config).await?;
///
///     run_with_shutdown(feed).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(feed: AudioFeed) -> Result<()> {
    let shutdown = tokio_util::sync::CancellationToken::new();
    let signal_listener = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            wait_for_signal().await;
            shutdown.cancel();
        })
    };

    let served = feed.serve_telegram(&shutdown).await;
    signal_listener.abort();

    if let Ok(db) = std::sync::Arc::try_unwrap(feed.into_db()) {
        db.close().await;
    }
    tracing::info!("Shutdown complete");
    served
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // registration can fail in restricted environments; fall back to ctrl_c
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            let name = tokio::select! {
                _ = sigterm.recv() => "SIGTERM",
                _ = sigint.recv() => "SIGINT",
            };
            tracing::info!(signal = name, "Received termination signal");
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register signal handlers, waiting for Ctrl+C");
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!(signal = "ctrl_c", "Received termination signal"),
                Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C"),
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!(signal = "ctrl_c", "Received termination signal"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C"),
    }
}
