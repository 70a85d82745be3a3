//! Top-level assembly: store, adapters, pipeline and command surface

use crate::adapters::Adapters;
use crate::dispatcher::Dispatcher;
use crate::pipeline::Pipeline;
use crate::transport::{InboundMessage, TelegramTransport, Transport};
use crate::types::Event;
use crate::{Config, Database, Error, Result};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

/// Capacity of the inbound message queue between transport and dispatcher
const INBOUND_QUEUE: usize = 64;

/// A running feed: the store plus everything needed to fill it
pub struct AudioFeed {
    db: Arc<Database>,
    pipeline: Pipeline,
    config: Arc<Config>,
}

impl AudioFeed {
    /// Validate configuration, open the store and pick adapters
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.feed.files_location)
            .await
            .map_err(|e| crate::error::io_at(&config.feed.files_location, e))?;

        let db = Arc::new(Database::new(&config.persistence.database_path).await?);
        let adapters = Adapters::from_config(&config)?;
        Ok(Self::with_parts(db, adapters, config))
    }

    /// Assemble from already-built parts
    pub fn with_parts(db: Arc<Database>, adapters: Adapters, config: Config) -> Self {
        let config = Arc::new(config);
        // buffer so slow subscribers see every stage change of a burst
        let (event_tx, _rx) = broadcast::channel(1000);
        let pipeline = Pipeline::new(db.clone(), adapters, config.clone(), event_tx);

        tracing::info!(
            feed = %config.feed.feed_name,
            max_items = config.feed.max_items,
            files = %config.feed.files_location.display(),
            "Audio feed ready"
        );
        Self {
            db,
            pipeline,
            config,
        }
    }

    /// The shared store
    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    /// Release everything but the store
    pub fn into_db(self) -> Arc<Database> {
        self.db
    }

    /// The pipeline runner, for submitting work without a transport
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Subscribe to ingestion events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.pipeline.subscribe()
    }

    /// Accept commands from `inbound` until it closes or `shutdown` fires,
    /// then stop running pipelines
    pub async fn serve(
        &self,
        transport: Arc<dyn Transport>,
        inbound: mpsc::Receiver<InboundMessage>,
        shutdown: &CancellationToken,
    ) {
        let dispatcher = Dispatcher::new(self.pipeline.clone(), transport, shutdown);
        dispatcher.run(inbound).await;
        dispatcher.shutdown().await;
    }

    /// Serve the configured Telegram bot until `shutdown` fires
    pub async fn serve_telegram(&self, shutdown: &CancellationToken) -> Result<()> {
        let telegram = self
            .config
            .telegram
            .as_ref()
            .ok_or_else(|| Error::config("telegram", "no transport configured"))?;
        let transport = Arc::new(TelegramTransport::new(telegram)?);

        let (tx, rx) = mpsc::channel(INBOUND_QUEUE);
        let poller = {
            let transport = transport.clone();
            let cancel = shutdown.clone();
            tokio::spawn(async move { transport.poll_updates(tx, cancel).await })
        };

        tracing::info!(
            principal = self.config.dispatcher.allowed_principal,
            feed = %self.config.feed.feed_name,
            "Starting bot"
        );
        self.serve(transport, rx, shutdown).await;

        shutdown.cancel();
        if let Err(e) = poller.await {
            tracing::warn!(error = %e, "Update poller ended abnormally");
        }
        Ok(())
    }
}
