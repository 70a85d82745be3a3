//! Per-resource ingestion pipeline
//!
//! Every submission runs the same state machine:
//!
//! ```text
//! Pending → ResolvingId → DedupCheck → Acquiring → Persisting
//!         → MarkingProcessed → Evicting → Reporting
//! ```
//!
//! Only the acquisition step differs between resource kinds ([`video`],
//! [`article`], [`voiceover`]). Steps run strictly in order. Nothing is
//! persisted until acquisition has fully succeeded, so a cancelled or failed
//! run leaves the store untouched.
//!
//! The processed-marker check before acquisition is a cheap guard only; two
//! concurrent runs for the same resource may both acquire. Each run acquires
//! into its own staging directory under the files directory. The atomic
//! [`Database::save`] decides which one lands: only the winner renames its
//! file to the final path, and the other reports [`Outcome::AlreadyExists`]
//! and drops its staging directory.

mod article;
pub(crate) mod eviction;
mod video;
mod voiceover;

pub use eviction::delete_files;
pub use voiceover::{plan_methods, select_method};

use crate::adapters::Adapters;
use crate::classify::{article_id, extract_video_id, normalize_article_url};
use crate::config::Config;
use crate::db::Database;
use crate::types::{Entry, Event, Outcome, ResourceId, ResourceKind, Stage, VoiceoverMethod};
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// A submission accepted by the dispatcher
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    /// Which pipeline variant to run
    pub kind: ResourceKind,
    /// The submitted URL
    pub url: String,
}

impl Request {
    /// Shorthand constructor
    pub fn new(kind: ResourceKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
        }
    }
}

/// Receiver of human-readable progress while a pipeline runs
///
/// The dispatcher implements this by editing the submission's status message.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// The pipeline entered `stage`
    async fn stage(&self, _stage: Stage) {}

    /// A free-form note emitted during acquisition
    async fn note(&self, text: &str);
}

/// Progress sink that drops everything
pub struct NoProgress;

#[async_trait]
impl ProgressSink for NoProgress {
    async fn note(&self, _text: &str) {}
}

/// Prefix of the per-run staging directories inside the files directory
const STAGING_PREFIX: &str = ".staging-";

/// What an acquisition step produced
///
/// `entry.file_path` points at the file inside the run's staging directory
/// until the entry is published.
pub(crate) struct Acquired {
    pub(crate) entry: Entry,
    pub(crate) method: Option<VoiceoverMethod>,
}

/// Shared state for running pipelines
///
/// Cheap to clone; every field is shared.
#[derive(Clone)]
pub struct Pipeline {
    pub(crate) db: Arc<Database>,
    pub(crate) adapters: Adapters,
    pub(crate) config: Arc<Config>,
    pub(crate) event_tx: broadcast::Sender<Event>,
}

impl Pipeline {
    /// Create a pipeline runner over shared dependencies
    pub fn new(
        db: Arc<Database>,
        adapters: Adapters,
        config: Arc<Config>,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            db,
            adapters,
            config,
            event_tx,
        }
    }

    /// Subscribe to pipeline events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    pub(crate) fn emit_event(&self, event: Event) {
        // no subscribers is fine
        self.event_tx.send(event).ok();
    }

    fn feed(&self) -> &str {
        &self.config.feed.feed_name
    }

    /// Directory holding the feed's audio files
    pub(crate) fn files_dir(&self) -> &std::path::Path {
        &self.config.feed.files_location
    }

    /// Audio file path for a resource
    pub(crate) fn audio_path(&self, id: &ResourceId) -> PathBuf {
        self.files_dir().join(id.file_name(self.feed()))
    }

    /// Derive the namespaced resource id for a request
    pub fn resolve_id(request: &Request) -> Result<ResourceId> {
        match request.kind {
            ResourceKind::Video | ResourceKind::Voiceover => extract_video_id(&request.url)
                .map(|raw| ResourceId::new(request.kind, &raw))
                .ok_or_else(|| {
                    Error::InvalidInput(format!("no video id in {}", request.url))
                }),
            ResourceKind::Article => {
                let normalized = normalize_article_url(&request.url);
                if normalized.is_empty() {
                    return Err(Error::InvalidInput("empty article URL".into()));
                }
                Ok(ResourceId::new(
                    ResourceKind::Article,
                    &article_id(&normalized),
                ))
            }
        }
    }

    /// Run one submission to a terminal state
    ///
    /// Failures are returned after an [`Event::Failed`] is emitted; the
    /// caller reports them verbatim. Cancelling `cancel` aborts in-flight
    /// external tools and returns [`Error::Cancelled`] without touching the
    /// store.
    pub async fn run(
        &self,
        request: &Request,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<Outcome> {
        let mut resolved = None;
        let result = self
            .run_stages(request, progress, cancel, &mut resolved)
            .await;

        progress.stage(Stage::Reporting).await;
        match &result {
            Ok(Outcome::Added { title, .. } | Outcome::Evicted { title }) => {
                if let Some(id) = resolved {
                    self.emit_event(Event::Added {
                        feed: self.feed().to_string(),
                        resource_id: id,
                        title: title.clone(),
                    });
                }
            }
            Ok(Outcome::AlreadyExists { .. }) => {
                if let Some(id) = resolved {
                    self.emit_event(Event::AlreadyExists {
                        feed: self.feed().to_string(),
                        resource_id: id,
                    });
                }
            }
            Err(e) => {
                tracing::warn!(
                    url = %request.url,
                    kind = ?request.kind,
                    resource_id = ?resolved.as_ref().map(ResourceId::as_str),
                    error = %e,
                    "Pipeline failed"
                );
                self.emit_event(Event::Failed {
                    resource_id: resolved,
                    code: e.error_code().to_string(),
                    error: e.to_string(),
                });
            }
        }
        result
    }

    async fn run_stages(
        &self,
        request: &Request,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
        resolved: &mut Option<ResourceId>,
    ) -> Result<Outcome> {
        let feed = self.feed().to_string();

        self.enter(progress, None, Stage::ResolvingId).await;
        let id = Self::resolve_id(request)?;
        *resolved = Some(id.clone());
        tracing::debug!(feed = %feed, resource_id = %id, url = %request.url, "Resolved resource");

        self.enter(progress, Some(&id), Stage::DedupCheck).await;
        if self.db.processed_at(&feed, &id).await?.is_some() {
            let title = self.db.get(&feed, &id).await?.map(|e| e.title);
            tracing::info!(feed = %feed, resource_id = %id, "Already processed, skipping");
            return Ok(Outcome::AlreadyExists { title });
        }

        self.enter(progress, Some(&id), Stage::Acquiring).await;
        let (acquired, staging) = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(resource_id = %id, "Acquisition cancelled");
                return Err(Error::Cancelled);
            }
            result = self.acquire(request, &id, progress) => result?,
        };
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        self.enter(progress, Some(&id), Stage::Persisting).await;
        let mut entry = acquired.entry;
        let produced = PathBuf::from(&entry.file_path);
        let final_path = self.audio_path(&id);
        entry.file_path = final_path.to_string_lossy().into_owned();

        if !self.db.save(&entry).await? {
            tracing::info!(
                feed = %feed,
                resource_id = %id,
                staged = %produced.display(),
                "Lost save race, discarding staged audio"
            );
            discard_staging(staging);
            return Ok(Outcome::AlreadyExists {
                title: Some(entry.title),
            });
        }
        self.publish(&entry, &produced, &final_path).await?;
        discard_staging(staging);

        self.enter(progress, Some(&id), Stage::MarkingProcessed).await;
        if let Err(e) = self.db.set_processed(&entry).await {
            tracing::warn!(feed = %feed, resource_id = %id, error = %e, "Failed to mark as processed");
        }

        self.enter(progress, Some(&id), Stage::Evicting).await;
        let evicted = self.evict().await;
        if evicted.contains(&entry.file_path) {
            tracing::info!(
                feed = %feed,
                resource_id = %id,
                published = %entry.published,
                "New entry is older than the retention window, evicted immediately"
            );
            return Ok(Outcome::Evicted { title: entry.title });
        }

        tracing::info!(
            feed = %feed,
            resource_id = %id,
            title = %entry.title,
            duration_secs = entry.duration_secs,
            method = ?acquired.method,
            "Added entry"
        );
        Ok(Outcome::Added {
            title: entry.title,
            duration_secs: entry.duration_secs,
            method: acquired.method,
        })
    }

    /// Move a saved entry's staged audio to its final path
    ///
    /// When the move fails the entry is removed again, so the store never
    /// references a file that is not there.
    async fn publish(&self, entry: &Entry, staged: &Path, final_path: &Path) -> Result<()> {
        let Err(e) = tokio::fs::rename(staged, final_path).await else {
            return Ok(());
        };

        tracing::error!(
            resource_id = %entry.resource_id,
            staged = %staged.display(),
            file = %final_path.display(),
            error = %e,
            "Failed to publish audio, withdrawing entry"
        );
        if let Err(remove_err) = self.db.remove(entry).await {
            tracing::error!(resource_id = %entry.resource_id, error = %remove_err, "Failed to withdraw entry");
        }
        Err(crate::error::io_at(final_path, e))
    }

    async fn enter(&self, progress: &dyn ProgressSink, id: Option<&ResourceId>, stage: Stage) {
        if let Some(id) = id {
            self.emit_event(Event::StageChanged {
                resource_id: id.clone(),
                stage,
            });
        }
        progress.stage(stage).await;
    }

    async fn acquire(
        &self,
        request: &Request,
        id: &ResourceId,
        progress: &dyn ProgressSink,
    ) -> Result<(Acquired, tempfile::TempDir)> {
        let files_dir = self.files_dir();
        tokio::fs::create_dir_all(files_dir)
            .await
            .map_err(|e| crate::error::io_at(files_dir, e))?;

        // removed on drop, so failed and cancelled runs leave nothing behind
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(files_dir)
            .map_err(|e| crate::error::io_at(files_dir, e))?;
        let dest = staging.path().join(id.file_name(self.feed()));

        let acquired = match request.kind {
            ResourceKind::Video => video::acquire(self, id, &dest, progress).await,
            ResourceKind::Article => {
                article::acquire(self, &request.url, id, &dest, progress).await
            }
            ResourceKind::Voiceover => {
                voiceover::acquire(self, &request.url, id, &dest, progress).await
            }
        }?;
        Ok((acquired, staging))
    }

    /// Enforce the retention bound and return the evicted file paths
    ///
    /// Failures are logged and yield an empty list. `max_items == 0`
    /// disables eviction.
    pub(crate) async fn evict(&self) -> Vec<String> {
        let max_items = self.config.feed.max_items;
        if max_items == 0 {
            return Vec::new();
        }

        match self.db.remove_old(self.feed(), max_items).await {
            Ok(paths) => {
                if !paths.is_empty() {
                    self.emit_event(Event::Evicted {
                        feed: self.feed().to_string(),
                        count: paths.len(),
                    });
                    delete_files(&paths).await;
                }
                paths
            }
            Err(e) => {
                tracing::warn!(feed = %self.feed(), error = %e, "Failed to remove old entries");
                Vec::new()
            }
        }
    }
}

fn discard_staging(staging: tempfile::TempDir) {
    let path = staging.path().to_path_buf();
    if let Err(e) = staging.close() {
        tracing::warn!(path = %path.display(), error = %e, "Failed to remove staging directory");
    }
}
