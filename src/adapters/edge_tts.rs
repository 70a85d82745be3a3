//! edge-tts CLI speech synthesis

use super::process::run_tool;
use super::traits::SpeechSynthesizer;
use crate::{Error, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const TOOL: &str = "edge-tts";

static SCRATCH_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Speech synthesis through the `edge-tts` command line client
pub struct EdgeTts {
    binary: PathBuf,
    voice: String,
    scratch_dir: PathBuf,
    chunk_delay: Duration,
    timeout: Duration,
}

impl EdgeTts {
    /// Create a synthesizer writing intermediate audio under `scratch_dir`
    pub fn new(
        binary: PathBuf,
        voice: impl Into<String>,
        scratch_dir: PathBuf,
        chunk_delay: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            binary,
            voice: voice.into(),
            scratch_dir,
            chunk_delay,
            timeout,
        }
    }

    /// Unique scratch path for one synthesis request
    fn scratch_path(&self) -> PathBuf {
        let n = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.scratch_dir
            .join(format!("tts_{}_{}.mp3", std::process::id(), n))
    }
}

#[async_trait]
impl SpeechSynthesizer for EdgeTts {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        if text.trim().is_empty() {
            return Err(Error::Synthesis("nothing to synthesize".into()));
        }

        let out = self.scratch_path();
        let args: Vec<OsString> = vec![
            "--voice".into(),
            self.voice.clone().into(),
            "--text".into(),
            text.into(),
            "--write-media".into(),
            out.as_os_str().to_owned(),
        ];

        let result = run_tool(TOOL, &self.binary, &args, self.timeout).await;
        let audio = match result {
            Ok(_) => tokio::fs::read(&out)
                .await
                .map_err(|e| Error::Synthesis(format!("reading {}: {}", out.display(), e))),
            Err(e) => Err(e),
        };

        if let Err(e) = tokio::fs::remove_file(&out).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %out.display(), error = %e, "Failed to remove scratch audio");
        }

        let audio = audio?;
        if audio.is_empty() {
            return Err(Error::Synthesis("synthesizer returned no audio".into()));
        }
        Ok(audio)
    }

    fn chunk_delay(&self) -> Duration {
        self.chunk_delay
    }

    fn name(&self) -> &'static str {
        TOOL
    }
}
