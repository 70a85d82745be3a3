//! vot-cli backed voice translation

use super::process::{existing_output, run_tool};
use super::traits::VoiceTranslator;
use crate::{Error, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

const TOOL: &str = "vot-cli";

/// Full-media voice translation via the `vot-cli` binary
pub struct VotCli {
    binary: PathBuf,
    timeout: Duration,
}

impl VotCli {
    /// Create with an explicit binary path
    pub fn new(binary: PathBuf, timeout: Duration) -> Self {
        Self { binary, timeout }
    }

    fn args(url: &str, target_lang: &str, dest: &Path) -> Vec<OsString> {
        let dir = dest.parent().unwrap_or(Path::new("."));
        let file = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        vec![
            "--output".into(),
            dir.as_os_str().to_owned(),
            "--output-file".into(),
            file,
            "--reslang".into(),
            target_lang.into(),
            url.into(),
        ]
    }
}

#[async_trait]
impl VoiceTranslator for VotCli {
    async fn translate_media(&self, url: &str, target_lang: &str, dest: &Path) -> Result<PathBuf> {
        tracing::info!(url, target_lang, "Requesting voice translation");
        run_tool(TOOL, &self.binary, &Self::args(url, target_lang, dest), self.timeout).await?;

        existing_output(dest)
            .await
            .ok_or_else(|| Error::tool(TOOL, "translated audio is missing or empty"))
    }

    fn name(&self) -> &'static str {
        TOOL
    }
}
