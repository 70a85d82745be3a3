//! ffprobe backed duration probing

use super::process::run_tool;
use super::traits::DurationProbe;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Reads container duration with `ffprobe`
pub struct FfProbe {
    binary: PathBuf,
    timeout: Duration,
}

impl FfProbe {
    /// Create with an explicit binary path
    pub fn new(binary: PathBuf, timeout: Duration) -> Self {
        Self { binary, timeout }
    }
}

/// Parse ffprobe's bare `format=duration` output into whole seconds
fn parse_duration(stdout: &str) -> Option<u64> {
    let secs: f64 = stdout.trim().parse().ok()?;
    (secs.is_finite() && secs >= 0.0).then(|| secs.round() as u64)
}

#[async_trait]
impl DurationProbe for FfProbe {
    async fn probe(&self, path: &Path) -> u64 {
        let args: Vec<OsString> = vec![
            "-v".into(),
            "error".into(),
            "-show_entries".into(),
            "format=duration".into(),
            "-of".into(),
            "default=noprint_wrappers=1:nokey=1".into(),
            path.as_os_str().to_owned(),
        ];

        match run_tool("ffprobe", &self.binary, &args, self.timeout).await {
            Ok(stdout) => parse_duration(&String::from_utf8_lossy(&stdout)).unwrap_or_else(|| {
                tracing::debug!(path = %path.display(), "ffprobe returned no duration");
                0
            }),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Duration probe failed");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("212.400000\n"), Some(212));
        assert_eq!(parse_duration("0.6"), Some(1));
        assert_eq!(parse_duration("N/A"), None);
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("-3"), None);
    }

    #[tokio::test]
    async fn test_missing_binary_probes_zero() {
        let probe = FfProbe::new(PathBuf::from("/nonexistent/ffprobe"), Duration::from_secs(1));
        assert_eq!(probe.probe(Path::new("/tmp/none.mp3")).await, 0);
    }
}
