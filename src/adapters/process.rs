//! External process execution with a wall-clock ceiling

use crate::{Error, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Run `binary args...` and wait at most `timeout`
///
/// The child is killed if the timeout fires or the calling future is
/// dropped, which is how pipeline cancellation reaches external tools.
/// A non-zero exit becomes [`Error::ExternalTool`] carrying stderr verbatim.
/// Returns captured stdout.
pub(crate) async fn run_tool(
    tool: &'static str,
    binary: &Path,
    args: &[OsString],
    timeout: Duration,
) -> Result<Vec<u8>> {
    tracing::debug!(tool, binary = %binary.display(), ?args, "Running external tool");

    let mut command = Command::new(binary);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = tokio::time::timeout(timeout, command.output())
        .await
        .map_err(|_| Error::Timeout {
            tool,
            after: timeout,
        })?
        .map_err(|e| Error::tool(tool, format!("failed to execute {}: {}", binary.display(), e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::tool(
            tool,
            format!("{}: {}", output.status, stderr.trim()),
        ));
    }

    Ok(output.stdout)
}

/// Resolve a tool binary: explicit path first, then PATH when allowed
pub(crate) fn resolve_binary(
    explicit: Option<&PathBuf>,
    name: &str,
    search_path: bool,
) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.clone()),
        None if search_path => which::which(name).ok(),
        None => None,
    }
}

/// A produced file, if it exists and is non-empty
///
/// Downloaders sometimes append an extension to the requested name, so
/// `<path>.mp3` is checked as well.
pub(crate) async fn existing_output(path: &Path) -> Option<PathBuf> {
    let mut with_ext = path.as_os_str().to_owned();
    with_ext.push(".mp3");

    for candidate in [path.to_path_buf(), PathBuf::from(with_ext)] {
        if let Ok(meta) = tokio::fs::metadata(&candidate).await
            && meta.is_file()
            && meta.len() > 0
        {
            return Some(candidate);
        }
    }
    None
}
