//! Running external conversion tools.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use super::error::ConverterError;

/// An external program a converter shells out to.
#[derive(Debug, Clone)]
pub(crate) struct ExternalTool {
    name: &'static str,
    path: PathBuf,
    hint: &'static str,
}

impl ExternalTool {
    pub(crate) fn new(name: &'static str, path: impl Into<PathBuf>, hint: &'static str) -> Self {
        Self {
            name,
            path: path.into(),
            hint,
        }
    }

    fn not_found(&self) -> ConverterError {
        ConverterError::ToolNotFound {
            tool: self.name.to_string(),
            hint: self.hint.to_string(),
        }
    }

    /// Resolves the tool on `PATH` (or checks an explicit path).
    pub(crate) fn locate(&self) -> Result<PathBuf, ConverterError> {
        which::which(&self.path).map_err(|_| self.not_found())
    }

    /// Runs the tool to completion and returns its stdout.
    ///
    /// A non-zero exit becomes `ConversionFailed` carrying stderr (or stdout
    /// when stderr is empty). The child is killed if the future is dropped.
    pub(crate) async fn run<I, S>(&self, args: I) -> Result<String, ConverterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let program = self.locate()?;
        let args: Vec<_> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
        debug!(tool = self.name, ?args, "running external tool");

        let output = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    self.not_found()
                } else {
                    ConverterError::Io(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let captured = if stderr.is_empty() {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            } else {
                stderr
            };
            return Err(ConverterError::conversion_failed(
                format!("{} exited with code: {:?}", self.name, output.status.code()),
                if captured.is_empty() {
                    None
                } else {
                    Some(captured)
                },
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Fails with `InputNotFound` unless `path` exists.
pub(crate) async fn ensure_input(path: &Path) -> Result<(), ConverterError> {
    match tokio::fs::metadata(path).await {
        Ok(_) => Ok(()),
        Err(_) => Err(ConverterError::InputNotFound {
            path: path.to_path_buf(),
        }),
    }
}

/// Fails unless a tool actually produced `path`.
pub(crate) async fn ensure_output(path: &Path) -> Result<(), ConverterError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(()),
        _ => Err(ConverterError::conversion_failed(
            format!("output file not created: {}", path.display()),
            None,
        )),
    }
}
