//! Runtime driven through a Docker-compatible command line.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use mar_common::{MarError, MarResult};
use tokio::process::Command;

use super::{ContainerRuntime, OutputMode, RunSpec};
use crate::reference::ImageReference;

/// Docker-compatible CLI runtime (`docker`, `podman`, ...).
#[derive(Debug, Clone)]
pub struct CliRuntime {
    program: String,
}

impl CliRuntime {
    /// Drive the given runtime binary.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        cmd
    }

    fn spawn_error(&self, source: std::io::Error) -> MarError {
        MarError::Spawn {
            program: self.program.clone(),
            source,
        }
    }

    /// Force-remove a named container, ignoring failures.
    async fn remove(&self, name: &str) {
        tracing::debug!(name, "Removing container");
        let status = self
            .command(["rm", "-f", name])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        if let Err(e) = status {
            tracing::warn!(name, error = %e, "Failed to remove container");
        }
    }
}

#[async_trait]
impl ContainerRuntime for CliRuntime {
    fn program(&self) -> &str {
        &self.program
    }

    fn is_installed(&self) -> bool {
        resolve_program(&self.program).is_some()
    }

    async fn image_exists(&self, image: &ImageReference) -> MarResult<bool> {
        let status = self
            .command(["image", "inspect", image.as_str()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| self.spawn_error(e))?;

        Ok(status.success())
    }

    async fn pull(&self, image: &ImageReference, output: OutputMode) -> MarResult<i32> {
        tracing::debug!(program = %self.program, image = %image, "Pulling image");

        let status = self
            .command(["pull", image.as_str()])
            .stdin(Stdio::null())
            .stdout(stdio_for(output))
            .stderr(stdio_for(output))
            .status()
            .await
            .map_err(|e| self.spawn_error(e))?;

        Ok(exit_code(status))
    }

    async fn run(&self, spec: &RunSpec) -> MarResult<i32> {
        let args = spec.to_args();
        tracing::debug!(program = %self.program, args = ?args, "Invoking container runtime");

        let stdin = if spec.interactive {
            Stdio::inherit()
        } else {
            Stdio::null()
        };

        let mut child = self
            .command(&args)
            .stdin(stdin)
            .stdout(stdio_for(spec.output))
            .stderr(stdio_for(spec.output))
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let status = match spec.timeout {
            None => child.wait().await.map_err(|e| self.spawn_error(e))?,
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status.map_err(|e| self.spawn_error(e))?,
                Err(_) => {
                    tracing::warn!(
                        name = %spec.name,
                        seconds = limit.as_secs(),
                        "Container run timed out"
                    );
                    if let Err(e) = child.kill().await {
                        tracing::warn!(error = %e, "Failed to kill runtime client");
                    }
                    self.remove(&spec.name).await;
                    return Err(MarError::Timeout {
                        image: spec.image.to_string(),
                        seconds: limit.as_secs(),
                    });
                }
            },
        };

        let code = exit_code(status);
        tracing::debug!(name = %spec.name, code, "Container exited");
        Ok(code)
    }
}

fn stdio_for(output: OutputMode) -> Stdio {
    match output {
        OutputMode::Inherit => Stdio::inherit(),
        OutputMode::Discard => Stdio::null(),
    }
}

/// Exit code of a finished process; signal deaths map to `128 + signal`.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    -1
}

/// Resolve a runtime binary the way a shell would.
///
/// Names containing a path separator are checked directly; bare names are
/// searched for on `PATH`.
#[must_use]
pub fn resolve_program(program: &str) -> Option<PathBuf> {
    if program.is_empty() {
        return None;
    }

    let direct = Path::new(program);
    if direct.components().count() > 1 {
        return is_executable(direct).then(|| direct.to_path_buf());
    }

    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path).find_map(|dir| {
        let candidate = dir.join(program);
        if is_executable(&candidate) {
            return Some(candidate);
        }
        if cfg!(windows) {
            let exe = candidate.with_extension("exe");
            if is_executable(&exe) {
                return Some(exe);
            }
        }
        None
    })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
