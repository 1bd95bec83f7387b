//! Out-of-process invocation of the `abrg` resolution engine.
//!
//! The engine is spawned directly (never through a shell) as
//! `<program> - -d <data_dir>` and receives the address on stdin, one query
//! per line. Every run is bounded by a wall-clock deadline that also covers
//! the wait for an admission slot, and the child is always reaped: on normal
//! exit, after a kill on timeout, or through `kill_on_drop` when the calling
//! future is cancelled.
//!
//! On unix the engine leads its own process group. Whatever it forked is
//! killed with it: once the engine exits (so stray helpers cannot hold its
//! pipes open), on timeout, and on cancellation.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use geocoder_core::{AppConfig, GeocodeQuery};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::time::Instant;

use crate::error::EngineError;

/// Turns a validated query into the engine's raw stdout.
///
/// The HTTP layer depends on this trait rather than on [`AbrgInvoker`] so it
/// can be exercised without a real engine.
#[async_trait]
pub trait Resolve: Send + Sync {
    /// # Errors
    ///
    /// Returns [`EngineError`] on timeout, spawn failure, non-zero exit, or
    /// output that is not UTF-8.
    async fn resolve(&self, query: &GeocodeQuery) -> Result<String, EngineError>;
}

/// How to launch the engine and how much it may consume.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub program: PathBuf,
    pub data_dir: PathBuf,
    pub timeout: Duration,
    pub max_concurrent: usize,
}

impl EngineSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            program: config.abrg_bin.clone(),
            data_dir: config.abrg_data_dir.clone(),
            timeout: config.engine_timeout(),
            max_concurrent: config.max_concurrent_engines,
        }
    }
}

/// Spawns one engine process per query, at most `max_concurrent` at a time.
#[derive(Debug, Clone)]
pub struct AbrgInvoker {
    settings: EngineSettings,
    permits: Arc<Semaphore>,
}

struct EngineRun {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl AbrgInvoker {
    #[must_use]
    pub fn new(settings: EngineSettings) -> Self {
        let permits = Arc::new(Semaphore::new(settings.max_concurrent.max(1)));
        Self { settings, permits }
    }

    /// Admission slots not currently held by a running engine.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.settings.program);
        cmd.arg("-")
            .arg("-d")
            .arg(&self.settings.data_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }

    fn timed_out(&self) -> EngineError {
        EngineError::Timeout {
            timeout: self.settings.timeout,
        }
    }

    async fn run(&self, address: &str, deadline: Instant) -> Result<EngineRun, EngineError> {
        let program = self.settings.program.display().to_string();
        let mut child = self.command().spawn().map_err(|source| EngineError::Spawn {
            program: program.clone(),
            source,
        })?;
        tracing::debug!(program = %program, pid = ?child.id(), "spawned resolution engine");
        let mut group = ProcessGroup(child.id());

        let stdin = child.stdin.take();
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("engine stdout was not captured"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("engine stderr was not captured"))?;
        let line = format!("{address}\n");

        let exchange = async {
            if let Some(mut stdin) = stdin {
                // An engine that exits without reading is judged by its exit status.
                match stdin.write_all(line.as_bytes()).await {
                    Err(err) if err.kind() != std::io::ErrorKind::BrokenPipe => return Err(err),
                    _ => {}
                }
            }

            let mut out = Vec::new();
            let mut err = Vec::new();
            let wait = async {
                let status = child.wait().await?;
                group.kill();
                Ok::<_, std::io::Error>(status)
            };
            let (status, _, _) = tokio::try_join!(
                wait,
                stdout.read_to_end(&mut out),
                stderr.read_to_end(&mut err),
            )?;
            Ok::<_, std::io::Error>(EngineRun {
                status,
                stdout: out,
                stderr: err,
            })
        };

        let outcome = tokio::time::timeout_at(deadline, exchange).await;
        match outcome {
            Ok(result) => result.map_err(EngineError::from),
            Err(_) => {
                group.kill();
                if let Err(err) = child.kill().await {
                    tracing::error!(error = %err, program = %program, "failed to kill timed-out resolution engine");
                }
                Err(self.timed_out())
            }
        }
    }
}

#[async_trait]
impl Resolve for AbrgInvoker {
    async fn resolve(&self, query: &GeocodeQuery) -> Result<String, EngineError> {
        let started = Instant::now();
        let deadline = started + self.settings.timeout;

        let Ok(permit) = tokio::time::timeout_at(deadline, self.permits.acquire()).await else {
            tracing::warn!(
                timeout_ms = millis(self.settings.timeout),
                "no resolution engine slot freed up before the deadline"
            );
            return Err(self.timed_out());
        };
        let _permit = permit.map_err(|_| std::io::Error::other("admission semaphore closed"))?;

        let run = match self.run(query.as_str(), deadline).await {
            Ok(run) => run,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    elapsed_ms = millis(started.elapsed()),
                    "resolution engine run failed"
                );
                return Err(err);
            }
        };

        let elapsed_ms = millis(started.elapsed());
        if !run.status.success() {
            let stderr = String::from_utf8_lossy(&run.stderr).trim().to_string();
            tracing::warn!(
                status = %run.status,
                stderr = %stderr,
                elapsed_ms,
                "resolution engine exited unsuccessfully"
            );
            return Err(EngineError::Failed {
                status: run.status.to_string(),
                stderr,
            });
        }

        if !run.stderr.is_empty() {
            tracing::debug!(
                stderr = %String::from_utf8_lossy(&run.stderr).trim(),
                "resolution engine wrote to stderr"
            );
        }
        tracing::info!(
            elapsed_ms,
            stdout_bytes = run.stdout.len(),
            "resolution engine finished"
        );

        String::from_utf8(run.stdout).map_err(|e| EngineError::Malformed {
            reason: format!("stdout is not valid UTF-8: {e}"),
        })
    }
}

/// The engine's process group, killed at most once.
struct ProcessGroup(Option<u32>);

impl ProcessGroup {
    fn kill(&mut self) {
        let Some(pgid) = self.0.take() else {
            return;
        };
        #[cfg(unix)]
        {
            use nix::errno::Errno;
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            let Ok(raw) = i32::try_from(pgid) else {
                return;
            };
            match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(err) => {
                    tracing::warn!(pgid, error = %err, "failed to kill resolution engine process group");
                }
            }
        }
        #[cfg(not(unix))]
        let _ = pgid;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
