//! Subprocess adapter for the external proxy engine.
use std::{path::PathBuf, process::Stdio, time::Duration};

use async_trait::async_trait;
use eyre::{Context, Result, eyre};
use tokio::process::{Child, Command};

use crate::ports::{ExitOutcome, ProxyHandle};

/// One supervised proxy-engine process, launched from a config file path.
///
/// The engine is opaque to us: we start it with its config path (plus an
/// optional debug flag), ask it to drain with a configurable signal, and wait
/// for it to exit with a bounded timeout that escalates to a kill.
pub struct EngineProcess {
    /// Human label for logs (master / slave / dispatcher).
    label: String,
    binary: String,
    config_path: PathBuf,
    debug: bool,
    graceful_signal: String,
    child: Option<Child>,
}

impl EngineProcess {
    pub fn new(
        label: impl Into<String>,
        binary: impl Into<String>,
        config_path: impl Into<PathBuf>,
        debug: bool,
        graceful_signal: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            binary: binary.into(),
            config_path: config_path.into(),
            debug,
            graceful_signal: graceful_signal.into(),
            child: None,
        }
    }

    #[cfg(unix)]
    fn send_graceful_signal(&self, pid: u32) -> Result<()> {
        use std::str::FromStr as _;

        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        let signal = Signal::from_str(&self.graceful_signal)
            .map_err(|_| eyre!("unknown graceful signal '{}'", self.graceful_signal))?;
        kill(Pid::from_raw(pid as i32), signal)
            .with_context(|| format!("failed to signal {} (pid {pid})", self.label))
    }
}

#[async_trait]
impl ProxyHandle for EngineProcess {
    async fn start(&mut self) -> Result<()> {
        let mut command = Command::new(&self.binary);
        command.arg(&self.config_path);
        if self.debug {
            command.arg("-d");
        }
        // Engines deliberately outlive a crashed or aborting supervisor:
        // they keep serving the last good configuration.
        command.stdin(Stdio::null()).kill_on_drop(false);

        let child = command.spawn().with_context(|| {
            format!(
                "failed to start {} engine: {} {}",
                self.label,
                self.binary,
                self.config_path.display()
            )
        })?;
        tracing::info!(
            instance = %self.label,
            pid = child.id(),
            config = %self.config_path.display(),
            "proxy engine started"
        );
        self.child = Some(child);
        Ok(())
    }

    fn request_graceful_stop(&mut self) -> Result<()> {
        let pid = self
            .pid()
            .ok_or_else(|| eyre!("{} is not running", self.label))?;
        tracing::info!(instance = %self.label, pid, signal = %self.graceful_signal, "draining");

        #[cfg(unix)]
        {
            self.send_graceful_signal(pid)
        }
        #[cfg(not(unix))]
        {
            // No per-signal control on this platform; fall back to a plain
            // kill request.
            self.child
                .as_mut()
                .ok_or_else(|| eyre!("{} is not running", self.label))?
                .start_kill()
                .with_context(|| format!("failed to stop {} (pid {pid})", self.label))
        }
    }

    async fn await_exit(&mut self, timeout: Duration) -> Result<ExitOutcome> {
        let child = self
            .child
            .as_mut()
            .ok_or_else(|| eyre!("{} is not running", self.label))?;

        match tokio::time::timeout(timeout, child.wait()).await {
            Ok(wait_result) => {
                let status =
                    wait_result.with_context(|| format!("failed to wait for {}", self.label))?;
                tracing::info!(instance = %self.label, %status, "proxy engine exited");
                self.child = None;
                Ok(ExitOutcome::Graceful)
            }
            Err(_) => {
                tracing::warn!(
                    instance = %self.label,
                    ?timeout,
                    "drain timeout exceeded, forcing termination"
                );
                child
                    .kill()
                    .await
                    .with_context(|| format!("failed to kill {}", self.label))?;
                self.child = None;
                Ok(ExitOutcome::Forced)
            }
        }
    }

    fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }
}
