use std::time::Duration;

use async_trait::async_trait;
use eyre::Result;

/// How a supervised process left the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Exited on its own after the graceful-stop request.
    Graceful,
    /// Ignored the drain signal and had to be killed after the timeout.
    Forced,
}

/// Handle over one external proxy-engine process.
///
/// This is the single place in the crate that touches OS processes. The
/// bounded `await_exit` deliberately deviates from the behavior this design
/// was derived from, which blocked forever on a signal-ignoring subprocess;
/// here the wait escalates to forced termination once `timeout` elapses.
#[async_trait]
pub trait ProxyHandle: Send {
    /// Launch the process from its config file. Replaces any identity
    /// recorded from a previous launch.
    async fn start(&mut self) -> Result<()>;

    /// Ask the process to stop accepting new connections and exit once
    /// in-flight work finishes.
    fn request_graceful_stop(&mut self) -> Result<()>;

    /// Wait for the process to exit, killing it if `timeout` elapses first.
    async fn await_exit(&mut self, timeout: Duration) -> Result<ExitOutcome>;

    /// OS process identity of the current launch, if any.
    fn pid(&self) -> Option<u32>;
}
