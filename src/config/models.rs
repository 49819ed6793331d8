//! Configuration data structures for bascule.
//!
//! These types map directly to the application settings file (TOML / YAML /
//! JSON). They are intentionally serde-friendly and include defaults so that a
//! minimal settings file remains concise. The per-service routing definitions
//! are a separate document format, see [`crate::adapters::definitions`].
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

fn default_definitions_dir() -> PathBuf {
    PathBuf::from("services")
}

fn default_hosts_file() -> PathBuf {
    PathBuf::from("/etc/hosts")
}

/// Filesystem inputs and outputs of the conductor.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory of per-service routing definition documents.
    pub definitions_dir: PathBuf,
    /// Host-table file backing the reachability probe.
    pub hosts_file: PathBuf,
    /// Where the compiled master instance config is written.
    pub master_config: PathBuf,
    /// Where the compiled slave instance config is written.
    pub slave_config: PathBuf,
    /// Where the dispatcher config is written (startup only).
    pub dispatcher_config: PathBuf,
    /// Optional header template prepended verbatim to instance configs.
    pub instance_header: Option<PathBuf>,
    /// Optional header template prepended verbatim to the dispatcher config.
    pub dispatcher_header: Option<PathBuf>,
    /// Certificate artifact; its presence toggles the secure listener.
    pub certificate: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            definitions_dir: default_definitions_dir(),
            hosts_file: default_hosts_file(),
            master_config: PathBuf::from("generated/master.cfg"),
            slave_config: PathBuf::from("generated/slave.cfg"),
            dispatcher_config: PathBuf::from("generated/dispatcher.cfg"),
            instance_header: None,
            dispatcher_header: None,
            certificate: PathBuf::from("/etc/ssl/private/dispatcher.pem"),
        }
    }
}

/// Listen ports for the three proxy instances.
///
/// Master and slave are identical except for the port; the dispatcher owns the
/// public ports and fronts both.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct PortsConfig {
    pub master: u16,
    pub slave: u16,
    pub public_http: u16,
    pub public_https: u16,
}

impl Default for PortsConfig {
    fn default() -> Self {
        Self {
            master: 8181,
            slave: 8282,
            public_http: 80,
            public_https: 443,
        }
    }
}

fn default_engine_binary() -> String {
    "haproxy".to_string()
}

fn default_graceful_signal() -> String {
    "SIGUSR1".to_string()
}

/// How the external proxy engine is invoked and stopped.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct EngineConfig {
    /// Path or name of the proxy engine executable.
    pub binary: String,
    /// Pass the engine's debug flag on startup.
    pub debug: bool,
    /// Signal meaning "drain in-flight connections then exit".
    pub graceful_signal: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: default_engine_binary(),
            debug: false,
            graceful_signal: default_graceful_signal(),
        }
    }
}

/// Timing knobs for the orchestrator.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct TimingConfig {
    /// Delay after launching master and slave before the dispatcher starts
    /// health-checking them.
    pub settle_secs: u64,
    /// Bounded wait for a drained process to exit before forced termination.
    pub drain_timeout_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            settle_secs: 2,
            drain_timeout_secs: 30,
        }
    }
}

/// A request class exempted from the force-https redirect.
///
/// `MissingHost` is a sentinel for "the request carries no host header at
/// all"; it is a distinct variant so it can never be mistaken for a literal
/// domain name when the guard expression is composed. In YAML it is spelled
/// as `null` in the exemption list.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum RedirectExemption {
    Domain(String),
    MissingHost,
}

/// Top-level application settings.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub ports: PortsConfig,
    pub engine: EngineConfig,
    pub timing: TimingConfig,
    /// Emit a scheme redirect on the dispatcher when a certificate exists.
    pub force_https: bool,
    /// Domains (or the missing-host sentinel) excluded from the redirect.
    pub https_exempt: Vec<RedirectExemption>,
}
