//! Reload orchestrator: the master/slave/dispatcher rotation state machine.
//!
//! One change-notification batch triggers exactly one cycle, and the single
//! consumer loop in the binary guarantees cycles never overlap. Within a
//! cycle every lifecycle transition is synchronous: a subprocess action
//! completes before the next one is issued. Restarting the slave first
//! (master still serving the old configuration) and the master last (a fresh
//! slave already serving the new one) keeps at least one instance live with a
//! consistent configuration version at all times; the dispatcher prefers the
//! master and falls back to the slave on its own.
use std::{fmt, path::Path, time::Duration};

use eyre::{Context, Result};

use crate::{
    adapters::definitions::load_documents,
    compile::{
        DEFAULT_DISPATCHER_HEADER, DEFAULT_INSTANCE_HEADER, render_dispatcher, render_instance,
    },
    config::AppConfig,
    ports::{ExitOutcome, ProxyHandle, ReachabilityProbe},
    registry::{FailedServices, ServiceRegistry, build_registry},
};

/// Which of the three proxy instances an event concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceRole {
    Master,
    Slave,
    Dispatcher,
}

impl fmt::Display for InstanceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Master => write!(f, "master"),
            Self::Slave => write!(f, "slave"),
            Self::Dispatcher => write!(f, "dispatcher"),
        }
    }
}

/// Per-instance lifecycle, cycled as Stopped → Starting → Running →
/// Draining → Stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Stopped,
    Starting,
    Running,
    Draining,
}

/// Orchestrator-level phase, observable for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Compiling,
    DrainingSlave,
    StartingSlave,
    DrainingMaster,
    StartingMaster,
}

struct Instance<H: ProxyHandle> {
    role: InstanceRole,
    state: InstanceState,
    handle: H,
}

impl<H: ProxyHandle> Instance<H> {
    fn new(role: InstanceRole, handle: H) -> Self {
        Self {
            role,
            state: InstanceState::Stopped,
            handle,
        }
    }

    async fn start(&mut self) -> Result<()> {
        self.state = InstanceState::Starting;
        if let Err(e) = self.handle.start().await {
            self.state = InstanceState::Stopped;
            return Err(e);
        }
        self.state = InstanceState::Running;
        Ok(())
    }

    async fn drain(&mut self, timeout: Duration) -> Result<()> {
        self.state = InstanceState::Draining;
        let outcome = match self.signal_and_await(timeout).await {
            Ok(outcome) => outcome,
            Err(e) => {
                // A stop that errors means the process is already gone (or
                // beyond signalling); either way it is not serving.
                self.state = InstanceState::Stopped;
                return Err(e);
            }
        };
        if outcome == ExitOutcome::Forced {
            tracing::warn!(instance = %self.role, "instance ignored drain signal, was killed");
        }
        self.state = InstanceState::Stopped;
        Ok(())
    }

    async fn signal_and_await(&mut self, timeout: Duration) -> Result<ExitOutcome> {
        self.handle.request_graceful_stop()?;
        self.handle.await_exit(timeout).await
    }
}

/// Drives recompilation and the sequential master-last restart.
///
/// Owns the three process handles, the failed-services set and the header
/// templates; the compiler itself stays a pure function.
pub struct ReloadOrchestrator<H: ProxyHandle> {
    cfg: AppConfig,
    probe: Box<dyn ReachabilityProbe>,
    failed: FailedServices,
    phase: Phase,
    master: Instance<H>,
    slave: Instance<H>,
    dispatcher: Instance<H>,
    instance_header: String,
    dispatcher_header: String,
}

impl<H: ProxyHandle> ReloadOrchestrator<H> {
    pub fn new(
        cfg: AppConfig,
        probe: Box<dyn ReachabilityProbe>,
        master: H,
        slave: H,
        dispatcher: H,
    ) -> Result<Self> {
        let instance_header = read_header(
            cfg.paths.instance_header.as_deref(),
            DEFAULT_INSTANCE_HEADER,
        )?;
        let dispatcher_header = read_header(
            cfg.paths.dispatcher_header.as_deref(),
            DEFAULT_DISPATCHER_HEADER,
        )?;

        Ok(Self {
            cfg,
            probe,
            failed: FailedServices::default(),
            phase: Phase::Idle,
            master: Instance::new(InstanceRole::Master, master),
            slave: Instance::new(InstanceRole::Slave, slave),
            dispatcher: Instance::new(InstanceRole::Dispatcher, dispatcher),
            instance_header,
            dispatcher_header,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn instance_state(&self, role: InstanceRole) -> InstanceState {
        match role {
            InstanceRole::Master => self.master.state,
            InstanceRole::Slave => self.slave.state,
            InstanceRole::Dispatcher => self.dispatcher.state,
        }
    }

    /// Rebuild the registry and render both instance documents. Nothing is
    /// written if this fails, so a fatal validation error leaves previously
    /// generated artifacts untouched.
    fn compile_instances(&mut self) -> Result<(String, String)> {
        if let Err(e) = self.probe.refresh() {
            tracing::error!("reachability source unavailable: {e}");
        }

        let documents = load_documents(&self.cfg.paths.definitions_dir)?;
        let registry: ServiceRegistry =
            build_registry(documents, self.probe.as_ref(), &mut self.failed)?;
        tracing::info!(
            services = registry.len(),
            failed = self.failed.len(),
            "registry compiled"
        );

        let master_doc = render_instance(&self.instance_header, &registry, self.cfg.ports.master);
        let slave_doc = render_instance(&self.instance_header, &registry, self.cfg.ports.slave);
        Ok((master_doc, slave_doc))
    }

    fn write_instance_configs(&self, master_doc: &str, slave_doc: &str) -> Result<()> {
        write_artifact(&self.cfg.paths.master_config, master_doc)?;
        write_artifact(&self.cfg.paths.slave_config, slave_doc)?;
        Ok(())
    }

    /// Full startup: compile everything, generate the dispatcher config,
    /// launch master and slave, give them a settle delay, then launch the
    /// dispatcher (which immediately health-checks both).
    pub async fn startup(&mut self) -> Result<()> {
        let result = self.launch_all().await;
        self.phase = Phase::Idle;
        if result.is_ok() {
            tracing::info!("all proxy instances running");
        }
        result
    }

    async fn launch_all(&mut self) -> Result<()> {
        self.phase = Phase::Compiling;
        let (master_doc, slave_doc) = self.compile_instances()?;
        self.write_instance_configs(&master_doc, &slave_doc)?;

        let certificate_available = self.cfg.paths.certificate.exists();
        if !certificate_available {
            tracing::info!(
                path = %self.cfg.paths.certificate.display(),
                "no certificate artifact, dispatcher will serve plain http only"
            );
        }
        let dispatcher_doc =
            render_dispatcher(&self.dispatcher_header, &self.cfg, certificate_available);
        write_artifact(&self.cfg.paths.dispatcher_config, &dispatcher_doc)?;

        self.master.start().await?;
        self.slave.start().await?;

        // Without this delay the dispatcher may observe both backends down.
        tokio::time::sleep(Duration::from_secs(self.cfg.timing.settle_secs)).await;
        self.dispatcher.start().await?;
        Ok(())
    }

    /// One full reload cycle: recompile, then rotate slave and master in
    /// strict sequence. The dispatcher configuration is not touched.
    ///
    /// The phase always returns to `Idle`, even when a rotation step fails;
    /// otherwise one transient process error would refuse every later cycle.
    pub async fn run_cycle(&mut self) -> Result<()> {
        if self.phase != Phase::Idle {
            // The single-consumer loop makes this unreachable; if it fires,
            // something re-entered the orchestrator.
            eyre::bail!("reload cycle requested while phase is {:?}", self.phase);
        }

        tracing::info!("reload cycle started");
        let result = self.rotate().await;
        self.phase = Phase::Idle;
        if result.is_ok() {
            tracing::info!("reload cycle complete");
        }
        result
    }

    async fn rotate(&mut self) -> Result<()> {
        self.phase = Phase::Compiling;
        let (master_doc, slave_doc) = self.compile_instances()?;
        self.write_instance_configs(&master_doc, &slave_doc)?;

        let drain_timeout = Duration::from_secs(self.cfg.timing.drain_timeout_secs);

        self.phase = Phase::DrainingSlave;
        self.slave.drain(drain_timeout).await?;
        self.phase = Phase::StartingSlave;
        self.slave.start().await?;

        self.phase = Phase::DrainingMaster;
        self.master.drain(drain_timeout).await?;
        self.phase = Phase::StartingMaster;
        self.master.start().await?;
        Ok(())
    }

    /// Tear the whole trio down: dispatcher first so no new traffic arrives,
    /// then master and slave.
    pub async fn shutdown(&mut self) {
        let drain_timeout = Duration::from_secs(self.cfg.timing.drain_timeout_secs);
        for instance in [&mut self.dispatcher, &mut self.master, &mut self.slave] {
            if instance.state == InstanceState::Running {
                if let Err(e) = instance.drain(drain_timeout).await {
                    tracing::error!(instance = %instance.role, "shutdown drain failed: {e}");
                }
            }
        }
    }
}

fn read_header(path: Option<&Path>, fallback: &str) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read header template {}", path.display())),
        None => Ok(fallback.to_string()),
    }
}

fn write_artifact(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    std::fs::write(path, contents)
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::debug!(path = %path.display(), bytes = contents.len(), "artifact written");
    Ok(())
}
