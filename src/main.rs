use std::path::{Path, PathBuf};

use bascule::{
    adapters::{ChangeWatcher, EngineProcess, HostsFileProbe},
    config::load_settings,
    orchestrator::ReloadOrchestrator,
    ports::{AlwaysReachable, ReachabilityProbe},
    registry::{FailedServices, RegistryError, build_registry},
    tracing_setup,
};
use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    #[clap(short, long, default_value = "bascule.toml")]
    config: PathBuf,

    /// Human-readable console logs instead of JSON
    #[clap(long)]
    pretty_logs: bool,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Validate settings and service definitions, then exit
    Validate {
        /// Settings file to validate
        #[clap(short, long, default_value = "bascule.toml")]
        config: PathBuf,
    },
    /// Initialize a new settings file
    Init {
        /// Output path for the new settings file
        #[clap(short, long, default_value = "bascule.toml")]
        config: PathBuf,
    },
    /// Compile configs, launch the proxy trio and watch for changes (default)
    Serve {
        /// Settings file to use
        #[clap(short, long, default_value = "bascule.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    if args.pretty_logs {
        tracing_setup::init_console_tracing()?;
    } else {
        tracing_setup::init_tracing()?;
    }

    match args.command {
        Some(Commands::Validate { config }) => validate_command(&config),
        Some(Commands::Init { config }) => init_command(&config),
        Some(Commands::Serve { config }) => serve_command(&config).await,
        None => serve_command(&args.config).await,
    }
}

async fn serve_command(settings_path: &Path) -> Result<()> {
    tracing::info!("loading settings from {}", settings_path.display());
    let cfg = load_settings(settings_path)
        .with_context(|| format!("failed to load settings from {}", settings_path.display()))?;

    let probe = HostsFileProbe::new(&cfg.paths.hosts_file);

    let master = EngineProcess::new(
        "master",
        cfg.engine.binary.as_str(),
        &cfg.paths.master_config,
        cfg.engine.debug,
        cfg.engine.graceful_signal.as_str(),
    );
    let slave = EngineProcess::new(
        "slave",
        cfg.engine.binary.as_str(),
        &cfg.paths.slave_config,
        cfg.engine.debug,
        cfg.engine.graceful_signal.as_str(),
    );
    let dispatcher = EngineProcess::new(
        "dispatcher",
        cfg.engine.binary.as_str(),
        &cfg.paths.dispatcher_config,
        cfg.engine.debug,
        cfg.engine.graceful_signal.as_str(),
    );

    let mut watcher = ChangeWatcher::new(&cfg.paths.definitions_dir, &cfg.paths.hosts_file)
        .context("failed to set up change watcher")?;

    let mut orchestrator =
        ReloadOrchestrator::new(cfg, Box::new(probe), master, slave, dispatcher)?;

    if let Err(e) = orchestrator.startup().await {
        exit_if_fatal(&e);
        return Err(e);
    }

    loop {
        tokio::select! {
            change = watcher.next() => {
                match change {
                    Some(()) => {
                        // Notifications already buffered are subsumed by the
                        // directory read this cycle is about to do; anything
                        // landing mid-cycle stays queued for a follow-up.
                        watcher.drain_pending();
                        if let Err(e) = orchestrator.run_cycle().await {
                            exit_if_fatal(&e);
                            tracing::error!("reload cycle failed: {e:#}");
                        }
                    }
                    None => {
                        tracing::warn!("change watcher closed, shutting down");
                        break;
                    }
                }
            }
            () = shutdown_signal() => {
                tracing::info!("shutdown signal received, draining proxy instances");
                orchestrator.shutdown().await;
                break;
            }
        }
    }

    Ok(())
}

/// Fatal registry errors terminate the whole process with their distinct
/// exit code. The engine instances are left running on the last good
/// configuration.
fn exit_if_fatal(report: &color_eyre::Report) {
    if let Some(fatal) = report.downcast_ref::<RegistryError>() {
        tracing::error!("fatal validation error: {fatal}");
        std::process::exit(fatal.exit_code());
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                tracing::error!("failed to register SIGTERM handler: {e}");
                std::future::pending::<()>().await;
                unreachable!()
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Validate settings and definitions without touching any process.
fn validate_command(settings_path: &Path) -> Result<()> {
    println!("🔍 Validating settings file: {}", settings_path.display());

    if !settings_path.exists() {
        eprintln!(
            "❌ Error: settings file '{}' not found",
            settings_path.display()
        );
        std::process::exit(1);
    }

    let cfg = match load_settings(settings_path) {
        Ok(cfg) => {
            println!("✅ Settings parsing: OK");
            cfg
        }
        Err(e) => {
            eprintln!("❌ Settings parsing failed:");
            eprintln!("   {e}");
            std::process::exit(1);
        }
    };

    // Use the real host table when it exists so the summary reflects what a
    // serve run would compile; otherwise treat every host as reachable.
    let probe: Box<dyn ReachabilityProbe> = if cfg.paths.hosts_file.exists() {
        let probe = HostsFileProbe::new(&cfg.paths.hosts_file);
        ReachabilityProbe::refresh(&probe)?;
        Box::new(probe)
    } else {
        println!(
            "   (host table {} not found, assuming every backend reachable)",
            cfg.paths.hosts_file.display()
        );
        Box::new(AlwaysReachable)
    };

    let documents = bascule::adapters::load_documents(&cfg.paths.definitions_dir)
        .with_context(|| {
            format!(
                "failed to scan definitions directory {}",
                cfg.paths.definitions_dir.display()
            )
        })?;
    let parse_failures = documents.iter().filter(|(_, r)| r.is_err()).count();

    let mut failed = FailedServices::default();
    match build_registry(documents, probe.as_ref(), &mut failed) {
        Ok(registry) => {
            println!("✅ Registry validation: OK");
            println!();
            println!("📋 Summary:");
            println!("   • Services routed: {}", registry.len());
            println!("   • Services with no reachable backend: {}", failed.len());
            println!("   • Definition files skipped (parse errors): {parse_failures}");
            println!(
                "   • Default service: {}",
                registry
                    .default_service()
                    .map_or("none", |s| s.name.as_str())
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Registry validation failed:");
            eprintln!("   {e}");
            std::process::exit(e.exit_code());
        }
    }
}

/// Write a commented starter settings file.
fn init_command(settings_path: &Path) -> Result<()> {
    if settings_path.exists() {
        eprintln!(
            "❌ Error: settings file '{}' already exists",
            settings_path.display()
        );
        std::process::exit(1);
    }

    let default_settings = r#"# bascule settings

[paths]
# Directory of per-service routing definition documents (YAML)
definitions_dir = "services"
# Host table backing the reachability probe
hosts_file = "/etc/hosts"
# Generated artifacts
master_config = "generated/master.cfg"
slave_config = "generated/slave.cfg"
dispatcher_config = "generated/dispatcher.cfg"
# Certificate artifact; its presence enables the secure listener
certificate = "/etc/ssl/private/dispatcher.pem"

[ports]
master = 8181
slave = 8282
public_http = 80
public_https = 443

[engine]
binary = "haproxy"
debug = false
graceful_signal = "SIGUSR1"

[timing]
settle_secs = 2
drain_timeout_secs = 30

# Redirect plain-http requests to https when a certificate is present
force_https = false
# Domains exempt from the redirect; use a YAML/TOML null entry for requests
# without any host header
https_exempt = []
"#;

    std::fs::write(settings_path, default_settings)
        .map_err(|e| eyre!("failed to write settings file: {e}"))?;
    println!(
        "✅ Created default settings at: {}",
        settings_path.display()
    );
    println!(
        "   Run 'bascule serve --config {}' to start",
        settings_path.display()
    );
    Ok(())
}
