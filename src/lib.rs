//! Bascule - zero-downtime reverse-proxy configuration conductor.
//!
//! Bascule turns a directory of declarative per-service routing definitions
//! into configuration for a pair of reverse-proxy engine instances and keeps
//! those instances continuously serving traffic while definitions change,
//! without dropping connections. It does not implement a data plane: it
//! compiles configuration consumed by, and supervises the lifecycle of, an
//! external proxy engine treated as an opaque executable.
//!
//! # How it works
//! A public-facing **dispatcher** instance fronts two identically configured
//! backend instances, **master** (preferred, health-checked) and **slave**
//! (health-checked backup), which differ only in listen port. On every change
//! to the definitions directory or the host table, bascule rebuilds the
//! service registry, recompiles both instance configs, then restarts the
//! slave and finally the master. Because the dispatcher prefers the master
//! while healthy, the master-last ordering guarantees at least one instance
//! is always live and serving a consistent configuration version.
//!
//! # Architecture
//! The crate separates **ports** (traits) from **adapters** (implementations)
//! while keeping the pure pieces - the registry builder and the config
//! compiler - free of I/O:
//! - [`registry`]: validation, deduplication, reachability filtering and the
//!   failed-services set
//! - [`compile`]: deterministic rendering of instance and dispatcher configs
//! - [`orchestrator`]: the rotation state machine
//! - [`ports`] / [`adapters`]: reachability probe, process handle, change
//!   watcher, definition loading
//!
//! # Error Handling
//! Fallible plumbing returns `eyre::Result<T>`; domain failures use dedicated
//! error types. Duplicate service names and ambiguous defaults are fatal with
//! distinct exit codes; corrupt definition files are logged and skipped.
pub mod adapters;
pub mod compile;
pub mod config;
pub mod orchestrator;
pub mod ports;
pub mod registry;
pub mod tracing_setup;

pub use crate::{
    adapters::{ChangeWatcher, EngineProcess, HostsFileProbe},
    compile::{render_dispatcher, render_instance},
    orchestrator::ReloadOrchestrator,
    ports::{ProxyHandle, ReachabilityProbe},
    registry::{FailedServices, RegistryError, ServiceRegistry, build_registry},
};
