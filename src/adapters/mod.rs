//! Adapters binding the ports to the real world: the host table on disk, the
//! definitions directory, the engine subprocesses, and filesystem watching.
pub mod definitions;
pub mod engine;
pub mod hosts;
pub mod watcher;

pub use definitions::load_documents;
pub use engine::EngineProcess;
pub use hosts::HostsFileProbe;
pub use watcher::ChangeWatcher;
