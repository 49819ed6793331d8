/// Trait for answering whether a backend host is currently known.
///
/// The registry builder queries this once per configured backend on every
/// compilation pass; implementations should treat each call as a fresh
/// question, since host tables change between reload cycles.
pub trait ReachabilityProbe: Send + Sync {
    /// Whether `host` currently resolves per the underlying source.
    fn is_reachable(&self, host: &str) -> bool;

    /// Re-read the underlying source. Called once at the start of every
    /// compilation pass; sources without state keep the default no-op.
    fn refresh(&self) -> eyre::Result<()> {
        Ok(())
    }
}

/// Probe that considers every host reachable. Useful for `validate` runs
/// where no host table is available, and for tests.
pub struct AlwaysReachable;

impl ReachabilityProbe for AlwaysReachable {
    fn is_reachable(&self, _host: &str) -> bool {
        true
    }
}
