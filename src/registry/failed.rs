use std::collections::HashSet;

/// Names of services currently excluded from compiled output because none of
/// their backends are reachable.
///
/// Persists across reload cycles; membership toggles are state-change events
/// worth logging once, which is why both mutators report whether they
/// actually changed anything.
#[derive(Debug, Default)]
pub struct FailedServices {
    names: HashSet<String>,
}

impl FailedServices {
    /// Record `name` as failed. Returns true only on the transition into the
    /// set, so repeated cycles while still unreachable stay quiet.
    pub fn mark_failed(&mut self, name: &str) -> bool {
        self.names.insert(name.to_string())
    }

    /// Record `name` as recovered. Returns true only if it was in the set.
    pub fn mark_recovered(&mut self, name: &str) -> bool {
        self.names.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
