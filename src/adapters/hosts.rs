//! Reachability probe backed by an `/etc/hosts`-style host table.
use std::{collections::HashSet, path::PathBuf, sync::RwLock};

use eyre::{Context, Result};

use crate::ports::ReachabilityProbe;

/// Probe that considers a host reachable when it appears in a host-table
/// file. The table is re-read via [`HostsFileProbe::refresh`] at the start of
/// every compilation pass, so reachability reflects the file as it is now.
pub struct HostsFileProbe {
    path: PathBuf,
    known: RwLock<HashSet<String>>,
}

impl HostsFileProbe {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            known: RwLock::new(HashSet::new()),
        }
    }

    /// Re-read the host table. An unreadable table empties the known set
    /// rather than failing the pass; the error is surfaced to the caller for
    /// logging.
    pub fn refresh(&self) -> Result<usize> {
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read host table {}", self.path.display()))
            .inspect_err(|_| {
                if let Ok(mut known) = self.known.write() {
                    known.clear();
                }
            })?;

        let parsed = parse_host_table(&contents);
        let count = parsed.len();
        let mut known = self
            .known
            .write()
            .map_err(|_| eyre::eyre!("host table lock poisoned"))?;
        *known = parsed;
        Ok(count)
    }
}

impl ReachabilityProbe for HostsFileProbe {
    fn is_reachable(&self, host: &str) -> bool {
        self.known
            .read()
            .map(|known| known.contains(host))
            .unwrap_or(false)
    }

    fn refresh(&self) -> eyre::Result<()> {
        let count = HostsFileProbe::refresh(self)?;
        tracing::debug!(hosts = count, path = %self.path.display(), "host table refreshed");
        Ok(())
    }
}

/// Extract all hostnames and aliases from host-table text. The first column
/// of each line is an address and is skipped; `#` starts a comment.
fn parse_host_table(contents: &str) -> HashSet<String> {
    let mut names = HashSet::new();
    for line in contents.lines() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        for name in line.split_whitespace().skip(1) {
            names.insert(name.to_string());
        }
    }
    names
}
