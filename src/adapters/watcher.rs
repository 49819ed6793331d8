//! Filesystem change watcher feeding the reload loop.
use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};
use notify::{RecursiveMode, Watcher};
use tokio::sync::mpsc;

/// Watches the definitions directory and the host-table file; every relevant
/// notification batch becomes one unit on a bounded channel.
///
/// The channel capacity of one plus [`ChangeWatcher::drain_pending`] gives
/// the coalescing policy: events arriving while a cycle runs collapse into at
/// most one follow-up cycle.
pub struct ChangeWatcher {
    // Kept alive for the lifetime of the watcher; never accessed after init.
    _watcher: notify::RecommendedWatcher,
    rx: mpsc::Receiver<()>,
}

impl ChangeWatcher {
    pub fn new(definitions_dir: &Path, hosts_file: &Path) -> Result<Self> {
        // Notify backends report absolute, resolved event paths; resolve the
        // configured paths once so relative settings still match.
        let definitions_dir = definitions_dir.canonicalize().wrap_err_with(|| {
            format!(
                "failed to resolve definitions directory {}",
                definitions_dir.display()
            )
        })?;
        let hosts_parent = match hosts_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        // The file itself may not exist yet, so resolve through its directory.
        let hosts_parent = hosts_parent.canonicalize().wrap_err_with(|| {
            format!(
                "failed to resolve host table directory {}",
                hosts_parent.display()
            )
        })?;
        let hosts_file: PathBuf = match hosts_file.file_name() {
            Some(name) => hosts_parent.join(name),
            None => hosts_parent.clone(),
        };

        let (tx, rx) = mpsc::channel(1);

        let definitions_dir_owned = definitions_dir.clone();
        let hosts_file_owned = hosts_file;

        let mut watcher =
            notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
                match res {
                    Ok(event) => {
                        let relevant = (event.kind.is_modify()
                            || event.kind.is_create()
                            || event.kind.is_remove())
                            && event.paths.iter().any(|p| {
                                p.starts_with(&definitions_dir_owned) || *p == hosts_file_owned
                            });
                        if relevant {
                            tracing::debug!(kind = ?event.kind, "change notification");
                            // Channel full means a cycle is already pending.
                            let _ = tx.try_send(());
                        }
                    }
                    Err(e) => tracing::error!("file watch error: {e:?}"),
                }
            })?;

        watcher
            .watch(&definitions_dir, RecursiveMode::NonRecursive)
            .wrap_err_with(|| {
                format!(
                    "failed to watch definitions directory {}",
                    definitions_dir.display()
                )
            })?;

        watcher
            .watch(&hosts_parent, RecursiveMode::NonRecursive)
            .wrap_err_with(|| format!("failed to watch host table in {}", hosts_parent.display()))?;

        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// Wait for the next change batch. `None` means the watcher is gone.
    pub async fn next(&mut self) -> Option<()> {
        self.rx.recv().await
    }

    /// Discard buffered notifications. Call this right before a cycle reads
    /// the definitions: the discarded units are subsumed by that read, while
    /// anything arriving later stays queued and triggers a follow-up cycle.
    pub fn drain_pending(&mut self) {
        while self.rx.try_recv().is_ok() {}
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;
    use tokio::time::{Duration, timeout};

    use super::*;

    #[tokio::test]
    async fn definition_change_produces_notification() {
        let dir = tempdir().unwrap();
        let defs = dir.path().join("services");
        fs::create_dir(&defs).unwrap();
        let hosts = dir.path().join("hosts");
        fs::write(&hosts, "127.0.0.1 localhost\n").unwrap();

        let mut watcher = ChangeWatcher::new(&defs, &hosts).unwrap();

        fs::write(defs.join("web.yaml"), "web:\n").unwrap();

        let got = timeout(Duration::from_secs(2), watcher.next()).await;
        assert!(got.is_ok(), "timed out waiting for change notification");
        assert!(got.unwrap().is_some());
    }

    #[tokio::test]
    async fn hosts_change_produces_notification() {
        let dir = tempdir().unwrap();
        let defs = dir.path().join("services");
        fs::create_dir(&defs).unwrap();
        let hosts = dir.path().join("hosts");
        fs::write(&hosts, "127.0.0.1 localhost\n").unwrap();

        let mut watcher = ChangeWatcher::new(&defs, &hosts).unwrap();

        fs::write(&hosts, "127.0.0.1 localhost\n10.0.0.1 app01\n").unwrap();

        let got = timeout(Duration::from_secs(2), watcher.next()).await;
        assert!(got.is_ok(), "timed out waiting for change notification");
        assert!(got.unwrap().is_some());
    }

    #[tokio::test]
    async fn change_after_drain_still_notifies() {
        let dir = tempdir().unwrap();
        let defs = dir.path().join("services");
        fs::create_dir(&defs).unwrap();
        let hosts = dir.path().join("hosts");
        fs::write(&hosts, "127.0.0.1 localhost\n").unwrap();

        let mut watcher = ChangeWatcher::new(&defs, &hosts).unwrap();

        fs::write(&hosts, "10.0.0.1 app01\n").unwrap();
        timeout(Duration::from_secs(2), watcher.next())
            .await
            .expect("timed out waiting for change notification");

        // The reload loop drains before it reads the definitions; an edit
        // landing after that point must still produce a notification,
        // otherwise the proxies would keep serving stale routing.
        watcher.drain_pending();
        fs::write(&hosts, "10.0.0.2 app02\n").unwrap();
        let got = timeout(Duration::from_secs(2), watcher.next()).await;
        assert!(got.is_ok(), "mid-cycle change was discarded");
        assert!(got.unwrap().is_some());
    }

    #[tokio::test]
    async fn unresolved_path_components_still_match() {
        let dir = tempdir().unwrap();
        let defs = dir.path().join("services");
        fs::create_dir(&defs).unwrap();
        let hosts = dir.path().join("hosts");
        fs::write(&hosts, "127.0.0.1 localhost\n").unwrap();

        // Paths as an operator might write them: not in resolved form. The
        // watcher must still match the resolved paths notify reports.
        let crooked_defs = dir.path().join("services").join("..").join("services");
        let mut watcher = ChangeWatcher::new(&crooked_defs, &hosts).unwrap();

        fs::write(defs.join("web.yaml"), "web:\n").unwrap();

        let got = timeout(Duration::from_secs(2), watcher.next()).await;
        assert!(got.is_ok(), "change under unresolved path went unnoticed");
        assert!(got.unwrap().is_some());
    }
}
