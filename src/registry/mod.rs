//! Service registry: validation, deduplication and reachability filtering.
//!
//! The registry is rebuilt from scratch on every compilation pass. Corrupt
//! definition files are skipped with a logged error (file-granularity
//! isolation); duplicate names and ambiguous defaults abort the whole pass
//! with a distinct fatal error, since they corrupt routing correctness for
//! every service.
pub mod error;
pub mod failed;
pub mod model;

use std::{collections::HashMap, path::PathBuf};

pub use error::{
    DefinitionFileError, EXIT_DUPLICATE_SERVICE, EXIT_MULTIPLE_DEFAULTS, RegistryError,
};
pub use failed::FailedServices;
pub use model::{BackendSpec, ServiceDefinition, ServiceRegistry, ServiceSpec};

use crate::ports::ReachabilityProbe;

/// Outcome of loading one definition document: the parsed service entries in
/// document order, or the file-local error that made the document unusable.
pub type DocumentOutcome = (
    PathBuf,
    Result<Vec<(String, ServiceSpec)>, DefinitionFileError>,
);

/// Build a validated registry from per-file document outcomes.
///
/// `failed` persists across calls; transitions into and out of it are logged
/// here as state-change events.
pub fn build_registry(
    documents: Vec<DocumentOutcome>,
    probe: &dyn ReachabilityProbe,
    failed: &mut FailedServices,
) -> Result<ServiceRegistry, RegistryError> {
    let mut registry = ServiceRegistry::default();
    let mut seen: HashMap<String, PathBuf> = HashMap::new();
    let mut default_name: Option<String> = None;

    for (path, outcome) in documents {
        let services = match outcome {
            Ok(services) => services,
            Err(err) => {
                tracing::error!("Skipping definition document: {err}");
                continue;
            }
        };

        for (name, spec) in services {
            if let Some(first) = seen.get(&name) {
                return Err(RegistryError::DuplicateService {
                    name,
                    first: first.clone(),
                    second: path.clone(),
                });
            }
            seen.insert(name.clone(), path.clone());

            let reachable_backends: Vec<BackendSpec> = spec
                .backends
                .iter()
                .filter(|b| {
                    let up = probe.is_reachable(&b.host);
                    if !up {
                        tracing::debug!(
                            service = %name,
                            backend = %b.address(),
                            "backend host not reachable, excluded"
                        );
                    }
                    up
                })
                .cloned()
                .collect();

            if reachable_backends.is_empty() {
                if failed.mark_failed(&name) {
                    tracing::warn!(
                        service = %name,
                        "all backends unreachable, service excluded from routing"
                    );
                }
                continue;
            }

            if failed.mark_recovered(&name) {
                tracing::info!(
                    service = %name,
                    "at least one backend reachable again, service restored to routing"
                );
            }

            if spec.is_default {
                if let Some(first) = &default_name {
                    return Err(RegistryError::MultipleDefaults {
                        first: first.clone(),
                        second: name,
                    });
                }
                default_name = Some(name.clone());
            }

            registry.push(ServiceDefinition {
                name,
                domain_name: spec.domain_name,
                is_default: spec.is_default,
                balance: spec.balance,
                reachable_backends,
                options: spec.options,
            });
        }
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::AlwaysReachable;

    struct TableProbe(Vec<&'static str>);

    impl ReachabilityProbe for TableProbe {
        fn is_reachable(&self, host: &str) -> bool {
            self.0.contains(&host)
        }
    }

    fn spec(domain: &str, hosts: &[&str]) -> ServiceSpec {
        ServiceSpec {
            domain_name: domain.to_string(),
            is_default: false,
            balance: "roundrobin".to_string(),
            backends: hosts
                .iter()
                .map(|h| BackendSpec {
                    host: (*h).to_string(),
                    port: 8080,
                })
                .collect(),
            options: vec![],
        }
    }

    fn doc(path: &str, entries: Vec<(&str, ServiceSpec)>) -> DocumentOutcome {
        (
            PathBuf::from(path),
            Ok(entries
                .into_iter()
                .map(|(n, s)| (n.to_string(), s))
                .collect()),
        )
    }

    #[test]
    fn duplicate_name_across_files_is_fatal() {
        let docs = vec![
            doc("a.yaml", vec![("web", spec("a.example.com", &["h1"]))]),
            doc("b.yaml", vec![("web", spec("b.example.com", &["h2"]))]),
        ];
        let mut failed = FailedServices::default();
        let err = build_registry(docs, &AlwaysReachable, &mut failed).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_DUPLICATE_SERVICE);
        match err {
            RegistryError::DuplicateService { name, .. } => assert_eq!(name, "web"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn multiple_defaults_is_fatal() {
        let mut first = spec("a.example.com", &["h1"]);
        first.is_default = true;
        let mut second = spec("b.example.com", &["h2"]);
        second.is_default = true;

        let docs = vec![doc("a.yaml", vec![("a", first), ("b", second)])];
        let mut failed = FailedServices::default();
        let err = build_registry(docs, &AlwaysReachable, &mut failed).unwrap_err();
        match &err {
            RegistryError::MultipleDefaults { first, second } => {
                assert_eq!(first.as_str(), "a");
                assert_eq!(second.as_str(), "b");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.exit_code(), EXIT_MULTIPLE_DEFAULTS);
    }

    #[test]
    fn corrupt_file_is_skipped_not_fatal() {
        let docs = vec![
            (
                PathBuf::from("bad.yaml"),
                Err(DefinitionFileError::NotAMapping {
                    path: PathBuf::from("bad.yaml"),
                }),
            ),
            doc("good.yaml", vec![("web", spec("web.example.com", &["h1"]))]),
        ];
        let mut failed = FailedServices::default();
        let registry = build_registry(docs, &AlwaysReachable, &mut failed).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("web"));
    }

    #[test]
    fn unreachable_service_enters_failed_set_once() {
        let probe = TableProbe(vec![]);
        let mut failed = FailedServices::default();

        for _ in 0..3 {
            let docs = vec![doc("a.yaml", vec![("web", spec("web.example.com", &["down"]))])];
            let registry = build_registry(docs, &probe, &mut failed).unwrap();
            assert!(registry.is_empty());
            assert!(failed.contains("web"));
        }
        assert_eq!(failed.len(), 1);
    }

    #[test]
    fn recovered_service_leaves_failed_set_and_reappears() {
        let mut failed = FailedServices::default();

        let docs = vec![doc("a.yaml", vec![("web", spec("web.example.com", &["down"]))])];
        build_registry(docs, &TableProbe(vec![]), &mut failed).unwrap();
        assert!(failed.contains("web"));

        let docs = vec![doc("a.yaml", vec![("web", spec("web.example.com", &["down"]))])];
        let registry = build_registry(docs, &TableProbe(vec!["down"]), &mut failed).unwrap();
        assert!(!failed.contains("web"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("web").unwrap().reachable_backends.len(), 1);
    }

    #[test]
    fn partially_reachable_service_keeps_only_live_backends() {
        let probe = TableProbe(vec!["up"]);
        let mut failed = FailedServices::default();
        let docs = vec![doc(
            "a.yaml",
            vec![("web", spec("web.example.com", &["up", "down"]))],
        )];
        let registry = build_registry(docs, &probe, &mut failed).unwrap();
        let web = registry.get("web").unwrap();
        assert_eq!(web.reachable_backends.len(), 1);
        assert_eq!(web.reachable_backends[0].host, "up");
        assert!(failed.is_empty());
    }
}
