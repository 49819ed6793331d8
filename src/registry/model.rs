//! Service definition documents and the validated registry built from them.
use serde::{Deserialize, Serialize};

fn default_balance() -> String {
    "roundrobin".to_string()
}

/// One backend host:port pair as written in a definition document.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct BackendSpec {
    pub host: String,
    pub port: u16,
}

impl BackendSpec {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// One named service entry as written in a definition document.
///
/// A single document may declare several services; the name is the mapping
/// key, not a field.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServiceSpec {
    pub domain_name: String,
    /// Spelled `default` in definition documents.
    #[serde(default, alias = "default")]
    pub is_default: bool,
    #[serde(default = "default_balance")]
    pub balance: String,
    pub backends: Vec<BackendSpec>,
    /// Raw proxy directives appended verbatim to the service's backend block.
    #[serde(default)]
    pub options: Vec<String>,
}

/// A service that survived validation and reachability filtering.
#[derive(Debug, Clone)]
pub struct ServiceDefinition {
    pub name: String,
    pub domain_name: String,
    pub is_default: bool,
    pub balance: String,
    /// Backends whose host currently resolves, in definition order.
    pub reachable_backends: Vec<BackendSpec>,
    pub options: Vec<String>,
}

/// Validated set of services, iterated in definition order.
///
/// Invariants enforced by the builder: no two entries share a name, and at
/// most one entry has `is_default` set.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: Vec<ServiceDefinition>,
}

impl ServiceRegistry {
    pub(crate) fn push(&mut self, service: ServiceDefinition) {
        self.services.push(service);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceDefinition> {
        self.services.iter()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.iter().any(|s| s.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&ServiceDefinition> {
        self.services.iter().find(|s| s.name == name)
    }

    /// The service all unmatched traffic falls through to, if one is marked.
    pub fn default_service(&self) -> Option<&ServiceDefinition> {
        self.services.iter().find(|s| s.is_default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_defaults() {
        let yaml = r#"
domain_name: api.example.com
backends:
  - host: 10.0.0.1
    port: 8080
"#;
        let spec: ServiceSpec = serde_yaml::from_str(yaml).unwrap();
        assert!(!spec.is_default);
        assert_eq!(spec.balance, "roundrobin");
        assert!(spec.options.is_empty());
        assert_eq!(spec.backends[0].address(), "10.0.0.1:8080");
    }

    #[test]
    fn default_flag_reads_document_spelling() {
        let yaml = r#"
domain_name: www.example.com
default: true
backends:
  - host: 10.0.0.1
    port: 8080
"#;
        let spec: ServiceSpec = serde_yaml::from_str(yaml).unwrap();
        assert!(spec.is_default);
    }

    #[test]
    fn registry_preserves_insertion_order() {
        let mut registry = ServiceRegistry::default();
        for name in ["web", "api", "admin"] {
            registry.push(ServiceDefinition {
                name: name.to_string(),
                domain_name: format!("{name}.example.com"),
                is_default: false,
                balance: "roundrobin".to_string(),
                reachable_backends: vec![],
                options: vec![],
            });
        }
        let names: Vec<_> = registry.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["web", "api", "admin"]);
    }
}
