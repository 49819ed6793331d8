// End-to-end compile pipeline: definition files + host table in, rendered
// configuration documents out.
use std::fs;

use bascule::{
    adapters::{HostsFileProbe, load_documents},
    compile::{DEFAULT_INSTANCE_HEADER, render_instance},
    ports::ReachabilityProbe,
    registry::{FailedServices, ServiceRegistry, build_registry},
};
use tempfile::TempDir;

struct Pipeline {
    _dir: TempDir,
    defs: std::path::PathBuf,
    hosts: std::path::PathBuf,
    failed: FailedServices,
}

impl Pipeline {
    fn new(hosts_content: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let defs = dir.path().join("services");
        fs::create_dir(&defs).unwrap();
        let hosts = dir.path().join("hosts");
        fs::write(&hosts, hosts_content).unwrap();
        Self {
            _dir: dir,
            defs,
            hosts,
            failed: FailedServices::default(),
        }
    }

    fn define(&self, file: &str, content: &str) {
        fs::write(self.defs.join(file), content).unwrap();
    }

    fn build(&mut self) -> ServiceRegistry {
        let probe = HostsFileProbe::new(&self.hosts);
        ReachabilityProbe::refresh(&probe).unwrap();
        let documents = load_documents(&self.defs).unwrap();
        build_registry(documents, &probe, &mut self.failed).unwrap()
    }
}

const API: &str = "\
api:
  domain_name: api.example.com
  backends:
    - {host: app01, port: 8080}
    - {host: app02, port: 8080}
";

const WEB_DEFAULT: &str = "\
web:
  domain_name: www.example.com
  default: true
  backends:
    - {host: web01, port: 9000}
";

#[test]
fn api_service_end_to_end() {
    let mut pipeline = Pipeline::new("10.0.0.1 app01\n10.0.0.2 app02\n");
    pipeline.define("api.yaml", API);

    let registry = pipeline.build();
    let doc = render_instance(DEFAULT_INSTANCE_HEADER, &registry, 8181);

    assert!(doc.contains("acl host_api hdr(host) -i api.example.com"));
    assert!(doc.contains("use_backend api_backend if host_api"));
    assert!(doc.contains("balance roundrobin"));
    assert!(doc.contains("server api1 app01:8080"));
    assert!(doc.contains("server api2 app02:8080"));
}

#[test]
fn port_substitution_is_the_only_difference() {
    let mut pipeline = Pipeline::new("10.0.0.1 app01\n10.0.0.2 app02\n10.0.1.1 web01\n");
    pipeline.define("api.yaml", API);
    pipeline.define("web.yaml", WEB_DEFAULT);

    let registry = pipeline.build();
    let at_p1 = render_instance(DEFAULT_INSTANCE_HEADER, &registry, 8181);
    let at_p2 = render_instance(DEFAULT_INSTANCE_HEADER, &registry, 8282);

    assert_ne!(at_p1, at_p2);
    assert_eq!(at_p1.replace("8181", "8282"), at_p2);
}

#[test]
fn fully_unreachable_service_vanishes_from_output() {
    let mut pipeline = Pipeline::new("10.0.1.1 web01\n");
    pipeline.define("api.yaml", API);
    pipeline.define("web.yaml", WEB_DEFAULT);

    let registry = pipeline.build();
    let doc = render_instance(DEFAULT_INSTANCE_HEADER, &registry, 8181);

    assert!(!doc.contains("api"));
    assert!(doc.contains("server web1 web01:9000"));
    assert!(pipeline.failed.contains("api"));

    // Default service still drives the default dispatch.
    assert!(doc.contains("default_backend web_backend"));
}

#[test]
fn service_recovers_when_host_table_changes() {
    let mut pipeline = Pipeline::new("10.0.1.1 web01\n");
    pipeline.define("api.yaml", API);
    pipeline.define("web.yaml", WEB_DEFAULT);

    pipeline.build();
    assert!(pipeline.failed.contains("api"));

    // app01 comes back; the next pass restores the service.
    fs::write(&pipeline.hosts, "10.0.1.1 web01\n10.0.0.1 app01\n").unwrap();
    let registry = pipeline.build();
    assert!(!pipeline.failed.contains("api"));

    let doc = render_instance(DEFAULT_INSTANCE_HEADER, &registry, 8181);
    assert!(doc.contains("use_backend api_backend"));
    assert!(doc.contains("server api1 app01:8080"));
    // Only one backend recovered, so no balancing directive for api.
    let api_block = doc.split("backend api_backend").nth(1).unwrap();
    let api_block = api_block.split("backend ").next().unwrap();
    assert!(!api_block.contains("balance"));
}

#[test]
fn corrupt_file_does_not_abort_the_build() {
    let mut pipeline = Pipeline::new("10.0.0.1 app01\n10.0.0.2 app02\n");
    pipeline.define("api.yaml", API);
    pipeline.define("broken.yaml", "{{{{ not yaml");

    let registry = pipeline.build();
    assert_eq!(registry.len(), 1);
    assert!(registry.contains("api"));
}
