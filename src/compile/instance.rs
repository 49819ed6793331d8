//! Renders a validated service registry into one proxy instance config.
//!
//! The compiler is a pure function of (registry, port, header): compiling the
//! same registry at two different ports yields documents identical except
//! where [`PORT_PLACEHOLDER`] was substituted. The master/slave rotation in
//! the orchestrator depends on that equivalence.
use std::fmt::Write as _;

use crate::registry::ServiceRegistry;

/// Token substituted with the instance listen port in every frontend line.
pub const PORT_PLACEHOLDER: &str = "{{port}}";

/// Built-in instance header used when no template file is configured.
pub const DEFAULT_INSTANCE_HEADER: &str = "\
global
    maxconn 4096

defaults
    mode http
    timeout connect 5s
    timeout client 50s
    timeout server 50s
";

/// Render a complete instance configuration document.
pub fn render_instance(header: &str, registry: &ServiceRegistry, port: u16) -> String {
    let mut doc = String::new();
    doc.push_str(header);
    if !header.ends_with('\n') {
        doc.push('\n');
    }

    doc.push('\n');
    doc.push_str(&render_frontend(registry, port));

    for service in registry.iter() {
        doc.push('\n');
        let _ = writeln!(doc, "backend {}_backend", service.name);
        if service.reachable_backends.len() > 1 {
            let _ = writeln!(doc, "    balance {}", service.balance);
        }
        for (i, backend) in service.reachable_backends.iter().enumerate() {
            // 1-based indices, stable across recompilations for an unchanged
            // backend list, so operators can correlate servers across reloads.
            let _ = writeln!(
                doc,
                "    server {}{} {}",
                service.name,
                i + 1,
                backend.address()
            );
        }
        // Raw passthrough lines go last so they can override generated ones.
        for option in &service.options {
            let _ = writeln!(doc, "    {option}");
        }
    }

    doc
}

/// Render the frontend block with the placeholder substituted in every line.
///
/// Substitution covers the whole block, not just the bind line: generated
/// predicate lines never carry the placeholder today, but the block is
/// treated uniformly so templated additions keep working.
fn render_frontend(registry: &ServiceRegistry, port: u16) -> String {
    let mut block = String::new();
    block.push_str("frontend bascule_in\n");
    let _ = writeln!(block, "    bind *:{PORT_PLACEHOLDER}");

    for service in registry.iter() {
        let _ = writeln!(
            block,
            "    acl host_{} hdr(host) -i {}",
            service.name, service.domain_name
        );
        let _ = writeln!(
            block,
            "    use_backend {}_backend if host_{}",
            service.name, service.name
        );
    }

    // Placed after the per-service pairs so more specific predicates are
    // evaluated first.
    if let Some(default) = registry.default_service() {
        let _ = writeln!(block, "    default_backend {}_backend", default.name);
    }

    block.replace(PORT_PLACEHOLDER, &port.to_string())
}
