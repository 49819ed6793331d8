//! Renders the single externally-facing dispatcher configuration.
//!
//! Generated once at startup; its content depends only on certificate
//! presence and the force-https option, never on the service registry, so
//! reload cycles leave it untouched.
use std::fmt::Write as _;

use crate::config::{AppConfig, RedirectExemption};

/// Built-in dispatcher header used when no template file is configured.
pub const DEFAULT_DISPATCHER_HEADER: &str = "\
global
    maxconn 8192

defaults
    mode http
    timeout connect 5s
    timeout client 50s
    timeout server 50s
";

/// Render the dispatcher configuration document.
///
/// `certificate_available` is decided by the caller (a bare existence check
/// on the configured path; no content validation is performed).
pub fn render_dispatcher(header: &str, cfg: &AppConfig, certificate_available: bool) -> String {
    let mut doc = String::new();
    doc.push_str(header);
    if !header.ends_with('\n') {
        doc.push('\n');
    }

    doc.push('\n');
    doc.push_str("frontend public\n");
    let _ = writeln!(doc, "    bind *:{}", cfg.ports.public_http);

    if certificate_available {
        let _ = writeln!(
            doc,
            "    bind *:{} ssl crt {}",
            cfg.ports.public_https,
            cfg.paths.certificate.display()
        );
        if cfg.force_https {
            doc.push_str(&redirect_line(&cfg.https_exempt));
        }
    }

    doc.push_str("    default_backend instances\n");

    doc.push('\n');
    doc.push_str("backend instances\n");
    // Traffic prefers the master while healthy; the slave is a health-checked
    // backup, so failover needs no orchestrator involvement.
    let _ = writeln!(doc, "    server master 127.0.0.1:{} check", cfg.ports.master);
    let _ = writeln!(
        doc,
        "    server slave 127.0.0.1:{} check backup",
        cfg.ports.slave
    );

    doc
}

/// The scheme redirect with its guard: skip already-secure connections and
/// every exempted request class.
fn redirect_line(exemptions: &[RedirectExemption]) -> String {
    let mut line = String::from("    redirect scheme https code 301 if !{ ssl_fc }");
    for exemption in exemptions {
        line.push_str(" !");
        line.push_str(&exemption_predicate(exemption));
    }
    line.push('\n');
    line
}

fn exemption_predicate(exemption: &RedirectExemption) -> String {
    match exemption {
        RedirectExemption::Domain(domain) => format!("{{ hdr(host) -i {domain} }}"),
        // Requests without any host header; matched by header count, never by
        // a literal domain value.
        RedirectExemption::MissingHost => "{ hdr_cnt(host) eq 0 }".to_string(),
    }
}
