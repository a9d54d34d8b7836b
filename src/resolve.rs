//! Host resolution (spec.md §1 "out of scope: DNS suffix probing").
//!
//! `HostResolver` is the seam. Walking a configurable list of domain
//! suffixes and picking the first one that resolves, with reverse lookups
//! and caching, is a much richer resolution scheme than this crate needs;
//! full probing is out of scope here. `IdentityResolver` is the minimal
//! real implementation that keeps the binary runnable: it passes hosts
//! through unchanged unless the caller has already disabled resolution
//! (spec.md §4.1 `--no-resolve`).

use std::net::ToSocketAddrs;

/// Resolves a display host name to the host string actually passed to `ssh`.
pub trait HostResolver {
    fn resolve(&self, host: &str) -> String;
}

/// Passes hosts through unchanged. This is the default: sshp relies on the
/// system resolver (and the user's own `/etc/hosts`/search domains) rather
/// than re-implementing suffix probing.
pub struct IdentityResolver;

impl HostResolver for IdentityResolver {
    fn resolve(&self, host: &str) -> String {
        host.to_string()
    }
}

/// Tries each configured domain suffix in order, keeping the first one that
/// resolves via the system resolver. Falls back to the bare host name if
/// none resolve (spec.md DESIGN NOTES: a resolution failure is surfaced by
/// `ssh` itself, not by sshp).
pub struct SuffixProbeResolver {
    pub domains: Vec<String>,
}

impl HostResolver for SuffixProbeResolver {
    fn resolve(&self, host: &str) -> String {
        if is_ip_literal(host) {
            return host.to_string();
        }
        for domain in &self.domains {
            let candidate = format!("{host}.{domain}");
            if (candidate.as_str(), 0u16).to_socket_addrs().is_ok() {
                return candidate;
            }
        }
        host.to_string()
    }
}

fn is_ip_literal(host: &str) -> bool {
    host.parse::<std::net::IpAddr>().is_ok()
}
