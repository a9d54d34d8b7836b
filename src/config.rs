//! Environment-derived configuration (spec.md §6, §9.3).
//!
//! Resolution order for the run-log root: CLI flag, then environment
//! variable, then a fixed default. The remaining `SSHP_*` variables have
//! no CLI override (per spec.md §6) and are read once at startup.

use directories::BaseDirs;
use std::net::Ipv4Addr;
use std::path::PathBuf;

/// Read-once process configuration derived from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub ssh_opts: Vec<String>,
    pub domains: Vec<String>,
    /// `None` means "show full FQDN" (env value `-1`).
    pub max_dots: Option<usize>,
    pub sym_beg: String,
    pub sym_end: String,
    pub sym_prog: String,
    pub sym_res: String,
}

impl Default for Config {
    fn default() -> Self {
        Config::from_env()
    }
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            ssh_opts: split_env("SSHP_OPTS"),
            domains: split_env("SSHP_DOMAINS"),
            max_dots: parse_max_dots(std::env::var("SSHP_MAX_DOTS").ok()),
            sym_beg: std::env::var("SSHP_SYM_BEG").unwrap_or_else(|_| "\u{e0b6}".to_string()),
            sym_end: std::env::var("SSHP_SYM_END").unwrap_or_else(|_| "\u{e0b4}".to_string()),
            sym_prog: std::env::var("SSHP_SYM_PROG").unwrap_or_else(|_| "\u{25b6}".to_string()),
            sym_res: std::env::var("SSHP_SYM_RES").unwrap_or_else(|_| "\u{e0b1}".to_string()),
        }
    }
}

fn split_env(key: &str) -> Vec<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

fn parse_max_dots(raw: Option<String>) -> Option<usize> {
    let n: i64 = match raw.and_then(|s| s.parse().ok()) {
        Some(n) => n,
        None => 1, // default: short hostname
    };
    if n < 0 { None } else { Some(n as usize) }
}

/// Resolve the run-log root directory: CLI flag, then `SSHP_DIRLOG` env,
/// then `~/.ssh-para`.
pub fn resolve_dirlog(cli_dirlog: Option<&str>) -> PathBuf {
    if let Some(d) = cli_dirlog {
        return PathBuf::from(d);
    }
    if let Ok(d) = std::env::var("SSHP_DIRLOG") {
        if !d.is_empty() {
            return PathBuf::from(d);
        }
    }
    if let Some(base) = BaseDirs::new() {
        return base.home_dir().join(".ssh-para");
    }
    PathBuf::from(".ssh-para")
}

fn is_ipv4(host: &str) -> bool {
    host.parse::<Ipv4Addr>().is_ok()
}

/// Trim `host` to `max_dots` dot-separated labels; IPv4 literals are never
/// trimmed (spec.md §3).
pub fn short_host(host: &str, max_dots: Option<usize>) -> String {
    if is_ipv4(host) {
        return host.to_string();
    }
    let Some(max_dots) = max_dots else {
        return host.to_string();
    };
    host.split('.')
        .take(max_dots.max(1))
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipv4_never_trimmed() {
        assert_eq!(short_host("10.0.0.1", Some(1)), "10.0.0.1");
    }

    #[test]
    fn fqdn_trimmed_to_one_label() {
        assert_eq!(short_host("web1.prod.example.com", Some(1)), "web1");
    }

    #[test]
    fn none_shows_full_fqdn() {
        assert_eq!(
            short_host("web1.prod.example.com", None),
            "web1.prod.example.com"
        );
    }

    #[test]
    fn max_dots_parses_negative_as_full_fqdn() {
        assert_eq!(parse_max_dots(Some("-1".to_string())), None);
    }

    #[test]
    fn max_dots_defaults_to_one() {
        assert_eq!(parse_max_dots(None), Some(1));
    }
}
