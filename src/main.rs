//! sshp — entry point
//!
//! Parses the CLI, wires the environment-derived `Config`, and hands off
//! to `scheduler::run`. Logs go to stderr; the live status view and final
//! summary go to stdout.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sshp::argv::{ArgvSource, PlainCommand, ScriptPayload};
use sshp::config::{resolve_dirlog, Config};
use sshp::scheduler::{self, RunOpts};

#[derive(Debug, Parser)]
#[command(name = "sshp")]
#[command(about = "Run a command on many hosts in parallel over SSH", long_about = None)]
struct Cli {
    /// Host to run on; may be repeated. At least one of --host/--hosts-file
    /// is required.
    #[arg(short = 'H', long = "host", value_name = "HOST")]
    hosts: Vec<String>,

    /// Read hosts from a file, one per line; blank lines and lines
    /// starting with '#' are ignored.
    #[arg(short = 'f', long = "hosts-file", value_name = "PATH")]
    hosts_file: Option<String>,

    /// Maximum number of jobs running at once.
    #[arg(short = 'p', long = "parallel", default_value_t = 10)]
    parallel: usize,

    /// Milliseconds to wait between launching each worker (staggers
    /// startup so a large pool doesn't open every SSH connection at once).
    #[arg(short = 'w', long = "delay", default_value_t = 0)]
    delay_ms: u64,

    /// Per-job timeout in seconds; unset means no timeout.
    #[arg(short = 't', long = "timeout")]
    timeout_secs: Option<u64>,

    /// Path to a local script to run remotely instead of a trailing command.
    #[arg(short = 's', long = "script", value_name = "PATH")]
    script: Option<String>,

    /// Skip domain-suffix resolution and pass hosts to ssh unchanged.
    #[arg(long = "no-resolve")]
    no_resolve: bool,

    /// Override the run-log root directory (default: $SSHP_DIRLOG or
    /// ~/.ssh-para).
    #[arg(short = 'd', long = "dirlog", value_name = "PATH")]
    dirlog: Option<String>,

    /// Increase log verbosity (-v, -vv); logs always go to stderr.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Command and arguments to run on each host (ignored when --script is
    /// given, except as arguments passed to the script).
    #[arg(trailing_var_arg = true)]
    command: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("sshp: {e:#}");
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let config = Config::from_env();

    let mut hosts = cli.hosts.clone();
    if let Some(path) = &cli.hosts_file {
        hosts.extend(read_hosts_file(path)?);
    }

    let argv = if let Some(script_path) = cli.script {
        ScriptPayload {
            script_path,
            args: cli.command.clone(),
        }
        .build()?
        .into_argv()
    } else {
        PlainCommand(cli.command.clone()).into_argv()
    };

    let invocation: Vec<String> = std::env::args().collect();
    let opts = RunOpts {
        hosts,
        argv,
        parallel: cli.parallel,
        delay: Duration::from_millis(cli.delay_ms),
        timeout: cli.timeout_secs.map(Duration::from_secs),
        resolve: !cli.no_resolve,
        dirlog: resolve_dirlog(cli.dirlog.as_deref()),
        invocation,
    };

    scheduler::run(opts, config)
}

/// Read hosts from a file, one per line, skipping blanks and `#` comments.
fn read_hosts_file(path: &str) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("cannot read hosts file {path}: {e}"))?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}
