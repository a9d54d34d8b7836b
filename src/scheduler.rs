//! Top-level orchestration: turn a host list and a command into a run
//! directory, a worker pool, and a supervisor, then return the process
//! exit code (spec.md §4, §6).

use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Result;

use crate::config::{short_host, Config};
use crate::control;
use crate::job::JobSpec;
use crate::pause_gate::PauseGate;
use crate::queue::PendingQueue;
use crate::render::PlainRenderer;
use crate::resolve::{HostResolver, IdentityResolver, SuffixProbeResolver};
use crate::rundir::RunDir;
use crate::status_bus::status_bus;
use crate::supervisor::Supervisor;
use crate::worker::{run_worker, WorkerContext};

pub struct RunOpts {
    pub hosts: Vec<String>,
    pub argv: Vec<String>,
    pub parallel: usize,
    pub delay: Duration,
    pub timeout: Option<Duration>,
    pub resolve: bool,
    pub dirlog: std::path::PathBuf,
    /// The full process invocation, recorded verbatim in `ssh-para.command`.
    pub invocation: Vec<String>,
}

pub fn run(opts: RunOpts, config: Config) -> Result<i32> {
    if opts.hosts.is_empty() {
        return Err(crate::error::NoHostsSupplied.into());
    }
    if opts.argv.is_empty() {
        return Err(crate::error::NoCommandSupplied.into());
    }

    let specs: Vec<JobSpec> = opts
        .hosts
        .iter()
        .map(|host| JobSpec {
            host: host.clone(),
            display_host: short_host(host, config.max_dots),
            argv: opts.argv.clone(),
            resolve: opts.resolve,
        })
        .collect();

    let started_at = unix_now();
    let rundir = Arc::new(
        RunDir::create(&opts.dirlog, started_at)
            .map_err(|e| crate::error::LogDirCreateFailed(e.to_string()))?,
    );
    rundir.symlink_latest(&opts.dirlog)?;
    rundir.write_hosts_list(&opts.hosts)?;
    rundir.write_command(&opts.invocation)?;

    let queue = Arc::new(PendingQueue::from_specs(specs.iter().cloned()));
    let gate = Arc::new(PauseGate::new());
    let (status_tx, status_rx) = status_bus();

    let resolver: Arc<dyn HostResolver + Send + Sync> = if config.domains.is_empty() {
        Arc::new(IdentityResolver)
    } else {
        Arc::new(SuffixProbeResolver {
            domains: config.domains.clone(),
        })
    };

    control::install_signal_handlers();

    let pool_size = opts.parallel.min(specs.len()).max(1);
    let config = Arc::new(config);
    let mut handles = Vec::with_capacity(pool_size);
    for slot in 0..pool_size {
        if slot > 0 && !opts.delay.is_zero() {
            thread::sleep(opts.delay);
        }
        let ctx = WorkerContext {
            slot: slot as u32,
            queue: Arc::clone(&queue),
            gate: Arc::clone(&gate),
            status_tx: status_tx.clone(),
            rundir: Arc::clone(&rundir),
            config: Arc::clone(&config),
            resolver: Arc::clone(&resolver),
        };
        handles.push(thread::spawn(move || run_worker(&ctx)));
    }
    drop(status_tx);

    let mut supervisor = Supervisor::new(
        status_rx,
        Arc::clone(&queue),
        Arc::clone(&gate),
        Arc::clone(&rundir),
        Box::new(PlainRenderer),
        pool_size,
        specs.len(),
        opts.timeout.map(|d| d.as_secs_f64()),
        started_at as f64,
        opts.invocation.clone(),
    );
    let exit_code = supervisor.run()?;

    for handle in handles {
        let _ = handle.join();
    }

    Ok(exit_code)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
