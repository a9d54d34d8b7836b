//! Supervisor: the single thread that owns run-wide state — the status
//! bus consumer, the timeout sweep, operator kill/abort requests, the ETA
//! estimate, and the final summary (spec.md §4.5).

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Result;

use crate::control::{self, Command};
use crate::job::{JobStatus, State};
use crate::pause_gate::PauseGate;
use crate::queue::PendingQueue;
use crate::render::Renderer;
use crate::rundir::RunDir;
use crate::status_bus::StatusReceiver;

/// How a pid came to be killed, keyed by pid so a FAILED snapshot arriving
/// later can be reclassified (spec.md §9 open question, decided in
/// DESIGN.md "killed.status overlap").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KillReason {
    Killed,
    TimedOut,
}

pub struct Supervisor {
    status_rx: StatusReceiver,
    queue: std::sync::Arc<PendingQueue>,
    gate: std::sync::Arc<PauseGate>,
    rundir: std::sync::Arc<RunDir>,
    renderer: Box<dyn Renderer>,
    pool_size: usize,
    total_jobs: usize,
    timeout_secs: Option<f64>,
    running: HashMap<String, JobStatus>,
    terminal: Vec<JobStatus>,
    kill_table: HashMap<i32, KillReason>,
    started_at: f64,
    invocation: Vec<String>,
    key_reader: control::KeyReader,
    interrupt_handled: bool,
}

impl Supervisor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        status_rx: StatusReceiver,
        queue: std::sync::Arc<PendingQueue>,
        gate: std::sync::Arc<PauseGate>,
        rundir: std::sync::Arc<RunDir>,
        renderer: Box<dyn Renderer>,
        pool_size: usize,
        total_jobs: usize,
        timeout_secs: Option<f64>,
        started_at: f64,
        invocation: Vec<String>,
    ) -> Self {
        Supervisor {
            status_rx,
            queue,
            gate,
            rundir,
            renderer,
            pool_size,
            total_jobs,
            timeout_secs,
            running: HashMap::new(),
            terminal: Vec::new(),
            kill_table: HashMap::new(),
            started_at,
            invocation,
            key_reader: control::KeyReader::new(),
            interrupt_handled: false,
        }
    }

    /// Drive the supervisor to completion: consume the status bus, sweep
    /// for timeouts, react to operator commands, until every job is
    /// terminal and the pending queue is empty. Returns the process exit
    /// code (spec.md §7).
    pub fn run(&mut self) -> Result<i32> {
        loop {
            if let Some(status) = self.status_rx.recv_timeout(Duration::from_millis(100)) {
                self.process_status(status)?;
            }

            if control::interrupted() && !self.interrupt_handled {
                self.abort_remaining()?;
                self.killall();
                self.interrupt_handled = true;
            }

            if let Some(secs) = self.timeout_secs {
                self.check_timeout(now_secs(), secs)?;
            }

            if let Some(cmd) = self.key_reader.poll(Duration::from_millis(0)) {
                self.handle_command(cmd)?;
            }

            if self.running.is_empty() && self.queue.is_empty() {
                break;
            }
        }
        self.finish()
    }

    fn handle_command(&mut self, cmd: Command) -> Result<()> {
        match cmd {
            Command::Pause => self.gate.pause(),
            Command::Resume => self.gate.resume(),
            Command::AbortRemaining => self.abort_remaining()?,
            Command::KillSlot(slot) => self.kill_slot(slot),
        }
        Ok(())
    }

    fn process_status(&mut self, status: JobStatus) -> Result<()> {
        if !status.state.is_terminal() {
            self.running.insert(status.host.clone(), status.clone());
            self.renderer.on_status(&status);
            return Ok(());
        }

        self.running.remove(&status.host);
        let status = self.classify_terminal(status);
        self.rundir
            .append_status(&status.display_host, status.state)?;
        self.rundir.append_log(&format!(
            "{}: EXIT CODE: {} {} {:.1}s",
            status.display_host,
            status.exit.unwrap_or(-1),
            status.state.as_str(),
            status.duration,
        ))?;
        self.renderer.on_status(&status);
        self.terminal.push(status);
        Ok(())
    }

    /// Apply the kill-table and global-interrupt reclassification rules in
    /// a fixed order: a pid explicitly tracked in the kill table wins over
    /// the generic 255 exit code, and the interrupt-driven reclassification
    /// to KILLED only applies to pids *not* already in the table.
    fn classify_terminal(&mut self, mut status: JobStatus) -> JobStatus {
        if status.state != State::Failed {
            return status;
        }
        if let Some(reason) = self.kill_table.remove(&status.pid) {
            status.state = match reason {
                KillReason::Killed => State::Killed,
                KillReason::TimedOut => State::Timeout,
            };
            return status;
        }
        let transport_like = matches!(status.exit, Some(-2) | Some(255) | Some(-1));
        if control::interrupted() && transport_like {
            status.state = State::Killed;
        }
        status
    }

    fn check_timeout(&mut self, now: f64, timeout_secs: f64) -> Result<()> {
        let expired: Vec<(String, i32)> = self
            .running
            .values()
            .filter(|s| now - s.start > timeout_secs)
            .map(|s| (s.host.clone(), s.pid))
            .collect();
        for (_, pid) in expired {
            self.kill_table.insert(pid, KillReason::TimedOut);
            send_signal(pid, libc::SIGINT);
        }
        Ok(())
    }

    fn kill_slot(&mut self, slot: u32) {
        if let Some(status) = self.running.values().find(|s| s.slot == slot as i32) {
            self.kill_table.insert(status.pid, KillReason::Killed);
            send_signal(status.pid, libc::SIGINT);
        }
    }

    fn killall(&mut self) {
        for status in self.running.values() {
            self.kill_table.insert(status.pid, KillReason::Killed);
            send_signal(status.pid, libc::SIGINT);
        }
    }

    /// Drain every job still in the pending queue, marking each ABORTED in
    /// FIFO order (DESIGN.md "aborted.status ordering").
    fn abort_remaining(&mut self) -> Result<()> {
        for spec in self.queue.drain_all() {
            let logfile = self.rundir.host_out_path(&spec.display_host);
            let mut status = JobStatus::idle(&spec, logfile);
            status.state = State::Aborted;
            status.exit = Some(crate::job::EXIT_ABORTED);
            self.rundir
                .append_status(&status.display_host, status.state)?;
            self.renderer.on_status(&status);
            self.terminal.push(status);
        }
        Ok(())
    }

    /// ETA in seconds until every still-running job is expected to finish:
    /// average duration of finished jobs (excluding SSH-transport
    /// failures), scaled by remaining jobs over effective concurrency,
    /// minus time already spent on the most recently started in-flight job.
    pub fn compute_eta(&self) -> f64 {
        let finished: Vec<&JobStatus> = self
            .terminal
            .iter()
            .filter(|s| s.exit != Some(crate::job::EXIT_SSH_TRANSPORT))
            .collect();
        if finished.is_empty() {
            return 0.0;
        }
        let avg = finished.iter().map(|s| s.duration).sum::<f64>() / finished.len() as f64;
        let nbrun = self.running.len();
        let nbend = self.terminal.len();
        let concurrency = self.pool_size.min(nbrun).max(1) as f64;
        let last_start = self
            .running
            .values()
            .map(|s| s.start)
            .fold(f64::NEG_INFINITY, f64::max);
        let last_dur = if nbrun > 0 {
            (now_secs() - last_start).max(0.0)
        } else {
            0.0
        };
        let eta = avg * (self.total_jobs as f64 - nbend as f64) / concurrency - last_dur;
        eta.max(0.0)
    }

    fn count(&self, state: State) -> usize {
        self.terminal.iter().filter(|s| s.state == state).count()
    }

    /// Write `ssh-para.result` (single-line) and append the final human
    /// summary to `ssh-para.log`, then return the process exit code:
    /// 130 if the global interrupt was set, else 1 unless every job
    /// succeeded (spec.md §4.5, §7, §8).
    fn finish(&mut self) -> Result<i32> {
        self.renderer.on_summary(&self.terminal);

        let end = now_secs();
        let dur = (end - self.started_at).max(0.0);
        let total = self.terminal.len();
        let success = self.count(State::Success);
        let failed = self.count(State::Failed);
        let timeout = self.count(State::Timeout);
        let killed = self.count(State::Killed);
        let aborted = self.count(State::Aborted);

        let begin = self.started_at;
        let total_jobs = self.total_jobs;
        self.rundir.write_result(&format!(
            "begin: {begin:.0} end: {end:.0} dur: {dur:.1}s runs: {total}/{total_jobs} success={success} failed={failed} timeout={timeout} killed={killed} aborted={aborted}",
        ))?;

        let banner = if success == self.total_jobs { "PASS" } else { "FAIL" };
        self.rundir.append_log(&format!(
            "command: {}\nlog directory: {}\nbegin: {:.0}\nend: {end:.0}\ndur: {dur:.1}s\nsuccess: {success}\nfailed: {failed}\ntimeout: {timeout}\nkilled: {killed}\naborted: {aborted}\n{banner} ({success}/{total} succeeded)",
            self.invocation.join(" "),
            self.rundir.root().display(),
            self.started_at,
        ))?;

        if control::interrupted() {
            return Ok(130);
        }
        Ok(if success == total { 0 } else { 1 })
    }
}

fn send_signal(pid: i32, sig: i32) {
    unsafe {
        if libc::kill(pid, sig) != 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::ESRCH) {
                tracing::warn!(pid, signal = sig, error = %err, "kill failed");
            }
        }
    }
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
