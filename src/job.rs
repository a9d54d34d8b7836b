//! Job identity and status types (spec.md §3).

use std::path::PathBuf;

/// Terminal and non-terminal job states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Running,
    Success,
    Failed,
    Timeout,
    Killed,
    Aborted,
}

impl State {
    pub fn is_terminal(self) -> bool {
        !matches!(self, State::Idle | State::Running)
    }

    /// Lowercase name used for `<host>.<state>` files and `.status` files.
    pub fn as_str(self) -> &'static str {
        match self {
            State::Idle => "idle",
            State::Running => "running",
            State::Success => "success",
            State::Failed => "failed",
            State::Timeout => "timeout",
            State::Killed => "killed",
            State::Aborted => "aborted",
        }
    }
}

/// Immutable identity of a job, created once at startup (spec.md §3).
#[derive(Debug, Clone)]
pub struct JobSpec {
    /// Original host identifier as given by the caller.
    pub host: String,
    /// Host trimmed to `max_dots` dot-separated labels (never trimmed for IPv4).
    pub display_host: String,
    /// SSH argument vector suffix (user command or inlined script wrapper).
    pub argv: Vec<String>,
    /// Whether the worker must resolve `host` at dispatch time.
    pub resolve: bool,
}

/// Sentinel exit code written for an ABORTED job.
pub const EXIT_ABORTED: i32 = 256;
/// Sentinel exit code used for spawn/open errors (kind 1, §7).
pub const EXIT_SPAWN_ERROR: i32 = -1;
/// SSH transport failure exit code (kind 2, §7).
pub const EXIT_SSH_TRANSPORT: i32 = 255;

/// Mutable snapshot of a job's progress; copied before being published on
/// the status bus (spec.md §3, §4.4 — never share the live mutable copy).
#[derive(Debug, Clone)]
pub struct JobStatus {
    pub host: String,
    pub display_host: String,
    pub state: State,
    /// Worker slot owning the job while RUNNING; -1 otherwise.
    pub slot: i32,
    /// OS pid of the child while RUNNING; -1 otherwise.
    pub pid: i32,
    /// Monotonic spawn timestamp in seconds; 0 if never started.
    pub start: f64,
    /// Seconds between spawn and termination; 0 while RUNNING.
    pub duration: f64,
    /// Child exit code after termination; `None` before termination.
    pub exit: Option<i32>,
    /// Absolute path to the per-host output file.
    pub logfile: PathBuf,
    /// Last non-empty, ANSI-stripped line of `logfile`.
    pub log_tail: String,
}

impl JobStatus {
    pub fn idle(spec: &JobSpec, logfile: PathBuf) -> Self {
        JobStatus {
            host: spec.host.clone(),
            display_host: spec.display_host.clone(),
            state: State::Idle,
            slot: -1,
            pid: -1,
            start: 0.0,
            duration: 0.0,
            exit: None,
            logfile,
            log_tail: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(State::Success.is_terminal());
        assert!(State::Failed.is_terminal());
        assert!(State::Timeout.is_terminal());
        assert!(State::Killed.is_terminal());
        assert!(State::Aborted.is_terminal());
        assert!(!State::Idle.is_terminal());
        assert!(!State::Running.is_terminal());
    }

    #[test]
    fn idle_status_has_sentinel_fields() {
        let spec = JobSpec {
            host: "h1".into(),
            display_host: "h1".into(),
            argv: vec!["true".into()],
            resolve: false,
        };
        let st = JobStatus::idle(&spec, PathBuf::from("/tmp/h1.out"));
        assert_eq!(st.slot, -1);
        assert_eq!(st.pid, -1);
        assert!(st.exit.is_none());
        assert_eq!(st.state, State::Idle);
    }
}
