//! Status rendering (spec.md §1 "out of scope: curses/segment-based
//! terminal rendering"; §4.5 step 5 plain-line fallback).
//!
//! A full interactive dashboard renders either a curses screen or, when no
//! tty is attached, a plain line per state transition. Only the latter is
//! in scope here; the curses path is the seam.

use crate::job::{JobStatus, State};

/// Consumes status snapshots and produces user-visible output.
pub trait Renderer {
    /// Called once per status snapshot taken off the bus.
    fn on_status(&mut self, status: &JobStatus);
    /// Called once after the run finishes, with the final per-host list.
    fn on_summary(&mut self, summary: &[JobStatus]);
}

/// One line per terminal-state transition, written to stdout. This is the
/// only renderer this crate implements; a full interactive dashboard is out
/// of scope (spec.md §1).
pub struct PlainRenderer;

impl Renderer for PlainRenderer {
    fn on_status(&mut self, status: &JobStatus) {
        if !status.state.is_terminal() {
            return;
        }
        println!(
            "{}: {} ({:.1}s){}",
            status.display_host,
            status.state.as_str(),
            status.duration,
            status
                .exit
                .map(|e| format!(" exit={e}"))
                .unwrap_or_default(),
        );
    }

    fn on_summary(&mut self, summary: &[JobStatus]) {
        let total = summary.len();
        let success = summary.iter().filter(|s| s.state == State::Success).count();
        println!("{success}/{total} succeeded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobSpec;
    use std::path::PathBuf;

    fn status(state: State) -> JobStatus {
        let spec = JobSpec {
            host: "h1".into(),
            display_host: "h1".into(),
            argv: vec![],
            resolve: false,
        };
        let mut s = JobStatus::idle(&spec, PathBuf::from("/tmp/h1.out"));
        s.state = state;
        s.exit = Some(0);
        s
    }

    #[test]
    fn non_terminal_status_is_a_no_op() {
        let mut r = PlainRenderer;
        r.on_status(&status(State::Running));
    }

    #[test]
    fn terminal_status_does_not_panic() {
        let mut r = PlainRenderer;
        r.on_status(&status(State::Success));
    }

    #[test]
    fn summary_counts_successes() {
        let mut r = PlainRenderer;
        let summary = vec![status(State::Success), status(State::Failed)];
        r.on_summary(&summary);
    }
}
