//! Status bus: N-producer, 1-consumer channel of `JobStatus` snapshots
//! (spec.md §4.4).
//!
//! Producers publish *copies*; `JobStatus` derives `Clone` and the sender
//! only accepts owned values, so there is no way to leak a shared mutable
//! reference through the bus.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use crate::job::JobStatus;

#[derive(Clone)]
pub struct StatusSender {
    tx: Sender<JobStatus>,
}

impl StatusSender {
    /// Publish a status snapshot. Ordering guarantee (spec.md §4.4): for a
    /// given job, callers must publish the RUNNING snapshot before the
    /// terminal one; the bus itself does not enforce this.
    pub fn publish(&self, status: JobStatus) {
        // The receiver always outlives every sender in this design (the
        // supervisor owns the receiver and exits only after every worker's
        // sender has been dropped); a disconnected channel here would mean
        // the supervisor exited early, which is a programming error, not a
        // per-job condition to recover from.
        let _ = self.tx.send(status);
    }
}

pub struct StatusReceiver {
    rx: Receiver<JobStatus>,
}

impl StatusReceiver {
    /// Receive one snapshot, waiting up to `timeout` (spec.md §4.5's ~100ms
    /// cadence). Returns `None` on timeout; never blocks indefinitely.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<JobStatus> {
        match self.rx.recv_timeout(timeout) {
            Ok(status) => Some(status),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

pub fn status_bus() -> (StatusSender, StatusReceiver) {
    let (tx, rx) = mpsc::channel();
    (StatusSender { tx }, StatusReceiver { rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobSpec, State};
    use std::path::PathBuf;

    fn status(host: &str, state: State) -> JobStatus {
        let spec = JobSpec {
            host: host.to_string(),
            display_host: host.to_string(),
            argv: vec![],
            resolve: false,
        };
        let mut s = JobStatus::idle(&spec, PathBuf::from("/tmp/x.out"));
        s.state = state;
        s
    }

    #[test]
    fn running_then_terminal_are_both_delivered_in_order() {
        let (tx, rx) = status_bus();
        tx.publish(status("a", State::Running));
        tx.publish(status("a", State::Success));
        let first = rx.recv_timeout(Duration::from_millis(100)).unwrap();
        let second = rx.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(first.state, State::Running);
        assert_eq!(second.state, State::Success);
    }

    #[test]
    fn recv_timeout_returns_none_when_empty() {
        let (_tx, rx) = status_bus();
        assert!(rx.recv_timeout(Duration::from_millis(10)).is_none());
    }
}
