//! Pending queue: unbounded FIFO of `JobSpec`, non-blocking take (spec.md §4.1).

use std::sync::Mutex;
use std::collections::VecDeque;

use crate::job::JobSpec;

/// FIFO of jobs waiting to be dispatched. Enqueued once by the scheduler
/// before workers start; drained by workers and, on abort, by the
/// supervisor. Both call sites use the same non-blocking `take`.
pub struct PendingQueue {
    inner: Mutex<VecDeque<JobSpec>>,
}

impl PendingQueue {
    pub fn new() -> Self {
        PendingQueue {
            inner: Mutex::new(VecDeque::new()),
        }
    }

    pub fn from_specs(specs: impl IntoIterator<Item = JobSpec>) -> Self {
        PendingQueue {
            inner: Mutex::new(specs.into_iter().collect()),
        }
    }

    /// Non-blocking dequeue. Returns `None` immediately if empty.
    pub fn take(&self) -> Option<JobSpec> {
        self.inner.lock().expect("pending queue mutex poisoned").pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("pending queue mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drain every remaining job, in FIFO order (spec.md §4.5 "Abort
    /// remaining"; order decision recorded in DESIGN.md).
    pub fn drain_all(&self) -> Vec<JobSpec> {
        let mut guard = self.inner.lock().expect("pending queue mutex poisoned");
        guard.drain(..).collect()
    }
}

impl Default for PendingQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(host: &str) -> JobSpec {
        JobSpec {
            host: host.to_string(),
            display_host: host.to_string(),
            argv: vec!["true".into()],
            resolve: false,
        }
    }

    #[test]
    fn take_is_non_blocking_and_fifo() {
        let q = PendingQueue::from_specs([spec("a"), spec("b")]);
        assert_eq!(q.take().unwrap().host, "a");
        assert_eq!(q.take().unwrap().host, "b");
        assert!(q.take().is_none());
    }

    #[test]
    fn drain_all_preserves_order_and_empties() {
        let q = PendingQueue::from_specs([spec("a"), spec("b"), spec("c")]);
        q.take(); // dispatch "a" first, as a worker would
        let rest = q.drain_all();
        assert_eq!(
            rest.iter().map(|s| s.host.as_str()).collect::<Vec<_>>(),
            vec!["b", "c"]
        );
        assert!(q.is_empty());
        assert!(q.drain_all().is_empty());
    }
}
