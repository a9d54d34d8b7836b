//! Pause gate: a shared barrier workers pass through before dequeuing the
//! next job (spec.md §4.3).
//!
//! A single queued token can miss wakeups if a worker isn't already parked
//! when `resume()` fires (see spec.md §9 "Pause gate correctness"). This
//! uses a `Condvar`-backed boolean instead, so `resume()` always wakes every
//! worker regardless of timing.

use std::sync::{Condvar, Mutex};

pub struct PauseGate {
    paused: Mutex<bool>,
    cv: Condvar,
}

impl PauseGate {
    pub fn new() -> Self {
        PauseGate {
            paused: Mutex::new(false),
            cv: Condvar::new(),
        }
    }

    /// Block the caller until the gate is clear. Returns immediately if
    /// already clear.
    pub fn wait_until_clear(&self) {
        let guard = self.paused.lock().expect("pause gate mutex poisoned");
        let _unused = self
            .cv
            .wait_while(guard, |paused| *paused)
            .expect("pause gate mutex poisoned");
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.lock().expect("pause gate mutex poisoned")
    }

    /// Set the gate so subsequent worker passes block. No-op if already paused.
    pub fn pause(&self) {
        let mut guard = self.paused.lock().expect("pause gate mutex poisoned");
        *guard = true;
    }

    /// Clear the gate and wake every blocked worker. No-op if not paused.
    pub fn resume(&self) {
        let mut guard = self.paused.lock().expect("pause gate mutex poisoned");
        if *guard {
            *guard = false;
            self.cv.notify_all();
        }
    }
}

impl Default for PauseGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn wait_returns_immediately_when_clear() {
        let gate = PauseGate::new();
        gate.wait_until_clear();
    }

    #[test]
    fn resume_wakes_a_blocked_waiter() {
        let gate = Arc::new(PauseGate::new());
        gate.pause();
        let gate2 = Arc::clone(&gate);
        let handle = std::thread::spawn(move || {
            gate2.wait_until_clear();
        });
        std::thread::sleep(Duration::from_millis(50));
        gate.resume();
        handle.join().expect("waiter thread panicked");
    }

    #[test]
    fn resume_without_pause_is_a_noop() {
        let gate = PauseGate::new();
        gate.resume();
        assert!(!gate.is_paused());
    }
}
