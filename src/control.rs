//! Interactive control surface (spec.md §6 "Keyboard controls") and the
//! global interrupt flag (spec.md §5, §7): a process-wide flag flipped
//! from a signal handler and read back from the supervisor loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode};

/// A control request produced by either the keyboard poller or a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Pause,
    Resume,
    AbortRemaining,
    KillSlot(u32),
}

/// Process-wide flag set by the SIGINT/SIGPIPE handler, read by the
/// supervisor loop on every tick (spec.md §5 "global interrupt").
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Install the SIGINT/SIGPIPE handlers. Safe to call once per process;
/// calling it twice just reinstalls the same handler.
pub fn install_signal_handlers() {
    unsafe {
        libc::signal(libc::SIGINT, handle_interrupt as libc::sighandler_t);
        libc::signal(libc::SIGPIPE, libc::SIG_IGN);
    }
}

extern "C" fn handle_interrupt(_signum: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Non-blocking keyboard poller (spec.md §6: `p` pause, `r` resume, `a`
/// abort remaining, `k` then a digit kills that slot). `k` is a two-key
/// sequence: it arms `awaiting_slot` and produces no command by itself,
/// the next digit keypress completes it.
#[derive(Debug, Default)]
pub struct KeyReader {
    awaiting_slot: bool,
}

impl KeyReader {
    pub fn new() -> Self {
        KeyReader::default()
    }

    pub fn poll(&mut self, timeout: Duration) -> Option<Command> {
        if !event::poll(timeout).unwrap_or(false) {
            return None;
        }
        let Event::Key(key) = event::read().ok()? else {
            return None;
        };
        self.classify(key.code)
    }

    fn classify(&mut self, code: KeyCode) -> Option<Command> {
        match code {
            KeyCode::Char('p') => {
                self.awaiting_slot = false;
                Some(Command::Pause)
            }
            KeyCode::Char('r') => {
                self.awaiting_slot = false;
                Some(Command::Resume)
            }
            KeyCode::Char('a') => {
                self.awaiting_slot = false;
                Some(Command::AbortRemaining)
            }
            KeyCode::Char('k') => {
                self.awaiting_slot = true;
                None
            }
            KeyCode::Char(c) if self.awaiting_slot && c.is_ascii_digit() => {
                self.awaiting_slot = false;
                c.to_digit(10).map(Command::KillSlot)
            }
            _ => {
                self.awaiting_slot = false;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_interrupt_sets_the_flag() {
        handle_interrupt(libc::SIGINT);
        assert!(interrupted());
        INTERRUPTED.store(false, Ordering::SeqCst);
    }

    #[test]
    fn bare_digit_without_k_is_ignored() {
        let mut kr = KeyReader::new();
        assert_eq!(kr.classify(KeyCode::Char('3')), None);
    }

    #[test]
    fn k_then_digit_kills_that_slot() {
        let mut kr = KeyReader::new();
        assert_eq!(kr.classify(KeyCode::Char('k')), None);
        assert_eq!(
            kr.classify(KeyCode::Char('3')),
            Some(Command::KillSlot(3))
        );
    }

    #[test]
    fn k_then_non_digit_cancels_the_pending_slot() {
        let mut kr = KeyReader::new();
        assert_eq!(kr.classify(KeyCode::Char('k')), None);
        assert_eq!(kr.classify(KeyCode::Char('x')), None);
        assert_eq!(kr.classify(KeyCode::Char('5')), None);
    }

    #[test]
    fn pause_resume_abort_map_directly() {
        let mut kr = KeyReader::new();
        assert_eq!(kr.classify(KeyCode::Char('p')), Some(Command::Pause));
        assert_eq!(kr.classify(KeyCode::Char('r')), Some(Command::Resume));
        assert_eq!(
            kr.classify(KeyCode::Char('a')),
            Some(Command::AbortRemaining)
        );
    }
}
