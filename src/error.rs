//! Error conditions the `main` boundary needs to distinguish by type: a
//! plain struct implementing `std::error::Error` per condition, matched via
//! `downcast_ref` rather than folded into one `thiserror` enum.

use std::fmt;

#[derive(Debug)]
pub struct NoHostsSupplied;

impl fmt::Display for NoHostsSupplied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no hosts supplied")
    }
}

impl std::error::Error for NoHostsSupplied {}

#[derive(Debug)]
pub struct NoCommandSupplied;

impl fmt::Display for NoCommandSupplied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no command supplied")
    }
}

impl std::error::Error for NoCommandSupplied {}

#[derive(Debug)]
pub struct LogDirCreateFailed(pub String);

impl fmt::Display for LogDirCreateFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot create run-log directory: {}", self.0)
    }
}

impl std::error::Error for LogDirCreateFailed {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_are_downcastable_from_anyhow() {
        let err: anyhow::Error = NoHostsSupplied.into();
        assert!(err.downcast_ref::<NoHostsSupplied>().is_some());
        assert!(err.downcast_ref::<NoCommandSupplied>().is_none());
    }

    #[test]
    fn log_dir_create_failed_carries_the_inner_message() {
        let err = LogDirCreateFailed("permission denied".to_string());
        assert!(err.to_string().contains("permission denied"));
    }
}
