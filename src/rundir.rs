//! Run-log directory layout (spec.md §6).
//!
//! Each run gets its own `<dirlog>/<unix-seconds>/` directory; `<dirlog>/latest`
//! and `<run>/latest` (self-pointing) are symlinks refreshed by
//! unlink-then-symlink — not atomic, but an acceptably small window for a
//! pointer only ever read by a human or a follow-up CLI invocation.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::job::State;

pub struct RunDir {
    root: PathBuf,
}

impl RunDir {
    /// Create `<dirlog>/<unix-seconds>/`, disambiguating on collision by
    /// incrementing the timestamp (two runs starting in the same second).
    pub fn create(dirlog: &Path, unix_seconds: u64) -> Result<RunDir> {
        fs::create_dir_all(dirlog)
            .with_context(|| format!("cannot create dirlog {}", dirlog.display()))?;

        let mut ts = unix_seconds;
        loop {
            let candidate = dirlog.join(ts.to_string());
            match fs::create_dir(&candidate) {
                Ok(()) => return Ok(RunDir { root: candidate }),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    ts += 1;
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("cannot create run directory {}", candidate.display())
                    })
                }
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Refresh `<dirlog>/latest` and `<run>/latest` to point at this run.
    pub fn symlink_latest(&self, dirlog: &Path) -> Result<()> {
        relink(&dirlog.join("latest"), &self.root)?;
        relink(&self.root.join("latest"), &self.root)?;
        Ok(())
    }

    pub fn host_out_path(&self, host: &str) -> PathBuf {
        self.root.join(format!("{host}.out"))
    }

    pub fn host_ssh_path(&self, host: &str) -> PathBuf {
        self.root.join(format!("{host}.ssh"))
    }

    pub fn host_marker_path(&self, host: &str, state: State) -> PathBuf {
        self.root.join(format!("{host}.{}", state.as_str()))
    }

    /// Record the `ssh` invocation for a host (spec.md §6 `<host>.ssh`).
    pub fn write_host_ssh(&self, host: &str, argv: &[String]) -> Result<()> {
        let path = self.host_ssh_path(host);
        fs::write(&path, argv.join(" ") + "\n")
            .with_context(|| format!("cannot write {}", path.display()))
    }

    /// Write `<host>.success` or `<host>.failed` with the raw outcome the
    /// worker observed from `wait()`, before any supervisor reclassification.
    pub fn write_host_result(&self, host: &str, state: State, exit: i32, duration: f64) -> Result<()> {
        let path = self.host_marker_path(host, state);
        let body = format!("EXIT CODE: {exit} {} {duration:.1}s\n", state.as_str());
        fs::write(&path, body).with_context(|| format!("cannot write {}", path.display()))
    }

    /// Append `host` to the aggregate `<state>.status` file, one host per line.
    pub fn append_status(&self, host: &str, state: State) -> Result<()> {
        let path = self.root.join(format!("{}.status", state.as_str()));
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("cannot open {}", path.display()))?;
        writeln!(f, "{host}").with_context(|| format!("cannot write {}", path.display()))
    }

    /// Write `hosts.list`: the full original host list, one per line.
    pub fn write_hosts_list(&self, hosts: &[String]) -> Result<()> {
        let path = self.root.join("hosts.list");
        let mut body = hosts.join("\n");
        if !body.is_empty() {
            body.push('\n');
        }
        fs::write(&path, body).with_context(|| format!("cannot write {}", path.display()))
    }

    /// Write `ssh-para.command`: the invocation that started this run.
    pub fn write_command(&self, argv: &[String]) -> Result<()> {
        let path = self.root.join("ssh-para.command");
        fs::write(&path, argv.join(" ") + "\n")
            .with_context(|| format!("cannot write {}", path.display()))
    }

    /// Append a line to `ssh-para.log`, the running per-transition log.
    pub fn append_log(&self, line: &str) -> Result<()> {
        let path = self.root.join("ssh-para.log");
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("cannot open {}", path.display()))?;
        writeln!(f, "{line}").with_context(|| format!("cannot write {}", path.display()))
    }

    /// Write `ssh-para.result`: the single-line final summary.
    pub fn write_result(&self, text: &str) -> Result<()> {
        let path = self.root.join("ssh-para.result");
        fs::write(&path, text.to_string() + "\n")
            .with_context(|| format!("cannot write {}", path.display()))
    }
}

fn relink(link: &Path, target: &Path) -> Result<()> {
    match fs::remove_file(link) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(e).with_context(|| format!("cannot remove stale symlink {}", link.display()))
        }
    }
    symlink(target, link).with_context(|| format!("cannot symlink {}", link.display()))
}
