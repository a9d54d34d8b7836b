//! SSH argument-vector sources (spec.md §1 "out of scope: building the SSH
//! argument vector from a user command or an inlined script payload").
//!
//! `JobSpec::argv` is already a finished argv suffix by the time the worker
//! sees it (spec.md §4.2). This module is the seam where that suffix gets
//! built from either a plain trailing command or an inlined script, before
//! any `JobSpec` exists.

use anyhow::{Context, Result};

/// Produces the argv suffix appended after `ssh <host> -T -n -o
/// BatchMode=yes <SSHP_OPTS>` (spec.md §6).
pub trait ArgvSource {
    fn into_argv(self) -> Vec<String>;
}

/// A plain trailing command, passed through unchanged.
pub struct PlainCommand(pub Vec<String>);

impl ArgvSource for PlainCommand {
    fn into_argv(self) -> Vec<String> {
        self.0
    }
}

/// An inlined script executed remotely via a heredoc wrapper (spec.md §6
/// "Inlined script mode").
pub struct ScriptPayload {
    pub script_path: String,
    pub args: Vec<String>,
}

impl ScriptPayload {
    /// Read `script_path` and build the wrapped remote shell command.
    pub fn build(self) -> Result<PlainCommand> {
        let contents = std::fs::read_to_string(&self.script_path)
            .with_context(|| format!("cannot open script {}", self.script_path))?;
        let argstr = self
            .args
            .iter()
            .map(|a| shell_quote(a))
            .collect::<Vec<_>>()
            .join(" ");
        let wrapped = format!(
            "cat - >/tmp/.sshp.$$ <<'__SSHP_EOF__'\n{contents}__SSHP_EOF__\n\
             [ $? = 0 ] || {{\n\
             \techo \"ERROR: sshp: cannot create /tmp/.sshp.$$\" >&2\n\
             \trm -f /tmp/.sshp.$$\n\
             \texit 255\n\
             }}\n\
             chmod u+x /tmp/.sshp.$$\n\
             /tmp/.sshp.$$ {argstr}\n\
             e=$?\n\
             rm -f /tmp/.sshp.$$\n\
             exit $e\n"
        );
        Ok(PlainCommand(vec![wrapped]))
    }
}

/// Minimal POSIX shell single-quote escaping: wrap in single quotes, and
/// replace any embedded single quote with `'\''`.
fn shell_quote(s: &str) -> String {
    if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || "-_./".contains(c)) {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_command_passes_through() {
        let argv = PlainCommand(vec!["uptime".into()]).into_argv();
        assert_eq!(argv, vec!["uptime".to_string()]);
    }

    #[test]
    fn simple_args_are_not_quoted() {
        assert_eq!(shell_quote("simple-arg_1"), "simple-arg_1");
    }

    #[test]
    fn args_with_spaces_are_quoted() {
        assert_eq!(shell_quote("has space"), "'has space'");
    }

    #[test]
    fn embedded_single_quote_is_escaped() {
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
    }

    #[test]
    fn script_payload_wraps_contents_in_heredoc() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        use std::io::Write;
        writeln!(f, "echo hi").unwrap();
        let payload = ScriptPayload {
            script_path: f.path().to_string_lossy().into_owned(),
            args: vec!["arg one".into()],
        };
        let built = payload.build().unwrap().into_argv();
        assert_eq!(built.len(), 1);
        assert!(built[0].contains("cat - >/tmp/.sshp.$$"));
        assert!(built[0].contains("echo hi"));
        assert!(built[0].contains("'arg one'"));
        assert!(built[0].contains("exit $e"));
    }

    #[test]
    fn script_payload_errors_on_missing_file() {
        let payload = ScriptPayload {
            script_path: "/no/such/script.sh".into(),
            args: vec![],
        };
        assert!(payload.build().is_err());
    }
}
