//! Backtick sub-shell substitution.
//!
//! Build tools emit lines such as ``gcc `pkg-config --cflags glib` -c a.c``.
//! Each backtick span is run through a [`SubShell`] and replaced by its
//! trimmed stdout before the line is segmented.

use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use memchr::memchr;
use tracing::{debug, error};

/// Upper bound on substitutions per line; output that reintroduces
/// backticks would otherwise expand forever.
pub const MAX_EXPANSIONS: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum ExpansionError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}")]
    Failed { command: String, status: ExitStatus },

    #[error("gave up after {0} nested substitutions")]
    TooDeep(usize),
}

/// Runs one nested command and returns its stdout
pub trait SubShell: Send + Sync {
    fn capture(&self, command: &str, dir: Option<&Path>) -> Result<String, ExpansionError>;
}

/// `sh -c <command>`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShell;

impl SubShell for SystemShell {
    fn capture(&self, command: &str, dir: Option<&Path>) -> Result<String, ExpansionError> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit());

        if let Some(dir) = dir.filter(|d| d.is_dir()) {
            cmd.current_dir(dir);
        }

        let output = cmd.output().map_err(|source| ExpansionError::Spawn {
            command: command.to_string(),
            source,
        })?;

        if !output.status.success() {
            return Err(ExpansionError::Failed {
                command: command.to_string(),
                status: output.status,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Replace every backtick span with the trimmed output of running it.
/// Failures substitute empty text; hitting [`MAX_EXPANSIONS`] drops the
/// remaining backticks.
pub fn expand_nested(line: &str, dir: Option<&Path>, shell: &dyn SubShell) -> String {
    let mut line = line.to_string();

    for _ in 0..MAX_EXPANSIONS {
        let Some((open, close)) = find_span(&line) else {
            return line;
        };

        let nested = line[open + 1..close].to_string();
        debug!("nested command: {}", nested);

        let output = if nested.trim().is_empty() {
            String::new()
        } else {
            match shell.capture(&nested, dir) {
                Ok(out) => out.trim().to_string(),
                Err(e) => {
                    error!("Error executing nested command: {}", e);
                    String::new()
                }
            }
        };

        line.replace_range(open..=close, &output);
    }

    if find_span(&line).is_some() {
        error!("{}", ExpansionError::TooDeep(MAX_EXPANSIONS));
        line.retain(|c| c != '`');
    }

    line
}

/// Byte offsets of the first backtick pair
fn find_span(line: &str) -> Option<(usize, usize)> {
    let bytes = line.as_bytes();
    let open = memchr(b'`', bytes)?;
    let len = memchr(b'`', &bytes[open + 1..])?;
    Some((open, open + 1 + len))
}
