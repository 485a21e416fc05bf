//! Make mode: run the build tool twice at once.
//!
//! A dry-run (`-Bnkw`) prints every command the build would execute without
//! running any of them; its combined output is interpreted into records.
//! Unless `--no-build` is set, the real build runs alongside it with its
//! output forwarded to the terminal, and its exit code becomes ours.

use std::ffi::OsStr;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument};

use crate::cli::AppContext;
use crate::core::expand::{SubShell, SystemShell};
use crate::core::interpreter::Interpreter;
use crate::core::options::ParseOptions;
use crate::core::record::ResultSet;
use crate::infra::io::split_lines;
use crate::infra::logging::LogControl;

/// Flags that turn a build into an unconditional, non-executing transcript
const DRY_RUN_FLAGS: &str = "-Bnkw";

/// How to launch the build tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MakeInvocation {
    pub program: String,
    /// Placed before the dry-run flags and user arguments
    pub leading_args: Vec<String>,
    /// Working directory of both builds; the process cwd when unset
    pub dir: Option<PathBuf>,
}

impl MakeInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            dir: None,
        }
    }

    pub fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args).args(args);
        if let Some(dir) = &self.dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

#[derive(Debug)]
pub struct ShadowOutcome {
    pub results: ResultSet,
    /// Real build's exit code, 0 when it did not run
    pub exit_code: i32,
}

pub struct ShadowBuild<'a> {
    pub options: &'a ParseOptions,
    pub make: &'a MakeInvocation,
    pub run_real: bool,
    pub log: &'a LogControl,
    pub shell: &'a dyn SubShell,
}

impl ShadowBuild<'_> {
    pub fn run(&self, args: &[String]) -> Result<ShadowOutcome> {
        let interpreter = Interpreter::new(self.options, self.shell)?;

        thread::scope(|s| {
            let dry = s.spawn(|| self.dry_run(&interpreter, args));

            let exit_code = if self.run_real { self.real_build(args) } else { 0 };

            let results = dry
                .join()
                .map_err(|_| anyhow!("dry-run worker panicked"))??;

            Ok(ShadowOutcome { results, exit_code })
        })
    }

    #[instrument(skip_all)]
    fn dry_run(&self, interpreter: &Interpreter<'_>, args: &[String]) -> Result<ResultSet> {
        let (mut reader, writer) = io::pipe().context("Failed to create dry-run pipe")?;

        let mut cmd = self
            .make
            .command(std::iter::once(DRY_RUN_FLAGS).chain(args.iter().map(String::as_str)));
        cmd.stdin(Stdio::null())
            .stdout(writer.try_clone().context("Failed to clone dry-run pipe")?)
            .stderr(writer);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to run {} {}", self.make.program, DRY_RUN_FLAGS))?;

        // Our copies of the write end must close or the read never ends
        drop(cmd);

        let mut raw = Vec::new();
        reader
            .read_to_end(&mut raw)
            .context("Failed to read dry-run output")?;

        // -k keeps going past errors, so a failing status is expected noise
        let status = child.wait().context("Failed to wait for dry-run")?;
        debug!("dry-run finished: {}", status);

        let lines = split_lines(&raw);

        // Only the real build's output should reach the terminal
        let _quiet = self.run_real.then(|| self.log.quiet());
        Ok(interpreter.run(&lines))
    }

    fn real_build(&self, args: &[String]) -> i32 {
        let mut cmd = self.make.command(args);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                eprintln!("start Error: {}: {}", self.make.program, e);
                return 1;
            }
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        thread::scope(|s| {
            if let Some(out) = stdout {
                s.spawn(move || forward_lines(out, io::stdout()));
            }
            if let Some(err) = stderr {
                s.spawn(move || forward_lines(err, io::stderr()));
            }
        });

        let status = match child.wait() {
            Ok(status) => status,
            Err(e) => {
                error!("waiting for {} failed: {}", self.make.program, e);
                return 1;
            }
        };

        if status.success() {
            return 0;
        }

        // Killed by a signal has no code
        let code = status.code().unwrap_or(1);
        println!("make failed! errorCode: {}", code);
        code
    }
}

fn forward_lines<R: Read, W: Write>(src: R, mut dst: W) {
    for line in BufReader::new(src).split(b'\n') {
        let Ok(mut line) = line else {
            break;
        };
        line.push(b'\n');
        if dst.write_all(&line).is_err() {
            break;
        }
    }
    let _ = dst.flush();
}

/// Make mode entry point
pub fn run(args: &[String], ctx: &AppContext) -> Result<i32> {
    let shadow = ShadowBuild {
        options: &ctx.options,
        make: &ctx.make,
        run_real: !ctx.no_build,
        log: &ctx.log,
        shell: &SystemShell,
    };

    let outcome = shadow.run(args)?;
    outcome.results.write_to(&ctx.output)?;

    Ok(outcome.exit_code)
}
