//! **compiledb** - Generate `compile_commands.json` from make build logs
//!
//! Reconstructs the working directory and compiler invocation of every
//! compile step in a recursive make transcript, either from a saved log or
//! by shadowing a live build with a dry-run.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Build log interpretation - directory tracking, segmentation, matching
pub mod core {
    /// Compiled pattern set built once per run
    pub mod patterns;
    pub use patterns::{PatternError, Patterns};

    /// Read-only run settings threaded through every call
    pub mod options;
    pub use options::ParseOptions;

    /// Directory stack plus per-line `cd` cursor
    pub mod dirstack;
    pub use dirstack::{DirAction, DirectoryStack, DirectoryTracker};

    /// `;` / `&&` / `||` splitting
    pub mod segment;

    /// Backtick sub-shell substitution
    pub mod expand;
    pub use expand::{ExpansionError, SubShell, SystemShell};

    /// Compiler and source file recognition
    pub mod matcher;
    pub use matcher::{CompileMatch, CompileMatcher, Discard};

    /// Compilation database records
    pub mod record;
    pub use record::{CompileRecord, Invocation, ResultSet};

    /// Line-by-line log interpreter (parse mode)
    pub mod interpreter;
    pub use interpreter::{Interpreter, generate};

    /// Concurrent dry-run and real build (make mode)
    pub mod shadow;
    pub use shadow::{MakeInvocation, ShadowBuild, ShadowOutcome, run as shadow_run};
}

/// Infrastructure - Configuration, I/O, logging and path helpers
pub mod infra {
    /// Layered configuration: defaults, config file, environment
    pub mod config;
    pub use config::{FileConfig, init as config_init, load_config};

    /// Input/output plumbing with memory-mapped reads (>1MB threshold)
    pub mod io;
    pub use io::{FileContent, InputSource, OutputTarget, read_file_smart};

    /// tracing subscriber with a reloadable threshold
    pub mod logging;
    pub use logging::LogControl;

    /// Slash-form path helpers
    pub mod utils;
    pub use utils::PathUtils;
}

// Strategic re-exports for clean CLI interface
pub use cli::{AppContext, Cli, Commands};
pub use crate::core::{Interpreter, ParseOptions, ResultSet, generate, shadow_run};
pub use infra::{FileConfig, load_config};
