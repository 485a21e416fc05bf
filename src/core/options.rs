//! Read-only settings for one run, built once by the CLI layer and
//! threaded explicitly through every core call.

use std::path::{Path, PathBuf};

use crate::infra::config::{DEFAULT_REGEX_COMPILE, DEFAULT_REGEX_FILE};
use crate::infra::io::InputSource;
use crate::infra::utils::PathUtils;

#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Where build log lines come from
    pub input: InputSource,
    /// Initial directory of the directory stack (absolute, forward slashes)
    pub base_dir: String,
    /// Regular expression for source files to leave out
    pub exclude: Option<String>,
    /// Whitespace-separated tokens appended to every record
    pub macros: Option<String>,
    /// Compiler detector
    pub regex_compile: String,
    /// Source file detector; group 1 is the file
    pub regex_file: String,
    /// Emit `command` strings instead of `arguments` lists
    pub command_style: bool,
    /// Skip the on-disk existence check for source files
    pub no_strict: bool,
    /// Replace the compiler token with its absolute path
    pub full_path: bool,
}

impl ParseOptions {
    /// Defaults for everything but the base directory
    pub fn with_base_dir(base_dir: impl Into<String>) -> Self {
        Self {
            input: InputSource::Stdin,
            base_dir: PathUtils::convert_path(&base_dir.into()),
            exclude: None,
            macros: None,
            regex_compile: DEFAULT_REGEX_COMPILE.to_string(),
            regex_file: DEFAULT_REGEX_FILE.to_string(),
            command_style: false,
            no_strict: false,
            full_path: false,
        }
    }

    /// Pick the initial directory: the build dir if given, else the
    /// directory holding the input log, else `cwd`.
    pub fn resolve_base_dir(input: &InputSource, build_dir: Option<&Path>, cwd: &Path) -> String {
        let dir: PathBuf = match (build_dir, input) {
            (Some(dir), _) => absolutize(dir, cwd),
            (None, InputSource::File(file)) => {
                let abs = dunce::canonicalize(file).unwrap_or_else(|_| absolutize(file, cwd));
                abs.parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| cwd.to_path_buf())
            }
            (None, InputSource::Stdin) => cwd.to_path_buf(),
        };

        PathUtils::convert_path(&dir.to_string_lossy())
    }
}

fn absolutize(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        PathBuf::from(PathUtils::join_clean(
            &cwd.to_string_lossy(),
            &path.to_string_lossy(),
        ))
    }
}
