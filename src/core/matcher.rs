//! Decide whether one shell sub-command is a compile step and, if so,
//! extract its argument list and source file.

use tracing::{debug, info, warn};

use crate::core::options::ParseOptions;
use crate::core::patterns::Patterns;
use crate::infra::utils::PathUtils;

/// Why a sub-command produced no record. Diagnostic only, never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discard {
    /// No token looks like a compiler
    NotACompiler,
    /// A compiler, but no `-c ... file.c` form (link step, `-E`, ...)
    NoSourceFile,
    /// The source file matched the exclude pattern
    Excluded,
    /// Strict mode and the source file is not on disk
    Missing,
}

/// A recognized compile step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileMatch {
    /// Tokens starting at the compiler, plus any configured macros
    pub arguments: Vec<String>,
    /// Source path exactly as captured
    pub file: String,
}

pub struct CompileMatcher<'a> {
    patterns: &'a Patterns,
    options: &'a ParseOptions,
}

impl<'a> CompileMatcher<'a> {
    pub fn new(patterns: &'a Patterns, options: &'a ParseOptions) -> Self {
        Self { patterns, options }
    }

    pub fn match_command(&self, command: &str, working_dir: &str) -> Result<CompileMatch, Discard> {
        let tokens: Vec<&str> = command.split_whitespace().collect();

        // Drop env assignments and launcher prefixes ahead of the compiler
        let start = tokens
            .iter()
            .position(|t| self.patterns.compile.is_match(t))
            .ok_or(Discard::NotACompiler)?;

        let mut arguments: Vec<String> = tokens[start..].iter().map(|t| t.to_string()).collect();

        if self.options.full_path {
            if let Some(resolved) = PathUtils::find_in_path(&arguments[0]) {
                arguments[0] = PathUtils::convert_path(&resolved.to_string_lossy());
            }
        }

        // The file pattern sees the untruncated text
        let Some(file) = self
            .patterns
            .file
            .captures(command)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
        else {
            debug!("found compile:{}, but not found file, ignore command", arguments[0]);
            return Err(Discard::NoSourceFile);
        };

        if let Some(exclude) = &self.patterns.exclude {
            if exclude.is_match(&file) {
                info!("file {} exclude", file);
                return Err(Discard::Excluded);
            }
        }

        if !self.options.no_strict {
            let full = if PathUtils::is_abs(&file) {
                file.clone()
            } else {
                PathUtils::join_clean(working_dir, &file)
            };

            if !PathUtils::file_exists(&full) {
                warn!("file {} not exist", full);
                return Err(Discard::Missing);
            }
        }

        if let Some(macros) = &self.options.macros {
            arguments.extend(macros.split_whitespace().map(str::to_string));
        }

        Ok(CompileMatch { arguments, file })
    }
}
