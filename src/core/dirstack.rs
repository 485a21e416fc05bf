//! Directory context tracking across build log lines.
//!
//! Make's own directory bookkeeping (`Entering directory`, `Leaving
//! directory`, `make -C`) persists across lines through a
//! [`DirectoryStack`]. A `cd` inside one line only lasts for the rest of
//! that line: the [`LineCursor`] remembers the directory from before the
//! `cd` and puts it back when the next line starts.

use tracing::{debug, info};

use crate::core::patterns::Patterns;
use crate::infra::utils::PathUtils;

/// LIFO of absolute directories. The bottom entry is a floor that is
/// never popped, so the stack is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryStack {
    dirs: Vec<String>,
}

impl DirectoryStack {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            dirs: vec![base.into()],
        }
    }

    pub fn push(&mut self, dir: String) {
        self.dirs.push(dir);
    }

    /// Pop the top entry. At the floor this is a no-op returning `None`.
    pub fn pop(&mut self) -> Option<String> {
        if self.dirs.len() > 1 {
            self.dirs.pop()
        } else {
            None
        }
    }

    pub fn peek(&self) -> &str {
        // The floor guarantees at least one entry
        self.dirs.last().map(String::as_str).unwrap_or_default()
    }

    pub fn depth(&self) -> usize {
        self.dirs.len()
    }
}

/// What a directory marker asks the tracker to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirAction {
    /// Entering directory: push and consume the line
    Enter(String),
    /// Leaving directory: pop and consume the line
    Leave,
    /// `make -C dir`: push but keep matching the line
    MakeDir(String),
    None,
}

impl DirAction {
    /// Classify one trimmed log line. Enter/leave markers win over `make -C`.
    pub fn detect(line: &str, patterns: &Patterns) -> Self {
        if let Some(caps) = patterns.enter_dir.captures(line) {
            return DirAction::Enter(caps[1].to_string());
        }

        if patterns.leave_dir.is_match(line) {
            return DirAction::Leave;
        }

        if let Some(caps) = patterns.make_dir.captures(line) {
            return DirAction::MakeDir(caps[1].to_string());
        }

        DirAction::None
    }

    /// Whether the line is fully handled once this action is applied
    pub fn consumes_line(&self) -> bool {
        matches!(self, DirAction::Enter(_) | DirAction::Leave)
    }
}

/// Per-line working directory plus the directory to restore before the
/// next line when a `cd` overrode it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineCursor {
    pub working_dir: String,
    pub pending_restore: Option<String>,
}

/// Stack plus cursor: everything the interpreter knows about "where" it is
#[derive(Debug, Clone)]
pub struct DirectoryTracker {
    stack: DirectoryStack,
    cursor: LineCursor,
}

impl DirectoryTracker {
    pub fn new(base_dir: &str) -> Self {
        let base = PathUtils::convert_path(base_dir);
        Self {
            stack: DirectoryStack::new(base.clone()),
            cursor: LineCursor {
                working_dir: base,
                pending_restore: None,
            },
        }
    }

    pub fn working_dir(&self) -> &str {
        &self.cursor.working_dir
    }

    pub fn stack(&self) -> &DirectoryStack {
        &self.stack
    }

    /// Undo a previous line's `cd`
    pub fn begin_line(&mut self) {
        if let Some(dir) = self.cursor.pending_restore.take() {
            info!("Restore workingDir: {}", dir);
            self.cursor.working_dir = dir;
        }
    }

    /// Detect and apply a directory marker. Returns true when the line is
    /// consumed and must not be matched further.
    pub fn observe(&mut self, line: &str, patterns: &Patterns) -> bool {
        let action = DirAction::detect(line, patterns);
        let consumed = action.consumes_line();
        self.apply(action);
        consumed
    }

    pub fn apply(&mut self, action: DirAction) {
        match action {
            DirAction::Enter(dir) => {
                self.push(&dir);
                info!("entering change workingDir: {}", self.cursor.working_dir);
            }
            DirAction::Leave => {
                if self.stack.pop().is_some() {
                    self.cursor.working_dir = self.stack.peek().to_string();
                    info!("leaving change workingDir: {}", self.cursor.working_dir);
                } else {
                    debug!("leaving directory without a matching enter");
                }
            }
            DirAction::MakeDir(dir) => {
                // No pop pairs with this push; make is expected to announce
                // its own enter/leave markers for the sub-build.
                self.push(&dir);
                info!("make cmd change workingDir: {}", self.cursor.working_dir);
            }
            DirAction::None => {}
        }
    }

    /// Apply `cd target` for the remainder of the current line
    pub fn cd(&mut self, target: &str) {
        let target = unquote(target.trim());
        let target = shellexpand::tilde(target);

        if self.cursor.pending_restore.is_none() {
            self.cursor.pending_restore = Some(self.cursor.working_dir.clone());
        }

        self.cursor.working_dir = PathUtils::join_clean(&self.cursor.working_dir, &target);
        info!("Temporarily change workingDir: {}", self.cursor.working_dir);
    }

    fn push(&mut self, dir: &str) {
        let dir = PathUtils::join_clean(&self.cursor.working_dir, &PathUtils::convert_path(dir));
        self.stack.push(dir);
        self.cursor.working_dir = self.stack.peek().to_string();
    }
}

fn unquote(s: &str) -> &str {
    for q in ['"', '\''] {
        if let Some(inner) = s.strip_prefix(q).and_then(|r| r.strip_suffix(q)) {
            return inner;
        }
    }
    s
}
