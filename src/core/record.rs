//! Compilation database records and the ordered set produced by one run.

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::infra::io::{self, OutputTarget};

/// How the compiler invocation is spelled in a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Invocation {
    /// Single space-joined string
    Command(String),
    /// Token list
    Arguments(Vec<String>),
}

/// One entry of `compile_commands.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompileRecord {
    pub directory: String,
    #[serde(flatten)]
    pub invocation: Invocation,
    /// Source path exactly as captured from the log
    pub file: String,
}

impl CompileRecord {
    pub fn new(directory: &str, arguments: Vec<String>, file: String, command_style: bool) -> Self {
        let invocation = if command_style {
            Invocation::Command(arguments.join(" "))
        } else {
            Invocation::Arguments(arguments)
        };

        Self {
            directory: directory.to_string(),
            invocation,
            file,
        }
    }

    /// Space-joined command, whatever the output style
    pub fn command_line(&self) -> String {
        match &self.invocation {
            Invocation::Command(c) => c.clone(),
            Invocation::Arguments(a) => a.join(" "),
        }
    }
}

/// Records in discovery order; no dedup, no sorting
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResultSet {
    records: Vec<CompileRecord>,
}

impl ResultSet {
    pub fn push(&mut self, record: CompileRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[CompileRecord] {
        &self.records
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        io::to_json_bytes(self)
    }

    /// Write the database. An empty set writes nothing and leaves any
    /// existing file untouched; returns whether anything was written.
    pub fn write_to(&self, target: &OutputTarget) -> Result<bool> {
        if self.is_empty() {
            info!("no compile commands found, nothing written");
            return Ok(false);
        }

        io::write_output(target, &self.to_json()?)?;

        if let OutputTarget::File(path) = target {
            info!("write {} entries to {}", self.len(), path.display());
        }
        Ok(true)
    }
}
