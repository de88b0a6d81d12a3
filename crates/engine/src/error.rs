use std::fmt;

use orglens_core::SourceSystem;

#[derive(Debug)]
pub enum EngineError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad threshold, missing columns table, etc.).
    ConfigValidation(String),
    /// Malformed or unidentifiable raw record. Skipped and counted in the
    /// ingestion report; never aborts a cycle.
    Validation { system: SourceSystem, reason: String },
    /// Two records within one source share the same `(system, id)`.
    /// Aborts only that source batch's contribution.
    DuplicateIdentity { system: SourceSystem, id: String },
    /// Missing required column in a CSV snapshot.
    MissingColumn { source: String, column: String },
    /// A cycle exceeded its wall-clock budget. The previously published
    /// index remains authoritative.
    Timeout { budget_ms: u64 },
    /// A cycle was cancelled by its caller; partial work is discarded.
    Cancelled,
    /// Unrecognized view name.
    UnknownView(String),
    /// IO error (file read, malformed snapshot payload, etc.).
    Io(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::Validation { system, reason } => {
                write!(f, "invalid record from '{system}': {reason}")
            }
            Self::DuplicateIdentity { system, id } => {
                write!(f, "duplicate identity in '{system}': id '{id}' appears more than once")
            }
            Self::MissingColumn { source, column } => {
                write!(f, "source '{source}': missing column '{column}'")
            }
            Self::Timeout { budget_ms } => {
                write!(f, "cycle exceeded its {budget_ms}ms budget and was aborted")
            }
            Self::Cancelled => write!(f, "cycle cancelled"),
            Self::UnknownView(name) => write!(
                f,
                "unknown view: \"{name}\" (expected source:<system>, organizational, department, leadership or managers)"
            ),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
