//! CLI exit code registry.
//!
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                        |
//! |------|------------------------------------------------|
//! | 0    | Success                                        |
//! | 1    | General error (unspecified)                    |
//! | 2    | Usage error (bad arguments)                    |
//! | 3    | Invalid config (parse or validation)           |
//! | 4    | Runtime error (IO, snapshot load, engine)      |
//! | 5    | Cycle exceeded its budget or was cancelled     |
//! | 6    | Unknown view name                              |

use orglens_engine::EngineError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Config failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// Runtime failure: unreadable files, malformed snapshots, engine errors.
pub const EXIT_RUNTIME: u8 = 4;

/// The cycle ran out of budget or was cancelled; nothing was published.
pub const EXIT_TIMEOUT: u8 = 5;

/// Unrecognized view name.
pub const EXIT_UNKNOWN_VIEW: u8 = 6;

/// Map an engine error to its exit code.
pub fn engine_exit_code(err: &EngineError) -> u8 {
    match err {
        EngineError::ConfigParse(_) | EngineError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        EngineError::Timeout { .. } | EngineError::Cancelled => EXIT_TIMEOUT,
        EngineError::UnknownView(_) => EXIT_UNKNOWN_VIEW,
        EngineError::MissingColumn { .. } | EngineError::Io(_) => EXIT_RUNTIME,
        EngineError::Validation { .. } | EngineError::DuplicateIdentity { .. } => EXIT_RUNTIME,
    }
}
