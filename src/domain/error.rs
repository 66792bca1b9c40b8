// ============================================================
// Layer 3 — Solver Errors
// ============================================================
// The two error families the solvers distinguish:
//
//   Configuration — the caller asked for something the solver
//                   cannot do (wrong solver kind, missing file
//                   settings, zero memory hops). Raised before
//                   any shared state is touched.
//
//   DataFormat    — an input file is malformed or the train and
//                   background files disagree on alignment.
//                   Carries the offending path so the user can
//                   fix the file. Never recovered locally.
//
// Plain I/O failures wrap std::io::Error so `?` works at every
// file read site. Application code converts these into anyhow
// errors at the boundary.
//
// Reference: Rust Book §9 (Error Handling)

use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolverError {
    /// The requested solver or pretrainer setup is invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An input file is malformed or misaligned with its companion file.
    #[error("malformed data in '{path}': {detail}")]
    DataFormat { path: String, detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SolverError {
    pub fn configuration(message: impl Into<String>) -> Self {
        SolverError::Configuration(message.into())
    }

    pub fn data_format(path: impl AsRef<Path>, detail: impl Into<String>) -> Self {
        SolverError::DataFormat {
            path:   path.as_ref().display().to_string(),
            detail: detail.into(),
        }
    }
}

pub type SolverResult<T> = Result<T, SolverError>;
