//! Crate-wide error taxonomy.
//!
//! Three failure classes cover everything the core can hit:
//! - `Validation`: malformed caller input, detected before any subprocess
//!   or filesystem mutation.
//! - `ExternalTool`: the key-management command is missing or exited
//!   non-zero where no partial result is worth keeping.
//! - `Filesystem`: directory creation, rename, or attribute application
//!   failed.
//!
//! No variant is retried anywhere in the crate; retries are a caller
//! concern.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid parameters: {0}")]
    Validation(String),

    #[error("external tool failure: {0}")]
    ExternalTool(String),

    #[error("filesystem operation failed on {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type KeyResult<T> = Result<T, KeyError>;
