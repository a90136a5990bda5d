// SPDX-License-Identifier: MIT
//
// Seed Cracker: wordlist-driven recovery of provably-fair server seeds

//! Error types for the cracking engine
//!
//! Provides a unified error taxonomy using `thiserror` for ergonomic error handling.

use serde::Serialize;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for cracking operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Job configuration rejected before a job was created
    #[error("Configuration error: {0}")]
    Config(String),

    /// Wordlist container has an unexpected structure
    #[error("Invalid wordlist format: {0}")]
    InvalidFormat(String),

    /// Wordlist decompression failed
    #[error("Corrupt wordlist: {0}")]
    Corrupt(String),

    /// Wordlist holds zero non-empty lines
    #[error("Wordlist contains no candidates")]
    Empty,

    /// Unknown job identifier
    #[error("Job not found: {0}")]
    NotFound(Uuid),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Discriminated error kind, retained in terminal job snapshots so callers
/// never have to infer the failure from absence of data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    InvalidFormat,
    Corrupt,
    Empty,
    NotFound,
    Io,
    Internal,
}

impl Error {
    /// The serializable kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) => ErrorKind::Config,
            Error::InvalidFormat(_) => ErrorKind::InvalidFormat,
            Error::Corrupt(_) => ErrorKind::Corrupt,
            Error::Empty => ErrorKind::Empty,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Io(_) => ErrorKind::Io,
            Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Check if the error came from wordlist ingestion
    pub fn is_ingestion_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidFormat(_) | Error::Corrupt(_) | Error::Empty
        )
    }
}
