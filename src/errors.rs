//! Unified error type for the trip ledger.
//!
//! Every fallible operation returns [`Result`]. Validation failures carry the
//! full list of offending fields so callers can flag each input at once.

use crate::core::validation::ValidationError;
use std::fmt;
use thiserror::Error;

/// Kind of stored record an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// A trip record
    Trip,
    /// An expense entry record
    Entry,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trip => f.write_str("trip"),
            Self::Entry => f.write_str("entry"),
        }
    }
}

/// All errors produced by the ledger.
#[derive(Debug, Error)]
pub enum Error {
    /// User-supplied fields failed validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The requested record does not exist
    #[error("No {kind} found with id '{id}'")]
    NotFound {
        /// Record kind that was looked up
        kind: RecordKind,
        /// Identifier that was looked up
        id: String,
    },

    /// The storage engine failed
    #[error("Persistence error: {0}")]
    Persistence(#[from] sea_orm::DbErr),

    /// A stored record could not be turned into a domain value
    #[error("Stored {kind} '{id}' is malformed: {reason}")]
    Corrupt {
        /// Record kind of the malformed row
        kind: RecordKind,
        /// Identifier of the malformed row
        id: String,
        /// What was wrong with it
        reason: String,
    },

    /// The onboarding sample trip only supports dismissal
    #[error("The sample trip cannot be {operation}")]
    SampleTrip {
        /// Operation that was refused
        operation: &'static str,
    },

    /// Another operation on the same record is still running
    #[error("An operation on '{id}' is already in progress")]
    Busy {
        /// Identifier of the contested record
        id: String,
    },

    /// The rate provider has no rate for the pair
    #[error("No exchange rate available from {from} to {to}")]
    RateUnavailable {
        /// Source currency code
        from: String,
        /// Target currency code
        to: String,
    },

    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },

    /// I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or unreadable environment variable
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
