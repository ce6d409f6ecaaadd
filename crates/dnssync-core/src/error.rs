//! Error types for the dnssync system
//!
//! This module defines the per-operation error taxonomy and the aggregate
//! error returned by batch operations that never abort on a single failure.

use std::fmt;
use thiserror::Error;

/// Result type alias for dnssync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the dnssync system
#[derive(Error, Debug)]
pub enum Error {
    /// Network or I/O failure reaching the record store
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success status returned by the remote API
    #[error("remote API error (status {status}): {body}")]
    RemoteApi {
        /// HTTP status code
        status: u16,
        /// Response body as returned by the remote
        body: String,
    },

    /// Malformed or unexpected payload
    #[error("decode error: {0}")]
    Decode(String),

    /// Record type outside {A, CNAME, TXT, MX, SRV}
    #[error("unsupported record type: {0}")]
    UnsupportedRecordType(String),

    /// No configured zone owns the name
    #[error("zone not found for {0}")]
    ZoneNotFound(String),

    /// Update or delete without a remote identifier
    #[error("missing record identifier: {0}")]
    MissingIdentifier(String),

    /// Remote identifier that is not numeric text
    #[error("invalid record identifier format: {0}")]
    InvalidIdentifierFormat(String),

    /// MX/SRV arity or numeric parse failure, or wrong target count
    #[error("invalid target format: {0}")]
    InvalidTargetFormat(String),

    /// Benign "does not exist" answer from the store
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller cancelled the operation
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Copyable discriminant of [`Error`], convenient for matching and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Transport,
    RemoteApi,
    Decode,
    UnsupportedRecordType,
    ZoneNotFound,
    MissingIdentifier,
    InvalidIdentifierFormat,
    InvalidTargetFormat,
    NotFound,
    Cancelled,
    Config,
    Other,
}

impl Error {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a remote API error
    pub fn remote_api(status: u16, body: impl Into<String>) -> Self {
        Self::RemoteApi {
            status,
            body: body.into(),
        }
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create an unsupported record type error
    pub fn unsupported_record_type(record_type: impl Into<String>) -> Self {
        Self::UnsupportedRecordType(record_type.into())
    }

    /// Create a zone-not-found error
    pub fn zone_not_found(name: impl Into<String>) -> Self {
        Self::ZoneNotFound(name.into())
    }

    /// Create a missing identifier error
    pub fn missing_identifier(msg: impl Into<String>) -> Self {
        Self::MissingIdentifier(msg.into())
    }

    /// Create an invalid identifier format error
    pub fn invalid_identifier(msg: impl Into<String>) -> Self {
        Self::InvalidIdentifierFormat(msg.into())
    }

    /// Create an invalid target format error
    pub fn invalid_target(msg: impl Into<String>) -> Self {
        Self::InvalidTargetFormat(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a cancellation error
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// The kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::RemoteApi { .. } => ErrorKind::RemoteApi,
            Self::Decode(_) | Self::Json(_) => ErrorKind::Decode,
            Self::UnsupportedRecordType(_) => ErrorKind::UnsupportedRecordType,
            Self::ZoneNotFound(_) => ErrorKind::ZoneNotFound,
            Self::MissingIdentifier(_) => ErrorKind::MissingIdentifier,
            Self::InvalidIdentifierFormat(_) => ErrorKind::InvalidIdentifierFormat,
            Self::InvalidTargetFormat(_) => ErrorKind::InvalidTargetFormat,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Cancelled(_) => ErrorKind::Cancelled,
            Self::Config(_) => ErrorKind::Config,
            Self::Other(_) => ErrorKind::Other,
        }
    }

    /// Whether the store reported that the target does not exist
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

/// The kind of operation a failure was recorded for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Create,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::List => "list",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// One failed operation inside a batch
#[derive(Debug)]
pub struct OperationFailure {
    /// What was being attempted
    pub operation: Operation,
    /// Identity of the endpoint (or record type, for listing)
    pub subject: String,
    /// Zone the operation was scoped to, when it could be resolved
    pub zone: Option<String>,
    /// Underlying cause
    pub error: Error,
}

impl OperationFailure {
    pub fn new(
        operation: Operation,
        subject: impl Into<String>,
        zone: Option<String>,
        error: Error,
    ) -> Self {
        Self {
            operation,
            subject: subject.into(),
            zone,
            error,
        }
    }
}

impl fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.operation, self.subject)?;
        if let Some(zone) = &self.zone {
            write!(f, " (zone {})", zone)?;
        }
        write!(f, ": {}", self.error)
    }
}

/// Combined error enumerating every failure of a batch
#[derive(Debug)]
pub struct AggregateError {
    phase: &'static str,
    failures: Vec<OperationFailure>,
}

impl AggregateError {
    /// The failures in the order they were recorded
    pub fn failures(&self) -> &[OperationFailure] {
        &self.failures
    }

    /// Number of recorded failures
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Always false for an error produced by [`FailureCollector::finish`]
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Kinds of the recorded failures, in order
    pub fn kinds(&self) -> Vec<ErrorKind> {
        self.failures.iter().map(|f| f.error.kind()).collect()
    }

    pub fn into_failures(self) -> Vec<OperationFailure> {
        self.failures
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "encountered {} error(s) during {}: ",
            self.failures.len(),
            self.phase
        )?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", failure)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

/// Accumulates per-operation failures for a batch
#[derive(Debug)]
pub struct FailureCollector {
    phase: &'static str,
    failures: Vec<OperationFailure>,
}

impl FailureCollector {
    /// Create a collector; `phase` names the batch in the combined message
    pub fn new(phase: &'static str) -> Self {
        Self {
            phase,
            failures: Vec::new(),
        }
    }

    pub fn record(&mut self, failure: OperationFailure) {
        self.failures.push(failure);
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Order failures with a caller-supplied key (used after concurrent collection)
    pub fn sort_by_key<K: Ord>(&mut self, key: impl FnMut(&OperationFailure) -> K) {
        self.failures.sort_by_key(key);
    }

    /// `None` when nothing failed, otherwise the combined error
    pub fn finish(self) -> Option<AggregateError> {
        if self.failures.is_empty() {
            None
        } else {
            Some(AggregateError {
                phase: self.phase,
                failures: self.failures,
            })
        }
    }
}
