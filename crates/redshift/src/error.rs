//! Error taxonomy for Redshift Data API operations.

use crate::types::StatementStatus;

/// Errors that can occur while submitting, polling, or fetching a statement.
///
/// Nothing here is retried by this crate; transport-level retries are owned
/// by the SDK's retry configuration.
#[derive(Debug, thiserror::Error)]
pub enum RedshiftError {
    /// Region or credentials could not be resolved.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The service rejected a request.
    #[error("{operation} rejected by service ({code}): {message}")]
    Service {
        operation: &'static str,
        code: String,
        message: String,
    },

    /// The statement reached FAILED or ABORTED on the service side.
    #[error("Statement {statement_id} {status}: {detail}")]
    QueryExecution {
        statement_id: String,
        status: StatementStatus,
        detail: String,
    },

    /// Results were requested for a statement that has not finished.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Local observation was cancelled before a terminal status was seen.
    #[error("Interrupted while waiting for statement {statement_id}")]
    Interrupted { statement_id: String },

    /// The local poll ceiling was reached; the statement may still be running.
    #[error("Statement {statement_id} still pending after {attempts} polls ({elapsed_ms}ms)")]
    PollTimeout {
        statement_id: String,
        attempts: u32,
        elapsed_ms: u64,
    },

    /// The service returned result data that does not line up with its metadata.
    #[error("Malformed result: {0}")]
    MalformedResult(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RedshiftError {
    pub(crate) fn service(
        operation: &'static str,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        RedshiftError::Service {
            operation,
            code: code.into(),
            message: message.into(),
        }
    }

    /// True for the terminal FAILED / ABORTED outcome of a statement.
    pub fn is_query_failure(&self) -> bool {
        matches!(self, RedshiftError::QueryExecution { .. })
    }

    /// True when the caller gave up waiting rather than the query failing.
    pub fn is_local_abort(&self) -> bool {
        matches!(
            self,
            RedshiftError::Interrupted { .. } | RedshiftError::PollTimeout { .. }
        )
    }
}
