//! Request, handle, status and wire-level types shared by every component.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use redquery_core::FieldValue;

use crate::config::RoutingConfig;
use crate::error::RedshiftError;

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// One SQL statement plus the routing needed to run it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub sql: String,
    pub cluster_identifier: String,
    pub database: String,
    pub db_user: String,
    /// Label shown in the Redshift console / `ListStatements`.
    #[serde(default)]
    pub statement_name: Option<String>,
    /// Emit an EventBridge event when the statement finishes.
    #[serde(default)]
    pub with_event: bool,
    /// Idempotency token; a fresh one is generated at submission when unset.
    #[serde(default)]
    pub client_token: Option<String>,
}

impl QueryRequest {
    pub fn new(sql: impl Into<String>, routing: &RoutingConfig) -> Self {
        Self {
            sql: sql.into(),
            cluster_identifier: routing.cluster_identifier.clone(),
            database: routing.database.clone(),
            db_user: routing.db_user.clone(),
            statement_name: None,
            with_event: false,
            client_token: None,
        }
    }

    pub fn with_statement_name(mut self, name: impl Into<String>) -> Self {
        self.statement_name = Some(name.into());
        self
    }

    pub fn with_event(mut self, enabled: bool) -> Self {
        self.with_event = enabled;
        self
    }

    pub fn with_client_token(mut self, token: impl Into<String>) -> Self {
        self.client_token = Some(token.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Service-issued statement identifier. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StatementHandle(String);

impl StatementHandle {
    pub fn new(id: impl Into<String>) -> Result<Self, RedshiftError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(RedshiftError::Precondition(
                "statement id must not be empty".into(),
            ));
        }
        Ok(Self(id))
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StatementHandle {
    type Error = RedshiftError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StatementHandle> for String {
    fn from(handle: StatementHandle) -> Self {
        handle.0
    }
}

impl fmt::Display for StatementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status reported by `DescribeStatement`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementStatus {
    Submitted,
    Picked,
    Started,
    Finished,
    Failed,
    Aborted,
}

impl StatementStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StatementStatus::Finished | StatementStatus::Failed | StatementStatus::Aborted
        )
    }

    pub fn is_pending(self) -> bool {
        !self.is_terminal()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatementStatus::Submitted => "SUBMITTED",
            StatementStatus::Picked => "PICKED",
            StatementStatus::Started => "STARTED",
            StatementStatus::Finished => "FINISHED",
            StatementStatus::Failed => "FAILED",
            StatementStatus::Aborted => "ABORTED",
        }
    }

    /// Parse the wire string (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "SUBMITTED" => Some(StatementStatus::Submitted),
            "PICKED" => Some(StatementStatus::Picked),
            "STARTED" => Some(StatementStatus::Started),
            "FINISHED" => Some(StatementStatus::Finished),
            "FAILED" => Some(StatementStatus::Failed),
            "ABORTED" => Some(StatementStatus::Aborted),
            _ => None,
        }
    }
}

impl fmt::Display for StatementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot returned by `DescribeStatement`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementDescription {
    pub id: String,
    pub status: StatementStatus,
    /// Service-reported error text for FAILED / ABORTED statements.
    pub error: Option<String>,
    pub has_result_set: bool,
    /// `-1` when the service does not know yet.
    pub result_rows: i64,
    pub result_size: i64,
    /// Time the statement spent executing.
    pub duration: Option<Duration>,
    pub query_string: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl StatementDescription {
    /// Minimal description carrying only an id and a status.
    pub fn with_status(id: impl Into<String>, status: StatementStatus) -> Self {
        Self {
            id: id.into(),
            status,
            error: None,
            has_result_set: status == StatementStatus::Finished,
            result_rows: -1,
            result_size: -1,
            duration: None,
            query_string: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn error_detail(&self) -> String {
        self.error.clone().unwrap_or_else(|| "unknown".to_string())
    }
}

// ---------------------------------------------------------------------------
// Result wire types
// ---------------------------------------------------------------------------

/// Column metadata from `GetStatementResult`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Zero-based position in the result set.
    pub position: usize,
    /// Redshift type name (e.g. "varchar", "int8", "bool").
    #[serde(default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub nullable: Option<bool>,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, position: usize) -> Self {
        Self {
            name: name.into(),
            position,
            type_name: None,
            nullable: None,
        }
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }
}

/// A field as it arrives on the wire, one optional slot per representation.
///
/// The SDK fills exactly one slot; other sources may fill several, so
/// [`RawField::decode`] applies a fixed precedence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawField {
    #[serde(default)]
    pub is_null: Option<bool>,
    #[serde(default)]
    pub string_value: Option<String>,
    #[serde(default)]
    pub boolean_value: Option<bool>,
    #[serde(default)]
    pub long_value: Option<i64>,
    #[serde(default)]
    pub double_value: Option<f64>,
    #[serde(default)]
    pub blob_value: Option<Vec<u8>>,
}

impl RawField {
    pub fn null() -> Self {
        Self {
            is_null: Some(true),
            ..Self::default()
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self {
            string_value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn boolean(value: bool) -> Self {
        Self {
            boolean_value: Some(value),
            ..Self::default()
        }
    }

    pub fn long(value: i64) -> Self {
        Self {
            long_value: Some(value),
            ..Self::default()
        }
    }

    pub fn double(value: f64) -> Self {
        Self {
            double_value: Some(value),
            ..Self::default()
        }
    }

    /// Decode with precedence string > boolean > long > double > blob.
    /// An explicit `is_null` wins over any value slot; nothing set decodes
    /// to `Null`.
    pub fn decode(&self) -> FieldValue {
        match self {
            RawField { is_null: Some(true), .. } => FieldValue::Null,
            RawField { string_value: Some(s), .. } => FieldValue::String(s.clone()),
            RawField { boolean_value: Some(b), .. } => FieldValue::Boolean(*b),
            RawField { long_value: Some(n), .. } => FieldValue::Long(*n),
            RawField { double_value: Some(d), .. } => FieldValue::Double(*d),
            RawField { blob_value: Some(bytes), .. } => {
                FieldValue::String(String::from_utf8_lossy(bytes).into_owned())
            }
            _ => FieldValue::Null,
        }
    }
}

/// One page of `GetStatementResult` output.
///
/// `column_metadata` / `records` are `None` when the service omitted them,
/// which the materializer treats as "results not available".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultPage {
    pub column_metadata: Option<Vec<ColumnDescriptor>>,
    pub records: Option<Vec<Vec<RawField>>>,
    pub next_token: Option<String>,
    pub total_num_rows: Option<i64>,
}
