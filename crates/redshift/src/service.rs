//! The remote statement service seam.
//!
//! [`StatementService`] is the three-call contract the poller and
//! materializer consume (`ExecuteStatement`, `DescribeStatement`,
//! `GetStatementResult`, plus `CancelStatement`). [`RedshiftDataService`]
//! implements it over the AWS SDK; tests implement it with scripted fakes.

use async_trait::async_trait;
use aws_sdk_redshiftdata::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_redshiftdata::primitives::DateTime as SmithyDateTime;
use aws_sdk_redshiftdata::types::{ColumnMetadata, Field};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::debug;
use uuid::Uuid;

use crate::error::RedshiftError;
use crate::types::{
    ColumnDescriptor, QueryRequest, RawField, ResultPage, StatementDescription, StatementHandle,
    StatementStatus,
};

/// Operations consumed from the remote SQL execution service.
#[async_trait]
pub trait StatementService: Send + Sync {
    /// Submit a statement and return its identifier.
    async fn execute_statement(
        &self,
        request: &QueryRequest,
    ) -> Result<StatementHandle, RedshiftError>;

    /// Fetch the current status of a statement.
    async fn describe_statement(
        &self,
        handle: &StatementHandle,
    ) -> Result<StatementDescription, RedshiftError>;

    /// Fetch one page of results; `next_token` continues a previous page.
    async fn get_statement_result(
        &self,
        handle: &StatementHandle,
        next_token: Option<&str>,
    ) -> Result<ResultPage, RedshiftError>;

    /// Ask the service to cancel a running statement. Returns the service's
    /// acknowledgement flag.
    async fn cancel_statement(&self, handle: &StatementHandle) -> Result<bool, RedshiftError>;
}

// ---------------------------------------------------------------------------
// SDK-backed implementation
// ---------------------------------------------------------------------------

/// [`StatementService`] over `aws_sdk_redshiftdata::Client`.
///
/// Every call holds a permit from `limiter`, bounding concurrently
/// in-flight requests across all queries sharing this service.
pub struct RedshiftDataService {
    client: aws_sdk_redshiftdata::Client,
    limiter: Semaphore,
}

impl RedshiftDataService {
    pub fn new(client: aws_sdk_redshiftdata::Client, max_concurrency: usize) -> Self {
        Self {
            client,
            limiter: Semaphore::new(max_concurrency.max(1)),
        }
    }

    /// Close the limiter: calls already waiting and every later call fail.
    pub fn close(&self) {
        self.limiter.close();
    }

    async fn permit(&self) -> Result<tokio::sync::SemaphorePermit<'_>, RedshiftError> {
        self.limiter
            .acquire()
            .await
            .map_err(|_| RedshiftError::Configuration("client handle has been closed".into()))
    }
}

#[async_trait]
impl StatementService for RedshiftDataService {
    async fn execute_statement(
        &self,
        request: &QueryRequest,
    ) -> Result<StatementHandle, RedshiftError> {
        let _permit = self.permit().await?;

        let client_token = request
            .client_token
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let resp = self
            .client
            .execute_statement()
            .cluster_identifier(&request.cluster_identifier)
            .database(&request.database)
            .db_user(&request.db_user)
            .sql(&request.sql)
            .set_statement_name(request.statement_name.clone())
            .with_event(request.with_event)
            .client_token(client_token)
            .send()
            .await
            .map_err(|e| map_sdk_error("ExecuteStatement", e))?;

        let id: Option<&str> = resp.id().into();
        let id = id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                RedshiftError::service("ExecuteStatement", "MissingId", "no statement id returned")
            })?;

        StatementHandle::new(id)
    }

    async fn describe_statement(
        &self,
        handle: &StatementHandle,
    ) -> Result<StatementDescription, RedshiftError> {
        let _permit = self.permit().await?;

        let resp = self
            .client
            .describe_statement()
            .id(handle.id())
            .send()
            .await
            .map_err(|e| map_sdk_error("DescribeStatement", e))?;

        let raw_status = resp
            .status()
            .map(|s| s.as_str().to_string())
            .unwrap_or_default();
        let status = StatementStatus::parse(&raw_status).ok_or_else(|| {
            RedshiftError::service(
                "DescribeStatement",
                "UnknownStatus",
                format!("unrecognised statement status '{}'", raw_status),
            )
        })?;

        let has_result_set: Option<bool> = resp.has_result_set().into();
        let result_rows: Option<i64> = resp.result_rows().into();
        let result_size: Option<i64> = resp.result_size().into();
        // Service reports nanoseconds; -1 while unknown.
        let duration_ns: Option<i64> = resp.duration().into();
        let created_at: Option<&SmithyDateTime> = resp.created_at().into();
        let updated_at: Option<&SmithyDateTime> = resp.updated_at().into();

        Ok(StatementDescription {
            id: handle.id().to_string(),
            status,
            error: resp.error().map(str::to_string),
            has_result_set: has_result_set.unwrap_or(false),
            result_rows: result_rows.unwrap_or(-1),
            result_size: result_size.unwrap_or(-1),
            duration: duration_ns
                .filter(|ns| *ns >= 0)
                .map(|ns| Duration::from_nanos(ns as u64)),
            query_string: resp.query_string().map(str::to_string),
            created_at: created_at.and_then(to_chrono),
            updated_at: updated_at.and_then(to_chrono),
        })
    }

    async fn get_statement_result(
        &self,
        handle: &StatementHandle,
        next_token: Option<&str>,
    ) -> Result<ResultPage, RedshiftError> {
        let _permit = self.permit().await?;

        let resp = self
            .client
            .get_statement_result()
            .id(handle.id())
            .set_next_token(next_token.map(str::to_string))
            .send()
            .await
            .map_err(|e| map_sdk_error("GetStatementResult", e))?;

        let columns: Vec<ColumnDescriptor> = resp
            .column_metadata()
            .iter()
            .enumerate()
            .map(|(position, meta)| column_from_sdk(position, meta))
            .collect();

        let records: Vec<Vec<RawField>> = resp
            .records()
            .iter()
            .map(|row| row.iter().map(raw_field_from_sdk).collect())
            .collect();

        let total_num_rows: Option<i64> = resp.total_num_rows().into();

        debug!(
            statement_id = %handle,
            columns = columns.len(),
            rows = records.len(),
            has_next = resp.next_token().is_some(),
            "Fetched result page"
        );

        Ok(ResultPage {
            // The SDK does not distinguish "absent" from "empty" column metadata.
            column_metadata: if columns.is_empty() { None } else { Some(columns) },
            records: Some(records),
            next_token: resp.next_token().map(str::to_string),
            total_num_rows,
        })
    }

    async fn cancel_statement(&self, handle: &StatementHandle) -> Result<bool, RedshiftError> {
        let _permit = self.permit().await?;

        let resp = self
            .client
            .cancel_statement()
            .id(handle.id())
            .send()
            .await
            .map_err(|e| map_sdk_error("CancelStatement", e))?;

        let acknowledged: Option<bool> = resp.status().into();
        Ok(acknowledged.unwrap_or(false))
    }
}

// ---------------------------------------------------------------------------
// SDK conversions
// ---------------------------------------------------------------------------

fn map_sdk_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> RedshiftError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let code = err.code().unwrap_or("Unknown").to_string();
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
    RedshiftError::service(operation, code, message)
}

fn column_from_sdk(position: usize, meta: &ColumnMetadata) -> ColumnDescriptor {
    let nullable: Option<i32> = meta.nullable().into();
    ColumnDescriptor {
        name: meta
            .name()
            .or_else(|| meta.label())
            .unwrap_or_default()
            .to_string(),
        position,
        type_name: meta.type_name().map(str::to_string),
        // 0 = no nulls, 1 = nullable, 2 = unknown (JDBC convention).
        nullable: match nullable {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
    }
}

fn raw_field_from_sdk(field: &Field) -> RawField {
    match field {
        Field::StringValue(s) => RawField::string(s.clone()),
        Field::BooleanValue(b) => RawField::boolean(*b),
        Field::LongValue(n) => RawField::long(*n),
        Field::DoubleValue(d) => RawField::double(*d),
        Field::BlobValue(blob) => RawField {
            blob_value: Some(blob.as_ref().to_vec()),
            ..RawField::default()
        },
        // IsNull and any variant added by a newer SDK.
        _ => RawField::null(),
    }
}

fn to_chrono(dt: &SmithyDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}
