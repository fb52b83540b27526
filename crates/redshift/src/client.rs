//! Redshift Data API query client.
//!
//! Provides [`RedshiftQueryClient`] for running SQL against a provisioned
//! cluster: submit, poll until terminal, then materialize the result into a
//! [`ResultTable`].

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{RedshiftConfig, RoutingConfig};
use crate::error::RedshiftError;
use crate::materialize::Materializer;
use crate::poller::{PollPolicy, Poller};
use crate::provider::ClientHandle;
use crate::result::ResultTable;
use crate::service::StatementService;
use crate::types::{QueryRequest, StatementDescription, StatementHandle};

/// Non-blocking query client.
///
/// Cheap to clone; clones share the service and run independent queries.
#[derive(Clone)]
pub struct RedshiftQueryClient {
    service: Arc<dyn StatementService>,
    routing: RoutingConfig,
    poller: Poller,
    materializer: Materializer,
}

impl RedshiftQueryClient {
    /// Client over an initialized handle, routing and polling taken from `config`.
    pub fn new(handle: &ClientHandle, config: &RedshiftConfig) -> Self {
        Self::with_service(handle.service(), config.routing.clone(), config.poll_policy())
    }

    /// Client over any [`StatementService`] implementation.
    pub fn with_service(
        service: Arc<dyn StatementService>,
        routing: RoutingConfig,
        policy: PollPolicy,
    ) -> Self {
        Self {
            poller: Poller::new(service.clone(), policy),
            materializer: Materializer::new(service.clone()),
            service,
            routing,
        }
    }

    pub fn routing(&self) -> &RoutingConfig {
        &self.routing
    }

    pub fn poll_policy(&self) -> &PollPolicy {
        self.poller.policy()
    }

    // -----------------------------------------------------------------------
    // Full lifecycle
    // -----------------------------------------------------------------------

    /// Run `sql` against the configured cluster and return its result.
    pub async fn query_async(&self, sql: &str) -> Result<ResultTable, RedshiftError> {
        self.query_async_with_cancel(sql, &CancellationToken::new())
            .await
    }

    /// Like [`query_async`](Self::query_async), abandoning the wait when
    /// `cancel` fires. The statement keeps running on the service.
    pub async fn query_async_with_cancel(
        &self,
        sql: &str,
        cancel: &CancellationToken,
    ) -> Result<ResultTable, RedshiftError> {
        let request = QueryRequest::new(sql, &self.routing);
        self.execute(&request, cancel).await
    }

    /// Submit → wait → fetch for an explicit request.
    pub async fn execute(
        &self,
        request: &QueryRequest,
        cancel: &CancellationToken,
    ) -> Result<ResultTable, RedshiftError> {
        let handle = self.submit(request).await?;
        let desc = self.poller.wait(&handle, cancel).await?;
        self.materializer.fetch_finished(&handle, &desc).await
    }

    // -----------------------------------------------------------------------
    // Individual steps
    // -----------------------------------------------------------------------

    /// Submit a statement. Service rejections propagate unchanged.
    pub async fn submit(&self, request: &QueryRequest) -> Result<StatementHandle, RedshiftError> {
        info!(
            cluster = %request.cluster_identifier,
            database = %request.database,
            sql = %request.sql,
            "Submitting statement"
        );

        match self.service.execute_statement(request).await {
            Ok(handle) => {
                info!(statement_id = %handle, "Statement submitted");
                Ok(handle)
            }
            Err(e) => {
                warn!(error = %e, "Statement submission failed");
                Err(e)
            }
        }
    }

    /// Single status check. FAILED / ABORTED are returned as errors.
    pub async fn status(
        &self,
        handle: &StatementHandle,
    ) -> Result<StatementDescription, RedshiftError> {
        self.poller.poll_once(handle).await
    }

    /// Poll until the statement finishes.
    pub async fn wait(
        &self,
        handle: &StatementHandle,
        cancel: &CancellationToken,
    ) -> Result<StatementDescription, RedshiftError> {
        self.poller.wait(handle, cancel).await
    }

    /// Fetch results; fails with a precondition error unless FINISHED.
    pub async fn fetch_results(
        &self,
        handle: &StatementHandle,
    ) -> Result<ResultTable, RedshiftError> {
        self.materializer.fetch_results(handle).await
    }

    /// Ask the service to cancel a running statement.
    pub async fn cancel_statement(&self, handle: &StatementHandle) -> Result<bool, RedshiftError> {
        info!(statement_id = %handle, "Cancelling statement");
        let acknowledged = self.service.cancel_statement(handle).await?;
        info!(statement_id = %handle, acknowledged, "Statement cancellation requested");
        Ok(acknowledged)
    }
}
