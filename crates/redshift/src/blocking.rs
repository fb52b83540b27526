//! Blocking façade over [`RedshiftQueryClient`].
//!
//! The whole submit → poll → fetch lifecycle runs on the calling thread
//! through a private current-thread runtime. Must not be used from inside
//! an async context; use [`RedshiftQueryClient`] there.

use tokio::runtime::{Builder, Runtime};
use tokio_util::sync::CancellationToken;

use crate::client::RedshiftQueryClient;
use crate::error::RedshiftError;
use crate::result::ResultTable;
use crate::types::{QueryRequest, StatementDescription, StatementHandle};

/// Interrupt flag another thread can raise to abandon a blocking wait.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    token: CancellationToken,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt(&self) {
        self.token.cancel();
    }

    pub fn is_interrupted(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

pub struct BlockingQueryClient {
    inner: RedshiftQueryClient,
    runtime: Runtime,
}

impl BlockingQueryClient {
    pub fn new(inner: RedshiftQueryClient) -> Result<Self, RedshiftError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                RedshiftError::Configuration(format!("failed to start blocking runtime: {}", e))
            })?;
        Ok(Self { inner, runtime })
    }

    pub fn inner(&self) -> &RedshiftQueryClient {
        &self.inner
    }

    /// Run `sql` to completion on the calling thread.
    pub fn query(&self, sql: &str) -> Result<ResultTable, RedshiftError> {
        self.query_interruptible(sql, &Interrupt::new())
    }

    /// Run `sql`, returning [`RedshiftError::Interrupted`] if `interrupt` is
    /// raised before the statement finishes.
    pub fn query_interruptible(
        &self,
        sql: &str,
        interrupt: &Interrupt,
    ) -> Result<ResultTable, RedshiftError> {
        self.runtime
            .block_on(self.inner.query_async_with_cancel(sql, interrupt.token()))
    }

    pub fn execute(
        &self,
        request: &QueryRequest,
        interrupt: &Interrupt,
    ) -> Result<ResultTable, RedshiftError> {
        self.runtime
            .block_on(self.inner.execute(request, interrupt.token()))
    }

    pub fn submit(&self, request: &QueryRequest) -> Result<StatementHandle, RedshiftError> {
        self.runtime.block_on(self.inner.submit(request))
    }

    pub fn status(&self, handle: &StatementHandle) -> Result<StatementDescription, RedshiftError> {
        self.runtime.block_on(self.inner.status(handle))
    }

    pub fn wait(
        &self,
        handle: &StatementHandle,
        interrupt: &Interrupt,
    ) -> Result<StatementDescription, RedshiftError> {
        self.runtime
            .block_on(self.inner.wait(handle, interrupt.token()))
    }

    pub fn fetch_results(&self, handle: &StatementHandle) -> Result<ResultTable, RedshiftError> {
        self.runtime.block_on(self.inner.fetch_results(handle))
    }

    pub fn cancel_statement(&self, handle: &StatementHandle) -> Result<bool, RedshiftError> {
        self.runtime.block_on(self.inner.cancel_statement(handle))
    }
}
