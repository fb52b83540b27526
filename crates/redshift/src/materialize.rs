//! Result materialization: page through `GetStatementResult` and decode
//! every field into a [`ResultTable`].

use std::sync::Arc;

use tracing::{debug, info};

use redquery_core::FieldValue;

use crate::error::RedshiftError;
use crate::result::ResultTable;
use crate::service::StatementService;
use crate::types::{ColumnDescriptor, StatementDescription, StatementHandle, StatementStatus};

#[derive(Clone)]
pub struct Materializer {
    service: Arc<dyn StatementService>,
}

impl Materializer {
    pub fn new(service: Arc<dyn StatementService>) -> Self {
        Self { service }
    }

    /// Fetch the full result of a statement.
    ///
    /// Describes the statement first and fails with
    /// [`RedshiftError::Precondition`] unless it has FINISHED.
    pub async fn fetch_results(
        &self,
        handle: &StatementHandle,
    ) -> Result<ResultTable, RedshiftError> {
        let desc = self.service.describe_statement(handle).await?;
        if desc.status != StatementStatus::Finished {
            return Err(RedshiftError::Precondition(format!(
                "statement {} is {}, results are only available once FINISHED",
                handle, desc.status
            )));
        }
        self.fetch_finished(handle, &desc).await
    }

    /// Fetch results for a statement already observed as FINISHED.
    pub(crate) async fn fetch_finished(
        &self,
        handle: &StatementHandle,
        desc: &StatementDescription,
    ) -> Result<ResultTable, RedshiftError> {
        if !desc.has_result_set {
            debug!(statement_id = %handle, "Statement has no result set");
            return Ok(ResultTable::empty(handle.id()));
        }

        let mut columns: Option<Vec<ColumnDescriptor>> = None;
        let mut rows: Vec<Vec<FieldValue>> = Vec::new();
        let mut next_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .service
                .get_statement_result(handle, next_token.as_deref())
                .await?;
            pages += 1;

            // Column metadata is only guaranteed on the first page.
            if columns.is_none() {
                let meta = page.column_metadata.ok_or_else(|| {
                    RedshiftError::Precondition(format!(
                        "no column metadata returned for statement {}",
                        handle
                    ))
                })?;
                columns = Some(meta);
            }

            let records = page.records.ok_or_else(|| {
                RedshiftError::Precondition(format!(
                    "no records returned for statement {}",
                    handle
                ))
            })?;
            rows.extend(
                records
                    .iter()
                    .map(|record| record.iter().map(|field| field.decode()).collect::<Vec<_>>()),
            );

            match page.next_token.filter(|t| !t.is_empty()) {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        let columns = columns.unwrap_or_default();

        info!(
            statement_id = %handle,
            columns = columns.len(),
            rows = rows.len(),
            pages,
            "Materialized statement result"
        );

        ResultTable::new(handle.id(), columns, rows)
    }
}
