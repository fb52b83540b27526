//! Scripted in-memory statement service.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use redquery_redshift::*;

/// Everything the fake should answer for one statement.
#[derive(Clone)]
pub struct Script {
    pub statuses: Vec<StatementStatus>,
    pub error: Option<String>,
    pub columns: Vec<&'static str>,
    pub pages: Vec<Vec<Vec<RawField>>>,
}

impl Script {
    pub fn finishing(statuses: &[StatementStatus], column: &'static str, values: &[&str]) -> Self {
        Self {
            statuses: statuses.to_vec(),
            error: None,
            columns: vec![column],
            pages: vec![values.iter().map(|v| vec![RawField::string(*v)]).collect()],
        }
    }

    pub fn failing(status: StatementStatus, error: &str) -> Self {
        Self {
            statuses: vec![StatementStatus::Submitted, status],
            error: Some(error.to_string()),
            columns: vec![],
            pages: vec![],
        }
    }

    pub fn forever_pending() -> Self {
        Self {
            statuses: vec![StatementStatus::Started],
            error: None,
            columns: vec![],
            pages: vec![],
        }
    }
}

struct Statement {
    statuses: VecDeque<StatementStatus>,
    script: Script,
}

/// Hands out ids `stmt-1`, `stmt-2`, ... and replays one script per id.
///
/// Scripts are consumed in submission order; the last status of a script
/// repeats once reached.
#[derive(Default)]
pub struct FakeService {
    scripts: Mutex<VecDeque<Script>>,
    statements: Mutex<HashMap<String, Statement>>,
    reject_submit: Mutex<Option<String>>,
    next_id: AtomicU32,
    pub events: Mutex<Vec<String>>,
    pub cancels: AtomicU32,
}

impl FakeService {
    pub fn new(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            ..Self::default()
        })
    }

    pub fn rejecting(message: &str) -> Arc<Self> {
        let svc = Self::default();
        *svc.reject_submit.lock().unwrap() = Some(message.to_string());
        Arc::new(svc)
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events().iter().filter(|e| e.starts_with(prefix)).count()
    }

    fn log(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn unknown(operation: &'static str, id: &str) -> RedshiftError {
        RedshiftError::Service {
            operation,
            code: "ResourceNotFoundException".into(),
            message: format!("statement {} not found", id),
        }
    }
}

#[async_trait]
impl StatementService for FakeService {
    async fn execute_statement(
        &self,
        request: &QueryRequest,
    ) -> Result<StatementHandle, RedshiftError> {
        self.log(format!("execute:{}", request.sql));

        if let Some(message) = self.reject_submit.lock().unwrap().clone() {
            return Err(RedshiftError::Service {
                operation: "ExecuteStatement",
                code: "ValidationException".into(),
                message,
            });
        }

        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .expect("no script left for submission");
        let id = format!("stmt-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);

        self.statements.lock().unwrap().insert(
            id.clone(),
            Statement {
                statuses: script.statuses.clone().into(),
                script,
            },
        );
        StatementHandle::new(id)
    }

    async fn describe_statement(
        &self,
        handle: &StatementHandle,
    ) -> Result<StatementDescription, RedshiftError> {
        let mut statements = self.statements.lock().unwrap();
        let stmt = statements
            .get_mut(handle.id())
            .ok_or_else(|| Self::unknown("DescribeStatement", handle.id()))?;

        let status = if stmt.statuses.len() > 1 {
            stmt.statuses.pop_front().unwrap()
        } else {
            *stmt.statuses.front().unwrap()
        };
        drop(statements);
        self.log(format!("describe:{}:{}", handle, status));

        let statements = self.statements.lock().unwrap();
        let script = &statements[handle.id()].script;
        let mut desc = StatementDescription::with_status(handle.id(), status);
        desc.has_result_set = status == StatementStatus::Finished && !script.columns.is_empty();
        if status.is_terminal() && status != StatementStatus::Finished {
            desc.error = script.error.clone();
        }
        Ok(desc)
    }

    async fn get_statement_result(
        &self,
        handle: &StatementHandle,
        next_token: Option<&str>,
    ) -> Result<ResultPage, RedshiftError> {
        self.log(format!("result:{}:{}", handle, next_token.unwrap_or("-")));

        let statements = self.statements.lock().unwrap();
        let stmt = statements
            .get(handle.id())
            .ok_or_else(|| Self::unknown("GetStatementResult", handle.id()))?;

        let index: usize = next_token.map(|t| t.parse().unwrap()).unwrap_or(0);
        let records = stmt.script.pages.get(index).cloned().unwrap_or_default();
        let next = (index + 1 < stmt.script.pages.len()).then(|| (index + 1).to_string());

        Ok(ResultPage {
            column_metadata: Some(
                stmt.script
                    .columns
                    .iter()
                    .enumerate()
                    .map(|(i, name)| ColumnDescriptor::new(*name, i).with_type("varchar"))
                    .collect(),
            ),
            records: Some(records),
            next_token: next,
            total_num_rows: None,
        })
    }

    async fn cancel_statement(&self, handle: &StatementHandle) -> Result<bool, RedshiftError> {
        self.log(format!("cancel:{}", handle));
        self.cancels.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}

pub fn routing() -> RoutingConfig {
    RoutingConfig {
        cluster_identifier: "redshift-cluster-integration".into(),
        database: "dev".into(),
        db_user: "awsuser".into(),
    }
}

pub fn client(service: Arc<FakeService>) -> RedshiftQueryClient {
    RedshiftQueryClient::with_service(service, routing(), PollPolicy::default())
}
