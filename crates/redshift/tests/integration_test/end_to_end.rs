//! Async lifecycle: submission, polling, failures, cancellation and ordering.

use std::time::Duration;

use futures::future::join_all;
use redquery_core::FieldValue;
use redquery_redshift::*;

use crate::fake::{client, FakeService, Script};

use StatementStatus::*;

#[tokio::test(start_paused = true)]
async fn test_select_firstname_end_to_end() {
    let svc = FakeService::new(vec![Script::finishing(
        &[Submitted, Started, Finished],
        "firstname",
        &["Alice", "Bob"],
    )]);

    let table = client(svc.clone())
        .query_async("SELECT firstname FROM Users LIMIT 10")
        .await
        .expect("query should succeed");

    assert_eq!(table.statement_id(), "stmt-1");
    let records = table.text_records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["firstname"], "Alice");
    assert_eq!(records[1]["firstname"], "Bob");

    let json: serde_json::Value = serde_json::from_str(&table.to_json().unwrap()).unwrap();
    assert_eq!(
        json,
        serde_json::json!([{ "firstname": "Alice" }, { "firstname": "Bob" }])
    );

    assert_eq!(svc.count("execute:SELECT firstname FROM Users LIMIT 10"), 1);
    assert_eq!(svc.count("describe:stmt-1"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_failed_statement_reports_service_detail() {
    let svc = FakeService::new(vec![Script::failing(Failed, "syntax error")]);

    let err = client(svc.clone())
        .query_async("SELEC 1")
        .await
        .unwrap_err();

    assert!(err.is_query_failure(), "{err:?}");
    assert!(err.to_string().contains("syntax error"));
    assert_eq!(svc.count("result:"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_aborted_statement_is_query_failure() {
    let svc = FakeService::new(vec![Script::failing(Aborted, "cancelled by user")]);

    let err = client(svc).query_async("SELECT 1").await.unwrap_err();
    match err {
        RedshiftError::QueryExecution { status, detail, .. } => {
            assert_eq!(status, Aborted);
            assert_eq!(detail, "cancelled by user");
        }
        other => panic!("expected QueryExecution, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_submission_failure_propagates() {
    let svc = FakeService::rejecting("Cluster redshift-cluster-missing not found");

    let err = client(svc.clone())
        .query_async("SELECT 1")
        .await
        .unwrap_err();

    match err {
        RedshiftError::Service { operation, code, message } => {
            assert_eq!(operation, "ExecuteStatement");
            assert_eq!(code, "ValidationException");
            assert!(message.contains("not found"));
        }
        other => panic!("expected Service error, got {other:?}"),
    }
    // No poll on a bogus handle.
    assert_eq!(svc.count("describe:"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_never_precedes_finished() {
    let svc = FakeService::new(vec![Script::finishing(
        &[Submitted, Picked, Started, Finished],
        "n",
        &["1"],
    )]);

    client(svc.clone()).query_async("SELECT 1 AS n").await.unwrap();

    let events = svc.events();
    let first_result = events.iter().position(|e| e.starts_with("result:")).unwrap();
    let finished = events
        .iter()
        .position(|e| e == "describe:stmt-1:FINISHED")
        .unwrap();
    assert!(finished < first_result, "{events:?}");
}

#[tokio::test(start_paused = true)]
async fn test_fetch_results_is_idempotent() {
    let svc = FakeService::new(vec![Script::finishing(&[Finished], "firstname", &["Alice", "Bob"])]);
    let client = client(svc);

    let handle = client
        .submit(&QueryRequest::new("SELECT firstname FROM Users", client.routing()))
        .await
        .unwrap();
    client.wait(&handle, &CancellationToken::new()).await.unwrap();

    let first = client.fetch_results(&handle).await.unwrap();
    let second = client.fetch_results(&handle).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_fetch_results_before_finished_is_precondition_error() {
    let svc = FakeService::new(vec![Script::forever_pending()]);
    let client = client(svc.clone());

    let handle = client
        .submit(&QueryRequest::new("SELECT pg_sleep(600)", client.routing()))
        .await
        .unwrap();

    let err = client.fetch_results(&handle).await.unwrap_err();
    assert!(matches!(err, RedshiftError::Precondition(_)), "{err}");
    assert_eq!(svc.count("result:"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_paginated_results_accumulate_in_order() {
    let script = Script {
        statuses: vec![Started, Finished],
        error: None,
        columns: vec!["id", "active"],
        pages: vec![
            vec![
                vec![RawField::long(1), RawField::boolean(true)],
                vec![RawField::long(2), RawField::null()],
            ],
            vec![vec![RawField::long(3), RawField::boolean(false)]],
        ],
    };
    let svc = FakeService::new(vec![script]);

    let table = client(svc.clone()).query_async("SELECT id, active FROM t").await.unwrap();

    assert_eq!(table.row_count(), 3);
    assert_eq!(table.get(0, "id"), Some(&FieldValue::Long(1)));
    assert_eq!(table.get(1, "active"), Some(&FieldValue::Null));
    assert_eq!(table.get(2, "id"), Some(&FieldValue::Long(3)));
    assert_eq!(svc.count("result:stmt-1"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_stops_local_observation_only() {
    let svc = FakeService::new(vec![Script::forever_pending()]);
    let client = client(svc.clone());
    let token = CancellationToken::new();

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        canceller.cancel();
    });

    let err = client
        .query_async_with_cancel("SELECT pg_sleep(600)", &token)
        .await
        .unwrap_err();

    assert!(matches!(err, RedshiftError::Interrupted { .. }), "{err}");
    assert!(err.is_local_abort());
    // Remote execution is left alone.
    assert_eq!(svc.cancels.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert!(svc.count("describe:stmt-1") >= 10);
}

#[tokio::test(start_paused = true)]
async fn test_poll_ceiling_leaves_statement_running() {
    let svc = FakeService::new(vec![Script::forever_pending()]);
    let client = RedshiftQueryClient::with_service(
        svc.clone(),
        crate::fake::routing(),
        PollPolicy::default().with_max_attempts(5),
    );

    let err = client.query_async("SELECT pg_sleep(600)").await.unwrap_err();
    assert!(matches!(err, RedshiftError::PollTimeout { attempts: 5, .. }));
    assert_eq!(svc.count("describe:"), 5);
    assert_eq!(svc.count("cancel:"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_explicit_remote_cancel() {
    let svc = FakeService::new(vec![Script::forever_pending()]);
    let client = client(svc.clone());

    let handle = client
        .submit(&QueryRequest::new("SELECT pg_sleep(600)", client.routing()))
        .await
        .unwrap();
    assert!(client.cancel_statement(&handle).await.unwrap());
    assert_eq!(svc.count("cancel:stmt-1"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_queries_are_independent() {
    let scripts = (0..8)
        .map(|i| {
            let pending = vec![Submitted; i % 4];
            let mut statuses = pending;
            statuses.push(Finished);
            Script {
                statuses,
                error: None,
                columns: vec!["n"],
                pages: vec![vec![vec![RawField::long(i as i64)]]],
            }
        })
        .collect();
    let svc = FakeService::new(scripts);
    let client = client(svc);

    let results = join_all((0..8).map(|_| {
        let client = client.clone();
        async move { client.query_async("SELECT n FROM numbers").await }
    }))
    .await;

    let mut ids: Vec<String> = Vec::new();
    for table in results {
        let table = table.expect("every query should succeed");
        assert_eq!(table.row_count(), 1);
        // stmt-k received script k-1, whose single row holds k-1.
        let k: i64 = table.statement_id().trim_start_matches("stmt-").parse().unwrap();
        assert_eq!(table.get(0, "n"), Some(&FieldValue::Long(k - 1)));
        ids.push(table.statement_id().to_string());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);
}
