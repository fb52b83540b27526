//! Blocking façade: same contract as the async path, on the caller's thread.

use std::thread;
use std::time::{Duration, Instant};

use redquery_redshift::*;

use crate::fake::{client, FakeService, Script};

use StatementStatus::*;

#[test]
fn test_blocking_query_end_to_end() {
    let svc = FakeService::new(vec![Script::finishing(
        &[Submitted, Started, Finished],
        "firstname",
        &["Alice", "Bob"],
    )]);
    let blocking = BlockingQueryClient::new(client(svc.clone())).unwrap();

    let table = blocking
        .query("SELECT firstname FROM Users LIMIT 10")
        .unwrap();

    let json: serde_json::Value = serde_json::from_str(&table.to_json().unwrap()).unwrap();
    assert_eq!(
        json,
        serde_json::json!([{ "firstname": "Alice" }, { "firstname": "Bob" }])
    );
    assert_eq!(svc.count("describe:"), 3);
}

#[test]
fn test_blocking_failure_surfaces_detail() {
    let svc = FakeService::new(vec![Script::failing(Failed, "syntax error")]);
    let blocking = BlockingQueryClient::new(client(svc)).unwrap();

    let err = blocking.query("SELEC 1").unwrap_err();
    assert!(err.is_query_failure());
    assert!(err.to_string().contains("syntax error"));
}

#[test]
fn test_interrupt_from_another_thread() {
    let svc = FakeService::new(vec![Script::forever_pending()]);
    let blocking = BlockingQueryClient::new(client(svc.clone())).unwrap();
    let interrupt = Interrupt::new();

    let remote = interrupt.clone();
    let interrupter = thread::spawn(move || {
        thread::sleep(Duration::from_millis(350));
        remote.interrupt();
    });

    let started = Instant::now();
    let err = blocking
        .query_interruptible("SELECT pg_sleep(600)", &interrupt)
        .unwrap_err();
    interrupter.join().unwrap();

    assert!(matches!(err, RedshiftError::Interrupted { .. }), "{err}");
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(svc.count("cancel:"), 0);
}

#[test]
fn test_blocking_step_by_step() {
    let svc = FakeService::new(vec![Script::finishing(&[Started, Started, Finished], "n", &["42"])]);
    let blocking = BlockingQueryClient::new(client(svc)).unwrap();

    let request = QueryRequest::new("SELECT 42 AS n", blocking.inner().routing())
        .with_statement_name("answer");
    let handle = blocking.submit(&request).unwrap();

    assert_eq!(blocking.status(&handle).unwrap().status, Started);
    assert!(matches!(
        blocking.fetch_results(&handle),
        Err(RedshiftError::Precondition(_))
    ));

    let desc = blocking.wait(&handle, &Interrupt::new()).unwrap();
    assert_eq!(desc.status, Finished);

    let table = blocking.fetch_results(&handle).unwrap();
    assert_eq!(table.get(0, "n").map(|v| v.as_text()), Some("42".to_string()));
}
