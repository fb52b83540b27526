//! Tests against a real cluster.

use redquery_redshift::*;

/// This test requires valid AWS credentials and network access.
///
/// Run with: `cargo test test_real_redshift_query -- --ignored`
///
/// Set environment variables before running:
/// - `REDSHIFT_CLUSTER_ID=<your-cluster>`
/// - `REDSHIFT_DATABASE` / `REDSHIFT_DB_USER` if not `dev` / `awsuser`
/// - AWS credentials via `REDSHIFT_AWS_PROFILE`, env vars, or ~/.aws/credentials
#[tokio::test]
#[ignore]
async fn test_real_redshift_query() {
    let config = RedshiftConfig::from_env();
    assert!(config.is_configured(), "REDSHIFT_CLUSTER_ID must be set");

    let provider = ClientProvider::new();
    let handle = provider
        .get_or_init(&config)
        .await
        .expect("Failed to initialise Redshift Data client");

    let client = RedshiftQueryClient::new(&handle, &config);
    let result = client
        .query_async("SELECT 1 AS test_column")
        .await
        .expect("Query execution failed");

    assert_eq!(result.column_count(), 1);
    assert_eq!(result.row_count(), 1);
    assert_eq!(result.column_index("test_column"), Some(0));

    println!("Real Redshift query succeeded!");
    println!("{}", result);
}
