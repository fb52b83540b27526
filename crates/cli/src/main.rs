mod bench;
mod cli;

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use redquery_redshift::{
    BlockingQueryClient, CancellationToken, ClientProvider, Interrupt, RedshiftConfig,
    RedshiftQueryClient, ResultTable,
};

use crate::cli::{CliArgs, Command, OutputFormat};

#[tokio::main]
async fn main() -> Result<()> {
    redquery_core::config::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let mut config = RedshiftConfig::from_env();
    args.apply_overrides(&mut config);
    if !config.is_configured() {
        anyhow::bail!("no cluster configured: pass --cluster-id or set REDSHIFT_CLUSTER_ID");
    }
    info!(config = %config.redacted_summary(), "Configuration loaded");

    let provider = ClientProvider::new();
    let handle = provider
        .get_or_init(&config)
        .await
        .context("failed to initialise Redshift Data client")?;
    let client = RedshiftQueryClient::new(&handle, &config);

    let outcome = match args.command {
        Command::Query {
            sql,
            use_async,
            format,
        } => run_query(&client, sql, use_async, format).await,
        Command::Bench {
            sql,
            iterations,
            concurrency,
        } => {
            info!(iterations, concurrency, "Starting benchmark");
            bench::run(&client, &sql, iterations, concurrency)
                .await
                .map(|stats| {
                    for line in stats {
                        println!("{line}");
                    }
                })
        }
    };

    handle.close();
    outcome
}

async fn run_query(
    client: &RedshiftQueryClient,
    sql: String,
    use_async: bool,
    format: OutputFormat,
) -> Result<()> {
    let started = Instant::now();

    let table = if use_async {
        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, abandoning wait");
                on_signal.cancel();
            }
        });
        client
            .query_async_with_cancel(&sql, &cancel)
            .await
            .context("query failed")?
    } else {
        let interrupt = Interrupt::new();
        let on_signal = interrupt.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, abandoning wait");
                on_signal.interrupt();
            }
        });
        let blocking_client = client.clone();
        tokio::task::spawn_blocking(move || -> Result<ResultTable> {
            let blocking = BlockingQueryClient::new(blocking_client)?;
            Ok(blocking.query_interruptible(&sql, &interrupt)?)
        })
        .await
        .context("query task panicked")?
        .context("query failed")?
    };

    print_table(&table, format)?;
    println!("Time taken: {}", started.elapsed().as_millis());
    Ok(())
}

fn print_table(table: &ResultTable, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", table.to_json()?),
        OutputFormat::TypedJson => println!("{}", table.to_typed_json()?),
        OutputFormat::Table => println!("{table}"),
    }
    Ok(())
}
