//! Blocking vs non-blocking timing comparison.

use std::fmt;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use tracing::info;

use redquery_redshift::{BlockingQueryClient, RedshiftQueryClient};

/// Timing summary for one execution mode.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchStats {
    pub mode: &'static str,
    pub runs: usize,
    pub min: Duration,
    pub mean: Duration,
    pub max: Duration,
    /// Wall-clock time for the whole mode.
    pub total: Duration,
}

/// Reduce per-query latencies to min/mean/max. `None` when nothing ran.
pub fn summarize(mode: &'static str, samples: &[Duration], total: Duration) -> Option<BenchStats> {
    let min = samples.iter().min().copied()?;
    let max = samples.iter().max().copied()?;
    let sum: Duration = samples.iter().sum();
    let mean = sum / samples.len() as u32;

    Some(BenchStats {
        mode,
        runs: samples.len(),
        min,
        mean,
        max,
        total,
    })
}

impl fmt::Display for BenchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<9} runs={:<4} min={}ms mean={}ms max={}ms total={}ms",
            self.mode,
            self.runs,
            self.min.as_millis(),
            self.mean.as_millis(),
            self.max.as_millis(),
            self.total.as_millis(),
        )
    }
}

/// Run `sql` `iterations` times sequentially through the blocking client,
/// then `iterations` times through the async client with up to
/// `concurrency` statements in flight.
pub async fn run(
    client: &RedshiftQueryClient,
    sql: &str,
    iterations: usize,
    concurrency: usize,
) -> Result<Vec<BenchStats>> {
    let mut stats = Vec::with_capacity(2);

    let blocking_client = client.clone();
    let blocking_sql = sql.to_string();
    let (samples, total) = tokio::task::spawn_blocking(move || -> Result<_> {
        let blocking = BlockingQueryClient::new(blocking_client)?;
        let started = Instant::now();
        let mut samples = Vec::with_capacity(iterations);
        for i in 0..iterations {
            let t = Instant::now();
            blocking
                .query(&blocking_sql)
                .with_context(|| format!("blocking run {} failed", i + 1))?;
            samples.push(t.elapsed());
        }
        Ok((samples, started.elapsed()))
    })
    .await
    .context("blocking benchmark task panicked")??;
    info!(runs = samples.len(), total_ms = total.as_millis() as u64, "Blocking runs complete");
    stats.extend(summarize("blocking", &samples, total));

    let started = Instant::now();
    let results: Vec<Result<Duration>> = stream::iter(0..iterations)
        .map(|i| async move {
            let t = Instant::now();
            client
                .query_async(sql)
                .await
                .with_context(|| format!("async run {} failed", i + 1))?;
            Ok(t.elapsed())
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;
    let total = started.elapsed();
    let samples = results.into_iter().collect::<Result<Vec<_>>>()?;
    info!(runs = samples.len(), total_ms = total.as_millis() as u64, "Async runs complete");
    stats.extend(summarize("async", &samples, total));

    Ok(stats)
}
