use std::time::Duration;

use serde::{Deserialize, Serialize};

use redquery_core::config::{
    active_profile, profiled_env_f64, profiled_env_opt, profiled_env_or, profiled_env_u32,
    profiled_env_u64,
};
use redquery_core::AwsConfig;

use crate::poller::PollPolicy;

const DEFAULT_REGION: &str = "us-east-2";
const DEFAULT_DATABASE: &str = "dev";
const DEFAULT_DB_USER: &str = "awsuser";

/// How the SDK retries failed attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryMode {
    Standard,
    Adaptive,
}

impl RetryMode {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "standard" => Some(RetryMode::Standard),
            "adaptive" => Some(RetryMode::Adaptive),
            _ => None,
        }
    }
}

// ── Routing ──────────────────────────────────────────────────────

/// Cluster / database / user identity every statement is routed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingConfig {
    pub cluster_identifier: String,
    pub database: String,
    pub db_user: String,
}

// ── Transport ────────────────────────────────────────────────────

/// Timeouts, retries and concurrency applied to the SDK client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Whole-call budget including retries.
    pub api_call_timeout_secs: u64,
    /// Budget for a single attempt.
    pub api_attempt_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub retry_mode: RetryMode,
    pub max_attempts: u32,
    /// Upper bound on concurrently in-flight service calls.
    pub max_concurrency: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            api_call_timeout_secs: 120,
            api_attempt_timeout_secs: 90,
            connect_timeout_secs: 60,
            read_timeout_secs: 60,
            retry_mode: RetryMode::Standard,
            max_attempts: 3,
            max_concurrency: 100,
        }
    }
}

impl TransportConfig {
    pub fn api_call_timeout(&self) -> Duration {
        Duration::from_secs(self.api_call_timeout_secs)
    }

    pub fn api_attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.api_attempt_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

// ── Poll ─────────────────────────────────────────────────────────

/// Status polling knobs as read from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    pub interval_ms: u64,
    pub max_interval_ms: u64,
    /// 1.0 keeps the interval fixed.
    pub backoff_factor: f64,
    /// 0 = unlimited.
    pub max_attempts: u32,
    /// 0 = unlimited.
    pub timeout_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: 100,
            max_interval_ms: 2000,
            backoff_factor: 1.0,
            max_attempts: 0,
            timeout_secs: 300,
        }
    }
}

// ── RedshiftConfig ───────────────────────────────────────────────

/// Configuration for the Redshift Data API client.
///
/// Reads from environment variables with optional profile prefix.
/// When `REDQUERY_PROFILE=PROD`, checks `PROD_REDSHIFT_DATABASE` before `REDSHIFT_DATABASE`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedshiftConfig {
    pub aws: AwsConfig,
    pub routing: RoutingConfig,
    pub transport: TransportConfig,
    pub poll: PollConfig,
}

impl RedshiftConfig {
    /// Build config from environment variables using the active profile.
    pub fn from_env() -> Self {
        Self::from_env_profiled(&active_profile())
    }

    /// Build config for a specific named profile.
    pub fn from_env_profiled(p: &str) -> Self {
        let transport_defaults = TransportConfig::default();
        let poll_defaults = PollConfig::default();

        Self {
            aws: AwsConfig::from_env_profiled(p, "REDSHIFT", DEFAULT_REGION),
            routing: RoutingConfig {
                cluster_identifier: profiled_env_or(p, "REDSHIFT_CLUSTER_ID", ""),
                database: profiled_env_or(p, "REDSHIFT_DATABASE", DEFAULT_DATABASE),
                db_user: profiled_env_or(p, "REDSHIFT_DB_USER", DEFAULT_DB_USER),
            },
            transport: TransportConfig {
                api_call_timeout_secs: profiled_env_u64(
                    p,
                    "REDSHIFT_API_CALL_TIMEOUT_SECS",
                    transport_defaults.api_call_timeout_secs,
                ),
                api_attempt_timeout_secs: profiled_env_u64(
                    p,
                    "REDSHIFT_API_ATTEMPT_TIMEOUT_SECS",
                    transport_defaults.api_attempt_timeout_secs,
                ),
                connect_timeout_secs: profiled_env_u64(
                    p,
                    "REDSHIFT_CONNECT_TIMEOUT_SECS",
                    transport_defaults.connect_timeout_secs,
                ),
                read_timeout_secs: profiled_env_u64(
                    p,
                    "REDSHIFT_READ_TIMEOUT_SECS",
                    transport_defaults.read_timeout_secs,
                ),
                retry_mode: profiled_env_opt(p, "REDSHIFT_RETRY_MODE")
                    .and_then(|v| RetryMode::parse(&v))
                    .unwrap_or(transport_defaults.retry_mode),
                max_attempts: profiled_env_u32(
                    p,
                    "REDSHIFT_MAX_ATTEMPTS",
                    transport_defaults.max_attempts,
                )
                .max(1),
                max_concurrency: profiled_env_u32(
                    p,
                    "REDSHIFT_MAX_CONCURRENCY",
                    transport_defaults.max_concurrency,
                )
                .max(1),
            },
            poll: PollConfig {
                interval_ms: profiled_env_u64(
                    p,
                    "REDSHIFT_POLL_INTERVAL_MS",
                    poll_defaults.interval_ms,
                ),
                max_interval_ms: profiled_env_u64(
                    p,
                    "REDSHIFT_POLL_MAX_INTERVAL_MS",
                    poll_defaults.max_interval_ms,
                ),
                backoff_factor: profiled_env_f64(
                    p,
                    "REDSHIFT_POLL_BACKOFF",
                    poll_defaults.backoff_factor,
                ),
                max_attempts: profiled_env_u32(
                    p,
                    "REDSHIFT_POLL_MAX_ATTEMPTS",
                    poll_defaults.max_attempts,
                ),
                timeout_secs: profiled_env_u64(
                    p,
                    "REDSHIFT_POLL_TIMEOUT_SECS",
                    poll_defaults.timeout_secs,
                ),
            },
        }
    }

    /// Returns `true` once a cluster identifier has been provided.
    pub fn is_configured(&self) -> bool {
        !self.routing.cluster_identifier.is_empty()
    }

    /// Poll policy derived from the `poll` section, with the interval floor applied.
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::from_config(&self.poll)
    }

    /// Redacted view for startup logs (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "region": self.aws.region,
            "credentials": self.aws.credentials.label(),
            "endpoint_url": self.aws.endpoint_url,
            "cluster_identifier": self.routing.cluster_identifier,
            "database": self.routing.database,
            "db_user": self.routing.db_user,
            "retry_mode": self.transport.retry_mode,
            "max_concurrency": self.transport.max_concurrency,
            "poll_interval_ms": self.poll.interval_ms,
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────
