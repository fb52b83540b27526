use std::env;

use serde::{Deserialize, Serialize};

/// Env var holding the active profile name.
pub const PROFILE_ENV: &str = "REDQUERY_PROFILE";

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

pub fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Active profile from `REDQUERY_PROFILE`, uppercased (empty = default).
pub fn active_profile() -> String {
    env_opt(PROFILE_ENV)
        .map(|s| s.to_uppercase())
        .unwrap_or_default()
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
pub fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

pub fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

pub fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

pub fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

pub fn profiled_env_f64(profile: &str, key: &str, default: f64) -> f64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .filter(|v: &f64| v.is_finite())
        .unwrap_or(default)
}

// ── AWS credentials / region ──────────────────────────────────

/// Where the SDK should take credentials from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CredentialSource {
    /// Explicit access key pair (optionally with a session token).
    Static {
        access_key_id: String,
        #[serde(skip_serializing, default)]
        secret_access_key: String,
        #[serde(skip_serializing, default)]
        session_token: Option<String>,
    },
    /// Named profile from `~/.aws/credentials` / `~/.aws/config`.
    Profile { name: String },
    /// The SDK's default provider chain.
    DefaultChain,
}

impl CredentialSource {
    pub fn label(&self) -> &'static str {
        match self {
            CredentialSource::Static { .. } => "static",
            CredentialSource::Profile { .. } => "profile",
            CredentialSource::DefaultChain => "default-chain",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    pub region: String,
    pub credentials: CredentialSource,
    pub endpoint_url: Option<String>,
}

impl AwsConfig {
    /// `{prefix}_REGION` wins over `AWS_REGION`; static keys win over a named profile.
    pub fn from_env_profiled(p: &str, prefix: &str, default_region: &str) -> Self {
        let region = profiled_env_opt(p, &format!("{}_REGION", prefix))
            .or_else(|| profiled_env_opt(p, "AWS_REGION"))
            .unwrap_or_else(|| default_region.to_string());

        let credentials = match (
            profiled_env_opt(p, "AWS_ACCESS_KEY_ID"),
            profiled_env_opt(p, "AWS_SECRET_ACCESS_KEY"),
        ) {
            (Some(access_key_id), Some(secret_access_key)) => CredentialSource::Static {
                access_key_id,
                secret_access_key,
                session_token: profiled_env_opt(p, "AWS_SESSION_TOKEN"),
            },
            _ => match profiled_env_opt(p, &format!("{}_AWS_PROFILE", prefix)) {
                Some(name) => CredentialSource::Profile { name },
                None => CredentialSource::DefaultChain,
            },
        };

        Self {
            region,
            credentials,
            endpoint_url: profiled_env_opt(p, &format!("{}_ENDPOINT_URL", prefix)),
        }
    }
}
