//! Client construction and process-wide memoization.
//!
//! [`ClientHandle::initialize`] resolves region, credentials, timeouts and
//! retry policy once. [`ClientProvider`] memoizes a single handle so the
//! entry point can call it from anywhere it holds the provider, and every
//! component receives the handle explicitly instead of reaching for a static.

use std::sync::Arc;

use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::ProvideCredentials;
use aws_credential_types::Credentials;
use aws_sdk_redshiftdata::error::DisplayErrorContext;
use aws_types::region::Region;
use tokio::sync::OnceCell;
use tracing::info;

use redquery_core::CredentialSource;

use crate::config::{RedshiftConfig, RetryMode};
use crate::error::RedshiftError;
use crate::service::{RedshiftDataService, StatementService};

/// Shared, read-only handle to a configured Redshift Data API client.
///
/// Cheap to clone; every clone talks through the same connection pool and
/// concurrency limiter.
#[derive(Clone)]
pub struct ClientHandle {
    service: Arc<RedshiftDataService>,
    region: String,
}

impl ClientHandle {
    /// Build the SDK client and resolve credentials once.
    ///
    /// Returns [`RedshiftError::Configuration`] when credentials cannot be
    /// resolved. Not retried.
    pub async fn initialize(config: &RedshiftConfig) -> Result<Self, RedshiftError> {
        let transport = &config.transport;

        let timeouts = TimeoutConfig::builder()
            .operation_timeout(transport.api_call_timeout())
            .operation_attempt_timeout(transport.api_attempt_timeout())
            .connect_timeout(transport.connect_timeout())
            .read_timeout(transport.read_timeout())
            .build();

        let retry = match transport.retry_mode {
            RetryMode::Standard => RetryConfig::standard(),
            RetryMode::Adaptive => RetryConfig::adaptive(),
        }
        .with_max_attempts(transport.max_attempts);

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.aws.region.clone()))
            .timeout_config(timeouts)
            .retry_config(retry);

        match &config.aws.credentials {
            CredentialSource::Static {
                access_key_id,
                secret_access_key,
                session_token,
            } => {
                loader = loader.credentials_provider(Credentials::new(
                    access_key_id,
                    secret_access_key,
                    session_token.clone(),
                    None,
                    "redquery-static",
                ));
            }
            CredentialSource::Profile { name } => {
                let provider = aws_config::profile::ProfileFileCredentialsProvider::builder()
                    .profile_name(name)
                    .build();
                loader = loader.credentials_provider(provider);
            }
            CredentialSource::DefaultChain => {}
        }

        if let Some(ref endpoint) = config.aws.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;

        let credentials = sdk_config.credentials_provider().ok_or_else(|| {
            RedshiftError::Configuration("no credentials provider configured".into())
        })?;
        credentials.provide_credentials().await.map_err(|e| {
            RedshiftError::Configuration(format!(
                "failed to resolve {} credentials: {}",
                config.aws.credentials.label(),
                DisplayErrorContext(&e)
            ))
        })?;

        let client = aws_sdk_redshiftdata::Client::new(&sdk_config);

        info!(
            region = %config.aws.region,
            credentials = config.aws.credentials.label(),
            retry_mode = ?transport.retry_mode,
            max_concurrency = transport.max_concurrency,
            "Redshift Data client initialised"
        );

        Ok(Self {
            service: Arc::new(RedshiftDataService::new(
                client,
                transport.max_concurrency as usize,
            )),
            region: config.aws.region.clone(),
        })
    }

    /// The statement service backed by this handle.
    pub fn service(&self) -> Arc<dyn StatementService> {
        self.service.clone()
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// True when both handles share the same underlying client.
    pub fn same_client(&self, other: &ClientHandle) -> bool {
        Arc::ptr_eq(&self.service, &other.service)
    }

    /// Invalidate every clone of this handle. Only call at process shutdown.
    pub fn close(&self) {
        self.service.close();
        info!(region = %self.region, "Redshift Data client closed");
    }
}

impl std::fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientHandle")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

/// Memoizes one [`ClientHandle`] for the life of its owner.
#[derive(Debug, Default)]
pub struct ClientProvider {
    cell: OnceCell<ClientHandle>,
}

impl ClientProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the memoized handle, building it from `config` on first use.
    ///
    /// A failed initialization is not cached; the next call tries again.
    pub async fn get_or_init(&self, config: &RedshiftConfig) -> Result<ClientHandle, RedshiftError> {
        self.cell
            .get_or_try_init(|| ClientHandle::initialize(config))
            .await
            .cloned()
    }

    /// The handle, if one has been initialized.
    pub fn get(&self) -> Option<&ClientHandle> {
        self.cell.get()
    }
}
