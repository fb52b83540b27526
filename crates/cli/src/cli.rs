use clap::{Parser, Subcommand, ValueEnum};
use redquery_core::CredentialSource;
use redquery_redshift::RedshiftConfig;

/// Run SQL against Amazon Redshift through the Redshift Data API.
///
/// Connection settings come from the environment (`REDSHIFT_*`, `AWS_*`,
/// optionally prefixed by `REDQUERY_PROFILE`); flags override them.
#[derive(Parser, Debug)]
#[command(name = "redquery", version, about = "Redshift Data API query client")]
pub struct CliArgs {
    /// Cluster identifier (overrides REDSHIFT_CLUSTER_ID)
    #[arg(long, global = true)]
    pub cluster_id: Option<String>,

    /// Database name (overrides REDSHIFT_DATABASE)
    #[arg(long, global = true)]
    pub database: Option<String>,

    /// Database user (overrides REDSHIFT_DB_USER)
    #[arg(long, global = true)]
    pub db_user: Option<String>,

    /// AWS region (overrides REDSHIFT_REGION / AWS_REGION)
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Named AWS credentials profile (overrides REDSHIFT_AWS_PROFILE)
    #[arg(long, global = true)]
    pub aws_profile: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one statement and print its result
    Query {
        /// SQL text to execute
        sql: String,

        /// Use the non-blocking client instead of the blocking one
        #[arg(long = "async")]
        use_async: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Time the blocking and non-blocking clients against each other
    Bench {
        /// SQL text to execute
        sql: String,

        /// Queries per mode
        #[arg(long, default_value_t = 5)]
        iterations: usize,

        /// Concurrent queries in the non-blocking run
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty JSON, every value as text
    Json,
    /// Pretty JSON with native types
    TypedJson,
    /// Aligned text table
    Table,
}

impl CliArgs {
    /// Apply command-line overrides on top of the env-derived config.
    pub fn apply_overrides(&self, config: &mut RedshiftConfig) {
        if let Some(ref cluster_id) = self.cluster_id {
            config.routing.cluster_identifier = cluster_id.clone();
        }
        if let Some(ref database) = self.database {
            config.routing.database = database.clone();
        }
        if let Some(ref db_user) = self.db_user {
            config.routing.db_user = db_user.clone();
        }
        if let Some(ref region) = self.region {
            config.aws.region = region.clone();
        }
        if let Some(ref name) = self.aws_profile {
            config.aws.credentials = CredentialSource::Profile { name: name.clone() };
        }
    }
}
