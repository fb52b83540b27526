pub mod blocking;
pub mod client;
pub mod config;
pub mod error;
pub mod materialize;
pub mod poller;
pub mod provider;
pub mod result;
pub mod service;
pub mod types;

pub use blocking::{BlockingQueryClient, Interrupt};
pub use client::RedshiftQueryClient;
pub use config::{PollConfig, RedshiftConfig, RetryMode, RoutingConfig, TransportConfig};
pub use error::RedshiftError;
pub use materialize::Materializer;
pub use poller::{PollPolicy, Poller, MIN_POLL_INTERVAL};
pub use provider::{ClientHandle, ClientProvider};
pub use result::{Record, ResultTable};
pub use service::{RedshiftDataService, StatementService};
pub use types::{
    ColumnDescriptor, QueryRequest, RawField, ResultPage, StatementDescription, StatementHandle,
    StatementStatus,
};

pub use tokio_util::sync::CancellationToken;
