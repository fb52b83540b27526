pub mod config;
pub mod field;

pub use config::{AwsConfig, CredentialSource};
pub use field::{FieldValue, NULL_MARKER};
