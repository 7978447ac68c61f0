use async_trait::async_trait;
use log::{info, warn};
use std::fmt::Debug;
use thiserror::Error;

use crate::model::Point;

pub mod influx;
pub mod line_protocol;

pub use influx::{Credentials, InfluxClient};
pub use line_protocol::EncodeError;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Failed to encode points")]
    Encode(#[from] EncodeError),

    #[error("Write request failed")]
    Request(#[source] reqwest::Error),

    #[error("Write request failed with status {status}: {body}")]
    Status { status: reqwest::StatusCode, body: String },
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Database query request failed")]
    Request(#[source] reqwest::Error),

    #[error("Database query failed with status {status}: {body}")]
    Status { status: reqwest::StatusCode, body: String },

    #[error("Failed to parse database query response")]
    Decode(#[source] serde_json::Error),

    #[error("Database query returned an error: {0}")]
    Query(String),
}

/// Durable batched point writes.
///
/// One call carries the points of a single location; a failed call must leave
/// batches from other calls untouched.
#[async_trait]
pub trait StorageWriter: Send + Sync + Debug {
    async fn write(&self, batch: &[Point]) -> Result<(), WriteError>;
}

/// Database management operations needed for bootstrap.
#[async_trait]
pub trait DatabaseAdmin: Send + Sync + Debug {
    async fn database_names(&self) -> Result<Vec<String>, BootstrapError>;

    async fn create_database(&self, name: &str) -> Result<(), BootstrapError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Existing,
    Created,
}

/// Make sure database `name` exists, creating it when missing.
///
/// Safe to call repeatedly. If creation fails because someone else created the
/// database in the meantime, the existing database is accepted.
pub async fn ensure_database(
    admin: &dyn DatabaseAdmin,
    name: &str,
) -> Result<BootstrapOutcome, BootstrapError> {
    if admin.database_names().await?.iter().any(|n| n == name) {
        info!("Database '{name}' already exists");
        return Ok(BootstrapOutcome::Existing);
    }

    match admin.create_database(name).await {
        Ok(()) => {
            info!("Created database '{name}'");
            Ok(BootstrapOutcome::Created)
        }
        // The create error is what gets reported unless the database turned up anyway.
        Err(e) => match admin.database_names().await {
            Ok(names) if names.iter().any(|n| n == name) => {
                warn!("Creating database '{name}' failed but it exists now: {e}");
                Ok(BootstrapOutcome::Existing)
            }
            Ok(_) => Err(e),
            Err(recheck) => {
                warn!("Failed to list databases after creating '{name}' failed: {recheck}");
                Err(e)
            }
        },
    }
}
