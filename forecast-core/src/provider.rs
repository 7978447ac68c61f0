use async_trait::async_trait;
use std::{fmt::Debug, time::Duration};
use thiserror::Error;

use crate::model::ForecastResponse;

pub mod darksky;

pub use darksky::DarkSkyClient;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Forecast request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Forecast request failed")]
    Request(#[source] reqwest::Error),

    #[error("Forecast request failed with status {status}: {body}")]
    Status { status: reqwest::StatusCode, body: String },

    #[error("Failed to parse forecast payload")]
    Decode(#[source] serde_json::Error),
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout(_))
    }
}

/// Source of forecasts for a single coordinate pair.
///
/// Implementations are shared by every task of a tick and must not keep mutable
/// state between calls.
#[async_trait]
pub trait ForecastClient: Send + Sync + Debug {
    async fn fetch(&self, latitude: f64, longitude: f64) -> Result<ForecastResponse, FetchError>;
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
