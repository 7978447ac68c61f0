//! One collection tick: fetch, build and write every location concurrently.
//!
//! Locations are independent. Each one resolves to its own [`LocationOutcome`]
//! and a failure is recorded, never propagated, so the remaining locations are
//! still collected and the tick always finishes with a [`TickSummary`].

use futures::future::join_all;
use log::{debug, error, info};
use std::{sync::Arc, time::Duration};
use thiserror::Error;

use crate::{
    config::SchemaConfig,
    model::Location,
    points::{BuildError, PointBuilder},
    provider::{FetchError, ForecastClient},
    registry::LocationRegistry,
    storage::{StorageWriter, WriteError},
};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("Failed to fetch forecast")]
    Fetch(#[from] FetchError),

    #[error("Failed to build points")]
    Build(#[from] BuildError),

    #[error("Failed to write points")]
    Write(#[from] WriteError),
}

#[derive(Debug)]
pub enum LocationOutcome {
    Success(String),
    Failure(String, CollectError),
}

impl LocationOutcome {
    pub fn location(&self) -> &str {
        match self {
            LocationOutcome::Success(name) | LocationOutcome::Failure(name, _) => name,
        }
    }
}

/// Aggregated result of one tick.
///
/// Failures keep their [`CollectError`] as the root of the `anyhow` chain, so
/// `downcast_ref::<CollectError>()` recovers the kind.
#[derive(Debug, Default)]
pub struct TickSummary {
    pub total: usize,
    pub succeeded: Vec<String>,
    pub failures: Vec<(String, anyhow::Error)>,
}

impl TickSummary {
    pub fn successes(&self) -> usize {
        self.succeeded.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, outcome: LocationOutcome) {
        match outcome {
            LocationOutcome::Success(name) => self.succeeded.push(name),
            LocationOutcome::Failure(name, e) => {
                let e = anyhow::Error::from(e);
                error!("Failed to collect forecast for '{name}': {e:#}");
                self.failures.push((name, e));
            }
        }
    }
}

/// Runs collection ticks over a fixed set of locations.
///
/// The client and writer are shared by all tasks of a tick, and between ticks
/// if the scheduler lets them overlap.
#[derive(Debug, Clone)]
pub struct Collector {
    locations: LocationRegistry,
    client: Arc<dyn ForecastClient>,
    writer: Arc<dyn StorageWriter>,
    builder: PointBuilder,
    fetch_timeout: Duration,
}

impl Collector {
    pub fn new(
        locations: LocationRegistry,
        client: Arc<dyn ForecastClient>,
        writer: Arc<dyn StorageWriter>,
    ) -> Self {
        Self {
            locations,
            client,
            writer,
            builder: PointBuilder::default(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_schema(mut self, schema: SchemaConfig) -> Self {
        self.builder = PointBuilder::new(schema);
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn locations(&self) -> &LocationRegistry {
        &self.locations
    }

    /// Collect every location once and report the result.
    pub async fn collect(&self) -> TickSummary {
        let locations = self.locations.snapshot();
        debug!("Starting collection for {} location(s)", locations.len());

        let outcomes = join_all(locations.iter().map(|l| self.collect_location(l))).await;
        debug!("All {} location task(s) resolved", outcomes.len());

        let mut summary = TickSummary { total: locations.len(), ..Default::default() };
        for outcome in outcomes {
            summary.record(outcome);
        }

        info!("Processed {} of {} location(s)", summary.successes(), summary.total);
        summary
    }

    async fn collect_location(&self, location: &Location) -> LocationOutcome {
        match self.fetch_build_write(location).await {
            Ok(written) => {
                info!(
                    "Forecast data for '{}' collected and stored ({written} point(s))",
                    location.name
                );
                LocationOutcome::Success(location.name.clone())
            }
            Err(e) => LocationOutcome::Failure(location.name.clone(), e),
        }
    }

    async fn fetch_build_write(&self, location: &Location) -> Result<usize, CollectError> {
        let response = tokio::time::timeout(
            self.fetch_timeout,
            self.client.fetch(location.latitude, location.longitude),
        )
        .await
        .map_err(|_| FetchError::Timeout(self.fetch_timeout))??;

        let points = self.builder.build(location, &response)?;
        self.writer.write(&points).await?;

        Ok(points.len())
    }
}
