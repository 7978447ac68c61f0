//! Core library for the forecast collector.
//!
//! This crate defines:
//! - Location configuration & validation
//! - The forecast provider client (Dark Sky)
//! - Flattening of forecasts into time-series points
//! - The InfluxDB writer and database bootstrap
//! - The per-tick collection orchestrator
//!
//! It is used by `forecast-collector`, but every external service sits behind a
//! trait so the pipeline can be driven without network access.

pub mod collector;
pub mod config;
pub mod model;
pub mod points;
pub mod provider;
pub mod registry;
pub mod storage;

pub use collector::{CollectError, Collector, LocationOutcome, TickSummary};
pub use config::{Config, ConfigError, FieldSet, SchemaConfig};
pub use model::{FieldValue, ForecastResponse, ForecastSample, Location, Measurement, Point};
pub use points::{BuildError, PointBuilder};
pub use provider::{DarkSkyClient, FetchError, ForecastClient};
pub use registry::LocationRegistry;
pub use storage::{
    ensure_database, BootstrapError, BootstrapOutcome, DatabaseAdmin, InfluxClient,
    StorageWriter, WriteError,
};
