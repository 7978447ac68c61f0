use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::{
    model::{ForecastResponse, ForecastSample},
    provider::{truncate_body, FetchError, ForecastClient},
};

pub const DEFAULT_BASE_URL: &str = "https://api.darksky.net";

/// Dark Sky forecast API client, SI units, hourly and current blocks only.
#[derive(Debug, Clone)]
pub struct DarkSkyClient {
    api_key: String,
    base_url: String,
    timeout: Duration,
    http: Client,
}

impl DarkSkyClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, FetchError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL, timeout)
    }

    pub fn with_base_url(
        api_key: String,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let http = Client::builder().timeout(timeout).build().map_err(FetchError::Request)?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            http,
        })
    }

    fn forecast_url(&self, latitude: f64, longitude: f64) -> String {
        format!("{}/forecast/{}/{},{}", self.base_url, self.api_key, latitude, longitude)
    }

    fn map_request_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() { FetchError::Timeout(self.timeout) } else { FetchError::Request(e) }
    }
}

#[derive(Debug, Deserialize)]
struct DsDataBlock {
    data: Vec<ForecastSample>,
}

#[derive(Debug, Deserialize)]
struct DsForecastResponse {
    currently: ForecastSample,
    hourly: DsDataBlock,
}

pub(crate) fn parse_forecast(body: &str) -> Result<ForecastResponse, FetchError> {
    let parsed: DsForecastResponse = serde_json::from_str(body).map_err(FetchError::Decode)?;

    Ok(ForecastResponse { hourly: parsed.hourly.data, currently: parsed.currently })
}

#[async_trait]
impl ForecastClient for DarkSkyClient {
    async fn fetch(&self, latitude: f64, longitude: f64) -> Result<ForecastResponse, FetchError> {
        debug!("Requesting Dark Sky forecast for ({latitude}, {longitude})");

        let res = self
            .http
            .get(self.forecast_url(latitude, longitude))
            .query(&[("units", "si"), ("exclude", "daily,alerts")])
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = res.status();
        let body = res.text().await.map_err(|e| self.map_request_error(e))?;

        if !status.is_success() {
            return Err(FetchError::Status { status, body: truncate_body(&body) });
        }

        parse_forecast(&body)
    }
}
