use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::time::Duration;

use crate::{
    model::Point,
    provider::truncate_body,
    storage::{
        line_protocol::encode_batch, BootstrapError, DatabaseAdmin, StorageWriter, WriteError,
    },
};

pub const DEFAULT_PORT: u16 = 8086;

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Base URL for an InfluxDB host setting.
///
/// A bare host name gets the default scheme and port; anything with a scheme is
/// taken as-is.
pub fn base_url_from_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.contains("://") {
        host.to_string()
    } else if host.contains(':') {
        format!("http://{host}")
    } else {
        format!("http://{host}:{DEFAULT_PORT}")
    }
}

/// InfluxDB 1.x HTTP API client bound to one database.
///
/// Backed by a pooled `reqwest::Client`, so one instance serves every concurrent
/// write of a tick.
#[derive(Debug, Clone)]
pub struct InfluxClient {
    base_url: String,
    database: String,
    credentials: Option<Credentials>,
    http: Client,
}

impl InfluxClient {
    pub fn new(
        base_url: &str,
        database: String,
        credentials: Option<Credentials>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            database,
            credentials,
            http,
        })
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(c) => req.basic_auth(&c.username, Some(&c.password)),
            None => req,
        }
    }

    async fn query(&self, statement: &str, post: bool) -> Result<QueryResponse, BootstrapError> {
        let url = format!("{}/query", self.base_url);
        let req = if post { self.http.post(url) } else { self.http.get(url) };

        let res = self
            .authorize(req)
            .query(&[("q", statement)])
            .send()
            .await
            .map_err(BootstrapError::Request)?;

        let status = res.status();
        let body = res.text().await.map_err(BootstrapError::Request)?;

        if !status.is_success() {
            return Err(BootstrapError::Status { status, body: truncate_body(&body) });
        }

        parse_query_response(&body)
    }
}

#[derive(Debug, Deserialize)]
struct Series {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    series: Vec<Series>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    error: Option<String>,
}

impl QueryResponse {
    fn first_column(&self) -> Vec<String> {
        self.results
            .iter()
            .flat_map(|r| &r.series)
            .flat_map(|s| &s.values)
            .filter_map(|row| row.first().and_then(|v| v.as_str()).map(str::to_string))
            .collect()
    }
}

fn parse_query_response(body: &str) -> Result<QueryResponse, BootstrapError> {
    let parsed: QueryResponse = serde_json::from_str(body).map_err(BootstrapError::Decode)?;

    let error = parsed.error.clone().or_else(|| parsed.results.iter().find_map(|r| r.error.clone()));
    match error {
        Some(e) => Err(BootstrapError::Query(e)),
        None => Ok(parsed),
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
}

#[async_trait]
impl DatabaseAdmin for InfluxClient {
    async fn database_names(&self) -> Result<Vec<String>, BootstrapError> {
        Ok(self.query("SHOW DATABASES", false).await?.first_column())
    }

    async fn create_database(&self, name: &str) -> Result<(), BootstrapError> {
        self.query(&format!("CREATE DATABASE {}", quote_identifier(name)), true).await?;
        Ok(())
    }
}

#[async_trait]
impl StorageWriter for InfluxClient {
    async fn write(&self, batch: &[Point]) -> Result<(), WriteError> {
        if batch.is_empty() {
            return Ok(());
        }

        let body = encode_batch(batch)?;
        debug!("Writing {} point(s) to '{}'", batch.len(), self.database);

        let res = self
            .authorize(self.http.post(format!("{}/write", self.base_url)))
            .query(&[("db", self.database.as_str()), ("precision", "ns")])
            .body(body)
            .send()
            .await
            .map_err(WriteError::Request)?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.map_err(WriteError::Request)?;
            return Err(WriteError::Status { status, body: truncate_body(&body) });
        }

        Ok(())
    }
}
