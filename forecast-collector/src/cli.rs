use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use forecast_core::{
    Collector, Config, DarkSkyClient, ensure_database,
    storage::{Credentials, InfluxClient, influx::base_url_from_host},
};
use log::info;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use crate::scheduler;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "forecast-collector", version, about = "Collects weather forecasts into InfluxDB")]
pub struct Cli {
    /// Path to the locations config file.
    #[arg(
        long,
        short = 'c',
        env = "FORECAST_CONFIG",
        default_value = "locations.toml",
        global = true
    )]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Bootstrap the database, then collect forecasts on a fixed interval.
    Run(RunArgs),

    /// Validate the config file and list the configured locations.
    Check,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// InfluxDB host name, host:port, or full base URL.
    #[arg(long, env = "INFLUX_DB_HOST", default_value = "localhost")]
    pub influx_host: String,

    /// Database the points are written to.
    #[arg(long, env = "INFLUX_DB_NAME", default_value = "forecast")]
    pub database: String,

    #[arg(long, env = "INFLUX_DB_USER", requires = "influx_password")]
    pub influx_user: Option<String>,

    #[arg(long, env = "INFLUX_DB_PASSWORD", hide_env_values = true, requires = "influx_user")]
    pub influx_password: Option<String>,

    /// Dark Sky API key.
    #[arg(long, env = "DARKSKY_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Collect once and exit instead of running on a schedule.
    #[arg(long, env = "FORECAST_RUN_ONCE", value_parser = BoolishValueParser::new())]
    pub once: bool,

    /// Seconds between collection ticks.
    #[arg(
        long,
        env = "FORECAST_INTERVAL_SECS",
        default_value_t = 300,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub interval_secs: u64,

    /// Timeout in seconds for each provider and database request.
    #[arg(
        long,
        env = "FORECAST_TIMEOUT_SECS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout_secs: u64,
}

impl RunArgs {
    fn credentials(&self) -> Option<Credentials> {
        match (&self.influx_user, &self.influx_password) {
            (Some(username), Some(password)) => {
                Some(Credentials { username: username.clone(), password: password.clone() })
            }
            _ => None,
        }
    }
}

fn load_config(path: &Path) -> Result<Config> {
    Config::from_file(path)
        .with_context(|| format!("Failed to load config from '{}'", path.display()))
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Run(args) => run(&self.config, args).await,
            Command::Check => {
                let config = load_config(&self.config)?;
                println!("{}: {} location(s)", self.config.display(), config.locations.len());
                for location in config.locations.iter() {
                    println!(
                        "  {:<16} {:>11.6} {:>11.6}",
                        location.name, location.latitude, location.longitude
                    );
                }
                println!(
                    "cloudCover: hourly={}, currently={}",
                    config.schema.hourly.cloud_cover, config.schema.currently.cloud_cover
                );
                Ok(())
            }
        }
    }
}

async fn run(config_path: &Path, args: RunArgs) -> Result<()> {
    let config = load_config(config_path)?;
    info!("Loaded {} location(s) from '{}'", config.locations.len(), config_path.display());

    let timeout = Duration::from_secs(args.timeout_secs);
    let base_url = base_url_from_host(&args.influx_host);
    let influx = Arc::new(
        InfluxClient::new(&base_url, args.database.clone(), args.credentials(), timeout)
            .context("Failed to create InfluxDB client")?,
    );

    ensure_database(influx.as_ref(), influx.database())
        .await
        .with_context(|| format!("Failed to bootstrap database '{}' at {base_url}", args.database))?;

    let client = Arc::new(
        DarkSkyClient::new(args.api_key, timeout).context("Failed to create Dark Sky client")?,
    );

    let collector = Arc::new(
        Collector::new(config.locations, client, influx)
            .with_schema(config.schema)
            .with_fetch_timeout(timeout),
    );

    if args.once {
        return scheduler::run_once(&collector).await;
    }

    scheduler::run_every(collector, Duration::from_secs(args.interval_secs), scheduler::ctrl_c())
        .await
}
