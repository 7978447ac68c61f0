//! Binary crate for the `forecast-collector` service.
//!
//! This crate focuses on:
//! - Parsing CLI arguments and environment settings
//! - Startup: config loading and database bootstrap
//! - Driving collection ticks on a fixed interval

use clap::Parser;

mod cli;
mod scheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = env_logger::Env::default().default_filter_or("info");
    env_logger::init_from_env(env);

    let cmd = cli::Cli::parse();
    cmd.run().await
}
