//! Fixed-interval trigger for collection ticks.

use anyhow::{Context, Result, bail};
use forecast_core::Collector;
use log::{error, info};
use std::{io, sync::Arc, time::Duration};
use tokio::{task::JoinSet, time::MissedTickBehavior};

/// Run a single tick. Fails if any location could not be collected.
pub async fn run_once(collector: &Collector) -> Result<()> {
    let summary = collector.collect().await;
    if !summary.all_succeeded() {
        bail!(
            "{} of {} location(s) failed",
            summary.failures.len(),
            summary.total
        );
    }
    Ok(())
}

/// Resolves on Ctrl+C.
pub async fn ctrl_c() -> io::Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down gracefully...");
    Ok(())
}

/// Start a tick every `every`, the first one immediately, until `shutdown` resolves.
///
/// Each tick runs on its own task so a slow tick never delays the next one.
/// Overlapping ticks rewrite identical points and are harmless. Ticks still
/// running at shutdown are awaited before returning. If `shutdown` fails, the
/// running ticks are awaited as well and the failure is returned.
pub async fn run_every<F>(collector: Arc<Collector>, every: Duration, shutdown: F) -> Result<()>
where
    F: Future<Output = io::Result<()>>,
{
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut ticks = JoinSet::new();
    tokio::pin!(shutdown);

    info!(
        "Collecting {} location(s) every {}s",
        collector.locations().len(),
        every.as_secs()
    );

    let stopped = loop {
        tokio::select! {
            res = &mut shutdown => break res,
            Some(res) = ticks.join_next(), if !ticks.is_empty() => {
                if let Err(e) = res {
                    error!("Collection tick aborted: {e}");
                }
            }
            _ = ticker.tick() => {
                let collector = Arc::clone(&collector);
                ticks.spawn(async move {
                    collector.collect().await;
                });
            }
        }
    };

    if !ticks.is_empty() {
        info!("Waiting for {} running tick(s) to finish", ticks.len());
    }
    while let Some(res) = ticks.join_next().await {
        if let Err(e) = res {
            error!("Collection tick aborted: {e}");
        }
    }

    stopped.context("Failed to wait for the shutdown signal")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use forecast_core::{
        FetchError, ForecastClient, ForecastResponse, ForecastSample, Location,
        LocationRegistry, Point, StorageWriter, WriteError,
    };
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };
    use tokio::time::{Instant, sleep};

    fn rain(time: i64) -> ForecastSample {
        ForecastSample {
            summary: "Rain".into(),
            icon: "rain".into(),
            temperature: 8.0,
            dew_point: 7.5,
            humidity: 0.97,
            pressure: 1002.0,
            wind_speed: 6.0,
            wind_bearing: Some(200),
            cloud_cover: Some(1.0),
            time,
        }
    }

    #[derive(Debug)]
    struct StaticClient {
        fail_north_of: f64,
    }

    #[async_trait]
    impl ForecastClient for StaticClient {
        async fn fetch(&self, latitude: f64, _: f64) -> Result<ForecastResponse, FetchError> {
            if latitude > self.fail_north_of {
                return Err(FetchError::Timeout(Duration::from_secs(1)));
            }
            let sample = rain(1696156800);
            Ok(ForecastResponse { hourly: vec![sample.clone()], currently: sample })
        }
    }

    #[derive(Debug)]
    struct NullWriter;

    #[async_trait]
    impl StorageWriter for NullWriter {
        async fn write(&self, _: &[Point]) -> Result<(), WriteError> {
            Ok(())
        }
    }

    /// Records when each fetch starts, then takes `latency` to answer.
    #[derive(Debug)]
    struct SlowClient {
        started: Instant,
        latency: Duration,
        fetches: Mutex<Vec<Duration>>,
    }

    impl SlowClient {
        fn new(latency: Duration) -> Self {
            Self { started: Instant::now(), latency, fetches: Mutex::new(Vec::new()) }
        }

        fn fetch_offsets(&self) -> Vec<Duration> {
            self.fetches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ForecastClient for SlowClient {
        async fn fetch(&self, _: f64, _: f64) -> Result<ForecastResponse, FetchError> {
            self.fetches.lock().unwrap().push(self.started.elapsed());
            sleep(self.latency).await;
            Ok(ForecastResponse { hourly: vec![], currently: rain(1696156800) })
        }
    }

    #[derive(Debug, Default)]
    struct CountingWriter {
        writes: AtomicUsize,
    }

    #[async_trait]
    impl StorageWriter for CountingWriter {
        async fn write(&self, _: &[Point]) -> Result<(), WriteError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn solna() -> Location {
        Location { name: "solna".into(), latitude: 59.3775869, longitude: 18.010939 }
    }

    fn collector(fail_north_of: f64) -> Collector {
        let locations = LocationRegistry::load(vec![
            solna(),
            Location { name: "umeå".into(), latitude: 63.8258471, longitude: 20.2630354 },
        ])
        .unwrap();
        Collector::new(locations, Arc::new(StaticClient { fail_north_of }), Arc::new(NullWriter))
    }

    #[tokio::test]
    async fn run_once_succeeds_when_all_locations_collected() {
        assert!(run_once(&collector(90.0)).await.is_ok());
    }

    #[tokio::test]
    async fn run_once_reports_failed_locations() {
        let err = run_once(&collector(60.0)).await.unwrap_err();
        assert_eq!(err.to_string(), "1 of 2 location(s) failed");
    }

    fn slow_collector(
        latency: Duration,
    ) -> (Arc<Collector>, Arc<SlowClient>, Arc<CountingWriter>) {
        let client = Arc::new(SlowClient::new(latency));
        let writer = Arc::new(CountingWriter::default());
        let locations = LocationRegistry::load(vec![solna()]).unwrap();
        let collector = Collector::new(locations, client.clone(), writer.clone());
        (Arc::new(collector), client, writer)
    }

    async fn stop_after(delay: Duration) -> io::Result<()> {
        sleep(delay).await;
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_immediately_then_every_interval() {
        let (collector, client, writer) = slow_collector(Duration::ZERO);

        run_every(collector, Duration::from_secs(60), stop_after(Duration::from_secs(150)))
            .await
            .unwrap();

        assert_eq!(
            client.fetch_offsets(),
            [Duration::ZERO, Duration::from_secs(60), Duration::from_secs(120)]
        );
        assert_eq!(writer.writes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_waits_for_running_tick() {
        let (collector, client, writer) = slow_collector(Duration::from_secs(2));

        // Second tick starts at 60s and is still fetching when shutdown fires at 61s.
        run_every(collector, Duration::from_secs(60), stop_after(Duration::from_secs(61)))
            .await
            .unwrap();

        assert_eq!(client.fetch_offsets(), [Duration::ZERO, Duration::from_secs(60)]);
        assert_eq!(writer.writes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_before_second_tick_runs_one() {
        let (collector, client, writer) = slow_collector(Duration::ZERO);

        run_every(collector, Duration::from_secs(300), stop_after(Duration::from_secs(1)))
            .await
            .unwrap();

        assert_eq!(client.fetch_offsets(), [Duration::ZERO]);
        assert_eq!(writer.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_shutdown_signal_is_an_error() {
        let (collector, _, _) = slow_collector(Duration::from_secs(2));

        let err = run_every(collector, Duration::from_secs(60), async {
            Err(io::Error::other("signal handler unavailable"))
        })
        .await
        .unwrap_err();

        assert_eq!(
            format!("{err:#}"),
            "Failed to wait for the shutdown signal: signal handler unavailable"
        );
    }
}
