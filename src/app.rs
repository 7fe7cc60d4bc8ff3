//! Core application runner for `wave-plus-exporter`.
//!
//! This module is decoupled from logging setup, signal handling and process
//! exit codes so it can be tested deterministically with an injected radio.

use crate::collector::Collector;
use crate::config::{PollConfig, parse_duration};
use crate::device::DeviceIdentity;
use crate::discovery::Discoverer;
use crate::http;
use crate::output::FormatError;
use crate::output::prometheus::PrometheusFormatter;
use crate::poller::Poller;
use crate::radio::{Radio, RadioError};
use crate::retry::RetryPolicy;
use crate::store::MetricStore;
use clap::Parser;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

/// Default port of the metrics endpoint.
pub const DEFAULT_HTTP_PORT: u16 = 9745;

/// Configuration for the exporter.
#[derive(Parser, Debug, Clone)]
#[command(author, about, version)]
pub struct Options {
    /// Wave Plus serial number, optionally with a display name.
    /// Format: 2930012345 or 2930012345=Bedroom
    #[arg(value_parser = crate::device::parse_device, value_name = "DEVICE", required = true)]
    pub devices: Vec<DeviceIdentity>,

    /// Address the metrics endpoint listens on
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub http_addr: IpAddr,

    /// Port the metrics endpoint listens on
    #[arg(long, default_value_t = DEFAULT_HTTP_PORT)]
    pub http_port: u16,

    /// Pause between poll cycles.
    /// Accepts duration with suffix: 3s, 1m, 500ms, 2h.
    /// Without suffix, value is interpreted as seconds.
    #[arg(long, value_parser = parse_duration, default_value = "4m")]
    pub interval: Duration,

    /// Length of the startup scan for devices
    #[arg(long, value_parser = parse_duration, default_value = "5s")]
    pub scan_duration: Duration,

    /// Read attempts per device and cycle
    #[arg(
        long,
        default_value_t = RetryPolicy::DEFAULT_MAX_ATTEMPTS,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_retries: u32,

    /// Time limit of a single connect and read attempt
    #[arg(long, value_parser = parse_duration, default_value = "15s")]
    pub attempt_timeout: Duration,

    /// Pause after a failed attempt
    #[arg(long, value_parser = parse_duration, default_value = "5s")]
    pub retry_delay: Duration,

    /// Prefix added to every metric name
    #[arg(long)]
    pub metrics_namespace: Option<String>,

    /// Verbose output, log debug messages
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Options {
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            cycle_interval: self.interval,
            scan_duration: self.scan_duration,
            max_retries: self.max_retries,
            per_attempt_timeout: self.attempt_timeout,
            retry_delay: self.retry_delay,
        }
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http_addr, self.http_port)
    }
}

/// Errors returned by the core run loop.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Radio(#[from] RadioError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Format(#[from] FormatError),
}

fn server_result(joined: Result<io::Result<()>, JoinError>) -> Result<(), RunError> {
    joined.map_err(io::Error::other)??;
    Ok(())
}

/// Serve `store` over HTTP, resolve the configured devices and poll them
/// until `shutdown` is cancelled.
///
/// # Errors
/// An invalid metrics namespace, binding the listener, the startup scan, or
/// the HTTP server failing.
/// Failures reading individual devices are logged and never returned.
pub async fn run(
    options: Options,
    radio: Arc<dyn Radio>,
    store: MetricStore,
    shutdown: CancellationToken,
) -> Result<(), RunError> {
    let config = options.poll_config();
    let formatter = Arc::new(PrometheusFormatter::new(options.metrics_namespace.clone())?);
    let listener = TcpListener::bind(options.listen_addr()).await?;
    let mut server = tokio::spawn(http::serve(
        listener,
        http::router(store.clone(), formatter),
        shutdown.clone(),
    ));

    let polling = async {
        let mut discoverer = Discoverer::new(radio.clone(), config.scan_duration);
        let collector = Collector::new(radio.clone(), config.retry_policy());
        let poller = Poller::start(
            &mut discoverer,
            options.devices,
            collector,
            store,
            config.cycle_interval,
        )
        .await?;
        let cycles = poller.run(shutdown.clone()).await;
        tracing::info!(cycles, "poller stopped");
        Ok::<(), RunError>(())
    };

    tokio::select! {
        polled = polling => {
            shutdown.cancel();
            server_result(server.await)?;
            polled
        }
        served = &mut server => {
            shutdown.cancel();
            server_result(served)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Metric;
    use crate::test_utils::{
        Attempt, FakeRadio, TEST_ADDRESS, sample_payload, wave_plus_advertisement,
    };

    fn options(args: &[&str]) -> Options {
        let mut argv = vec!["wave-plus-exporter"];
        argv.extend_from_slice(args);
        Options::try_parse_from(argv).unwrap()
    }

    #[test]
    fn options_defaults() {
        let options = options(&["2930012345"]);
        assert_eq!(options.devices, vec![DeviceIdentity::new(2930012345, None)]);
        assert_eq!(options.listen_addr(), "127.0.0.1:9745".parse().unwrap());
        assert_eq!(options.poll_config(), PollConfig::default());
        assert_eq!(options.metrics_namespace, None);
        assert!(!options.verbose);
    }

    #[test]
    fn options_overrides() {
        let options = options(&[
            "--http-addr",
            "0.0.0.0",
            "--http-port",
            "9100",
            "--interval",
            "10m",
            "--max-retries",
            "3",
            "--attempt-timeout",
            "20",
            "--retry-delay",
            "1s",
            "--scan-duration",
            "10s",
            "-v",
            "1=Office",
            "2",
        ]);
        assert_eq!(options.listen_addr(), "0.0.0.0:9100".parse().unwrap());
        assert_eq!(options.devices.len(), 2);
        assert_eq!(options.devices[0].label(), "airthings_wave_plus-Office");
        let config = options.poll_config();
        assert_eq!(config.cycle_interval, Duration::from_secs(600));
        assert_eq!(config.scan_duration, Duration::from_secs(10));
        assert_eq!(
            config.retry_policy(),
            RetryPolicy::new(3, Duration::from_secs(20), Duration::from_secs(1))
        );
        assert!(options.verbose);
    }

    #[test]
    fn options_reject_invalid_input() {
        let parse = |args: &[&str]| {
            let mut argv = vec!["wave-plus-exporter"];
            argv.extend_from_slice(args);
            Options::try_parse_from(argv)
        };
        assert!(parse(&[]).is_err());
        assert!(parse(&["not-a-serial"]).is_err());
        assert!(parse(&["--max-retries", "0", "1"]).is_err());
        assert!(parse(&["--interval", "soon", "1"]).is_err());
    }

    #[tokio::test]
    async fn run_polls_until_cancelled() {
        let radio = Arc::new(
            FakeRadio::new(vec![wave_plus_advertisement(TEST_ADDRESS, 2930012345)])
                .script(TEST_ADDRESS, vec![Attempt::Read(sample_payload().to_vec())]),
        );
        let store = MetricStore::new();
        let shutdown = CancellationToken::new();
        let options = options(&["--http-port", "0", "2930012345=office", "17"]);

        let handle = tokio::spawn(run(options, radio.clone(), store.clone(), shutdown.clone()));

        while store.is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        shutdown.cancel();
        handle.await.unwrap().unwrap();

        assert_eq!(radio.discover_count(), 1);
        assert_eq!(
            store.value(Metric::Voc, "airthings_wave_plus-office"),
            Some(250.0)
        );
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn run_fails_when_scan_fails() {
        let radio = Arc::new(FakeRadio::failing_discovery());
        let options = options(&["--http-port", "0", "1"]);

        let result = run(
            options,
            radio,
            MetricStore::new(),
            CancellationToken::new(),
        )
        .await;
        assert!(matches!(result, Err(RunError::Radio(RadioError::Bluetooth(_)))));
    }

    #[tokio::test]
    async fn run_rejects_invalid_namespace_before_scanning() {
        let radio = Arc::new(FakeRadio::default());
        let options = options(&["--http-port", "0", "--metrics-namespace", "air things", "1"]);

        let result = run(
            options,
            radio.clone(),
            MetricStore::new(),
            CancellationToken::new(),
        )
        .await;
        assert!(matches!(result, Err(RunError::Format(_))));
        assert_eq!(radio.discover_count(), 0);
    }
}
