use clap::Parser;
use std::panic::{self, PanicHookInfo};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use wave_plus_exporter::app::{self, Options};
use wave_plus_exporter::radio::bluer::BluerRadio;
use wave_plus_exporter::store::MetricStore;

/// Exit codes for the application
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_PANIC: i32 = 2;

fn init_logging(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Cancel `shutdown` on Ctrl-C or SIGTERM.
fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut terminate) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = terminate.recv() => {}
                    }
                }
                Err(error) => {
                    tracing::warn!(%error, "cannot listen for SIGTERM");
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }
        #[cfg(not(unix))]
        let _ = tokio::signal::ctrl_c().await;

        tracing::info!("shutting down");
        shutdown.cancel();
    });
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Process managers (systemd, docker) watch the exit status
    panic::set_hook(Box::new(move |info: &PanicHookInfo| {
        eprintln!("Panic! {}", info);
        std::process::exit(EXIT_PANIC);
    }));

    let options = Options::parse();
    init_logging(options.verbose);

    let radio = match BluerRadio::new().await {
        Ok(radio) => Arc::new(radio),
        Err(why) => {
            tracing::error!("cannot open Bluetooth adapter: {}", why);
            std::process::exit(EXIT_ERROR);
        }
    };

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    match app::run(options, radio, MetricStore::new(), shutdown).await {
        Ok(()) => std::process::exit(EXIT_SUCCESS),
        Err(why) => {
            tracing::error!("{}", why);
            std::process::exit(EXIT_ERROR);
        }
    }
}
