//! HTTP exposition of the metric store.
//!
//! Serves `GET /metrics` in the format of the configured
//! [`OutputFormatter`], plus a small index page on `/`.

use crate::output::OutputFormatter;
use crate::store::MetricStore;
use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Path the metrics are served on.
pub const METRICS_PATH: &str = "/metrics";

#[derive(Clone)]
struct Exposition {
    store: MetricStore,
    formatter: Arc<dyn OutputFormatter>,
}

async fn metrics(State(exposition): State<Exposition>) -> Response {
    match exposition.formatter.format(&exposition.store.readings()) {
        Ok(body) => {
            ([(header::CONTENT_TYPE, exposition.formatter.content_type())], body).into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

async fn index() -> Html<&'static str> {
    Html(
        "<html><head><title>Wave Plus Exporter</title></head>\
         <body><h1>Wave Plus Exporter</h1>\
         <p><a href=\"/metrics\">Metrics</a></p></body></html>",
    )
}

/// Build the router serving `store` through `formatter`.
pub fn router(store: MetricStore, formatter: Arc<dyn OutputFormatter>) -> Router {
    Router::new()
        .route("/", get(index))
        .route(METRICS_PATH, get(metrics))
        .with_state(Exposition { store, formatter })
}

/// Serve `router` on `listener` until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: CancellationToken,
) -> io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("serving Prometheus metrics on http://{addr}{METRICS_PATH}");
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
}
