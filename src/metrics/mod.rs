use std::sync::Arc;

use anyhow::Result;
use axum::{extract::State, http::StatusCode, response::Response};
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry, TextEncoder};

use crate::AppState;

/// Application metrics collection, scoped to what the optimiser service and
/// its HTTP surface actually produce (§2 "Flow"; no live-train telemetry).
#[derive(Debug, Clone)]
pub struct AppMetrics {
    pub http_requests_total: IntCounter,
    pub http_request_duration: Histogram,

    pub runs_total: IntCounter,
    pub run_success_total: IntCounter,
    pub run_failures_total: IntCounter,
    pub run_duration: Histogram,
    pub trains_scheduled_total: IntCounter,
    pub events_persisted_total: IntCounter,

    pub store_queries_total: IntCounter,
    pub store_query_duration: Histogram,

    pub uptime_seconds: IntGauge,

    pub registry: Registry,
}

impl AppMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = IntCounter::with_opts(Opts::new(
            "http_requests_total",
            "Total number of HTTP requests",
        ))?;
        let http_request_duration = Histogram::with_opts(HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration",
        ))?;

        let runs_total = IntCounter::with_opts(Opts::new(
            "optimizer_runs_total",
            "Total number of optimiser runs triggered",
        ))?;
        let run_success_total = IntCounter::with_opts(Opts::new(
            "optimizer_run_success_total",
            "Total number of optimiser runs that produced a feasible schedule",
        ))?;
        let run_failures_total = IntCounter::with_opts(Opts::new(
            "optimizer_run_failures_total",
            "Total number of optimiser runs that failed (NotFound/InvalidInput/NoFeasibleSolution)",
        ))?;
        let run_duration = Histogram::with_opts(HistogramOpts::new(
            "optimizer_run_duration_seconds",
            "Optimiser run duration, from adapter load through persistence",
        ))?;
        let trains_scheduled_total = IntCounter::with_opts(Opts::new(
            "optimizer_trains_scheduled_total",
            "Total number of trains included across all optimiser runs",
        ))?;
        let events_persisted_total = IntCounter::with_opts(Opts::new(
            "optimizer_events_persisted_total",
            "Total number of train events written back by the materialiser",
        ))?;

        let store_queries_total = IntCounter::with_opts(Opts::new(
            "store_queries_total",
            "Total number of persistence reads/writes",
        ))?;
        let store_query_duration = Histogram::with_opts(HistogramOpts::new(
            "store_query_duration_seconds",
            "Persistence call duration",
        ))?;

        let uptime_seconds = IntGauge::with_opts(Opts::new(
            "process_uptime_seconds",
            "Process uptime in seconds",
        ))?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration.clone()))?;
        registry.register(Box::new(runs_total.clone()))?;
        registry.register(Box::new(run_success_total.clone()))?;
        registry.register(Box::new(run_failures_total.clone()))?;
        registry.register(Box::new(run_duration.clone()))?;
        registry.register(Box::new(trains_scheduled_total.clone()))?;
        registry.register(Box::new(events_persisted_total.clone()))?;
        registry.register(Box::new(store_queries_total.clone()))?;
        registry.register(Box::new(store_query_duration.clone()))?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        Ok(Self {
            http_requests_total,
            http_request_duration,
            runs_total,
            run_success_total,
            run_failures_total,
            run_duration,
            trains_scheduled_total,
            events_persisted_total,
            store_queries_total,
            store_query_duration,
            uptime_seconds,
            registry,
        })
    }

    pub fn record_http_request(&self) {
        self.http_requests_total.inc();
    }

    pub fn record_http_duration(&self, duration_seconds: f64) {
        self.http_request_duration.observe(duration_seconds);
    }

    /// Record one optimiser run (§4.4 solve driver outcome).
    pub fn record_run(&self, success: bool, trains: usize, events_inserted: u64, duration_seconds: f64) {
        self.runs_total.inc();
        self.run_duration.observe(duration_seconds);
        if success {
            self.run_success_total.inc();
            self.trains_scheduled_total.inc_by(trains as u64);
            self.events_persisted_total.inc_by(events_inserted);
        } else {
            self.run_failures_total.inc();
        }
    }

    pub fn record_store_query(&self, duration_seconds: f64) {
        self.store_queries_total.inc();
        self.store_query_duration.observe(duration_seconds);
    }

    pub fn update_uptime(&self, uptime_seconds: i64) {
        self.uptime_seconds.set(uptime_seconds);
    }
}

/// Prometheus scrape endpoint, encoding the live registry.
pub async fn metrics_handler(State(state): State<AppState>) -> Result<Response<String>, StatusCode> {
    let encoder = TextEncoder::new();
    let metric_families = state.metrics.registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let body = String::from_utf8(buffer).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("content-type", encoder.format_type())
        .body(body)
        .unwrap())
}

/// Background task updating process-level gauges periodically.
pub async fn metrics_updater(metrics: Arc<AppMetrics>, interval_seconds: u64, started_at: std::time::Instant) {
    let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(interval_seconds.max(1)));

    loop {
        interval.tick().await;
        metrics.update_uptime(started_at.elapsed().as_secs() as i64);
        tracing::debug!("metrics updated");
    }
}
