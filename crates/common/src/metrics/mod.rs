//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with latency histograms
//! and standardized naming conventions.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Grafka metrics
pub const METRICS_PREFIX: &str = "grafka";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s - default source bound
    10.00,  // 10s
    30.00,  // 30s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Query metrics
    describe_counter!(
        format!("{}_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total questions answered, by terminal state"
    );

    describe_histogram!(
        format!("{}_query_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "End-to-end query latency in seconds"
    );

    // Evidence source metrics
    describe_counter!(
        format!("{}_source_calls_total", METRICS_PREFIX),
        Unit::Count,
        "Evidence source calls, by source and outcome"
    );

    describe_histogram!(
        format!("{}_source_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Evidence source latency in seconds"
    );

    // Extraction metrics
    describe_counter!(
        format!("{}_triples_extracted_total", METRICS_PREFIX),
        Unit::Count,
        "Total triples produced by the extractor"
    );

    describe_gauge!(
        format!("{}_last_extraction_triples", METRICS_PREFIX),
        Unit::Count,
        "Triples produced by the most recent extraction"
    );

    // Embedding metrics
    describe_counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding requests"
    );

    describe_histogram!(
        format!("{}_embedding_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Embedding generation latency in seconds"
    );

    describe_counter!(
        format!("{}_embedding_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding errors"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record a finished query
pub fn record_query(duration_secs: f64, state: &str, tenant_id: &str) {
    counter!(
        format!("{}_queries_total", METRICS_PREFIX),
        "state" => state.to_string(),
        "tenant" => tenant_id.to_string()
    )
    .increment(1);

    histogram!(format!("{}_query_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// Record one evidence source call
pub fn record_source(source: &str, duration_secs: f64, success: bool) {
    let outcome = if success { "success" } else { "failed" };

    counter!(
        format!("{}_source_calls_total", METRICS_PREFIX),
        "source" => source.to_string(),
        "outcome" => outcome
    )
    .increment(1);

    histogram!(
        format!("{}_source_duration_seconds", METRICS_PREFIX),
        "source" => source.to_string()
    )
    .record(duration_secs);
}

/// Record an extraction run
pub fn record_extraction(input_kind: &str, triples: usize) {
    counter!(
        format!("{}_triples_extracted_total", METRICS_PREFIX),
        "kind" => input_kind.to_string()
    )
    .increment(triples as u64);

    gauge!(
        format!("{}_last_extraction_triples", METRICS_PREFIX),
        "kind" => input_kind.to_string()
    )
    .set(triples as f64);
}

/// Helper to record embedding metrics
pub fn record_embedding(duration_secs: f64, model: &str, batch_size: usize, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status
    )
    .increment(batch_size as u64);

    if success {
        histogram!(
            format!("{}_embedding_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .record(duration_secs);
    } else {
        counter!(
            format!("{}_embedding_errors_total", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .increment(1);
    }
}
