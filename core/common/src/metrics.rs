// core/common/src/metrics.rs
// Prometheus metrics collection

use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
};
use std::time::Instant;

/// Service-wide metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    // HTTP metrics
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,
    pub http_requests_in_progress: IntGaugeVec,

    // Error metrics
    pub errors_total: IntCounterVec,
}

impl ServiceMetrics {
    pub fn new(registry: &Registry, service_name: &str) -> Result<Self, prometheus::Error> {
        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests")
                .namespace(service_name),
            &["method", "endpoint", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .namespace(service_name)
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["method", "endpoint"],
        )?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        let http_requests_in_progress = IntGaugeVec::new(
            Opts::new("http_requests_in_progress", "Number of HTTP requests currently being processed")
                .namespace(service_name),
            &["method", "endpoint"],
        )?;
        registry.register(Box::new(http_requests_in_progress.clone()))?;

        let errors_total = IntCounterVec::new(
            Opts::new("errors_total", "Total number of errors")
                .namespace(service_name),
            &["type", "operation"],
        )?;
        registry.register(Box::new(errors_total.clone()))?;

        Ok(Self {
            http_requests_total,
            http_request_duration_seconds,
            http_requests_in_progress,
            errors_total,
        })
    }

    /// Record an HTTP request
    pub fn record_http_request(
        &self,
        method: &str,
        endpoint: &str,
        status: u16,
        duration: f64,
    ) {
        self.http_requests_total
            .with_label_values(&[method, endpoint, &status.to_string()])
            .inc();

        self.http_request_duration_seconds
            .with_label_values(&[method, endpoint])
            .observe(duration);
    }

    /// Record an error
    pub fn record_error(&self, error_type: &str, operation: &str) {
        self.errors_total
            .with_label_values(&[error_type, operation])
            .inc();
    }

}

/// Timer to measure operation duration
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for MetricsTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Look-aside cache metrics, labelled by entity namespace
#[derive(Clone)]
pub struct CacheMetrics {
    /// outcome: hit | negative_hit | miss
    pub lookups_total: IntCounterVec,
    /// result: found | absent | error
    pub loads_total: IntCounterVec,
    /// operation: get | set | delete | decode
    pub errors_total: IntCounterVec,
    pub invalidations_total: IntCounterVec,
    pub load_duration_seconds: HistogramVec,
}

impl CacheMetrics {
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let lookups_total = IntCounterVec::new(
            Opts::new("cache_lookups_total", "Cache lookups by outcome"),
            &["namespace", "outcome"],
        )?;
        registry.register(Box::new(lookups_total.clone()))?;

        let loads_total = IntCounterVec::new(
            Opts::new("cache_loads_total", "Persistent store loads after a cache miss"),
            &["namespace", "result"],
        )?;
        registry.register(Box::new(loads_total.clone()))?;

        let errors_total = IntCounterVec::new(
            Opts::new("cache_errors_total", "Cache operations that failed and were ignored"),
            &["namespace", "operation"],
        )?;
        registry.register(Box::new(errors_total.clone()))?;

        let invalidations_total = IntCounterVec::new(
            Opts::new("cache_invalidations_total", "Cache keys invalidated after writes"),
            &["namespace"],
        )?;
        registry.register(Box::new(invalidations_total.clone()))?;

        let load_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "cache_load_duration_seconds",
                "Duration of persistent store loads on cache miss",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
            &["namespace"],
        )?;
        registry.register(Box::new(load_duration_seconds.clone()))?;

        Ok(Self {
            lookups_total,
            loads_total,
            errors_total,
            invalidations_total,
            load_duration_seconds,
        })
    }

    pub fn record_lookup(&self, namespace: &str, outcome: &str) {
        self.lookups_total.with_label_values(&[namespace, outcome]).inc();
    }

    pub fn record_load(&self, namespace: &str, result: &str, duration: f64) {
        self.loads_total.with_label_values(&[namespace, result]).inc();
        self.load_duration_seconds
            .with_label_values(&[namespace])
            .observe(duration);
    }

    pub fn record_error(&self, namespace: &str, operation: &str) {
        self.errors_total.with_label_values(&[namespace, operation]).inc();
    }

    pub fn record_invalidation(&self, namespace: &str) {
        self.invalidations_total.with_label_values(&[namespace]).inc();
    }
}

/// Thesis workflow metrics
#[derive(Clone)]
pub struct ThesisMetrics {
    pub logins_total: IntCounterVec,
    pub selections_total: IntCounterVec,
    pub documents_total: IntCounterVec,
    pub grades_recorded_total: IntCounterVec,
    pub open_topics: IntGauge,
    pub document_upload_bytes: Histogram,
}

impl ThesisMetrics {
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let logins_total = IntCounterVec::new(
            Opts::new("logins_total", "Login attempts by result"),
            &["result"],
        )?;
        registry.register(Box::new(logins_total.clone()))?;

        let selections_total = IntCounterVec::new(
            Opts::new("selections_total", "Topic selection transitions"),
            &["status"],
        )?;
        registry.register(Box::new(selections_total.clone()))?;

        let documents_total = IntCounterVec::new(
            Opts::new("documents_total", "Document submissions and reviews"),
            &["kind", "status"],
        )?;
        registry.register(Box::new(documents_total.clone()))?;

        let grades_recorded_total = IntCounterVec::new(
            Opts::new("grades_recorded_total", "Grades recorded by level"),
            &["level"],
        )?;
        registry.register(Box::new(grades_recorded_total.clone()))?;

        let open_topics = IntGauge::new("open_topics", "Topics currently open for selection")?;
        registry.register(Box::new(open_topics.clone()))?;

        let document_upload_bytes = Histogram::with_opts(
            HistogramOpts::new("document_upload_bytes", "Size of uploaded documents")
                .buckets(vec![
                    16_384.0, 131_072.0, 1_048_576.0, 4_194_304.0, 10_485_760.0, 20_971_520.0,
                ]),
        )?;
        registry.register(Box::new(document_upload_bytes.clone()))?;

        Ok(Self {
            logins_total,
            selections_total,
            documents_total,
            grades_recorded_total,
            open_topics,
            document_upload_bytes,
        })
    }
}
