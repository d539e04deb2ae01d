//! # Prometheus Metrics
//!
//! HTTP-level metrics (request counts, latency, errors) are recorded in
//! middleware. Evaluation outcomes are recorded by the check handler as they
//! happen. The stored-policy gauge is refreshed on each `/metrics` scrape
//! (pull model), see the metrics handler in `lib.rs`.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{
    core::Collector, Encoder, Gauge, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry,
    TextEncoder,
};

/// Outcome label of one `/check_document` evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationOutcome {
    Compliant,
    NonCompliant,
    Error,
}

impl EvaluationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compliant => "compliant",
            Self::NonCompliant => "non_compliant",
            Self::Error => "error",
        }
    }
}

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    // -- HTTP middleware metrics (push model) --
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,

    // -- Evaluation metrics (push model, recorded by the check handler) --
    evaluations_total: IntCounterVec,
    evaluation_duration_seconds: HistogramVec,

    // -- Stored policies (pull model, updated on /metrics scrape) --
    policies_total: Gauge,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .field("errors", &self.errors())
            .finish()
    }
}

impl ApiMetrics {
    /// Create a new metrics instance with a fresh Prometheus registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("polcheck_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "polcheck_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "path"],
        )
        .expect("metric can be created");

        let http_errors_total = IntCounterVec::new(
            Opts::new("polcheck_http_errors_total", "Total HTTP errors (4xx and 5xx)"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let evaluations_total = IntCounterVec::new(
            Opts::new(
                "polcheck_evaluations_total",
                "Compliance evaluations by mode and outcome",
            ),
            &["mode", "outcome"],
        )
        .expect("metric can be created");

        // Prompt-mode calls take seconds; the tail buckets are for them.
        let evaluation_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "polcheck_evaluation_duration_seconds",
                "Compliance evaluation duration in seconds",
            )
            .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
            &["mode"],
        )
        .expect("metric can be created");

        let policies_total = Gauge::new("polcheck_policies_total", "Stored policies")
            .expect("metric can be created");

        registry
            .register(Box::new(http_requests_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(http_errors_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(evaluations_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(evaluation_duration_seconds.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(policies_total.clone()))
            .expect("metric can be registered");

        Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                evaluations_total,
                evaluation_duration_seconds,
                policies_total,
            }),
        }
    }

    /// Total request count (sum across all labels).
    pub fn requests(&self) -> u64 {
        sum_counter(&self.inner.http_requests_total)
    }

    /// Total error count (sum across all labels).
    pub fn errors(&self) -> u64 {
        sum_counter(&self.inner.http_errors_total)
    }

    /// Evaluations recorded for `mode` and `outcome`.
    pub fn evaluations(&self, mode: &str, outcome: EvaluationOutcome) -> u64 {
        self.inner
            .evaluations_total
            .with_label_values(&[mode, outcome.as_str()])
            .get()
    }

    /// Record an HTTP request (called by the middleware).
    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();

        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);

        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status_str])
                .inc();
        }
    }

    /// Record one finished evaluation.
    pub fn record_evaluation(&self, mode: &str, outcome: EvaluationOutcome, duration_secs: f64) {
        self.inner
            .evaluations_total
            .with_label_values(&[mode, outcome.as_str()])
            .inc();
        self.inner
            .evaluation_duration_seconds
            .with_label_values(&[mode])
            .observe(duration_secs);
    }

    /// Access the policies gauge for updating.
    pub fn policies_total(&self) -> &Gauge {
        &self.inner.policies_total
    }

    /// Gather all metrics and encode to Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer).map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn sum_counter(counter: &IntCounterVec) -> u64 {
    counter
        .collect()
        .iter()
        .flat_map(|mf| mf.get_metric())
        .map(|m| m.get_counter().get_value() as u64)
        .sum()
}

/// Collapse per-policy paths to a route template.
///
/// Filenames are user-chosen, so labelling by raw path would grow the
/// series count with every upload.
fn normalize_path(path: &str) -> String {
    match path.strip_prefix("/policies/") {
        Some(rest) if !rest.is_empty() => "/policies/{filename}".to_string(),
        _ => path.to_string(),
    }
}

/// Middleware that records HTTP request metrics via Prometheus.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        let duration = start.elapsed().as_secs_f64();
        let status = response.status().as_u16();
        m.record_request(&method, &path, status, duration);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_metrics_new_starts_at_zero() {
        let m = ApiMetrics::new();
        assert_eq!(m.requests(), 0);
        assert_eq!(m.errors(), 0);
        assert_eq!(m.evaluations("substring", EvaluationOutcome::Compliant), 0);
    }

    #[test]
    fn request_and_error_counts_independent() {
        let m = ApiMetrics::new();
        for _ in 0..5 {
            m.record_request("GET", "/policies", 200, 0.01);
        }
        m.record_request("POST", "/check_document", 400, 0.1);
        m.record_request("POST", "/upload_policy", 500, 0.05);
        assert_eq!(m.requests(), 7);
        assert_eq!(m.errors(), 2);
    }

    #[test]
    fn clone_shares_underlying_counters() {
        let m = ApiMetrics::new();
        let clone = m.clone();

        m.record_request("GET", "/", 200, 0.01);
        assert_eq!(clone.requests(), 1);

        clone.record_evaluation("prompt", EvaluationOutcome::Error, 1.2);
        assert_eq!(m.evaluations("prompt", EvaluationOutcome::Error), 1);
    }

    #[test]
    fn evaluations_are_labelled_by_mode_and_outcome() {
        let m = ApiMetrics::new();
        m.record_evaluation("substring", EvaluationOutcome::Compliant, 0.001);
        m.record_evaluation("substring", EvaluationOutcome::NonCompliant, 0.001);
        m.record_evaluation("substring", EvaluationOutcome::NonCompliant, 0.002);
        assert_eq!(m.evaluations("substring", EvaluationOutcome::Compliant), 1);
        assert_eq!(m.evaluations("substring", EvaluationOutcome::NonCompliant), 2);
        assert_eq!(m.evaluations("prompt", EvaluationOutcome::NonCompliant), 0);
    }

    #[test]
    fn gather_and_encode_produces_text() {
        let m = ApiMetrics::new();
        m.record_request("GET", "/policies", 200, 0.01);
        m.record_evaluation("substring", EvaluationOutcome::Compliant, 0.001);
        m.policies_total().set(3.0);
        let output = m.gather_and_encode().unwrap();
        assert!(output.contains("polcheck_http_requests_total"));
        assert!(output.contains("polcheck_http_request_duration_seconds"));
        assert!(output.contains("polcheck_evaluations_total"));
        assert!(output.contains("polcheck_policies_total 3"));
    }

    #[test]
    fn normalize_path_collapses_policy_filenames() {
        assert_eq!(normalize_path("/policies/handbook.pdf"), "/policies/{filename}");
        assert_eq!(normalize_path("/policies"), "/policies");
        assert_eq!(normalize_path("/policies/"), "/policies/");
        assert_eq!(normalize_path("/check_document"), "/check_document");
    }
}
