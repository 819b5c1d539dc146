// Metrics module for observability
// Describes the exported series and records HTTP request outcomes

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Initialize all metric descriptions
/// Should be called once at application startup
pub fn init_metrics() {
    // HTTP request metrics
    describe_counter!(
        "http_requests_total",
        "Total number of HTTP requests received"
    );
    describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_counter!(
        "http_requests_errors_total",
        "Total number of HTTP request errors"
    );

    // Gamification metrics
    describe_counter!("repit_xp_awarded_total", "Total experience points awarded");
    describe_counter!("repit_level_ups_total", "Total number of level ups");
    describe_counter!(
        "repit_achievements_unlocked_total",
        "Total number of achievements unlocked"
    );
    describe_counter!("repit_badges_awarded_total", "Total number of badges awarded");

    // Analytics metrics
    describe_counter!(
        "repit_lessons_recorded_total",
        "Total number of lesson records stored"
    );
    describe_counter!(
        "repit_reports_generated_total",
        "Total number of analytics reports rendered"
    );

    tracing::info!("Metrics initialized");
}

/// Install the Prometheus recorder; the handle renders the scrape output
pub fn install_prometheus() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    counter!("http_requests_total", "method" => method.to_string(), "path" => path.to_string(), "status" => status.to_string()).increment(1);
    histogram!("http_request_duration_seconds", "method" => method.to_string(), "path" => path.to_string()).record(duration_secs);

    if status >= 400 {
        counter!("http_requests_errors_total", "method" => method.to_string(), "path" => path.to_string(), "status" => status.to_string()).increment(1);
    }
}

/// Record a stored lesson outcome
pub fn record_lesson_stored(subject: &str) {
    counter!("repit_lessons_recorded_total", "subject" => subject.to_string()).increment(1);
}

/// Record a rendered analytics report
pub fn record_report(kind: &str, format: &str) {
    counter!("repit_reports_generated_total", "kind" => kind.to_string(), "format" => format.to_string()).increment(1);
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
