//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with standardized naming conventions
//! for the bookmark, search, and storage pipelines.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Linkstash metrics
pub const METRICS_PREFIX: &str = "linkstash";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.00,
];

/// Buckets for scrape and storage-network latency (network-bound, slower)
pub const UPSTREAM_BUCKETS: &[f64] = &[
    0.100, 0.250, 0.500, 1.000, 2.000, 5.000, 10.00, 30.00,
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

    // Bookmark lifecycle metrics
    describe_counter!(
        format!("{}_bookmarks_added_total", METRICS_PREFIX),
        Unit::Count,
        "Total bookmarks added"
    );

    describe_counter!(
        format!("{}_bookmarks_removed_total", METRICS_PREFIX),
        Unit::Count,
        "Total bookmarks tombstoned"
    );

    // Scrape metrics
    describe_counter!(
        format!("{}_scrape_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total page scrape attempts"
    );

    describe_histogram!(
        format!("{}_scrape_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Page scrape latency in seconds"
    );

    // Search metrics
    describe_counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of search queries"
    );

    describe_histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Search query latency in seconds"
    );

    describe_gauge!(
        format!("{}_search_results_count", METRICS_PREFIX),
        Unit::Count,
        "Number of results returned from search"
    );

    // Permanent store metrics
    describe_counter!(
        format!("{}_permastore_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total permanent-store requests"
    );

    describe_histogram!(
        format!("{}_permastore_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Permanent-store request latency in seconds"
    );

    // Cache metrics
    describe_counter!(
        format!("{}_cache_hits_total", METRICS_PREFIX),
        Unit::Count,
        "Total document cache hits"
    );

    describe_counter!(
        format!("{}_cache_misses_total", METRICS_PREFIX),
        Unit::Count,
        "Total document cache misses (full reloads triggered)"
    );

    // Chat metrics
    describe_counter!(
        format!("{}_chat_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total chat completion requests"
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

/// Helper to record search metrics
pub fn record_search(duration_secs: f64, result_count: usize) {
    counter!(format!("{}_search_queries_total", METRICS_PREFIX)).increment(1);

    histogram!(format!("{}_search_duration_seconds", METRICS_PREFIX)).record(duration_secs);

    gauge!(format!("{}_search_results_count", METRICS_PREFIX)).set(result_count as f64);
}

/// Helper to record scrape metrics
pub fn record_scrape(duration_secs: f64, domain: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_scrape_requests_total", METRICS_PREFIX),
        "domain" => domain.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if success {
        histogram!(format!("{}_scrape_duration_seconds", METRICS_PREFIX)).record(duration_secs);
    }
}

/// Helper to record permanent-store request metrics
pub fn record_permastore(duration_secs: f64, operation: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_permastore_requests_total", METRICS_PREFIX),
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_permastore_duration_seconds", METRICS_PREFIX),
        "operation" => operation.to_string()
    )
    .record(duration_secs);
}

/// Helper to record cache metrics
pub fn record_cache(hit: bool) {
    if hit {
        counter!(format!("{}_cache_hits_total", METRICS_PREFIX)).increment(1);
    } else {
        counter!(format!("{}_cache_misses_total", METRICS_PREFIX)).increment(1);
    }
}

/// Helper to record bookmark lifecycle metrics
pub fn record_bookmark_added(domain: &str) {
    counter!(
        format!("{}_bookmarks_added_total", METRICS_PREFIX),
        "domain" => domain.to_string()
    )
    .increment(1);
}

pub fn record_bookmark_removed() {
    counter!(format!("{}_bookmarks_removed_total", METRICS_PREFIX)).increment(1);
}

pub fn record_chat_request(success: bool) {
    let status = if success { "success" } else { "error" };
    counter!(
        format!("{}_chat_requests_total", METRICS_PREFIX),
        "status" => status.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets_sorted() {
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_request_metrics() {
        let metrics = RequestMetrics::start("GET", "/bookmarks");
        std::thread::sleep(std::time::Duration::from_millis(5));
        metrics.finish(200);
        // Just verify it runs without panic
    }
}
