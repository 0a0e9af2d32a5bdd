use once_cell::sync::Lazy;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, TextEncoder};

pub static METRICS: Lazy<StockroomMetrics> = Lazy::new(StockroomMetrics::init);

pub struct StockroomMetrics {
    pub queries_total: IntCounter,
    pub query_errors_total: IntCounter,
    pub query_duration: Histogram,
    pub connections_opened_total: IntCounter,
    pub http_responses_total: IntCounterVec,
}

impl StockroomMetrics {
    pub fn init() -> Self {
        let queries_total = IntCounter::new("stockroom_queries_total", "Total queries executed")
            .expect("failed to build queries_total");

        let query_errors_total =
            IntCounter::new("stockroom_query_errors_total", "Total failed queries")
                .expect("failed to build query_errors_total");

        let query_duration = Histogram::with_opts(HistogramOpts::new(
            "stockroom_query_duration_seconds",
            "Duration of queries",
        ))
        .expect("failed to build query_duration");

        let connections_opened_total = IntCounter::new(
            "stockroom_connections_opened_total",
            "Direct and pooled connections opened",
        )
        .expect("failed to build connections_opened_total");

        let http_responses_total = IntCounterVec::new(
            Opts::new("stockroom_http_responses_total", "HTTP responses by status class"),
            &["status"],
        )
        .expect("failed to build http_responses_total");

        prometheus::register(Box::new(queries_total.clone()))
            .expect("failed to register queries_total");
        prometheus::register(Box::new(query_errors_total.clone()))
            .expect("failed to register query_errors_total");
        prometheus::register(Box::new(query_duration.clone()))
            .expect("failed to register query_duration");
        prometheus::register(Box::new(connections_opened_total.clone()))
            .expect("failed to register connections_opened_total");
        prometheus::register(Box::new(http_responses_total.clone()))
            .expect("failed to register http_responses_total");

        Self {
            queries_total,
            query_errors_total,
            query_duration,
            connections_opened_total,
            http_responses_total,
        }
    }

    pub fn record_query(&self, elapsed: std::time::Duration) {
        self.queries_total.inc();
        self.query_duration.observe(elapsed.as_secs_f64());
    }

    pub fn record_query_error(&self) {
        self.query_errors_total.inc();
    }

    pub fn record_connection_opened(&self) {
        self.connections_opened_total.inc();
    }

    pub fn record_http_response(&self, status: u16) {
        let class = match status {
            200..=299 => "2xx",
            400..=499 => "4xx",
            _ => "5xx",
        };
        self.http_responses_total.with_label_values(&[class]).inc();
    }
}

/// Render every registered metric in the Prometheus text format
pub fn gather_text() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
