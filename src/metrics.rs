use lazy_static::lazy_static;
use prometheus::{
    Gauge, HistogramVec, IntCounterVec, register_gauge, register_histogram_vec,
    register_int_counter_vec,
};


lazy_static! {
    pub static ref REQUEST_TOTAL: IntCounterVec = register_int_counter_vec!(
        "leadgate_requests_total",
        "Total number of requests per endpoint",
        &["endpoint"]
    )
    .unwrap();
    pub static ref SUBMISSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "leadgate_submissions_total",
        "Records persisted, by kind",
        &["kind"]
    )
    .unwrap();
    pub static ref RATE_LIMITED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "leadgate_rate_limited_total",
        "Requests rejected by the rate limiter",
        &["endpoint"]
    )
    .unwrap();
    pub static ref REQUEST_LATENCY: HistogramVec = register_histogram_vec!(
        "leadgate_request_latency_seconds",
        "Request latency in seconds",
        &["endpoint"]
    )
    .unwrap();
    pub static ref RATE_LIMIT_ENTRIES: Gauge = register_gauge!(
        "leadgate_rate_limit_entries",
        "Identities currently tracked by the rate limiter"
    )
    .unwrap();
}
