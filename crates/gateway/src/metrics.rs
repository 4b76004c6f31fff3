use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use std::time::Duration;

const LATENCY_BUCKETS: [f64; 14] = [
    0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 0.75, 1.0, 2.5, 5.0,
];

/// Request metrics, exported only when a meter provider is installed.
#[derive(Clone)]
pub struct Metrics {
    requests: Counter<u64>,
    duration: Histogram<f64>,
    detections: Counter<u64>,
}

impl Metrics {
    pub fn new(meter_name: &'static str) -> Self {
        let meter = global::meter(meter_name);

        let requests = meter
            .u64_counter("predict_requests_total")
            .with_description("Prediction requests by outcome")
            .build();
        let duration = meter
            .f64_histogram("predict_duration_seconds")
            .with_description("Time to serve a prediction (decode + detect + serialize)")
            .with_unit("s")
            .with_boundaries(LATENCY_BUCKETS.to_vec())
            .build();
        let detections = meter
            .u64_counter("detections_total")
            .with_description("Total detections returned")
            .build();

        Self {
            requests,
            duration,
            detections,
        }
    }

    pub fn record_request(&self, status: u16, elapsed: Duration) {
        let attributes = [KeyValue::new("status", i64::from(status))];
        self.requests.add(1, &attributes);
        self.duration.record(elapsed.as_secs_f64(), &attributes);
    }

    pub fn record_detections(&self, count: usize) {
        self.detections.add(count as u64, &[]);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new("gateway")
    }
}
