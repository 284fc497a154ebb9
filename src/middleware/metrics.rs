use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use http::StatusCode;
use serde::Serialize;

/// Process-wide request counters, exposed at `/debug/vars`.
#[derive(Debug, Default)]
pub struct Metrics {
    requests_received: AtomicU64,
    responses_sent: AtomicU64,
    processing_time_us: AtomicU64,
    by_status: Mutex<BTreeMap<u16, u64>>,
}

/// Point-in-time copy of [`Metrics`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests_received: u64,
    pub total_responses_sent: u64,
    pub total_processing_time_us: u64,
    pub total_responses_sent_by_status: BTreeMap<u16, u64>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_received(&self) {
        self.requests_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn response_sent(&self, status: StatusCode, elapsed: Duration) {
        self.responses_sent.fetch_add(1, Ordering::Relaxed);
        self.processing_time_us.fetch_add(micros(elapsed), Ordering::Relaxed);

        let mut by_status = self.by_status.lock().unwrap_or_else(|e| e.into_inner());
        *by_status.entry(status.as_u16()).or_default() += 1;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let by_status = self.by_status.lock().unwrap_or_else(|e| e.into_inner()).clone();
        MetricsSnapshot {
            total_requests_received: self.requests_received.load(Ordering::Relaxed),
            total_responses_sent: self.responses_sent.load(Ordering::Relaxed),
            total_processing_time_us: self.processing_time_us.load(Ordering::Relaxed),
            total_responses_sent_by_status: by_status,
        }
    }
}

/// Whole microseconds in `d`, saturating at `u64::MAX`.
pub(crate) fn micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let snapshot = Metrics::new().snapshot();
        assert_eq!(snapshot.total_requests_received, 0);
        assert_eq!(snapshot.total_responses_sent, 0);
        assert!(snapshot.total_responses_sent_by_status.is_empty());
    }

    #[test]
    fn counts_responses_by_status() {
        let metrics = Metrics::new();
        for status in [StatusCode::OK, StatusCode::OK, StatusCode::NOT_FOUND] {
            metrics.request_received();
            metrics.response_sent(status, Duration::from_micros(10));
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests_received, 3);
        assert_eq!(snapshot.total_responses_sent, 3);
        assert_eq!(snapshot.total_processing_time_us, 30);
        assert_eq!(snapshot.total_responses_sent_by_status, BTreeMap::from([(200, 2), (404, 1)]));
    }

    #[test]
    fn micros_saturate_instead_of_wrapping() {
        assert_eq!(micros(Duration::from_millis(3)), 3_000);
        assert_eq!(micros(Duration::MAX), u64::MAX);
    }

    #[test]
    fn snapshot_serializes_status_keys_as_strings() {
        let metrics = Metrics::new();
        metrics.response_sent(StatusCode::NO_CONTENT, Duration::ZERO);
        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["total_responses_sent_by_status"]["204"], 1);
    }
}
