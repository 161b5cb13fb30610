use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tally_core::Operator;

/// Engine counters exposed at `/internal/metrics`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineMetrics {
    /// Tasks handed to workers, redeliveries included.
    pub tasks_dispatched: u64,
    pub results_applied: u64,
    pub duplicates_rejected: u64,
    /// Leases that expired and went back on the queue.
    pub leases_reclaimed: u64,
    pub expressions_completed: u64,
    pub expressions_failed: u64,
    pub parse_errors: u64,
    /// Tasks waiting to be pulled.
    pub queue_depth: usize,
    /// Tasks pulled but not yet answered.
    pub in_flight: usize,
    pub live_expressions: usize,
    /// Mean dispatch-to-result latency per operator, in milliseconds.
    pub avg_latency_ms: HashMap<String, f64>,
    /// Results counted toward `avg_latency_ms`, per operator.
    pub latency_samples: HashMap<String, u64>,
    pub last_completed_at: Option<DateTime<Utc>>,
}

impl EngineMetrics {
    /// Fold one dispatch-to-result latency into the per-operator mean.
    pub fn record_latency(&mut self, operator: Operator, latency: Duration) {
        let key = operator.symbol().to_string();
        let count = self.latency_samples.entry(key.clone()).or_default();
        *count += 1;
        let n = *count;

        let sample = latency.as_secs_f64() * 1000.0;
        let avg = self.avg_latency_ms.entry(key).or_insert(0.0);
        // Incremental mean: new_avg = prev_avg + (sample - prev_avg) / n
        *avg += (sample - *avg) / n as f64;
    }

    pub fn record_completion(&mut self) {
        self.expressions_completed += 1;
        self.last_completed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_single_latency() {
        let mut m = EngineMetrics::default();
        m.record_latency(Operator::Mul, Duration::from_millis(100));

        assert_eq!(m.latency_samples["*"], 1);
        assert!((m.avg_latency_ms["*"] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn record_multiple_latencies_averages() {
        let mut m = EngineMetrics::default();
        m.record_latency(Operator::Add, Duration::from_millis(100));
        m.record_latency(Operator::Add, Duration::from_millis(200));
        m.record_latency(Operator::Div, Duration::from_millis(40));

        assert_eq!(m.latency_samples["+"], 2);
        assert!((m.avg_latency_ms["+"] - 150.0).abs() < 1e-9);
        assert!((m.avg_latency_ms["/"] - 40.0).abs() < 1e-9);
    }

    #[test]
    fn default_metrics() {
        let m = EngineMetrics::default();
        assert_eq!(m.tasks_dispatched, 0);
        assert_eq!(m.queue_depth, 0);
        assert!(m.avg_latency_ms.is_empty());
        assert!(m.last_completed_at.is_none());
    }

    #[test]
    fn completion_stamps_time() {
        let mut m = EngineMetrics::default();
        m.record_completion();
        assert_eq!(m.expressions_completed, 1);
        assert!(m.last_completed_at.is_some());
    }
}
