//! Decision metrics collection
//!
//! Recording is constant time and never blocks on other recorders for
//! longer than a ring-buffer push. Averages and percentiles are computed
//! when a snapshot is taken.

use super::decision::DecisionStep;
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Maximum latency samples kept for percentile calculation
const MAX_SAMPLES: usize = 10_000;

/// Engine performance metrics snapshot
#[derive(Debug, Clone, Default)]
pub struct EngineMetrics {
    /// Total number of decisions
    pub total_requests: u64,

    /// Number of allowed decisions
    pub allowed_decisions: u64,

    /// Number of denied decisions
    pub denied_decisions: u64,

    /// Decisions per concluding step
    pub step_counts: BTreeMap<DecisionStep, u64>,

    /// Latency percentiles (p50, p90, p99)
    pub latency_p50_ms: f64,
    pub latency_p90_ms: f64,
    pub latency_p99_ms: f64,

    /// Average latency
    pub avg_latency_ms: f64,

    /// Invalid calls and store failures
    pub error_count: u64,
}

impl EngineMetrics {
    /// Calculate allow rate
    pub fn allow_rate(&self) -> f64 {
        let total = self.allowed_decisions + self.denied_decisions;
        if total == 0 {
            0.0
        } else {
            self.allowed_decisions as f64 / total as f64
        }
    }

    /// Decisions concluded by `step`
    pub fn step_count(&self, step: DecisionStep) -> u64 {
        self.step_counts.get(&step).copied().unwrap_or(0)
    }
}

/// Metrics collector with Prometheus-compatible export
pub struct MetricsCollector {
    total_requests: AtomicU64,
    allowed_decisions: AtomicU64,
    denied_decisions: AtomicU64,
    error_count: AtomicU64,

    /// Indexed by position in [`DecisionStep::ALL`]
    step_counts: [AtomicU64; DecisionStep::ALL.len()],

    /// Most recent latencies in milliseconds, oldest first
    latency_samples: Mutex<VecDeque<f64>>,

    /// Maximum samples to keep
    max_samples: usize,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::with_capacity(MAX_SAMPLES)
    }

    /// Create a collector keeping at most `max_samples` latencies
    pub fn with_capacity(max_samples: usize) -> Self {
        let max_samples = max_samples.max(1);
        Self {
            total_requests: AtomicU64::new(0),
            allowed_decisions: AtomicU64::new(0),
            denied_decisions: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            step_counts: Default::default(),
            latency_samples: Mutex::new(VecDeque::with_capacity(max_samples)),
            max_samples,
        }
    }

    /// Record a decision and the step that concluded it
    pub fn record_decision(&self, step: DecisionStep, allowed: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        if allowed {
            self.allowed_decisions.fetch_add(1, Ordering::Relaxed);
        } else {
            self.denied_decisions.fetch_add(1, Ordering::Relaxed);
        }

        self.step_counts[step.index()].fetch_add(1, Ordering::Relaxed);
    }

    /// Record decision latency
    pub fn record_latency(&self, latency: Duration) {
        let latency_ms = latency.as_secs_f64() * 1000.0;

        let mut samples = self.latency_samples.lock();
        if samples.len() >= self.max_samples {
            samples.pop_front();
        }
        samples.push_back(latency_ms);
    }

    /// Record a failed call
    pub fn record_error(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn get_metrics(&self) -> EngineMetrics {
        // Copy under the lock, sort outside it
        let mut sorted: Vec<f64> = self.latency_samples.lock().iter().copied().collect();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let avg_latency_ms = if sorted.is_empty() {
            0.0
        } else {
            sorted.iter().sum::<f64>() / sorted.len() as f64
        };

        let step_counts = DecisionStep::ALL
            .iter()
            .map(|step| (*step, self.step_counts[step.index()].load(Ordering::Relaxed)))
            .filter(|(_, count)| *count > 0)
            .collect();

        EngineMetrics {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            allowed_decisions: self.allowed_decisions.load(Ordering::Relaxed),
            denied_decisions: self.denied_decisions.load(Ordering::Relaxed),
            step_counts,
            latency_p50_ms: Self::percentile(&sorted, 0.50),
            latency_p90_ms: Self::percentile(&sorted, 0.90),
            latency_p99_ms: Self::percentile(&sorted, 0.99),
            avg_latency_ms,
            error_count: self.error_count.load(Ordering::Relaxed),
        }
    }

    /// Reset all metrics
    pub fn reset(&self) {
        self.total_requests.store(0, Ordering::Relaxed);
        self.allowed_decisions.store(0, Ordering::Relaxed);
        self.denied_decisions.store(0, Ordering::Relaxed);
        self.error_count.store(0, Ordering::Relaxed);
        for count in &self.step_counts {
            count.store(0, Ordering::Relaxed);
        }

        self.latency_samples.lock().clear();
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        let metrics = self.get_metrics();

        let mut out = format!(
            r#"# HELP authz_requests_total Total number of authorization decisions
# TYPE authz_requests_total counter
authz_requests_total {}

# HELP authz_allowed_total Number of allowed decisions
# TYPE authz_allowed_total counter
authz_allowed_total {}

# HELP authz_denied_total Number of denied decisions
# TYPE authz_denied_total counter
authz_denied_total {}

# HELP authz_latency_seconds Decision latency percentiles
# TYPE authz_latency_seconds summary
authz_latency_seconds{{quantile="0.5"}} {}
authz_latency_seconds{{quantile="0.9"}} {}
authz_latency_seconds{{quantile="0.99"}} {}

# HELP authz_errors_total Error count
# TYPE authz_errors_total counter
authz_errors_total {}

# HELP authz_decisions_by_step_total Decisions per concluding evaluation step
# TYPE authz_decisions_by_step_total counter
"#,
            metrics.total_requests,
            metrics.allowed_decisions,
            metrics.denied_decisions,
            metrics.latency_p50_ms / 1000.0,
            metrics.latency_p90_ms / 1000.0,
            metrics.latency_p99_ms / 1000.0,
            metrics.error_count,
        );

        for step in DecisionStep::ALL {
            out.push_str(&format!(
                "authz_decisions_by_step_total{{step=\"{}\"}} {}\n",
                step,
                metrics.step_count(step)
            ));
        }

        out
    }

    /// Calculate percentile from sorted data
    fn percentile(sorted: &[f64], p: f64) -> f64 {
        if sorted.is_empty() {
            return 0.0;
        }

        let idx = ((sorted.len() as f64) * p) as usize;
        let idx = idx.min(sorted.len() - 1);
        sorted[idx]
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_record_decision() {
        let collector = MetricsCollector::new();

        collector.record_decision(DecisionStep::RoleGrant, true);
        collector.record_decision(DecisionStep::Acl, false);
        collector.record_decision(DecisionStep::RoleGrant, true);

        let metrics = collector.get_metrics();
        assert_eq!(metrics.total_requests, 3);
        assert_eq!(metrics.allowed_decisions, 2);
        assert_eq!(metrics.denied_decisions, 1);
        assert_eq!(metrics.step_count(DecisionStep::RoleGrant), 2);
        assert_eq!(metrics.step_count(DecisionStep::Ownership), 0);
        assert!((metrics.allow_rate() - 0.666).abs() < 0.01);
    }

    #[test]
    fn test_record_latency() {
        let collector = MetricsCollector::new();

        collector.record_latency(Duration::from_millis(5));
        collector.record_latency(Duration::from_millis(10));
        collector.record_latency(Duration::from_millis(15));

        let metrics = collector.get_metrics();
        assert!((metrics.avg_latency_ms - 10.0).abs() < 1.0);
        assert!(metrics.latency_p50_ms > 0.0);
        assert!(metrics.latency_p99_ms >= metrics.latency_p50_ms);
    }

    #[test]
    fn test_latency_buffer_is_bounded() {
        let collector = MetricsCollector::with_capacity(3);

        for ms in [100, 1, 2, 3] {
            collector.record_latency(Duration::from_millis(ms));
        }

        // The 100ms sample was the oldest and has been dropped
        let metrics = collector.get_metrics();
        assert!((metrics.avg_latency_ms - 2.0).abs() < 0.5);
        assert!(metrics.latency_p99_ms < 10.0);
    }

    #[test]
    fn test_prometheus_export() {
        let collector = MetricsCollector::new();

        collector.record_decision(DecisionStep::Acl, true);
        collector.record_error();

        let prometheus = collector.export_prometheus();
        assert!(prometheus.contains("authz_requests_total 1"));
        assert!(prometheus.contains("authz_errors_total 1"));
        assert!(prometheus.contains("authz_decisions_by_step_total{step=\"acl\"} 1"));
        assert!(prometheus.contains("authz_decisions_by_step_total{step=\"default_deny\"} 0"));
    }

    #[test]
    fn test_reset() {
        let collector = MetricsCollector::new();

        collector.record_decision(DecisionStep::DefaultDeny, false);
        collector.record_latency(Duration::from_millis(1));
        collector.reset();

        let metrics = collector.get_metrics();
        assert_eq!(metrics.total_requests, 0);
        assert!(metrics.step_counts.is_empty());
        assert_eq!(metrics.avg_latency_ms, 0.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_reset_concurrent_with_recording() {
        let collector = Arc::new(MetricsCollector::with_capacity(64));

        let recorders: Vec<_> = (0..4)
            .map(|_| {
                let collector = Arc::clone(&collector);
                tokio::spawn(async move {
                    for i in 0..2_000u64 {
                        collector.record_latency(Duration::from_micros(i));
                        collector.record_decision(DecisionStep::RoleGrant, i % 2 == 0);
                    }
                })
            })
            .collect();

        let resetter = {
            let collector = Arc::clone(&collector);
            tokio::spawn(async move {
                for _ in 0..200 {
                    collector.reset();
                    tokio::task::yield_now().await;
                }
            })
        };

        for handle in recorders {
            handle.await.unwrap();
        }
        resetter.await.unwrap();

        let metrics = collector.get_metrics();
        assert!(metrics.total_requests <= 8_000);
        assert_eq!(
            metrics.total_requests,
            metrics.allowed_decisions + metrics.denied_decisions
        );
    }
}
