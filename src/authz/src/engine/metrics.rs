//! Decision counters for engine observability

use std::sync::Arc;

use parking_lot::RwLock;

/// Engine counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineMetrics {
    /// Total number of authorization requests
    pub total_requests: u64,

    /// Number of allowed decisions
    pub allowed_decisions: u64,

    /// Number of denied decisions
    pub denied_decisions: u64,

    /// Requests that failed with an internal error
    pub error_count: u64,

    /// Role or client snapshots installed
    pub snapshot_swaps: u64,

    /// Closure cache hits
    pub closure_cache_hits: u64,

    /// Closure cache misses
    pub closure_cache_misses: u64,
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

    /// Render in Prometheus text format
    pub fn to_prometheus(&self) -> String {
        format!(
            r#"# HELP authz_requests_total Total number of authorization requests
# TYPE authz_requests_total counter
authz_requests_total {}

# HELP authz_allowed_total Number of allowed decisions
# TYPE authz_allowed_total counter
authz_allowed_total {}

# HELP authz_denied_total Number of denied decisions
# TYPE authz_denied_total counter
authz_denied_total {}

# HELP authz_errors_total Error count
# TYPE authz_errors_total counter
authz_errors_total {}

# HELP authz_snapshot_swaps_total Role and client snapshots installed
# TYPE authz_snapshot_swaps_total counter
authz_snapshot_swaps_total {}

# HELP authz_closure_cache_hits_total Role closure cache hits
# TYPE authz_closure_cache_hits_total counter
authz_closure_cache_hits_total {}

# HELP authz_closure_cache_misses_total Role closure cache misses
# TYPE authz_closure_cache_misses_total counter
authz_closure_cache_misses_total {}
"#,
            self.total_requests,
            self.allowed_decisions,
            self.denied_decisions,
            self.error_count,
            self.snapshot_swaps,
            self.closure_cache_hits,
            self.closure_cache_misses,
        )
    }
}

/// Metrics collector
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    metrics: Arc<RwLock<EngineMetrics>>,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an authorization decision
    pub fn record_decision(&self, allowed: bool) {
        let mut metrics = self.metrics.write();
        metrics.total_requests += 1;

        if allowed {
            metrics.allowed_decisions += 1;
        } else {
            metrics.denied_decisions += 1;
        }
    }

    /// Record an error
    pub fn record_error(&self) {
        let mut metrics = self.metrics.write();
        metrics.total_requests += 1;
        metrics.error_count += 1;
    }

    /// Record a snapshot swap
    pub fn record_swap(&self) {
        self.metrics.write().snapshot_swaps += 1;
    }

    /// Get current metrics snapshot
    pub fn get_metrics(&self) -> EngineMetrics {
        self.metrics.read().clone()
    }

    /// Reset all metrics
    pub fn reset(&self) {
        *self.metrics.write() = EngineMetrics::default();
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        self.get_metrics().to_prometheus()
    }
}
