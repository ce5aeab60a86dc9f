//! Replication metrics
//!
//! Prometheus-compatible counters and gauges for the replication subsystem.
//! Handlers receive the registry through their collaborators rather than
//! reaching for a global; `METRICS` exists as the default instance for
//! processes that want exactly one.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for monotonically increasing values
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Gauge for tracking current values
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicU64,
}

impl Gauge {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    pub fn set(&self, v: u64) {
        self.value.store(v, Ordering::Relaxed);
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.value.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Metrics registry for replication management
#[derive(Debug, Default)]
pub struct ReplicationMetrics {
    /// Invocations that could only partially restore replication
    pub partial_replication_total: Counter,

    /// Replication commands handed to the transport
    pub replication_commands_sent_total: Counter,

    /// Delete commands handed to the transport
    pub delete_commands_sent_total: Counter,

    /// Sends refused because a datanode or the queue was at capacity
    pub commands_overloaded_total: Counter,

    /// Commands currently sitting in the transport queue
    pub queued_commands: Gauge,
}

impl ReplicationMetrics {
    /// Create a new metrics registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate Prometheus-compatible metrics output
    pub fn to_prometheus(&self) -> String {
        use std::fmt::Write;
        let mut out = String::new();

        out.push_str(
            "# HELP miniscm_partial_replication_total Reconciliations that found fewer targets than needed\n",
        );
        out.push_str("# TYPE miniscm_partial_replication_total counter\n");
        writeln!(
            out,
            "miniscm_partial_replication_total {}",
            self.partial_replication_total.get()
        )
        .unwrap();

        out.push_str(
            "# HELP miniscm_replication_commands_sent_total Replication commands handed to the transport\n",
        );
        out.push_str("# TYPE miniscm_replication_commands_sent_total counter\n");
        writeln!(
            out,
            "miniscm_replication_commands_sent_total {}",
            self.replication_commands_sent_total.get()
        )
        .unwrap();

        out.push_str(
            "# HELP miniscm_delete_commands_sent_total Delete commands handed to the transport\n",
        );
        out.push_str("# TYPE miniscm_delete_commands_sent_total counter\n");
        writeln!(
            out,
            "miniscm_delete_commands_sent_total {}",
            self.delete_commands_sent_total.get()
        )
        .unwrap();

        out.push_str(
            "# HELP miniscm_commands_overloaded_total Sends refused because a target was at capacity\n",
        );
        out.push_str("# TYPE miniscm_commands_overloaded_total counter\n");
        writeln!(
            out,
            "miniscm_commands_overloaded_total {}",
            self.commands_overloaded_total.get()
        )
        .unwrap();

        out.push_str("# HELP miniscm_queued_commands Commands waiting in the transport queue\n");
        out.push_str("# TYPE miniscm_queued_commands gauge\n");
        writeln!(out, "miniscm_queued_commands {}", self.queued_commands.get()).unwrap();

        out
    }
}

/// Global metrics instance
pub static METRICS: once_cell::sync::Lazy<ReplicationMetrics> =
    once_cell::sync::Lazy::new(ReplicationMetrics::new);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter() {
        let counter = Counter::new();

        assert_eq!(counter.get(), 0);
        counter.inc();
        assert_eq!(counter.get(), 1);
        counter.add(5);
        assert_eq!(counter.get(), 6);
    }

    #[test]
    fn test_gauge() {
        let gauge = Gauge::new();

        assert_eq!(gauge.get(), 0);
        gauge.set(10);
        assert_eq!(gauge.get(), 10);
        gauge.inc();
        assert_eq!(gauge.get(), 11);
        gauge.dec();
        assert_eq!(gauge.get(), 10);
    }

    #[test]
    fn test_prometheus_output() {
        let metrics = ReplicationMetrics::new();
        metrics.partial_replication_total.inc();
        metrics.replication_commands_sent_total.add(3);

        let out = metrics.to_prometheus();
        assert!(out.contains("miniscm_partial_replication_total 1"));
        assert!(out.contains("miniscm_replication_commands_sent_total 3"));
        assert!(out.contains("miniscm_queued_commands 0"));
    }
}
