use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Account provisioning counters
#[derive(Debug, Default)]
pub struct ProvisioningMetrics {
    pub sign_in_attempts: AtomicU64,
    pub sign_in_failures: AtomicU64,
    pub sign_up_attempts: AtomicU64,
    pub sign_up_failures: AtomicU64,
    pub upload_failures: AtomicU64,
    pub compensations: AtomicU64,
    pub sign_outs: AtomicU64,
}

impl ProvisioningMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sign_in_attempt(&self) {
        self.sign_in_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sign_in_failure(&self) {
        self.sign_in_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sign_up_attempt(&self) {
        self.sign_up_attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts failure reports, so an independent coach sign-up can add two
    pub fn record_sign_up_failure(&self) {
        self.sign_up_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upload_failure(&self) {
        self.upload_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_compensation(&self) {
        self.compensations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sign_out(&self) {
        self.sign_outs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> ProvisioningStats {
        ProvisioningStats {
            sign_in_attempts: self.sign_in_attempts.load(Ordering::Relaxed),
            sign_in_failures: self.sign_in_failures.load(Ordering::Relaxed),
            sign_up_attempts: self.sign_up_attempts.load(Ordering::Relaxed),
            sign_up_failures: self.sign_up_failures.load(Ordering::Relaxed),
            upload_failures: self.upload_failures.load(Ordering::Relaxed),
            compensations: self.compensations.load(Ordering::Relaxed),
            sign_outs: self.sign_outs.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Provisioning metrics: sign_ins={}, sign_in_failures={}, sign_ups={}, sign_up_failures={}, upload_failures={}, compensations={}, sign_outs={}",
            stats.sign_in_attempts,
            stats.sign_in_failures,
            stats.sign_up_attempts,
            stats.sign_up_failures,
            stats.upload_failures,
            stats.compensations,
            stats.sign_outs
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningStats {
    pub sign_in_attempts: u64,
    pub sign_in_failures: u64,
    pub sign_up_attempts: u64,
    pub sign_up_failures: u64,
    pub upload_failures: u64,
    pub compensations: u64,
    pub sign_outs: u64,
}

/// Global metrics instance
static PROVISIONING_METRICS: std::sync::LazyLock<ProvisioningMetrics> =
    std::sync::LazyLock::new(ProvisioningMetrics::new);

pub fn provisioning_metrics() -> &'static ProvisioningMetrics {
    &PROVISIONING_METRICS
}

/// Time an operation and log its duration
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis() as u64,
            "Operation completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_independently() {
        let metrics = ProvisioningMetrics::new();
        metrics.record_sign_in_attempt();
        metrics.record_sign_in_attempt();
        metrics.record_sign_in_failure();
        metrics.record_upload_failure();

        let stats = metrics.get_stats();
        assert_eq!(stats.sign_in_attempts, 2);
        assert_eq!(stats.sign_in_failures, 1);
        assert_eq!(stats.upload_failures, 1);
        assert_eq!(stats.sign_up_attempts, 0);
    }
}
