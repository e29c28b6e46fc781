use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{info, warn};

use crate::migration::ProviderError;

/// AWS Organizations and STS call counters for one run
#[derive(Debug, Default)]
pub struct ApiCallMetrics {
    pub total_calls: AtomicU64,
    pub mutating_calls: AtomicU64,
    pub throttled: AtomicU64,
    pub errors: AtomicU64,
}

impl ApiCallMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_call(&self, mutating: bool) {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        if mutating {
            self.mutating_calls.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Count a failed call; throttling is tracked separately
    pub fn record_error(&self, error: &ProviderError) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        if matches!(error, ProviderError::Throttled { .. }) {
            self.throttled.fetch_add(1, Ordering::Relaxed);
            warn!("AWS API request throttled after SDK retries");
        }
    }

    pub fn get_stats(&self) -> ApiCallStats {
        ApiCallStats {
            total_calls: self.total_calls.load(Ordering::Relaxed),
            mutating_calls: self.mutating_calls.load(Ordering::Relaxed),
            throttled: self.throttled.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            total_calls = stats.total_calls,
            mutating_calls = stats.mutating_calls,
            throttled = stats.throttled,
            errors = stats.errors,
            "AWS API usage"
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApiCallStats {
    pub total_calls: u64,
    pub mutating_calls: u64,
    pub throttled: u64,
    pub errors: u64,
}

/// Logs the elapsed time of an operation when finished
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
        info!(
            operation = %self.operation,
            duration_ms = self.start.elapsed().as_millis() as u64,
            "Operation completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttles_count_as_errors() {
        let metrics = ApiCallMetrics::new();
        metrics.record_call(false);
        metrics.record_call(true);
        metrics.record_error(&ProviderError::Throttled {
            message: "slow down".to_string(),
        });
        metrics.record_error(&ProviderError::AccessDenied {
            message: "no".to_string(),
        });

        assert_eq!(
            metrics.get_stats(),
            ApiCallStats {
                total_calls: 2,
                mutating_calls: 1,
                throttled: 1,
                errors: 2,
            }
        );
    }
}
