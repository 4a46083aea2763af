// Performance metrics for the promotions subsystem
//
// Tracks evaluation counts, execution times, cache hit rates and slow
// operations so rule-evaluation bottlenecks show up in the admin panel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Threshold above which an operation counts as slow (100ms)
const SLOW_OPERATION_THRESHOLD_MS: u64 = 100;

#[derive(Debug, Clone)]
pub struct PromotionMetrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,

    coupon_evaluations: AtomicU64,
    discount_evaluations: AtomicU64,
    instruction_parses: AtomicU64,
    coin_calculations: AtomicU64,

    // Timing totals in microseconds
    total_coupon_time_us: AtomicU64,
    total_discount_time_us: AtomicU64,
    total_coin_time_us: AtomicU64,

    slow_coupon_evaluations: AtomicU64,
    slow_discount_evaluations: AtomicU64,
    slow_coin_calculations: AtomicU64,
}

impl PromotionMetrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                cache_hits: AtomicU64::new(0),
                cache_misses: AtomicU64::new(0),
                coupon_evaluations: AtomicU64::new(0),
                discount_evaluations: AtomicU64::new(0),
                instruction_parses: AtomicU64::new(0),
                coin_calculations: AtomicU64::new(0),
                total_coupon_time_us: AtomicU64::new(0),
                total_discount_time_us: AtomicU64::new(0),
                total_coin_time_us: AtomicU64::new(0),
                slow_coupon_evaluations: AtomicU64::new(0),
                slow_discount_evaluations: AtomicU64::new(0),
                slow_coin_calculations: AtomicU64::new(0),
            }),
        }
    }

    pub fn record_cache_hit(&self) {
        self.inner.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.inner.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Cache hit rate between 0.0 and 1.0
    pub fn cache_hit_rate(&self) -> f64 {
        let hits = self.inner.cache_hits.load(Ordering::Relaxed);
        let misses = self.inner.cache_misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    pub fn record_instruction_parse(&self) {
        self.inner.instruction_parses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn start_coupon_evaluation(&self) -> OperationTimer {
        self.inner.coupon_evaluations.fetch_add(1, Ordering::Relaxed);
        OperationTimer::new(self.clone(), Operation::Coupon)
    }

    pub fn start_discount_evaluation(&self) -> OperationTimer {
        self.inner.discount_evaluations.fetch_add(1, Ordering::Relaxed);
        OperationTimer::new(self.clone(), Operation::Discount)
    }

    pub fn start_coin_calculation(&self) -> OperationTimer {
        self.inner.coin_calculations.fetch_add(1, Ordering::Relaxed);
        OperationTimer::new(self.clone(), Operation::Coins)
    }

    fn record_elapsed(&self, operation: Operation, elapsed: Duration) {
        let micros = elapsed.as_micros() as u64;
        let slow = elapsed.as_millis() as u64 >= SLOW_OPERATION_THRESHOLD_MS;
        let inner = &self.inner;
        match operation {
            Operation::Coupon => {
                inner.total_coupon_time_us.fetch_add(micros, Ordering::Relaxed);
                if slow {
                    inner.slow_coupon_evaluations.fetch_add(1, Ordering::Relaxed);
                }
            }
            Operation::Discount => {
                inner.total_discount_time_us.fetch_add(micros, Ordering::Relaxed);
                if slow {
                    inner.slow_discount_evaluations.fetch_add(1, Ordering::Relaxed);
                }
            }
            Operation::Coins => {
                inner.total_coin_time_us.fetch_add(micros, Ordering::Relaxed);
                if slow {
                    inner.slow_coin_calculations.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    /// Snapshot of all counters for the admin endpoint
    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = &self.inner;
        MetricsSnapshot {
            cache_hits: inner.cache_hits.load(Ordering::Relaxed),
            cache_misses: inner.cache_misses.load(Ordering::Relaxed),
            cache_hit_rate: self.cache_hit_rate(),
            coupon_evaluations: inner.coupon_evaluations.load(Ordering::Relaxed),
            discount_evaluations: inner.discount_evaluations.load(Ordering::Relaxed),
            instruction_parses: inner.instruction_parses.load(Ordering::Relaxed),
            coin_calculations: inner.coin_calculations.load(Ordering::Relaxed),
            total_coupon_time_us: inner.total_coupon_time_us.load(Ordering::Relaxed),
            total_discount_time_us: inner.total_discount_time_us.load(Ordering::Relaxed),
            total_coin_time_us: inner.total_coin_time_us.load(Ordering::Relaxed),
            slow_coupon_evaluations: inner.slow_coupon_evaluations.load(Ordering::Relaxed),
            slow_discount_evaluations: inner.slow_discount_evaluations.load(Ordering::Relaxed),
            slow_coin_calculations: inner.slow_coin_calculations.load(Ordering::Relaxed),
        }
    }
}

impl Default for PromotionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
enum Operation {
    Coupon,
    Discount,
    Coins,
}

/// Times one operation; records on drop
pub struct OperationTimer {
    metrics: PromotionMetrics,
    operation: Operation,
    start: Instant,
}

impl OperationTimer {
    fn new(metrics: PromotionMetrics, operation: Operation) -> Self {
        Self {
            metrics,
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        self.metrics.record_elapsed(self.operation, self.start.elapsed());
    }
}

/// Point-in-time view of the counters
#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_rate: f64,
    pub coupon_evaluations: u64,
    pub discount_evaluations: u64,
    pub instruction_parses: u64,
    pub coin_calculations: u64,
    pub total_coupon_time_us: u64,
    pub total_discount_time_us: u64,
    pub total_coin_time_us: u64,
    pub slow_coupon_evaluations: u64,
    pub slow_discount_evaluations: u64,
    pub slow_coin_calculations: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_hit_rate() {
        let metrics = PromotionMetrics::new();
        assert_eq!(metrics.cache_hit_rate(), 0.0);

        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_miss();
        assert_eq!(metrics.cache_hit_rate(), 0.75);
    }

    #[test]
    fn test_timer_records_on_drop() {
        let metrics = PromotionMetrics::new();
        {
            let _timer = metrics.start_coupon_evaluation();
        }
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.coupon_evaluations, 1);
    }

    #[test]
    fn test_snapshot_counts() {
        let metrics = PromotionMetrics::new();
        metrics.record_instruction_parse();
        metrics.record_instruction_parse();
        {
            let _t = metrics.start_discount_evaluation();
        }
        {
            let _t = metrics.start_coin_calculation();
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.instruction_parses, 2);
        assert_eq!(snapshot.discount_evaluations, 1);
        assert_eq!(snapshot.coin_calculations, 1);
    }
}
