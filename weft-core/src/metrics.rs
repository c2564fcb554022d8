//! Scheduling Metrics and Diagnostics
//!
//! Lightweight counters tracking how the scheduling policy behaves under
//! load: how often placements succeed, how long callers wait for a free
//! slot, and how the fleet churns.
//!
//! # Design Goals:
//! - Lock-free atomic counters, safe to bump while the scheduler lock is held
//! - Zero allocation on the scheduling hot path
//! - Snapshot-based reporting, detached from live state

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Counters for the scheduling core.
#[derive(Default)]
pub struct SchedulerMetrics {
    // Placement outcomes
    pub schedule_attempts: AtomicU64,
    pub placements: AtomicU64,
    pub wait_timeouts: AtomicU64,

    // Admission waits
    pub wakeups: AtomicU64,
    pub wait_time_ns: AtomicU64,

    // Fleet churn
    pub executors_added: AtomicU64,
    pub executors_removed: AtomicU64,

    // Task group lifecycle
    pub task_groups_completed: AtomicU64,
    pub task_groups_failed: AtomicU64,
}

impl SchedulerMetrics {
    /// Create a new metrics tracker.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Record the start of a scheduling attempt.
    pub fn record_attempt(&self) {
        self.schedule_attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful placement.
    pub fn record_placement(&self) {
        self.placements.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an attempt that gave up after the admission timeout.
    pub fn record_wait_timeout(&self) {
        self.wait_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a wake-up received before the admission timeout expired.
    pub fn record_wakeup(&self) {
        self.wakeups.fetch_add(1, Ordering::Relaxed);
    }

    /// Record time spent blocked waiting for a free slot.
    pub fn record_wait(&self, duration: Duration) {
        self.wait_time_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Record an executor joining the rotation.
    pub fn record_executor_added(&self) {
        self.executors_added.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an executor leaving the rotation.
    pub fn record_executor_removed(&self) {
        self.executors_removed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a task group completing execution.
    pub fn record_task_group_completed(&self) {
        self.task_groups_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a task group failing execution.
    pub fn record_task_group_failed(&self) {
        self.task_groups_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let attempts = self.schedule_attempts.load(Ordering::Relaxed);
        let placements = self.placements.load(Ordering::Relaxed);
        let waits = self.wakeups.load(Ordering::Relaxed)
            + self.wait_timeouts.load(Ordering::Relaxed);
        let wait_ns = self.wait_time_ns.load(Ordering::Relaxed);

        MetricsSnapshot {
            schedule_attempts: attempts,
            placements,
            wait_timeouts: self.wait_timeouts.load(Ordering::Relaxed),
            wakeups: self.wakeups.load(Ordering::Relaxed),
            placement_rate: if attempts == 0 {
                0.0
            } else {
                (placements as f64) / (attempts as f64) * 100.0
            },
            avg_wait_ms: if waits == 0 {
                0.0
            } else {
                (wait_ns as f64) / (waits as f64) / 1_000_000.0
            },
            executors_added: self.executors_added.load(Ordering::Relaxed),
            executors_removed: self.executors_removed.load(Ordering::Relaxed),
            task_groups_completed: self.task_groups_completed.load(Ordering::Relaxed),
            task_groups_failed: self.task_groups_failed.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.schedule_attempts.store(0, Ordering::Relaxed);
        self.placements.store(0, Ordering::Relaxed);
        self.wait_timeouts.store(0, Ordering::Relaxed);
        self.wakeups.store(0, Ordering::Relaxed);
        self.wait_time_ns.store(0, Ordering::Relaxed);
        self.executors_added.store(0, Ordering::Relaxed);
        self.executors_removed.store(0, Ordering::Relaxed);
        self.task_groups_completed.store(0, Ordering::Relaxed);
        self.task_groups_failed.store(0, Ordering::Relaxed);
    }
}

/// A point-in-time snapshot of scheduler metrics.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub schedule_attempts: u64,
    pub placements: u64,
    pub wait_timeouts: u64,
    pub wakeups: u64,
    pub placement_rate: f64,
    pub avg_wait_ms: f64,
    pub executors_added: u64,
    pub executors_removed: u64,
    pub task_groups_completed: u64,
    pub task_groups_failed: u64,
}

impl MetricsSnapshot {
    /// Print a human-readable scheduling report.
    pub fn print_report(&self) {
        println!("╔═══════════════════════════════════════════════════════════╗");
        println!("║         Weft Scheduling Metrics Report                    ║");
        println!("╠═══════════════════════════════════════════════════════════╣");
        println!("║ Placements                                                ║");
        println!(
            "║   Attempts:    {:>8} (placed: {:>8})               ║",
            self.schedule_attempts, self.placements
        );
        println!(
            "║   Hit rate:    {:>7.2}%                                   ║",
            self.placement_rate
        );
        println!("╠═══════════════════════════════════════════════════════════╣");
        println!("║ Admission Waits                                           ║");
        println!(
            "║   Wake-ups:    {:>8}  Timeouts: {:>8}             ║",
            self.wakeups, self.wait_timeouts
        );
        println!(
            "║   Avg wait:    {:>8.3} ms                                ║",
            self.avg_wait_ms
        );
        println!("╠═══════════════════════════════════════════════════════════╣");
        println!("║ Fleet                                                     ║");
        println!(
            "║   Added:       {:>8}  Removed:  {:>8}             ║",
            self.executors_added, self.executors_removed
        );
        println!("╠═══════════════════════════════════════════════════════════╣");
        println!("║ Task Groups                                               ║");
        println!(
            "║   Completed:   {:>8}  Failed:   {:>8}             ║",
            self.task_groups_completed, self.task_groups_failed
        );
        println!("╚═══════════════════════════════════════════════════════════╝");
    }
}

/// A scoped timer that records time spent blocked in an admission wait.
///
/// The elapsed duration lands in [`SchedulerMetrics::record_wait`] on drop,
/// so every exit path out of a wait is accounted for.
pub struct ScopedWaitTimer<'a> {
    start: Instant,
    metrics: &'a SchedulerMetrics,
}

impl<'a> ScopedWaitTimer<'a> {
    /// Start timing an admission wait.
    pub fn new(metrics: &'a SchedulerMetrics) -> Self {
        Self {
            start: Instant::now(),
            metrics,
        }
    }
}

impl<'a> Drop for ScopedWaitTimer<'a> {
    fn drop(&mut self) {
        self.metrics.record_wait(self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = SchedulerMetrics::new();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.schedule_attempts, 0);
        assert_eq!(snapshot.placements, 0);
        assert_eq!(snapshot.placement_rate, 0.0);
    }

    #[test]
    fn test_placement_rate() {
        let metrics = SchedulerMetrics::new();
        metrics.record_attempt();
        metrics.record_attempt();
        metrics.record_attempt();
        metrics.record_placement();
        metrics.record_placement();
        metrics.record_wait_timeout();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.schedule_attempts, 3);
        assert_eq!(snapshot.placements, 2);
        assert_eq!(snapshot.wait_timeouts, 1);
        assert!((snapshot.placement_rate - 66.666).abs() < 0.01);
    }

    #[test]
    fn test_avg_wait() {
        let metrics = SchedulerMetrics::new();
        metrics.record_wakeup();
        metrics.record_wait(Duration::from_millis(10));
        metrics.record_wait_timeout();
        metrics.record_wait(Duration::from_millis(30));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.avg_wait_ms, 20.0);
    }

    #[test]
    fn test_scoped_wait_timer() {
        let metrics = SchedulerMetrics::new();

        {
            let _timer = ScopedWaitTimer::new(&metrics);
            std::thread::sleep(Duration::from_millis(10));
        }

        let recorded = metrics.wait_time_ns.load(Ordering::Relaxed);
        assert!(recorded >= 10_000_000, "timer under-recorded: {recorded}ns");
    }

    #[test]
    fn test_reset() {
        let metrics = SchedulerMetrics::new();
        metrics.record_attempt();
        metrics.record_executor_added();
        metrics.record_task_group_completed();

        metrics.reset();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.schedule_attempts, 0);
        assert_eq!(snapshot.executors_added, 0);
        assert_eq!(snapshot.task_groups_completed, 0);
    }
}
