// Launch metrics module
//
// Lightweight counters for monitoring the launch pipeline

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Process-lifetime launch metrics.
///
/// Atomic counters only, so the pipeline worker and the launching side can record
/// without locks. Logged once on shutdown.
#[derive(Debug)]
pub struct Metrics {
    /// Launch attempts that claimed the launch slot
    pub launches_started: AtomicUsize,

    /// Attempts that reached the ready signal
    pub launches_succeeded: AtomicUsize,

    /// Attempts aborted by a pipeline or pre-launch failure
    pub launches_failed: AtomicUsize,

    /// Static asset reinstalls performed
    pub reinstalls: AtomicUsize,

    /// `settings.cfg` lines written by bulk settings application
    pub settings_lines_written: AtomicUsize,

    /// Total time spent inside the pipeline worker
    pub pipeline_time_ms: AtomicU64,

    start_time: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            launches_started: AtomicUsize::new(0),
            launches_succeeded: AtomicUsize::new(0),
            launches_failed: AtomicUsize::new(0),
            reinstalls: AtomicUsize::new(0),
            settings_lines_written: AtomicUsize::new(0),
            pipeline_time_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_launch_started(&self) {
        self.launches_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_launch_succeeded(&self) {
        self.launches_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_launch_failed(&self) {
        self.launches_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reinstall(&self) {
        self.reinstalls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_settings_lines(&self, lines: usize) {
        self.settings_lines_written.fetch_add(lines, Ordering::Relaxed);
    }

    pub fn record_pipeline_time(&self, duration: Duration) {
        self.pipeline_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average pipeline time per started launch in milliseconds
    pub fn avg_pipeline_time_ms(&self) -> f64 {
        let total = self.pipeline_time_ms.load(Ordering::Relaxed);
        let count = self.launches_started.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Launch Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Launches: {} started, {} succeeded, {} failed",
            self.launches_started.load(Ordering::Relaxed),
            self.launches_succeeded.load(Ordering::Relaxed),
            self.launches_failed.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Reinstalls: {}, settings lines written: {}",
            self.reinstalls.load(Ordering::Relaxed),
            self.settings_lines_written.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Pipeline time: {:.2}s (avg: {:.2}ms per launch)",
            self.pipeline_time_ms.load(Ordering::Relaxed) as f64 / 1000.0,
            self.avg_pipeline_time_ms()
        );
    }
}
