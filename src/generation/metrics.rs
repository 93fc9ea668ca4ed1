//! Metrics for generation runs
//!
//! Emitted through the `metrics` facade; they are no-ops until a recorder is
//! installed by the embedding process.
//!
//! # Metrics
//!
//! - `generation_requests_total`: Counter of started generations by content type
//! - `generation_duration_seconds`: Histogram of end-to-end duration
//! - `generation_completions_total`: Counter of finished generations by status
//! - `generation_errors_total`: Counter of failures by error kind
//! - `generation_credits_spent_total`: Counter of credits charged
//! - `generation_active_count`: Gauge of running generations

use metrics::{counter, decrement_gauge, histogram, increment_counter, increment_gauge};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Metrics for a single generation
///
/// The first `record_*` call wins; later calls are ignored.
#[derive(Debug)]
pub struct GenerationMetrics {
    content_type: &'static str,
    provider: &'static str,
    start: Instant,
    recorded: AtomicBool,
}

impl GenerationMetrics {
    /// Starts tracking a generation
    ///
    /// # Examples
    ///
    /// ```
    /// use lesson_forge::generation::metrics::GenerationMetrics;
    ///
    /// let metrics = GenerationMetrics::new("lesson", "mock");
    /// metrics.record_success(1);
    /// ```
    pub fn new(content_type: &'static str, provider: &'static str) -> Self {
        increment_counter!("generation_requests_total", "content_type" => content_type);
        increment_gauge!("generation_active_count", 1.0);

        Self {
            content_type,
            provider,
            start: Instant::now(),
            recorded: AtomicBool::new(false),
        }
    }

    fn finish(&self, status: &'static str) -> bool {
        if self.recorded.swap(true, Ordering::SeqCst) {
            return false;
        }
        histogram!(
            "generation_duration_seconds",
            self.start.elapsed().as_secs_f64(),
            "content_type" => self.content_type,
            "provider" => self.provider,
            "status" => status
        );
        increment_counter!(
            "generation_completions_total",
            "content_type" => self.content_type,
            "status" => status
        );
        decrement_gauge!("generation_active_count", 1.0);
        true
    }

    /// Records a generation that produced a file
    pub fn record_success(&self, credits: u32) {
        if self.finish("success") {
            counter!(
                "generation_credits_spent_total",
                u64::from(credits),
                "content_type" => self.content_type
            );
        }
    }

    /// Records a failed generation
    ///
    /// # Arguments
    ///
    /// * `kind` - Short error kind, e.g. `provider` or `timeout`
    pub fn record_failure(&self, kind: &'static str) {
        if self.finish("failure") {
            increment_counter!(
                "generation_errors_total",
                "provider" => self.provider,
                "kind" => kind
            );
        }
    }

    /// Whether a completion has been recorded
    pub fn is_recorded(&self) -> bool {
        self.recorded.load(Ordering::SeqCst)
    }
}

impl Drop for GenerationMetrics {
    fn drop(&mut self) {
        if !self.recorded.load(Ordering::SeqCst) {
            decrement_gauge!("generation_active_count", 1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_only_once() {
        let metrics = GenerationMetrics::new("lesson", "mock");
        assert!(!metrics.is_recorded());
        metrics.record_success(1);
        assert!(metrics.is_recorded());
        // Second call is ignored
        metrics.record_failure("provider");
        assert!(metrics.is_recorded());
    }

    #[test]
    fn test_drop_without_record_is_safe() {
        let metrics = GenerationMetrics::new("presentation", "gemini");
        drop(metrics);
    }
}
