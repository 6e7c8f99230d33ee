//! Prometheus metrics for observability and monitoring.
//!
//! The store and the orchestrator record through the `metrics` facade; this
//! module names and describes those metrics and builds a Prometheus recorder
//! for them:
//! - Command dispatch and validation
//! - State application timing and failures
//! - Task spawning, cancellation and discarded results
//!
//! # Example
//!
//! ```rust,no_run
//! use storefront_sync_runtime::metrics::MetricsExporter;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut exporter = MetricsExporter::new();
//! exporter.install()?;
//!
//! // Later, e.g. from a diagnostics endpoint
//! let text = exporter.render().unwrap_or_default();
//! # Ok(())
//! # }
//! ```

use crate::orchestrator::TaskPolicy;
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other crates
pub use metrics::{counter, gauge, histogram};

/// Commands seen by the pipeline
pub const COMMANDS_TOTAL: &str = "store.commands.total";
/// Commands dropped by validators
pub const COMMANDS_REJECTED: &str = "store.commands.rejected";
/// Time spent applying a batch
pub const APPLY_DURATION: &str = "store.apply.duration_seconds";
/// Batches discarded because a reducer failed
pub const APPLY_FAILED: &str = "store.apply.failed";
/// Dispatches dropped after shutdown
pub const SHUTDOWN_DROPPED: &str = "store.shutdown.dropped_dispatches";
/// Store shutdowns
pub const KILLED: &str = "store.killed";
/// Task instances spawned
pub const TASKS_SPAWNED: &str = "orchestrator.tasks.spawned";
/// Task instances superseded by a newer one
pub const TASKS_CANCELLED: &str = "orchestrator.tasks.cancelled";
/// External results thrown away because their task was cancelled
pub const RESULTS_DISCARDED: &str = "orchestrator.results.discarded";

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus exporter for the runtime's metrics.
pub struct MetricsExporter {
    handle: Option<PrometheusHandle>,
}

impl Default for MetricsExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MetricsExporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsExporter")
            .field("installed", &self.handle.is_some())
            .finish()
    }
}

impl MetricsExporter {
    /// Create an exporter that has not been installed yet
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Build a recorder without installing it globally.
    ///
    /// # Errors
    ///
    /// Returns error if the histogram buckets are rejected.
    pub fn build_recorder() -> Result<PrometheusRecorder, MetricsError> {
        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;
        Ok(builder.build_recorder())
    }

    /// Describe the metrics and install the recorder globally.
    ///
    /// # Errors
    ///
    /// Returns error if the recorder cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a recorder is already installed (e.g., in tests) this logs a
    /// warning and succeeds without a handle.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        let recorder = Self::build_recorder()?;
        let handle = recorder.handle();

        match metrics::set_global_recorder(recorder) {
            Ok(()) => {
                register_metrics();
                self.handle = Some(handle);
                tracing::info!("Prometheus recorder installed");
                Ok(())
            },
            Err(e) => {
                let err_msg = e.to_string();
                tracing::warn!(error = %err_msg, "Metrics recorder already initialized, skipping");
                Ok(())
            },
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if the exporter hasn't been installed.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(COMMANDS_TOTAL, "Total number of commands entering the dispatch pipeline");
    describe_counter!(COMMANDS_REJECTED, "Commands dropped by a validator");
    describe_histogram!(APPLY_DURATION, "Time taken to apply a batch to the history");
    describe_counter!(APPLY_FAILED, "Batches discarded because a reducer failed");
    describe_counter!(SHUTDOWN_DROPPED, "Dispatches dropped after the store was killed");
    describe_counter!(KILLED, "Number of store shutdowns");

    describe_counter!(TASKS_SPAWNED, "Task instances spawned for committed commands");
    describe_counter!(TASKS_CANCELLED, "Cancel-latest instances superseded by a newer one");
    describe_counter!(RESULTS_DISCARDED, "External results discarded by cancelled tasks");
}

/// Store metrics recorder.
pub struct StoreMetrics;

impl StoreMetrics {
    /// Record a command entering the pipeline.
    pub fn record_command(kind: impl fmt::Display) {
        counter!(COMMANDS_TOTAL, "kind" => kind.to_string()).increment(1);
    }

    /// Record a command dropped by a validator.
    pub fn record_rejection(kind: impl fmt::Display) {
        counter!(COMMANDS_REJECTED, "kind" => kind.to_string()).increment(1);
    }

    /// Record a batch application.
    pub fn record_apply(duration: Duration) {
        histogram!(APPLY_DURATION).record(duration.as_secs_f64());
    }

    /// Record a discarded batch.
    pub fn record_apply_failure(kind: impl fmt::Display) {
        counter!(APPLY_FAILED, "kind" => kind.to_string()).increment(1);
    }

    /// Record a dispatch dropped after shutdown.
    pub fn record_shutdown_drop() {
        counter!(SHUTDOWN_DROPPED).increment(1);
    }

    /// Record a shutdown.
    pub fn record_kill() {
        counter!(KILLED).increment(1);
    }
}

/// Orchestrator metrics recorder.
pub struct OrchestratorMetrics;

impl OrchestratorMetrics {
    /// Record a spawned instance.
    pub fn record_spawn(kind: impl fmt::Display, policy: TaskPolicy) {
        counter!(TASKS_SPAWNED, "kind" => kind.to_string(), "policy" => policy.as_str()).increment(1);
    }

    /// Record a superseded instance.
    pub fn record_cancel(kind: impl fmt::Display) {
        counter!(TASKS_CANCELLED, "kind" => kind.to_string()).increment(1);
    }

    /// Record a discarded external result.
    pub fn record_discard(kind: impl fmt::Display) {
        counter!(RESULTS_DISCARDED, "kind" => kind.to_string()).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exporter_starts_uninstalled() {
        let exporter = MetricsExporter::new();
        assert!(exporter.handle().is_none());
        assert!(exporter.render().is_none());
    }

    #[test]
    fn local_recorder_renders_store_metrics() {
        let recorder = MetricsExporter::build_recorder().unwrap();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            StoreMetrics::record_command("search");
            StoreMetrics::record_rejection("search");
            StoreMetrics::record_apply(Duration::from_millis(2));
            OrchestratorMetrics::record_spawn("fetch_products", TaskPolicy::CancelLatest);
            OrchestratorMetrics::record_cancel("fetch_products");
        });

        let rendered = handle.render();
        assert!(rendered.contains("store_commands_total"));
        assert!(rendered.contains("store_commands_rejected"));
        assert!(rendered.contains("orchestrator_tasks_spawned"));
        assert!(rendered.contains("policy=\"cancel_latest\""));
    }
}
