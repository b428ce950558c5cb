//! Simple metrics module for the listing workflow
//!
//! Each phase records through its own submodule. Without an installed
//! recorder every call is a no-op, so tests and dry runs need no setup.

use std::sync::OnceLock;
use tracing::info;

/// Enum representing all metric names used in the system
/// This eliminates magic strings and provides compile-time safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Normalize metrics
    NormalizeRecords,
    NormalizeMalformed,

    // Checkpoint metrics
    CheckpointWritesSuccess,
    CheckpointWritesError,
    CheckpointEntriesLoaded,
    CheckpointSourceRewrites,

    // Workflow metrics
    WorkflowStageCompleted,
    WorkflowStageSkipped,
    WorkflowStageFailed,
    WorkflowStageDuration,
    WorkflowRecordsProcessed,

    // Login metrics
    LoginAttempts,
    LoginFailures,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::NormalizeRecords => "lister_normalize_records_total",
            MetricName::NormalizeMalformed => "lister_normalize_malformed_total",
            MetricName::CheckpointWritesSuccess => "lister_checkpoint_writes_success_total",
            MetricName::CheckpointWritesError => "lister_checkpoint_writes_error_total",
            MetricName::CheckpointEntriesLoaded => "lister_checkpoint_entries_loaded",
            MetricName::CheckpointSourceRewrites => "lister_checkpoint_source_rewrites_total",
            MetricName::WorkflowStageCompleted => "lister_workflow_stage_completed_total",
            MetricName::WorkflowStageSkipped => "lister_workflow_stage_skipped_total",
            MetricName::WorkflowStageFailed => "lister_workflow_stage_failed_total",
            MetricName::WorkflowStageDuration => "lister_workflow_stage_duration_seconds",
            MetricName::WorkflowRecordsProcessed => "lister_workflow_records_processed_total",
            MetricName::LoginAttempts => "lister_login_attempts_total",
            MetricName::LoginFailures => "lister_login_failures_total",
        }
    }
}

static METRICS_HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> = OnceLock::new();

/// Installs the Prometheus recorder. With a listen address the exporter also
/// serves `/metrics` over HTTP (needs a running tokio runtime).
pub fn init(listen_addr: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();

    match listen_addr {
        Some(addr) => {
            let sock_addr: std::net::SocketAddr = addr
                .parse()
                .map_err(|e| format!("Invalid metrics address '{}': {}", addr, e))?;
            builder
                .with_http_listener(sock_addr)
                .install()
                .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))?;
            info!("Prometheus exporter listening on http://{}/metrics", sock_addr);
        }
        None => {
            let handle = builder
                .install_recorder()
                .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
            METRICS_HANDLE.set(handle).ok();
            info!("Metrics recorder installed (no exporter)");
        }
    }
    Ok(())
}

/// Renders the current metrics snapshot when the in-process recorder is used
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|handle| handle.render())
}

// ============================================================================
// Normalize Metrics
// ============================================================================

pub mod normalize {
    use super::MetricName;

    pub fn record_normalized(format: &'static str) {
        ::metrics::counter!(MetricName::NormalizeRecords.as_str(), "format" => format).increment(1);
    }

    pub fn record_malformed(format: &'static str) {
        ::metrics::counter!(MetricName::NormalizeMalformed.as_str(), "format" => format)
            .increment(1);
    }
}

// ============================================================================
// Checkpoint Metrics
// ============================================================================

pub mod checkpoint {
    use super::MetricName;

    pub fn write_success(stage: &'static str) {
        ::metrics::counter!(MetricName::CheckpointWritesSuccess.as_str(), "stage" => stage)
            .increment(1);
    }

    pub fn write_error(stage: &'static str) {
        ::metrics::counter!(MetricName::CheckpointWritesError.as_str(), "stage" => stage)
            .increment(1);
    }

    /// Size of the "already done" set loaded at startup
    pub fn entries_loaded(stage: &'static str, count: usize) {
        ::metrics::gauge!(MetricName::CheckpointEntriesLoaded.as_str(), "stage" => stage)
            .set(count as f64);
    }

    pub fn source_rewrite() {
        ::metrics::counter!(MetricName::CheckpointSourceRewrites.as_str()).increment(1);
    }
}

// ============================================================================
// Workflow Metrics
// ============================================================================

pub mod workflow {
    use super::MetricName;

    pub fn stage_completed(stage: &'static str) {
        ::metrics::counter!(MetricName::WorkflowStageCompleted.as_str(), "stage" => stage)
            .increment(1);
    }

    pub fn stage_skipped(stage: &'static str) {
        ::metrics::counter!(MetricName::WorkflowStageSkipped.as_str(), "stage" => stage)
            .increment(1);
    }

    pub fn stage_failed(stage: &'static str, kind: &'static str) {
        ::metrics::counter!(
            MetricName::WorkflowStageFailed.as_str(),
            "stage" => stage,
            "kind" => kind
        )
        .increment(1);
    }

    pub fn stage_duration(stage: &'static str, secs: f64) {
        ::metrics::histogram!(MetricName::WorkflowStageDuration.as_str(), "stage" => stage)
            .record(secs);
    }

    pub fn record_processed() {
        ::metrics::counter!(MetricName::WorkflowRecordsProcessed.as_str()).increment(1);
    }
}

// ============================================================================
// Login Metrics
// ============================================================================

pub mod login {
    use super::MetricName;

    pub fn attempt() {
        ::metrics::counter!(MetricName::LoginAttempts.as_str()).increment(1);
    }

    pub fn failure() {
        ::metrics::counter!(MetricName::LoginFailures.as_str()).increment(1);
    }
}
