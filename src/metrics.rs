//! Metric names and recorder setup for cleaning runs.
//!
//! Stages record through the `metrics` facade; nothing is collected unless a
//! recorder has been installed with [`init_metrics`].

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    RowsLoaded,
    SourceBytes,
    CellsFilled,
    CoercionFailures,
    TextCellsNormalized,
    RowsRemoved,
    BinaryValuesUnrecognized,
    RowsWritten,
    StageDuration,
    PipelineDuration,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::RowsLoaded => "cleaner_rows_loaded_total",
            MetricName::SourceBytes => "cleaner_source_bytes_total",
            MetricName::CellsFilled => "cleaner_cells_filled_total",
            MetricName::CoercionFailures => "cleaner_coercion_failures_total",
            MetricName::TextCellsNormalized => "cleaner_text_cells_normalized_total",
            MetricName::RowsRemoved => "cleaner_rows_removed_total",
            MetricName::BinaryValuesUnrecognized => "cleaner_binary_values_unrecognized_total",
            MetricName::RowsWritten => "cleaner_rows_written_total",
            MetricName::StageDuration => "cleaner_stage_duration_seconds",
            MetricName::PipelineDuration => "cleaner_pipeline_duration_seconds",
        }
    }
}

/// Install the Prometheus recorder. Returns `None` when a recorder is already set.
pub fn init_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Prometheus recorder install failed (possibly already installed): {}", e);
            None
        }
    }
}

/// Render the current metric values in Prometheus text format to `path`.
pub fn write_snapshot(handle: &PrometheusHandle, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, handle.render())?;
    info!("Wrote metrics snapshot to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_follow_convention() {
        let all = [
            MetricName::RowsLoaded,
            MetricName::SourceBytes,
            MetricName::CellsFilled,
            MetricName::CoercionFailures,
            MetricName::TextCellsNormalized,
            MetricName::RowsRemoved,
            MetricName::BinaryValuesUnrecognized,
            MetricName::RowsWritten,
            MetricName::StageDuration,
            MetricName::PipelineDuration,
        ];
        for name in all {
            assert!(name.as_str().starts_with("cleaner_"));
            assert!(name.as_str().ends_with("_total") || name.as_str().ends_with("_seconds"));
        }
    }

    #[test]
    fn test_snapshot_renders_recorded_values() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || {
            metrics::counter!(MetricName::RowsLoaded.as_str()).increment(7);
        });

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics").join("snapshot.prom");
        write_snapshot(&handle, &path).unwrap();

        let rendered = fs::read_to_string(&path).unwrap();
        assert!(rendered.contains("# TYPE cleaner_rows_loaded_total counter"));
        assert!(rendered.contains("cleaner_rows_loaded_total 7"));
    }
}
