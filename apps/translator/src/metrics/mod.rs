//! Prometheus metrics module

use crate::error::TranslatorError;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Duration;

/// Translator metrics collector
///
/// Without an installed recorder the `metrics` macros are no-ops, which is
/// what [`TranslatorMetrics::disabled`] relies on.
#[derive(Clone, Default)]
pub struct TranslatorMetrics {
    handle: Option<Arc<PrometheusHandle>>,
}

impl TranslatorMetrics {
    /// Install the global Prometheus recorder
    pub fn install() -> Result<Self, TranslatorError> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| TranslatorError::Metrics(e.to_string()))?;

        Self::register_metrics();

        Ok(Self {
            handle: Some(Arc::new(handle)),
        })
    }

    /// Metrics that record nothing and render empty
    pub fn disabled() -> Self {
        Self { handle: None }
    }

    fn register_metrics() {
        describe_gauge!(
            "translator_files_assigned",
            Unit::Count,
            "Files in this worker's shard"
        );
        describe_counter!(
            "translator_files_total",
            Unit::Count,
            "Files finished, by status"
        );
        describe_counter!(
            "translator_input_chars_total",
            Unit::Count,
            "Characters of source text sent to the backend"
        );
        describe_counter!(
            "translator_output_chars_total",
            Unit::Count,
            "Characters of generated text written"
        );
        describe_counter!(
            "translator_errors_total",
            Unit::Count,
            "Errors by type"
        );
        describe_histogram!(
            "translator_request_duration_seconds",
            Unit::Seconds,
            "Time for one generation request"
        );
    }

    /// Set the shard size for this worker
    pub fn set_files_assigned(&self, worker_index: usize, count: usize) {
        gauge!(
            "translator_files_assigned",
            "worker_index" => worker_index.to_string()
        )
        .set(count as f64);
    }

    /// Record a written translation
    pub fn record_translated(&self, input_chars: usize, output_chars: usize, duration: Duration) {
        counter!("translator_files_total", "status" => "translated").increment(1);
        counter!("translator_input_chars_total").increment(input_chars as u64);
        counter!("translator_output_chars_total").increment(output_chars as u64);
        histogram!("translator_request_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a failed file
    pub fn record_failure(&self, error: &TranslatorError) {
        counter!("translator_files_total", "status" => "failed").increment(1);
        counter!(
            "translator_errors_total",
            "error_type" => error.error_type_label()
        )
        .increment(1);
    }

    /// Render metrics in Prometheus format
    pub fn render(&self) -> String {
        self.handle
            .as_ref()
            .map(|handle| handle.render())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_metrics_accept_records_and_render_empty() {
        let metrics = TranslatorMetrics::disabled();
        metrics.set_files_assigned(0, 3);
        metrics.record_translated(10, 20, Duration::from_millis(5));
        metrics.record_failure(&TranslatorError::Config("x".to_string()));
        assert!(metrics.render().is_empty());
    }

    #[test]
    fn recorded_series_render_with_labels() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let metrics = TranslatorMetrics {
            handle: Some(Arc::new(recorder.handle())),
        };

        ::metrics::with_local_recorder(&recorder, || {
            TranslatorMetrics::register_metrics();
            metrics.set_files_assigned(2, 5);
            metrics.record_translated(10, 24, Duration::from_millis(250));
            metrics.record_failure(&TranslatorError::Backend {
                status: 500,
                body: String::new(),
            });
        });

        let rendered = metrics.render();
        for expected in [
            "translator_files_assigned{worker_index=\"2\"} 5",
            "translator_files_total{status=\"translated\"} 1",
            "translator_files_total{status=\"failed\"} 1",
            "translator_input_chars_total 10",
            "translator_output_chars_total 24",
            "translator_errors_total{error_type=\"backend\"} 1",
            "translator_request_duration_seconds",
            "# HELP translator_files_total Files finished, by status",
        ] {
            assert!(rendered.contains(expected), "missing {expected:?} in:\n{rendered}");
        }
    }
}
