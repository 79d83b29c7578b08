use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    describe();
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

fn describe() {
    metrics::describe_counter!("http_requests_total", "HTTP responses by status code");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        metrics::Unit::Seconds,
        "HTTP request latency by status code"
    );
    metrics::describe_counter!("exam_sessions_started_total", "Exam sessions created");
    metrics::describe_counter!(
        "exam_sessions_submitted_total",
        "Exam sessions finalized, labelled by submit mode"
    );
    metrics::describe_counter!(
        "exam_sessions_late_total",
        "Manual submissions received after the grace window"
    );
    metrics::describe_counter!(
        "expired_sessions_closed_total",
        "Sessions closed by the expiry sweeper"
    );
    metrics::describe_counter!("exam_responses_saved_total", "Response autosaves and edits");
    metrics::describe_counter!("exam_responses_graded_total", "Manual grades recorded");
    metrics::describe_counter!("exam_sessions_graded_total", "Sessions that became fully graded");
}
