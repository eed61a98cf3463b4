//! The telemetry port and its sinks.
//!
//! A single dependency report can fan out to several sinks (console, file,
//! hosted telemetry). Sinks are invoked in sequence; one failing sink never
//! blocks the others.

use chrono::{DateTime, Utc};
use std::sync::Mutex;
use std::time::Duration;

/// One completed upstream call, as reported to telemetry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyReport {
    /// Logical dependency name (e.g. "Deployment Server API").
    pub name: String,
    /// Target the dependency was reached at (base URL).
    pub target: String,
    /// Host component of the outbound request.
    pub host: String,
    /// Path and query of the outbound request.
    pub path: String,
    /// Wall-clock time the call started.
    pub started_at: DateTime<Utc>,
    /// Measured call duration.
    pub elapsed: Duration,
    /// Upstream result code as text.
    pub result_code: String,
    /// Whether the call succeeded (status OK).
    pub success: bool,
}

/// A telemetry sink.
pub trait Telemetry: Send + Sync {
    /// Records one completed upstream call.
    ///
    /// # Errors
    ///
    /// Sink-specific delivery failures. Callers log and continue; a report
    /// is best-effort.
    fn report_dependency(&self, report: &DependencyReport) -> anyhow::Result<()>;
}

impl<T: Telemetry + ?Sized> Telemetry for std::sync::Arc<T> {
    fn report_dependency(&self, report: &DependencyReport) -> anyhow::Result<()> {
        (**self).report_dependency(report)
    }
}

/// A no-op sink for silent operation.
#[derive(Debug, Clone, Copy)]
pub struct NullTelemetry;

impl Telemetry for NullTelemetry {
    fn report_dependency(&self, _: &DependencyReport) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A sink that emits each report as a structured tracing event.
#[derive(Debug, Clone, Copy)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn report_dependency(&self, report: &DependencyReport) -> anyhow::Result<()> {
        tracing::info!(
            dependency = %report.name,
            target = %report.target,
            host = %report.host,
            path = %report.path,
            elapsed_ms = report.elapsed.as_millis() as u64,
            result_code = %report.result_code,
            success = report.success,
            "upstream dependency call"
        );
        Ok(())
    }
}

/// Broadcasts each report to a list of sinks in sequence.
pub struct FanoutTelemetry {
    sinks: Vec<Box<dyn Telemetry>>,
}

impl std::fmt::Debug for FanoutTelemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutTelemetry")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl FanoutTelemetry {
    /// An empty fan-out; add sinks with [`FanoutTelemetry::with_sink`].
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    /// Appends a sink to the broadcast list.
    pub fn with_sink(mut self, sink: impl Telemetry + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl Default for FanoutTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl Telemetry for FanoutTelemetry {
    fn report_dependency(&self, report: &DependencyReport) -> anyhow::Result<()> {
        for sink in &self.sinks {
            if let Err(error) = sink.report_dependency(report) {
                tracing::warn!(%error, "telemetry sink rejected dependency report");
            }
        }
        Ok(())
    }
}

/// An in-memory sink that keeps every report it receives. The test-double
/// sink, also handy for inspection in examples.
#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    reports: Mutex<Vec<DependencyReport>>,
}

impl RecordingTelemetry {
    /// An empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far.
    pub fn reports(&self) -> Vec<DependencyReport> {
        self.reports
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl Telemetry for RecordingTelemetry {
    fn report_dependency(&self, report: &DependencyReport) -> anyhow::Result<()> {
        self.reports
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(report.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> DependencyReport {
        DependencyReport {
            name: "Deployment Server API".into(),
            target: "https://deploy.example.com".into(),
            host: "deploy.example.com".into(),
            path: "/api/projects".into(),
            started_at: Utc::now(),
            elapsed: Duration::from_millis(12),
            result_code: "200".into(),
            success: true,
        }
    }

    struct FailingSink;

    impl Telemetry for FailingSink {
        fn report_dependency(&self, _: &DependencyReport) -> anyhow::Result<()> {
            anyhow::bail!("sink unavailable")
        }
    }

    #[test]
    fn fanout_reaches_every_sink_despite_failures() {
        let first = std::sync::Arc::new(RecordingTelemetry::new());
        let last = std::sync::Arc::new(RecordingTelemetry::new());
        let fanout = FanoutTelemetry::new()
            .with_sink(first.clone())
            .with_sink(FailingSink)
            .with_sink(last.clone());

        fanout.report_dependency(&report()).unwrap();

        assert_eq!(first.reports().len(), 1);
        assert_eq!(last.reports().len(), 1);
    }

    #[test]
    fn recorder_keeps_reports_in_order() {
        let recorder = RecordingTelemetry::new();
        let mut second = report();
        second.path = "/api/projects/AcmeWeb".into();

        recorder.report_dependency(&report()).unwrap();
        recorder.report_dependency(&second).unwrap();

        let reports = recorder.reports();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[1].path, "/api/projects/AcmeWeb");
    }
}
