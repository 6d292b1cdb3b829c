//! Human-readable rendering of [`Metrics`].

use core::fmt::{self, Write};

use super::Metrics;

/// A titled set of metrics that renders as a plain-text report.
pub struct PerformanceReport {
    title: String,
    metrics: Metrics,
}

impl PerformanceReport {
    /// Creates a new performance report.
    #[must_use]
    pub fn new(title: impl Into<String>, metrics: Metrics) -> Self {
        Self {
            title: title.into(),
            metrics,
        }
    }

    /// Returns the metrics.
    #[must_use]
    pub const fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    fn render(&self, out: &mut impl Write) -> fmt::Result {
        let metrics = &self.metrics;
        writeln!(out, "=== {} ===", self.title)?;
        writeln!(out, "Operations: {}", metrics.operations)?;
        writeln!(out, "Duration: {:?}", metrics.duration)?;
        writeln!(out, "Throughput: {:.2} ops/sec", metrics.throughput)?;

        if metrics.latencies.is_empty() {
            return Ok(());
        }

        writeln!(out, "\nLatency (ns):")?;
        let rows = [
            ("Min", metrics.min_latency()),
            ("Median", metrics.median_latency()),
            ("P95", metrics.p95_latency()),
            ("P99", metrics.p99_latency()),
            ("Max", metrics.max_latency()),
        ];
        for (label, value) in rows {
            if let Some(value) = value {
                writeln!(out, "  {label}: {value}")?;
            }
        }
        if let Some(avg) = metrics.avg_latency() {
            writeln!(out, "  Avg: {avg:.0}")?;
        }
        Ok(())
    }
}

impl fmt::Display for PerformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f)
    }
}

/// Builds reports and emits them through `tracing`.
pub struct Reporter;

impl Reporter {
    /// Generates a report from metrics.
    #[must_use]
    pub fn generate(title: impl Into<String>, metrics: Metrics) -> PerformanceReport {
        PerformanceReport::new(title, metrics)
    }

    /// Logs the report at info level and hands it back.
    pub fn emit(report: PerformanceReport) -> PerformanceReport {
        tracing::info!("{report}");
        report
    }
}
