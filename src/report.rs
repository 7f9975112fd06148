use std::{io, path::Path};

use itertools::Itertools;

use crate::core::domain::{SolutionTally, StressReport};

/// Human-readable summary printed at the end of a run.
pub fn render(report: &StressReport) -> String {
    let elapsed = (report.finished_at - report.started_at).num_milliseconds() as f64 / 1000.0;
    let mut lines = vec![format!(
        "{}: {} round(s) in {:.2}s",
        report.problem_name, report.rounds_completed, elapsed
    )];

    let width = report
        .tallies
        .iter()
        .map(|(name, _)| name.len())
        .max()
        .unwrap_or(0);
    lines.extend(
        report
            .tallies
            .iter()
            .map(|(name, tally)| format!("  {:<width$}  {}", name, summarize(tally))),
    );

    if !report.failed_tests.is_empty() {
        lines.push(format!("Failed tests ({}):", report.failed_tests.len()));
        lines.extend(
            report
                .failed_tests
                .iter()
                .map(|path| format!("  {}", path.display())),
        );
    }

    lines.join("\n")
}

fn summarize(tally: &SolutionTally) -> String {
    let summary = format!("{}/{} passed", tally.passed, tally.total);
    let failures = tally
        .by_status
        .iter()
        .filter(|(status, _)| !status.is_ok())
        .map(|(status, count)| format!("{} x{}", status, count))
        .join(", ");

    if failures.is_empty() {
        summary
    } else {
        format!("{} ({})", summary, failures)
    }
}

pub async fn write_json(report: &StressReport, path: &Path) -> io::Result<()> {
    let json = serde_json::to_vec_pretty(report).map_err(io::Error::other)?;
    tokio::fs::write(path, json).await?;
    tracing::info!("Report written to {}", path.display());
    Ok(())
}
