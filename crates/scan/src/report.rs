//! Report files and threshold reporting

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::debug;
use zapguard_common::{AlertSummary, Error, Result, RiskLevel, ScanThresholds, SecurityScanResult};

const RULE: &str = "============================================================";
const THIN_RULE: &str = "------------------------------------------------------------";

/// Files written for one scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub html: PathBuf,
    pub json: PathBuf,
    pub summary: PathBuf,
}

/// Writes reports into a directory, creating it on demand
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write ZAP's reports and our summary, all stamped with the current time
    pub fn write(&self, html: &str, json: &str, results: &SecurityScanResult) -> Result<ReportPaths> {
        self.write_stamped(&report_timestamp(Utc::now()), html, json, results)
    }

    /// Write the three report files using an explicit timestamp
    pub fn write_stamped(
        &self,
        timestamp: &str,
        html: &str,
        json: &str,
        results: &SecurityScanResult,
    ) -> Result<ReportPaths> {
        std::fs::create_dir_all(&self.dir)?;

        let paths = ReportPaths {
            html: self.dir.join(format!("zap-report-{}.html", timestamp)),
            json: self.dir.join(format!("zap-report-{}.json", timestamp)),
            summary: self.dir.join(format!("scan-summary-{}.json", timestamp)),
        };

        std::fs::write(&paths.html, html)?;
        std::fs::write(&paths.json, json)?;
        std::fs::write(&paths.summary, serde_json::to_string_pretty(results)?)?;

        debug!("Reports written to {}", self.dir.display());
        Ok(paths)
    }
}

/// ISO-8601 timestamp with `:` and `.` replaced so it is safe in file names
pub fn report_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H-%M-%S-%3fZ").to_string()
}

/// Human-readable scan summary block
pub fn render_summary(results: &SecurityScanResult, thresholds: &ScanThresholds) -> String {
    let mut lines = vec![
        RULE.to_string(),
        "SECURITY SCAN SUMMARY".to_string(),
        RULE.to_string(),
        format!("Target URL: {}", results.target_url),
        format!(
            "Scan Mode: {}",
            results.scan_mode.scan_type.to_string().to_uppercase()
        ),
        format!("Workers: {}", results.scan_mode.workers),
        format!("Duration: {:.1}s", results.duration_ms as f64 / 1000.0),
        THIN_RULE.to_string(),
        "ALERTS:".to_string(),
    ];

    for risk in RiskLevel::ALL {
        let count = results.summary.count(risk);
        let label = format!("{}:", risk);
        let line = match thresholds.max_for(risk) {
            Some(max) => {
                let mark = if count > max { "❌" } else { "✅" };
                format!("  {:<15}{} (max: {}) {}", label, count, max, mark)
            }
            None => format!("  {:<15}{}", label, count),
        };
        lines.push(line);
    }
    lines.push(format!("  {:<15}{}", "Total:", results.summary.total));
    lines.push(THIN_RULE.to_string());

    let verdict = if results.passed_thresholds {
        "RESULT: ✅ PASSED"
    } else {
        "RESULT: ❌ FAILED - Thresholds exceeded"
    };
    lines.push(verdict.to_string());
    lines.push(RULE.to_string());

    lines.join("\n")
}

/// Violation lines plus a totals line, or `None` when within thresholds
pub fn violation_report(summary: &AlertSummary, thresholds: &ScanThresholds) -> Option<String> {
    let violations = thresholds.violations(summary);
    if violations.is_empty() {
        return None;
    }

    let mut lines: Vec<String> = violations.iter().map(ToString::to_string).collect();
    lines.push(String::new());
    lines.push(format!(
        "Total alerts: {} (High: {}, Medium: {}, Low: {}, Info: {})",
        summary.total, summary.high, summary.medium, summary.low, summary.informational
    ));
    Some(lines.join("\n"))
}

/// Fail with [`Error::ThresholdsExceeded`] when any gated count is over its maximum
pub fn assert_within_thresholds(summary: &AlertSummary, thresholds: &ScanThresholds) -> Result<()> {
    match violation_report(summary, thresholds) {
        Some(report) => Err(Error::ThresholdsExceeded(report)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use zapguard_common::{ScanMode, ScanType};

    fn summary(high: u32, medium: u32, low: u32, informational: u32) -> AlertSummary {
        AlertSummary {
            high,
            medium,
            low,
            informational,
            total: high + medium + low + informational,
        }
    }

    fn result_with(summary: AlertSummary, passed: bool) -> SecurityScanResult {
        SecurityScanResult {
            scan_mode: ScanMode {
                scan_type: ScanType::Passive,
                workers: 4,
            },
            target_url: "https://example.com".to_string(),
            duration_ms: 12_300,
            alerts: vec![],
            summary,
            passed_thresholds: passed,
        }
    }

    #[test]
    fn test_report_timestamp_is_filename_safe() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let stamp = report_timestamp(now);
        assert_eq!(stamp, "2024-03-05T14-07-09-000Z");
        assert!(!stamp.contains(':'));
        assert!(!stamp.contains('.'));
    }

    #[test]
    fn test_violation_report_lists_each_breach() {
        let report = violation_report(&summary(1, 6, 3, 2), &ScanThresholds::default()).unwrap();

        assert!(report.contains("High alerts: 1 (max: 0)"));
        assert!(report.contains("Medium alerts: 6 (max: 5)"));
        assert!(!report.contains("Low alerts"));
        assert!(report.contains("Total alerts: 12 (High: 1, Medium: 6, Low: 3, Info: 2)"));
    }

    #[test]
    fn test_within_thresholds() {
        let thresholds = ScanThresholds::default();
        assert!(violation_report(&summary(0, 5, 20, 100), &thresholds).is_none());
        assert!(assert_within_thresholds(&summary(0, 5, 20, 100), &thresholds).is_ok());
    }

    #[test]
    fn test_assert_within_thresholds_error() {
        let err = assert_within_thresholds(&summary(0, 0, 21, 0), &ScanThresholds::default())
            .unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Security thresholds exceeded:"));
        assert!(message.contains("Low alerts: 21 (max: 20)"));
    }

    #[test]
    fn test_render_summary() {
        let text = render_summary(&result_with(summary(0, 2, 1, 4), true), &ScanThresholds::default());

        assert!(text.contains("SECURITY SCAN SUMMARY"));
        assert!(text.contains("Target URL: https://example.com"));
        assert!(text.contains("Scan Mode: PASSIVE"));
        assert!(text.contains("Workers: 4"));
        assert!(text.contains("Duration: 12.3s"));
        assert!(text.contains("Medium:        2 (max: 5) ✅"));
        assert!(text.contains("Informational: 4"));
        assert!(text.contains("Total:         7"));
        assert!(text.contains("RESULT: ✅ PASSED"));
    }

    #[test]
    fn test_render_summary_marks_failures() {
        let text = render_summary(&result_with(summary(2, 0, 0, 0), false), &ScanThresholds::default());

        assert!(text.contains("High:          2 (max: 0) ❌"));
        assert!(text.contains("RESULT: ❌ FAILED"));
    }

    #[test]
    fn test_writer_creates_directory_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path().join("nested/reports"));

        let paths = writer
            .write_stamped(
                "2024-03-05T14-07-09-000Z",
                "<html></html>",
                "{}",
                &result_with(summary(0, 0, 0, 1), true),
            )
            .unwrap();

        assert!(paths.html.ends_with("zap-report-2024-03-05T14-07-09-000Z.html"));
        assert!(paths.json.ends_with("zap-report-2024-03-05T14-07-09-000Z.json"));
        assert!(paths.summary.ends_with("scan-summary-2024-03-05T14-07-09-000Z.json"));
        assert_eq!(std::fs::read_to_string(&paths.html).unwrap(), "<html></html>");

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&paths.summary).unwrap()).unwrap();
        assert_eq!(written["targetUrl"], "https://example.com");
        assert_eq!(written["passedThresholds"], true);
        assert_eq!(written["summary"]["informational"], 1);
    }
}
