//! ZapGuard scan orchestration
//!
//! Session setup, passive and active scanning, threshold evaluation and
//! report generation on top of the ZAP API client.

pub mod orchestrator;
pub mod report;
pub mod run;

pub use orchestrator::{
    context_pattern, OrchestratorState, ScanOrchestrator, ScanTimeouts, DEFAULT_CONTEXT_NAME,
};
pub use report::{
    assert_within_thresholds, render_summary, report_timestamp, violation_report, ReportPaths,
    ReportWriter,
};
pub use run::{RunOutcome, ScanRun};
