//! Core types for ZapGuard

use serde::{Deserialize, Serialize};

/// Alert risk level as reported by ZAP
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Informational,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// All levels, most severe first
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::High,
        RiskLevel::Medium,
        RiskLevel::Low,
        RiskLevel::Informational,
    ];
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Informational => write!(f, "Informational"),
            RiskLevel::Low => write!(f, "Low"),
            RiskLevel::Medium => write!(f, "Medium"),
            RiskLevel::High => write!(f, "High"),
        }
    }
}

/// Alert confidence level as reported by ZAP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    #[serde(rename = "False Positive")]
    FalsePositive,
    Low,
    Medium,
    High,
    Confirmed,
}

/// A single finding reported by ZAP.
///
/// Field names follow the ZAP JSON API so alerts can be deserialized straight
/// from `/JSON/core/view/alerts/` and written back out unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub plugin_id: String,
    #[serde(default)]
    pub alert_ref: String,
    /// Alert title
    pub alert: String,
    pub name: String,
    pub risk: RiskLevel,
    pub confidence: Confidence,
    #[serde(default)]
    pub description: String,
    #[serde(alias = "uri")]
    pub url: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub param: String,
    #[serde(default)]
    pub attack: String,
    #[serde(default)]
    pub evidence: String,
    #[serde(default)]
    pub solution: String,
    #[serde(default)]
    pub reference: String,
    #[serde(default, rename = "cweid")]
    pub cwe_id: String,
    #[serde(default, rename = "wascid")]
    pub wasc_id: String,
    #[serde(default, rename = "sourceid")]
    pub source_id: String,
}

/// Alert counts per risk level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub high: u32,
    pub medium: u32,
    pub low: u32,
    pub informational: u32,
    pub total: u32,
}

impl AlertSummary {
    /// Count the given alerts per risk level
    pub fn from_alerts(alerts: &[Alert]) -> Self {
        let mut summary = Self::default();
        for alert in alerts {
            summary.record(alert.risk);
        }
        summary
    }

    fn record(&mut self, risk: RiskLevel) {
        match risk {
            RiskLevel::High => self.high += 1,
            RiskLevel::Medium => self.medium += 1,
            RiskLevel::Low => self.low += 1,
            RiskLevel::Informational => self.informational += 1,
        }
        self.total += 1;
    }

    /// Count for a single risk level
    pub fn count(&self, risk: RiskLevel) -> u32 {
        match risk {
            RiskLevel::High => self.high,
            RiskLevel::Medium => self.medium,
            RiskLevel::Low => self.low,
            RiskLevel::Informational => self.informational,
        }
    }
}

/// Maximum permitted alert count per risk level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanThresholds {
    pub max_high: u32,
    pub max_medium: u32,
    pub max_low: u32,
}

impl Default for ScanThresholds {
    fn default() -> Self {
        Self {
            max_high: 0,
            max_medium: 5,
            max_low: 20,
        }
    }
}

/// One risk level whose alert count went over its maximum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdViolation {
    pub risk: RiskLevel,
    pub count: u32,
    pub max: u32,
}

impl std::fmt::Display for ThresholdViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} alerts: {} (max: {})", self.risk, self.count, self.max)
    }
}

impl ScanThresholds {
    /// Maximum for a risk level. Informational alerts are never gated.
    pub fn max_for(&self, risk: RiskLevel) -> Option<u32> {
        match risk {
            RiskLevel::High => Some(self.max_high),
            RiskLevel::Medium => Some(self.max_medium),
            RiskLevel::Low => Some(self.max_low),
            RiskLevel::Informational => None,
        }
    }

    /// Every gated risk level whose count exceeds its maximum
    pub fn violations(&self, summary: &AlertSummary) -> Vec<ThresholdViolation> {
        RiskLevel::ALL
            .iter()
            .filter_map(|&risk| {
                let max = self.max_for(risk)?;
                let count = summary.count(risk);
                (count > max).then_some(ThresholdViolation { risk, count, max })
            })
            .collect()
    }

    /// True when every gated count is at or below its maximum
    pub fn passes(&self, summary: &AlertSummary) -> bool {
        self.violations(summary).is_empty()
    }
}

/// Passive or active scanning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanType {
    Passive,
    Active,
}

impl std::fmt::Display for ScanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanType::Passive => write!(f, "passive"),
            ScanType::Active => write!(f, "active"),
        }
    }
}

/// Scan type together with the number of test workers sharing the daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanMode {
    #[serde(rename = "type")]
    pub scan_type: ScanType,
    pub workers: u32,
}

impl ScanMode {
    /// Active scan operations are only legal with a single worker
    pub fn permits_active_scan(&self) -> bool {
        self.workers == 1
    }
}

/// ZAP session mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZapMode {
    Safe,
    Protected,
    Standard,
    Attack,
}

impl ZapMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZapMode::Safe => "safe",
            ZapMode::Protected => "protected",
            ZapMode::Standard => "standard",
            ZapMode::Attack => "attack",
        }
    }
}

impl std::fmt::Display for ZapMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scan state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanState {
    NotStarted,
    Running,
    Paused,
    Finished,
}

/// Progress of a spider or active scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStatus {
    /// Percent complete, 0-100
    pub progress: u32,
    pub state: ScanState,
}

impl ScanStatus {
    pub fn from_progress(progress: u32) -> Self {
        let state = if progress >= 100 {
            ScanState::Finished
        } else {
            ScanState::Running
        };
        Self { progress, state }
    }

    pub fn is_finished(&self) -> bool {
        self.state == ScanState::Finished
    }
}

/// Outcome of a scan run against one target
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityScanResult {
    pub scan_mode: ScanMode,
    pub target_url: String,
    pub duration_ms: u64,
    pub alerts: Vec<Alert>,
    pub summary: AlertSummary,
    pub passed_thresholds: bool,
}
