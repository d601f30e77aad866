//! Scan report: the JSON-serializable output of one scan.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::opportunity::Opportunity;

/// Result of a full scan. Only accepted opportunities are listed; every
/// rejection is tallied by layer and every skip leaves a warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// Unique scan id (UUID v4).
    pub scan_id: String,
    /// When the scan started.
    pub started_at: DateTime<Utc>,
    /// When the scan finished (or was canceled).
    pub finished_at: DateTime<Utc>,
    /// Names of the strategies that actually ran.
    pub strategies_run: Vec<String>,
    /// Markets in the snapshot after filtering.
    pub markets_considered: usize,
    /// LLM calls consumed by the analyzer.
    pub llm_calls_used: usize,
    /// Accepted opportunities with their complete validation trails.
    pub opportunities: Vec<Opportunity>,
    /// Rejection counts keyed by validation layer name.
    pub rejections_summary: BTreeMap<String, usize>,
    /// Non-fatal anomalies: skipped records, exhausted budgets,
    /// cancellation.
    pub warnings: Vec<String>,
}

impl ScanReport {
    /// Tallies a rejection at the given layer.
    pub fn count_rejection(&mut self, layer: &str) {
        *self.rejections_summary.entry(layer.to_string()).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_counts_accumulate() {
        let mut report = ScanReport {
            scan_id: "scan-1".into(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            strategies_run: vec!["monotonicity".into()],
            markets_considered: 10,
            llm_calls_used: 0,
            opportunities: vec![],
            rejections_summary: BTreeMap::new(),
            warnings: vec![],
        };
        report.count_rejection("math");
        report.count_rejection("math");
        report.count_rejection("apy");
        assert_eq!(report.rejections_summary["math"], 2);
        assert_eq!(report.rejections_summary["apy"], 1);
    }

    #[test]
    fn report_serializes_to_json() {
        let report = ScanReport {
            scan_id: "scan-2".into(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            strategies_run: vec![],
            markets_considered: 0,
            llm_calls_used: 3,
            opportunities: vec![],
            rejections_summary: BTreeMap::new(),
            warnings: vec!["analyzer budget exhausted, 4 pairs skipped".into()],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["llm_calls_used"], 3);
        assert!(json["warnings"][0].as_str().unwrap().contains("budget"));
    }
}
