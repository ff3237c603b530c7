//! Run reports
//!
//! Per-action outcomes and the aggregated test report. The report is the
//! crate's one output format: serialized as JSON by the CLI and returned
//! as a value from the library API. Labels and timestamps ride along for
//! logging and printed summaries but stay out of the serialized form.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::instruction::{Action, ActionKind};

/// Outcome status of one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Success,
    Error,
}

/// Final status of a whole run.
///
/// `Error` is reserved for runs cut short by a fatal driver failure;
/// ordinary action failures leave the run `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Error,
}

impl TestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::Error => "error",
        }
    }
}

/// What happened to one action.
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    #[serde(rename = "action")]
    pub kind: ActionKind,
    pub status: ActionStatus,

    /// Failure detail, or a note on a success (e.g. a degraded screenshot).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// Screenshot captured by or because of this action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<PathBuf>,

    #[serde(skip)]
    pub label: String,

    #[serde(skip)]
    pub timestamp: DateTime<Utc>,
}

impl ActionOutcome {
    pub fn success(action: &Action) -> Self {
        Self {
            kind: action.kind(),
            status: ActionStatus::Success,
            detail: None,
            screenshot: None,
            label: action.label(),
            timestamp: Utc::now(),
        }
    }

    pub fn failure(action: &Action, detail: impl Into<String>) -> Self {
        Self {
            kind: action.kind(),
            status: ActionStatus::Error,
            detail: Some(detail.into()),
            screenshot: None,
            label: action.label(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_screenshot(mut self, path: PathBuf) -> Self {
        self.screenshot = Some(path);
        self
    }

    pub fn failed(&self) -> bool {
        self.status == ActionStatus::Error
    }
}

/// Aggregated result of one instruction run.
#[derive(Debug, Clone, Serialize)]
pub struct TestReport {
    pub status: TestStatus,
    pub passed: bool,
    pub duration_ms: u64,
    pub actions_executed: Vec<ActionOutcome>,
    pub screenshots: Vec<PathBuf>,
    pub errors: Vec<String>,
}

impl TestReport {
    /// Fold per-action outcomes into a final report. Any errored outcome
    /// fails the run.
    pub fn aggregate(outcomes: Vec<ActionOutcome>, duration: Duration) -> Self {
        let errors = failure_messages(&outcomes);
        let status = if errors.is_empty() {
            TestStatus::Passed
        } else {
            TestStatus::Failed
        };
        Self {
            status,
            passed: errors.is_empty(),
            duration_ms: duration.as_millis() as u64,
            screenshots: collect_screenshots(&outcomes),
            actions_executed: outcomes,
            errors,
        }
    }

    /// Report for a run cut short by a fatal driver error. Outcomes up to
    /// the point of failure are kept.
    pub fn aborted(
        outcomes: Vec<ActionOutcome>,
        error: impl Into<String>,
        duration: Duration,
    ) -> Self {
        let mut errors = failure_messages(&outcomes);
        errors.push(format!("Test execution error: {}", error.into()));
        Self {
            status: TestStatus::Error,
            passed: false,
            duration_ms: duration.as_millis() as u64,
            screenshots: collect_screenshots(&outcomes),
            actions_executed: outcomes,
            errors,
        }
    }

    /// Report for an instruction that produced no actions at all.
    pub fn no_actions() -> Self {
        Self {
            status: TestStatus::Failed,
            passed: false,
            duration_ms: 0,
            actions_executed: Vec::new(),
            screenshots: Vec::new(),
            errors: vec!["No actions could be parsed from instruction".to_string()],
        }
    }
}

fn failure_messages(outcomes: &[ActionOutcome]) -> Vec<String> {
    outcomes
        .iter()
        .filter(|o| o.failed())
        .map(|o| {
            format!(
                "Action failed: {} - {}",
                o.label,
                o.detail.as_deref().unwrap_or("Unknown error")
            )
        })
        .collect()
}

fn collect_screenshots(outcomes: &[ActionOutcome]) -> Vec<PathBuf> {
    outcomes.iter().filter_map(|o| o.screenshot.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search() -> Action {
        Action::Search {
            term: "laptop".into(),
        }
    }

    #[test]
    fn test_aggregate_all_success() {
        let outcomes = vec![
            ActionOutcome::success(&Action::Navigate {
                url: "homepage".into(),
            }),
            ActionOutcome::success(&search()),
        ];
        let report = TestReport::aggregate(outcomes, Duration::from_millis(1500));

        assert_eq!(report.status, TestStatus::Passed);
        assert!(report.passed);
        assert_eq!(report.duration_ms, 1500);
        assert_eq!(report.actions_executed.len(), 2);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_aggregate_with_failure() {
        let outcomes = vec![
            ActionOutcome::success(&search()),
            ActionOutcome::failure(&Action::AddToCart, "Element not found: .add-to-cart"),
        ];
        let report = TestReport::aggregate(outcomes, Duration::from_millis(900));

        assert_eq!(report.status, TestStatus::Failed);
        assert!(!report.passed);
        assert_eq!(
            report.errors,
            vec![
                "Action failed: Add product to cart - Element not found: .add-to-cart".to_string()
            ]
        );
    }

    #[test]
    fn test_aborted_appends_fatal_error() {
        let outcomes = vec![ActionOutcome::success(&search())];
        let report = TestReport::aborted(outcomes, "Driver disconnected", Duration::from_secs(2));

        assert_eq!(report.status, TestStatus::Error);
        assert!(!report.passed);
        assert_eq!(report.actions_executed.len(), 1);
        assert_eq!(
            report.errors,
            vec!["Test execution error: Driver disconnected".to_string()]
        );
    }

    #[test]
    fn test_no_actions_report() {
        let report = TestReport::no_actions();
        assert_eq!(report.status, TestStatus::Failed);
        assert!(!report.passed);
        assert_eq!(report.duration_ms, 0);
        assert_eq!(
            report.errors,
            vec!["No actions could be parsed from instruction".to_string()]
        );
    }

    #[test]
    fn test_screenshots_collected_from_outcomes() {
        let outcomes = vec![
            ActionOutcome::success(&Action::Screenshot { name: None })
                .with_screenshot(PathBuf::from("screenshots/take_screenshot_1.png")),
            ActionOutcome::success(&search()),
        ];
        let report = TestReport::aggregate(outcomes, Duration::ZERO);
        assert_eq!(
            report.screenshots,
            vec![PathBuf::from("screenshots/take_screenshot_1.png")]
        );
    }

    #[test]
    fn test_outcome_serialized_shape() {
        let ok = serde_json::to_value(ActionOutcome::success(&search())).unwrap();
        assert_eq!(ok["action"], "search");
        assert_eq!(ok["status"], "success");
        assert!(ok.get("detail").is_none());
        assert!(ok.get("label").is_none());
        assert!(ok.get("timestamp").is_none());

        let failed = serde_json::to_value(ActionOutcome::failure(
            &Action::Checkout,
            "Element not found: .checkout-button",
        ))
        .unwrap();
        assert_eq!(failed["action"], "checkout");
        assert_eq!(failed["status"], "error");
        assert_eq!(failed["detail"], "Element not found: .checkout-button");
    }

    #[test]
    fn test_report_serialized_shape() {
        let report = TestReport::aggregate(
            vec![ActionOutcome::success(&search())],
            Duration::from_millis(42),
        );
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["status"], "passed");
        assert_eq!(value["passed"], true);
        assert_eq!(value["duration_ms"], 42);
        assert!(value["actions_executed"].is_array());
        assert!(value["screenshots"].as_array().unwrap().is_empty());
        assert!(value["errors"].as_array().unwrap().is_empty());
    }
}
