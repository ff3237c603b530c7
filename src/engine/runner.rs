//! Test runner
//!
//! Owns the parser and the run policy; borrows the caller's page for the
//! duration of each run and turns one instruction into one [`TestReport`].
//! The public entry points are infallible: every way a run can go wrong,
//! from an unparseable instruction to the driver dying mid-run, is folded
//! into the returned report.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{Settings, StorefrontProfile};
use crate::instruction::{Action, InstructionParser};
use crate::page::Page;

use super::clock::{Clock, SystemClock};
use super::executor::ActionExecutor;
use super::report::TestReport;

pub struct TestRunner {
    parser: Box<dyn InstructionParser>,
    profile: StorefrontProfile,
    settings: Settings,
    clock: Arc<dyn Clock>,
    run_lock: Mutex<()>,
    stop_on_failure: bool,
}

impl TestRunner {
    pub fn new(
        parser: Box<dyn InstructionParser>,
        profile: StorefrontProfile,
        settings: Settings,
    ) -> Self {
        Self {
            parser,
            profile,
            settings,
            clock: Arc::new(SystemClock),
            run_lock: Mutex::new(()),
            stop_on_failure: false,
        }
    }

    /// Substitute the clock used for report durations.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Stop at the first failed action instead of running the remainder.
    pub fn with_stop_on_failure(mut self, stop: bool) -> Self {
        self.stop_on_failure = stop;
        self
    }

    /// Parse the instruction and run the resulting actions against `page`.
    #[tracing::instrument(skip(self, page, instruction))]
    pub async fn execute_test(&self, page: &dyn Page, instruction: &str) -> TestReport {
        let run_id = Uuid::new_v4();
        let preview: String = instruction.chars().take(100).collect();
        info!(%run_id, instruction = %preview, "Executing test");

        let actions = self.parser.parse(instruction).await;
        info!(%run_id, count = actions.len(), "Parsed actions");

        if actions.is_empty() {
            return TestReport::no_actions();
        }

        self.execute_actions(page, &actions).await
    }

    /// Run already-parsed actions in order against `page`. Runs on one
    /// runner are serialized on an internal lock because callers typically
    /// hand every run the same page.
    pub async fn execute_actions(&self, page: &dyn Page, actions: &[Action]) -> TestReport {
        let _guard = self.run_lock.lock().await;

        let executor = ActionExecutor::new(page, &self.profile, &self.settings);
        let started = self.clock.now();
        let mut outcomes = Vec::with_capacity(actions.len());

        for (i, action) in actions.iter().enumerate() {
            info!(
                index = i + 1,
                total = actions.len(),
                action = %action.label(),
                "Executing action"
            );

            match executor.execute(action).await {
                Ok(outcome) => {
                    let failed = outcome.failed();
                    let outcome = if failed {
                        error!(action = %action.label(), "Action failed");
                        match executor.capture_failure_evidence(i + 1).await {
                            Some(path) => outcome.with_screenshot(path),
                            None => outcome,
                        }
                    } else {
                        outcome
                    };
                    outcomes.push(outcome);

                    if failed && self.stop_on_failure {
                        warn!("Stopping run after failed action");
                        break;
                    }
                }
                Err(e) => {
                    error!(error = %e, "Test execution error");
                    let duration = self.clock.now().saturating_duration_since(started);
                    return TestReport::aborted(outcomes, e.to_string(), duration);
                }
            }
        }

        let duration = self.clock.now().saturating_duration_since(started);
        let report = TestReport::aggregate(outcomes, duration);
        info!(
            status = report.status.as_str(),
            duration_ms = report.duration_ms,
            "Test execution completed"
        );
        report
    }
}
