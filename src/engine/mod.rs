//! Action execution engine module
//!
//! This module contains:
//! - `runner` - The top-level test runner
//! - `executor` - Per-action execution against a page
//! - `report` - Action outcome and test report types
//! - `error` - Executor error types
//! - `clock` - Clock abstraction for report durations

pub mod clock;
pub mod error;
pub mod executor;
pub mod report;
pub mod runner;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::ActionError;
pub use executor::ActionExecutor;
pub use report::{ActionOutcome, ActionStatus, TestReport, TestStatus};
pub use runner::TestRunner;
