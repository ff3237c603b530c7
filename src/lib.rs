//! # Storefront Actions
//!
//! A natural-language test harness for e-commerce storefronts powered by
//! Playwright. Plain-English instructions are parsed into browser actions,
//! executed against a live store page, and aggregated into a pass/fail
//! report with screenshots.
//!
//! ## Features
//!
//! - **Natural-language instructions** - "Search for 'running shoes' and add
//!   the first product to the cart"
//! - **Two parsers** - An LLM-backed parser (Anthropic or OpenAI) with a
//!   keyword rule parser as offline fallback
//! - **Storefront-aware selectors** - Search boxes, add-to-cart buttons, and
//!   checkout links are found by trying platform-specific candidates in order
//! - **Evidence on failure** - Every failed action gets an error screenshot
//!   attached to the report
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use storefront_actions::page::PlaywrightSession;
//! use storefront_actions::{RuleParser, Settings, StorefrontProfile, TestRunner};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::from_env();
//!     let session =
//!         PlaywrightSession::launch(settings.headless, settings.browser_timeout_ms).await?;
//!     let page = session.new_page().await?;
//!
//!     let runner = TestRunner::new(
//!         Box::new(RuleParser::new()),
//!         StorefrontProfile::default(),
//!         settings,
//!     );
//!
//!     let report = runner
//!         .execute_test(&page, "Go to the homepage. Verify the page contains 'Welcome'.")
//!         .await;
//!     println!("Test {}: {} ms", report.status.as_str(), report.duration_ms);
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod instruction;
pub mod page;

// Re-export main types
pub use config::{ProfileError, Settings, StorefrontProfile};
pub use engine::{
    ActionError, ActionExecutor, ActionOutcome, ActionStatus, Clock, ManualClock, SystemClock,
    TestReport, TestRunner, TestStatus,
};
pub use instruction::{
    Action, ActionDecodeError, ActionKind, InstructionParser, LlmConfig, LlmError, LlmParser,
    LlmProvider, RuleParser,
};
pub use page::{Page, PageError, PlaywrightPage, PlaywrightSession};


/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Settings, StorefrontProfile};
    pub use crate::engine::{ActionOutcome, ActionStatus, TestReport, TestRunner, TestStatus};
    pub use crate::instruction::{Action, ActionKind, InstructionParser, LlmParser, RuleParser};
    pub use crate::page::{Page, PageError, PlaywrightSession};
}
