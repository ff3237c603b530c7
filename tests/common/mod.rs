#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use storefront_actions::engine::ManualClock;
use storefront_actions::page::{Page, PageError};
use storefront_actions::Settings;
use tempfile::TempDir;

pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

pub fn write_profile(dir: &Path, content: &str) {
    std::fs::write(dir.join("profile.yaml"), content).expect("Failed to write profile.yaml");
}

/// Settings pointed at the temp directory, with a zero lookup timeout so
/// missing-element cases fail after a single sweep instead of polling.
pub fn test_settings(dir: &Path) -> Settings {
    Settings {
        base_url: "https://store.test".to_string(),
        headless: true,
        browser_timeout_ms: 1_000,
        verify_timeout_ms: 0,
        screenshots_dir: dir.join("shots"),
    }
}

pub const FAKE_PNG: &[u8] = &[0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a];

/// In-memory page double. Selectors listed as present are visible; every
/// call is appended to a shared op log so tests can assert the exact
/// sequence of page operations. Cloning shares the log, the URL, and the
/// count of screenshot calls that will fail.
#[derive(Clone, Default)]
pub struct FakePage {
    present: HashSet<String>,
    texts: HashMap<String, String>,
    failing: HashSet<String>,
    fatal: HashSet<String>,
    reject_select: HashSet<String>,
    url: Arc<Mutex<String>>,
    ops: Arc<Mutex<Vec<String>>>,
    screenshot_failures: Arc<Mutex<usize>>,
    clock: Option<Arc<ManualClock>>,
    tick_ms: u64,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark selectors as present and visible.
    pub fn with_present(mut self, selectors: &[&str]) -> Self {
        self.present.extend(selectors.iter().map(|s| s.to_string()));
        self
    }

    /// Mark a selector present with the given text content.
    pub fn with_text(mut self, selector: &str, text: &str) -> Self {
        self.present.insert(selector.to_string());
        self.texts.insert(selector.to_string(), text.to_string());
        self
    }

    /// Any operation on this selector fails with a non-fatal driver error.
    pub fn with_failing(mut self, selector: &str) -> Self {
        self.failing.insert(selector.to_string());
        self
    }

    /// Any operation on this selector fails as if the driver disconnected.
    pub fn with_fatal(mut self, selector: &str) -> Self {
        self.fatal.insert(selector.to_string());
        self
    }

    /// The selector is present, but selecting an option in it fails.
    pub fn with_select_rejected(mut self, selector: &str) -> Self {
        self.present.insert(selector.to_string());
        self.reject_select.insert(selector.to_string());
        self
    }

    pub fn with_url(self, url: &str) -> Self {
        *self.url.lock().unwrap() = url.to_string();
        self
    }

    /// The next `count` capture attempts fail before captures succeed again.
    pub fn with_screenshot_failures(self, count: usize) -> Self {
        *self.screenshot_failures.lock().unwrap() = count;
        self
    }

    /// Advance the manual clock by `tick_ms` on every page call, making
    /// report durations deterministic.
    pub fn with_clock(mut self, clock: Arc<ManualClock>, tick_ms: u64) -> Self {
        self.clock = Some(clock);
        self.tick_ms = tick_ms;
        self
    }

    pub fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }

    fn record(&self, op: String) {
        self.ops.lock().unwrap().push(op);
        if let Some(clock) = &self.clock {
            clock.advance(Duration::from_millis(self.tick_ms));
        }
    }

    fn check(&self, selector: &str) -> Result<(), PageError> {
        if self.fatal.contains(selector) {
            return Err(PageError::Disconnected);
        }
        if self.failing.contains(selector) {
            return Err(PageError::DriverError(format!("lookup failed: {selector}")));
        }
        Ok(())
    }
}

#[async_trait]
impl Page for FakePage {
    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        self.record(format!("navigate {url}"));
        *self.url.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), PageError> {
        self.record(format!("click {selector}"));
        self.check(selector)
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<(), PageError> {
        self.record(format!("fill {selector} {text}"));
        self.check(selector)
    }

    async fn press_key(&self, selector: &str, key: &str) -> Result<(), PageError> {
        self.record(format!("press {selector} {key}"));
        self.check(selector)
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<(), PageError> {
        self.record(format!("select {selector} {value}"));
        self.check(selector)?;
        if self.reject_select.contains(selector) {
            return Err(PageError::DriverError(format!(
                "no option matching '{value}'"
            )));
        }
        Ok(())
    }

    async fn query(&self, selector: &str) -> Result<bool, PageError> {
        self.record(format!("query {selector}"));
        self.check(selector)?;
        Ok(self.present.contains(selector))
    }

    async fn text_content(&self, selector: &str) -> Result<String, PageError> {
        self.record(format!("text {selector}"));
        self.check(selector)?;
        Ok(self.texts.get(selector).cloned().unwrap_or_default())
    }

    async fn current_url(&self) -> Result<String, PageError> {
        self.record("url".to_string());
        Ok(self.url.lock().unwrap().clone())
    }

    async fn capture_screenshot(&self) -> Result<Vec<u8>, PageError> {
        self.record("screenshot".to_string());
        let mut failures = self.screenshot_failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(PageError::DriverError("capture failed".to_string()));
        }
        Ok(FAKE_PNG.to_vec())
    }
}
