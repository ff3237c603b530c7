//! Action execution
//!
//! [`ActionExecutor`] turns one [`Action`] at a time into page operations.
//! Storefront-aware actions (search, cart, checkout, variants) resolve
//! their target element from the profile's candidate selector lists rather
//! than a single hardcoded selector, polling briefly so late-rendering
//! themes still match.
//!
//! Failure handling follows one rule: an error scoped to the action comes
//! back as an errored [`ActionOutcome`] in `Ok`, while `Err` is reserved
//! for fatal driver failures that make every further action pointless.

use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::{Settings, StorefrontProfile};
use crate::instruction::Action;
use crate::page::Page;

use super::error::ActionError;
use super::report::ActionOutcome;

/// How often candidate lookups re-check the page.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 1x1 transparent PNG written when a capture fails, so every screenshot
/// path the report references exists on disk.
const PLACEHOLDER_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
    0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0b, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x60,
    0x00, 0x02, 0x00, 0x00, 0x05, 0x00, 0x01, 0x7a, 0x5e, 0xab, 0x3f, 0x00, 0x00, 0x00, 0x00,
    0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

pub struct ActionExecutor<'a> {
    page: &'a dyn Page,
    profile: &'a StorefrontProfile,
    settings: &'a Settings,
}

impl<'a> ActionExecutor<'a> {
    pub fn new(page: &'a dyn Page, profile: &'a StorefrontProfile, settings: &'a Settings) -> Self {
        Self {
            page,
            profile,
            settings,
        }
    }

    /// Execute one action.
    ///
    /// `Err` only for fatal driver failures; every other failure is an
    /// errored outcome in `Ok`.
    pub async fn execute(&self, action: &Action) -> Result<ActionOutcome, ActionError> {
        info!(action = %action.kind(), "Executing action");

        match self.dispatch(action).await {
            Ok(outcome) => {
                info!(action = %action.kind(), "Action executed successfully");
                Ok(outcome)
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                error!(action = %action.kind(), error = %e, "Action execution failed");
                Ok(ActionOutcome::failure(action, e.to_string()))
            }
        }
    }

    async fn dispatch(&self, action: &Action) -> Result<ActionOutcome, ActionError> {
        match action {
            Action::Navigate { url } => self.navigate(action, url).await,
            Action::Search { term } => self.search(action, term).await,
            Action::Click { selector } => self.click(action, selector).await,
            Action::Fill { selector, text } => self.fill(action, selector, text).await,
            Action::Screenshot { name } => self.screenshot(action, name.as_deref()).await,
            Action::AddToCart => self.add_to_cart(action).await,
            Action::GoToCart => self.go_to_cart(action).await,
            Action::Checkout => self.checkout(action).await,
            Action::SelectVariant {
                variant_type,
                value,
            } => self.select_variant(action, variant_type, value).await,
            Action::VerifyText { selector, text } => self.verify_text(action, selector, text).await,
            Action::VerifyElement { selector } => self.verify_element(action, selector).await,
            Action::VerifyUrl { url } => self.verify_url(action, url).await,
        }
    }

    async fn navigate(&self, action: &Action, url: &str) -> Result<ActionOutcome, ActionError> {
        let target = if url == "homepage" {
            self.settings.base_url.clone()
        } else {
            url.to_string()
        };
        self.page.navigate(&target).await?;
        Ok(ActionOutcome::success(action))
    }

    async fn search(&self, action: &Action, term: &str) -> Result<ActionOutcome, ActionError> {
        let input = self.resolve_selector(&self.profile.search_inputs).await?;
        self.page.fill(&input, term).await?;
        self.page.press_key(&input, "Enter").await?;
        info!(term, "Search submitted");
        Ok(ActionOutcome::success(action))
    }

    async fn click(&self, action: &Action, selector: &str) -> Result<ActionOutcome, ActionError> {
        let resolved = self.resolve_selector(&[selector.to_string()]).await?;
        self.page.click(&resolved).await?;
        Ok(ActionOutcome::success(action))
    }

    async fn fill(
        &self,
        action: &Action,
        selector: &str,
        text: &str,
    ) -> Result<ActionOutcome, ActionError> {
        let resolved = self.resolve_selector(&[selector.to_string()]).await?;
        self.page.fill(&resolved, text).await?;
        Ok(ActionOutcome::success(action))
    }

    async fn add_to_cart(&self, action: &Action) -> Result<ActionOutcome, ActionError> {
        let button = self.resolve_selector(&self.profile.add_to_cart).await?;
        self.page.click(&button).await?;
        Ok(ActionOutcome::success(action))
    }

    async fn go_to_cart(&self, action: &Action) -> Result<ActionOutcome, ActionError> {
        match self.resolve_selector(&self.profile.cart_links).await {
            Ok(link) => {
                self.page.click(&link).await?;
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(_) => {
                // Some themes have no cart link in the chrome; the cart
                // page itself always exists.
                let url = format!("{}/cart", self.settings.base_url.trim_end_matches('/'));
                info!(url = %url, "No cart link found, navigating directly");
                self.page.navigate(&url).await?;
            }
        }
        Ok(ActionOutcome::success(action))
    }

    async fn checkout(&self, action: &Action) -> Result<ActionOutcome, ActionError> {
        let button = self.resolve_selector(&self.profile.checkout).await?;
        self.page.click(&button).await?;
        Ok(ActionOutcome::success(action))
    }

    async fn select_variant(
        &self,
        action: &Action,
        variant_type: &str,
        value: &str,
    ) -> Result<ActionOutcome, ActionError> {
        let candidates = self.profile.variant_candidates(variant_type);
        match self.resolve_selector(&candidates).await {
            Ok(select) => match self.page.select_option(&select, value).await {
                Ok(()) => {
                    info!(variant = value, "Variant selected");
                    return Ok(ActionOutcome::success(action));
                }
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    warn!(error = %e, "Variant dropdown rejected value, trying swatch button");
                }
            },
            Err(e) if e.is_fatal() => return Err(e),
            Err(_) => {}
        }

        // Swatch-style variants render as buttons, not dropdowns.
        let button = self
            .resolve_selector(&[format!(r#"button:has-text("{value}")"#)])
            .await?;
        self.page.click(&button).await?;
        info!(variant = value, "Variant selected via button");
        Ok(ActionOutcome::success(action))
    }

    async fn verify_text(
        &self,
        action: &Action,
        selector: &str,
        text: &str,
    ) -> Result<ActionOutcome, ActionError> {
        if !self.page.query(selector).await? {
            return Err(ActionError::VerificationFailed(format!(
                "Element not found: {selector}"
            )));
        }

        let actual = self.page.text_content(selector).await?;
        if !actual.to_lowercase().contains(&text.to_lowercase()) {
            return Err(ActionError::VerificationFailed(format!(
                "Text '{text}' not found in element. Actual text: '{}'",
                excerpt(&actual)
            )));
        }
        Ok(ActionOutcome::success(action))
    }

    async fn verify_element(
        &self,
        action: &Action,
        selector: &str,
    ) -> Result<ActionOutcome, ActionError> {
        self.resolve_selector(&[selector.to_string()]).await?;
        Ok(ActionOutcome::success(action))
    }

    async fn verify_url(&self, action: &Action, url: &str) -> Result<ActionOutcome, ActionError> {
        let current = self.page.current_url().await?;
        if !current.contains(url) {
            return Err(ActionError::VerificationFailed(format!(
                "URL doesn't contain '{url}'. Current URL: {current}"
            )));
        }
        Ok(ActionOutcome::success(action))
    }

    async fn screenshot(
        &self,
        action: &Action,
        name: Option<&str>,
    ) -> Result<ActionOutcome, ActionError> {
        let stem = match name {
            Some(name) => sanitize(name),
            None => sanitize(&action.label()),
        };

        let (path, detail) = self.save_screenshot(&stem).await;
        let mut outcome = ActionOutcome::success(action);
        outcome.detail = detail;
        if let Some(path) = path {
            outcome = outcome.with_screenshot(path);
        }
        Ok(outcome)
    }

    /// Capture evidence after a failed action, named `error_step_<n>`.
    /// Never fails the run; `None` when nothing could be saved.
    pub async fn capture_failure_evidence(&self, step: usize) -> Option<PathBuf> {
        let (path, _) = self.save_screenshot(&format!("error_step_{step}")).await;
        path
    }

    /// Find the first candidate selector with a visible match, polling
    /// until the lookup deadline passes. A zero timeout still sweeps the
    /// candidates once.
    async fn resolve_selector(&self, candidates: &[String]) -> Result<String, ActionError> {
        let deadline = Instant::now() + Duration::from_millis(self.settings.verify_timeout_ms);

        loop {
            for candidate in candidates {
                match self.page.query(candidate).await {
                    Ok(true) => return Ok(candidate.clone()),
                    Ok(false) => {}
                    Err(e) if e.is_fatal() => return Err(e.into()),
                    Err(e) => {
                        // Invalid selector or transient driver hiccup;
                        // other candidates may still match.
                        warn!(selector = %candidate, error = %e, "Candidate lookup failed");
                    }
                }
            }
            if Instant::now() >= deadline {
                return Err(ActionError::ElementNotFound {
                    tried: candidates.to_vec(),
                });
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Capture the page and write it under the screenshots directory.
    /// A failed capture is retried once, then degraded to a placeholder
    /// image; the returned detail notes any degradation.
    async fn save_screenshot(&self, stem: &str) -> (Option<PathBuf>, Option<String>) {
        let bytes = match self.page.capture_screenshot().await {
            Ok(bytes) => bytes,
            Err(first) => {
                warn!(error = %first, "Screenshot capture failed, retrying");
                match self.page.capture_screenshot().await {
                    Ok(bytes) => bytes,
                    Err(second) => {
                        error!(error = %second, "Screenshot capture failed twice, writing placeholder");
                        return self.write_artifact(
                            stem,
                            PLACEHOLDER_PNG,
                            Some(format!("Screenshot capture failed: {second}")),
                        );
                    }
                }
            }
        };
        self.write_artifact(stem, &bytes, None)
    }

    fn write_artifact(
        &self,
        stem: &str,
        bytes: &[u8],
        detail: Option<String>,
    ) -> (Option<PathBuf>, Option<String>) {
        let dir = &self.settings.screenshots_dir;
        if let Err(e) = std::fs::create_dir_all(dir) {
            error!(error = %e, dir = %dir.display(), "Could not create screenshots directory");
            return (None, Some(format!("Could not save screenshot: {e}")));
        }

        let path = dir.join(format!("{stem}_{}.png", unix_timestamp()));
        match std::fs::write(&path, bytes) {
            Ok(()) => {
                info!(path = %path.display(), "Screenshot saved");
                (Some(path), detail)
            }
            Err(e) => {
                error!(error = %e, path = %path.display(), "Could not write screenshot");
                (None, Some(format!("Could not save screenshot: {e}")))
            }
        }
    }
}

/// Lowercased ASCII alphanumerics; everything else becomes '_'.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Failure details keep a bounded prefix of the page text.
fn excerpt(text: &str) -> String {
    const MAX_CHARS: usize = 200;
    match text.char_indices().nth(MAX_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_labels() {
        assert_eq!(sanitize("Take screenshot"), "take_screenshot");
        assert_eq!(sanitize("cart view"), "cart_view");
        assert_eq!(sanitize("error_step_3"), "error_step_3");
        assert_eq!(sanitize("Größe XL"), "gr__e_xl");
    }

    #[test]
    fn test_excerpt_short_text_unchanged() {
        assert_eq!(excerpt("welcome back"), "welcome back");
    }

    #[test]
    fn test_excerpt_truncates_long_text() {
        let text = "x".repeat(500);
        let cut = excerpt(&text);
        assert_eq!(cut.len(), 203);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        let text = "é".repeat(300);
        let cut = excerpt(&text);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), 203);
    }

    #[test]
    fn test_placeholder_is_a_png() {
        assert_eq!(
            &PLACEHOLDER_PNG[..8],
            &[0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a]
        );
        assert_eq!(&PLACEHOLDER_PNG[PLACEHOLDER_PNG.len() - 8..][..4], b"IEND");
    }
}
