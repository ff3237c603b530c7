//! Playwright-backed page driven over JSON-RPC
//!
//! Spawns the Node driver script and speaks JSON-RPC to it over
//! stdin/stdout. A [`PlaywrightSession`] owns the child process and one
//! launched browser; pages handed out by the session implement [`Page`]
//! and stay valid until the session is closed.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{json, Value};
use tokio::process::{Child, Command};
use tracing::info;

use super::rpc::DriverLink;
use super::{Page, PageError};

const DRIVER_SCRIPT: &str = "extensions/playwright/server.js";

/// Locate the driver script regardless of the process working directory.
///
/// An explicit override (the `STOREFRONT_DRIVER_SCRIPT` env var) wins;
/// otherwise the relative path is tried against the cwd for checked-out
/// trees, then anchored to the crate directory the binary was built from.
fn resolve_driver_script(override_path: Option<&str>) -> PathBuf {
    if let Some(path) = override_path {
        return PathBuf::from(path);
    }
    let local = Path::new(DRIVER_SCRIPT);
    if local.exists() {
        return local.to_path_buf();
    }
    Path::new(env!("CARGO_MANIFEST_DIR")).join(DRIVER_SCRIPT)
}

/// A running driver process with one launched browser.
pub struct PlaywrightSession {
    link: DriverLink,
    browser_id: String,
    child: Child,
}

impl PlaywrightSession {
    /// Spawn the Node driver and launch a browser in it.
    ///
    /// `timeout_ms` becomes the driver-side default timeout for every
    /// page operation, so a stuck navigation or click fails there instead
    /// of hanging the run.
    pub async fn launch(headless: bool, timeout_ms: u64) -> Result<Self, PageError> {
        let node = which::which("node").map_err(|_| {
            PageError::StartupFailed(
                "node not found in PATH; the Playwright driver requires Node.js".to_string(),
            )
        })?;

        let script =
            resolve_driver_script(std::env::var("STOREFRONT_DRIVER_SCRIPT").ok().as_deref());
        let mut child = Command::new(node)
            .arg(&script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| PageError::StartupFailed(e.to_string()))?;

        let stdin = child.stdin.take().ok_or_else(|| {
            PageError::StartupFailed("Failed to get stdin of driver process".to_string())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            PageError::StartupFailed("Failed to get stdout of driver process".to_string())
        })?;

        let link = DriverLink::connect(stdin, stdout);

        let result = link
            .call(
                "browser.launch",
                json!({ "headless": headless, "timeout": timeout_ms }),
            )
            .await?;
        let browser_id = result["browserId"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| PageError::DriverError("No browser ID returned".to_string()))?;

        info!(headless, "Playwright browser launched");

        Ok(Self {
            link,
            browser_id,
            child,
        })
    }

    /// Open a new page in the session's browser.
    pub async fn new_page(&self) -> Result<PlaywrightPage, PageError> {
        let result = self
            .link
            .call("page.new", json!({ "browserId": self.browser_id }))
            .await?;
        let page_id = result["pageId"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| PageError::DriverError("No page ID returned".to_string()))?;

        Ok(PlaywrightPage {
            link: self.link.clone(),
            page_id,
        })
    }

    /// Close the browser and wait for the driver process to exit.
    pub async fn close(mut self) -> Result<(), PageError> {
        self.link
            .call("browser.close", json!({ "browserId": self.browser_id }))
            .await?;
        let _ = self.child.wait().await;
        Ok(())
    }
}

impl Drop for PlaywrightSession {
    fn drop(&mut self) {
        let _ = self.child.start_kill();
    }
}

/// One Playwright page. The handle is cheap to clone; all calls go through
/// the session's driver link.
pub struct PlaywrightPage {
    link: DriverLink,
    page_id: String,
}

impl PlaywrightPage {
    async fn call(&self, method: &str, params: Value) -> Result<Value, PageError> {
        self.link.call(method, params).await
    }
}

#[async_trait]
impl Page for PlaywrightPage {
    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        self.call("page.goto", json!({ "pageId": self.page_id, "url": url }))
            .await?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), PageError> {
        self.call(
            "element.click",
            json!({ "pageId": self.page_id, "selector": selector }),
        )
        .await?;
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<(), PageError> {
        self.call(
            "element.fill",
            json!({ "pageId": self.page_id, "selector": selector, "value": text }),
        )
        .await?;
        Ok(())
    }

    async fn press_key(&self, selector: &str, key: &str) -> Result<(), PageError> {
        self.call(
            "element.press",
            json!({ "pageId": self.page_id, "selector": selector, "key": key }),
        )
        .await?;
        Ok(())
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<(), PageError> {
        self.call(
            "element.select",
            json!({ "pageId": self.page_id, "selector": selector, "value": value }),
        )
        .await?;
        Ok(())
    }

    async fn query(&self, selector: &str) -> Result<bool, PageError> {
        let result = self
            .call(
                "element.isVisible",
                json!({ "pageId": self.page_id, "selector": selector }),
            )
            .await?;
        Ok(result["visible"].as_bool().unwrap_or(false))
    }

    async fn text_content(&self, selector: &str) -> Result<String, PageError> {
        let result = self
            .call(
                "element.textContent",
                json!({ "pageId": self.page_id, "selector": selector }),
            )
            .await?;
        // Detached or empty nodes report null text; treat that as empty.
        Ok(result["text"].as_str().unwrap_or("").to_string())
    }

    async fn current_url(&self) -> Result<String, PageError> {
        let result = self.call("page.url", json!({ "pageId": self.page_id })).await?;
        result["url"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| PageError::DriverError("No URL returned".to_string()))
    }

    async fn capture_screenshot(&self) -> Result<Vec<u8>, PageError> {
        let result = self
            .call(
                "page.screenshot",
                json!({ "pageId": self.page_id, "fullPage": true }),
            )
            .await?;
        let data = result["data"]
            .as_str()
            .ok_or_else(|| PageError::DriverError("No screenshot data returned".to_string()))?;
        BASE64
            .decode(data)
            .map_err(|e| PageError::DriverError(format!("Invalid screenshot payload: {e}")))
    }
}
