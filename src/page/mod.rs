//! Browser page abstraction
//!
//! The executor drives a [`Page`], not a browser library. The one real
//! implementation talks to Playwright through an external Node driver
//! ([`playwright::PlaywrightPage`]); tests substitute their own.

use async_trait::async_trait;

mod rpc;

pub mod playwright;

pub use playwright::{PlaywrightPage, PlaywrightSession};

/// Errors from the driver connection or the page operations themselves.
///
/// Fatal variants mean the driver is gone and no further page call can
/// succeed; everything else is scoped to the one operation that failed.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("Failed to start driver: {0}")]
    StartupFailed(String),

    #[error("Driver disconnected")]
    Disconnected,

    #[error("Driver error: {0}")]
    DriverError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PageError {
    /// Whether this error ends the session rather than the single action.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PageError::StartupFailed(_) | PageError::Disconnected)
    }
}

/// Operations the executor needs from a live browser page.
///
/// Selector arguments are passed to the driver untouched, so any syntax
/// the backing browser supports (CSS, `:has-text(...)`) is usable.
#[async_trait]
pub trait Page: Send + Sync {
    /// Navigate to an absolute URL and wait for the load to settle.
    async fn navigate(&self, url: &str) -> Result<(), PageError>;

    async fn click(&self, selector: &str) -> Result<(), PageError>;

    async fn fill(&self, selector: &str, text: &str) -> Result<(), PageError>;

    /// Press a single key (e.g. `"Enter"`) with the element focused.
    async fn press_key(&self, selector: &str, key: &str) -> Result<(), PageError>;

    /// Choose an option in a `<select>` by value or visible label.
    async fn select_option(&self, selector: &str, value: &str) -> Result<(), PageError>;

    /// Whether the selector matches an element that is currently visible.
    async fn query(&self, selector: &str) -> Result<bool, PageError>;

    /// Text content of the first match, empty string when the node has none.
    async fn text_content(&self, selector: &str) -> Result<String, PageError>;

    async fn current_url(&self) -> Result<String, PageError>;

    /// Capture a full-page PNG and return its bytes.
    async fn capture_screenshot(&self) -> Result<Vec<u8>, PageError>;
}
