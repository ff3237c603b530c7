//! Runtime settings and storefront profile
//!
//! Two kinds of configuration with different sources: [`Settings`] are
//! runtime knobs read from the environment, [`StorefrontProfile`] is the
//! selector vocabulary of the store under test, loaded from YAML when the
//! built-in defaults don't fit a customized theme:
//!
//! ```yaml
//! search_inputs:
//!   - 'input[name="search"]'
//!   - '.header-search input'
//!
//! checkout:
//!   - 'button.cart__checkout'
//! ```
//!
//! Lists left out of the file keep their defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Runtime settings, read from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Store base URL (`STOREFRONT_URL`).
    pub base_url: String,
    /// Run the browser headless (`HEADLESS_MODE`, "true"/"false").
    pub headless: bool,
    /// Driver-side timeout for page operations (`BROWSER_TIMEOUT`, ms).
    pub browser_timeout_ms: u64,
    /// How long element lookups poll before giving up (ms).
    pub verify_timeout_ms: u64,
    /// Where screenshot files land (`SCREENSHOTS_DIR`).
    pub screenshots_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "https://your-store.example.com".to_string(),
            headless: false,
            browser_timeout_ms: 30_000,
            verify_timeout_ms: 5_000,
            screenshots_dir: PathBuf::from("screenshots"),
        }
    }
}

impl Settings {
    /// Read settings from the environment, with defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("STOREFRONT_URL").unwrap_or(defaults.base_url),
            headless: std::env::var("HEADLESS_MODE")
                .map(|v| v.to_lowercase() == "true")
                .unwrap_or(defaults.headless),
            browser_timeout_ms: std::env::var("BROWSER_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.browser_timeout_ms),
            verify_timeout_ms: defaults.verify_timeout_ms,
            screenshots_dir: std::env::var("SCREENSHOTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.screenshots_dir),
        }
    }
}

/// Selector vocabulary for the store under test.
///
/// Every list is ordered by preference; the executor tries candidates
/// front to back. Defaults fit a stock Shopify theme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorefrontProfile {
    /// Search inputs, filled and submitted with Enter.
    #[serde(default = "default_search_inputs")]
    pub search_inputs: Vec<String>,

    /// Add-to-cart buttons on a product page.
    #[serde(default = "default_add_to_cart")]
    pub add_to_cart: Vec<String>,

    /// Links or buttons that open the cart.
    #[serde(default = "default_cart_links")]
    pub cart_links: Vec<String>,

    /// Checkout buttons in the cart.
    #[serde(default = "default_checkout")]
    pub checkout: Vec<String>,

    /// Variant dropdown templates; `{type}` is replaced with the
    /// lowercased variant type (see [`StorefrontProfile::variant_candidates`]).
    #[serde(default = "default_variant_selects")]
    pub variant_selects: Vec<String>,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn default_search_inputs() -> Vec<String> {
    strings(&[
        r#"input[type="search"]"#,
        r#"input[name="q"]"#,
        r#"input[placeholder*="Search"]"#,
        ".search-input",
        "#search",
    ])
}

fn default_add_to_cart() -> Vec<String> {
    strings(&[
        r#"button[name="add"]"#,
        r#"button[type="submit"][name="add"]"#,
        ".add-to-cart",
        r#"[data-action="add-to-cart"]"#,
        r#"button:has-text("Add to Cart")"#,
        r#"button:has-text("Add to cart")"#,
    ])
}

fn default_cart_links() -> Vec<String> {
    strings(&[
        r#"a[href="/cart"]"#,
        r#"a[href*="cart"]"#,
        ".cart-link",
        r#"[data-action="open-cart"]"#,
    ])
}

fn default_checkout() -> Vec<String> {
    strings(&[
        r#"button[name="checkout"]"#,
        r#"a[href="/checkout"]"#,
        ".checkout-button",
        r#"button:has-text("Checkout")"#,
        r#"button:has-text("Check out")"#,
    ])
}

fn default_variant_selects() -> Vec<String> {
    strings(&[r#"select[name*="{type}"]"#, "[data-variant-{type}]"])
}

impl Default for StorefrontProfile {
    fn default() -> Self {
        Self {
            search_inputs: default_search_inputs(),
            add_to_cart: default_add_to_cart(),
            cart_links: default_cart_links(),
            checkout: default_checkout(),
            variant_selects: default_variant_selects(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error in {file}: {error}")]
    Yaml {
        file: String,
        error: serde_yaml::Error,
    },
}

impl StorefrontProfile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let profile: StorefrontProfile =
            serde_yaml::from_str(&content).map_err(|e| ProfileError::Yaml {
                file: path.display().to_string(),
                error: e,
            })?;
        Ok(profile)
    }

    /// Concrete candidates for a variant picker, e.g. type `"Size"` gives
    /// `select[name*="size"]` and `[data-variant-size]`.
    pub fn variant_candidates(&self, variant_type: &str) -> Vec<String> {
        let variant_type = variant_type.to_lowercase();
        self.variant_selects
            .iter()
            .map(|template| template.replace("{type}", &variant_type))
            .collect()
    }
}
