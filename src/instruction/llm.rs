//! Model-backed instruction parsing
//!
//! Sends the whole instruction block to a hosted completion service and
//! decodes its JSON answer into typed actions. The block is not segmented
//! first; the model sees the full text, which is what lets it handle
//! phrasing the keyword rules cannot. Any failure on this path, from the
//! HTTP call to an unparseable response, falls back to [`RuleParser`] so
//! parsing itself never errors.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{json, Map, Value};
use tracing::{error, info, warn};

use super::action::Action;
use super::rules::RuleParser;
use super::InstructionParser;

const ANTHROPIC_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

const MAX_TOKENS: u32 = 1024;

const SYSTEM_PROMPT: &str = r#"You are a QA test automation assistant. Convert natural language test instructions into structured actions.

Available action types:
- navigate: Navigate to a URL or homepage
- search: Search for a product
- click: Click an element (requires selector)
- fill: Fill an input field (requires selector and text)
- add_to_cart: Add product to cart
- go_to_cart: Navigate to shopping cart
- checkout: Proceed to checkout
- verify_text: Verify text is present (requires selector and text)
- verify_element: Verify element exists (requires selector)
- verify_url: Verify URL contains text (requires url part)
- screenshot: Take a screenshot
- select_variant: Select product variant (requires type and value)

Respond with a JSON array of actions. Each action should have:
{
  "action_type": "action_name",
  "parameters": {key: value},
  "description": "human readable description"
}

Examples:
Input: "Go to homepage and search for laptop"
Output: [
  {"action_type": "navigate", "parameters": {"url": "homepage"}, "description": "Navigate to homepage"},
  {"action_type": "search", "parameters": {"term": "laptop"}, "description": "Search for laptop"}
]

Input: "Add to cart and verify cart has items"
Output: [
  {"action_type": "add_to_cart", "parameters": {}, "description": "Add product to cart"},
  {"action_type": "go_to_cart", "parameters": {}, "description": "Navigate to cart"},
  {"action_type": "verify_element", "parameters": {"selector": ".cart-item"}, "description": "Verify cart contains items"}
]

Only respond with the JSON array, no other text."#;

/// Models wrap the array in prose more often than not; pull out the first
/// bracketed object list before handing it to serde.
static JSON_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[\s*\{.*\}\s*\]").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Anthropic,
    OpenAi,
}

impl LlmProvider {
    pub fn name(self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "anthropic",
            LlmProvider::OpenAi => "openai",
        }
    }

    fn default_model(self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "claude-3-5-sonnet-20241022",
            LlmProvider::OpenAi => "gpt-4o-mini",
        }
    }
}

/// Credentials and model choice for the completion service.
#[derive(Clone)]
pub struct LlmConfig {
    provider: LlmProvider,
    api_key: String,
    model: String,
}

impl LlmConfig {
    pub fn new(provider: LlmProvider, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            model: provider.default_model().to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Pick a provider from the environment. `ANTHROPIC_API_KEY` wins over
    /// `OPENAI_API_KEY`; no key means no model-backed parsing.
    pub fn from_env() -> Option<Self> {
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            if !key.is_empty() {
                return Some(Self::new(LlmProvider::Anthropic, key));
            }
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.is_empty() {
                return Some(Self::new(LlmProvider::OpenAi, key));
            }
        }
        None
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Service returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Response contained no text content")]
    EmptyResponse,

    #[error("Response was not a JSON action array: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Instruction parser backed by a completion service, with [`RuleParser`]
/// as the always-available fallback.
pub struct LlmParser {
    client: reqwest::Client,
    config: LlmConfig,
    fallback: RuleParser,
}

impl LlmParser {
    pub fn new(config: LlmConfig) -> Self {
        info!(provider = config.provider.name(), model = %config.model, "Using LLM-backed parsing");
        Self {
            client: reqwest::Client::new(),
            config,
            fallback: RuleParser::new(),
        }
    }

    /// Build from the environment, or `None` when no API key is configured.
    pub fn from_env() -> Option<Self> {
        LlmConfig::from_env().map(Self::new)
    }

    async fn complete(&self, instruction: &str) -> Result<String, LlmError> {
        match self.config.provider {
            LlmProvider::Anthropic => self.complete_anthropic(instruction).await,
            LlmProvider::OpenAi => self.complete_openai(instruction).await,
        }
    }

    async fn complete_anthropic(&self, instruction: &str) -> Result<String, LlmError> {
        let body = json!({
            "model": self.config.model,
            "max_tokens": MAX_TOKENS,
            "temperature": 0,
            "system": SYSTEM_PROMPT,
            "messages": [{ "role": "user", "content": instruction }],
        });

        let resp = self
            .client
            .post(ANTHROPIC_ENDPOINT)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(LlmError::Status {
                status: resp.status(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        let payload: Value = resp.json().await?;
        let blocks = payload["content"].as_array().ok_or(LlmError::EmptyResponse)?;
        let text: String = blocks
            .iter()
            .filter(|b| b["type"] == "text")
            .filter_map(|b| b["text"].as_str())
            .collect();
        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }

    async fn complete_openai(&self, instruction: &str) -> Result<String, LlmError> {
        let body = json!({
            "model": self.config.model,
            "max_tokens": MAX_TOKENS,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": instruction },
            ],
        });

        let resp = self
            .client
            .post(OPENAI_ENDPOINT)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(LlmError::Status {
                status: resp.status(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        let payload: Value = resp.json().await?;
        let text = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(LlmError::EmptyResponse)?;
        Ok(text.to_string())
    }

    /// Decode the model's answer into actions. Entries that fail to decode
    /// are skipped with a warning rather than failing the whole response.
    fn decode_actions(response: &str) -> Result<Vec<Action>, LlmError> {
        let json_str = JSON_ARRAY
            .find(response)
            .map(|m| m.as_str())
            .unwrap_or(response);
        let entries: Vec<Value> = serde_json::from_str(json_str.trim())?;

        let empty = Map::new();
        let mut actions = Vec::new();
        for entry in &entries {
            let kind = match entry["action_type"].as_str() {
                Some(kind) => kind,
                None => {
                    warn!(data = %entry, "Action entry has no action_type");
                    continue;
                }
            };
            let parameters = entry["parameters"].as_object().unwrap_or(&empty);
            match Action::from_parts(kind, parameters) {
                Ok(action) => actions.push(action),
                Err(e) => warn!(error = %e, data = %entry, "Failed to decode action"),
            }
        }
        Ok(actions)
    }

    async fn parse_with_service(&self, instruction: &str) -> Result<Vec<Action>, LlmError> {
        let response = self.complete(instruction).await?;
        let actions = Self::decode_actions(&response)?;
        info!(
            count = actions.len(),
            provider = self.config.provider.name(),
            "Parsed actions with LLM"
        );
        Ok(actions)
    }
}

#[async_trait::async_trait]
impl InstructionParser for LlmParser {
    async fn parse(&self, instruction: &str) -> Vec<Action> {
        match self.parse_with_service(instruction).await {
            Ok(actions) => actions,
            Err(e) => {
                error!(error = %e, "LLM parsing failed, falling back to rules");
                self.fallback.parse_sync(instruction)
            }
        }
    }
}
