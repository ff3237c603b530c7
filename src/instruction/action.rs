//! Typed browser actions
//!
//! The action vocabulary is a closed set: every test step the parser can
//! produce is one of the variants below, each carrying exactly the fields
//! that step needs. The executor dispatches on the variant, so a
//! missing-parameter mistake is a compile error rather than a runtime check.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One step of a storefront test.
///
/// Produced by the instruction parsers (or constructed directly by callers
/// that want to skip natural language) and consumed once by the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Navigate to a URL. The literal value `homepage` resolves to the
    /// configured storefront base URL at execution time.
    Navigate { url: String },
    /// Search the storefront for a product term.
    Search { term: String },
    /// Click the element matching a CSS selector.
    Click { selector: String },
    /// Fill an input field.
    Fill { selector: String, text: String },
    /// Capture a screenshot, optionally under a given name.
    Screenshot { name: Option<String> },
    /// Add the current product to the cart.
    AddToCart,
    /// Open the shopping cart page.
    GoToCart,
    /// Proceed from the cart to checkout.
    Checkout,
    /// Pick a product variant such as a size or color.
    SelectVariant {
        #[serde(rename = "type")]
        variant_type: String,
        value: String,
    },
    /// Assert that an element's text contains a substring.
    VerifyText { selector: String, text: String },
    /// Assert that an element exists on the page.
    VerifyElement { selector: String },
    /// Assert that the current URL contains a substring.
    VerifyUrl { url: String },
}

/// Fieldless tag for an [`Action`] variant, used in outcome records and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Navigate,
    Search,
    Click,
    Fill,
    Screenshot,
    AddToCart,
    GoToCart,
    Checkout,
    SelectVariant,
    VerifyText,
    VerifyElement,
    VerifyUrl,
}

impl ActionKind {
    /// Wire name of the kind, matching the parser/LLM vocabulary.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Navigate => "navigate",
            ActionKind::Search => "search",
            ActionKind::Click => "click",
            ActionKind::Fill => "fill",
            ActionKind::Screenshot => "screenshot",
            ActionKind::AddToCart => "add_to_cart",
            ActionKind::GoToCart => "go_to_cart",
            ActionKind::Checkout => "checkout",
            ActionKind::SelectVariant => "select_variant",
            ActionKind::VerifyText => "verify_text",
            ActionKind::VerifyElement => "verify_element",
            ActionKind::VerifyUrl => "verify_url",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = ActionDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "navigate" => Ok(ActionKind::Navigate),
            "search" => Ok(ActionKind::Search),
            "click" => Ok(ActionKind::Click),
            "fill" => Ok(ActionKind::Fill),
            "screenshot" => Ok(ActionKind::Screenshot),
            "add_to_cart" => Ok(ActionKind::AddToCart),
            "go_to_cart" => Ok(ActionKind::GoToCart),
            "checkout" => Ok(ActionKind::Checkout),
            "select_variant" => Ok(ActionKind::SelectVariant),
            "verify_text" => Ok(ActionKind::VerifyText),
            "verify_element" => Ok(ActionKind::VerifyElement),
            "verify_url" => Ok(ActionKind::VerifyUrl),
            other => Err(ActionDecodeError::UnknownKind(other.to_string())),
        }
    }
}

/// Errors converting loosely-typed action data (e.g. an LLM response) into
/// a typed [`Action`].
#[derive(Debug, thiserror::Error)]
pub enum ActionDecodeError {
    #[error("Unknown action type: {0}")]
    UnknownKind(String),

    #[error("Missing required parameter '{parameter}' for {kind}")]
    MissingParameter {
        kind: ActionKind,
        parameter: &'static str,
    },
}

impl Action {
    /// The fieldless kind tag for this action.
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Navigate { .. } => ActionKind::Navigate,
            Action::Search { .. } => ActionKind::Search,
            Action::Click { .. } => ActionKind::Click,
            Action::Fill { .. } => ActionKind::Fill,
            Action::Screenshot { .. } => ActionKind::Screenshot,
            Action::AddToCart => ActionKind::AddToCart,
            Action::GoToCart => ActionKind::GoToCart,
            Action::Checkout => ActionKind::Checkout,
            Action::SelectVariant { .. } => ActionKind::SelectVariant,
            Action::VerifyText { .. } => ActionKind::VerifyText,
            Action::VerifyElement { .. } => ActionKind::VerifyElement,
            Action::VerifyUrl { .. } => ActionKind::VerifyUrl,
        }
    }

    /// Human-readable description used in logs and printed reports.
    pub fn label(&self) -> String {
        match self {
            Action::Navigate { url } if url == "homepage" => "Navigate to homepage".to_string(),
            Action::Navigate { url } => format!("Navigate to {url}"),
            Action::Search { term } => format!("Search for {term}"),
            Action::Click { selector } => format!("Click {selector}"),
            Action::Fill { selector, .. } => format!("Fill {selector}"),
            Action::Screenshot { name: Some(name) } => format!("Take screenshot '{name}'"),
            Action::Screenshot { name: None } => "Take screenshot".to_string(),
            Action::AddToCart => "Add product to cart".to_string(),
            Action::GoToCart => "Navigate to cart".to_string(),
            Action::Checkout => "Proceed to checkout".to_string(),
            Action::SelectVariant { variant_type, value } => {
                format!("Select {variant_type}: {value}")
            }
            Action::VerifyText { text, .. } => format!("Verify text: {text}"),
            Action::VerifyElement { selector } => format!("Verify element {selector}"),
            Action::VerifyUrl { url } => format!("Verify URL contains {url}"),
        }
    }

    /// Build an action from a kind name and a loose parameter map.
    ///
    /// This is the decode path for service-backed parsing, where the action
    /// arrives as `{"action_type": ..., "parameters": {...}}` JSON. Unknown
    /// kinds and missing required parameters are rejected.
    pub fn from_parts(kind: &str, parameters: &Map<String, Value>) -> Result<Self, ActionDecodeError> {
        let kind: ActionKind = kind.parse()?;

        fn required(
            parameters: &Map<String, Value>,
            kind: ActionKind,
            key: &'static str,
        ) -> Result<String, ActionDecodeError> {
            parameters
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or(ActionDecodeError::MissingParameter { kind, parameter: key })
        }

        let action = match kind {
            ActionKind::Navigate => Action::Navigate {
                url: required(parameters, kind, "url")?,
            },
            ActionKind::Search => Action::Search {
                term: required(parameters, kind, "term")?,
            },
            ActionKind::Click => Action::Click {
                selector: required(parameters, kind, "selector")?,
            },
            ActionKind::Fill => Action::Fill {
                selector: required(parameters, kind, "selector")?,
                text: required(parameters, kind, "text")?,
            },
            ActionKind::Screenshot => Action::Screenshot {
                name: parameters
                    .get("name")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            ActionKind::AddToCart => Action::AddToCart,
            ActionKind::GoToCart => Action::GoToCart,
            ActionKind::Checkout => Action::Checkout,
            ActionKind::SelectVariant => Action::SelectVariant {
                variant_type: required(parameters, kind, "type")?,
                value: required(parameters, kind, "value")?,
            },
            ActionKind::VerifyText => Action::VerifyText {
                selector: required(parameters, kind, "selector")?,
                text: required(parameters, kind, "text")?,
            },
            ActionKind::VerifyElement => Action::VerifyElement {
                selector: required(parameters, kind, "selector")?,
            },
            ActionKind::VerifyUrl => Action::VerifyUrl {
                url: required(parameters, kind, "url")?,
            },
        };

        Ok(action)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_kind_round_trip() {
        let kinds = [
            ActionKind::Navigate,
            ActionKind::Search,
            ActionKind::Click,
            ActionKind::Fill,
            ActionKind::Screenshot,
            ActionKind::AddToCart,
            ActionKind::GoToCart,
            ActionKind::Checkout,
            ActionKind::SelectVariant,
            ActionKind::VerifyText,
            ActionKind::VerifyElement,
            ActionKind::VerifyUrl,
        ];
        for kind in kinds {
            assert_eq!(kind.as_str().parse::<ActionKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let err = "hover".parse::<ActionKind>().unwrap_err();
        assert!(err.to_string().contains("Unknown action type"));
    }

    #[test]
    fn test_labels() {
        assert_eq!(
            Action::Navigate {
                url: "homepage".into()
            }
            .label(),
            "Navigate to homepage"
        );
        assert_eq!(
            Action::Search {
                term: "laptop".into()
            }
            .label(),
            "Search for laptop"
        );
        assert_eq!(Action::GoToCart.label(), "Navigate to cart");
        assert_eq!(Action::Checkout.label(), "Proceed to checkout");
        assert_eq!(
            Action::SelectVariant {
                variant_type: "Size".into(),
                value: "m".into()
            }
            .label(),
            "Select Size: m"
        );
        assert_eq!(Action::Screenshot { name: None }.label(), "Take screenshot");
    }

    #[test]
    fn test_from_parts_search() {
        let action =
            Action::from_parts("search", &params(json!({ "term": "laptop" }))).unwrap();
        assert_eq!(
            action,
            Action::Search {
                term: "laptop".into()
            }
        );
    }

    #[test]
    fn test_from_parts_missing_parameter() {
        let err = Action::from_parts("fill", &params(json!({ "selector": "#email" })))
            .unwrap_err();
        assert!(err.to_string().contains("Missing required parameter 'text'"));
    }

    #[test]
    fn test_from_parts_no_parameters_needed() {
        let action = Action::from_parts("add_to_cart", &Map::new()).unwrap();
        assert_eq!(action, Action::AddToCart);
    }

    #[test]
    fn test_from_parts_variant_type_key() {
        let action = Action::from_parts(
            "select_variant",
            &params(json!({ "type": "Size", "value": "medium" })),
        )
        .unwrap();
        assert_eq!(
            action,
            Action::SelectVariant {
                variant_type: "Size".into(),
                value: "medium".into()
            }
        );
    }

    #[test]
    fn test_serde_tagged_shape() {
        let action = Action::SelectVariant {
            variant_type: "Size".into(),
            value: "medium".into(),
        };
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(
            value,
            json!({ "kind": "select_variant", "type": "Size", "value": "medium" })
        );

        let back: Action = serde_json::from_value(value).unwrap();
        assert_eq!(back, action);
    }
}
