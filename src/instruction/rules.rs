//! Rule-based instruction parsing
//!
//! Turns free-form test instructions into [`Action`] sequences with ordered
//! keyword rules, no model inference. The instruction block is split into
//! sentence-like segments and each segment is run through the rule table;
//! the first rule whose trigger matches builds the action for that segment.
//! Segments that match nothing are dropped silently, so narrative lines like
//! "Test the purchase flow:" simply contribute no actions.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::action::Action;
use super::InstructionParser;

static SEARCH_TERM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"search (?:for )?["']?([^"']+)["']?"#).unwrap());

static CLICK_TARGET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"click (?:on |the )?["']?([^"']+)["']?"#).unwrap());

static VARIANT_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?:select|choose) (?:size |color )?["']?([^"']+)["']?"#).unwrap());

static URL_FRAGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"contains? ["']?([^"']+)["']?"#).unwrap());

static QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"["']([^"']+)["']"#).unwrap());

/// One entry of the rule table: a trigger predicate over the lowercased
/// segment and a builder that turns the segment into an action.
///
/// The builder receives both the lowercased segment (keyword matching and
/// most captures work on it) and the original segment (text verification
/// keeps the author's casing). A builder may still decline by returning
/// `None`, e.g. a navigation phrase with no recognizable destination.
struct Rule {
    trigger: fn(&str) -> bool,
    build: fn(&str, &str) -> Option<Action>,
}

/// Ordered rule table. Evaluation order is load-bearing: the first rule
/// whose trigger matches wins the segment.
const RULES: &[Rule] = &[
    // Navigation runs first: "go to the search page" must not fall through
    // to the search rule and capture "page" as a term.
    Rule {
        trigger: is_navigate,
        build: build_navigate,
    },
    // Search next; captures the quoted or trailing term after "search for".
    Rule {
        trigger: is_search,
        build: build_search,
    },
    // Explicit cart-add phrases, ahead of checkout and click.
    Rule {
        trigger: is_add_to_cart,
        build: build_add_to_cart,
    },
    // Checkout before click so "click the checkout button" checks out.
    Rule {
        trigger: is_checkout,
        build: build_checkout,
    },
    // Generic click, after the storefront-specific rules above.
    Rule {
        trigger: is_click,
        build: build_click,
    },
    // Variant selection after click so "click the select box" stays a click.
    Rule {
        trigger: is_select,
        build: build_select_variant,
    },
    // Verifications; within the rule, "url" wins over "element" over text.
    Rule {
        trigger: is_verify,
        build: build_verify,
    },
    // Screenshot last so verify segments mentioning "capture" stay checks.
    Rule {
        trigger: is_screenshot,
        build: build_screenshot,
    },
];

fn is_navigate(s: &str) -> bool {
    ["go to", "navigate to", "visit", "open"]
        .iter()
        .any(|w| s.contains(w))
}

fn is_search(s: &str) -> bool {
    s.contains("search")
}

fn is_add_to_cart(s: &str) -> bool {
    s.contains("add to cart") || s.contains("add product")
}

fn is_checkout(s: &str) -> bool {
    s.contains("checkout")
}

fn is_click(s: &str) -> bool {
    s.contains("click")
}

fn is_select(s: &str) -> bool {
    s.contains("select") || s.contains("choose")
}

fn is_verify(s: &str) -> bool {
    ["verify", "check", "assert"].iter().any(|w| s.contains(w))
}

fn is_screenshot(s: &str) -> bool {
    s.contains("screenshot") || s.contains("capture")
}

fn build_navigate(lower: &str, _original: &str) -> Option<Action> {
    if lower.contains("homepage") || lower.contains("home page") {
        Some(Action::Navigate {
            url: "homepage".to_string(),
        })
    } else if lower.contains("cart") {
        Some(Action::GoToCart)
    } else {
        // Bare destinations ("open the product page") have no reliable URL;
        // the service-backed parser handles those.
        None
    }
}

fn build_search(lower: &str, _original: &str) -> Option<Action> {
    let term = SEARCH_TERM.captures(lower)?.get(1)?.as_str().trim();
    if term.is_empty() {
        return None;
    }
    Some(Action::Search {
        term: term.to_string(),
    })
}

fn build_add_to_cart(_lower: &str, _original: &str) -> Option<Action> {
    Some(Action::AddToCart)
}

fn build_checkout(_lower: &str, _original: &str) -> Option<Action> {
    Some(Action::Checkout)
}

fn build_click(lower: &str, _original: &str) -> Option<Action> {
    let target = CLICK_TARGET.captures(lower)?.get(1)?.as_str().trim();
    if target.is_empty() {
        return None;
    }
    Some(Action::Click {
        selector: format!(r#"button:has-text("{target}")"#),
    })
}

fn build_select_variant(lower: &str, _original: &str) -> Option<Action> {
    let value = VARIANT_VALUE.captures(lower)?.get(1)?.as_str().trim();
    if value.is_empty() {
        return None;
    }
    let variant_type = if lower.contains("size") { "Size" } else { "Option" };
    Some(Action::SelectVariant {
        variant_type: variant_type.to_string(),
        value: value.to_string(),
    })
}

fn build_verify(lower: &str, original: &str) -> Option<Action> {
    if lower.contains("url") {
        let url = URL_FRAGMENT.captures(lower)?.get(1)?.as_str().trim();
        return Some(Action::VerifyUrl {
            url: url.to_string(),
        });
    }
    if lower.contains("element") {
        // Selectors are case-sensitive, so capture from the original text.
        let selector = QUOTED.captures(original)?.get(1)?.as_str();
        return Some(Action::VerifyElement {
            selector: selector.to_string(),
        });
    }
    if lower.contains("page") || lower.contains("text") || lower.contains("contains") {
        let text = QUOTED.captures(original)?.get(1)?.as_str();
        return Some(Action::VerifyText {
            selector: "body".to_string(),
            text: text.to_string(),
        });
    }
    None
}

fn build_screenshot(_lower: &str, _original: &str) -> Option<Action> {
    Some(Action::Screenshot { name: None })
}

/// Splits an instruction block into steps. Sentence punctuation and
/// newlines end a segment, but not inside a quoted span, so selectors like
/// '.cart-item' and decimal values survive segmentation intact. A
/// numbered-list marker ("1.", "2.", ...) needs no special case: the digit
/// becomes its own segment or trailing junk and matches no rule.
fn segments(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;

    for (idx, c) in text.char_indices() {
        match quote {
            Some(open) if c == open => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '.' | '!' | '?' | '\n' => {
                    parts.push(&text[start..idx]);
                    start = idx + c.len_utf8();
                }
                _ => {}
            },
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Keyword/regex instruction parser. Stateless, so parsing the same text
/// twice always yields the same sequence.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleParser;

impl RuleParser {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous parse used both by the trait impl and as the fallback
    /// target of the service-backed parser.
    pub fn parse_sync(&self, instruction: &str) -> Vec<Action> {
        let mut actions = Vec::new();

        for step in segments(instruction) {
            let step = step.trim();
            if step.is_empty() {
                continue;
            }
            let lower = step.to_lowercase();

            for rule in RULES {
                if !(rule.trigger)(&lower) {
                    continue;
                }
                if let Some(action) = (rule.build)(&lower, step) {
                    actions.push(action);
                }
                // First matching rule owns the segment even if its builder
                // declined, mirroring a first-match-wins keyword chain.
                break;
            }
        }

        debug!(count = actions.len(), "Parsed actions with rules");
        actions
    }
}

#[async_trait::async_trait]
impl InstructionParser for RuleParser {
    async fn parse(&self, instruction: &str) -> Vec<Action> {
        self.parse_sync(instruction)
    }
}
