//! Execution error types

use crate::page::PageError;

/// Why a single action failed.
///
/// Most failures stay inside the run: the action is recorded as errored
/// and execution moves on. Only a fatal [`PageError`] (driver gone) makes
/// the executor return `Err` and aborts the remaining actions.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("Element not found: {}", tried.join(", "))]
    ElementNotFound { tried: Vec<String> },

    #[error("{0}")]
    VerificationFailed(String),

    #[error(transparent)]
    Page(#[from] PageError),
}

impl ActionError {
    pub fn is_fatal(&self) -> bool {
        match self {
            ActionError::Page(e) => e.is_fatal(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_not_found_lists_candidates() {
        let err = ActionError::ElementNotFound {
            tried: vec!["button[name=\"add\"]".to_string(), ".add-to-cart".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Element not found: button[name=\"add\"], .add-to-cart"
        );
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_fatal_follows_page_error() {
        assert!(ActionError::Page(PageError::Disconnected).is_fatal());
        assert!(!ActionError::Page(PageError::DriverError("timeout".into())).is_fatal());
    }
}
