//! Result and error types for Dealerscope.

use std::path::PathBuf;

use thiserror::Error;

use crate::ladder::StepFailure;

/// Result type for Dealerscope operations
pub type ScopeResult<T> = Result<T, ScopeError>;

/// Errors that can occur in Dealerscope
#[derive(Debug, Error)]
pub enum ScopeError {
    /// Symbolic `(page, element)` pair is absent from the registry
    #[error("Locator not found: {page}.{element}")]
    LocatorNotFound {
        /// Page name
        page: String,
        /// Element key
        element: String,
    },

    /// Expected-text message is absent from the `text_messages` namespace
    #[error("Text message not found: {page}.{key}")]
    TextMessageNotFound {
        /// Page name
        page: String,
        /// Message key
        key: String,
    },

    /// Locator entry names a selector strategy that is not supported
    #[error("Unsupported locator strategy '{strategy}' for {page}.{element}")]
    UnsupportedStrategy {
        /// Page name
        page: String,
        /// Element key
        element: String,
        /// Strategy as written in the locator document
        strategy: String,
    },

    /// Configuration document could not be used
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Every fallback strategy failed for an interaction
    #[error("{action} on {target} failed after {} strategies", failures.len())]
    InteractionExhausted {
        /// Action that was attempted (click, type, read text, scroll)
        action: String,
        /// `page.element` that was targeted
        target: String,
        /// Failure of each strategy, in the order tried
        failures: Vec<StepFailure>,
        /// Screenshot captured after the failure, if any
        screenshot: Option<PathBuf>,
    },

    /// Another element received the pointer event
    #[error("Element click intercepted: {message}")]
    Intercepted {
        /// Error message
        message: String,
    },

    /// Element present but not interactable (hidden, disabled, animating)
    #[error("Element not interactable: {message}")]
    NotInteractable {
        /// Error message
        message: String,
    },

    /// Element handle no longer attached to the document
    #[error("Stale element reference: {id}")]
    StaleElement {
        /// Element handle id
        id: String,
    },

    /// Script evaluation error
    #[error("Script evaluation failed: {message}")]
    Script {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Screenshot error
    #[error("Screenshot failed: {message}")]
    Screenshot {
        /// Error message
        message: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Generic driver failure
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Operation timed out
    #[error("Operation timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScopeError {
    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Create a script error
    #[must_use]
    pub fn script(message: impl Into<String>) -> Self {
        Self::Script {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Errors that mean the test itself is broken rather than the page
    /// being slow or obscured. A fallback ladder stops on these.
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::LocatorNotFound { .. }
                | Self::TextMessageNotFound { .. }
                | Self::UnsupportedStrategy { .. }
                | Self::Config { .. }
        )
    }

    /// Errors raised while the element was present but could not be acted on
    #[must_use]
    pub const fn is_interaction_blocked(&self) -> bool {
        matches!(
            self,
            Self::Intercepted { .. } | Self::NotInteractable { .. } | Self::StaleElement { .. }
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_classification() {
        let miss = ScopeError::LocatorNotFound {
            page: "login_page".into(),
            element: "nope".into(),
        };
        assert!(miss.is_structural());
        assert!(!miss.is_interaction_blocked());

        let unsupported = ScopeError::UnsupportedStrategy {
            page: "p".into(),
            element: "e".into(),
            strategy: "link_text".into(),
        };
        assert!(unsupported.is_structural());

        let intercepted = ScopeError::Intercepted {
            message: "div.ant-modal-mask".into(),
        };
        assert!(!intercepted.is_structural());
        assert!(intercepted.is_interaction_blocked());
    }

    #[test]
    fn test_display_messages() {
        let miss = ScopeError::LocatorNotFound {
            page: "login_page".into(),
            element: "nonexistent_key".into(),
        };
        assert_eq!(
            miss.to_string(),
            "Locator not found: login_page.nonexistent_key"
        );

        let exhausted = ScopeError::InteractionExhausted {
            action: "click".into(),
            target: "login_page.sign_in_button".into(),
            failures: vec![],
            screenshot: None,
        };
        assert_eq!(
            exhausted.to_string(),
            "click on login_page.sign_in_button failed after 0 strategies"
        );
    }

    #[test]
    fn test_io_conversion() {
        let err: ScopeError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, ScopeError::Io(_)));
        assert!(!err.is_structural());
    }
}
