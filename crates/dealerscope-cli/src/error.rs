//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Page not present in the locator file
    #[error("Unknown page '{page}'")]
    UnknownPage {
        /// Page name
        page: String,
    },

    /// Locator file failed the health check
    #[error("Locator check failed: {problems} problem(s)")]
    CheckFailed {
        /// Number of problems found
        problems: usize,
    },

    /// Settings failed validation
    #[error("Invalid settings: {0}")]
    Settings(dealerscope::ScopeError),

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON output error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Library error
    #[error("{0}")]
    Scope(#[from] dealerscope::ScopeError),
}

impl CliError {
    /// Create an unknown page error
    #[must_use]
    pub fn unknown_page(page: impl Into<String>) -> Self {
        Self::UnknownPage { page: page.into() }
    }
}
