//! Output formatting

use console::style;
use dealerscope::{LoadSource, LocatorEntry};
use serde::Serialize;

use crate::commands::ColorArg;
use crate::error::CliResult;

/// Writes command results as text or JSON
#[derive(Debug, Clone, Copy)]
pub struct Printer {
    /// Emit JSON instead of text
    pub json: bool,
    /// Suppress informational lines
    pub quiet: bool,
}

impl Printer {
    /// Create a new printer
    #[must_use]
    pub const fn new(json: bool, quiet: bool) -> Self {
        Self { json, quiet }
    }

    /// Print a value as pretty JSON
    pub fn emit<T: Serialize>(&self, value: &T) -> CliResult<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Print a result line; shown even in quiet mode
    pub fn data(&self, line: impl std::fmt::Display) {
        println!("{line}");
    }

    /// Print a section heading
    pub fn heading(&self, title: &str) {
        if !self.quiet {
            println!("{}", style(title).bold());
        }
    }

    /// Print a success line
    pub fn ok(&self, message: &str) {
        if !self.quiet {
            println!("{} {message}", style("✓").green());
        }
    }

    /// Print a problem line
    pub fn problem(&self, message: &str) {
        println!("{} {message}", style("✗").red());
    }
}

/// Apply the color choice to both output streams
pub fn apply_color(choice: ColorArg) {
    match choice {
        ColorArg::Auto => {}
        ColorArg::Always => {
            console::set_colors_enabled(true);
            console::set_colors_enabled_stderr(true);
        }
        ColorArg::Never => {
            console::set_colors_enabled(false);
            console::set_colors_enabled_stderr(false);
        }
    }
}

/// Page with its element count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRow {
    /// Page name
    pub page: String,
    /// Number of elements
    pub elements: usize,
}

/// One element entry of a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElementRow {
    /// Element key
    pub element: String,
    /// Strategy as written or parsed
    pub strategy: String,
    /// Selector text
    pub value: String,
    /// Whether the strategy is supported
    pub valid: bool,
}

impl ElementRow {
    /// Row for a registry entry
    #[must_use]
    pub fn new(element: &str, entry: &LocatorEntry) -> Self {
        match entry {
            LocatorEntry::Valid(selector) => Self {
                element: element.to_string(),
                strategy: selector.strategy.as_str().to_string(),
                value: selector.value.clone(),
                valid: true,
            },
            LocatorEntry::Invalid { strategy, value } => Self {
                element: element.to_string(),
                strategy: strategy.clone(),
                value: value.clone(),
                valid: false,
            },
        }
    }
}

/// Resolved selector for a key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRow {
    /// Page name
    pub page: String,
    /// Element key
    pub element: String,
    /// Strategy name
    pub strategy: String,
    /// Selector text
    pub value: String,
}

/// Unsupported entry found by `check`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidRow {
    /// Page name
    pub page: String,
    /// Element key
    pub element: String,
    /// Strategy as written
    pub strategy: String,
}

/// Result of `check`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    /// Where the locators came from
    pub source: String,
    /// Whether the built-in defaults are in use
    pub defaults: bool,
    /// Number of pages
    pub pages: usize,
    /// Number of element entries
    pub elements: usize,
    /// Number of text messages
    pub text_messages: usize,
    /// Unsupported entries
    pub invalid: Vec<InvalidRow>,
}

impl CheckReport {
    /// Problems that make the check fail
    #[must_use]
    pub fn problems(&self) -> usize {
        self.invalid.len() + usize::from(self.defaults)
    }
}

/// Human description of a load source
#[must_use]
pub fn describe_source(source: &LoadSource) -> String {
    match source {
        LoadSource::File(path) => path.display().to_string(),
        LoadSource::Inline => "inline document".to_string(),
        LoadSource::Defaults { reason } => format!("built-in defaults ({reason})"),
    }
}

/// Presence and visibility of one inspected element
#[cfg(feature = "browser")]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectRow {
    /// Element key
    pub element: String,
    /// Found in the DOM
    pub present: bool,
    /// Rendered and visible
    pub visible: bool,
}
