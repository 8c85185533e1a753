//! Locator registry: `(page, element)` → [`Selector`], sourced from YAML.
//!
//! The document is a mapping of page name to element entries. An entry is
//! either a bare string (an XPath) or a mapping `{ by: <strategy>, value:
//! <selector> }`. Two top-level keys are reserved:
//!
//! - `text_messages`: `page → key → expected copy`, read with
//!   [`LocatorRegistry::resolve_text`]
//! - `common`: shared elements, resolved like any page but hidden from
//!   [`LocatorRegistry::list_pages`]
//!
//! ```yaml
//! login_page:
//!   sign_in_button: "//button[normalize-space()='Sign In']"
//!   email_field: { by: id, value: company-email }
//! common:
//!   toast: "//div[contains(@class,'ant-message')]"
//! text_messages:
//!   login_page:
//!     invalid_credentials: "Invalid email or password"
//! ```
//!
//! Loading never fails: a missing or malformed document yields the built-in
//! defaults so a broken config file does not abort a whole run. Lookups,
//! on the other hand, report misses as [`ScopeError::LocatorNotFound`].
//! In-memory edits ([`LocatorRegistry::add`], [`LocatorRegistry::update`])
//! are never written back.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::locator::{Selector, Strategy};
use crate::result::{ScopeError, ScopeResult};

/// Reserved namespace for expected-text messages
pub const TEXT_MESSAGES: &str = "text_messages";

/// Reserved namespace for elements shared across pages
pub const COMMON: &str = "common";

/// One element entry in the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatorEntry {
    /// Entry with a supported strategy
    Valid(Selector),
    /// Entry whose strategy is not supported; resolving it fails fast
    Invalid {
        /// Strategy as written
        strategy: String,
        /// Selector text as written
        value: String,
    },
}

/// Where the registry contents came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSource {
    /// Parsed from a file
    File(PathBuf),
    /// Parsed from an in-memory document
    Inline,
    /// Built-in defaults, with the reason the document was not used
    Defaults {
        /// Why the defaults were used
        reason: String,
    },
}

impl LoadSource {
    /// Whether the built-in defaults are in use
    #[must_use]
    pub const fn is_defaults(&self) -> bool {
        matches!(self, Self::Defaults { .. })
    }
}

/// An entry whose strategy could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidEntry {
    /// Page name
    pub page: String,
    /// Element key
    pub element: String,
    /// Strategy as written
    pub strategy: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Bare(String),
    Explicit { by: String, value: String },
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(default)]
    text_messages: Option<BTreeMap<String, BTreeMap<String, String>>>,
    #[serde(flatten)]
    pages: BTreeMap<String, Option<BTreeMap<String, Option<RawEntry>>>>,
}

/// Registry of all locator entries, keyed by page then element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorRegistry {
    pages: BTreeMap<String, BTreeMap<String, LocatorEntry>>,
    text_messages: BTreeMap<String, BTreeMap<String, String>>,
    source: LoadSource,
}

impl LocatorRegistry {
    /// Load from a YAML file, falling back to the built-in defaults when the
    /// file is missing or cannot be parsed.
    #[must_use]
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::from_path(path) {
            Ok(registry) => {
                info!(
                    path = %path.display(),
                    pages = registry.pages.len(),
                    elements = registry.len(),
                    "locators loaded"
                );
                registry
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "using built-in default locators");
                Self::defaults_because(e.to_string())
            }
        }
    }

    /// Strictly load from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_path(path: impl AsRef<Path>) -> ScopeResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let mut registry = Self::from_yaml_str(&text)?;
        registry.source = LoadSource::File(path.to_path_buf());
        Ok(registry)
    }

    /// Strictly parse an in-memory YAML document
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a page → element mapping
    pub fn from_yaml_str(yaml: &str) -> ScopeResult<Self> {
        let raw: RawDocument = serde_yaml_ng::from_str(yaml)?;

        let mut pages = BTreeMap::new();
        for (page, entries) in raw.pages {
            let mut elements = BTreeMap::new();
            for (element, entry) in entries.unwrap_or_default() {
                let Some(entry) = entry else {
                    warn!(page = %page, element = %element, "skipping locator without a value");
                    continue;
                };
                let (strategy, value) = match entry {
                    RawEntry::Bare(value) => (Strategy::XPath.as_str().to_string(), value),
                    RawEntry::Explicit { by, value } => (by, value),
                };
                if value.trim().is_empty() {
                    warn!(page = %page, element = %element, "skipping locator with empty selector");
                    continue;
                }
                let entry = match strategy.parse::<Strategy>() {
                    Ok(strategy) => LocatorEntry::Valid(Selector::new(strategy, value)),
                    Err(_) => {
                        warn!(
                            page = %page,
                            element = %element,
                            strategy = %strategy,
                            "locator uses an unsupported strategy"
                        );
                        LocatorEntry::Invalid { strategy, value }
                    }
                };
                let _ = elements.insert(element, entry);
            }
            let _ = pages.insert(page, elements);
        }

        Ok(Self {
            pages,
            text_messages: raw.text_messages.unwrap_or_default(),
            source: LoadSource::Inline,
        })
    }

    /// The built-in default locators: just enough of the login page to get
    /// past authentication.
    #[must_use]
    pub fn defaults() -> Self {
        Self::defaults_because("requested")
    }

    fn defaults_because(reason: impl Into<String>) -> Self {
        let login: BTreeMap<String, LocatorEntry> = [
            ("email_field", "//input[@id='company-email']"),
            (
                "password_field",
                "//span[contains(@class,'ant-input-password')]//input[@type='password']",
            ),
            ("terms_checkbox", "//input[@type='checkbox']"),
            ("sign_in_button", "//button[normalize-space()='Sign In']"),
            ("general_error", "//div[contains(@class, 'error')]"),
            ("loading_indicator", "//div[contains(@class, 'loading')]"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), LocatorEntry::Valid(Selector::xpath(v))))
        .collect();

        let mut pages = BTreeMap::new();
        let _ = pages.insert("login_page".to_string(), login);

        Self {
            pages,
            text_messages: BTreeMap::new(),
            source: LoadSource::Defaults {
                reason: reason.into(),
            },
        }
    }

    /// Resolve a symbolic pair to a concrete selector
    ///
    /// # Errors
    ///
    /// `LocatorNotFound` when the pair is absent, `UnsupportedStrategy` when
    /// the entry names a strategy this crate does not implement
    pub fn resolve(&self, page: &str, element: &str) -> ScopeResult<Selector> {
        match self.pages.get(page).and_then(|p| p.get(element)) {
            Some(LocatorEntry::Valid(selector)) => Ok(selector.clone()),
            Some(LocatorEntry::Invalid { strategy, .. }) => Err(ScopeError::UnsupportedStrategy {
                page: page.to_string(),
                element: element.to_string(),
                strategy: strategy.clone(),
            }),
            None => Err(ScopeError::LocatorNotFound {
                page: page.to_string(),
                element: element.to_string(),
            }),
        }
    }

    /// Resolve an expected-text message
    ///
    /// # Errors
    ///
    /// `TextMessageNotFound` when the message is absent
    pub fn resolve_text(&self, page: &str, key: &str) -> ScopeResult<&str> {
        self.text_messages
            .get(page)
            .and_then(|m| m.get(key))
            .map(String::as_str)
            .ok_or_else(|| ScopeError::TextMessageNotFound {
                page: page.to_string(),
                key: key.to_string(),
            })
    }

    /// Add or replace a locator in memory
    pub fn add(&mut self, page: impl Into<String>, element: impl Into<String>, selector: Selector) {
        let page = page.into();
        let element = element.into();
        debug!(page = %page, element = %element, selector = %selector, "locator added in memory");
        let _ = self
            .pages
            .entry(page)
            .or_default()
            .insert(element, LocatorEntry::Valid(selector));
    }

    /// Replace an existing locator in memory
    ///
    /// # Errors
    ///
    /// `LocatorNotFound` when the pair does not exist yet
    pub fn update(&mut self, page: &str, element: &str, selector: Selector) -> ScopeResult<()> {
        let slot = self
            .pages
            .get_mut(page)
            .and_then(|p| p.get_mut(element))
            .ok_or_else(|| ScopeError::LocatorNotFound {
                page: page.to_string(),
                element: element.to_string(),
            })?;
        info!(page, element, old = ?slot, new = %selector, "locator updated in memory");
        *slot = LocatorEntry::Valid(selector);
        Ok(())
    }

    /// Page names, excluding the reserved namespaces
    #[must_use]
    pub fn list_pages(&self) -> Vec<&str> {
        self.pages
            .keys()
            .map(String::as_str)
            .filter(|p| *p != COMMON && *p != TEXT_MESSAGES)
            .collect()
    }

    /// Element keys of a page; empty for an unknown page
    #[must_use]
    pub fn list_elements(&self, page: &str) -> Vec<&str> {
        self.pages
            .get(page)
            .map(|p| p.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Every entry of a page, in key order
    #[must_use]
    pub fn page_entries(&self, page: &str) -> Vec<(&str, &LocatorEntry)> {
        self.pages
            .get(page)
            .map(|p| p.iter().map(|(k, v)| (k.as_str(), v)).collect())
            .unwrap_or_default()
    }

    /// Whether the pair resolves to a usable selector
    #[must_use]
    pub fn contains(&self, page: &str, element: &str) -> bool {
        matches!(
            self.pages.get(page).and_then(|p| p.get(element)),
            Some(LocatorEntry::Valid(_))
        )
    }

    /// Entries whose strategy is unsupported
    #[must_use]
    pub fn invalid_entries(&self) -> Vec<InvalidEntry> {
        self.pages
            .iter()
            .flat_map(|(page, entries)| {
                entries.iter().filter_map(move |(element, entry)| match entry {
                    LocatorEntry::Invalid { strategy, .. } => Some(InvalidEntry {
                        page: page.clone(),
                        element: element.clone(),
                        strategy: strategy.clone(),
                    }),
                    LocatorEntry::Valid(_) => None,
                })
            })
            .collect()
    }

    /// Number of text messages across all pages
    #[must_use]
    pub fn text_message_count(&self) -> usize {
        self.text_messages.values().map(BTreeMap::len).sum()
    }

    /// Total number of element entries, including `common`
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.values().map(BTreeMap::len).sum()
    }

    /// Whether there are no element entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Where the contents came from
    #[must_use]
    pub const fn source(&self) -> &LoadSource {
        &self.source
    }
}

impl Default for LocatorRegistry {
    fn default() -> Self {
        Self::defaults()
    }
}
