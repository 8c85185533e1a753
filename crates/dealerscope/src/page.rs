//! Page objects over the interaction layer.
//!
//! A page object names a page of the application under test: its locator
//! namespace, its URL pattern, and the elements that must be present before
//! it counts as loaded. [`PageScope`] binds an [`Interactor`] to one page so
//! workflow code passes element keys only.

use std::borrow::Cow;
use std::collections::HashMap;

use url::Url;

use crate::driver::{Driver, ElementHandle};
use crate::interaction::Interactor;
use crate::ladder::Outcome;
use crate::result::ScopeResult;

/// Trait for page objects representing a page of the UI.
///
/// # Example
///
/// ```ignore
/// struct PortfolioPage;
///
/// impl PageObject for PortfolioPage {
///     fn page_name(&self) -> &str {
///         "portfolio_page"
///     }
///
///     fn url_pattern(&self) -> &str {
///         "/portfolios/:id"
///     }
///
///     fn ready_elements(&self) -> &[&'static str] {
///         &["portfolio_name", "save_button"]
///     }
/// }
/// ```
pub trait PageObject {
    /// Locator namespace of the page
    fn page_name(&self) -> &str;

    /// URL pattern that matches this page (e.g., "/login", "/users/*")
    fn url_pattern(&self) -> &str;

    /// Elements that must be present before the page counts as loaded
    fn ready_elements(&self) -> &[&'static str] {
        &[]
    }

    /// Whether `url` belongs to this page
    fn matches_url(&self, url: &str) -> bool {
        UrlMatcher::new(self.url_pattern()).matches(url)
    }
}

/// An [`Interactor`] bound to one page namespace
#[derive(Debug)]
pub struct PageScope<'a, D> {
    interactor: &'a Interactor<D>,
    page: &'a str,
}

impl<D> Clone for PageScope<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D> Copy for PageScope<'_, D> {}

impl<'a, D: Driver> PageScope<'a, D> {
    /// Scope for a page name
    #[must_use]
    pub const fn new(interactor: &'a Interactor<D>, page: &'a str) -> Self {
        Self { interactor, page }
    }

    /// Scope for a page object
    #[must_use]
    pub fn of<P: PageObject + ?Sized>(interactor: &'a Interactor<D>, page: &'a P) -> Self {
        Self::new(interactor, page.page_name())
    }

    /// Page name
    #[must_use]
    pub const fn page(&self) -> &str {
        self.page
    }

    /// Underlying interactor
    #[must_use]
    pub const fn interactor(&self) -> &'a Interactor<D> {
        self.interactor
    }

    /// See [`Interactor::find`]
    pub async fn find(&self, element: &str) -> ScopeResult<Option<ElementHandle>> {
        self.interactor.find(self.page, element).await
    }

    /// See [`Interactor::is_present`]
    pub async fn is_present(&self, element: &str) -> ScopeResult<bool> {
        self.interactor.is_present(self.page, element).await
    }

    /// See [`Interactor::is_visible`]
    pub async fn is_visible(&self, element: &str) -> ScopeResult<bool> {
        self.interactor.is_visible(self.page, element).await
    }

    /// See [`Interactor::wait_visible`]
    pub async fn wait_visible(&self, element: &str) -> ScopeResult<Option<ElementHandle>> {
        self.interactor.wait_visible(self.page, element).await
    }

    /// See [`Interactor::is_enabled`]
    pub async fn is_enabled(&self, element: &str) -> ScopeResult<bool> {
        self.interactor.is_enabled(self.page, element).await
    }

    /// See [`Interactor::click`]
    pub async fn click(&self, element: &str) -> ScopeResult<Outcome<()>> {
        self.interactor.click(self.page, element).await
    }

    /// See [`Interactor::type_text`]
    pub async fn type_text(&self, element: &str, text: &str) -> ScopeResult<Outcome<()>> {
        self.interactor.type_text(self.page, element, text).await
    }

    /// See [`Interactor::read_text`]
    pub async fn read_text(&self, element: &str) -> ScopeResult<Outcome<String>> {
        self.interactor.read_text(self.page, element).await
    }

    /// See [`Interactor::attribute`]
    pub async fn attribute(&self, element: &str, name: &str) -> ScopeResult<Option<String>> {
        self.interactor.attribute(self.page, element, name).await
    }

    /// See [`Interactor::scroll_into_view`]
    pub async fn scroll_into_view(&self, element: &str) -> ScopeResult<Outcome<()>> {
        self.interactor.scroll_into_view(self.page, element).await
    }

    /// See [`Interactor::text_matches`]
    pub async fn text_matches(&self, element: &str, message_key: &str) -> ScopeResult<bool> {
        self.interactor
            .text_matches(self.page, element, message_key)
            .await
    }

    /// Whether every one of `ready` is present
    pub async fn is_loaded(&self, ready: &[&str]) -> ScopeResult<bool> {
        for element in ready {
            if !self.is_present(element).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// URL pattern matcher for page objects
#[derive(Debug, Clone)]
pub struct UrlMatcher {
    pattern: String,
    segments: Vec<UrlSegment>,
}

#[derive(Debug, Clone)]
enum UrlSegment {
    Literal(String),
    Wildcard,
    Parameter(String),
}

/// Path part of a URL. Absolute URLs go through [`Url::parse`]; a bare path
/// only loses its query and fragment.
pub(crate) fn url_path(url: &str) -> Cow<'_, str> {
    match Url::parse(url) {
        Ok(parsed) => Cow::Owned(parsed.path().to_string()),
        Err(_) => Cow::Borrowed(url.split(['?', '#']).next().unwrap_or(url)),
    }
}

impl UrlMatcher {
    /// Create a new URL matcher from a pattern
    ///
    /// Patterns support:
    /// - Literal segments: `/login`
    /// - Wildcards: `/users/*`
    /// - Named parameters: `/users/:id`
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s == "*" {
                    UrlSegment::Wildcard
                } else if let Some(name) = s.strip_prefix(':') {
                    UrlSegment::Parameter(name.to_string())
                } else {
                    UrlSegment::Literal(s.to_string())
                }
            })
            .collect();

        Self {
            pattern: pattern.to_string(),
            segments,
        }
    }

    /// Check if a URL (absolute or path only) matches the pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        let path = url_path(url);
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        // wildcards and parameters each consume exactly one segment
        parts.len() == self.segments.len()
            && self
                .segments
                .iter()
                .zip(&parts)
                .all(|(segment, part)| match segment {
                    UrlSegment::Literal(lit) => lit == part,
                    UrlSegment::Wildcard | UrlSegment::Parameter(_) => true,
                })
    }

    /// Extract named parameters from a matching URL
    #[must_use]
    pub fn extract_params(&self, url: &str) -> HashMap<String, String> {
        let path = url_path(url);
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        self.segments
            .iter()
            .zip(parts)
            .filter_map(|(segment, part)| match segment {
                UrlSegment::Parameter(name) => Some((name.clone(), part.to_string())),
                _ => None,
            })
            .collect()
    }

    /// Get the original pattern
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}
