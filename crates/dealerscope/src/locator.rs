//! Locator model: selector strategies, concrete selectors and symbolic keys.
//!
//! A locator document names elements symbolically as `(page, element)`.
//! The registry turns that pair into a [`Selector`], and drivers turn a
//! [`Selector`] into elements. Strategy strings are parsed exactly once, at
//! the document boundary, into the closed [`Strategy`] enum.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A point in viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Point {
    /// Create a new point
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Bounding box of an element in viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// X position
    pub x: f64,
    /// Y position
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl BoundingBox {
    /// Create a new bounding box
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Get the center point
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Whether the box has a visible area
    #[must_use]
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Selector strategy for locating elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// XPath expression
    #[serde(rename = "xpath")]
    XPath,
    /// Element id attribute
    Id,
    /// CSS selector
    CssSelector,
    /// Single class name
    ClassName,
}

impl Strategy {
    /// Canonical name used in locator documents and tooling output
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::XPath => "xpath",
            Self::Id => "id",
            Self::CssSelector => "css_selector",
            Self::ClassName => "class_name",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a strategy name is not one of the supported kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStrategy(pub String);

impl fmt::Display for UnknownStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown locator strategy '{}'", self.0)
    }
}

impl std::error::Error for UnknownStrategy {}

impl FromStr for Strategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xpath" => Ok(Self::XPath),
            "id" => Ok(Self::Id),
            "css" | "css_selector" => Ok(Self::CssSelector),
            "class" | "class_name" => Ok(Self::ClassName),
            _ => Err(UnknownStrategy(s.to_string())),
        }
    }
}

/// A concrete, driver-ready selector
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selector {
    /// How `value` is interpreted
    pub strategy: Strategy,
    /// Strategy-specific selector text
    pub value: String,
}

impl Selector {
    /// Create a selector
    #[must_use]
    pub fn new(strategy: Strategy, value: impl Into<String>) -> Self {
        Self {
            strategy,
            value: value.into(),
        }
    }

    /// Create an XPath selector
    #[must_use]
    pub fn xpath(value: impl Into<String>) -> Self {
        Self::new(Strategy::XPath, value)
    }

    /// Create a CSS selector
    #[must_use]
    pub fn css(value: impl Into<String>) -> Self {
        Self::new(Strategy::CssSelector, value)
    }

    /// Create an id selector
    #[must_use]
    pub fn id(value: impl Into<String>) -> Self {
        Self::new(Strategy::Id, value)
    }

    /// Create a class-name selector
    #[must_use]
    pub fn class_name(value: impl Into<String>) -> Self {
        Self::new(Strategy::ClassName, value)
    }

    /// Convert to a page-context expression yielding the first match or `null`
    #[must_use]
    pub fn to_query(&self) -> String {
        let v = &self.value;
        match self.strategy {
            Strategy::XPath => format!(
                "document.evaluate({v:?}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue"
            ),
            Strategy::Id => format!("document.getElementById({v:?})"),
            Strategy::CssSelector => format!("document.querySelector({v:?})"),
            Strategy::ClassName => format!("(document.getElementsByClassName({v:?})[0] || null)"),
        }
    }

    /// Convert to a page-context expression yielding an array of all matches
    #[must_use]
    pub fn to_query_all(&self) -> String {
        let v = &self.value;
        match self.strategy {
            Strategy::XPath => format!(
                "(() => {{ const r = document.evaluate({v:?}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); \
                 const out = []; for (let i = 0; i < r.snapshotLength; i++) out.push(r.snapshotItem(i)); return out; }})()"
            ),
            Strategy::Id => format!("[document.getElementById({v:?})].filter(Boolean)"),
            Strategy::CssSelector => format!("Array.from(document.querySelectorAll({v:?}))"),
            Strategy::ClassName => {
                format!("Array.from(document.getElementsByClassName({v:?}))")
            }
        }
    }

    /// Equivalent CSS selector, when the strategy has one
    #[must_use]
    pub fn to_css(&self) -> Option<String> {
        match self.strategy {
            Strategy::CssSelector => Some(self.value.clone()),
            Strategy::Id => Some(format!("[id={:?}]", self.value)),
            Strategy::ClassName => Some(format!(".{}", self.value.trim())),
            Strategy::XPath => None,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.strategy, self.value)
    }
}

/// Symbolic element key: a page name and an element key within that page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementKey<'a> {
    /// Page name (or a reserved namespace such as `common`)
    pub page: &'a str,
    /// Element key within the page
    pub element: &'a str,
}

impl<'a> ElementKey<'a> {
    /// Create a key
    #[must_use]
    pub const fn new(page: &'a str, element: &'a str) -> Self {
        Self { page, element }
    }
}

impl<'a> From<(&'a str, &'a str)> for ElementKey<'a> {
    fn from((page, element): (&'a str, &'a str)) -> Self {
        Self { page, element }
    }
}

impl fmt::Display for ElementKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.page, self.element)
    }
}
