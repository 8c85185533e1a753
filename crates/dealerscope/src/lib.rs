//! Dealerscope: locator registry and resilient interaction layer for
//! browser-driven UI tests of the dealership valuation application.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     DEALERSCOPE Architecture                     │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐             │
//! │  │ locators    │   │ Interactor  │   │ Driver      │             │
//! │  │ .yaml       │──►│ fallback    │──►│ chromium /  │             │
//! │  │ (Registry)  │   │ ladder      │   │ mock        │             │
//! │  └─────────────┘   └─────────────┘   └─────────────┘             │
//! │         ▲                 ▲                                      │
//! │         │          ┌─────────────┐                               │
//! │         └──────────│ Page objects│ (workflows::login, otp)       │
//! │                    └─────────────┘                               │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tests never embed raw selectors: they name an element by `(page, element)`
//! and the [`LocatorRegistry`] resolves it. Every action goes through the
//! [`Interactor`], which climbs a ladder of progressively more invasive
//! strategies (native, pointer, script) before giving up.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use dealerscope::prelude::*;
//!
//! # async fn demo() -> ScopeResult<()> {
//! let settings = Settings::load(std::path::Path::new("config/settings.yaml"));
//! let registry = Arc::new(LocatorRegistry::load(&settings.locators_path));
//! let ix = Interactor::new(
//!     MockDriver::new(),
//!     registry,
//!     InteractionOptions::from_settings(&settings),
//! );
//!
//! let login = LoginPage::new(&ix, &settings);
//! let result = login.perform_login("dealer@example.com", "secret", true).await?;
//! assert!(result.is_submitted());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

#[cfg(feature = "browser")]
mod chromium;
mod config;
mod driver;
mod interaction;
mod ladder;
mod locator;
mod logging;
mod page;
mod registry;
mod result;
mod screenshot;
pub mod scripts;
mod testdata;
mod wait;

/// Page workflows (login, OTP)
pub mod workflows;

#[cfg(feature = "browser")]
pub use chromium::ChromiumDriver;
pub use config::{
    parse_flag, BrowserSettings, InteractionOptions, ScreenshotSettings, Settings, Timeouts,
    ENV_BASE_URL, ENV_HEADLESS, ENV_LOCATORS, ENV_LOGIN_URL, ENV_OTP_URL, ENV_SCREENSHOT_DIR,
    ENV_TEST_DATA,
};
pub use driver::{Driver, ElementHandle, MockChannel, MockDriver, MockElement};
pub use interaction::Interactor;
pub use ladder::{
    climb, retry, Action, Climb, FallbackStrategy, Outcome, StepFailure, DIRECT_ONLY,
    FULL_LADDER, READ_TEXT_LADDER, SCROLL_LADDER,
};
pub use locator::{BoundingBox, ElementKey, Point, Selector, Strategy, UnknownStrategy};
pub use logging::{init_logging, level_for, LogFormat};
pub use page::{PageObject, PageScope, UrlMatcher};
pub use registry::{InvalidEntry, LoadSource, LocatorEntry, LocatorRegistry, COMMON, TEXT_MESSAGES};
pub use result::{ScopeError, ScopeResult};
pub use screenshot::{file_stem, sanitize_scenario, ScreenshotRecorder, TIMESTAMP_FORMAT};
pub use testdata::{Credentials, Expectation, LoginScenario, OtpCodes, TestData};
pub use wait::{poll_until, poll_until_timed, settle, WaitResult, DEFAULT_POLL_INTERVAL_MS};
pub use workflows::{
    LoginPage, LoginResult, LoginStep, OtpPage, OtpResult, OtpStep, LOGIN_PAGE, OTP_PAGE,
};

/// Prelude for convenient imports
pub mod prelude {
    #[cfg(feature = "browser")]
    pub use super::chromium::ChromiumDriver;
    pub use super::config::*;
    pub use super::driver::*;
    pub use super::interaction::*;
    pub use super::ladder::{Action, FallbackStrategy, Outcome, StepFailure};
    pub use super::locator::*;
    pub use super::page::*;
    pub use super::registry::*;
    pub use super::result::*;
    pub use super::screenshot::ScreenshotRecorder;
    pub use super::testdata::*;
    pub use super::workflows::*;
}
