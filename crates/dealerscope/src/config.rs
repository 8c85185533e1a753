//! Suite settings and interaction options.
//!
//! [`Settings`] is the YAML settings document (URLs, timeouts, browser,
//! screenshots, locator file). Like the locator registry it degrades to
//! built-in defaults when the file is missing or malformed.
//!
//! [`InteractionOptions`] is what the interaction layer actually consumes:
//! every timeout and delay it uses, as [`Duration`]s, in one struct. Per-call
//! overrides pass a modified copy instead of threading optional arguments.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::result::{ScopeError, ScopeResult};
use crate::wait::DEFAULT_POLL_INTERVAL_MS;

/// Overrides `Settings::base_url`
pub const ENV_BASE_URL: &str = "DEALERSCOPE_BASE_URL";
/// Overrides `Settings::login_url`
pub const ENV_LOGIN_URL: &str = "DEALERSCOPE_LOGIN_URL";
/// Overrides `Settings::otp_url`
pub const ENV_OTP_URL: &str = "DEALERSCOPE_OTP_URL";
/// Overrides `BrowserSettings::headless`
pub const ENV_HEADLESS: &str = "DEALERSCOPE_HEADLESS";
/// Overrides `ScreenshotSettings::dir`
pub const ENV_SCREENSHOT_DIR: &str = "DEALERSCOPE_SCREENSHOT_DIR";
/// Overrides `Settings::locators_path`
pub const ENV_LOCATORS: &str = "DEALERSCOPE_LOCATORS";
/// Overrides `Settings::test_data_path`
pub const ENV_TEST_DATA: &str = "DEALERSCOPE_TEST_DATA";

/// Timeouts, in whole seconds as written in the settings file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Wait for element presence
    pub implicit_wait_secs: u64,
    /// Wait for visibility or a caller-side condition
    pub explicit_wait_secs: u64,
    /// Wait for `document.readyState == "complete"`
    pub page_load_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            implicit_wait_secs: 5,
            explicit_wait_secs: 10,
            page_load_secs: 15,
        }
    }
}

/// Browser launch settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Run without a visible window
    pub headless: bool,
    /// Viewport width
    pub window_width: u32,
    /// Viewport height
    pub window_height: u32,
    /// Chromium executable; auto-detected when unset
    pub chromium_path: Option<PathBuf>,
    /// Keep the Chromium sandbox enabled
    pub sandbox: bool,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            chromium_path: None,
            sandbox: true,
        }
    }
}

/// Screenshot settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenshotSettings {
    /// Output directory
    pub dir: PathBuf,
    /// Capture when an interaction exhausts its fallbacks
    pub on_failure: bool,
}

impl Default for ScreenshotSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("screenshots"),
            on_failure: true,
        }
    }
}

/// Suite settings document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Application root URL
    pub base_url: String,
    /// Login page URL
    pub login_url: String,
    /// OTP verification page URL
    pub otp_url: String,
    /// Timeouts
    pub timeouts: Timeouts,
    /// Browser launch settings
    pub browser: BrowserSettings,
    /// Screenshot settings
    pub screenshots: ScreenshotSettings,
    /// Locator document
    pub locators_path: PathBuf,
    /// Credentials and OTP codes
    pub test_data_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "https://demo-app.example.com".to_string(),
            login_url: "https://demo-app.example.com/login".to_string(),
            otp_url: "https://demo-app.example.com/auth/otp-verify".to_string(),
            timeouts: Timeouts::default(),
            browser: BrowserSettings::default(),
            screenshots: ScreenshotSettings::default(),
            locators_path: PathBuf::from("config/locators.yaml"),
            test_data_path: PathBuf::from("config/test_data.yaml"),
        }
    }
}

impl Settings {
    /// Load settings, falling back to defaults when the file is missing or
    /// malformed. Never fails.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        match Self::from_path(path) {
            Ok(settings) => {
                info!(path = %path.display(), "loaded settings");
                settings
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "using default settings");
                Self::default()
            }
        }
    }

    /// Read and validate a settings file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_path(path: &Path) -> ScopeResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Parse and validate a settings document; absent keys take defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or a value is out of range.
    pub fn from_yaml_str(yaml: &str) -> ScopeResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Self = serde_yaml_ng::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first bad field.
    pub fn validate(&self) -> ScopeResult<()> {
        let t = &self.timeouts;
        if t.implicit_wait_secs == 0 || t.explicit_wait_secs == 0 || t.page_load_secs == 0 {
            return Err(ScopeError::config("timeouts must be at least one second"));
        }
        if self.browser.window_width == 0 || self.browser.window_height == 0 {
            return Err(ScopeError::config("window size must be non-zero"));
        }
        Ok(())
    }

    /// Apply `DEALERSCOPE_*` overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable source
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_BASE_URL) {
            debug!(value = %v, "base URL override");
            self.base_url = v;
        }
        if let Some(v) = lookup(ENV_LOGIN_URL) {
            debug!(value = %v, "login URL override");
            self.login_url = v;
        }
        if let Some(v) = lookup(ENV_OTP_URL) {
            debug!(value = %v, "OTP URL override");
            self.otp_url = v;
        }
        if let Some(v) = lookup(ENV_HEADLESS) {
            match parse_flag(&v) {
                Some(flag) => self.browser.headless = flag,
                None => warn!(value = %v, "ignoring unrecognised headless flag"),
            }
        }
        if let Some(v) = lookup(ENV_SCREENSHOT_DIR) {
            self.screenshots.dir = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_LOCATORS) {
            self.locators_path = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_TEST_DATA) {
            self.test_data_path = PathBuf::from(v);
        }
    }

    /// Serialize back to YAML
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> ScopeResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }
}

/// Parse a boolean flag value (`1/true/yes/on`, `0/false/no/off`)
#[must_use]
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Timing and fallback policy for the interaction layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionOptions {
    /// Bounded wait for element presence
    pub timeout: Duration,
    /// Bounded wait for visibility and caller-side conditions
    pub visible_timeout: Duration,
    /// Bounded wait for page load
    pub page_load_timeout: Duration,
    /// Interval between polls
    pub poll_interval: Duration,
    /// Pause between pointer move and click
    pub pointer_pause: Duration,
    /// Sleep between fallback strategies
    pub settle_delay: Duration,
    /// Tries of the final direct retry
    pub retry_attempts: u32,
    /// Sleep between direct retries
    pub retry_delay: Duration,
    /// Escalate through fallbacks; when false only the direct action runs
    pub fallbacks: bool,
    /// Capture a screenshot when an interaction is exhausted
    pub screenshot_on_failure: bool,
}

impl Default for InteractionOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl InteractionOptions {
    /// Derive options from suite settings
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        let t = &settings.timeouts;
        Self {
            timeout: Duration::from_secs(t.implicit_wait_secs),
            visible_timeout: Duration::from_secs(t.explicit_wait_secs),
            page_load_timeout: Duration::from_secs(t.page_load_secs),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            pointer_pause: Duration::from_secs(1),
            settle_delay: Duration::from_millis(500),
            retry_attempts: 3,
            retry_delay: Duration::from_secs(1),
            fallbacks: true,
            screenshot_on_failure: settings.screenshots.on_failure,
        }
    }

    /// Set presence timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set visibility timeout
    #[must_use]
    pub const fn with_visible_timeout(mut self, timeout: Duration) -> Self {
        self.visible_timeout = timeout;
        self
    }

    /// Set polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set delay between fallback strategies
    #[must_use]
    pub const fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Set direct retry policy
    #[must_use]
    pub const fn with_retries(mut self, attempts: u32, delay: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_delay = delay;
        self
    }

    /// Enable or disable fallback escalation
    #[must_use]
    pub const fn with_fallbacks(mut self, enabled: bool) -> Self {
        self.fallbacks = enabled;
        self
    }

    /// Enable or disable failure screenshots
    #[must_use]
    pub const fn with_screenshot_on_failure(mut self, enabled: bool) -> Self {
        self.screenshot_on_failure = enabled;
        self
    }

    /// Zero every pause and delay; waits keep their timeouts
    #[must_use]
    pub const fn without_delays(mut self) -> Self {
        self.pointer_pause = Duration::ZERO;
        self.settle_delay = Duration::ZERO;
        self.retry_delay = Duration::ZERO;
        self
    }
}
