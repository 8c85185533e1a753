//! Resilient interaction layer.
//!
//! [`Interactor`] acts on symbolic `(page, element)` pairs. Each request goes
//! through the same stages:
//!
//! 1. **Resolve** the pair through the [`LocatorRegistry`]. A miss or an
//!    unsupported strategy is an error: the test itself is broken.
//! 2. **Locate** the element with a bounded wait. Absence is not an error;
//!    actions return [`Outcome::Absent`] and queries return `None`/`false`,
//!    so workflow code can treat "not there" as a signal.
//! 3. **Act** through the action's fallback ladder (see [`crate::ladder`]).
//!    Clicks first wait for the element to be displayed and enabled; a
//!    control that never becomes clickable is reported as
//!    [`ScopeError::NotInteractable`]. A rung that hits a stale handle makes
//!    the next rung look the element up again, and the final direct retry
//!    looks it up before every try. If every rung fails the layer takes a
//!    screenshot (when enabled) and returns
//!    [`ScopeError::InteractionExhausted`].
//!
//! Verifying the side effect of an action (URL change, new element) is left
//! to the caller; [`Interactor::wait_for_url_change`] helps with the common
//! case.

use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::InteractionOptions;
use crate::driver::{Driver, ElementHandle};
use crate::ladder::{climb, retry, Action, Climb, FallbackStrategy, Outcome, DIRECT_ONLY};
use crate::locator::{ElementKey, Selector};
use crate::registry::LocatorRegistry;
use crate::result::{ScopeError, ScopeResult};
use crate::screenshot::ScreenshotRecorder;
use crate::scripts;
use crate::wait::{poll_until, settle};

/// Interaction layer over one browser session
#[derive(Debug)]
pub struct Interactor<D> {
    driver: D,
    registry: Arc<LocatorRegistry>,
    options: InteractionOptions,
    recorder: Option<ScreenshotRecorder>,
}

impl<D: Driver> Interactor<D> {
    /// Create an interactor without failure screenshots
    #[must_use]
    pub fn new(driver: D, registry: Arc<LocatorRegistry>, options: InteractionOptions) -> Self {
        Self {
            driver,
            registry,
            options,
            recorder: None,
        }
    }

    /// Attach a screenshot recorder
    #[must_use]
    pub fn with_recorder(mut self, recorder: ScreenshotRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Underlying driver
    #[must_use]
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Shared locator registry
    #[must_use]
    pub fn registry(&self) -> &LocatorRegistry {
        &self.registry
    }

    /// Default options for calls without an override
    #[must_use]
    pub const fn options(&self) -> &InteractionOptions {
        &self.options
    }

    /// Give back the driver, e.g. to close it
    #[must_use]
    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Resolve a pair to its selector
    ///
    /// # Errors
    ///
    /// `LocatorNotFound` or `UnsupportedStrategy`.
    pub fn resolve(&self, page: &str, element: &str) -> ScopeResult<Selector> {
        self.registry.resolve(page, element)
    }

    // ------------------------------------------------------------------
    // Locating
    // ------------------------------------------------------------------

    async fn locate(
        &self,
        selector: &Selector,
        timeout: std::time::Duration,
        opts: &InteractionOptions,
    ) -> ScopeResult<Option<ElementHandle>> {
        let driver = &self.driver;
        poll_until(timeout, opts.poll_interval, move || async move {
            Ok(driver.find_elements(selector).await?.into_iter().next())
        })
        .await
    }

    /// First element for the pair, waiting up to the presence timeout
    ///
    /// # Errors
    ///
    /// Structural errors only; absence is `Ok(None)`.
    pub async fn find(&self, page: &str, element: &str) -> ScopeResult<Option<ElementHandle>> {
        self.find_with(page, element, &self.options).await
    }

    /// [`Interactor::find`] with explicit options
    ///
    /// # Errors
    ///
    /// Structural errors only; absence is `Ok(None)`.
    pub async fn find_with(
        &self,
        page: &str,
        element: &str,
        opts: &InteractionOptions,
    ) -> ScopeResult<Option<ElementHandle>> {
        let selector = self.resolve(page, element)?;
        let found = self.locate(&selector, opts.timeout, opts).await?;
        if found.is_none() {
            info!(
                target_key = %ElementKey::new(page, element),
                %selector,
                timeout_ms = opts.timeout.as_millis() as u64,
                "element not found"
            );
        }
        Ok(found)
    }

    /// All elements for the pair; empty when none appear in time
    ///
    /// # Errors
    ///
    /// Structural errors only.
    pub async fn find_all(&self, page: &str, element: &str) -> ScopeResult<Vec<ElementHandle>> {
        let selector = self.resolve(page, element)?;
        let driver = &self.driver;
        let sel = &selector;
        let found = poll_until(
            self.options.timeout,
            self.options.poll_interval,
            move || async move {
                let all = driver.find_elements(sel).await?;
                Ok((!all.is_empty()).then_some(all))
            },
        )
        .await?;
        Ok(found.unwrap_or_default())
    }

    /// Wait for the pair to be present and displayed, up to the visibility
    /// timeout
    ///
    /// # Errors
    ///
    /// Structural errors only; absence or invisibility is `Ok(None)`.
    pub async fn wait_visible(
        &self,
        page: &str,
        element: &str,
    ) -> ScopeResult<Option<ElementHandle>> {
        let opts = &self.options;
        self.visible_within(page, element, opts.visible_timeout, opts)
            .await
    }

    /// [`Interactor::wait_visible`] with explicit options
    ///
    /// # Errors
    ///
    /// Structural errors only.
    pub async fn wait_visible_with(
        &self,
        page: &str,
        element: &str,
        opts: &InteractionOptions,
    ) -> ScopeResult<Option<ElementHandle>> {
        self.visible_within(page, element, opts.visible_timeout, opts)
            .await
    }

    async fn visible_within(
        &self,
        page: &str,
        element: &str,
        timeout: std::time::Duration,
        opts: &InteractionOptions,
    ) -> ScopeResult<Option<ElementHandle>> {
        let selector = self.resolve(page, element)?;
        let driver = &self.driver;
        let sel = &selector;
        poll_until(timeout, opts.poll_interval, move || async move {
            for el in driver.find_elements(sel).await? {
                if driver.is_displayed(&el).await? {
                    return Ok(Some(el));
                }
            }
            Ok(None)
        })
        .await
    }

    /// Whether the pair appears within the presence timeout
    ///
    /// # Errors
    ///
    /// Structural errors only.
    pub async fn is_present(&self, page: &str, element: &str) -> ScopeResult<bool> {
        Ok(self.find(page, element).await?.is_some())
    }

    /// Whether the pair is displayed within the presence timeout
    ///
    /// # Errors
    ///
    /// Structural errors only.
    pub async fn is_visible(&self, page: &str, element: &str) -> ScopeResult<bool> {
        let opts = &self.options;
        Ok(self
            .visible_within(page, element, opts.timeout, opts)
            .await?
            .is_some())
    }

    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    async fn clickable_within(
        &self,
        selector: &Selector,
        opts: &InteractionOptions,
    ) -> ScopeResult<Option<ElementHandle>> {
        let driver = &self.driver;
        poll_until(opts.timeout, opts.poll_interval, move || async move {
            for el in driver.find_elements(selector).await? {
                if driver.is_displayed(&el).await? && driver.is_enabled(&el).await? {
                    return Ok(Some(el));
                }
            }
            Ok(None)
        })
        .await
    }

    /// One immediate lookup; keeps the current handle when nothing matches
    async fn refind(
        &self,
        selector: &Selector,
        current: &Mutex<ElementHandle>,
    ) -> ScopeResult<ElementHandle> {
        let fresh = self.driver.find_elements(selector).await?.into_iter().next();
        let mut handle = current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(fresh) = fresh {
            if *handle != fresh {
                debug!(%selector, old = %handle.id, new = %fresh.id, "element re-found");
            }
            *handle = fresh;
        }
        Ok(handle.clone())
    }

    async fn failure_screenshot(
        &self,
        action: Action,
        page: &str,
        element: &str,
        opts: &InteractionOptions,
    ) -> Option<PathBuf> {
        if opts.screenshot_on_failure {
            self.capture(&format!("{action}_{page}_{element}")).await
        } else {
            None
        }
    }

    async fn act<T, F, Fut>(
        &self,
        action: Action,
        page: &str,
        element: &str,
        opts: &InteractionOptions,
        rung: F,
    ) -> ScopeResult<Outcome<T>>
    where
        F: Fn(FallbackStrategy, ElementHandle) -> Fut,
        Fut: Future<Output = ScopeResult<T>>,
    {
        let Some(mut handle) = self.find_with(page, element, opts).await? else {
            return Ok(Outcome::Absent);
        };
        let selector = self.resolve(page, element)?;

        if action == Action::Click {
            let Some(clickable) = self.clickable_within(&selector, opts).await? else {
                let target = ElementKey::new(page, element).to_string();
                let screenshot = self.failure_screenshot(action, page, element, opts).await;
                warn!(target_key = %target, ?screenshot, "element never became clickable");
                return Err(ScopeError::NotInteractable {
                    message: format!(
                        "{target} not displayed and enabled within {}ms",
                        opts.timeout.as_millis()
                    ),
                });
            };
            handle = clickable;
        }

        let steps = if opts.fallbacks {
            action.ladder()
        } else {
            DIRECT_ONLY
        };

        let this = self;
        let selector = &selector;
        let rung = &rung;
        let current = &Mutex::new(handle);
        let stale = &AtomicBool::new(false);
        let climbed = climb(steps, opts.settle_delay, move |strategy| async move {
            if strategy == FallbackStrategy::RetryDirect {
                return retry(opts.retry_attempts, opts.retry_delay, move || async move {
                    let el = this.refind(selector, current).await?;
                    rung(strategy, el).await
                })
                .await;
            }
            let el = if stale.swap(false, Ordering::SeqCst) {
                this.refind(selector, current).await?
            } else {
                current.lock().unwrap_or_else(PoisonError::into_inner).clone()
            };
            let result = rung(strategy, el).await;
            if matches!(result, Err(ScopeError::StaleElement { .. })) {
                stale.store(true, Ordering::SeqCst);
            }
            result
        })
        .await?;

        match climbed {
            Climb::Reached {
                value,
                via,
                attempts,
            } => {
                debug!(%action, target_key = %ElementKey::new(page, element), %via, "done");
                Ok(Outcome::Done {
                    value,
                    via,
                    attempts,
                })
            }
            Climb::Exhausted(failures) => {
                let target = ElementKey::new(page, element).to_string();
                warn!(%action, target_key = %target, strategies = failures.len(), "all strategies failed");
                let screenshot = self.failure_screenshot(action, page, element, opts).await;
                Err(ScopeError::InteractionExhausted {
                    action: action.to_string(),
                    target,
                    failures,
                    screenshot,
                })
            }
        }
    }

    /// Click the pair once it is displayed and enabled
    ///
    /// # Errors
    ///
    /// Structural errors, `NotInteractable` when the element never becomes
    /// clickable, or `InteractionExhausted` when every strategy fails.
    pub async fn click(&self, page: &str, element: &str) -> ScopeResult<Outcome<()>> {
        self.click_with(page, element, &self.options).await
    }

    /// [`Interactor::click`] with explicit options
    ///
    /// # Errors
    ///
    /// Structural errors, `NotInteractable` when the element never becomes
    /// clickable, or `InteractionExhausted` when every strategy fails.
    pub async fn click_with(
        &self,
        page: &str,
        element: &str,
        opts: &InteractionOptions,
    ) -> ScopeResult<Outcome<()>> {
        let driver = &self.driver;
        self.act(Action::Click, page, element, opts, move |strategy, el| async move {
            let el = &el;
            match strategy {
                FallbackStrategy::Direct | FallbackStrategy::RetryDirect => driver.click(el).await,
                FallbackStrategy::PointerSequence => {
                    driver.move_pointer_to(el).await?;
                    settle(opts.pointer_pause).await;
                    driver.pointer_click().await
                }
                FallbackStrategy::ScriptEvent => driver
                    .call_on_element(el, scripts::DISPATCH_CLICK)
                    .await
                    .map(drop),
                FallbackStrategy::ScriptInvoke => driver
                    .call_on_element(el, scripts::INVOKE_CLICK)
                    .await
                    .map(drop),
            }
        })
        .await
    }

    /// Replace the contents of the pair with `text`
    ///
    /// # Errors
    ///
    /// Structural errors, or `InteractionExhausted` when every strategy fails.
    pub async fn type_text(
        &self,
        page: &str,
        element: &str,
        text: &str,
    ) -> ScopeResult<Outcome<()>> {
        self.type_text_with(page, element, text, &self.options)
            .await
    }

    /// [`Interactor::type_text`] with explicit options
    ///
    /// # Errors
    ///
    /// Structural errors, or `InteractionExhausted` when every strategy fails.
    pub async fn type_text_with(
        &self,
        page: &str,
        element: &str,
        text: &str,
        opts: &InteractionOptions,
    ) -> ScopeResult<Outcome<()>> {
        let driver = &self.driver;
        self.act(Action::Type, page, element, opts, move |strategy, el| async move {
            let el = &el;
            match strategy {
                FallbackStrategy::Direct | FallbackStrategy::RetryDirect => {
                    fill(driver, el, text).await
                }
                FallbackStrategy::PointerSequence => {
                    driver.move_pointer_to(el).await?;
                    settle(opts.pointer_pause).await;
                    driver.pointer_click().await?;
                    fill(driver, el, text).await
                }
                FallbackStrategy::ScriptEvent => driver
                    .call_on_element(el, &scripts::dispatch_input(text))
                    .await
                    .map(drop),
                FallbackStrategy::ScriptInvoke => driver
                    .call_on_element(el, &scripts::assign_value(text))
                    .await
                    .map(drop),
            }
        })
        .await
    }

    /// Text of the pair
    ///
    /// # Errors
    ///
    /// Structural errors, or `InteractionExhausted` when every strategy fails.
    pub async fn read_text(&self, page: &str, element: &str) -> ScopeResult<Outcome<String>> {
        self.read_text_with(page, element, &self.options).await
    }

    /// [`Interactor::read_text`] with explicit options
    ///
    /// # Errors
    ///
    /// Structural errors, or `InteractionExhausted` when every strategy fails.
    pub async fn read_text_with(
        &self,
        page: &str,
        element: &str,
        opts: &InteractionOptions,
    ) -> ScopeResult<Outcome<String>> {
        let driver = &self.driver;
        self.act(Action::ReadText, page, element, opts, move |strategy, el| async move {
            let el = &el;
            match strategy {
                FallbackStrategy::ScriptInvoke => driver
                    .call_on_element(el, scripts::READ_TEXT)
                    .await
                    .map(|v| value_to_text(&v)),
                _ => driver.text(el).await,
            }
        })
        .await
    }

    /// Scroll the pair into view
    ///
    /// # Errors
    ///
    /// Structural errors, or `InteractionExhausted` when every strategy fails.
    pub async fn scroll_into_view(&self, page: &str, element: &str) -> ScopeResult<Outcome<()>> {
        let driver = &self.driver;
        self.act(
            Action::Scroll,
            page,
            element,
            &self.options,
            move |strategy, el| async move {
                if strategy.is_script() {
                    driver
                        .call_on_element(&el, scripts::SCROLL_INTO_VIEW)
                        .await
                        .map(drop)
                } else {
                    driver.scroll_into_view(&el).await
                }
            },
        )
        .await
    }

    /// Attribute of the pair; `None` when the element or attribute is absent
    ///
    /// # Errors
    ///
    /// Structural errors and driver failures.
    pub async fn attribute(
        &self,
        page: &str,
        element: &str,
        name: &str,
    ) -> ScopeResult<Option<String>> {
        match self.find(page, element).await? {
            Some(el) => self.driver.attribute(&el, name).await,
            None => Ok(None),
        }
    }

    /// Whether the pair accepts input; `false` when absent
    ///
    /// # Errors
    ///
    /// Structural errors and driver failures.
    pub async fn is_enabled(&self, page: &str, element: &str) -> ScopeResult<bool> {
        match self.find(page, element).await? {
            Some(el) => self.driver.is_enabled(&el).await,
            None => Ok(false),
        }
    }

    /// Whether the pair's text contains the expected copy stored under
    /// `text_messages.<page>.<message_key>`. An absent element is `false`.
    ///
    /// # Errors
    ///
    /// `TextMessageNotFound`, `Config` for a blank message, other structural
    /// errors, `InteractionExhausted`.
    pub async fn text_matches(
        &self,
        page: &str,
        element: &str,
        message_key: &str,
    ) -> ScopeResult<bool> {
        let expected = self.registry.resolve_text(page, message_key)?.trim().to_string();
        if expected.is_empty() {
            return Err(ScopeError::config(format!(
                "text message {page}.{message_key} is empty"
            )));
        }
        let Some(actual) = self.read_text(page, element).await?.into_value() else {
            return Ok(false);
        };
        let matches = actual.contains(&expected);
        if !matches {
            info!(
                target_key = %ElementKey::new(page, element),
                %expected,
                %actual,
                "text differs from expected message"
            );
        }
        Ok(matches)
    }

    // ------------------------------------------------------------------
    // Page and session
    // ------------------------------------------------------------------

    /// Navigate and wait for the document to finish loading
    ///
    /// # Errors
    ///
    /// Driver failures during navigation.
    pub async fn navigate(&self, url: &str) -> ScopeResult<()> {
        info!(url, "navigating");
        self.driver.navigate(url).await?;
        if !self.wait_for_page_load().await? {
            warn!(url, "page did not finish loading in time");
        }
        Ok(())
    }

    /// Wait for `document.readyState == "complete"`; `false` on timeout
    ///
    /// # Errors
    ///
    /// Structural errors only.
    pub async fn wait_for_page_load(&self) -> ScopeResult<bool> {
        let driver = &self.driver;
        let loaded = poll_until(
            self.options.page_load_timeout,
            self.options.poll_interval,
            move || async move {
                let state = driver.execute_script(scripts::READY_STATE).await?;
                Ok((state.as_str() == Some("complete")).then_some(()))
            },
        )
        .await?;
        Ok(loaded.is_some())
    }

    /// Current URL
    ///
    /// # Errors
    ///
    /// Driver failures.
    pub async fn current_url(&self) -> ScopeResult<String> {
        self.driver.current_url().await
    }

    /// Document title
    ///
    /// # Errors
    ///
    /// Driver failures.
    pub async fn title(&self) -> ScopeResult<String> {
        self.driver.title().await
    }

    /// Reload and wait for load
    ///
    /// # Errors
    ///
    /// Driver failures.
    pub async fn refresh(&self) -> ScopeResult<()> {
        self.driver.refresh().await?;
        let _ = self.wait_for_page_load().await?;
        Ok(())
    }

    /// Go back and wait for load
    ///
    /// # Errors
    ///
    /// Driver failures.
    pub async fn go_back(&self) -> ScopeResult<()> {
        self.driver.go_back().await?;
        let _ = self.wait_for_page_load().await?;
        Ok(())
    }

    /// Handles of all open windows
    ///
    /// # Errors
    ///
    /// Driver failures.
    pub async fn window_handles(&self) -> ScopeResult<Vec<String>> {
        self.driver.window_handles().await
    }

    /// Make a window current
    ///
    /// # Errors
    ///
    /// Driver failures, including an unknown handle.
    pub async fn switch_to_window(&self, handle: &str) -> ScopeResult<()> {
        self.driver.switch_to_window(handle).await
    }

    /// Wait until the URL differs from `from`; the new URL, or `None` when it
    /// did not change within the visibility timeout
    ///
    /// # Errors
    ///
    /// Structural errors only.
    pub async fn wait_for_url_change(&self, from: &str) -> ScopeResult<Option<String>> {
        let driver = &self.driver;
        poll_until(
            self.options.visible_timeout,
            self.options.poll_interval,
            move || async move {
                let url = driver.current_url().await?;
                Ok((url != from).then_some(url))
            },
        )
        .await
    }

    /// Tagged screenshot through the attached recorder; `None` without one
    /// or when capture fails
    pub async fn capture(&self, scenario: &str) -> Option<PathBuf> {
        match &self.recorder {
            Some(recorder) => recorder.capture(&self.driver, scenario).await,
            None => {
                debug!(scenario, "no screenshot recorder attached");
                None
            }
        }
    }
}

async fn fill<D: Driver + ?Sized>(driver: &D, el: &ElementHandle, text: &str) -> ScopeResult<()> {
    driver.clear(el).await?;
    driver.send_keys(el, text).await
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::{MockChannel, MockDriver, MockElement};
    use crate::scripts::ScriptKind;
    use std::time::Duration;
    use tokio::time::Instant;

    const LOCATORS: &str = r#"
login_page:
  email_field: "//input[@id='company-email']"
  sign_in_button: "//button[text()='Sign In']"
  general_error: { by: css, value: "div.error" }
  cards: { by: class, value: card }
  broken: { by: link_text, value: "Sign In" }
text_messages:
  login_page:
    invalid_credentials: "Invalid email or password"
    placeholder: "   "
"#;

    fn sign_in() -> Selector {
        Selector::xpath("//button[text()='Sign In']")
    }

    fn email() -> Selector {
        Selector::xpath("//input[@id='company-email']")
    }

    fn options() -> InteractionOptions {
        InteractionOptions::default()
            .with_timeout(Duration::from_secs(2))
            .with_visible_timeout(Duration::from_secs(3))
            .with_poll_interval(Duration::from_millis(250))
            .without_delays()
            .with_screenshot_on_failure(false)
    }

    fn interactor_with(opts: InteractionOptions) -> Interactor<MockDriver> {
        let registry = LocatorRegistry::from_yaml_str(LOCATORS).unwrap();
        Interactor::new(MockDriver::new(), Arc::new(registry), opts)
    }

    fn interactor() -> Interactor<MockDriver> {
        interactor_with(options())
    }

    mod resolve_tests {
        use super::*;

        #[tokio::test]
        async fn test_resolution_miss_is_error_without_driver_calls() {
            let ix = interactor();
            let err = ix.click("login_page", "nonexistent_key").await.unwrap_err();
            assert!(matches!(err, ScopeError::LocatorNotFound { .. }));
            assert!(!ix.driver().was_called("find"));
        }

        #[tokio::test]
        async fn test_unsupported_strategy_fails_fast() {
            let ix = interactor();
            let err = ix.find("login_page", "broken").await.unwrap_err();
            assert!(matches!(err, ScopeError::UnsupportedStrategy { ref strategy, .. } if strategy == "link_text"));
            assert!(!ix.driver().was_called("find"));
        }
    }

    mod locate_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_never_appears_returns_absent_within_timeout() {
            let ix = interactor();
            let start = Instant::now();
            let outcome = ix.click("login_page", "sign_in_button").await.unwrap();
            assert!(outcome.is_absent());
            let elapsed = start.elapsed();
            assert!(elapsed >= Duration::from_secs(2));
            assert!(elapsed <= Duration::from_secs(2) + Duration::from_millis(250));
            assert!(!ix.driver().was_called("click"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_delayed_element_is_found() {
            let ix = interactor();
            ix.driver()
                .add_element(sign_in(), MockElement::new("Sign In").appears_after(3));
            assert!(ix.find("login_page", "sign_in_button").await.unwrap().is_some());
            assert_eq!(ix.driver().call_count("find"), 4);
        }

        #[tokio::test(start_paused = true)]
        async fn test_presence_and_visibility() {
            let ix = interactor();
            let sel = Selector::css("div.error");
            ix.driver().add_element(sel, MockElement::new("Oops").hidden());
            assert!(ix.is_present("login_page", "general_error").await.unwrap());
            assert!(!ix.is_visible("login_page", "general_error").await.unwrap());
            assert!(!ix.is_present("login_page", "email_field").await.unwrap());
        }

        #[tokio::test(start_paused = true)]
        async fn test_wait_visible_polls_until_shown() {
            let ix = interactor();
            let handle = ix
                .driver()
                .add_element(sign_in(), MockElement::new("Sign In").shows_after(2));
            let found = ix.wait_visible("login_page", "sign_in_button").await.unwrap();
            assert_eq!(found, Some(handle));
        }

        #[tokio::test(start_paused = true)]
        async fn test_find_all() {
            let ix = interactor();
            let sel = Selector::class_name("card");
            for name in ["Acme", "Birch", "Cedar"] {
                ix.driver().add_element(sel.clone(), MockElement::new(name));
            }
            assert_eq!(ix.find_all("login_page", "cards").await.unwrap().len(), 3);
            assert!(ix
                .find_all("login_page", "general_error")
                .await
                .unwrap()
                .is_empty());
        }
    }

    mod click_tests {
        use super::*;

        /// Make the first `n` rungs of the click ladder fail
        fn fail_first(driver: &MockDriver, n: usize) {
            if n >= 1 {
                driver.fail_times(MockChannel::Click, if n >= 4 { 2 } else { 1 });
            }
            if n >= 2 {
                driver.fail_times(MockChannel::PointerClick, 1);
            }
            if n >= 3 {
                driver.fail_times(MockChannel::Script(ScriptKind::DispatchClick), 1);
            }
            if n >= 4 {
                driver.fail_times(MockChannel::Script(ScriptKind::InvokeClick), 1);
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_escalates_in_order() {
            let ladder = Action::Click.ladder();
            for n in 0..ladder.len() {
                let ix = interactor();
                ix.driver().add_element(sign_in(), MockElement::new("Sign In"));
                fail_first(ix.driver(), n);

                let outcome = ix.click("login_page", "sign_in_button").await.unwrap();
                assert_eq!(
                    outcome,
                    Outcome::Done {
                        value: (),
                        via: ladder[n],
                        attempts: n + 1
                    },
                    "failing {n} strategies"
                );
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_pointer_sequence_moves_then_clicks() {
            let ix = interactor();
            let el = ix.driver().add_element(sign_in(), MockElement::new("Sign In"));
            ix.driver().fail_times(MockChannel::Click, 1);
            ix.click("login_page", "sign_in_button").await.unwrap();

            let history = ix.driver().history();
            let move_at = history
                .iter()
                .position(|h| *h == format!("pointer_move:{}", el.id))
                .unwrap();
            let click_at = history.iter().position(|h| h == "pointer_click").unwrap();
            assert!(move_at < click_at);
        }

        #[tokio::test(start_paused = true)]
        async fn test_exhaustion_is_distinct_from_absence() {
            let tmp = tempfile::tempdir().unwrap();
            let ix = interactor_with(options().with_screenshot_on_failure(true))
                .with_recorder(ScreenshotRecorder::new(tmp.path()));
            ix.driver().add_element(sign_in(), MockElement::new("Sign In"));
            for channel in [
                MockChannel::Click,
                MockChannel::PointerClick,
                MockChannel::Script(ScriptKind::DispatchClick),
                MockChannel::Script(ScriptKind::InvokeClick),
            ] {
                ix.driver().fail_always(channel);
            }

            let err = ix.click("login_page", "sign_in_button").await.unwrap_err();
            let ScopeError::InteractionExhausted {
                action,
                target,
                failures,
                screenshot,
            } = err
            else {
                panic!("expected exhaustion");
            };
            assert_eq!(action, "click");
            assert_eq!(target, "login_page.sign_in_button");
            let order: Vec<_> = failures.iter().map(|f| f.strategy).collect();
            assert_eq!(order, Action::Click.ladder().to_vec());
            let shot = screenshot.unwrap();
            assert!(shot.starts_with(tmp.path()));
            assert!(shot
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("click_login_page_sign_in_button_"));
            // final rung retried the native click
            assert_eq!(ix.driver().call_count("click:"), 1 + 3);
        }

        #[tokio::test(start_paused = true)]
        async fn test_disabled_control_is_not_clickable() {
            let ix = interactor();
            let el = ix
                .driver()
                .add_element(sign_in(), MockElement::new("Save").disabled());
            let start = Instant::now();
            let err = ix.click("login_page", "sign_in_button").await.unwrap_err();
            assert!(matches!(
                err,
                ScopeError::NotInteractable { ref message }
                    if message.contains("login_page.sign_in_button")
            ));
            assert!(start.elapsed() <= Duration::from_secs(2) + Duration::from_millis(250));
            assert!(ix.driver().was_called(&format!("is_enabled:{}", el.id)));
            assert!(!ix.driver().was_called("click:"));
            assert!(!ix.driver().was_called("pointer_click"));
            assert!(!ix.driver().was_called("script:"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_click_waits_until_enabled() {
            let ix = interactor();
            ix.driver()
                .add_element(sign_in(), MockElement::new("Verify").enables_after(2));
            let outcome = ix.click("login_page", "sign_in_button").await.unwrap();
            assert_eq!(outcome.via(), Some(FallbackStrategy::Direct));
            assert_eq!(ix.driver().call_count("is_enabled:"), 3);
        }

        #[tokio::test(start_paused = true)]
        async fn test_stale_handle_is_found_again() {
            let ix = interactor_with(options().with_settle_delay(Duration::from_millis(500)));
            ix.driver().add_element(sign_in(), MockElement::new("Sign In"));
            ix.driver().fail_times(MockChannel::Click, 1);

            // the page re-renders the button while the ladder settles
            let driver = ix.driver();
            let (outcome, fresh) = tokio::join!(ix.click("login_page", "sign_in_button"), async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                driver.rerender(&sign_in())
            });

            assert_eq!(
                outcome.unwrap(),
                Outcome::Done {
                    value: (),
                    via: FallbackStrategy::ScriptEvent,
                    attempts: 3
                }
            );
            assert!(driver.was_called(&format!("script:dispatch-click:{}", fresh[0].id)));
        }

        #[tokio::test(start_paused = true)]
        async fn test_retry_direct_finds_element_each_try() {
            let ix = interactor();
            ix.driver().add_element(sign_in(), MockElement::new("Sign In"));
            ix.driver().fail_times(MockChannel::Click, 2);
            ix.driver().fail_always(MockChannel::PointerClick);
            ix.driver()
                .fail_always(MockChannel::Script(ScriptKind::DispatchClick));
            ix.driver()
                .fail_always(MockChannel::Script(ScriptKind::InvokeClick));

            let outcome = ix.click("login_page", "sign_in_button").await.unwrap();
            assert_eq!(outcome.via(), Some(FallbackStrategy::RetryDirect));
            // presence and clickability lookups, then one per retry try
            assert_eq!(ix.driver().call_count("find:"), 2 + 2);
        }

        #[tokio::test(start_paused = true)]
        async fn test_fallbacks_disabled_runs_direct_only() {
            let ix = interactor_with(options().with_fallbacks(false));
            ix.driver().add_element(sign_in(), MockElement::new("Sign In"));
            ix.driver().fail_times(MockChannel::Click, 1);
            let err = ix.click("login_page", "sign_in_button").await.unwrap_err();
            assert!(matches!(err, ScopeError::InteractionExhausted { ref failures, .. } if failures.len() == 1));
            assert!(!ix.driver().was_called("pointer_move"));
        }
    }

    mod type_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_direct_replaces_value() {
            let ix = interactor();
            let el = ix
                .driver()
                .add_element(email(), MockElement::new("").with_value("old@x.io"));
            let outcome = ix
                .type_text("login_page", "email_field", "dealer@example.com")
                .await
                .unwrap();
            assert_eq!(outcome.via(), Some(FallbackStrategy::Direct));
            assert_eq!(
                ix.driver().value_of(&el).as_deref(),
                Some("dealer@example.com")
            );
        }

        #[tokio::test(start_paused = true)]
        async fn test_blocked_keys_fall_back_to_input_events() {
            let ix = interactor();
            let el = ix.driver().add_element(email(), MockElement::new(""));
            ix.driver().fail_always(MockChannel::SendKeys);
            let outcome = ix
                .type_text("login_page", "email_field", "dealer@example.com")
                .await
                .unwrap();
            assert_eq!(outcome.via(), Some(FallbackStrategy::ScriptEvent));
            assert_eq!(
                ix.driver().value_of(&el).as_deref(),
                Some("dealer@example.com")
            );
        }

        #[tokio::test(start_paused = true)]
        async fn test_assign_value_rung() {
            let ix = interactor();
            let el = ix.driver().add_element(email(), MockElement::new(""));
            ix.driver().fail_always(MockChannel::SendKeys);
            ix.driver()
                .fail_always(MockChannel::Script(ScriptKind::DispatchInput));
            let outcome = ix
                .type_text("login_page", "email_field", "a@b.co")
                .await
                .unwrap();
            assert_eq!(outcome.via(), Some(FallbackStrategy::ScriptInvoke));
            assert_eq!(ix.driver().value_of(&el).as_deref(), Some("a@b.co"));
        }
    }

    mod read_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_read_text_direct() {
            let ix = interactor();
            ix.driver().add_element(
                Selector::css("div.error"),
                MockElement::new("Invalid email or password"),
            );
            let text = ix.read_text("login_page", "general_error").await.unwrap();
            assert_eq!(text.into_value().as_deref(), Some("Invalid email or password"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_read_text_script_fallback() {
            let ix = interactor();
            ix.driver()
                .add_element(Selector::css("div.error"), MockElement::new("  Oops "));
            ix.driver().fail_times(MockChannel::Text, 1);
            let outcome = ix.read_text("login_page", "general_error").await.unwrap();
            assert_eq!(outcome.via(), Some(FallbackStrategy::ScriptInvoke));
            assert_eq!(outcome.into_value().as_deref(), Some("Oops"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_text_matches() {
            let ix = interactor();
            ix.driver().add_element(
                Selector::css("div.error"),
                MockElement::new("Error: Invalid email or password."),
            );
            assert!(ix
                .text_matches("login_page", "general_error", "invalid_credentials")
                .await
                .unwrap());
            let err = ix
                .text_matches("login_page", "general_error", "nope")
                .await
                .unwrap_err();
            assert!(matches!(err, ScopeError::TextMessageNotFound { .. }));
        }

        #[tokio::test(start_paused = true)]
        async fn test_blank_message_is_config_error() {
            let ix = interactor();
            ix.driver()
                .add_element(Selector::css("div.error"), MockElement::new("Anything"));
            let err = ix
                .text_matches("login_page", "general_error", "placeholder")
                .await
                .unwrap_err();
            assert!(matches!(err, ScopeError::Config { .. }));
            assert!(err.is_structural());
            assert!(!ix.driver().was_called("find"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_text_matches_absent_is_false() {
            let ix = interactor();
            assert!(!ix
                .text_matches("login_page", "general_error", "invalid_credentials")
                .await
                .unwrap());
        }

        #[tokio::test(start_paused = true)]
        async fn test_attribute() {
            let ix = interactor();
            ix.driver().add_element(
                email(),
                MockElement::new("").with_attribute("placeholder", "Email"),
            );
            assert_eq!(
                ix.attribute("login_page", "email_field", "placeholder")
                    .await
                    .unwrap()
                    .as_deref(),
                Some("Email")
            );
            assert_eq!(
                ix.attribute("login_page", "email_field", "title")
                    .await
                    .unwrap(),
                None
            );
        }

        #[tokio::test(start_paused = true)]
        async fn test_is_enabled() {
            let ix = interactor();
            assert!(!ix.is_enabled("login_page", "sign_in_button").await.unwrap());
            ix.driver()
                .add_element(sign_in(), MockElement::new("Sign In").disabled());
            assert!(!ix.is_enabled("login_page", "sign_in_button").await.unwrap());
            ix.driver().remove_elements(&sign_in());
            ix.driver().add_element(sign_in(), MockElement::new("Sign In"));
            assert!(ix.is_enabled("login_page", "sign_in_button").await.unwrap());
        }

        #[tokio::test(start_paused = true)]
        async fn test_scroll_fallback() {
            let ix = interactor();
            ix.driver().add_element(sign_in(), MockElement::new("Sign In"));
            ix.driver().fail_always(MockChannel::Scroll);
            let outcome = ix
                .scroll_into_view("login_page", "sign_in_button")
                .await
                .unwrap();
            assert_eq!(outcome.via(), Some(FallbackStrategy::ScriptInvoke));
        }
    }

    mod page_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_navigate_waits_for_ready_state() {
            let ix = interactor();
            ix.driver().set_loading_for(2);
            ix.navigate("https://demo-app.example.com/login").await.unwrap();
            assert_eq!(
                ix.current_url().await.unwrap(),
                "https://demo-app.example.com/login"
            );
            assert_eq!(ix.driver().call_count("execute:document.readyState"), 3);
        }

        #[tokio::test(start_paused = true)]
        async fn test_page_load_timeout_is_false() {
            let ix = interactor();
            ix.driver().set_loading_for(u32::MAX);
            assert!(!ix.wait_for_page_load().await.unwrap());
        }

        #[tokio::test(start_paused = true)]
        async fn test_wait_for_url_change() {
            let ix = interactor();
            ix.driver().set_url_after("https://demo-app.example.com/otp", 2);
            let changed = ix.wait_for_url_change("about:blank").await.unwrap();
            assert_eq!(changed.as_deref(), Some("https://demo-app.example.com/otp"));
            assert!(ix
                .wait_for_url_change("https://demo-app.example.com/otp")
                .await
                .unwrap()
                .is_none());
        }

        #[tokio::test(start_paused = true)]
        async fn test_back_refresh_and_windows() {
            let ix = interactor();
            ix.navigate("https://a.example.com").await.unwrap();
            ix.navigate("https://b.example.com").await.unwrap();
            ix.go_back().await.unwrap();
            assert_eq!(ix.current_url().await.unwrap(), "https://a.example.com");
            ix.refresh().await.unwrap();
            assert!(ix.driver().was_called("refresh"));

            ix.driver().add_window("report");
            let handles = ix.window_handles().await.unwrap();
            ix.switch_to_window(&handles[1]).await.unwrap();
            assert_eq!(ix.driver().current_window(), "report");
        }

        #[tokio::test]
        async fn test_capture_without_recorder() {
            let ix = interactor();
            assert!(ix.capture("anything").await.is_none());
            assert!(!ix.driver().was_called("screenshot"));
        }
    }
}
