//! OTP verification workflow.
//!
//! The page follows a successful login. It has one code field, a verify
//! button and a resend link; a correct code redirects away from the page,
//! a wrong or expired one leaves the browser on it with an error shown.

use tracing::{debug, info};

use super::step_done;
use crate::config::Settings;
use crate::driver::Driver;
use crate::interaction::Interactor;
use crate::page::{url_path, PageObject, PageScope};
use crate::registry::COMMON;
use crate::result::ScopeResult;

/// Locator namespace of the OTP page
pub const OTP_PAGE: &str = "otp_page";

/// Page-specific error elements, most specific first
const ERROR_ELEMENTS: &[&str] = &[
    "invalid_otp_error",
    "otp_expired_error",
    "otp_required_error",
];

/// Application-wide error element tried after the page-specific ones
const COMMON_ERROR: &str = "any_error";

/// OTP verification step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpStep {
    /// The browser is not on a loaded OTP page
    Page,
    /// Filling the code field
    Code,
    /// Clicking verify
    Verify,
    /// Clicking the resend link
    Resend,
}

/// Result of submitting a code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpResult {
    /// The code was entered and verify clicked
    Submitted,
    /// Verification could not be submitted at `step`
    Incomplete {
        /// Step that failed
        step: OtpStep,
    },
}

impl OtpResult {
    /// Whether the code was submitted
    #[must_use]
    pub const fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted)
    }
}

/// Page object for OTP verification
#[derive(Debug)]
pub struct OtpPage<'a, D> {
    interactor: &'a Interactor<D>,
    url: String,
    pattern: String,
}

impl<D> PageObject for OtpPage<'_, D> {
    fn page_name(&self) -> &str {
        OTP_PAGE
    }

    fn url_pattern(&self) -> &str {
        &self.pattern
    }

    fn ready_elements(&self) -> &[&'static str] {
        &["otp_input", "verify_button"]
    }
}

impl<'a, D: Driver> OtpPage<'a, D> {
    /// OTP page at `settings.otp_url`
    #[must_use]
    pub fn new(interactor: &'a Interactor<D>, settings: &Settings) -> Self {
        Self::at(interactor, settings.otp_url.clone())
    }

    /// OTP page at an explicit URL
    #[must_use]
    pub fn at(interactor: &'a Interactor<D>, url: impl Into<String>) -> Self {
        let url = url.into();
        let pattern = url_path(&url).to_string();
        Self {
            interactor,
            url,
            pattern,
        }
    }

    fn scope(&self) -> PageScope<'a, D> {
        PageScope::new(self.interactor, OTP_PAGE)
    }

    /// OTP page URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Navigate straight to the OTP page
    pub async fn open(&self) -> ScopeResult<()> {
        self.interactor.navigate(&self.url).await
    }

    /// Whether the browser is on the OTP page and its form is present
    pub async fn is_loaded(&self) -> ScopeResult<bool> {
        let current = self.interactor.current_url().await?;
        if !self.matches_url(&current) {
            info!(%current, expected = %self.pattern, "not on the OTP page");
            return Ok(false);
        }
        self.scope().is_loaded(self.ready_elements()).await
    }

    /// Fill the code field
    pub async fn enter_otp(&self, code: &str) -> ScopeResult<bool> {
        step_done(OtpStep::Code, self.scope().type_text("otp_input", code).await)
    }

    /// Click verify
    pub async fn click_verify(&self) -> ScopeResult<bool> {
        step_done(OtpStep::Verify, self.scope().click("verify_button").await)
    }

    /// Enter `code` and click verify, provided the OTP page is loaded.
    ///
    /// Whether the code was accepted is for the caller to check, e.g. with
    /// [`OtpPage::wait_for_redirect`] or [`OtpPage::otp_error_message`].
    pub async fn verify_otp(&self, code: &str) -> ScopeResult<OtpResult> {
        if !self.is_loaded().await? {
            return Ok(OtpResult::Incomplete {
                step: OtpStep::Page,
            });
        }
        if !self.enter_otp(code).await? {
            return Ok(OtpResult::Incomplete {
                step: OtpStep::Code,
            });
        }
        if !self.click_verify().await? {
            return Ok(OtpResult::Incomplete {
                step: OtpStep::Verify,
            });
        }
        info!("OTP submitted");
        Ok(OtpResult::Submitted)
    }

    /// Submit `code` and wait for the browser to leave the OTP page; the new
    /// URL, or `None` when verification was not submitted or no redirect
    /// happened in time
    pub async fn verify_and_wait(&self, code: &str) -> ScopeResult<Option<String>> {
        let from = self.interactor.current_url().await?;
        if !self.verify_otp(code).await?.is_submitted() {
            return Ok(None);
        }
        self.wait_for_redirect(&from).await
    }

    /// Wait for the URL to move away from `from` and off the OTP page
    pub async fn wait_for_redirect(&self, from: &str) -> ScopeResult<Option<String>> {
        let redirected = self
            .interactor
            .wait_for_url_change(from)
            .await?
            .filter(|url| !self.matches_url(url));
        match &redirected {
            Some(url) => info!(%url, "redirected after OTP"),
            None => debug!(from, "no redirect after OTP"),
        }
        Ok(redirected)
    }

    /// Click the resend link
    pub async fn resend_otp(&self) -> ScopeResult<bool> {
        step_done(OtpStep::Resend, self.scope().click("resend_link").await)
    }

    /// First non-blank error shown: the configured page-specific error
    /// elements in order, then the application-wide error element
    pub async fn otp_error_message(&self) -> ScopeResult<Option<String>> {
        let registry = self.interactor.registry();
        let candidates = ERROR_ELEMENTS
            .iter()
            .map(|element| (OTP_PAGE, *element))
            .chain(std::iter::once((COMMON, COMMON_ERROR)))
            .filter(|(page, element)| registry.contains(page, element));

        for (page, element) in candidates {
            let text = self.interactor.read_text(page, element).await?.into_value();
            if let Some(text) = text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
                return Ok(Some(text));
            }
        }
        Ok(None)
    }

    /// Whether any error is shown
    pub async fn is_error_displayed(&self) -> ScopeResult<bool> {
        Ok(self.otp_error_message().await?.is_some())
    }

    /// Whether the verify button accepts clicks
    pub async fn is_verify_enabled(&self) -> ScopeResult<bool> {
        self.scope().is_enabled("verify_button").await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::InteractionOptions;
    use crate::driver::{MockDriver, MockElement};
    use crate::locator::Selector;
    use crate::registry::LocatorRegistry;
    use std::sync::Arc;
    use std::time::Duration;

    const OTP_URL: &str = "https://demo-app.example.com/auth/otp-verify";
    const HOME_URL: &str = "https://demo-app.example.com/home";

    const LOCATORS: &str = r#"
otp_page:
  otp_input: { by: css, value: "input[autocomplete=one-time-code]" }
  verify_button: "//button[normalize-space()='Verify']"
  resend_link: "//a[contains(normalize-space(),'Resend')]"
  invalid_otp_error: { by: css, value: ".otp-invalid" }
  otp_expired_error: { by: css, value: ".otp-expired" }
common:
  any_error: { by: css, value: ".ant-message-error" }
"#;

    fn input() -> Selector {
        Selector::css("input[autocomplete=one-time-code]")
    }

    fn verify() -> Selector {
        Selector::xpath("//button[normalize-space()='Verify']")
    }

    fn interactor() -> Interactor<MockDriver> {
        let registry = LocatorRegistry::from_yaml_str(LOCATORS).unwrap();
        let opts = InteractionOptions::default()
            .with_timeout(Duration::from_secs(1))
            .with_visible_timeout(Duration::from_secs(2))
            .without_delays()
            .with_screenshot_on_failure(false);
        Interactor::new(MockDriver::new(), Arc::new(registry), opts)
    }

    #[tokio::test(start_paused = true)]
    async fn test_verify_otp_submits() {
        let ix = interactor();
        let field = ix.driver().add_element(input(), MockElement::new(""));
        ix.driver().add_element(verify(), MockElement::new("Verify"));

        let page = OtpPage::at(&ix, OTP_URL);
        page.open().await.unwrap();
        assert!(page.is_loaded().await.unwrap());
        assert!(page.is_verify_enabled().await.unwrap());

        let result = page.verify_otp("99999").await.unwrap();
        assert!(result.is_submitted());
        assert_eq!(ix.driver().value_of(&field).as_deref(), Some("99999"));
        assert!(ix.driver().was_called("click:"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_code_stays_out_of_logs() {
        let (logs, _guard) = crate::workflows::log_capture::capture();
        let ix = interactor();
        ix.driver().add_element(input(), MockElement::new(""));
        ix.driver().add_element(verify(), MockElement::new("Verify"));

        let page = OtpPage::at(&ix, OTP_URL);
        page.open().await.unwrap();
        assert!(page.verify_otp("86420").await.unwrap().is_submitted());

        let text = logs.text();
        assert!(text.contains("OTP submitted"));
        assert!(!text.contains("86420"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_off_page_is_incomplete() {
        let ix = interactor();
        ix.driver().add_element(input(), MockElement::new(""));
        ix.driver().add_element(verify(), MockElement::new("Verify"));
        ix.navigate("https://demo-app.example.com/login").await.unwrap();

        let page = OtpPage::at(&ix, OTP_URL);
        assert_eq!(
            page.verify_otp("99999").await.unwrap(),
            OtpResult::Incomplete {
                step: OtpStep::Page
            }
        );
        assert!(!ix.driver().was_called("send_keys"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_verify_is_incomplete() {
        let ix = interactor();
        ix.driver().add_element(input(), MockElement::new(""));
        ix.driver()
            .add_element(verify(), MockElement::new("Verify").disabled());

        let page = OtpPage::at(&ix, OTP_URL);
        page.open().await.unwrap();
        assert!(!page.is_verify_enabled().await.unwrap());
        assert_eq!(
            page.verify_otp("123").await.unwrap(),
            OtpResult::Incomplete {
                step: OtpStep::Verify
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_resend() {
        let ix = interactor();
        let page = OtpPage::at(&ix, OTP_URL);
        assert!(!page.resend_otp().await.unwrap());

        ix.driver().add_element(
            Selector::xpath("//a[contains(normalize-space(),'Resend')]"),
            MockElement::new("Resend OTP"),
        );
        assert!(page.resend_otp().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_message_skips_blank_and_keeps_order() {
        let ix = interactor();
        let page = OtpPage::at(&ix, OTP_URL);
        assert_eq!(page.otp_error_message().await.unwrap(), None);
        assert!(!page.is_error_displayed().await.unwrap());

        ix.driver()
            .add_element(Selector::css(".otp-invalid"), MockElement::new("   "));
        ix.driver().add_element(
            Selector::css(".otp-expired"),
            MockElement::new(" OTP has expired "),
        );
        ix.driver().add_element(
            Selector::css(".ant-message-error"),
            MockElement::new("Something went wrong"),
        );
        assert_eq!(
            page.otp_error_message().await.unwrap().as_deref(),
            Some("OTP has expired")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_message_falls_back_to_common() {
        let ix = interactor();
        ix.driver().add_element(
            Selector::css(".ant-message-error"),
            MockElement::new("Invalid OTP"),
        );
        let page = OtpPage::at(&ix, OTP_URL);
        assert_eq!(
            page.otp_error_message().await.unwrap().as_deref(),
            Some("Invalid OTP")
        );
        assert!(page.is_error_displayed().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_verify_and_wait_follows_redirect() {
        let ix = interactor();
        ix.driver().add_element(input(), MockElement::new(""));
        ix.driver().add_element(verify(), MockElement::new("Verify"));
        let page = OtpPage::at(&ix, OTP_URL);
        page.open().await.unwrap();

        // the start URL and the loaded check read the old URL, the wait sees the new one
        ix.driver().set_url_after(HOME_URL, 3);
        assert_eq!(
            page.verify_and_wait("99999").await.unwrap().as_deref(),
            Some(HOME_URL)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_redirect_when_code_rejected() {
        let ix = interactor();
        ix.driver().add_element(input(), MockElement::new(""));
        ix.driver().add_element(verify(), MockElement::new("Verify"));
        let page = OtpPage::at(&ix, OTP_URL);
        page.open().await.unwrap();

        assert_eq!(page.verify_and_wait("12345").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_staying_on_otp_page_is_not_a_redirect() {
        let ix = interactor();
        let page = OtpPage::at(&ix, OTP_URL);
        page.open().await.unwrap();
        ix.driver().set_url_after(format!("{OTP_URL}?retry=1"), 0);
        assert_eq!(page.wait_for_redirect(OTP_URL).await.unwrap(), None);
    }

    #[test]
    fn test_page_object_metadata() {
        let ix = interactor();
        let page = OtpPage::new(&ix, &Settings::default());
        assert_eq!(page.page_name(), OTP_PAGE);
        assert_eq!(page.url(), Settings::default().otp_url);
        assert_eq!(page.url_pattern(), "/auth/otp-verify");
        assert!(page.matches_url("https://demo-app.example.com/auth/otp-verify?email=x"));
        assert_eq!(page.ready_elements(), &["otp_input", "verify_button"]);
    }
}
