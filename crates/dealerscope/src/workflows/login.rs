//! Login page workflow.

use tracing::info;

use super::step_done;
use crate::config::Settings;
use crate::driver::Driver;
use crate::interaction::Interactor;
use crate::page::{url_path, PageObject, PageScope};
use crate::result::ScopeResult;

/// Locator namespace of the login page
pub const LOGIN_PAGE: &str = "login_page";

/// Login form step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStep {
    /// Filling the email field
    Email,
    /// Filling the password field
    Password,
    /// Ticking the terms checkbox
    Terms,
    /// Clicking sign in
    Submit,
}

/// Result of driving the login form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginResult {
    /// Every step went through and the form was submitted
    Submitted,
    /// The form could not be completed at `step`
    Incomplete {
        /// Step that failed
        step: LoginStep,
    },
}

impl LoginResult {
    /// Whether the form was submitted
    #[must_use]
    pub const fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted)
    }
}

/// Page object for the login form
#[derive(Debug)]
pub struct LoginPage<'a, D> {
    interactor: &'a Interactor<D>,
    url: String,
    pattern: String,
}

impl<D> PageObject for LoginPage<'_, D> {
    fn page_name(&self) -> &str {
        LOGIN_PAGE
    }

    fn url_pattern(&self) -> &str {
        &self.pattern
    }

    fn ready_elements(&self) -> &[&'static str] {
        &["email_field", "password_field", "terms_checkbox", "sign_in_button"]
    }
}

impl<'a, D: Driver> LoginPage<'a, D> {
    /// Login page at `settings.login_url`
    #[must_use]
    pub fn new(interactor: &'a Interactor<D>, settings: &Settings) -> Self {
        Self::at(interactor, settings.login_url.clone())
    }

    /// Login page at an explicit URL
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
        PageScope::new(self.interactor, LOGIN_PAGE)
    }

    /// Login URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Navigate to the login page
    pub async fn open(&self) -> ScopeResult<()> {
        self.interactor.navigate(&self.url).await
    }

    /// Fill the email field
    pub async fn enter_email(&self, email: &str) -> ScopeResult<bool> {
        step_done(
            LoginStep::Email,
            self.scope().type_text("email_field", email).await,
        )
    }

    /// Fill the password field, trying `password_field_alt1` when the primary
    /// field cannot be filled and the alternative is configured
    pub async fn enter_password(&self, password: &str) -> ScopeResult<bool> {
        let scope = self.scope();
        if step_done(
            LoginStep::Password,
            scope.type_text("password_field", password).await,
        )? {
            return Ok(true);
        }
        if !self
            .interactor
            .registry()
            .contains(LOGIN_PAGE, "password_field_alt1")
        {
            return Ok(false);
        }
        info!("trying alternative password field");
        step_done(
            LoginStep::Password,
            scope.type_text("password_field_alt1", password).await,
        )
    }

    /// Tick the terms checkbox
    pub async fn accept_terms(&self) -> ScopeResult<bool> {
        step_done(LoginStep::Terms, self.scope().click("terms_checkbox").await)
    }

    /// Click sign in
    pub async fn submit(&self) -> ScopeResult<bool> {
        step_done(
            LoginStep::Submit,
            self.scope().click("sign_in_button").await,
        )
    }

    /// Open the page, fill the form and submit it.
    ///
    /// Stops at the first step that cannot be completed. Whether the login
    /// succeeded is for the caller to verify, e.g. with
    /// [`LoginPage::wait_for_transition`].
    pub async fn perform_login(
        &self,
        email: &str,
        password: &str,
        accept_terms: bool,
    ) -> ScopeResult<LoginResult> {
        self.open().await?;

        if !self.enter_email(email).await? {
            return Ok(LoginResult::Incomplete {
                step: LoginStep::Email,
            });
        }
        if !self.enter_password(password).await? {
            return Ok(LoginResult::Incomplete {
                step: LoginStep::Password,
            });
        }
        if accept_terms && !self.accept_terms().await? {
            return Ok(LoginResult::Incomplete {
                step: LoginStep::Terms,
            });
        }
        if !self.submit().await? {
            return Ok(LoginResult::Incomplete {
                step: LoginStep::Submit,
            });
        }
        info!("login form submitted");
        Ok(LoginResult::Submitted)
    }

    /// Whether every form element is present
    pub async fn is_loaded(&self) -> ScopeResult<bool> {
        self.scope().is_loaded(self.ready_elements()).await
    }

    /// Text of the general error banner, if shown
    pub async fn error_message(&self) -> ScopeResult<Option<String>> {
        Ok(self.scope().read_text("general_error").await?.into_value())
    }

    /// Whether the loading indicator is present
    pub async fn is_loading(&self) -> ScopeResult<bool> {
        self.scope().is_present("loading_indicator").await
    }

    /// Wait for the URL to move away from `from`; the new URL if it did
    pub async fn wait_for_transition(&self, from: &str) -> ScopeResult<Option<String>> {
        self.interactor.wait_for_url_change(from).await
    }
}
