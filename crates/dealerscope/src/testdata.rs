//! Test data: per-role credentials, login scenarios and OTP codes.
//!
//! The YAML document mirrors what a suite needs to drive the login and OTP
//! workflows without hard-coding accounts. Real passwords belong in the
//! environment: `DEALERSCOPE_<ROLE>_EMAIL` and `DEALERSCOPE_<ROLE>_PASSWORD`
//! override the file for any role they name.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::result::{ScopeError, ScopeResult};

/// Prefix of the per-role credential variables
const ENV_PREFIX: &str = "DEALERSCOPE_";

/// Login credentials for one role
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Login email or user name
    pub email: String,
    /// Password
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// What a scenario expects from the login attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    /// The user gets past the login page
    Success,
    /// The login page rejects the attempt
    Failure,
}

/// One data-driven login case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginScenario {
    /// Short identifier, used for screenshots
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Email to enter
    #[serde(default)]
    pub email: String,
    /// Password to enter
    #[serde(default)]
    pub password: String,
    /// Whether to tick the terms checkbox
    #[serde(default = "default_accept_terms")]
    pub accept_terms: bool,
    /// Expected result
    pub expected: Expectation,
}

const fn default_accept_terms() -> bool {
    true
}

/// OTP codes for the verification page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtpCodes {
    /// Code the test environment accepts
    pub valid: String,
    /// Code it rejects
    pub invalid: String,
}

impl Default for OtpCodes {
    fn default() -> Self {
        Self {
            valid: "99999".to_string(),
            invalid: "12345".to_string(),
        }
    }
}

/// Test data document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestData {
    /// Credentials keyed by role, e.g. `valid_user`
    pub credentials: BTreeMap<String, Credentials>,
    /// Login scenarios keyed by kind, e.g. `positive`
    pub scenarios: BTreeMap<String, Vec<LoginScenario>>,
    /// OTP codes
    pub otp: OtpCodes,
}

impl TestData {
    /// Load from `path`, falling back to an empty document
    #[must_use]
    pub fn load(path: &Path) -> Self {
        match Self::from_path(path) {
            Ok(data) => {
                info!(
                    path = %path.display(),
                    roles = data.credentials.len(),
                    "loaded test data"
                );
                data
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "using empty test data");
                Self::default()
            }
        }
    }

    /// Read a test data file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> ScopeResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Parse a test data document
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed.
    pub fn from_yaml_str(yaml: &str) -> ScopeResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Credentials for `role`
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the role is not defined.
    pub fn credentials(&self, role: &str) -> ScopeResult<&Credentials> {
        self.credentials
            .get(role)
            .ok_or_else(|| ScopeError::config(format!("no credentials for role '{role}'")))
    }

    /// Scenarios of `kind`; empty when none are defined
    #[must_use]
    pub fn scenarios(&self, kind: &str) -> &[LoginScenario] {
        self.scenarios.get(kind).map(Vec::as_slice).unwrap_or_default()
    }

    /// Defined roles, sorted
    #[must_use]
    pub fn roles(&self) -> Vec<&str> {
        self.credentials.keys().map(String::as_str).collect()
    }

    /// Apply per-role overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply per-role overrides from an arbitrary variable source; only roles
    /// already in the document are looked up
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for (role, creds) in &mut self.credentials {
            let (email_key, password_key) = env_keys(role);
            if let Some(v) = lookup(&email_key) {
                debug!(role = %role, "email override");
                creds.email = v;
            }
            if let Some(v) = lookup(&password_key) {
                debug!(role = %role, "password override");
                creds.password = v;
            }
        }
    }

    /// Set credentials for `role` from its variables when both are present
    pub fn credentials_from_env<F>(&mut self, role: &str, lookup: F) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        let (email_key, password_key) = env_keys(role);
        match (lookup(&email_key), lookup(&password_key)) {
            (Some(email), Some(password)) => {
                self.credentials
                    .insert(role.to_string(), Credentials { email, password });
                true
            }
            _ => false,
        }
    }
}

/// `DEALERSCOPE_<ROLE>_EMAIL` and `DEALERSCOPE_<ROLE>_PASSWORD`
fn env_keys(role: &str) -> (String, String) {
    let role = role.to_ascii_uppercase().replace(['-', ' '], "_");
    (
        format!("{ENV_PREFIX}{role}_EMAIL"),
        format!("{ENV_PREFIX}{role}_PASSWORD"),
    )
}
