//! Page workflows built on the interaction layer.

use std::fmt;

use tracing::warn;

use crate::ladder::Outcome;
use crate::result::ScopeResult;

pub mod login;
pub mod otp;

pub use login::{LoginPage, LoginResult, LoginStep, LOGIN_PAGE};
pub use otp::{OtpPage, OtpResult, OtpStep, OTP_PAGE};

/// Map an action outcome to "did it happen", keeping structural errors
pub(crate) fn step_done<S: fmt::Debug>(
    step: S,
    result: ScopeResult<Outcome<()>>,
) -> ScopeResult<bool> {
    match result {
        Ok(outcome) => {
            if outcome.is_absent() {
                warn!(?step, "workflow element not found");
            }
            Ok(outcome.is_done())
        }
        Err(e) if e.is_structural() => Err(e),
        Err(e) => {
            warn!(?step, error = %e, "workflow step failed");
            Ok(false)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::ladder::FallbackStrategy;
    use crate::result::ScopeError;

    #[test]
    fn test_step_done() {
        let done = Outcome::Done {
            value: (),
            via: FallbackStrategy::Direct,
            attempts: 1,
        };
        assert!(step_done("click", Ok(done)).unwrap());
        assert!(!step_done("click", Ok(Outcome::Absent)).unwrap());
        assert!(!step_done(
            "click",
            Err(ScopeError::NotInteractable {
                message: "disabled".into()
            })
        )
        .unwrap());
        assert!(step_done("click", Err(ScopeError::config("bad"))).is_err());
    }
}
