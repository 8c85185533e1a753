//! Fallback ladder for interactions on flaky UI.
//!
//! Overlays, banners and animated modals intermittently swallow pointer
//! events. Instead of each call site carrying its own recovery, an action is
//! attempted through an ordered list of [`FallbackStrategy`] values, least
//! invasive first:
//!
//! ```text
//! Direct -> PointerSequence -> ScriptEvent -> ScriptInvoke -> RetryDirect
//! ```
//!
//! [`climb`] walks such a list, stopping at the first success. Later rungs
//! bypass real user-interaction semantics, so the order is fixed per action
//! by [`Action::ladder`].

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::result::{ScopeError, ScopeResult};
use crate::wait::settle;

/// One way of carrying out an interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackStrategy {
    /// Native driver action
    Direct,
    /// Pointer move, pause, then click at the pointer
    PointerSequence,
    /// Synthetic DOM events dispatched from page script
    ScriptEvent,
    /// Direct method or property use from page script
    ScriptInvoke,
    /// Native driver action again, retried a bounded number of times
    RetryDirect,
}

impl FallbackStrategy {
    /// Short name used in logs and reports
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::PointerSequence => "pointer_sequence",
            Self::ScriptEvent => "script_event",
            Self::ScriptInvoke => "script_invoke",
            Self::RetryDirect => "retry_direct",
        }
    }

    /// Whether the strategy acts through page script instead of the driver
    #[must_use]
    pub const fn is_script(&self) -> bool {
        matches!(self, Self::ScriptEvent | Self::ScriptInvoke)
    }
}

impl fmt::Display for FallbackStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full ladder: clicks and typing
pub const FULL_LADDER: &[FallbackStrategy] = &[
    FallbackStrategy::Direct,
    FallbackStrategy::PointerSequence,
    FallbackStrategy::ScriptEvent,
    FallbackStrategy::ScriptInvoke,
    FallbackStrategy::RetryDirect,
];

/// Text reads have no pointer or event rung
pub const READ_TEXT_LADDER: &[FallbackStrategy] = &[
    FallbackStrategy::Direct,
    FallbackStrategy::ScriptInvoke,
    FallbackStrategy::RetryDirect,
];

/// Scrolling falls back to `scrollIntoView` from script
pub const SCROLL_LADDER: &[FallbackStrategy] =
    &[FallbackStrategy::Direct, FallbackStrategy::ScriptInvoke];

/// Only the native action
pub const DIRECT_ONLY: &[FallbackStrategy] = &[FallbackStrategy::Direct];

/// Interaction kinds that escalate through a ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Click
    Click,
    /// Type text
    Type,
    /// Read text
    ReadText,
    /// Scroll into view
    Scroll,
}

impl Action {
    /// Ordered strategies for this action
    #[must_use]
    pub const fn ladder(&self) -> &'static [FallbackStrategy] {
        match self {
            Self::Click | Self::Type => FULL_LADDER,
            Self::ReadText => READ_TEXT_LADDER,
            Self::Scroll => SCROLL_LADDER,
        }
    }

    /// Name used in logs and errors
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Type => "type",
            Self::ReadText => "read_text",
            Self::Scroll => "scroll",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single rung
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    /// Strategy that failed
    pub strategy: FallbackStrategy,
    /// Error reported by the driver
    pub error: String,
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy, self.error)
    }
}

/// Result of walking a ladder
#[derive(Debug, Clone, PartialEq)]
pub enum Climb<T> {
    /// A rung succeeded
    Reached {
        /// Value produced by the successful rung
        value: T,
        /// Rung that succeeded
        via: FallbackStrategy,
        /// Number of rungs tried, including the successful one
        attempts: usize,
    },
    /// Every rung failed
    Exhausted(Vec<StepFailure>),
}

/// Outcome of one interaction request
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The action was carried out
    Done {
        /// Value produced (text for reads, `()` for actions)
        value: T,
        /// Strategy that succeeded
        via: FallbackStrategy,
        /// Number of strategies tried
        attempts: usize,
    },
    /// The element did not appear within the wait
    Absent,
}

impl<T> Outcome<T> {
    /// Whether the action was carried out
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }

    /// Whether the element was absent
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Strategy that succeeded, if any
    #[must_use]
    pub const fn via(&self) -> Option<FallbackStrategy> {
        match self {
            Self::Done { via, .. } => Some(*via),
            Self::Absent => None,
        }
    }

    /// Whether success needed a fallback
    #[must_use]
    pub fn used_fallback(&self) -> bool {
        self.via().is_some_and(|v| v != FallbackStrategy::Direct)
    }

    /// Produced value, `None` when absent
    #[must_use]
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Done { value, .. } => Some(value),
            Self::Absent => None,
        }
    }
}

/// Try `steps` in order until one succeeds.
///
/// `settle_delay` is slept between rungs. A structural error (bad locator,
/// bad config) aborts the climb and propagates; any other error is recorded
/// and the next rung is tried.
///
/// # Errors
///
/// Returns the first structural error raised by a rung.
pub async fn climb<T, F, Fut>(
    steps: &[FallbackStrategy],
    settle_delay: Duration,
    mut attempt: F,
) -> ScopeResult<Climb<T>>
where
    F: FnMut(FallbackStrategy) -> Fut,
    Fut: Future<Output = ScopeResult<T>>,
{
    let mut failures = Vec::with_capacity(steps.len());

    for (i, &strategy) in steps.iter().enumerate() {
        if i > 0 {
            settle(settle_delay).await;
        }
        match attempt(strategy).await {
            Ok(value) => {
                if i > 0 {
                    info!(%strategy, attempts = i + 1, "recovered through fallback");
                }
                return Ok(Climb::Reached {
                    value,
                    via: strategy,
                    attempts: i + 1,
                });
            }
            Err(e) if e.is_structural() => return Err(e),
            Err(e) => {
                debug!(%strategy, error = %e, "strategy failed");
                failures.push(StepFailure {
                    strategy,
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(Climb::Exhausted(failures))
}

/// Run `op` up to `attempts` times with `delay` between tries.
///
/// # Errors
///
/// Returns the last error when every try fails, or the first structural one.
pub async fn retry<T, F, Fut>(attempts: u32, delay: Duration, mut op: F) -> ScopeResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ScopeResult<T>>,
{
    let attempts = attempts.max(1);
    let mut last = None;
    for n in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_structural() => return Err(e),
            Err(e) => {
                debug!(attempt = n, of = attempts, error = %e, "retry failed");
                last = Some(e);
            }
        }
        if n < attempts {
            settle(delay).await;
        }
    }
    Err(last.unwrap_or_else(|| ScopeError::driver("retry ran no attempts")))
}
