//! Dealerscope CLI: inspect and health-check locator files
//!
//! ## Usage
//!
//! ```bash
//! dealerscope pages                             # Pages and element counts
//! dealerscope elements login_page               # Entries of one page
//! dealerscope resolve login_page email_field    # Selector for a key
//! dealerscope check --locators config/locators.yaml
//! dealerscope config --json                     # Effective settings
//! ```

#![warn(missing_docs)]

mod commands;
mod error;
mod handlers;
mod output;

pub use commands::{Cli, ColorArg, Commands, ElementsArgs, ResolveArgs, TextArgs};
#[cfg(feature = "browser")]
pub use commands::InspectArgs;
pub use error::{CliError, CliResult};
pub use handlers::{check_report, effective_settings, run};
pub use output::{apply_color, CheckReport, ElementRow, PageRow, Printer, ResolvedRow};
