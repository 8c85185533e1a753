//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use dealerscope::LogFormat;
use std::path::PathBuf;

/// Dealerscope: inspect and health-check the locator file of the valuation UI suite
#[derive(Parser, Debug)]
#[command(name = "dealerscope")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Settings file
    #[arg(
        long,
        global = true,
        env = "DEALERSCOPE_SETTINGS",
        default_value = "config/settings.yaml"
    )]
    pub settings: PathBuf,

    /// Locator file (overrides the settings and DEALERSCOPE_LOCATORS)
    #[arg(short, long, global = true)]
    pub locators: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log output format (text, json)
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List pages defined in the locator file
    Pages,

    /// List the elements of a page
    Elements(ElementsArgs),

    /// Resolve a (page, element) pair to its selector
    Resolve(ResolveArgs),

    /// Look up an expected text message
    Text(TextArgs),

    /// Health-check the locator file
    ///
    /// Fails when the file could not be loaded (built-in defaults in use)
    /// or when any entry uses an unsupported strategy.
    Check,

    /// Show effective settings after environment overrides
    Config,

    /// Open a URL and report presence and visibility of a page's elements
    #[cfg(feature = "browser")]
    Inspect(InspectArgs),
}

/// Arguments for the elements command
#[derive(Parser, Debug)]
pub struct ElementsArgs {
    /// Page name
    pub page: String,
}

/// Arguments for the resolve command
#[derive(Parser, Debug)]
pub struct ResolveArgs {
    /// Page name
    pub page: String,

    /// Element key
    pub element: String,
}

/// Arguments for the text command
#[derive(Parser, Debug)]
pub struct TextArgs {
    /// Page name
    pub page: String,

    /// Message key
    pub key: String,
}

/// Arguments for the inspect command
#[cfg(feature = "browser")]
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// URL to open
    pub url: String,

    /// Page whose elements are inspected
    pub page: String,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Seconds to wait for each element
    #[arg(long, default_value = "2")]
    pub wait: u64,
}

/// Color output choice
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Detect from the terminal
    #[default]
    Auto,
    /// Always color
    Always,
    /// Never color
    Never,
}
