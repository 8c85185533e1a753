//! Command handlers

use dealerscope::{LocatorRegistry, Settings};
use tracing::debug;

use crate::commands::{Cli, Commands, ElementsArgs, ResolveArgs, TextArgs};
use crate::error::{CliError, CliResult};
use crate::output::{
    describe_source, CheckReport, ElementRow, InvalidRow, PageRow, Printer, ResolvedRow,
};

/// Settings from `--settings`, environment overrides, then `--locators`
#[must_use]
pub fn effective_settings(cli: &Cli) -> Settings {
    let mut settings = Settings::load(&cli.settings);
    settings.apply_env();
    if let Some(ref locators) = cli.locators {
        settings.locators_path.clone_from(locators);
    }
    settings
}

/// Run the parsed command line
pub fn run(cli: &Cli) -> CliResult<()> {
    let printer = Printer::new(cli.json, cli.quiet);
    let settings = effective_settings(cli);
    debug!(locators = %settings.locators_path.display(), "effective settings");

    let registry = || LocatorRegistry::load(&settings.locators_path);
    match &cli.command {
        Commands::Pages => run_pages(&registry(), printer),
        Commands::Elements(args) => run_elements(&registry(), args, printer),
        Commands::Resolve(args) => run_resolve(&registry(), args, printer),
        Commands::Text(args) => run_text(&registry(), args, printer),
        Commands::Check => run_check(&registry(), printer),
        Commands::Config => run_config(cli, &settings, printer),
        #[cfg(feature = "browser")]
        Commands::Inspect(args) => inspect::run_inspect(&settings, registry(), args, printer),
    }
}

fn run_pages(registry: &LocatorRegistry, printer: Printer) -> CliResult<()> {
    let rows: Vec<PageRow> = registry
        .list_pages()
        .into_iter()
        .map(|page| PageRow {
            page: page.to_string(),
            elements: registry.list_elements(page).len(),
        })
        .collect();

    if printer.json {
        return printer.emit(&rows);
    }
    printer.heading(&format!("Pages ({})", describe_source(registry.source())));
    for row in &rows {
        printer.data(format!("{:<32} {:>4} elements", row.page, row.elements));
    }
    Ok(())
}

fn run_elements(registry: &LocatorRegistry, args: &ElementsArgs, printer: Printer) -> CliResult<()> {
    let rows: Vec<ElementRow> = registry
        .page_entries(&args.page)
        .into_iter()
        .map(|(element, entry)| ElementRow::new(element, entry))
        .collect();
    if rows.is_empty() {
        return Err(CliError::unknown_page(&args.page));
    }

    if printer.json {
        return printer.emit(&rows);
    }
    printer.heading(&args.page);
    for row in &rows {
        let marker = if row.valid { "" } else { "  (unsupported)" };
        printer.data(format!(
            "{:<32} {}={}{marker}",
            row.element, row.strategy, row.value
        ));
    }
    Ok(())
}

fn run_resolve(registry: &LocatorRegistry, args: &ResolveArgs, printer: Printer) -> CliResult<()> {
    let selector = registry.resolve(&args.page, &args.element)?;
    if printer.json {
        return printer.emit(&ResolvedRow {
            page: args.page.clone(),
            element: args.element.clone(),
            strategy: selector.strategy.as_str().to_string(),
            value: selector.value,
        });
    }
    printer.data(selector);
    Ok(())
}

fn run_text(registry: &LocatorRegistry, args: &TextArgs, printer: Printer) -> CliResult<()> {
    let text = registry.resolve_text(&args.page, &args.key)?;
    if printer.json {
        return printer.emit(&serde_json::json!({
            "page": args.page,
            "key": args.key,
            "text": text,
        }));
    }
    printer.data(text);
    Ok(())
}

/// Build the health report for a registry
#[must_use]
pub fn check_report(registry: &LocatorRegistry) -> CheckReport {
    CheckReport {
        source: describe_source(registry.source()),
        defaults: registry.source().is_defaults(),
        pages: registry.list_pages().len(),
        elements: registry.len(),
        text_messages: registry.text_message_count(),
        invalid: registry
            .invalid_entries()
            .into_iter()
            .map(|e| InvalidRow {
                page: e.page,
                element: e.element,
                strategy: e.strategy,
            })
            .collect(),
    }
}

fn run_check(registry: &LocatorRegistry, printer: Printer) -> CliResult<()> {
    let report = check_report(registry);

    if printer.json {
        printer.emit(&report)?;
    } else {
        printer.heading(&format!("Locators: {}", report.source));
        if report.defaults {
            printer.problem("locator file not loaded, built-in defaults in use");
        } else {
            printer.ok(&format!(
                "{} pages, {} elements, {} text messages",
                report.pages, report.elements, report.text_messages
            ));
        }
        for invalid in &report.invalid {
            printer.problem(&format!(
                "{}.{} uses unsupported strategy '{}'",
                invalid.page, invalid.element, invalid.strategy
            ));
        }
    }

    match report.problems() {
        0 => Ok(()),
        problems => Err(CliError::CheckFailed { problems }),
    }
}

fn run_config(cli: &Cli, settings: &Settings, printer: Printer) -> CliResult<()> {
    // loading degrades silently; report a present but broken file here
    if cli.settings.exists() {
        Settings::from_path(&cli.settings).map_err(CliError::Settings)?;
    }
    settings.validate().map_err(CliError::Settings)?;
    if printer.json {
        return printer.emit(settings);
    }
    printer.data(settings.to_yaml()?.trim_end());
    Ok(())
}

#[cfg(feature = "browser")]
mod inspect {
    use std::sync::Arc;
    use std::time::Duration;

    use dealerscope::{
        ChromiumDriver, Driver, InteractionOptions, Interactor, LocatorEntry, LocatorRegistry,
        Settings,
    };
    use tracing::info;

    use crate::commands::InspectArgs;
    use crate::error::{CliError, CliResult};
    use crate::output::{Printer, InspectRow};

    pub fn run_inspect(
        settings: &Settings,
        registry: LocatorRegistry,
        args: &InspectArgs,
        printer: Printer,
    ) -> CliResult<()> {
        let elements: Vec<String> = registry
            .page_entries(&args.page)
            .into_iter()
            .filter(|(_, entry)| matches!(entry, LocatorEntry::Valid(_)))
            .map(|(element, _)| element.to_string())
            .collect();
        if elements.is_empty() {
            return Err(CliError::unknown_page(&args.page));
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        let rows = runtime.block_on(async {
            let mut browser = settings.browser.clone();
            if args.headed {
                browser.headless = false;
            }
            let driver = ChromiumDriver::launch(&browser).await?;
            let wait = Duration::from_secs(args.wait);
            let options = InteractionOptions::from_settings(settings)
                .with_timeout(wait)
                .with_visible_timeout(wait);
            let ix = Interactor::new(driver, Arc::new(registry), options);

            ix.navigate(&args.url).await?;
            info!(url = %args.url, page = %args.page, "probing elements");

            let mut rows = Vec::with_capacity(elements.len());
            for element in &elements {
                let present = ix.is_present(&args.page, element).await?;
                let visible = present && ix.is_visible(&args.page, element).await?;
                rows.push(InspectRow {
                    element: element.clone(),
                    present,
                    visible,
                });
            }
            ix.driver().close().await?;
            Ok::<_, CliError>(rows)
        })?;

        if printer.json {
            printer.emit(&rows)?;
        } else {
            printer.heading(&format!("{} @ {}", args.page, args.url));
            for row in &rows {
                let status = match (row.present, row.visible) {
                    (true, true) => "visible",
                    (true, false) => "present, hidden",
                    _ => "missing",
                };
                if row.present {
                    printer.ok(&format!("{:<32} {status}", row.element));
                } else {
                    printer.problem(&format!("{:<32} {status}", row.element));
                }
            }
        }

        match rows.iter().filter(|r| !r.present).count() {
            0 => Ok(()),
            problems => Err(CliError::CheckFailed { problems }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::Parser;

    const LOCATORS: &str = r#"
login_page:
  email_field: { by: id, value: company-email }
  promo_banner: { by: link_text, value: Promo }
text_messages:
  login_page:
    invalid_credentials: "Invalid email or password"
"#;

    #[test]
    fn test_locators_flag_wins() {
        let cli = Cli::try_parse_from([
            "dealerscope",
            "--settings",
            "does/not/exist.yaml",
            "--locators",
            "alt.yaml",
            "pages",
        ])
        .unwrap();
        let settings = effective_settings(&cli);
        assert_eq!(settings.locators_path, std::path::PathBuf::from("alt.yaml"));
    }

    #[test]
    fn test_check_report_counts_invalid_entries() {
        let registry = LocatorRegistry::from_yaml_str(LOCATORS).unwrap();
        let report = check_report(&registry);
        assert!(!report.defaults);
        assert_eq!(report.pages, 1);
        assert_eq!(report.elements, 2);
        assert_eq!(report.text_messages, 1);
        assert_eq!(report.invalid.len(), 1);
        assert_eq!(report.invalid[0].element, "promo_banner");
        assert_eq!(report.problems(), 1);
    }

    #[test]
    fn test_check_report_flags_defaults() {
        let report = check_report(&LocatorRegistry::defaults());
        assert!(report.defaults);
        assert_eq!(report.problems(), 1);
    }

    #[test]
    fn test_unknown_page_is_an_error() {
        let registry = LocatorRegistry::from_yaml_str(LOCATORS).unwrap();
        let args = ElementsArgs {
            page: "nowhere".to_string(),
        };
        let err = run_elements(&registry, &args, Printer::new(false, true)).unwrap_err();
        assert!(matches!(err, CliError::UnknownPage { .. }));
    }
}
