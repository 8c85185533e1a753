//! Failure screenshots.
//!
//! Files are named `<scenario>_<YYYYmmdd_HHMMSS>.png` inside the configured
//! directory. Capture problems are logged and swallowed: a screenshot is a
//! diagnostic, never the reason a run fails.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tracing::{info, warn};

use crate::config::Settings;
use crate::driver::Driver;
use crate::result::ScopeResult;

/// Timestamp layout used in file names
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Writes tagged screenshots into one directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenshotRecorder {
    dir: PathBuf,
}

impl ScreenshotRecorder {
    /// Recorder writing into `dir`
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Recorder for the configured screenshot directory
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.screenshots.dir.clone())
    }

    /// Output directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Capture the current page; `None` if anything went wrong
    pub async fn capture<D: Driver + ?Sized>(&self, driver: &D, scenario: &str) -> Option<PathBuf> {
        match self.try_capture(driver, scenario).await {
            Ok(path) => {
                info!(path = %path.display(), "screenshot saved");
                Some(path)
            }
            Err(e) => {
                warn!(scenario, error = %e, "screenshot failed");
                None
            }
        }
    }

    /// Capture the current page
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the driver
    /// fails to write the image.
    pub async fn try_capture<D: Driver + ?Sized>(
        &self,
        driver: &D,
        scenario: &str,
    ) -> ScopeResult<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.next_path(scenario, Local::now().naive_local()).await;
        driver.save_screenshot(&path).await?;
        Ok(path)
    }

    async fn next_path(&self, scenario: &str, at: NaiveDateTime) -> PathBuf {
        let stem = file_stem(scenario, at);
        let mut path = self.dir.join(format!("{stem}.png"));
        let mut n = 1;
        while tokio::fs::try_exists(&path).await.unwrap_or(false) {
            path = self.dir.join(format!("{stem}_{n}.png"));
            n += 1;
        }
        path
    }
}

/// Replace anything outside `[A-Za-z0-9_-]` with `_`
#[must_use]
pub fn sanitize_scenario(scenario: &str) -> String {
    let cleaned: String = scenario
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "screenshot".to_string()
    } else {
        cleaned
    }
}

/// `<scenario>_<YYYYmmdd_HHMMSS>`
#[must_use]
pub fn file_stem(scenario: &str, at: NaiveDateTime) -> String {
    format!(
        "{}_{}",
        sanitize_scenario(scenario),
        at.format(TIMESTAMP_FORMAT)
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::{MockChannel, MockDriver};
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 7)
            .unwrap()
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_scenario("login_page"), "login_page");
        assert_eq!(
            sanitize_scenario("click login_page.sign_in_button"),
            "click_login_page_sign_in_button"
        );
        assert_eq!(sanitize_scenario("../../etc"), "______etc");
        assert_eq!(sanitize_scenario("  "), "screenshot");
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("test_04", at()), "test_04_20240309_140507");
    }

    #[tokio::test]
    async fn test_capture_writes_into_new_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let recorder = ScreenshotRecorder::new(tmp.path().join("shots"));
        let driver = MockDriver::new();

        let path = recorder.capture(&driver, "valuation save").await.unwrap();
        assert!(path.starts_with(tmp.path().join("shots")));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("valuation_save_"));
        assert!(name.ends_with(".png"));
        assert!(path.exists());
        assert_eq!(driver.screenshots(), vec![path]);
    }

    #[tokio::test]
    async fn test_same_second_does_not_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let recorder = ScreenshotRecorder::new(tmp.path());
        std::fs::write(tmp.path().join(format!("{}.png", file_stem("x", at()))), b"").unwrap();
        let next = recorder.next_path("x", at()).await;
        assert_eq!(
            next.file_name().unwrap().to_string_lossy(),
            "x_20240309_140507_1.png"
        );
    }

    #[tokio::test]
    async fn test_capture_failure_is_swallowed() {
        let tmp = tempfile::tempdir().unwrap();
        let recorder = ScreenshotRecorder::new(tmp.path());
        let driver = MockDriver::new();
        driver.fail_always(MockChannel::Screenshot);
        assert!(recorder.capture(&driver, "boom").await.is_none());
        assert!(recorder.try_capture(&driver, "boom").await.is_err());
    }
}
