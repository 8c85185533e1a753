//! CDP driver backed by chromiumoxide.
//!
//! Element handles are keyed by the DOM backend node id, so finding the same
//! node again reuses its entry and the map only grows with distinct nodes.
//! The map is cleared on every navigation, so handles from a previous
//! document fail as stale.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Mutex as StdMutex, PoisonError};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::layout::Point as CdpPoint;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::BrowserSettings;
use crate::driver::{Driver, ElementHandle};
use crate::locator::{Selector, Strategy};
use crate::result::{ScopeError, ScopeResult};
use crate::scripts;

/// Whether the element itself receives a pointer event at its center
const HIT_TEST: &str = "function() {
    const r = this.getBoundingClientRect();
    const hit = document.elementFromPoint(r.left + r.width / 2, r.top + r.height / 2);
    return !hit || hit === this || this.contains(hit);
}";

const CLEAR_VALUE: &str = "function() {
    this.value = '';
    this.dispatchEvent(new Event('input', { bubbles: true }));
    return true;
}";

const IS_ENABLED: &str = "function() { return !this.disabled; }";

/// Driver for a locally launched Chromium
pub struct ChromiumDriver {
    browser: Mutex<Browser>,
    page: Mutex<Page>,
    elements: Mutex<HashMap<String, Element>>,
    pointer: StdMutex<Option<(f64, f64)>>,
    handler: JoinHandle<()>,
}

impl fmt::Debug for ChromiumDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChromiumDriver").finish_non_exhaustive()
    }
}

impl Drop for ChromiumDriver {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Handle id for a DOM node, stable across repeated lookups
fn handle_id(backend_node_id: i64) -> String {
    format!("node-{backend_node_id}")
}

fn node_key(el: &Element) -> String {
    handle_id(*el.backend_node_id.inner())
}

fn stale(handle: &ElementHandle) -> ScopeError {
    ScopeError::StaleElement {
        id: handle.id.clone(),
    }
}

/// Map a CDP failure on an element to the closest interaction error
fn element_error(handle: &ElementHandle, e: &CdpError) -> ScopeError {
    let message = e.to_string();
    let lower = message.to_ascii_lowercase();
    if lower.contains("could not find node")
        || lower.contains("no node")
        || lower.contains("not attached")
    {
        stale(handle)
    } else if lower.contains("box model") || lower.contains("not visible") {
        ScopeError::NotInteractable { message }
    } else {
        ScopeError::Driver { message }
    }
}

fn driver_error(e: &CdpError) -> ScopeError {
    ScopeError::driver(e.to_string())
}

impl ChromiumDriver {
    /// Launch Chromium and open a blank page
    ///
    /// # Errors
    ///
    /// Returns error if the browser cannot be started
    pub async fn launch(settings: &BrowserSettings) -> ScopeResult<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(settings.window_width, settings.window_height)
            .arg("--disable-dev-shm-usage");

        if !settings.headless {
            builder = builder.with_head();
        }
        if !settings.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = settings.chromium_path {
            builder = builder.chrome_executable(path);
        }

        let config = builder
            .build()
            .map_err(|message| ScopeError::BrowserLaunch { message })?;

        let (browser, mut handler) =
            Browser::launch(config)
                .await
                .map_err(|e| ScopeError::BrowserLaunch {
                    message: e.to_string(),
                })?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    debug!("CDP handler loop ended");
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScopeError::BrowserLaunch {
                message: e.to_string(),
            })?;

        info!(
            headless = settings.headless,
            width = settings.window_width,
            height = settings.window_height,
            "chromium launched"
        );

        Ok(Self {
            browser: Mutex::new(browser),
            page: Mutex::new(page),
            elements: Mutex::new(HashMap::new()),
            pointer: StdMutex::new(None),
            handler,
        })
    }

    async fn page(&self) -> Page {
        self.page.lock().await.clone()
    }

    async fn call(&self, handle: &ElementHandle, function: &str) -> ScopeResult<Value> {
        let elements = self.elements.lock().await;
        let el = elements.get(&handle.id).ok_or_else(|| stale(handle))?;
        let returns = el
            .call_js_fn(function, false)
            .await
            .map_err(|e| element_error(handle, &e))?;
        if let Some(exception) = returns.exception_details {
            return Err(ScopeError::script(exception.text));
        }
        Ok(returns.result.value.unwrap_or(Value::Null))
    }

    async fn call_bool(&self, handle: &ElementHandle, function: &str) -> ScopeResult<bool> {
        Ok(self.call(handle, function).await?.as_bool().unwrap_or(false))
    }

    async fn register(&self, found: Vec<Element>) -> Vec<ElementHandle> {
        let mut elements = self.elements.lock().await;
        found
            .into_iter()
            .map(|el| {
                let id = node_key(&el);
                // newest remote object wins; the previous one is released
                elements.insert(id.clone(), el);
                ElementHandle::new(id)
            })
            .collect()
    }
}

#[async_trait]
impl Driver for ChromiumDriver {
    async fn navigate(&self, url: &str) -> ScopeResult<()> {
        let page = self.page().await;
        page.goto(url)
            .await
            .map_err(|e| ScopeError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        self.elements.lock().await.clear();
        Ok(())
    }

    async fn current_url(&self) -> ScopeResult<String> {
        let page = self.page().await;
        Ok(page
            .url()
            .await
            .map_err(|e| driver_error(&e))?
            .unwrap_or_default())
    }

    async fn title(&self) -> ScopeResult<String> {
        let page = self.page().await;
        Ok(page
            .get_title()
            .await
            .map_err(|e| driver_error(&e))?
            .unwrap_or_default())
    }

    async fn refresh(&self) -> ScopeResult<()> {
        let page = self.page().await;
        page.reload().await.map_err(|e| driver_error(&e))?;
        self.elements.lock().await.clear();
        Ok(())
    }

    async fn go_back(&self) -> ScopeResult<()> {
        self.execute_script("history.back()").await?;
        self.elements.lock().await.clear();
        Ok(())
    }

    async fn execute_script(&self, script: &str) -> ScopeResult<Value> {
        let page = self.page().await;
        let result = page
            .evaluate(script)
            .await
            .map_err(|e| ScopeError::script(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn call_on_element(
        &self,
        element: &ElementHandle,
        function: &str,
    ) -> ScopeResult<Value> {
        self.call(element, function).await
    }

    async fn find_elements(&self, selector: &Selector) -> ScopeResult<Vec<ElementHandle>> {
        let page = self.page().await;
        let found = match (selector.strategy, selector.to_css()) {
            (Strategy::XPath, _) | (_, None) => page.find_xpaths(selector.value.as_str()).await,
            (_, Some(css)) => page.find_elements(css).await,
        }
        .map_err(|e| driver_error(&e))?;
        Ok(self.register(found).await)
    }

    async fn click(&self, element: &ElementHandle) -> ScopeResult<()> {
        if !self.call_bool(element, HIT_TEST).await? {
            return Err(ScopeError::Intercepted {
                message: format!("another element covers {}", element.id),
            });
        }
        let elements = self.elements.lock().await;
        let el = elements.get(&element.id).ok_or_else(|| stale(element))?;
        el.click().await.map_err(|e| element_error(element, &e))?;
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> ScopeResult<()> {
        self.call(element, CLEAR_VALUE).await.map(drop)
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> ScopeResult<()> {
        let elements = self.elements.lock().await;
        let el = elements.get(&element.id).ok_or_else(|| stale(element))?;
        el.focus().await.map_err(|e| element_error(element, &e))?;
        el.type_str(text)
            .await
            .map_err(|e| element_error(element, &e))?;
        Ok(())
    }

    async fn text(&self, element: &ElementHandle) -> ScopeResult<String> {
        let elements = self.elements.lock().await;
        let el = elements.get(&element.id).ok_or_else(|| stale(element))?;
        Ok(el
            .inner_text()
            .await
            .map_err(|e| element_error(element, &e))?
            .unwrap_or_default())
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> ScopeResult<Option<String>> {
        let elements = self.elements.lock().await;
        let el = elements.get(&element.id).ok_or_else(|| stale(element))?;
        el.attribute(name)
            .await
            .map_err(|e| element_error(element, &e))
    }

    async fn is_displayed(&self, element: &ElementHandle) -> ScopeResult<bool> {
        self.call_bool(element, scripts::IS_VISIBLE).await
    }

    async fn is_enabled(&self, element: &ElementHandle) -> ScopeResult<bool> {
        self.call_bool(element, IS_ENABLED).await
    }

    async fn move_pointer_to(&self, element: &ElementHandle) -> ScopeResult<()> {
        let point = {
            let elements = self.elements.lock().await;
            let el = elements.get(&element.id).ok_or_else(|| stale(element))?;
            el.clickable_point()
                .await
                .map_err(|e| element_error(element, &e))?
        };
        let page = self.page().await;
        page.move_mouse(point)
            .await
            .map_err(|e| ScopeError::NotInteractable {
                message: e.to_string(),
            })?;
        *self.pointer.lock().unwrap_or_else(PoisonError::into_inner) = Some((point.x, point.y));
        Ok(())
    }

    async fn pointer_click(&self) -> ScopeResult<()> {
        let at = *self.pointer.lock().unwrap_or_else(PoisonError::into_inner);
        let (x, y) = at.ok_or_else(|| ScopeError::NotInteractable {
            message: "pointer has not been moved onto an element".to_string(),
        })?;
        let page = self.page().await;
        page.click(CdpPoint::new(x, y))
            .await
            .map_err(|e| ScopeError::Intercepted {
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> ScopeResult<()> {
        let elements = self.elements.lock().await;
        let el = elements.get(&element.id).ok_or_else(|| stale(element))?;
        el.scroll_into_view()
            .await
            .map_err(|e| element_error(element, &e))?;
        Ok(())
    }

    async fn save_screenshot(&self, path: &Path) -> ScopeResult<()> {
        let page = self.page().await;
        let png = page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(false)
                    .build(),
            )
            .await
            .map_err(|e| ScopeError::Screenshot {
                message: e.to_string(),
            })?;
        tokio::fs::write(path, png).await?;
        Ok(())
    }

    async fn window_handles(&self) -> ScopeResult<Vec<String>> {
        let browser = self.browser.lock().await;
        let pages = browser.pages().await.map_err(|e| driver_error(&e))?;
        Ok(pages
            .iter()
            .map(|p| AsRef::<str>::as_ref(p.target_id()).to_string())
            .collect())
    }

    async fn switch_to_window(&self, handle: &str) -> ScopeResult<()> {
        let pages = {
            let browser = self.browser.lock().await;
            browser.pages().await.map_err(|e| driver_error(&e))?
        };
        let target = pages
            .into_iter()
            .find(|p| AsRef::<str>::as_ref(p.target_id()) == handle)
            .ok_or_else(|| ScopeError::driver(format!("no window with handle {handle}")))?;
        target.bring_to_front().await.map_err(|e| driver_error(&e))?;
        *self.page.lock().await = target;
        self.elements.lock().await.clear();
        debug!(handle, "switched window");
        Ok(())
    }

    async fn close(&self) -> ScopeResult<()> {
        self.elements.lock().await.clear();
        let mut browser = self.browser.lock().await;
        browser.close().await.map_err(|e| driver_error(&e))?;
        let _ = browser.wait().await;
        info!("chromium closed");
        Ok(())
    }
}
