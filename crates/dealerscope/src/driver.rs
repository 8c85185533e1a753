//! Driver - abstract browser automation seam
//!
//! Everything above this module talks to the browser through [`Driver`].
//! The CDP implementation lives in `chromium` behind the `browser` feature;
//! [`MockDriver`] is a scriptable in-memory double used by the unit tests and
//! by anyone who wants to exercise page workflows without a browser.
//!
//! Methods take `&self`: implementations keep their own interior state so a
//! single driver can be shared by several page objects.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::locator::{BoundingBox, Selector};
use crate::result::{ScopeError, ScopeResult};
use crate::scripts::{self, ScriptKind};

/// Opaque handle to a DOM element owned by a driver
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Driver-assigned identifier
    pub id: String,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Abstract driver trait for browser automation
///
/// # Implementations
///
/// - `ChromiumDriver` - CDP via chromiumoxide (feature `browser`)
/// - [`MockDriver`] - for unit testing
#[async_trait]
pub trait Driver: Send + Sync {
    /// Navigate to URL
    async fn navigate(&self, url: &str) -> ScopeResult<()>;

    /// Get current URL
    async fn current_url(&self) -> ScopeResult<String>;

    /// Get document title
    async fn title(&self) -> ScopeResult<String>;

    /// Reload page
    async fn refresh(&self) -> ScopeResult<()>;

    /// Go back in history
    async fn go_back(&self) -> ScopeResult<()>;

    /// Execute a JavaScript expression in page context
    async fn execute_script(&self, script: &str) -> ScopeResult<Value>;

    /// Evaluate a function declaration with `this` bound to the element
    async fn call_on_element(&self, element: &ElementHandle, function: &str)
        -> ScopeResult<Value>;

    /// All elements currently matching the selector, in document order
    async fn find_elements(&self, selector: &Selector) -> ScopeResult<Vec<ElementHandle>>;

    /// Native click on the element
    async fn click(&self, element: &ElementHandle) -> ScopeResult<()>;

    /// Clear an editable element
    async fn clear(&self, element: &ElementHandle) -> ScopeResult<()>;

    /// Type text into element
    async fn send_keys(&self, element: &ElementHandle, text: &str) -> ScopeResult<()>;

    /// Rendered text of the element
    async fn text(&self, element: &ElementHandle) -> ScopeResult<String>;

    /// Attribute value, `None` when absent
    async fn attribute(&self, element: &ElementHandle, name: &str) -> ScopeResult<Option<String>>;

    /// Whether the element is rendered and visible
    async fn is_displayed(&self, element: &ElementHandle) -> ScopeResult<bool>;

    /// Whether the element accepts input
    async fn is_enabled(&self, element: &ElementHandle) -> ScopeResult<bool>;

    /// Move the pointer over the element's center
    async fn move_pointer_to(&self, element: &ElementHandle) -> ScopeResult<()>;

    /// Press and release the primary button at the current pointer position
    async fn pointer_click(&self) -> ScopeResult<()>;

    /// Native scroll so the element is in view
    async fn scroll_into_view(&self, element: &ElementHandle) -> ScopeResult<()>;

    /// Write a PNG of the viewport to `path`
    async fn save_screenshot(&self, path: &Path) -> ScopeResult<()>;

    /// Handles of all open windows
    async fn window_handles(&self) -> ScopeResult<Vec<String>>;

    /// Make the given window current
    async fn switch_to_window(&self, handle: &str) -> ScopeResult<()>;

    /// Close the browser
    async fn close(&self) -> ScopeResult<()>;
}

/// Driver operation that [`MockDriver`] can be told to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockChannel {
    /// Native click (fails as intercepted)
    Click,
    /// Pointer move
    PointerMove,
    /// Pointer press/release (fails as intercepted)
    PointerClick,
    /// Keystrokes
    SendKeys,
    /// Clearing a field
    Clear,
    /// Native text read (fails as stale)
    Text,
    /// Native scroll
    Scroll,
    /// A particular element script
    Script(ScriptKind),
    /// Screenshot capture
    Screenshot,
}

impl MockChannel {
    fn error(self, id: &str) -> ScopeError {
        match self {
            Self::Click | Self::PointerClick => ScopeError::Intercepted {
                message: format!("{id} is covered by another element"),
            },
            Self::PointerMove | Self::SendKeys | Self::Clear | Self::Scroll => {
                ScopeError::NotInteractable {
                    message: id.to_string(),
                }
            }
            Self::Text => ScopeError::StaleElement { id: id.to_string() },
            Self::Script(kind) => ScopeError::script(format!("{} rejected", kind.marker())),
            Self::Screenshot => ScopeError::Screenshot {
                message: "capture failed".to_string(),
            },
        }
    }
}

/// Element served by [`MockDriver`]
#[derive(Debug, Clone, PartialEq)]
pub struct MockElement {
    id: String,
    /// Rendered text
    pub text: String,
    /// Current form value
    pub value: String,
    /// Rendered and visible
    pub visible: bool,
    /// Accepts input
    pub enabled: bool,
    /// Number of lookups that miss before the element is attached
    pub appear_after: u32,
    /// Number of visibility checks that report hidden before it shows
    pub visible_after: u32,
    /// Number of enabled checks that report disabled before it enables
    pub enabled_after: u32,
    /// Attributes
    pub attributes: BTreeMap<String, String>,
    /// Layout box
    pub bounding_box: BoundingBox,
}

impl MockElement {
    /// A visible, enabled element with the given text
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            text: text.into(),
            value: String::new(),
            visible: true,
            enabled: true,
            appear_after: 0,
            visible_after: 0,
            enabled_after: 0,
            attributes: BTreeMap::new(),
            bounding_box: BoundingBox::new(0.0, 0.0, 120.0, 32.0),
        }
    }

    /// Present but hidden
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Present but disabled
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Attached only after `lookups` lookups have missed
    #[must_use]
    pub fn appears_after(mut self, lookups: u32) -> Self {
        self.appear_after = lookups;
        self
    }

    /// Visible only after `checks` visibility checks have reported hidden
    #[must_use]
    pub fn shows_after(mut self, checks: u32) -> Self {
        self.visible_after = checks;
        self
    }

    /// Enabled only after `checks` enabled checks have reported disabled
    #[must_use]
    pub fn enables_after(mut self, checks: u32) -> Self {
        self.enabled_after = checks;
        self
    }

    /// Add an attribute
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Initial form value
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }
}

#[derive(Debug, Default)]
struct MockState {
    url: String,
    title: String,
    back_stack: Vec<String>,
    elements: HashMap<Selector, Vec<MockElement>>,
    failures: HashMap<MockChannel, u32>,
    loading_checks: u32,
    pending_url: Option<(String, u32)>,
    windows: Vec<String>,
    current_window: String,
    js_results: VecDeque<Value>,
    screenshots: Vec<PathBuf>,
    history: Vec<String>,
    next_id: u64,
}

impl MockState {
    fn fail(&mut self, channel: MockChannel, id: &str) -> ScopeResult<()> {
        match self.failures.get_mut(&channel) {
            Some(0) | None => Ok(()),
            Some(n) => {
                if *n != u32::MAX {
                    *n -= 1;
                }
                Err(channel.error(id))
            }
        }
    }

    fn element_mut(&mut self, handle: &ElementHandle) -> ScopeResult<&mut MockElement> {
        self.elements
            .values_mut()
            .flatten()
            .find(|e| e.id == handle.id && e.appear_after == 0)
            .ok_or_else(|| ScopeError::StaleElement {
                id: handle.id.clone(),
            })
    }
}

/// Mock driver for unit testing
#[derive(Debug)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    /// Create new mock driver on `about:blank` with a single window
    #[must_use]
    pub fn new() -> Self {
        let state = MockState {
            url: "about:blank".to_string(),
            windows: vec!["main".to_string()],
            current_window: "main".to_string(),
            ..MockState::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Serve `element` for `selector`; returns its handle
    pub fn add_element(&self, selector: Selector, mut element: MockElement) -> ElementHandle {
        let mut state = self.lock();
        state.next_id += 1;
        element.id = format!("el-{}", state.next_id);
        let handle = ElementHandle::new(element.id.clone());
        state.elements.entry(selector).or_default().push(element);
        handle
    }

    /// Detach every element served for `selector`
    pub fn remove_elements(&self, selector: &Selector) {
        self.lock().elements.remove(selector);
    }

    /// Re-render every element served for `selector`: each gets a new id, so
    /// handles taken before fail as stale. Returns the new handles.
    pub fn rerender(&self, selector: &Selector) -> Vec<ElementHandle> {
        let mut state = self.lock();
        let mut next_id = state.next_id;
        let handles = state
            .elements
            .get_mut(selector)
            .map(|elements| {
                elements
                    .iter_mut()
                    .map(|el| {
                        next_id += 1;
                        el.id = format!("el-{next_id}");
                        ElementHandle::new(el.id.clone())
                    })
                    .collect()
            })
            .unwrap_or_default();
        state.next_id = next_id;
        handles
    }

    /// Fail the next `times` operations on `channel`
    pub fn fail_times(&self, channel: MockChannel, times: u32) {
        self.lock().failures.insert(channel, times);
    }

    /// Fail every operation on `channel`
    pub fn fail_always(&self, channel: MockChannel) {
        self.fail_times(channel, u32::MAX);
    }

    /// Report `document.readyState` as `loading` for the next `checks` reads
    pub fn set_loading_for(&self, checks: u32) {
        self.lock().loading_checks = checks;
    }

    /// Change the URL after `reads` more URL reads
    pub fn set_url_after(&self, url: impl Into<String>, reads: u32) {
        self.lock().pending_url = Some((url.into(), reads));
    }

    /// Set the document title
    pub fn set_title(&self, title: impl Into<String>) {
        self.lock().title = title.into();
    }

    /// Open an extra window
    pub fn add_window(&self, handle: impl Into<String>) {
        self.lock().windows.push(handle.into());
    }

    /// Queue a result for the next unrecognised `execute_script`
    pub fn set_js_result(&self, result: Value) {
        self.lock().js_results.push_back(result);
    }

    /// Current form value of an element
    #[must_use]
    pub fn value_of(&self, handle: &ElementHandle) -> Option<String> {
        self.lock().element_mut(handle).ok().map(|e| e.value.clone())
    }

    /// Current window handle
    #[must_use]
    pub fn current_window(&self) -> String {
        self.lock().current_window.clone()
    }

    /// Paths written by `save_screenshot`
    #[must_use]
    pub fn screenshots(&self) -> Vec<PathBuf> {
        self.lock().screenshots.clone()
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.lock().history.clone()
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.lock().history.iter().any(|c| c.starts_with(method))
    }

    /// Number of history entries starting with `method`
    #[must_use]
    pub fn call_count(&self, method: &str) -> usize {
        self.lock()
            .history
            .iter()
            .filter(|c| c.starts_with(method))
            .count()
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn navigate(&self, url: &str) -> ScopeResult<()> {
        let mut state = self.lock();
        state.history.push(format!("navigate:{url}"));
        let previous = std::mem::replace(&mut state.url, url.to_string());
        state.back_stack.push(previous);
        Ok(())
    }

    async fn current_url(&self) -> ScopeResult<String> {
        let mut state = self.lock();
        if let Some((url, reads)) = state.pending_url.take() {
            if reads == 0 {
                state.url = url;
            } else {
                state.pending_url = Some((url, reads - 1));
            }
        }
        Ok(state.url.clone())
    }

    async fn title(&self) -> ScopeResult<String> {
        Ok(self.lock().title.clone())
    }

    async fn refresh(&self) -> ScopeResult<()> {
        self.lock().history.push("refresh".to_string());
        Ok(())
    }

    async fn go_back(&self) -> ScopeResult<()> {
        let mut state = self.lock();
        state.history.push("go_back".to_string());
        if let Some(previous) = state.back_stack.pop() {
            state.url = previous;
        }
        Ok(())
    }

    async fn execute_script(&self, script: &str) -> ScopeResult<Value> {
        let mut state = self.lock();
        state.history.push(format!("execute:{script}"));
        if script == scripts::READY_STATE {
            if state.loading_checks > 0 {
                state.loading_checks -= 1;
                return Ok(Value::from("loading"));
            }
            return Ok(Value::from("complete"));
        }
        if script == scripts::TITLE {
            return Ok(Value::from(state.title.clone()));
        }
        Ok(state.js_results.pop_front().unwrap_or(Value::Null))
    }

    async fn call_on_element(
        &self,
        element: &ElementHandle,
        function: &str,
    ) -> ScopeResult<Value> {
        let mut state = self.lock();
        let Some(kind) = ScriptKind::of(function) else {
            state.history.push(format!("script:other:{}", element.id));
            state.element_mut(element)?;
            return Ok(state.js_results.pop_front().unwrap_or(Value::Null));
        };
        let label = kind.marker().trim_start_matches("/*ds:").trim_end_matches("*/");
        state.history.push(format!("script:{label}:{}", element.id));
        state.fail(MockChannel::Script(kind), &element.id)?;
        let el = state.element_mut(element)?;
        let result = match kind {
            ScriptKind::DispatchClick | ScriptKind::InvokeClick | ScriptKind::ScrollIntoView => {
                Value::Bool(true)
            }
            ScriptKind::DispatchInput | ScriptKind::AssignValue => {
                el.value = scripts::value_argument(function).unwrap_or_default();
                Value::Bool(true)
            }
            ScriptKind::ReadText => {
                let text = if el.text.is_empty() { &el.value } else { &el.text };
                Value::from(text.trim().to_string())
            }
            ScriptKind::IsVisible => Value::Bool(el.visible && el.visible_after == 0),
        };
        Ok(result)
    }

    async fn find_elements(&self, selector: &Selector) -> ScopeResult<Vec<ElementHandle>> {
        let mut state = self.lock();
        state.history.push(format!("find:{selector}"));
        let Some(elements) = state.elements.get_mut(selector) else {
            return Ok(Vec::new());
        };
        let mut found = Vec::new();
        for el in elements.iter_mut() {
            if el.appear_after > 0 {
                el.appear_after -= 1;
            } else {
                found.push(ElementHandle::new(el.id.clone()));
            }
        }
        Ok(found)
    }

    async fn click(&self, element: &ElementHandle) -> ScopeResult<()> {
        let mut state = self.lock();
        state.history.push(format!("click:{}", element.id));
        let el = state.element_mut(element)?;
        if !el.enabled || el.enabled_after > 0 || !el.visible {
            return Err(ScopeError::NotInteractable {
                message: element.id.clone(),
            });
        }
        state.fail(MockChannel::Click, &element.id)
    }

    async fn clear(&self, element: &ElementHandle) -> ScopeResult<()> {
        let mut state = self.lock();
        state.history.push(format!("clear:{}", element.id));
        state.element_mut(element)?;
        state.fail(MockChannel::Clear, &element.id)?;
        state.element_mut(element)?.value.clear();
        Ok(())
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> ScopeResult<()> {
        let mut state = self.lock();
        state.history.push(format!("send_keys:{}", element.id));
        let el = state.element_mut(element)?;
        if !el.enabled {
            return Err(ScopeError::NotInteractable {
                message: element.id.clone(),
            });
        }
        state.fail(MockChannel::SendKeys, &element.id)?;
        state.element_mut(element)?.value.push_str(text);
        Ok(())
    }

    async fn text(&self, element: &ElementHandle) -> ScopeResult<String> {
        let mut state = self.lock();
        state.history.push(format!("text:{}", element.id));
        state.element_mut(element)?;
        state.fail(MockChannel::Text, &element.id)?;
        Ok(state.element_mut(element)?.text.clone())
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> ScopeResult<Option<String>> {
        let mut state = self.lock();
        let el = state.element_mut(element)?;
        if name == "value" {
            return Ok(Some(el.value.clone()));
        }
        Ok(el.attributes.get(name).cloned())
    }

    async fn is_displayed(&self, element: &ElementHandle) -> ScopeResult<bool> {
        let mut state = self.lock();
        let el = state.element_mut(element)?;
        if el.visible_after > 0 {
            el.visible_after -= 1;
            return Ok(false);
        }
        Ok(el.visible)
    }

    async fn is_enabled(&self, element: &ElementHandle) -> ScopeResult<bool> {
        let mut state = self.lock();
        state.history.push(format!("is_enabled:{}", element.id));
        let el = state.element_mut(element)?;
        if el.enabled_after > 0 {
            el.enabled_after -= 1;
            return Ok(false);
        }
        Ok(el.enabled)
    }

    async fn move_pointer_to(&self, element: &ElementHandle) -> ScopeResult<()> {
        let mut state = self.lock();
        state.history.push(format!("pointer_move:{}", element.id));
        state.element_mut(element)?;
        state.fail(MockChannel::PointerMove, &element.id)
    }

    async fn pointer_click(&self) -> ScopeResult<()> {
        let mut state = self.lock();
        state.history.push("pointer_click".to_string());
        state.fail(MockChannel::PointerClick, "pointer")
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> ScopeResult<()> {
        let mut state = self.lock();
        state.history.push(format!("scroll:{}", element.id));
        state.element_mut(element)?;
        state.fail(MockChannel::Scroll, &element.id)
    }

    async fn save_screenshot(&self, path: &Path) -> ScopeResult<()> {
        {
            let mut state = self.lock();
            state.history.push(format!("screenshot:{}", path.display()));
            state.fail(MockChannel::Screenshot, "page")?;
        }
        tokio::fs::write(path, b"\x89PNG\r\n\x1a\n").await?;
        self.lock().screenshots.push(path.to_path_buf());
        Ok(())
    }

    async fn window_handles(&self) -> ScopeResult<Vec<String>> {
        Ok(self.lock().windows.clone())
    }

    async fn switch_to_window(&self, handle: &str) -> ScopeResult<()> {
        let mut state = self.lock();
        state.history.push(format!("switch_window:{handle}"));
        if !state.windows.iter().any(|w| w == handle) {
            return Err(ScopeError::driver(format!("no such window: {handle}")));
        }
        state.current_window = handle.to_string();
        Ok(())
    }

    async fn close(&self) -> ScopeResult<()> {
        self.lock().history.push("close".to_string());
        Ok(())
    }
}
