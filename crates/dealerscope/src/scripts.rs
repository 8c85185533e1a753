//! Page-context scripts used by the script-level fallback strategies.
//!
//! Element scripts are function declarations evaluated with `this` bound to
//! the element (`Driver::call_on_element`). Each one carries a marker
//! comment so drivers and test doubles can tell them apart without parsing.

use serde_json::Value;

/// Expression yielding `document.readyState`
pub const READY_STATE: &str = "document.readyState";

/// Expression yielding `document.title`
pub const TITLE: &str = "document.title";

/// Kind of element script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptKind {
    /// Synthetic mouse events at the bounding-box center
    DispatchClick,
    /// `element.click()`
    InvokeClick,
    /// Native value setter followed by `input`/`change` events
    DispatchInput,
    /// Plain `element.value = ...`
    AssignValue,
    /// `innerText`/`textContent`/`value` read
    ReadText,
    /// `element.scrollIntoView()`
    ScrollIntoView,
    /// Computed-style visibility check
    IsVisible,
}

impl ScriptKind {
    const ALL: [Self; 7] = [
        Self::DispatchClick,
        Self::InvokeClick,
        Self::DispatchInput,
        Self::AssignValue,
        Self::ReadText,
        Self::ScrollIntoView,
        Self::IsVisible,
    ];

    /// Marker embedded in the script body
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Self::DispatchClick => "/*ds:dispatch-click*/",
            Self::InvokeClick => "/*ds:invoke-click*/",
            Self::DispatchInput => "/*ds:dispatch-input*/",
            Self::AssignValue => "/*ds:assign-value*/",
            Self::ReadText => "/*ds:read-text*/",
            Self::ScrollIntoView => "/*ds:scroll-into-view*/",
            Self::IsVisible => "/*ds:is-visible*/",
        }
    }

    /// Identify an element script by its marker
    #[must_use]
    pub fn of(script: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| script.contains(k.marker()))
    }
}

/// Dispatch `mousedown`, `mouseup` and `click` at the element's center
pub const DISPATCH_CLICK: &str = "function() { /*ds:dispatch-click*/
    const r = this.getBoundingClientRect();
    const init = {
        view: window, bubbles: true, cancelable: true,
        clientX: r.left + r.width / 2, clientY: r.top + r.height / 2
    };
    this.dispatchEvent(new MouseEvent('mousedown', init));
    this.dispatchEvent(new MouseEvent('mouseup', init));
    this.dispatchEvent(new MouseEvent('click', init));
    return true;
}";

/// Call the element's own `click()`
pub const INVOKE_CLICK: &str = "function() { /*ds:invoke-click*/ this.click(); return true; }";

/// Read visible text, falling back to `textContent` and form values
pub const READ_TEXT: &str = "function() { /*ds:read-text*/
    const t = this.innerText || this.textContent || this.value || '';
    return String(t).trim();
}";

/// Scroll the element to the middle of the viewport
pub const SCROLL_INTO_VIEW: &str = "function() { /*ds:scroll-into-view*/
    this.scrollIntoView({ block: 'center', inline: 'center' });
    return true;
}";

/// Whether the element is rendered with a non-empty box
pub const IS_VISIBLE: &str = "function() { /*ds:is-visible*/
    const s = window.getComputedStyle(this);
    const r = this.getBoundingClientRect();
    return s.display !== 'none' && s.visibility !== 'hidden' && r.width > 0 && r.height > 0;
}";

/// Set a form value through the prototype setter so framework-controlled
/// inputs observe it, then fire `input` and `change`.
#[must_use]
pub fn dispatch_input(text: &str) -> String {
    let literal = Value::String(text.to_string());
    format!(
        "function() {{ /*ds:dispatch-input*/
    const proto = Object.getPrototypeOf(this);
    const desc = Object.getOwnPropertyDescriptor(proto, 'value');
    if (desc && desc.set) {{ desc.set.call(this, {literal}); }} else {{ this.value = {literal}; }}
    this.dispatchEvent(new Event('input', {{ bubbles: true }}));
    this.dispatchEvent(new Event('change', {{ bubbles: true }}));
    return true;
}}"
    )
}

/// Assign the value property directly
#[must_use]
pub fn assign_value(text: &str) -> String {
    let literal = Value::String(text.to_string());
    format!("function() {{ /*ds:assign-value*/ this.value = {literal}; return true; }}")
}

/// Extract the literal text argument from a value script
#[must_use]
pub fn value_argument(script: &str) -> Option<String> {
    let start = script.find("this.value = ")? + "this.value = ".len();
    let rest = &script[start..];
    let mut de = serde_json::Deserializer::from_str(rest).into_iter::<String>();
    de.next()?.ok()
}
