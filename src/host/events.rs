//! The known host event-name set.
//!
//! Markup attributes whose name appears here bind event callbacks instead of
//! widget properties during materialization.

/// Event names the host toolkit can fire on a widget.
pub const EVENT_NAMES: &[&str] = &[
    "onactivate",
    "onblur",
    "oncancel",
    "oncontextmenu",
    "ondblclick",
    "ondeselect",
    "onfocus",
    "oninputsubmit",
    "onload",
    "onmouseactivate",
    "onmouseout",
    "onmouseover",
    "onselect",
    "ontextentrychange",
    "ontextentrysubmit",
    "onvaluechanged",
];

/// Whether `name` is a known host event name.
pub fn is_event_name(name: &str) -> bool {
    EVENT_NAMES.contains(&name)
}
