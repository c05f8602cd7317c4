//! The widget handle trait and typed property values.

use std::any::Any;
use std::rc::Rc;

/// Shared handle to a host widget. Cloning aliases the same widget.
pub type WidgetRef = Rc<dyn Widget>;

/// A per-widget event callback installed via [`Widget::bind_event`]. The
/// host invokes it with the native event arguments when the event fires.
pub type EventHandler = Rc<dyn Fn(&[PropValue])>;

/// The event sink passed into materialization: `(token, native args)`.
/// The token is the free-form string the markup bound to the event.
pub type EventCallback = Rc<dyn Fn(&str, &[PropValue])>;

/// A typed widget property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Bool(bool),
    Number(f64),
    String(String),
}

impl PropValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for PropValue {
    fn from(b: bool) -> Self {
        PropValue::Bool(b)
    }
}

impl From<f64> for PropValue {
    fn from(n: f64) -> Self {
        PropValue::Number(n)
    }
}

impl From<&str> for PropValue {
    fn from(s: &str) -> Self {
        PropValue::String(s.to_owned())
    }
}

/// Operations on a single host widget handle.
///
/// Object-safe by design: the runtime holds widgets as `Rc<dyn Widget>`.
/// Handles may outlive their widget; every operation on an expired handle
/// must be a safe no-op, and [`Widget::is_valid`] reports expiry.
pub trait Widget {
    /// The widget's type name (used by type selectors).
    fn widget_type(&self) -> String;

    /// The widget's identifier (used by `#id` selectors). Empty if unset.
    fn id(&self) -> String;

    /// Replace the widget's identifier.
    fn set_id(&self, id: &str);

    /// Whether the widget currently carries the given class.
    fn has_class(&self, class: &str) -> bool;

    /// Add a class. No-op if already present.
    fn add_class(&self, class: &str);

    /// Remove a class. No-op if not present.
    fn remove_class(&self, class: &str);

    /// Add or remove a class according to `present`.
    fn set_class(&self, class: &str, present: bool) {
        if present {
            self.add_class(class);
        } else {
            self.remove_class(class);
        }
    }

    /// The widget's parent, if any.
    fn parent(&self) -> Option<WidgetRef>;

    /// The widget's children, in host order.
    fn children(&self) -> Vec<WidgetRef>;

    /// Read a live style property.
    fn style(&self, property: &str) -> Option<String>;

    /// Write a live style property.
    fn set_style(&self, property: &str, value: &str);

    /// Read a typed property.
    fn property(&self, name: &str) -> Option<PropValue>;

    /// Write a typed property.
    fn set_property(&self, name: &str, value: PropValue);

    /// Dedicated setter for whether the widget may receive focus.
    fn set_focus_enabled(&self, enabled: bool);

    /// Install the callback the host invokes when the named event fires.
    /// Replaces any previously bound callback for that event.
    fn bind_event(&self, event: &str, handler: EventHandler);

    /// Move this widget (with its subtree) under a new parent.
    fn reparent(&self, new_parent: &WidgetRef);

    /// Whether the underlying widget still exists.
    fn is_valid(&self) -> bool;

    /// Downcast support for host implementations.
    fn as_any(&self) -> &dyn Any;
}

impl std::fmt::Debug for dyn Widget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Widget")
            .field("type", &self.widget_type())
            .field("id", &self.id())
            .finish()
    }
}
