//! Tree materialization: parsed markup forest → live host widgets.
//!
//! The materializer asks the host factory for a widget per element node,
//! applies attributes (classes, focus flag, event bindings, typed
//! properties), and recurses into children. Attribute-to-property dispatch
//! goes through an [`AttributeSchema`] declared per widget type; attribute
//! names the schema does not know are ignored, so markup written against a
//! newer host still materializes.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::host::{is_event_name, EventCallback, HostError, PropValue, WidgetHost, WidgetRef};
use crate::markup::{Element, Node};

/// Errors from materialization.
#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    /// The host factory refused to create a widget.
    #[error("failed to create {widget_type:?} widget")]
    Factory {
        widget_type: String,
        #[source]
        source: HostError,
    },
}

/// What to do when the host factory fails for one node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FactoryFailure {
    /// Abort the whole materialize call and surface the failure.
    #[default]
    Abort,
    /// Log, drop the node's subtree, and keep going.
    Skip,
}

/// Coerce an attribute string to a typed property value.
///
/// A value that parses as a number is always assigned as a number, even
/// when the markup meant a numeric-looking string; otherwise the boolean
/// rule applies.
pub fn coerce(value: &str) -> PropValue {
    if let Ok(number) = value.parse::<f64>() {
        return PropValue::Number(number);
    }
    coerce_bool(value)
}

/// The string-to-boolean rule: `"true"` and `"false"` become booleans,
/// anything else stays a verbatim string.
pub fn coerce_bool(value: &str) -> PropValue {
    match value {
        "true" => PropValue::Bool(true),
        "false" => PropValue::Bool(false),
        other => PropValue::String(other.to_owned()),
    }
}

/// A typed setter for one attribute of one widget type.
type AttrSetter = Rc<dyn Fn(&WidgetRef, &str)>;

/// Per-widget-type attribute dispatch table.
///
/// Declared once, consulted during materialization. Unknown names fall
/// through to "ignore".
#[derive(Clone, Default)]
pub struct AttributeSchema {
    setters: HashMap<String, HashMap<String, AttrSetter>>,
}

impl AttributeSchema {
    /// A schema with no attributes at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The stock schema for the built-in widget vocabulary.
    pub fn with_defaults() -> Self {
        let mut schema = Self::empty();
        for attr in ["text", "html"] {
            schema.register_property("Label", attr);
        }
        schema.register_property("Button", "text");
        for attr in ["src", "scaling"] {
            schema.register_property("Image", attr);
        }
        for attr in ["text", "placeholder", "maxchars"] {
            schema.register_property("TextEntry", attr);
        }
        for attr in ["value", "min", "max"] {
            schema.register_property("ProgressBar", attr);
            schema.register_property("Slider", attr);
        }
        for attr in ["hittest", "draggable"] {
            schema.register_property("Panel", attr);
        }
        schema
    }

    /// Register a custom setter for `widget_type.attribute`.
    pub fn register(
        &mut self,
        widget_type: &str,
        attribute: &str,
        setter: impl Fn(&WidgetRef, &str) + 'static,
    ) {
        self.setters
            .entry(widget_type.to_owned())
            .or_default()
            .insert(attribute.to_owned(), Rc::new(setter));
    }

    /// Register an attribute that assigns the coerced value to the widget
    /// property of the same name.
    pub fn register_property(&mut self, widget_type: &str, attribute: &str) {
        let name = attribute.to_owned();
        self.register(widget_type, attribute, move |widget, value| {
            widget.set_property(&name, coerce(value));
        });
    }

    fn lookup(&self, widget_type: &str, attribute: &str) -> Option<&AttrSetter> {
        self.setters.get(widget_type)?.get(attribute)
    }
}

/// Walks a parsed node forest and builds the live widget tree.
pub struct Materializer<'h> {
    host: &'h dyn WidgetHost,
    schema: AttributeSchema,
    on_failure: FactoryFailure,
}

impl<'h> Materializer<'h> {
    /// A materializer over `host` with the stock schema and the abort
    /// failure policy.
    pub fn new(host: &'h dyn WidgetHost) -> Self {
        Self {
            host,
            schema: AttributeSchema::with_defaults(),
            on_failure: FactoryFailure::Abort,
        }
    }

    /// Replace the attribute schema (builder).
    pub fn with_schema(mut self, schema: AttributeSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Set the factory-failure policy (builder).
    pub fn on_factory_failure(mut self, policy: FactoryFailure) -> Self {
        self.on_failure = policy;
        self
    }

    /// Materialize a node forest under `parent`.
    ///
    /// Returns the top-level created widgets in input order. Text nodes
    /// have no widget counterpart and are skipped. When `on_event` is
    /// supplied, markup attributes named after host events bind it with the
    /// attribute's string value as the correlation token.
    pub fn materialize(
        &self,
        parent: &WidgetRef,
        nodes: &[Node],
        on_event: Option<&EventCallback>,
    ) -> Result<Vec<WidgetRef>, MaterializeError> {
        let mut created = Vec::new();
        for node in nodes {
            match node {
                Node::Element(el) => {
                    if let Some(widget) = self.build(parent, el, on_event)? {
                        created.push(widget);
                    }
                }
                Node::Text(_) => debug!("text node has no widget counterpart; skipped"),
            }
        }
        Ok(created)
    }

    fn build(
        &self,
        parent: &WidgetRef,
        element: &Element,
        on_event: Option<&EventCallback>,
    ) -> Result<Option<WidgetRef>, MaterializeError> {
        let id = element.attribute("id").unwrap_or("");

        // Create under the staging area (where type default presentation is
        // preloaded), then move into place.
        let staging = self.host.staging_root();
        let widget = match self.host.create_widget(&element.name, &staging, id) {
            Ok(widget) => widget,
            Err(source) => match self.on_failure {
                FactoryFailure::Abort => {
                    return Err(MaterializeError::Factory {
                        widget_type: element.name.clone(),
                        source,
                    });
                }
                FactoryFailure::Skip => {
                    warn!(
                        widget_type = element.name.as_str(),
                        error = %source,
                        "factory failure; dropping this subtree"
                    );
                    return Ok(None);
                }
            },
        };
        widget.reparent(parent);

        self.apply_attributes(&widget, element, on_event);

        for child in &element.children {
            match child {
                Node::Element(child_el) => {
                    self.build(&widget, child_el, on_event)?;
                }
                Node::Text(_) => debug!("text node has no widget counterpart; skipped"),
            }
        }
        Ok(Some(widget))
    }

    fn apply_attributes(
        &self,
        widget: &WidgetRef,
        element: &Element,
        on_event: Option<&EventCallback>,
    ) {
        for (name, value) in &element.attributes {
            // Already consumed by the factory call.
            if name == "id" {
                continue;
            }
            if name == "class" {
                for class in value.split_whitespace() {
                    widget.add_class(class);
                }
                continue;
            }
            if name == "acceptsfocus" {
                match coerce_bool(value) {
                    PropValue::Bool(enabled) => widget.set_focus_enabled(enabled),
                    _ => debug!(
                        value = value.as_str(),
                        "non-boolean focus attribute ignored"
                    ),
                }
                continue;
            }
            if is_event_name(name) {
                if let Some(callback) = on_event {
                    let callback = callback.clone();
                    let token = value.clone();
                    widget.bind_event(name, Rc::new(move |args| callback(&token, args)));
                    continue;
                }
                // No event sink: treated like any other attribute below.
            }
            if let Some(setter) = self.schema.lookup(&element.name, name) {
                setter(widget, value);
                continue;
            }
            debug!(
                widget_type = element.name.as_str(),
                attribute = name.as_str(),
                "unrecognized attribute ignored"
            );
        }
    }
}
