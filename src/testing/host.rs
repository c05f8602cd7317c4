//! Slotmap-backed reference host.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use slotmap::{new_key_type, SlotMap};
use tracing::debug;

use crate::host::{EventHandler, HostError, PropValue, Widget, WidgetHost, WidgetRef};

new_key_type! {
    /// Arena key for one panel record.
    struct PanelKey;
}

/// Everything the reference host stores about one widget.
struct PanelRecord {
    widget_type: String,
    id: String,
    classes: Vec<String>,
    styles: IndexMap<String, String>,
    properties: IndexMap<String, PropValue>,
    focus_enabled: bool,
    parent: Option<PanelKey>,
    children: Vec<PanelKey>,
    handlers: IndexMap<String, EventHandler>,
    valid: bool,
}

impl PanelRecord {
    fn new(widget_type: &str, id: &str, parent: Option<PanelKey>) -> Self {
        Self {
            widget_type: widget_type.to_owned(),
            id: id.to_owned(),
            classes: Vec::new(),
            styles: IndexMap::new(),
            properties: IndexMap::new(),
            focus_enabled: false,
            parent,
            children: Vec::new(),
            handlers: IndexMap::new(),
            valid: true,
        }
    }
}

struct Arena {
    panels: SlotMap<PanelKey, PanelRecord>,
    known_types: Vec<String>,
    root: PanelKey,
    staging: PanelKey,
}

/// The default widget vocabulary the factory accepts.
const DEFAULT_TYPES: &[&str] = &[
    "Panel",
    "Label",
    "Button",
    "Image",
    "TextEntry",
    "ProgressBar",
    "Slider",
];

/// An in-process host toolkit: widget factory plus retained widget tree.
pub struct MockHost {
    arena: Rc<RefCell<Arena>>,
}

impl MockHost {
    /// A host with a `#root` panel, a staging panel, and the default
    /// widget vocabulary.
    pub fn new() -> Self {
        let mut panels = SlotMap::with_key();
        let root = panels.insert(PanelRecord::new("Panel", "root", None));
        let staging = panels.insert(PanelRecord::new("Panel", "staging", None));
        Self {
            arena: Rc::new(RefCell::new(Arena {
                panels,
                known_types: DEFAULT_TYPES.iter().map(|t| (*t).to_owned()).collect(),
                root,
                staging,
            })),
        }
    }

    /// The root panel of the host tree.
    pub fn root(&self) -> WidgetRef {
        let key = self.arena.borrow().root;
        self.widget(key)
    }

    /// Teach the factory another widget type.
    pub fn register_type(&self, widget_type: &str) {
        let mut arena = self.arena.borrow_mut();
        if !arena.known_types.iter().any(|t| t == widget_type) {
            arena.known_types.push(widget_type.to_owned());
        }
    }

    /// Convenience factory call for tests.
    ///
    /// # Panics
    ///
    /// Panics if the widget type is unknown or `parent` is foreign.
    pub fn create(&self, widget_type: &str, parent: &WidgetRef, id: &str) -> WidgetRef {
        self.create_widget(widget_type, parent, id)
            .expect("widget creation in tests must use known types")
    }

    /// Fire a bound event on a widget, as the host input layer would.
    /// A widget with no binding for the event is a no-op.
    pub fn fire(&self, widget: &WidgetRef, event: &str, args: &[PropValue]) {
        let Some(key) = self.key_of(widget) else {
            return;
        };
        // Clone the handler out so it can re-enter the arena.
        let handler = self
            .arena
            .borrow()
            .panels
            .get(key)
            .and_then(|record| record.handlers.get(event).cloned());
        if let Some(handler) = handler {
            handler(args);
        }
    }

    /// Expire a widget and its whole subtree, as a host-side delete would.
    /// The handles stay around; every operation through them becomes a
    /// no-op and [`Widget::is_valid`] reports false.
    pub fn invalidate(&self, widget: &WidgetRef) {
        let Some(key) = self.key_of(widget) else {
            return;
        };
        let mut arena = self.arena.borrow_mut();
        let mut queue = vec![key];
        while let Some(current) = queue.pop() {
            if let Some(record) = arena.panels.get_mut(current) {
                record.valid = false;
                queue.extend(record.children.iter().copied());
            }
        }
    }

    /// Whether the widget may receive focus (reads the dedicated flag).
    pub fn focus_enabled(&self, widget: &WidgetRef) -> bool {
        self.key_of(widget)
            .and_then(|key| {
                self.arena
                    .borrow()
                    .panels
                    .get(key)
                    .map(|record| record.focus_enabled)
            })
            .unwrap_or(false)
    }

    /// Number of live widgets of a given type, staging included.
    pub fn widget_count(&self, widget_type: &str) -> usize {
        self.arena
            .borrow()
            .panels
            .values()
            .filter(|record| record.valid && record.widget_type == widget_type)
            .count()
    }

    fn widget(&self, key: PanelKey) -> WidgetRef {
        Rc::new(MockWidget {
            key,
            arena: self.arena.clone(),
        })
    }

    fn key_of(&self, widget: &WidgetRef) -> Option<PanelKey> {
        let mock = widget.as_any().downcast_ref::<MockWidget>()?;
        Rc::ptr_eq(&mock.arena, &self.arena).then_some(mock.key)
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl WidgetHost for MockHost {
    fn create_widget(
        &self,
        widget_type: &str,
        parent: &WidgetRef,
        id: &str,
    ) -> Result<WidgetRef, HostError> {
        let parent_key = self.key_of(parent).ok_or(HostError::ForeignWidget)?;
        let mut arena = self.arena.borrow_mut();
        if !arena.known_types.iter().any(|t| t == widget_type) {
            return Err(HostError::UnknownWidgetType(widget_type.to_owned()));
        }
        let key = arena
            .panels
            .insert(PanelRecord::new(widget_type, id, Some(parent_key)));
        if let Some(record) = arena.panels.get_mut(parent_key) {
            record.children.push(key);
        }
        drop(arena);
        Ok(self.widget(key))
    }

    fn staging_root(&self) -> WidgetRef {
        let key = self.arena.borrow().staging;
        self.widget(key)
    }
}

/// Handle to one panel in a [`MockHost`] arena.
struct MockWidget {
    key: PanelKey,
    arena: Rc<RefCell<Arena>>,
}

impl MockWidget {
    fn read<T>(&self, f: impl FnOnce(&PanelRecord) -> T) -> Option<T> {
        self.arena.borrow().panels.get(self.key).map(f)
    }

    fn write(&self, f: impl FnOnce(&mut PanelRecord)) {
        if let Some(record) = self.arena.borrow_mut().panels.get_mut(self.key) {
            f(record);
        }
    }

    fn make(&self, key: PanelKey) -> WidgetRef {
        Rc::new(MockWidget {
            key,
            arena: self.arena.clone(),
        })
    }
}

impl Widget for MockWidget {
    fn widget_type(&self) -> String {
        self.read(|r| r.widget_type.clone()).unwrap_or_default()
    }

    fn id(&self) -> String {
        self.read(|r| r.id.clone()).unwrap_or_default()
    }

    fn set_id(&self, id: &str) {
        self.write(|r| r.id = id.to_owned());
    }

    fn has_class(&self, class: &str) -> bool {
        self.read(|r| r.classes.iter().any(|c| c == class))
            .unwrap_or(false)
    }

    fn add_class(&self, class: &str) {
        self.write(|r| {
            if !r.classes.iter().any(|c| c == class) {
                r.classes.push(class.to_owned());
            }
        });
    }

    fn remove_class(&self, class: &str) {
        self.write(|r| r.classes.retain(|c| c != class));
    }

    fn parent(&self) -> Option<WidgetRef> {
        self.read(|r| r.parent)?.map(|key| self.make(key))
    }

    fn children(&self) -> Vec<WidgetRef> {
        self.read(|r| r.children.clone())
            .unwrap_or_default()
            .into_iter()
            .map(|key| self.make(key))
            .collect()
    }

    fn style(&self, property: &str) -> Option<String> {
        self.read(|r| r.styles.get(property).cloned())?
    }

    fn set_style(&self, property: &str, value: &str) {
        self.write(|r| {
            r.styles.insert(property.to_owned(), value.to_owned());
        });
    }

    fn property(&self, name: &str) -> Option<PropValue> {
        self.read(|r| r.properties.get(name).cloned())?
    }

    fn set_property(&self, name: &str, value: PropValue) {
        self.write(|r| {
            r.properties.insert(name.to_owned(), value);
        });
    }

    fn set_focus_enabled(&self, enabled: bool) {
        self.write(|r| r.focus_enabled = enabled);
    }

    fn bind_event(&self, event: &str, handler: EventHandler) {
        self.write(|r| {
            r.handlers.insert(event.to_owned(), handler);
        });
    }

    fn reparent(&self, new_parent: &WidgetRef) {
        let Some(target) = new_parent.as_any().downcast_ref::<MockWidget>() else {
            debug!("reparent target is not a MockHost widget; ignored");
            return;
        };
        if !Rc::ptr_eq(&target.arena, &self.arena) {
            debug!("reparent target belongs to another host; ignored");
            return;
        }
        let mut arena = self.arena.borrow_mut();
        let old_parent = match arena.panels.get(self.key) {
            Some(record) => record.parent,
            None => return,
        };
        if let Some(old_key) = old_parent {
            if let Some(old_record) = arena.panels.get_mut(old_key) {
                old_record.children.retain(|&child| child != self.key);
            }
        }
        if let Some(record) = arena.panels.get_mut(self.key) {
            record.parent = Some(target.key);
        }
        if let Some(new_record) = arena.panels.get_mut(target.key) {
            new_record.children.push(self.key);
        }
    }

    fn is_valid(&self) -> bool {
        self.read(|r| r.valid).unwrap_or(false)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
