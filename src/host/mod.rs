//! Host toolkit boundary: widget handles, factory, event names.
//!
//! The runtime never owns widgets. It talks to the host's retained-mode
//! toolkit exclusively through the traits in this module: [`Widget`] for
//! per-handle operations and [`WidgetHost`] for widget creation. The
//! in-crate reference implementation lives in [`crate::testing`].

pub mod events;
pub mod widget;

pub use events::{is_event_name, EVENT_NAMES};
pub use widget::{EventCallback, EventHandler, PropValue, Widget, WidgetRef};

/// Errors surfaced by a host toolkit at the factory boundary.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HostError {
    /// The factory has no widget type registered under this name.
    #[error("host factory has no widget type {0:?}")]
    UnknownWidgetType(String),
    /// The target handle belongs to a different host or has expired.
    #[error("widget handle is not usable by this host")]
    ForeignWidget,
}

/// Widget factory provided by the host toolkit.
pub trait WidgetHost {
    /// Create a widget of the given type with the given identifier,
    /// parented under `parent`.
    ///
    /// Newly created widgets must originate from [`WidgetHost::staging_root`]
    /// (where type default presentation is preloaded) and be reparented to
    /// their real location afterwards.
    fn create_widget(
        &self,
        widget_type: &str,
        parent: &WidgetRef,
        id: &str,
    ) -> Result<WidgetRef, HostError>;

    /// The private staging area new widgets are created under.
    fn staging_root(&self) -> WidgetRef;
}
