//! Test support: an in-process reference implementation of the host
//! toolkit boundary.
//!
//! [`MockHost`] is a real (if featureless) retained-mode widget arena. It
//! exists so the runtime's own tests can materialize, style, and fire
//! events without a host application, and it doubles as documentation of
//! what a host binding must provide.

pub mod host;

pub use host::MockHost;
