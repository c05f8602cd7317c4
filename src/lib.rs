//! # trellis-ui
//!
//! A CSS-styled, declarative UI composition runtime for retained-mode
//! widget hosts.
//!
//! trellis-ui sits between data and a host toolkit the application does
//! not control: widget trees are described as XML-like markup, styling as
//! CSS-like rule blocks, and independently-loaded UI fragments find each
//! other through a module registry that also resolves modules fetched
//! asynchronously from a remote authority.
//!
//! ## Core Systems
//!
//! - **[`value`]** — Shared dynamic tables backing configuration and
//!   capability exchange
//! - **[`merge`]** — Alias- and cycle-safe recursive structural merge
//! - **[`css`]** — Selector tokenizer, backtracking descendant matcher,
//!   rule-set parsing and application
//! - **[`markup`]** — Recursive-descent markup parser with entity decoding
//! - **[`materialize`]** — Parsed forest → live widgets, with attribute
//!   schema and event binding
//! - **[`registry`]** — Cross-fragment module namespace with an
//!   asynchronous readiness barrier
//! - **[`host`]** — The boundary traits a host toolkit implements
//! - **[`testing`]** — Reference host for tests and examples

// Foundation
pub mod merge;
pub mod value;

// Core systems
pub mod css;
pub mod markup;
pub mod materialize;
pub mod registry;

// Host boundary
pub mod host;

// Test support
pub mod testing;
