//! faturamento-core library.
//!
//! Billing cases ("process records") move through a fixed review workflow,
//! are assigned to collaborators, and are read back either as a filtered,
//! paginated listing or as a per-collaborator productivity report.
//!
//! Domain failures are [`error::CoreError`]; `anyhow::Result` is reserved
//! for loading and edge plumbing.

pub mod access;
pub mod aggregate;
pub mod app;
pub mod clock;
pub mod config;
pub mod debounce;
pub mod error;
pub mod model;
pub mod query;
pub mod registry;
pub mod sequence;
pub mod store;
pub mod sync;
pub mod workflow;
