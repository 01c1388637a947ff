//! Resource kinds
//!
//! # Architecture
//!
//! - [`kind`] - The [`ResourceKind`] enum every store and action is keyed by
//! - [`registry`] - Loads per-kind definitions from embedded JSON
//!
//! Definitions live in `src/resources/kinds.json`; each entry names the
//! API path, the payload key its records arrive under, and the fields its
//! filter bar exposes.

mod kind;
mod registry;

pub use kind::ResourceKind;
pub use registry::*;
