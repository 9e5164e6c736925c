//! Conflux - Composite build model aggregation
//!
//! This library fetches a typed model from each participant of a composite
//! build and joins the per-participant results into a single combined
//! result. Each participant is reached through its own connection and
//! responds on a thread it owns; conflux synchronizes those independent
//! completions into exactly one terminal outcome.
//!
//! # High-Level API
//!
//! The [`composite`] module provides the aggregation entry point:
//!
//! ```ignore
//! use conflux::composite::CompositeModelBuilder;
//!
//! let connections: Vec<&dyn ParticipantConnection<ProjectModel>> =
//!     vec![&app_build, &lib_build];
//!
//! // Blocking form: returns the combined models or the first failure.
//! let models = CompositeModelBuilder::new(connections).get()?;
//! ```

pub mod composite;
pub mod logging;

/// Version of the conflux library.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
