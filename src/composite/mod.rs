//! Composite Model Aggregation
//!
//! This module fetches a typed model from each participant of a composite
//! build and joins the per-participant results into one combined result.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  CompositeModelBuilder                       │
//! │  Fan-out: one model fetch per participant connection        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐  ┌──────────────┐  ┌────────────────────┐  │
//! │  │ Aggregate   │  │ Completion   │  │ Hierarchy          │  │
//! │  │ State       │  │ Barrier      │  │ Flattener          │  │
//! │  └─────────────┘  └──────────────┘  └────────────────────┘  │
//! ├─────────────────────────────────────────────────────────────┤
//! │                  Result Notification                         │
//! │  Callback handler, or blocking rendezvous via `get()`       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Core Concepts
//!
//! - **Participant**: one independently-reachable build whose model is
//!   fetched through its own [`ParticipantConnection`]. Each connection
//!   reports its result on a thread it owns, exactly once.
//!
//! - **Fan-in**: every participant's completion handler records its result
//!   (or the first failure) into shared aggregation state and then arrives
//!   at a [`CompletionBarrier`]. The final arrival runs the delivery action
//!   exactly once, so the caller sees exactly one terminal outcome no
//!   matter how completions interleave.
//!
//! - **First failure wins**: if any participant fails, the combined result
//!   is discarded and the earliest-arriving failure is reported. Which
//!   failure arrives first is nondeterministic when several fail at once.
//!
//! - **Hierarchical models**: model types exposing same-typed children can
//!   be expanded so the combined result contains every reachable node, not
//!   just the top-level ones. See [`HierarchicalModel`].
//!
//! # Example
//!
//! ```ignore
//! use conflux::composite::{CompositeModelBuilder, ParticipantConnection};
//!
//! let participants: Vec<&dyn ParticipantConnection<ProjectModel>> =
//!     vec![&app_build, &lib_build, &docs_build];
//!
//! // Blocking form
//! let models = CompositeModelBuilder::new(participants).get()?;
//!
//! // Callback form
//! CompositeModelBuilder::new(participants).fetch(my_handler)?;
//! ```
//!
//! The builder never creates threads of its own. Completing participants
//! block on their callback threads at the barrier until every other
//! participant has reported, so the slowest participant gates delivery.

mod barrier;
mod blocking;
mod builder;
mod collector;
mod error;
mod hierarchy;
mod notification;
mod participant;

// Participant seam
pub use participant::{ModelRequest, ModelResultHandler, ParticipantConnection};

// Errors
pub use error::{
    CompositeBuildError, CompositeFetchError, ParticipantFailure, ParticipantFailureKind,
    UnsupportedOperationError,
};

// Synchronization primitive
pub use barrier::CompletionBarrier;

// Hierarchical flattening
pub use hierarchy::{flatten_hierarchy, HierarchicalModel};

// Result notification
pub use notification::AggregateResultHandler;

// Blocking adapter
pub use blocking::{channel, BlockingModelReceiver, BlockingOutcomeSender};

// Aggregation entry point
pub use builder::CompositeModelBuilder;
