//! Composite model builder: fan-out, fan-in, and the public contract.
//!
//! [`CompositeModelBuilder`] issues one asynchronous model fetch per
//! participant and synchronizes all completions into exactly one terminal
//! notification. It owns no threads; each participant reports on a thread
//! its connection controls, and the delivery action runs inline on
//! whichever of those threads arrives last at the barrier.

use super::barrier::CompletionBarrier;
use super::blocking;
use super::collector::{AggregateState, ParticipantResultHandler};
use super::error::{CompositeBuildError, CompositeFetchError, UnsupportedOperationError};
use super::hierarchy::{flatten_hierarchy, HierarchicalModel};
use super::notification::AggregateResultHandler;
use super::participant::{short_type_name, ModelRequest, ParticipantConnection};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Aggregates one typed model across every participant of a composite.
///
/// Holds borrowed participant connections for the duration of the call.
/// The requested model type is fixed by the type parameter and identical
/// for every participant.
///
/// Two delivery forms exist: [`get`](Self::get) blocks the calling thread
/// until the combined result or first failure is available;
/// [`fetch`](Self::fetch) hands the terminal outcome to a caller-supplied
/// [`AggregateResultHandler`] exactly once.
pub struct CompositeModelBuilder<'c, T> {
    participants: Vec<&'c dyn ParticipantConnection<T>>,
    cancellation: Option<CancellationToken>,
    expand: Option<fn(Vec<T>) -> Vec<T>>,
}

impl<'c, T> std::fmt::Debug for CompositeModelBuilder<'c, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeModelBuilder")
            .field("participants", &self.participants.len())
            .field("cancellation", &self.cancellation)
            .field("expand", &self.expand.is_some())
            .finish()
    }
}

impl<'c, T> CompositeModelBuilder<'c, T> {
    /// Creates a builder over the given participants. Results are
    /// delivered as fetched, without hierarchical expansion.
    pub fn new(participants: Vec<&'c dyn ParticipantConnection<T>>) -> Self {
        Self {
            participants,
            cancellation: None,
            expand: None,
        }
    }

    /// Supplies a cancellation token that is forwarded identically to
    /// every participant's fetch before it starts.
    ///
    /// There is no fan-in-level cancellation: once started, the
    /// aggregation waits for every participant to report, including those
    /// that fail because they observed the token.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Returns the number of participants in this composite.
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }
}

impl<'c, T> CompositeModelBuilder<'c, T>
where
    T: HierarchicalModel + PartialEq,
{
    /// Creates a builder for a tree-shaped model type.
    ///
    /// Each top-level result is expanded into itself plus all reachable
    /// descendants before delivery. The expansion is resolved here, once
    /// per aggregation call, not per node.
    pub fn hierarchical(participants: Vec<&'c dyn ParticipantConnection<T>>) -> Self {
        Self {
            participants,
            cancellation: None,
            expand: Some(flatten_hierarchy::<T>),
        }
    }
}

impl<'c, T> CompositeModelBuilder<'c, T>
where
    T: Send + 'static,
{
    /// Fetches the model from every participant and delivers the terminal
    /// outcome to `handler` exactly once, on the last-arriving
    /// participant's thread.
    ///
    /// Returns immediately after all fetches have been opened. An empty
    /// participant set is rejected before any fetch starts.
    pub fn fetch<H>(&self, handler: H) -> Result<(), CompositeBuildError>
    where
        H: AggregateResultHandler<T>,
    {
        if self.participants.is_empty() {
            return Err(CompositeBuildError::NoParticipants);
        }

        let model_name = short_type_name(std::any::type_name::<T>());
        let participant_names: Vec<String> = self
            .participants
            .iter()
            .map(|connection| connection.display_name().to_string())
            .collect();

        debug!(
            model_type = model_name,
            participants = self.participants.len(),
            "starting composite model fetch"
        );

        let state = Arc::new(AggregateState::new());
        let expand = self.expand;
        let handler: Box<dyn AggregateResultHandler<T>> = Box::new(handler);

        let delivery_state = Arc::clone(&state);
        let barrier = Arc::new(CompletionBarrier::new(self.participants.len(), move || {
            deliver(delivery_state, expand, model_name, participant_names, handler);
        }));

        let mut request = ModelRequest::new::<T>();
        if let Some(token) = &self.cancellation {
            request = request.with_cancellation_token(token.clone());
        }

        for connection in &self.participants {
            let participant_handler = ParticipantResultHandler::new(
                connection.display_name(),
                Arc::clone(&state),
                Arc::clone(&barrier),
            );
            connection.fetch_model(request.clone(), Box::new(participant_handler));
        }

        Ok(())
    }

    /// Fetches the model from every participant and blocks until the
    /// combined result or the first failure is available.
    ///
    /// The slowest participant gates delivery. A returned
    /// [`CompositeFetchError`] carries a stitched trace spanning the
    /// failure's origin thread and this call site.
    pub fn get(&self) -> Result<Vec<T>, CompositeBuildError> {
        let (sender, receiver) = blocking::channel();
        self.fetch(sender)?;
        receiver.wait().map_err(CompositeBuildError::from)
    }
}

/// Barrier completion action: runs exactly once, after every participant
/// has reported and before any of their threads proceed.
fn deliver<T: 'static>(
    state: Arc<AggregateState<T>>,
    expand: Option<fn(Vec<T>) -> Vec<T>>,
    model_name: &'static str,
    participants: Vec<String>,
    handler: Box<dyn AggregateResultHandler<T>>,
) {
    match state.first_failure() {
        Some(cause) => {
            debug!(model_type = model_name, "composite model fetch failed");
            handler.on_failure(CompositeFetchError::new(model_name, &participants, cause));
        }
        None => {
            let mut models = state.take_results();
            if let Some(expand) = expand {
                models = expand(models);
            }
            debug!(
                model_type = model_name,
                models = models.len(),
                "composite model fetch complete"
            );
            handler.on_complete(models);
        }
    }
}

// =============================================================================
// Rejected configuration surface
// =============================================================================
//
// Composite aggregation is defined only over the bare model fetch.
// Per-participant build configuration cannot be forwarded through it, so
// every setter below fails immediately and synchronously; no participant
// fetch is ever started as a side effect.

impl<'c, T> CompositeModelBuilder<'c, T> {
    /// Rejected: task selection is per-participant configuration.
    pub fn for_tasks<I, S>(&mut self, _tasks: I) -> Result<&mut Self, UnsupportedOperationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Err(UnsupportedOperationError::new("for_tasks"))
    }

    /// Rejected: build arguments are per-participant configuration.
    pub fn with_arguments<I, S>(
        &mut self,
        _arguments: I,
    ) -> Result<&mut Self, UnsupportedOperationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Err(UnsupportedOperationError::new("with_arguments"))
    }

    /// Rejected: standard stream wiring is per-participant configuration.
    pub fn set_standard_output(
        &mut self,
        _output: Box<dyn io::Write + Send>,
    ) -> Result<&mut Self, UnsupportedOperationError> {
        Err(UnsupportedOperationError::new("set_standard_output"))
    }

    /// Rejected: standard stream wiring is per-participant configuration.
    pub fn set_standard_error(
        &mut self,
        _error: Box<dyn io::Write + Send>,
    ) -> Result<&mut Self, UnsupportedOperationError> {
        Err(UnsupportedOperationError::new("set_standard_error"))
    }

    /// Rejected: standard stream wiring is per-participant configuration.
    pub fn set_standard_input(
        &mut self,
        _input: Box<dyn io::Read + Send>,
    ) -> Result<&mut Self, UnsupportedOperationError> {
        Err(UnsupportedOperationError::new("set_standard_input"))
    }

    /// Rejected: output styling is per-participant configuration.
    pub fn set_color_output(
        &mut self,
        _color: bool,
    ) -> Result<&mut Self, UnsupportedOperationError> {
        Err(UnsupportedOperationError::new("set_color_output"))
    }

    /// Rejected: the JVM location is per-participant configuration.
    pub fn set_java_home(
        &mut self,
        _java_home: PathBuf,
    ) -> Result<&mut Self, UnsupportedOperationError> {
        Err(UnsupportedOperationError::new("set_java_home"))
    }

    /// Rejected: JVM arguments are per-participant configuration.
    pub fn set_jvm_arguments<I, S>(
        &mut self,
        _arguments: I,
    ) -> Result<&mut Self, UnsupportedOperationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Err(UnsupportedOperationError::new("set_jvm_arguments"))
    }

    /// Rejected: progress events are per-participant configuration.
    pub fn add_progress_listener<L>(
        &mut self,
        _listener: L,
    ) -> Result<&mut Self, UnsupportedOperationError>
    where
        L: Fn(&str) + Send + 'static,
    {
        Err(UnsupportedOperationError::new("add_progress_listener"))
    }
}
