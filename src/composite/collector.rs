//! Shared aggregation state and the per-participant completion handler.
//!
//! Every participant's completion thread writes into one
//! [`AggregateState`]: successful models into the result buffer, failures
//! into a single-assignment first-failure cell. Both tolerate concurrent
//! writers; neither is touched again after the barrier fires.

use super::barrier::CompletionBarrier;
use super::error::ParticipantFailure;
use super::participant::ModelResultHandler;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::debug;

/// Shared mutable state of one aggregation call.
///
/// The result buffer is an unordered collection; arrival order carries no
/// meaning and uniqueness is not enforced. The first-failure cell has
/// write-once-wins semantics: the earliest recorded failure sticks and
/// every later write is a silent no-op.
pub(crate) struct AggregateState<T> {
    results: Mutex<Vec<T>>,
    first_failure: OnceLock<ParticipantFailure>,
}

impl<T> AggregateState<T> {
    pub(crate) fn new() -> Self {
        Self {
            results: Mutex::new(Vec::new()),
            first_failure: OnceLock::new(),
        }
    }

    /// Inserts one participant's model into the shared result buffer.
    pub(crate) fn record_result(&self, model: T) {
        self.results
            .lock()
            .expect("aggregation state broken")
            .push(model);
    }

    /// Attempts to record the first failure. Returns true if this failure
    /// won the cell; later failures are dropped without trace.
    pub(crate) fn record_failure(&self, failure: ParticipantFailure) -> bool {
        self.first_failure.set(failure).is_ok()
    }

    /// Returns the recorded first failure, if any. Read once, after the
    /// barrier fires.
    pub(crate) fn first_failure(&self) -> Option<ParticipantFailure> {
        self.first_failure.get().cloned()
    }

    /// Drains the result buffer. Called only from the barrier's completion
    /// action, after every participant has reported.
    pub(crate) fn take_results(&self) -> Vec<T> {
        std::mem::take(&mut *self.results.lock().expect("aggregation state broken"))
    }
}

/// Completion handler installed on one participant's model fetch.
///
/// Records the terminal event into the shared state, then arrives at the
/// barrier. Failed participants still arrive, so the barrier count always
/// reaches the participant total.
pub(crate) struct ParticipantResultHandler<T> {
    participant: String,
    state: Arc<AggregateState<T>>,
    barrier: Arc<CompletionBarrier>,
}

impl<T> ParticipantResultHandler<T> {
    pub(crate) fn new(
        participant: impl Into<String>,
        state: Arc<AggregateState<T>>,
        barrier: Arc<CompletionBarrier>,
    ) -> Self {
        Self {
            participant: participant.into(),
            state,
            barrier,
        }
    }
}

impl<T: Send> ModelResultHandler<T> for ParticipantResultHandler<T> {
    fn on_complete(self: Box<Self>, model: T) {
        self.state.record_result(model);
        debug!(participant = %self.participant, "participant model fetched");
        self.barrier.arrive_and_wait();
    }

    fn on_failure(self: Box<Self>, failure: ParticipantFailure) {
        if self.state.record_failure(failure) {
            debug!(participant = %self.participant, "participant failure recorded");
        }
        self.barrier.arrive_and_wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_results_accumulate() {
        let state: AggregateState<u32> = AggregateState::new();
        state.record_result(1);
        state.record_result(2);

        let results = state.take_results();
        assert_eq!(results.len(), 2);
        assert!(results.contains(&1));
        assert!(results.contains(&2));
    }

    #[test]
    fn test_take_results_drains() {
        let state: AggregateState<u32> = AggregateState::new();
        state.record_result(7);
        assert_eq!(state.take_results(), vec![7]);
        assert!(state.take_results().is_empty());
    }

    #[test]
    fn test_first_failure_wins() {
        let state: AggregateState<u32> = AggregateState::new();
        assert!(state.record_failure(ParticipantFailure::build("first")));
        assert!(!state.record_failure(ParticipantFailure::build("second")));

        let failure = state.first_failure().expect("failure should be recorded");
        assert_eq!(format!("{}", failure), "first");
    }

    #[test]
    fn test_no_failure_recorded() {
        let state: AggregateState<u32> = AggregateState::new();
        assert!(state.first_failure().is_none());
    }

    #[test]
    fn test_exactly_one_concurrent_failure_wins() {
        let state = Arc::new(AggregateState::<u32>::new());
        let mut handles = Vec::new();
        for i in 0..8 {
            let state = Arc::clone(&state);
            handles.push(thread::spawn(move || {
                state.record_failure(ParticipantFailure::build(format!("failure-{}", i)))
            }));
        }

        let wins = handles
            .into_iter()
            .map(|h| h.join().expect("writer panicked"))
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
        assert!(state.first_failure().is_some());
    }

    #[test]
    fn test_concurrent_inserts_all_visible() {
        let state = Arc::new(AggregateState::<usize>::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let state = Arc::clone(&state);
            handles.push(thread::spawn(move || state.record_result(i)));
        }
        for handle in handles {
            handle.join().expect("writer panicked");
        }

        let mut results = state.take_results();
        results.sort_unstable();
        assert_eq!(results, (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn test_handler_arrives_after_success() {
        let state = Arc::new(AggregateState::<u32>::new());
        let barrier = Arc::new(CompletionBarrier::new(1, || {}));
        let handler =
            ParticipantResultHandler::new("build-a", Arc::clone(&state), Arc::clone(&barrier));

        Box::new(handler).on_complete(42);
        assert_eq!(state.take_results(), vec![42]);
    }

    #[test]
    fn test_handler_arrives_after_failure() {
        let state = Arc::new(AggregateState::<u32>::new());
        let barrier = Arc::new(CompletionBarrier::new(1, || {}));
        let handler =
            ParticipantResultHandler::new("build-a", Arc::clone(&state), Arc::clone(&barrier));

        Box::new(handler).on_failure(ParticipantFailure::connection("refused"));
        assert!(state.first_failure().is_some());
    }
}
