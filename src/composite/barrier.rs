//! Barrier with a one-shot completion action.
//!
//! [`CompletionBarrier`] counts a fixed number of arrivals. The final
//! arriver runs an associated action exactly once, while every earlier
//! arriver stays blocked; all arrivers are released only after the action
//! returns. This is the rendezvous that turns N independent participant
//! completions into one terminal delivery.
//!
//! Composed from a counted latch and a single-execution guard: the action
//! lives in an `Option` that the final arriver takes under the state lock.

use std::sync::{Condvar, Mutex};

type CompletionAction = Box<dyn FnOnce() + Send>;

struct BarrierState {
    arrived: usize,
    complete: bool,
    action: Option<CompletionAction>,
}

/// A rendezvous for a fixed number of parties with an action that runs
/// exactly once on whichever thread arrives last.
pub struct CompletionBarrier {
    parties: usize,
    state: Mutex<BarrierState>,
    released: Condvar,
}

impl CompletionBarrier {
    /// Creates a barrier for `parties` arrivals.
    ///
    /// `parties` must be at least one; the aggregation entry point rejects
    /// empty participant sets before a barrier is ever constructed.
    pub fn new(parties: usize, action: impl FnOnce() + Send + 'static) -> Self {
        debug_assert!(parties > 0, "a barrier needs at least one party");
        Self {
            parties,
            state: Mutex::new(BarrierState {
                arrived: 0,
                complete: false,
                action: Some(Box::new(action)),
            }),
            released: Condvar::new(),
        }
    }

    /// Records one arrival and blocks until all parties have arrived and
    /// the completion action has finished.
    ///
    /// The final arriver runs the action on its own thread while holding
    /// the barrier lock, so no thread proceeds past the barrier before the
    /// action completes.
    ///
    /// # Panics
    ///
    /// Panics if the barrier is broken, i.e. the completion action
    /// panicked on another thread and poisoned the state lock. This is a
    /// fatal coordination failure, not a reportable fetch failure.
    pub fn arrive_and_wait(&self) {
        let mut state = self.state.lock().expect("completion barrier broken");
        state.arrived += 1;
        debug_assert!(state.arrived <= self.parties, "more arrivals than parties");

        if state.arrived == self.parties {
            let action = state
                .action
                .take()
                .expect("completion action already consumed");
            action();
            state.complete = true;
            self.released.notify_all();
        } else {
            while !state.complete {
                state = self
                    .released
                    .wait(state)
                    .expect("completion barrier broken");
            }
        }
    }

    /// Returns the number of parties this barrier waits for.
    pub fn parties(&self) -> usize {
        self.parties
    }
}
