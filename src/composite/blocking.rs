//! Blocking adapter over the asynchronous terminal outcome.
//!
//! Bridges the callback-based fan-in protocol to a synchronous caller: a
//! single-slot rendezvous where the barrier's completion action deposits
//! the terminal outcome and the blocking caller withdraws it exactly once.
//!
//! On re-raise of a failure, the calling thread's stack is captured and
//! stitched after the failure's origin snapshot, so diagnostics show both
//! where the remote failure originated and where the blocking call was
//! made as one continuous trace.

use super::error::CompositeFetchError;
use super::notification::AggregateResultHandler;
use std::backtrace::Backtrace;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use tracing::debug;

/// Frames dropped from the call-site snapshot: the capture call and
/// `BlockingModelReceiver::wait` itself.
const ADAPTER_FRAMES: usize = 2;

enum TerminalOutcome<T> {
    Combined(Vec<T>),
    Failed(CompositeFetchError),
}

/// Creates a connected deposit/withdraw pair over a capacity-one slot.
pub fn channel<T>() -> (BlockingOutcomeSender<T>, BlockingModelReceiver<T>) {
    let (slot_tx, slot_rx) = sync_channel(1);
    (
        BlockingOutcomeSender { slot: slot_tx },
        BlockingModelReceiver { slot: slot_rx },
    )
}

/// Deposits the terminal outcome into the rendezvous slot.
///
/// Implements [`AggregateResultHandler`], so it plugs directly into
/// [`CompositeModelBuilder::fetch`] as the result notification.
///
/// [`CompositeModelBuilder::fetch`]: super::CompositeModelBuilder::fetch
pub struct BlockingOutcomeSender<T> {
    slot: SyncSender<TerminalOutcome<T>>,
}

impl<T> BlockingOutcomeSender<T> {
    fn deposit(self, outcome: TerminalOutcome<T>) {
        // The consumer is guaranteed to withdraw, so depositing must never
        // block. A full slot would mean a second terminal delivery, which
        // the barrier protocol rules out.
        match self.slot.try_send(outcome) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                panic!("terminal outcome deposited twice; composite protocol violated")
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("blocking caller dropped before the terminal outcome was delivered");
            }
        }
    }
}

impl<T: Send + 'static> AggregateResultHandler<T> for BlockingOutcomeSender<T> {
    fn on_complete(self: Box<Self>, models: Vec<T>) {
        self.deposit(TerminalOutcome::Combined(models));
    }

    fn on_failure(self: Box<Self>, failure: CompositeFetchError) {
        self.deposit(TerminalOutcome::Failed(failure));
    }
}

/// Withdraws the terminal outcome, blocking the calling thread.
pub struct BlockingModelReceiver<T> {
    slot: Receiver<TerminalOutcome<T>>,
}

impl<T> BlockingModelReceiver<T> {
    /// Blocks until the terminal outcome is available, then returns the
    /// combined models or the recorded failure with the call-site stack
    /// attached.
    ///
    /// # Panics
    ///
    /// Panics if the slot closes without a deposit. That means the
    /// exactly-once delivery protocol was violated; there is no outcome
    /// to wait for and never will be.
    pub fn wait(self) -> Result<Vec<T>, CompositeFetchError> {
        let outcome = self
            .slot
            .recv()
            .unwrap_or_else(|_| panic!("composite aggregation ended without a terminal outcome"));

        match outcome {
            TerminalOutcome::Combined(models) => Ok(models),
            TerminalOutcome::Failed(mut failure) => {
                let call_site = Backtrace::force_capture().to_string();
                failure.attach_call_site(drop_innermost_frames(&call_site, ADAPTER_FRAMES));
                Err(failure)
            }
        }
    }
}

/// Drops the first `count` frames from a formatted backtrace.
///
/// A frame starts with an indented `N:` line and may be followed by
/// `at file:line` continuation lines, which travel with their frame.
fn drop_innermost_frames(trace: &str, count: usize) -> String {
    let mut skipped = 0;
    let mut keeping = false;
    let mut kept = String::new();

    for line in trace.lines() {
        if is_frame_start(line) {
            if skipped < count {
                skipped += 1;
                keeping = false;
            } else {
                keeping = true;
            }
        }
        if keeping {
            kept.push_str(line);
            kept.push('\n');
        }
    }

    kept
}

fn is_frame_start(line: &str) -> bool {
    let head = line.trim_start();
    match head.split_once(':') {
        Some((index, _)) => !index.is_empty() && index.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::error::ParticipantFailure;
    use std::thread;
    use std::time::Duration;

    fn fetch_failure() -> CompositeFetchError {
        CompositeFetchError::new(
            "ProjectModel",
            &["app".to_string()],
            ParticipantFailure::build("boom"),
        )
    }

    #[test]
    fn test_deposit_then_withdraw() {
        let (sender, receiver) = channel::<u32>();
        Box::new(sender).on_complete(vec![1, 2, 3]);
        assert_eq!(receiver.wait().expect("combined outcome"), vec![1, 2, 3]);
    }

    #[test]
    fn test_withdraw_blocks_until_deposit() {
        let (sender, receiver) = channel::<u32>();

        let depositor = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            Box::new(sender).on_complete(vec![7]);
        });

        assert_eq!(receiver.wait().expect("combined outcome"), vec![7]);
        depositor.join().expect("depositor panicked");
    }

    #[test]
    fn test_failure_gains_call_site_trace() {
        let (sender, receiver) = channel::<u32>();
        Box::new(sender).on_failure(fetch_failure());

        let err = receiver.wait().expect_err("failed outcome");
        assert!(err.stitched_trace().contains("composite fetch requested at"));
    }

    #[test]
    fn test_deposit_into_dropped_receiver_is_tolerated() {
        let (sender, receiver) = channel::<u32>();
        drop(receiver);
        // Must neither panic nor block
        Box::new(sender).on_complete(vec![1]);
    }

    #[test]
    #[should_panic(expected = "without a terminal outcome")]
    fn test_wait_panics_when_sender_vanishes() {
        let (sender, receiver) = channel::<u32>();
        drop(sender);
        let _ = receiver.wait();
    }

    #[test]
    fn test_drop_innermost_frames() {
        let trace = "   0: adapter::capture\n             at src/a.rs:10:5\n   \
                     1: adapter::wait\n             at src/a.rs:20:5\n   \
                     2: caller::main\n             at src/main.rs:3:1\n";
        let snipped = drop_innermost_frames(trace, 2);
        assert!(!snipped.contains("adapter::capture"));
        assert!(!snipped.contains("adapter::wait"));
        assert!(snipped.contains("caller::main"));
        assert!(snipped.contains("src/main.rs:3:1"));
    }

    #[test]
    fn test_drop_more_frames_than_present() {
        let trace = "   0: only::frame\n";
        assert!(drop_innermost_frames(trace, 5).is_empty());
    }

    #[test]
    fn test_frame_start_detection() {
        assert!(is_frame_start("   0: foo::bar"));
        assert!(is_frame_start("  12: foo"));
        assert!(!is_frame_start("             at src/main.rs:3:1"));
        assert!(!is_frame_start("plain text"));
    }
}
