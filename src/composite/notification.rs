//! Result notification seam.
//!
//! The caller-supplied sink for the terminal outcome of one aggregation
//! call. Invoked exactly once, on whichever participant thread arrives
//! last at the completion barrier.

use super::error::CompositeFetchError;

/// Receives the single terminal outcome of a composite model fetch.
///
/// Exactly one of these methods is invoked, exactly once per aggregation
/// call. The blocking form wires a [`BlockingOutcomeSender`] in here; any
/// other implementation receives the callback on the last-arriving
/// participant's thread and should not block it longer than necessary.
///
/// [`BlockingOutcomeSender`]: super::BlockingOutcomeSender
pub trait AggregateResultHandler<T>: Send + 'static {
    /// All participants succeeded; `models` is the combined (and, for
    /// hierarchical types, flattened) result set.
    fn on_complete(self: Box<Self>, models: Vec<T>);

    /// At least one participant failed; `failure` wraps the first failure
    /// to arrive.
    fn on_failure(self: Box<Self>, failure: CompositeFetchError);
}
