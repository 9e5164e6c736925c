//! Participant connection seam.
//!
//! A participant is one independently-reachable build in a composite. The
//! aggregation core never talks to a transport directly; it goes through
//! [`ParticipantConnection`], which opens an asynchronous model fetch and
//! later reports exactly one result on a thread the connection owns.
//!
//! The exactly-once contract is expressed in the type system: the methods
//! of [`ModelResultHandler`] consume the boxed handler, so a connection
//! cannot report twice.

use super::error::ParticipantFailure;
use tokio_util::sync::CancellationToken;

/// Request forwarded to every participant's model fetch.
///
/// Carries the requested model type tag and an optional cancellation
/// token. The same request (token included) is cloned to every
/// participant before any fetch starts; it is never updated mid-flight.
#[derive(Clone, Debug)]
pub struct ModelRequest {
    model_type: &'static str,
    cancellation: Option<CancellationToken>,
}

impl ModelRequest {
    /// Creates a request for model type `T`.
    pub fn new<T>() -> Self {
        Self {
            model_type: std::any::type_name::<T>(),
            cancellation: None,
        }
    }

    pub(crate) fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Returns the full type path of the requested model.
    pub fn model_type(&self) -> &'static str {
        self.model_type
    }

    /// Returns the short model name used in diagnostics.
    pub fn model_name(&self) -> &'static str {
        short_type_name(self.model_type)
    }

    /// Returns the cancellation token, if one was supplied.
    pub fn cancellation_token(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    /// Returns true if a token was supplied and has been cancelled.
    ///
    /// Convenience for connection implementations that poll before or
    /// during their fetch.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .map(|token| token.is_cancelled())
            .unwrap_or(false)
    }
}

/// Receives the single terminal event of one participant's model fetch.
///
/// A connection must invoke exactly one of these methods, exactly once,
/// on a thread it controls. Consuming `Box<Self>` makes a second call
/// impossible.
pub trait ModelResultHandler<T>: Send {
    /// The participant produced its model.
    fn on_complete(self: Box<Self>, model: T);

    /// The participant's fetch failed.
    fn on_failure(self: Box<Self>, failure: ParticipantFailure);
}

/// One participant of a composite build.
///
/// Implementations own the transport to the participant and the thread on
/// which the result is reported. The aggregation core only borrows the
/// connection for the duration of one call and performs no thread
/// creation of its own.
pub trait ParticipantConnection<T>: Send + Sync {
    /// Human-readable participant name for diagnostics.
    fn display_name(&self) -> &str;

    /// Opens one asynchronous model fetch.
    ///
    /// Must return without blocking on the fetch itself and later invoke
    /// exactly one of `handler.on_complete` / `handler.on_failure`.
    fn fetch_model(&self, request: ModelRequest, handler: Box<dyn ModelResultHandler<T>>);
}

/// Shortens a full type path to its final segment for diagnostics.
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    full.rsplit("::").next().unwrap_or(full)
}
