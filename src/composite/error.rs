//! Error types for composite model aggregation.
//!
//! Three distinct conditions exist and are never mixed:
//!
//! - [`ParticipantFailure`]: a reported, expected failure from one
//!   participant's model fetch. The first one to arrive is wrapped in a
//!   [`CompositeFetchError`] and delivered as the terminal outcome.
//! - [`UnsupportedOperationError`]: a synchronous caller usage error from
//!   the rejected configuration surface. Raised before any fetch starts.
//! - Fatal coordination failures (a broken barrier, a terminal outcome that
//!   was never delivered) are panics, not error values. They indicate a
//!   violated protocol invariant and are unrecoverable.

use std::backtrace::Backtrace;
use thiserror::Error;

/// Hint appended when a participant rejects the fetch at the protocol
/// level, suggesting a version mismatch between client and participant.
pub(crate) const INCOMPATIBLE_VERSION_HINT: &str =
    "The target build may be running a tooling version that does not support this request. \
     Upgrade the participant build and retry.";

/// Classification of a participant-side fetch failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParticipantFailureKind {
    /// The participant could not be reached or the connection broke.
    Connection,

    /// The participant's build itself failed while producing the model.
    Build,

    /// The participant does not know the requested model type.
    UnsupportedModel,

    /// The participant rejected the fetch operation at the protocol level.
    ///
    /// Unlike [`UnsupportedModel`](Self::UnsupportedModel), this usually
    /// means the participant runs an older tooling version, so the wrapped
    /// error carries a version-incompatibility hint.
    UnsupportedProtocol,
}

impl std::fmt::Display for ParticipantFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connection => write!(f, "connection"),
            Self::Build => write!(f, "build"),
            Self::UnsupportedModel => write!(f, "unsupported model"),
            Self::UnsupportedProtocol => write!(f, "unsupported protocol"),
        }
    }
}

/// A failure reported by one participant's model fetch.
///
/// Captures a stack snapshot at construction, i.e. on the participant's
/// completion thread. The snapshot is stored formatted so the failure can
/// travel through the single-assignment first-failure cell by clone.
#[derive(Clone, Debug, Error)]
#[error("{message}")]
pub struct ParticipantFailure {
    message: String,
    kind: ParticipantFailureKind,
    origin_trace: String,
}

impl ParticipantFailure {
    /// Creates a failure of the given kind, capturing the current thread's
    /// stack as the origin snapshot.
    pub fn new(kind: ParticipantFailureKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            origin_trace: Backtrace::force_capture().to_string(),
        }
    }

    /// Creates a connection failure.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ParticipantFailureKind::Connection, message)
    }

    /// Creates a build failure.
    pub fn build(message: impl Into<String>) -> Self {
        Self::new(ParticipantFailureKind::Build, message)
    }

    /// Creates an unsupported-model failure.
    pub fn unsupported_model(message: impl Into<String>) -> Self {
        Self::new(ParticipantFailureKind::UnsupportedModel, message)
    }

    /// Creates an unsupported-protocol failure.
    pub fn unsupported_protocol(message: impl Into<String>) -> Self {
        Self::new(ParticipantFailureKind::UnsupportedProtocol, message)
    }

    /// Returns the failure classification.
    pub fn kind(&self) -> ParticipantFailureKind {
        self.kind
    }

    /// Returns the stack snapshot captured where this failure was created.
    pub fn origin_trace(&self) -> &str {
        &self.origin_trace
    }
}

/// The terminal failure of a composite model fetch.
///
/// Wraps the first [`ParticipantFailure`] to arrive with a message naming
/// the requested model type and the participants involved. When the
/// blocking form re-raises this error, the call-site stack snapshot is
/// attached so [`stitched_trace`](Self::stitched_trace) shows both where
/// the failure originated and where the blocking call was made.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CompositeFetchError {
    message: String,
    #[source]
    cause: ParticipantFailure,
    call_site_trace: Option<String>,
}

impl CompositeFetchError {
    pub(crate) fn new(model_name: &str, participants: &[String], cause: ParticipantFailure) -> Self {
        let mut message = format!(
            "Could not fetch model of type '{}' from composite of [{}]",
            model_name,
            participants.join(", ")
        );
        if cause.kind() == ParticipantFailureKind::UnsupportedProtocol {
            message.push('\n');
            message.push_str(INCOMPATIBLE_VERSION_HINT);
        }
        Self {
            message,
            cause,
            call_site_trace: None,
        }
    }

    /// Returns the participant failure that caused this error.
    pub fn cause(&self) -> &ParticipantFailure {
        &self.cause
    }

    pub(crate) fn attach_call_site(&mut self, trace: String) {
        self.call_site_trace = Some(trace);
    }

    /// Returns the combined diagnostic trace: the stack captured on the
    /// participant's completion thread, followed by the stack of the
    /// blocking call site when the error was re-raised there.
    pub fn stitched_trace(&self) -> String {
        match &self.call_site_trace {
            Some(call_site) => format!(
                "{}\n--- composite fetch requested at ---\n{}",
                self.cause.origin_trace(),
                call_site
            ),
            None => self.cause.origin_trace().to_string(),
        }
    }
}

/// Error raised by every rejected configuration setter.
///
/// Composite aggregation is defined only over the bare model fetch;
/// per-participant build configuration cannot be expressed through it.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("'{operation}' is not supported for composite connections")]
pub struct UnsupportedOperationError {
    operation: &'static str,
}

impl UnsupportedOperationError {
    pub(crate) fn new(operation: &'static str) -> Self {
        Self { operation }
    }

    /// Returns the name of the rejected operation.
    pub fn operation(&self) -> &'static str {
        self.operation
    }
}

/// Top-level error for composite aggregation calls.
#[derive(Debug, Error)]
pub enum CompositeBuildError {
    /// The aggregation was started with an empty participant set.
    #[error("a composite model fetch requires at least one participant")]
    NoParticipants,

    /// A configuration operation was used that composites reject.
    #[error(transparent)]
    Unsupported(#[from] UnsupportedOperationError),

    /// The fetch ran and a participant failed.
    #[error(transparent)]
    Fetch(#[from] CompositeFetchError),
}
