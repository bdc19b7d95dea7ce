//! Error taxonomy for the viewer core.
//!
//! Hierarchical errors built on `thiserror`, composing via `From` so the
//! orchestrator's chains propagate with `?`:
//!
//! - [`ViewerError`]: top-level error for a failed orchestration sequence
//!   - [`FetchError`]: history query / transport failures (fatal to the
//!     sequence, never retried by the core)
//!   - [`EventError`]: a malformed live notification (fails only the one
//!     ingestion call)
//!   - `std::io::Error`: render-surface failures
//!
//! Empty pages and duplicate live events are *not* errors; they are normal
//! terminal conditions handled inline by the orchestrator.

use thiserror::Error;

/// Top-level error for a failed orchestration sequence.
///
/// A sequence that fails is reported to the subscribing layer as rejected;
/// the core performs no automatic retry. Retry and backoff policy belongs
/// to the transport and store collaborators.
#[derive(Debug, Error)]
pub enum ViewerError {
    /// A page fetch or subscription against the history store failed.
    #[error("history fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// A live notification payload could not be decoded into an event.
    #[error("event rejected: {0}")]
    Event(#[from] EventError),

    /// The render surface failed to apply a mutation.
    #[error("render surface error: {0}")]
    Render(#[from] std::io::Error),
}

/// Failure executing a paged history query or a live-feed subscription.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The backing store rejected or failed the query.
    #[error("store backend error: {message}")]
    Backend {
        /// Description reported by the store collaborator.
        message: String,
    },

    /// I/O failure reaching the store or transport.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A live notification that cannot be turned into a [`crate::model::JobEvent`].
///
/// These fail the single ingestion call that observed them, not the session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    /// A required field is absent or has the wrong type.
    #[error("event payload missing required field '{field}'")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },

    /// The line range is inverted or not 1-based.
    #[error("invalid line bounds: start_line={start_line}, end_line={end_line}")]
    InvalidBounds {
        /// Claimed first line.
        start_line: u64,
        /// Claimed last line.
        end_line: u64,
    },

    /// The `created` timestamp could not be parsed.
    #[error("invalid timestamp '{raw}'")]
    InvalidTimestamp {
        /// The raw value as it appeared on the wire.
        raw: String,
    },

    /// The `status` value named no known job state.
    #[error("unknown job state '{raw}'")]
    UnknownState {
        /// The raw value as it appeared on the wire.
        raw: String,
    },
}
