//! Job output events and pages.
//!
//! A [`JobEvent`] is one unit of job output covering an inclusive, 1-based
//! line range. Line ranges never overlap within a job and increase
//! monotonically, so events form a total order by line number. A [`Page`]
//! is an ordered, contiguous batch of events returned by the history store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::error::EventError;

/// One unit of job output.
///
/// Wire payloads are decoded at the boundary with [`JobEvent::from_payload`];
/// events built in-process go through [`JobEvent::new`], which enforces the
/// same bounds invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEvent {
    /// Dispatch-order counter assigned by the producer.
    pub counter: u64,
    /// First output line covered by this event (1-based, inclusive).
    pub start_line: u64,
    /// Last output line covered by this event (inclusive).
    pub end_line: u64,
    /// Raw output text. May span multiple lines or be empty.
    #[serde(default)]
    pub stdout: String,
    /// Producer-side creation time, when the transport supplies one.
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

impl JobEvent {
    /// Build an event, validating the line-range invariant.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::InvalidBounds`] if `end_line < start_line` or
    /// `start_line` is zero (line numbers are 1-based).
    pub fn new(
        counter: u64,
        start_line: u64,
        end_line: u64,
        stdout: impl Into<String>,
    ) -> Result<Self, EventError> {
        if start_line == 0 || end_line < start_line {
            return Err(EventError::InvalidBounds {
                start_line,
                end_line,
            });
        }
        Ok(Self {
            counter,
            start_line,
            end_line,
            stdout: stdout.into(),
            created: None,
        })
    }

    /// Decode an event from a live-notification payload.
    ///
    /// Required fields: `counter`, `start_line`, `end_line`. A payload
    /// missing any of them fails this single ingestion call; it does not
    /// poison the session.
    ///
    /// # Errors
    ///
    /// [`EventError::MissingField`] for absent or non-numeric required
    /// fields, [`EventError::InvalidBounds`] for an inverted or zero-based
    /// range, [`EventError::InvalidTimestamp`] for an unparseable `created`.
    pub fn from_payload(payload: &Value) -> Result<Self, EventError> {
        let counter = require_u64(payload, "counter")?;
        let start_line = require_u64(payload, "start_line")?;
        let end_line = require_u64(payload, "end_line")?;
        let stdout = payload
            .get("stdout")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();

        let mut event = Self::new(counter, start_line, end_line, stdout)?;
        if let Some(raw) = payload.get("created").and_then(Value::as_str) {
            let parsed = DateTime::parse_from_rfc3339(raw).map_err(|_| {
                EventError::InvalidTimestamp {
                    raw: raw.to_owned(),
                }
            })?;
            event.created = Some(parsed.with_timezone(&Utc));
        }
        Ok(event)
    }

    /// Number of rendered lines this event's range covers.
    pub fn line_span(&self) -> u64 {
        self.end_line - self.start_line + 1
    }
}

fn require_u64(payload: &Value, field: &'static str) -> Result<u64, EventError> {
    payload
        .get(field)
        .and_then(Value::as_u64)
        .ok_or(EventError::MissingField { field })
}

/// An ordered, contiguous batch of events from the history store.
///
/// Pages are numbered from 1. An empty query result is represented as
/// `Option::<Page>::None` by the store, never as a page with no events.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Position of this page within the job's history, starting at 1.
    pub number: u64,
    /// Events on this page, ordered by line number.
    pub events: Vec<JobEvent>,
}

/// Lowest line number strictly after every event in `events`.
///
/// This is the live-attach boundary rule: `1 + max(end_line)`. Returns
/// `None` for an empty slice, in which case the caller leaves the current
/// boundary untouched.
pub fn boundary_after(events: &[JobEvent]) -> Option<u64> {
    events.iter().map(|event| event.end_line).max().map(|max| max + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_rejects_inverted_range() {
        let err = JobEvent::new(1, 10, 9, "").unwrap_err();
        assert!(matches!(
            err,
            EventError::InvalidBounds {
                start_line: 10,
                end_line: 9
            }
        ));
    }

    #[test]
    fn new_rejects_zero_start_line() {
        assert!(JobEvent::new(1, 0, 0, "").is_err());
    }

    #[test]
    fn line_span_is_inclusive() {
        let event = JobEvent::new(1, 5, 9, "").unwrap();
        assert_eq!(event.line_span(), 5);

        let single = JobEvent::new(2, 10, 10, "").unwrap();
        assert_eq!(single.line_span(), 1);
    }

    #[test]
    fn from_payload_decodes_full_event() {
        let payload = json!({
            "counter": 3,
            "start_line": 1,
            "end_line": 2,
            "stdout": "ok: [localhost]\n",
            "created": "2026-03-01T12:00:00Z",
        });

        let event = JobEvent::from_payload(&payload).unwrap();
        assert_eq!(event.counter, 3);
        assert_eq!(event.start_line, 1);
        assert_eq!(event.end_line, 2);
        assert_eq!(event.stdout, "ok: [localhost]\n");
        assert!(event.created.is_some());
    }

    #[test]
    fn from_payload_without_bounds_fails_that_call_only() {
        let payload = json!({ "counter": 1, "stdout": "orphan" });
        let err = JobEvent::from_payload(&payload).unwrap_err();
        assert!(matches!(err, EventError::MissingField { field: "start_line" }));
    }

    #[test]
    fn from_payload_rejects_bad_timestamp() {
        let payload = json!({
            "counter": 1,
            "start_line": 1,
            "end_line": 1,
            "created": "yesterday-ish",
        });
        let err = JobEvent::from_payload(&payload).unwrap_err();
        assert!(matches!(err, EventError::InvalidTimestamp { .. }));
    }

    #[test]
    fn boundary_after_is_one_past_max_end_line() {
        let events = vec![
            JobEvent::new(1, 1, 10, "").unwrap(),
            JobEvent::new(2, 11, 50, "").unwrap(),
        ];
        assert_eq!(boundary_after(&events), Some(51));
        assert_eq!(boundary_after(&[]), None);
    }
}
