//! Job status signals and the default status tracker.
//!
//! The orchestrator consults a [`StatusTracker`] for exactly two decisions:
//! whether the job is running and whether it has finished. Everything else
//! here (counters, elapsed time, dispatch) is bookkeeping the tracker owns
//! on its own.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tracing::debug;

use crate::model::error::EventError;
use crate::model::event::JobEvent;

/// Lifecycle state of the observed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Queued, waiting for dispatch.
    Pending,
    /// Accepted by a runner, not yet producing output.
    Waiting,
    /// Actively producing output.
    Running,
    /// Finished without failures.
    Successful,
    /// Finished with task failures.
    Failed,
    /// Aborted by an internal error.
    Error,
    /// Canceled by a user.
    Canceled,
}

impl JobState {
    /// Whether the job is currently producing output.
    pub fn is_running(self) -> bool {
        matches!(self, JobState::Running)
    }

    /// Whether the job has reached a terminal state.
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            JobState::Successful | JobState::Failed | JobState::Error | JobState::Canceled
        )
    }

    fn from_wire(raw: &str) -> Result<Self, EventError> {
        match raw {
            "pending" => Ok(JobState::Pending),
            "waiting" => Ok(JobState::Waiting),
            "running" => Ok(JobState::Running),
            "successful" => Ok(JobState::Successful),
            "failed" => Ok(JobState::Failed),
            "error" => Ok(JobState::Error),
            "canceled" => Ok(JobState::Canceled),
            other => Err(EventError::UnknownState {
                raw: other.to_owned(),
            }),
        }
    }
}

/// A status notification delivered over the live channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    /// The state the job transitioned to.
    pub state: JobState,
    /// Completion time, present once the job reaches a terminal state.
    #[serde(default)]
    pub finished: Option<DateTime<Utc>>,
}

impl StatusEvent {
    /// Decode a status notification payload.
    ///
    /// # Errors
    ///
    /// [`EventError::MissingField`] if `status` is absent,
    /// [`EventError::UnknownState`] for an unrecognized state name,
    /// [`EventError::InvalidTimestamp`] for an unparseable `finished`.
    pub fn from_payload(payload: &Value) -> Result<Self, EventError> {
        let raw = payload
            .get("status")
            .and_then(Value::as_str)
            .ok_or(EventError::MissingField { field: "status" })?;
        let state = JobState::from_wire(raw)?;

        let finished = match payload.get("finished").and_then(Value::as_str) {
            Some(raw) => Some(
                DateTime::parse_from_rfc3339(raw)
                    .map_err(|_| EventError::InvalidTimestamp {
                        raw: raw.to_owned(),
                    })?
                    .with_timezone(&Utc),
            ),
            None => None,
        };

        Ok(Self { state, finished })
    }
}

/// Aggregate stats recomputed when the stream stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobStats {
    /// Number of output events observed.
    pub events: u64,
    /// Wall-clock span between the first and last observed event.
    pub elapsed: Option<TimeDelta>,
}

/// Snapshot published to observers on [`StatusTracker::dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    /// Current job state.
    pub state: JobState,
    /// Stats as of the last [`StatusTracker::update_stats`] call.
    pub stats: JobStats,
}

/// Status contract the orchestrator binds to.
///
/// Read `running`/`finished` at initialization; write status transitions,
/// event counters, and the end-of-stream stats dispatch.
pub trait StatusTracker: Send {
    /// Whether the job is currently producing output.
    fn running(&self) -> bool;
    /// Whether the job has reached a terminal state.
    fn finished(&self) -> bool;
    /// Record a state transition signaled by the stream lifecycle.
    fn set_job_status(&mut self, state: JobState);
    /// Record one live output event.
    fn push_job_event(&mut self, event: &JobEvent);
    /// Record a status notification.
    fn push_status_event(&mut self, event: StatusEvent);
    /// Recompute aggregate stats from the recorded counters.
    fn update_stats(&mut self);
    /// Publish the current state and stats to observers.
    fn dispatch(&mut self);
}

/// Default [`StatusTracker`] keeping the counters the viewer needs.
///
/// Observers receive [`StatusSnapshot`]s over a `watch` channel; `dispatch`
/// publishes, so intermediate mutations stay invisible until the stream
/// lifecycle decides otherwise.
#[derive(Debug)]
pub struct JobStatusModel {
    state: JobState,
    events: u64,
    first_event_at: Option<DateTime<Utc>>,
    last_event_at: Option<DateTime<Utc>>,
    stats: JobStats,
    publisher: watch::Sender<StatusSnapshot>,
}

impl JobStatusModel {
    /// Create a tracker in `initial` state plus a snapshot subscription.
    pub fn new(initial: JobState) -> (Self, watch::Receiver<StatusSnapshot>) {
        let (publisher, subscription) = watch::channel(StatusSnapshot {
            state: initial,
            stats: JobStats::default(),
        });
        (
            Self {
                state: initial,
                events: 0,
                first_event_at: None,
                last_event_at: None,
                stats: JobStats::default(),
                publisher,
            },
            subscription,
        )
    }

    /// Current state, for hosts embedding the model directly.
    pub fn state(&self) -> JobState {
        self.state
    }

    /// Stats as of the last `update_stats` call.
    pub fn stats(&self) -> JobStats {
        self.stats
    }
}

impl StatusTracker for JobStatusModel {
    fn running(&self) -> bool {
        self.state.is_running()
    }

    fn finished(&self) -> bool {
        self.state.is_finished()
    }

    fn set_job_status(&mut self, state: JobState) {
        if self.state != state {
            debug!(?state, "job status transition");
        }
        self.state = state;
    }

    fn push_job_event(&mut self, event: &JobEvent) {
        self.events += 1;
        if let Some(created) = event.created {
            self.first_event_at.get_or_insert(created);
            self.last_event_at = Some(created);
        }
    }

    fn push_status_event(&mut self, event: StatusEvent) {
        self.set_job_status(event.state);
    }

    fn update_stats(&mut self) {
        let elapsed = match (self.first_event_at, self.last_event_at) {
            (Some(first), Some(last)) => Some(last - first),
            _ => None,
        };
        self.stats = JobStats {
            events: self.events,
            elapsed,
        };
    }

    fn dispatch(&mut self) {
        self.publisher.send_replace(StatusSnapshot {
            state: self.state,
            stats: self.stats,
        });
    }
}
