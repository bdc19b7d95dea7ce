//! Live-tail stream engine.
//!
//! Converts pushed live events into append frames while enforcing the
//! minimum-line boundary that separates "already rendered via paging" from
//! "new". Attachment state is one tagged value plus a `transitioning` latch
//! guarding pause/resume races; there is deliberately no other bookkeeping
//! to fall out of sync.

use std::collections::VecDeque;
use tracing::{debug, info};

use crate::model::JobEvent;

/// Attachment state of the live tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Not attached; pushed events are still validated and buffered only
    /// once the first acceptable event activates the engine.
    Inactive,
    /// Attached to the live tail.
    Active {
        /// Frames are buffered instead of released while paused.
        paused: bool,
    },
}

/// Lifecycle edges observed by the orchestrator, fired exactly once per
/// stream session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamLifecycle {
    /// The first live event of a session was accepted.
    Started,
    /// The stream session ended.
    Stopped,
}

/// State machine for live-tail attachment and event admission.
#[derive(Debug)]
pub struct StreamEngine {
    state: StreamState,
    transitioning: bool,
    min_line: u64,
    buffer: Vec<JobEvent>,
    lifecycle: VecDeque<StreamLifecycle>,
}

impl Default for StreamEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamEngine {
    /// Create a detached engine accepting events from line 1.
    pub fn new() -> Self {
        Self {
            state: StreamState::Inactive,
            transitioning: false,
            min_line: 0,
            buffer: Vec::new(),
            lifecycle: VecDeque::new(),
        }
    }

    /// Whether the engine is attached to the live tail.
    pub fn is_active(&self) -> bool {
        matches!(self.state, StreamState::Active { .. })
    }

    /// Whether the engine is attached but currently buffering.
    pub fn is_paused(&self) -> bool {
        matches!(self.state, StreamState::Active { paused: true })
    }

    /// Whether a pause/resume transition is still settling. New attach or
    /// scroll maneuvers must no-op while this holds.
    pub fn is_transitioning(&self) -> bool {
        self.transitioning
    }

    /// The lowest line number at which a live event counts as new.
    pub fn min_line(&self) -> u64 {
        self.min_line
    }

    /// Set the admission boundary from the most recent fetched batch.
    pub fn set_min_line(&mut self, min_line: u64) {
        debug!(min_line, "live admission boundary set");
        self.min_line = min_line;
    }

    /// Push one live event.
    ///
    /// Events below the boundary are discarded silently; at-least-once
    /// delivery and page/stream overlap make them expected, not errors.
    /// Returns the frame to append when the engine is running, `None` when
    /// the event was discarded or buffered behind a pause.
    pub fn push_job_event(&mut self, event: JobEvent) -> Option<Vec<JobEvent>> {
        if event.start_line < self.min_line {
            debug!(
                counter = event.counter,
                start_line = event.start_line,
                min_line = self.min_line,
                "discarding already-rendered live event"
            );
            return None;
        }

        if let StreamState::Inactive = self.state {
            info!("live stream session started");
            self.state = StreamState::Active { paused: false };
            self.lifecycle.push_back(StreamLifecycle::Started);
        }

        self.buffer.push(event);
        match self.state {
            StreamState::Active { paused: false } => self.take_frame(),
            _ => None,
        }
    }

    /// Suspend frame release. Buffered events accumulate until resume.
    ///
    /// A non-immediate pause leaves the `transitioning` latch set until the
    /// in-flight frame is drained.
    pub fn pause(&mut self, immediate: bool) {
        let StreamState::Active { paused } = &mut self.state else {
            return;
        };
        if *paused {
            return;
        }
        *paused = true;
        self.transitioning = !immediate;
    }

    /// Release the pause. Any backlog makes the engine `transitioning`
    /// until the buffered frame is drained with [`Self::take_frame`].
    pub fn resume(&mut self, immediate: bool) {
        let StreamState::Active { paused } = &mut self.state else {
            return;
        };
        if !*paused {
            return;
        }
        *paused = false;
        self.transitioning = !immediate || !self.buffer.is_empty();
    }

    /// Drain the buffered frame, if the engine is running.
    ///
    /// Re-filters against the current boundary: the boundary may have moved
    /// past buffered events while they waited (a last-page fetch during the
    /// same maneuver), and replaying those would duplicate rendered lines.
    /// Always clears the `transitioning` latch.
    pub fn take_frame(&mut self) -> Option<Vec<JobEvent>> {
        self.transitioning = false;
        if !matches!(self.state, StreamState::Active { paused: false }) {
            return None;
        }
        let min_line = self.min_line;
        let frame: Vec<JobEvent> = self
            .buffer
            .drain(..)
            .filter(|event| event.start_line >= min_line)
            .collect();
        if frame.is_empty() {
            None
        } else {
            Some(frame)
        }
    }

    /// End the stream session.
    ///
    /// Unreplayed buffered events are dropped; they are already persisted
    /// and reachable through paging.
    pub fn stop(&mut self) {
        if matches!(self.state, StreamState::Inactive) {
            return;
        }
        if !self.buffer.is_empty() {
            debug!(dropped = self.buffer.len(), "dropping unreplayed frames on stop");
        }
        info!("live stream session stopped");
        self.state = StreamState::Inactive;
        self.buffer.clear();
        self.transitioning = false;
        self.lifecycle.push_back(StreamLifecycle::Stopped);
    }

    /// Take the next unobserved lifecycle edge, if any.
    pub fn take_lifecycle_event(&mut self) -> Option<StreamLifecycle> {
        self.lifecycle.pop_front()
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
