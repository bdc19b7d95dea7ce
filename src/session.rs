//! Viewer session run loop.
//!
//! Binds an [`Orchestrator`] to its inputs: live notifications from the
//! subscription, user scroll gestures from the host, and a sampling timer
//! for rest detection and reactive edge paging. Everything funnels through
//! the orchestrator's guarded chains one step at a time, which is what
//! keeps the collaborators free of concurrent mutation.

use std::time::Instant;

use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::warn;

use crate::feed::LiveNotification;
use crate::model::{JobEvent, StatusEvent, ViewerError};
use crate::orchestrator::Orchestrator;

/// How often the viewport is sampled for rest detection and edge paging.
const SAMPLE_INTERVAL: Duration = Duration::from_millis(50);

/// A user scroll gesture forwarded by the host view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// Jump to the top of the stream.
    Home,
    /// Jump to the bottom of the stream.
    End,
    /// Scroll up one viewport height.
    PageUp,
    /// Scroll down one viewport height.
    PageDown,
}

/// Host-side handle to a running session.
#[derive(Debug)]
pub struct SessionHandle {
    /// Send scroll gestures into the run loop.
    pub gestures: mpsc::Sender<Gesture>,
    /// Observe the back-to-top affordance: `true` while the viewport is in
    /// motion, `false` once it comes to rest.
    pub back_to_top: watch::Receiver<bool>,
}

/// Drives one orchestrator for the lifetime of a mounted view.
pub struct ViewerSession {
    orchestrator: Orchestrator,
    gestures: mpsc::Receiver<Gesture>,
    back_to_top: watch::Sender<bool>,
}

enum Step {
    Notification(Option<LiveNotification>),
    Gesture(Option<Gesture>),
    Tick,
}

impl ViewerSession {
    /// Wrap an orchestrator, returning the session and its host handle.
    pub fn new(orchestrator: Orchestrator) -> (Self, SessionHandle) {
        let (gesture_sender, gesture_receiver) = mpsc::channel(16);
        let (rest_sender, rest_receiver) = watch::channel(false);
        (
            Self {
                orchestrator,
                gestures: gesture_receiver,
                back_to_top: rest_sender,
            },
            SessionHandle {
                gestures: gesture_sender,
                back_to_top: rest_receiver,
            },
        )
    }

    /// Initialize the view and process inputs until the host hangs up or
    /// the transport closes.
    ///
    /// # Errors
    ///
    /// Propagates failed orchestration sequences (fetch and render
    /// failures). Malformed notifications are logged and dropped; they
    /// fail only their own ingestion.
    pub async fn run(&mut self) -> Result<(), ViewerError> {
        self.orchestrator.init().await?;

        let mut ticker = interval(SAMPLE_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let step = tokio::select! {
                notification = self.orchestrator.recv_notification() => {
                    Step::Notification(notification)
                }
                gesture = self.gestures.recv() => Step::Gesture(gesture),
                _ = ticker.tick() => Step::Tick,
            };

            match step {
                Step::Notification(Some(notification)) => self.dispatch(notification).await?,
                Step::Notification(None) => break,
                Step::Gesture(Some(gesture)) => self.apply(gesture).await?,
                Step::Gesture(None) => break,
                Step::Tick => self.tick().await?,
            }
        }
        Ok(())
    }

    async fn dispatch(&mut self, notification: LiveNotification) -> Result<(), ViewerError> {
        match notification {
            LiveNotification::Event(payload) => match JobEvent::from_payload(&payload) {
                Ok(event) => self.orchestrator.handle_job_event(event).await,
                Err(err) => {
                    warn!(%err, "dropping malformed event notification");
                    Ok(())
                }
            },
            LiveNotification::Status(payload) => match StatusEvent::from_payload(&payload) {
                Ok(event) => {
                    self.orchestrator.handle_status_event(event);
                    Ok(())
                }
                Err(err) => {
                    warn!(%err, "dropping malformed status notification");
                    Ok(())
                }
            },
        }
    }

    async fn apply(&mut self, gesture: Gesture) -> Result<(), ViewerError> {
        match gesture {
            Gesture::Home => self.orchestrator.scroll_first().await,
            Gesture::End => self.orchestrator.scroll_last().await,
            Gesture::PageUp => {
                self.orchestrator.page_up();
                Ok(())
            }
            Gesture::PageDown => {
                self.orchestrator.page_down();
                Ok(())
            }
        }
    }

    /// One sampling tick: rest detection plus reactive edge paging.
    async fn tick(&mut self) -> Result<(), ViewerError> {
        if let Some(at_rest) = self.orchestrator.scroll_mut().sample(Instant::now()) {
            let _ = self.back_to_top.send(!at_rest);
        }

        if self.orchestrator.scroll().is_paused() {
            return Ok(());
        }
        if self.orchestrator.scroll().at_top_edge() && !self.orchestrator.page().covers_first_page()
        {
            self.orchestrator.previous().await?;
        } else if self.orchestrator.scroll().at_bottom_edge()
            && !self.orchestrator.page().covers_last_page()
        {
            self.orchestrator.next().await?;
        }
        Ok(())
    }

    /// The wrapped orchestrator.
    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Mutable access for hosts driving the orchestrator directly.
    pub fn orchestrator_mut(&mut self) -> &mut Orchestrator {
        &mut self.orchestrator
    }
}
