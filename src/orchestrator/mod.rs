//! The coordination state machine.
//!
//! The orchestrator is the only component with business-level policy
//! knowledge: at every scroll and every incoming live event it decides
//! whether to fetch pages, trim off-screen lines, splice the render
//! surface, or attach to the live stream, while keeping the user's scroll
//! anchor visually stable.
//!
//! All entry points are awaited chains over the collaborators. Overlap is
//! prevented by guards, not locks: the engine's `transitioning` latch
//! rejects maneuvers during a pause/resume, the anchor's pause gate stops
//! reactive fetches mid-splice, and the `streaming` flag memoizes the
//! one-time attach so every live event arriving before attachment shares
//! the single attach pass.

use tracing::{debug, info};

use crate::config::ViewerConfig;
use crate::feed::{LiveFeed, LiveNotification, Subscription};
use crate::model::{boundary_after, JobEvent, JobState, StatusEvent, StatusTracker, ViewerError};
use crate::page::PageSource;
use crate::render::RenderSurface;
use crate::scroll::{ScrollAnchor, Viewport};
use crate::store::EventStore;
use crate::stream::{StreamEngine, StreamLifecycle};

/// Binds the page source, scroll anchor, render surface, stream engine,
/// and status tracker for one viewer session.
pub struct Orchestrator {
    page: PageSource,
    scroll: ScrollAnchor,
    render: Box<dyn RenderSurface>,
    engine: StreamEngine,
    status: Box<dyn StatusTracker>,
    feed: Box<dyn LiveFeed>,
    listeners: Vec<Subscription>,
    streaming: bool,
}

impl Orchestrator {
    /// Wire up a session over the five collaborators.
    pub fn new(
        store: Box<dyn EventStore>,
        viewport: Box<dyn Viewport>,
        render: Box<dyn RenderSurface>,
        status: Box<dyn StatusTracker>,
        feed: Box<dyn LiveFeed>,
        config: &ViewerConfig,
    ) -> Self {
        Self {
            page: PageSource::new(store, config.capacity, config.page_size as usize),
            scroll: ScrollAnchor::new(viewport, config.rest_debounce),
            render,
            engine: StreamEngine::new(),
            status,
            feed,
            listeners: Vec::new(),
            streaming: false,
        }
    }

    /// Position the view and begin listening, based on job status.
    ///
    /// Running jobs jump to the bottom and listen; queued jobs jump to the
    /// top and listen (so output is caught the moment it starts); finished
    /// jobs jump to the bottom without listening.
    ///
    /// # Errors
    ///
    /// Propagates fetch, render, and subscription failures.
    pub async fn init(&mut self) -> Result<(), ViewerError> {
        let running = self.status.running();
        let finished = self.status.finished();
        info!(running, finished, "initializing output view");

        if running {
            self.scroll_last().await?;
            self.start_listening().await?;
        } else if !finished {
            self.scroll_first().await?;
            self.start_listening().await?;
        } else {
            self.scroll_last().await?;
        }
        Ok(())
    }

    /// Ingest one live output event.
    ///
    /// The first event triggers the attach maneuver exactly once; every
    /// later event reuses that attachment. Accepted events land on the
    /// render surface as frames, behind a capacity trim.
    ///
    /// # Errors
    ///
    /// Propagates fetch and render failures; the attach is retried on the
    /// next event after a failure.
    pub async fn handle_job_event(&mut self, event: JobEvent) -> Result<(), ViewerError> {
        if !self.streaming {
            self.attach_to_running_job().await?;
            self.streaming = true;
        }

        let frame = self.engine.push_job_event(event.clone());
        self.drive_lifecycle();
        if let Some(frame) = frame {
            self.shift().await?;
            self.append(&frame, true).await?;
        }
        self.status.push_job_event(&event);
        Ok(())
    }

    /// Ingest one live status notification.
    ///
    /// A terminal state ends the stream session, which tears down the
    /// subscriptions and dispatches final stats.
    pub fn handle_status_event(&mut self, event: StatusEvent) {
        let finished = event.state.is_finished();
        self.status.push_status_event(event);
        if finished {
            self.engine.stop();
            self.drive_lifecycle();
        }
    }

    /// Jump to the top of the stream and fill the viewport forward.
    ///
    /// # Errors
    ///
    /// Propagates fetch and render failures.
    pub async fn scroll_first(&mut self) -> Result<(), ViewerError> {
        if self.engine.is_active() {
            if self.engine.is_transitioning() {
                return Ok(());
            }
            if !self.engine.is_paused() {
                self.engine.pause(true);
            }
        } else if self.scroll.is_paused() {
            return Ok(());
        }
        self.scroll.pause();

        let Some(events) = self.page.first().await? else {
            return Ok(());
        };
        self.render.clear().await?;
        self.page.mark_cleared();
        self.prepend(&events).await?;
        self.scroll.reset_scroll_position();
        self.scroll.resume();
        if self.scroll.is_missing() {
            self.next().await?;
        }
        Ok(())
    }

    /// Jump to the bottom of the stream and arm the live boundary.
    ///
    /// # Errors
    ///
    /// Propagates fetch and render failures.
    pub async fn scroll_last(&mut self) -> Result<(), ViewerError> {
        if self.engine.is_active() {
            if self.engine.is_transitioning() {
                return Ok(());
            }
            if self.engine.is_paused() {
                self.engine.resume(true);
            }
        } else if self.scroll.is_paused() {
            return Ok(());
        }
        self.scroll.pause();

        self.render.clear().await?;
        self.page.mark_cleared();
        if let Some(events) = self.page.last().await? {
            if let Some(boundary) = boundary_after(&events) {
                self.engine.set_min_line(boundary);
            }
            self.append(&events, false).await?;
        }

        if !self.engine.is_active() {
            self.scroll.resume();
        }
        let height = self.scroll.scroll_height();
        self.scroll.set_scroll_position(height);

        if !self.engine.is_active() && self.scroll.is_missing() {
            self.previous().await?;
        }

        // A resume above may have left a backlog of buffered frames.
        if let Some(frame) = self.engine.take_frame() {
            self.shift().await?;
            self.append(&frame, true).await?;
        }
        Ok(())
    }

    /// Fetch forward pages until the viewport is filled or history ends.
    ///
    /// # Errors
    ///
    /// Propagates fetch and render failures.
    pub async fn next(&mut self) -> Result<(), ViewerError> {
        loop {
            let Some(events) = self.page.next().await? else {
                return Ok(());
            };
            self.shift().await?;
            self.append(&events, false).await?;
            if !self.scroll.is_missing() {
                return Ok(());
            }
        }
    }

    /// Fetch one page backward, keeping the first visible line stable.
    ///
    /// The restoration rule: with the pre-fetch position `p`, the height
    /// `h0` after the bottom trim, and the height `h1` after the prepend,
    /// the anchor moves to `h1 - h0 + p`; the prepended lines push the
    /// old content down by exactly the delta.
    ///
    /// # Errors
    ///
    /// Propagates fetch and render failures.
    pub async fn previous(&mut self) -> Result<(), ViewerError> {
        let initial_position = self.scroll.scroll_position();
        let Some(events) = self.page.previous().await? else {
            return Ok(());
        };

        self.pop().await?;
        let post_pop_height = self.scroll.scroll_height();
        self.prepend(&events).await?;

        let height = self.scroll.scroll_height();
        self.scroll
            .set_scroll_position(height.saturating_sub(post_pop_height) + initial_position);
        Ok(())
    }

    /// Scroll up one viewport height. No-op while the anchor is paused.
    pub fn page_up(&mut self) {
        self.scroll.page_up();
    }

    /// Scroll down one viewport height. No-op while the anchor is paused.
    pub fn page_down(&mut self) {
        self.scroll.page_down();
    }

    /// Subscribe to live notifications, replacing any prior subscription.
    ///
    /// # Errors
    ///
    /// Propagates the transport's subscription failure.
    pub async fn start_listening(&mut self) -> Result<(), ViewerError> {
        self.stop_listening();
        let subscription = self.feed.subscribe().await?;
        self.listeners.push(subscription);
        Ok(())
    }

    /// Release every live subscription. Idempotent.
    pub fn stop_listening(&mut self) {
        if !self.listeners.is_empty() {
            debug!(count = self.listeners.len(), "releasing live subscriptions");
        }
        self.listeners.clear();
    }

    /// Whether a live subscription is currently held.
    pub fn is_listening(&self) -> bool {
        !self.listeners.is_empty()
    }

    /// Wait for the next live notification.
    ///
    /// Pends forever while not listening, so a select-driven host loop
    /// keeps servicing gestures and timers.
    pub async fn recv_notification(&mut self) -> Option<LiveNotification> {
        match self.listeners.first_mut() {
            Some(subscription) => subscription.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Attach to the live tail, backfilling from the last persisted page.
    ///
    /// Guarded by the engine's `transitioning` latch and, when detached,
    /// the anchor's pause gate. Fetches the last page, admits only events
    /// past the current boundary (the rest are already rendered), arms the
    /// new boundary, and pins the view to the bottom.
    async fn attach_to_running_job(&mut self) -> Result<(), ViewerError> {
        if self.engine.is_active() {
            if self.engine.is_transitioning() {
                return Ok(());
            }
            if self.engine.is_paused() {
                self.engine.resume(true);
            }
        } else if self.scroll.is_paused() {
            return Ok(());
        }
        self.scroll.pause();

        if let Some(events) = self.page.last().await? {
            let rendered_below = self.engine.min_line();
            let boundary = boundary_after(&events);
            let fresh: Vec<JobEvent> = events
                .into_iter()
                .filter(|event| event.start_line >= rendered_below)
                .collect();
            if let Some(boundary) = boundary {
                self.engine.set_min_line(boundary);
            }
            self.append(&fresh, false).await?;
        }

        let height = self.scroll.scroll_height();
        self.scroll.set_scroll_position(height);

        if let Some(frame) = self.engine.take_frame() {
            self.shift().await?;
            self.append(&frame, true).await?;
        }
        Ok(())
    }

    /// Apply stream lifecycle edges observed on the engine.
    fn drive_lifecycle(&mut self) {
        while let Some(edge) = self.engine.take_lifecycle_event() {
            match edge {
                StreamLifecycle::Started => {
                    self.status.set_job_status(JobState::Running);
                }
                StreamLifecycle::Stopped => {
                    self.stop_listening();
                    self.status.update_stats();
                    self.status.dispatch();
                    // Live follow kept the anchor paused; hand control back.
                    self.scroll.resume();
                }
            }
        }
    }

    async fn append(&mut self, events: &[JobEvent], from_stream: bool) -> Result<(), ViewerError> {
        let total = self.render.append(events).await?;
        self.page.update_line_count(total, from_stream);
        Ok(())
    }

    async fn prepend(&mut self, events: &[JobEvent]) -> Result<(), ViewerError> {
        let total = self.render.prepend(events).await?;
        self.page.update_line_count(total, false);
        Ok(())
    }

    /// Trim the bottom edge ahead of a backward prepend.
    async fn pop(&mut self) -> Result<(), ViewerError> {
        if !self.page.is_over_capacity() {
            return Ok(());
        }
        let lines = self.page.trim(false);
        if lines > 0 {
            self.render.pop(lines).await?;
        }
        Ok(())
    }

    /// Trim the top edge ahead of a forward or live append.
    async fn shift(&mut self) -> Result<(), ViewerError> {
        if !self.page.is_over_capacity() {
            return Ok(());
        }
        let lines = self.page.trim(true);
        if lines > 0 {
            self.render.shift(lines).await?;
        }
        Ok(())
    }

    /// The live-tail engine, for hosts inspecting attachment state.
    pub fn engine(&self) -> &StreamEngine {
        &self.engine
    }

    /// The page window accounting.
    pub fn page(&self) -> &PageSource {
        &self.page
    }

    /// The scroll anchor.
    pub fn scroll(&self) -> &ScrollAnchor {
        &self.scroll
    }

    /// Mutable scroll anchor access, for the host's sampling loop.
    pub fn scroll_mut(&mut self) -> &mut ScrollAnchor {
        &mut self.scroll
    }

    /// Whether the one-time attach has already run.
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }
}
