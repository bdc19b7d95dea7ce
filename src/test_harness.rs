//! Shared test doubles for orchestration tests.
//!
//! The fakes record every collaborator call into a shared log so tests can
//! assert on protocol order, not just end state. One event line renders as
//! exactly one surface line, keeping window arithmetic easy to read.

use async_trait::async_trait;
use std::io;
use std::sync::{Arc, Mutex};

use crate::config::ViewerConfig;
use crate::feed::{ChannelFeed, LiveFeed, LivePublisher, Subscription};
use crate::model::{FetchError, JobEvent, JobState, StatusEvent, StatusTracker};
use crate::orchestrator::Orchestrator;
use crate::render::RenderSurface;
use crate::scroll::Viewport;
use crate::store::{EventStore, MemoryStore};

pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn record(log: &CallLog, entry: impl Into<String>) {
    log.lock().unwrap().push(entry.into());
}

pub fn calls(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub fn calls_matching(log: &CallLog, prefix: &str) -> Vec<String> {
    calls(log)
        .into_iter()
        .filter(|call| call.starts_with(prefix))
        .collect()
}

/// An event covering `start..=end`, with one stdout line per covered line.
pub fn span_event(counter: u64, start: u64, end: u64) -> JobEvent {
    let stdout: String = (start..=end).map(|n| format!("line {n}\n")).collect();
    JobEvent::new(counter, start, end, stdout).unwrap()
}

/// `count` single-line events covering lines `1..=count`.
pub fn line_events(count: u64) -> Vec<JobEvent> {
    (1..=count).map(|n| span_event(n, n, n)).collect()
}

// ============================================================================
// Store double
// ============================================================================

/// [`MemoryStore`] wrapper recording every query.
pub struct CountingStore {
    inner: MemoryStore,
    log: CallLog,
}

impl CountingStore {
    pub fn new(events: Vec<JobEvent>, page_size: u64, log: CallLog) -> Self {
        Self {
            inner: MemoryStore::new(events, page_size),
            log,
        }
    }
}

#[async_trait]
impl EventStore for CountingStore {
    async fn first(&mut self) -> Result<Option<crate::model::Page>, FetchError> {
        record(&self.log, "store.first");
        self.inner.first().await
    }

    async fn last(&mut self) -> Result<Option<crate::model::Page>, FetchError> {
        record(&self.log, "store.last");
        self.inner.last().await
    }

    async fn next(&mut self, after: u64) -> Result<Option<crate::model::Page>, FetchError> {
        record(&self.log, format!("store.next:{after}"));
        self.inner.next(after).await
    }

    async fn previous(&mut self, before: u64) -> Result<Option<crate::model::Page>, FetchError> {
        record(&self.log, format!("store.previous:{before}"));
        self.inner.previous(before).await
    }
}

/// A store whose every query fails, for propagation tests.
pub struct FailingStore;

#[async_trait]
impl EventStore for FailingStore {
    async fn first(&mut self) -> Result<Option<crate::model::Page>, FetchError> {
        Err(FetchError::Backend {
            message: "first unavailable".into(),
        })
    }

    async fn last(&mut self) -> Result<Option<crate::model::Page>, FetchError> {
        Err(FetchError::Backend {
            message: "last unavailable".into(),
        })
    }

    async fn next(&mut self, _after: u64) -> Result<Option<crate::model::Page>, FetchError> {
        Err(FetchError::Backend {
            message: "next unavailable".into(),
        })
    }

    async fn previous(&mut self, _before: u64) -> Result<Option<crate::model::Page>, FetchError> {
        Err(FetchError::Backend {
            message: "previous unavailable".into(),
        })
    }
}

// ============================================================================
// Render surface + viewport over shared geometry
// ============================================================================

/// Geometry shared between the surface fake and the viewport fake, the way
/// a real widget tree shares it.
#[derive(Debug, Default)]
pub struct ViewState {
    pub lines: Vec<String>,
    pub top: usize,
    pub client: usize,
}

pub type SharedView = Arc<Mutex<ViewState>>;

pub fn shared_view(client: usize) -> SharedView {
    Arc::new(Mutex::new(ViewState {
        client,
        ..ViewState::default()
    }))
}

pub fn view_lines(view: &SharedView) -> Vec<String> {
    view.lock().unwrap().lines.clone()
}

/// Call-logging [`RenderSurface`] writing into a [`SharedView`].
pub struct HarnessSurface {
    view: SharedView,
    log: CallLog,
}

impl HarnessSurface {
    pub fn new(view: SharedView, log: CallLog) -> Self {
        Self { view, log }
    }

    fn rendered(events: &[JobEvent]) -> Vec<String> {
        events
            .iter()
            .flat_map(|event| event.stdout.lines().map(str::to_owned))
            .collect()
    }
}

#[async_trait]
impl RenderSurface for HarnessSurface {
    async fn append(&mut self, events: &[JobEvent]) -> io::Result<usize> {
        let mut rendered = Self::rendered(events);
        record(&self.log, format!("render.append:{}", rendered.len()));
        let mut view = self.view.lock().unwrap();
        view.lines.append(&mut rendered);
        Ok(view.lines.len())
    }

    async fn prepend(&mut self, events: &[JobEvent]) -> io::Result<usize> {
        let mut rendered = Self::rendered(events);
        record(&self.log, format!("render.prepend:{}", rendered.len()));
        let mut view = self.view.lock().unwrap();
        rendered.append(&mut view.lines);
        view.lines = rendered;
        Ok(view.lines.len())
    }

    async fn clear(&mut self) -> io::Result<()> {
        record(&self.log, "render.clear");
        self.view.lock().unwrap().lines.clear();
        Ok(())
    }

    async fn pop(&mut self, lines: usize) -> io::Result<usize> {
        record(&self.log, format!("render.pop:{lines}"));
        let mut view = self.view.lock().unwrap();
        let keep = view.lines.len().saturating_sub(lines);
        view.lines.truncate(keep);
        Ok(view.lines.len())
    }

    async fn shift(&mut self, lines: usize) -> io::Result<usize> {
        record(&self.log, format!("render.shift:{lines}"));
        let mut view = self.view.lock().unwrap();
        let drop = lines.min(view.lines.len());
        view.lines.drain(..drop);
        Ok(view.lines.len())
    }
}

/// [`Viewport`] over the same [`SharedView`], clamping like a real one.
pub struct HarnessViewport {
    view: SharedView,
}

impl HarnessViewport {
    pub fn new(view: SharedView) -> Self {
        Self { view }
    }
}

impl Viewport for HarnessViewport {
    fn scroll_top(&self) -> usize {
        self.view.lock().unwrap().top
    }

    fn set_scroll_top(&mut self, top: usize) {
        let mut view = self.view.lock().unwrap();
        let max = view.lines.len().saturating_sub(view.client);
        view.top = top.min(max);
    }

    fn scroll_height(&self) -> usize {
        self.view.lock().unwrap().lines.len()
    }

    fn client_height(&self) -> usize {
        self.view.lock().unwrap().client
    }
}

// ============================================================================
// Status double
// ============================================================================

/// Call-logging [`StatusTracker`] with scripted init flags.
pub struct ScriptedStatus {
    running: bool,
    finished: bool,
    log: CallLog,
}

impl ScriptedStatus {
    pub fn new(state: JobState, log: CallLog) -> Self {
        Self {
            running: state.is_running(),
            finished: state.is_finished(),
            log,
        }
    }
}

impl StatusTracker for ScriptedStatus {
    fn running(&self) -> bool {
        self.running
    }

    fn finished(&self) -> bool {
        self.finished
    }

    fn set_job_status(&mut self, state: JobState) {
        self.running = state.is_running();
        self.finished = state.is_finished();
        record(&self.log, format!("status.set:{state:?}"));
    }

    fn push_job_event(&mut self, event: &JobEvent) {
        record(&self.log, format!("status.event:{}", event.counter));
    }

    fn push_status_event(&mut self, event: StatusEvent) {
        record(&self.log, format!("status.push:{:?}", event.state));
        self.running = event.state.is_running();
        self.finished = event.state.is_finished();
    }

    fn update_stats(&mut self) {
        record(&self.log, "status.update_stats");
    }

    fn dispatch(&mut self) {
        record(&self.log, "status.dispatch");
    }
}

// ============================================================================
// Feed double
// ============================================================================

/// [`ChannelFeed`] wrapper recording subscriptions.
pub struct HarnessFeed {
    inner: ChannelFeed,
    log: CallLog,
}

impl HarnessFeed {
    pub fn new(log: CallLog) -> (Self, LivePublisher) {
        let (inner, publisher) = ChannelFeed::new(64);
        (Self { inner, log }, publisher)
    }
}

#[async_trait]
impl LiveFeed for HarnessFeed {
    async fn subscribe(&mut self) -> Result<Subscription, FetchError> {
        record(&self.log, "feed.subscribe");
        self.inner.subscribe().await
    }
}

// ============================================================================
// Fixture
// ============================================================================

/// A fully wired orchestrator plus the handles tests observe it through.
pub struct Fixture {
    pub orchestrator: Orchestrator,
    pub view: SharedView,
    pub log: CallLog,
    pub publisher: LivePublisher,
}

pub struct FixtureSpec {
    pub events: Vec<JobEvent>,
    pub page_size: u64,
    pub capacity: usize,
    pub client_height: usize,
    pub state: JobState,
}

impl Default for FixtureSpec {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            page_size: 10,
            capacity: 100,
            client_height: 20,
            state: JobState::Running,
        }
    }
}

pub fn fixture(spec: FixtureSpec) -> Fixture {
    let log = call_log();
    let view = shared_view(spec.client_height);
    let (feed, publisher) = HarnessFeed::new(log.clone());

    let config = ViewerConfig {
        capacity: spec.capacity,
        page_size: spec.page_size,
        ..ViewerConfig::default()
    };

    let orchestrator = Orchestrator::new(
        Box::new(CountingStore::new(spec.events, spec.page_size, log.clone())),
        Box::new(HarnessViewport::new(view.clone())),
        Box::new(HarnessSurface::new(view.clone(), log.clone())),
        Box::new(ScriptedStatus::new(spec.state, log.clone())),
        Box::new(feed),
        &config,
    );

    Fixture {
        orchestrator,
        view,
        log,
        publisher,
    }
}
