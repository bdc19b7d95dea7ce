//! Page cursor and window accounting.
//!
//! [`PageSource`] wraps the history store with the state the orchestrator
//! needs: which pages are materialized, how many rendered lines each one
//! produced, and how many lines to drop when the window exceeds capacity.
//!
//! Accounting is committed only when the orchestrator reports the render
//! surface's resulting line count via [`PageSource::update_line_count`]. A
//! fetch whose chain fails before that report leaves the committed window
//! untouched, keeping surface, anchor, and cursor mutually consistent.

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::model::{FetchError, JobEvent};
use crate::store::EventStore;

/// One materialized page and the rendered lines attributed to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PageRecord {
    number: u64,
    lines: usize,
}

/// A fetch awaiting its line-count report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingFetch {
    /// `first()`: commit replaces the whole window.
    ResetFront(u64),
    /// `last()`: commit replaces the whole window.
    ResetBack(u64),
    /// `previous()`: commit prepends a record.
    Front(u64),
    /// `next()`: commit appends a record.
    Back(u64),
}

/// Paged event fetching with window accounting.
pub struct PageSource {
    store: Box<dyn EventStore>,
    capacity: usize,
    stream_chunk: usize,
    window: VecDeque<PageRecord>,
    rendered: usize,
    tail_attached: bool,
    pending: Option<PendingFetch>,
}

impl PageSource {
    /// Wrap `store`, trimming once more than `capacity` lines materialize.
    ///
    /// Live-stream appends are chunked into synthetic tail records of
    /// `stream_chunk` lines so a long-running tail stays evictable page by
    /// page.
    pub fn new(store: Box<dyn EventStore>, capacity: usize, stream_chunk: usize) -> Self {
        Self {
            store,
            capacity,
            stream_chunk: stream_chunk.max(1),
            window: VecDeque::new(),
            rendered: 0,
            tail_attached: false,
            pending: None,
        }
    }

    /// Fetch the absolute first page, resetting the cursor on commit.
    ///
    /// # Errors
    ///
    /// Propagates the store's [`FetchError`].
    pub async fn first(&mut self) -> Result<Option<Vec<JobEvent>>, FetchError> {
        let Some(page) = self.store.first().await? else {
            return Ok(None);
        };
        self.stash(PendingFetch::ResetFront(page.number));
        Ok(Some(page.events))
    }

    /// Fetch the absolute last page, resetting the cursor on commit.
    ///
    /// # Errors
    ///
    /// Propagates the store's [`FetchError`].
    pub async fn last(&mut self) -> Result<Option<Vec<JobEvent>>, FetchError> {
        let Some(page) = self.store.last().await? else {
            return Ok(None);
        };
        self.stash(PendingFetch::ResetBack(page.number));
        Ok(Some(page.events))
    }

    /// Fetch the page after the window's tail. `None` past the end.
    ///
    /// # Errors
    ///
    /// Propagates the store's [`FetchError`].
    pub async fn next(&mut self) -> Result<Option<Vec<JobEvent>>, FetchError> {
        let Some(back) = self.window.back() else {
            debug!("next() with no materialized window");
            return Ok(None);
        };
        let Some(page) = self.store.next(back.number).await? else {
            self.tail_attached = true;
            return Ok(None);
        };
        self.tail_attached = false;
        self.stash(PendingFetch::Back(page.number));
        Ok(Some(page.events))
    }

    /// Fetch the page before the window's head. `None` past the start.
    ///
    /// # Errors
    ///
    /// Propagates the store's [`FetchError`].
    pub async fn previous(&mut self) -> Result<Option<Vec<JobEvent>>, FetchError> {
        let Some(front) = self.window.front() else {
            debug!("previous() with no materialized window");
            return Ok(None);
        };
        let Some(page) = self.store.previous(front.number).await? else {
            return Ok(None);
        };
        self.stash(PendingFetch::Front(page.number));
        Ok(Some(page.events))
    }

    fn stash(&mut self, pending: PendingFetch) {
        if let Some(stale) = self.pending.replace(pending) {
            // The previous chain failed between fetch and report.
            warn!(?stale, "discarding uncommitted page fetch");
        }
    }

    /// Report the render surface's total line count after a mutation.
    ///
    /// Commits the pending fetch (attributing the delta to the new page
    /// record). Live-stream appends grow the tail record instead.
    pub fn update_line_count(&mut self, total: usize, from_stream: bool) {
        if from_stream {
            let delta = total.saturating_sub(self.rendered);
            match self.window.back().copied() {
                Some(tail) if tail.lines < self.stream_chunk => {
                    if let Some(tail) = self.window.back_mut() {
                        tail.lines += delta;
                    }
                }
                Some(tail) => self.window.push_back(PageRecord {
                    number: tail.number + 1,
                    lines: delta,
                }),
                None => self.window.push_back(PageRecord {
                    number: 1,
                    lines: delta,
                }),
            }
            self.tail_attached = true;
            self.rendered = total;
            return;
        }

        match self.pending.take() {
            Some(PendingFetch::ResetFront(number)) => {
                self.window.clear();
                self.window.push_back(PageRecord {
                    number,
                    lines: total,
                });
                self.tail_attached = false;
                self.rendered = total;
            }
            Some(PendingFetch::ResetBack(number)) => {
                self.window.clear();
                self.window.push_back(PageRecord {
                    number,
                    lines: total,
                });
                self.tail_attached = true;
                self.rendered = total;
            }
            Some(PendingFetch::Front(number)) => {
                let delta = total.saturating_sub(self.rendered);
                self.window.push_front(PageRecord {
                    number,
                    lines: delta,
                });
                self.rendered = total;
            }
            Some(PendingFetch::Back(number)) => {
                let delta = total.saturating_sub(self.rendered);
                self.window.push_back(PageRecord {
                    number,
                    lines: delta,
                });
                self.rendered = total;
            }
            None => {
                warn!(total, "line count report without a pending fetch");
                self.rendered = total;
            }
        }
    }

    /// Synchronize accounting with a cleared render surface.
    ///
    /// Called after the surface is emptied and before the replacement page
    /// commits, so a fetch that comes back empty cannot leave the window
    /// claiming lines that no longer exist.
    pub fn mark_cleared(&mut self) {
        self.window.clear();
        self.rendered = 0;
        self.tail_attached = false;
    }

    /// Whether the materialized window exceeds the configured capacity.
    pub fn is_over_capacity(&self) -> bool {
        self.rendered > self.capacity
    }

    /// Evict whole pages from one edge until the window fits capacity.
    ///
    /// Returns the exact number of lines the render surface must drop from
    /// that edge. The page on the opposite edge is never evicted, so a
    /// single oversized page cannot empty the window.
    pub fn trim(&mut self, from_top: bool) -> usize {
        let mut dropped = 0;
        while self.rendered > self.capacity && self.window.len() > 1 {
            let record = if from_top {
                self.window.pop_front()
            } else {
                self.window.pop_back()
            };
            let Some(record) = record else { break };
            dropped += record.lines;
            self.rendered -= record.lines;
        }
        if dropped > 0 {
            debug!(dropped, from_top, "trimmed window pages");
        }
        dropped
    }

    /// Total rendered lines, as of the last report.
    pub fn rendered_lines(&self) -> usize {
        self.rendered
    }

    /// Whether the window still includes the job's first page.
    pub fn covers_first_page(&self) -> bool {
        self.window.front().is_some_and(|record| record.number == 1)
    }

    /// Whether the window still includes the job's last known page.
    pub fn covers_last_page(&self) -> bool {
        self.tail_attached && !self.window.is_empty()
    }
}

impl std::fmt::Debug for PageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageSource")
            .field("capacity", &self.capacity)
            .field("window", &self.window)
            .field("rendered", &self.rendered)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "page_tests.rs"]
mod tests;
