//! Scroll anchoring, pause gating, and rest detection.
//!
//! The anchor wraps the host's viewport and adds the coordination state the
//! orchestrator needs: a pause gate that suppresses reactive fetches while
//! content is being spliced, and debounced rest detection for the
//! back-to-top affordance.

use std::time::{Duration, Instant};
use tracing::trace;

/// Viewport geometry exposed by the host's rendering layer.
///
/// Measurements are in lines. Implementations clamp writes to the valid
/// range themselves; the anchor never assumes a write landed exactly.
pub trait Viewport: Send {
    /// Current scroll offset from the top of the content.
    fn scroll_top(&self) -> usize;
    /// Move the scroll offset.
    fn set_scroll_top(&mut self, top: usize);
    /// Total height of the materialized content.
    fn scroll_height(&self) -> usize;
    /// Height of the visible area.
    fn client_height(&self) -> usize;
}

/// Tracks viewport position, pause state, and scroll rest.
pub struct ScrollAnchor {
    viewport: Box<dyn Viewport>,
    paused: bool,
    debounce: Duration,
    last_position: usize,
    last_motion: Option<Instant>,
    at_rest: bool,
}

impl ScrollAnchor {
    /// Wrap `viewport`, reporting rest after `debounce` without motion.
    pub fn new(viewport: Box<dyn Viewport>, debounce: Duration) -> Self {
        let last_position = viewport.scroll_top();
        Self {
            viewport,
            paused: false,
            debounce,
            last_position,
            last_motion: None,
            at_rest: true,
        }
    }

    /// Suspend reactive scroll-driven fetches.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Reactivate reactive scroll-driven fetches.
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Whether reactive fetches are currently suspended.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Current scroll offset.
    pub fn scroll_position(&self) -> usize {
        self.viewport.scroll_top()
    }

    /// Move the scroll offset. Used by the orchestrator to keep the view
    /// visually stable across splices.
    pub fn set_scroll_position(&mut self, position: usize) {
        self.viewport.set_scroll_top(position);
    }

    /// Jump back to the top of the content.
    pub fn reset_scroll_position(&mut self) {
        self.viewport.set_scroll_top(0);
    }

    /// Total height of the materialized content.
    pub fn scroll_height(&self) -> usize {
        self.viewport.scroll_height()
    }

    /// Whether the viewport is under-filled and needs more content.
    pub fn is_missing(&self) -> bool {
        self.viewport.scroll_height() < self.viewport.client_height()
    }

    /// Whether the viewport sits at the top edge of the content.
    pub fn at_top_edge(&self) -> bool {
        self.viewport.scroll_top() == 0
    }

    /// Whether the viewport sits at the bottom edge of the content.
    pub fn at_bottom_edge(&self) -> bool {
        self.viewport.scroll_top() + self.viewport.client_height()
            >= self.viewport.scroll_height()
    }

    /// Scroll up one viewport height. No-op while paused.
    pub fn page_up(&mut self) {
        if self.paused {
            return;
        }
        let top = self.viewport.scroll_top();
        let step = self.viewport.client_height();
        self.viewport.set_scroll_top(top.saturating_sub(step));
    }

    /// Scroll down one viewport height. No-op while paused.
    pub fn page_down(&mut self) {
        if self.paused {
            return;
        }
        let top = self.viewport.scroll_top();
        let step = self.viewport.client_height();
        self.viewport.set_scroll_top(top.saturating_add(step));
    }

    /// Sample the viewport position for rest detection.
    ///
    /// Returns `Some(at_rest)` only when the rest state flips. Sampling
    /// while paused records the position but reports nothing, so
    /// programmatic splices never produce spurious transitions.
    pub fn sample(&mut self, now: Instant) -> Option<bool> {
        let position = self.viewport.scroll_top();

        if self.paused {
            self.last_position = position;
            self.last_motion = None;
            return None;
        }

        if position != self.last_position {
            trace!(position, "viewport motion");
            self.last_position = position;
            self.last_motion = Some(now);
            if self.at_rest {
                self.at_rest = false;
                return Some(false);
            }
            return None;
        }

        if self.at_rest {
            return None;
        }
        match self.last_motion {
            Some(at) if now.duration_since(at) < self.debounce => None,
            _ => {
                self.at_rest = true;
                Some(true)
            }
        }
    }

    /// Whether the last sample left the viewport at rest.
    pub fn is_at_rest(&self) -> bool {
        self.at_rest
    }
}

impl std::fmt::Debug for ScrollAnchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrollAnchor")
            .field("paused", &self.paused)
            .field("at_rest", &self.at_rest)
            .field("last_position", &self.last_position)
            .finish_non_exhaustive()
    }
}
