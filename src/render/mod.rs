//! Render surface contract and the plain-text reference implementation.

use async_trait::async_trait;
use std::io;

use crate::model::JobEvent;

/// The materialized subset of lines the viewer currently shows.
///
/// Every mutation reports the resulting total line count so the caller can
/// keep its window accounting aligned. Implementations must preserve line
/// ordering and never reorder across append/prepend boundaries.
#[async_trait]
pub trait RenderSurface: Send {
    /// Append `events` below the current content. Returns the new total
    /// line count.
    async fn append(&mut self, events: &[JobEvent]) -> io::Result<usize>;
    /// Prepend `events` above the current content. Returns the new total
    /// line count.
    async fn prepend(&mut self, events: &[JobEvent]) -> io::Result<usize>;
    /// Drop all content.
    async fn clear(&mut self) -> io::Result<()>;
    /// Drop `lines` lines from the bottom. Returns the new total line count.
    async fn pop(&mut self, lines: usize) -> io::Result<usize>;
    /// Drop `lines` lines from the top. Returns the new total line count.
    async fn shift(&mut self, lines: usize) -> io::Result<usize>;
}

/// [`RenderSurface`] over a plain line buffer.
///
/// Hosts with a real widget tree implement the trait against it; this one
/// backs tests, replays, and dump-to-terminal embeddings.
#[derive(Debug, Default)]
pub struct TextSurface {
    lines: Vec<String>,
}

impl TextSurface {
    /// Create an empty surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// The materialized lines, top to bottom.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    fn rendered(events: &[JobEvent]) -> Vec<String> {
        events
            .iter()
            .flat_map(|event| event.stdout.lines().map(str::to_owned))
            .collect()
    }
}

#[async_trait]
impl RenderSurface for TextSurface {
    async fn append(&mut self, events: &[JobEvent]) -> io::Result<usize> {
        self.lines.extend(Self::rendered(events));
        Ok(self.lines.len())
    }

    async fn prepend(&mut self, events: &[JobEvent]) -> io::Result<usize> {
        let mut rendered = Self::rendered(events);
        rendered.append(&mut self.lines);
        self.lines = rendered;
        Ok(self.lines.len())
    }

    async fn clear(&mut self) -> io::Result<()> {
        self.lines.clear();
        Ok(())
    }

    async fn pop(&mut self, lines: usize) -> io::Result<usize> {
        let keep = self.lines.len().saturating_sub(lines);
        self.lines.truncate(keep);
        Ok(self.lines.len())
    }

    async fn shift(&mut self, lines: usize) -> io::Result<usize> {
        let drop = lines.min(self.lines.len());
        self.lines.drain(..drop);
        Ok(self.lines.len())
    }
}
