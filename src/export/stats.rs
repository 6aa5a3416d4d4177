//! Event counters.

use std::fmt;

use crate::ir::Event;

/// Counts of what passed through a consumer or the dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub events: usize,
    /// Bytes of `Text` content.
    pub text_bytes: usize,
    pub images: usize,
    pub tables: usize,
    pub headings: usize,
    pub lists: usize,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: &Event) {
        self.events += 1;
        match event {
            Event::Text(text) => self.text_bytes += text.len(),
            Event::Image { .. } => self.images += 1,
            Event::StartTable { .. } => self.tables += 1,
            Event::StartHeading { .. } => self.headings += 1,
            Event::StartList { .. } => self.lists += 1,
            _ => {}
        }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} events, {} text bytes, {} headings, {} lists, {} tables, {} images",
            self.events, self.text_bytes, self.headings, self.lists, self.tables, self.images
        )
    }
}
