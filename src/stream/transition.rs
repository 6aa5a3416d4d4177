//! Style transitions between consecutive text runs.
//!
//! Moving from one run to the next closes the flags that are no longer set
//! (in reverse canonical order) and opens the new ones (in forward canonical
//! order). Flags present in both runs stay open.

use crate::ir::{Event, StyleFlags};

/// Tracks the formatting flags currently open in one structural scope.
#[derive(Debug, Clone, Default)]
pub struct StyleTracker {
    active: StyleFlags,
    link: Option<String>,
}

impl StyleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> StyleFlags {
        self.active
    }

    /// Emit the End/Start events that move the active set to `next`.
    ///
    /// A link whose target changes is closed and reopened even though the
    /// flag itself stays set.
    pub fn transition<E: Extend<Event>>(&mut self, next: StyleFlags, link: Option<&str>, out: &mut E) {
        let mut closing = self.active.difference(next);
        let mut opening = next.difference(self.active);

        if self.active.contains(StyleFlags::LINK)
            && next.contains(StyleFlags::LINK)
            && self.link.as_deref() != link
        {
            closing.insert(StyleFlags::LINK);
            opening.insert(StyleFlags::LINK);
        }

        out.extend(closing.closing_order().map(Event::end_formatting));
        self.active.remove(closing);
        if closing.contains(StyleFlags::LINK) {
            self.link = None;
        }

        out.extend(opening.opening_order().map(|flag| {
            if flag == StyleFlags::LINK {
                Event::StartFormatting {
                    style: flag,
                    link: link.map(str::to_string),
                }
            } else {
                Event::start_formatting(flag)
            }
        }));
        self.active.insert(opening);
        if opening.contains(StyleFlags::LINK) {
            self.link = link.map(str::to_string);
        }
    }

    /// Close everything still open, in reverse canonical order.
    pub fn close_all<E: Extend<Event>>(&mut self, out: &mut E) {
        self.transition(StyleFlags::NONE, None, out);
    }
}
