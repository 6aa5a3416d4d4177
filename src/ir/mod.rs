//! Intermediate representation shared by every output format.
//!
//! A document is streamed as a flat sequence of [`Event`]s. Structural scopes
//! (document, paragraph, heading, list, list item, table, row, cell) are
//! emitted as strictly nested Start/End pairs. Formatting scopes carry a
//! single [`StyleFlags`] bit each and are balanced per flag inside the
//! structural scope that opened them.

mod event;
mod style;

pub use event::{DocumentInfo, Event};
pub use style::StyleFlags;
