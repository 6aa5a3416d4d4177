//! Pure markdown helpers.
//!
//! String transformations used by the markdown consumer
//! ([`crate::export::MarkdownConsumer`]). They hold no state and do no I/O.

mod escape;

pub use escape::{escape_cell, escape_markdown, escape_url};
