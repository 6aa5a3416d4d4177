//! # docstream
//!
//! Streaming conversion of academic documents to HTML, Markdown, LaTeX, EPUB
//! and plain text.
//!
//! ## Features
//!
//! - Lazy, pull-based event stream with chunked text and cooperative
//!   cancellation
//! - Stable, unique heading anchors shared by headings and the table of
//!   contents
//! - One pass fans out to any number of format consumers
//!
//! ## Quick Start
//!
//! ```
//! use docstream::{convert, Format};
//! use docstream::model::{Document, Paragraph};
//! use docstream::stream::StreamOptions;
//!
//! let doc = Document::new("Thesis").with_body(vec![
//!     Paragraph::heading(1, "Introduction").into(),
//!     Paragraph::text("Why this matters.").into(),
//! ]);
//!
//! let outputs = convert(&doc, &[Format::Markdown, Format::Html], &StreamOptions::default())?;
//! let markdown = outputs[0].as_str().unwrap_or_default();
//! assert!(markdown.contains("## Introduction {#introduction}"));
//! # Ok::<(), docstream::Error>(())
//! ```
//!
//! ## Working with Events
//!
//! The [`stream`](stream::stream) function yields [`Event`]s directly, for
//! callers that want to drive their own [`Consumer`](export::Consumer):
//!
//! ```
//! use docstream::model::{Document, Paragraph};
//! use docstream::stream::{stream, CancelToken, StreamOptions};
//!
//! let doc = Document::new("Notes").with_body(vec![Paragraph::bullet("Item").into()]);
//! let names: Vec<&str> = stream(&doc, &StreamOptions::default(), &CancelToken::new())
//!     .map(|event| event.name())
//!     .collect();
//! assert_eq!(names[1], "StartList");
//! ```

pub mod error;
pub mod export;
pub mod ir;
pub mod markdown;
pub mod model;
pub mod sanitize;
pub mod stream;
pub(crate) mod util;

pub use error::{Error, Result};
pub use export::{Consumer, Dispatcher, Format, Output};
pub use ir::{DocumentInfo, Event, StyleFlags};
pub use model::Document;
pub use sanitize::sanitize;

use stream::{CancelToken, StreamOptions};

/// Render `doc` into every format in `formats` with one streaming pass.
///
/// Outputs are returned in the order of `formats`.
pub fn convert(doc: &Document, formats: &[Format], options: &StreamOptions) -> Result<Vec<Output>> {
    convert_with_cancel(doc, formats, options, &CancelToken::new())
}

/// Like [`convert`], stopping with [`Error::Cancelled`] once `cancel` fires.
pub fn convert_with_cancel(
    doc: &Document,
    formats: &[Format],
    options: &StreamOptions,
    cancel: &CancelToken,
) -> Result<Vec<Output>> {
    options.validate()?;

    let mut dispatcher = Dispatcher::new();
    for &format in formats {
        dispatcher.add(format.consumer());
    }
    dispatcher.run(stream::stream(doc, options, cancel), cancel)
}
