//! Format consumers and the fan-out dispatcher.
//!
//! A [`Consumer`] turns the event stream into one output format. Consumers
//! are independent state machines: they receive every event in order, keep
//! their own structural stack and hand back the finished bytes on
//! [`Consumer::flush`].
//!
//! # Architecture
//!
//! Consumers follow a builder pattern:
//! - `new()` creates a consumer with default configuration
//! - `with_config()` allows customization
//! - the [`Dispatcher`] drives any number of them from one stream
//!
//! # Example
//!
//! ```
//! use docstream::export::{Dispatcher, Format, HtmlConsumer};
//! use docstream::model::{Document, Paragraph};
//! use docstream::stream::{stream, CancelToken, StreamOptions};
//!
//! let doc = Document::new("Notes").with_body(vec![Paragraph::text("Hello").into()]);
//! let cancel = CancelToken::new();
//!
//! let outputs = Dispatcher::new()
//!     .with_consumer(HtmlConsumer::new())
//!     .with_format(Format::Markdown)
//!     .run(stream(&doc, &StreamOptions::default(), &cancel), &cancel)?;
//!
//! assert_eq!(outputs.len(), 2);
//! assert_eq!(outputs[1].extension, "md");
//! # Ok::<(), docstream::Error>(())
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::ir::{DocumentInfo, Event};

mod consumer;
mod dispatch;
mod epub;
mod html;
mod latex;
mod markdown;
mod stats;
mod text;

pub use consumer::{Block, FormatConsumer, FormatStack, Render, Span, SpanRepair};
pub use dispatch::{Dispatcher, Output};
pub use epub::{EpubConfig, EpubConsumer, EpubWriter};
pub use html::{HtmlConfig, HtmlConsumer, HtmlWriter};
pub use latex::{LatexConfig, LatexConsumer, LatexWriter, escape_latex};
pub use markdown::{MarkdownConfig, MarkdownConsumer, MarkdownWriter};
pub use stats::Stats;
pub use text::{TextConfig, TextConsumer, TextWriter};

/// Receives the event stream and produces one output format.
///
/// Consumers ignore event kinds that are irrelevant to their format and
/// report [`Error::Unbalanced`] when an End event does not match their open
/// scope.
pub trait Consumer: Send {
    /// Format name, used in errors and outputs.
    fn name(&self) -> &'static str;

    /// Process one event.
    fn handle(&mut self, event: &Event) -> Result<()>;

    /// Return the finished output and get ready for another document.
    fn flush(&mut self) -> Result<Vec<u8>>;

    /// Discard partial output.
    fn reset(&mut self);

    fn stats(&self) -> &Stats;

    fn content_type(&self) -> &'static str;

    /// File extension without the dot.
    fn extension(&self) -> &'static str;

    /// Whether the output is UTF-8 text.
    fn is_text(&self) -> bool {
        true
    }
}

/// The built-in output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cli", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "cli", serde(rename_all = "lowercase"))]
pub enum Format {
    Html,
    Markdown,
    Latex,
    Epub,
    Text,
}

impl Format {
    pub const ALL: [Format; 5] = [
        Format::Html,
        Format::Markdown,
        Format::Latex,
        Format::Epub,
        Format::Text,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Format::Html => "html",
            Format::Markdown => "markdown",
            Format::Latex => "latex",
            Format::Epub => "epub",
            Format::Text => "text",
        }
    }

    /// A consumer with default configuration.
    pub fn consumer(self) -> Box<dyn Consumer> {
        match self {
            Format::Html => Box::new(HtmlConsumer::new()),
            Format::Markdown => Box::new(MarkdownConsumer::new()),
            Format::Latex => Box::new(LatexConsumer::new()),
            Format::Epub => Box::new(EpubConsumer::new()),
            Format::Text => Box::new(TextConsumer::new()),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" | "htm" => Ok(Format::Html),
            "markdown" | "md" => Ok(Format::Markdown),
            "latex" | "tex" => Ok(Format::Latex),
            "epub" => Ok(Format::Epub),
            "text" | "txt" | "plain" => Ok(Format::Text),
            _ => Err(Error::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Human-readable metadata lines shown under the title.
pub(crate) fn info_lines(info: &DocumentInfo) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(date) = info.date.as_deref().filter(|d| !d.is_empty()) {
        lines.push(format!("Date: {date}"));
    }
    if let Some(period) = &info.period {
        match (period.start.as_deref(), period.end.as_deref()) {
            (Some(start), Some(end)) => lines.push(format!("Period: {start} to {end}")),
            (Some(start), None) => lines.push(format!("Period: from {start}")),
            (None, Some(end)) => lines.push(format!("Period: until {end}")),
            (None, None) => {}
        }
    }
    if let Some(pages) = info.page_count {
        lines.push(format!("Pages: {pages}"));
    }
    if let Some(progress) = info.progress {
        lines.push(format!("Progress: {progress}%"));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Period;

    #[test]
    fn test_format_from_str() {
        assert_eq!("HTML".parse::<Format>().ok(), Some(Format::Html));
        assert_eq!("md".parse::<Format>().ok(), Some(Format::Markdown));
        assert_eq!("tex".parse::<Format>().ok(), Some(Format::Latex));
        assert_eq!("txt".parse::<Format>().ok(), Some(Format::Text));
        assert!(matches!("docx".parse::<Format>(), Err(Error::UnsupportedFormat(_))));
    }

    #[test]
    fn test_consumers_match_formats() {
        for format in Format::ALL {
            let consumer = format.consumer();
            assert_eq!(consumer.name(), format.name());
        }
        assert!(!Format::Epub.consumer().is_text());
        assert_eq!(Format::Latex.consumer().extension(), "tex");
    }

    #[test]
    fn test_info_lines() {
        let info = DocumentInfo {
            date: Some("2024-05-01".into()),
            period: Some(Period {
                start: Some("February".into()),
                end: None,
            }),
            page_count: Some(12),
            progress: Some(75),
            ..DocumentInfo::default()
        };
        assert_eq!(
            info_lines(&info),
            vec!["Date: 2024-05-01", "Period: from February", "Pages: 12", "Progress: 75%"]
        );
    }
}
