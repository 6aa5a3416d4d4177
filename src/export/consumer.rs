//! Shared event handling for the built-in format consumers.
//!
//! Every built-in format is a [`Render`] implementation wrapped in a
//! [`FormatConsumer`]. The wrapper owns the bookkeeping that is the same for
//! all formats:
//!
//! - a structural stack that rejects End events not matching the open scope,
//! - a formatting stack that turns overlapping formatting scopes into
//!   properly nested ones (closing and reopening inner spans),
//! - per-consumer [`Stats`].
//!
//! Renderers therefore only ever see balanced, nested calls.

use std::sync::Arc;

use log::warn;

use super::{Consumer, Stats};
use crate::error::{Error, Result};
use crate::ir::{DocumentInfo, Event, StyleFlags};

/// An open structural scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph,
    Heading {
        level: u8,
        anchor: String,
        text: Arc<str>,
    },
    List {
        ordered: bool,
    },
    ListItem,
    Table {
        rows: usize,
        columns: usize,
    },
    TableRow,
    TableCell,
}

impl Block {
    /// Block opened by `event`, if it opens one.
    fn from_event(event: &Event) -> Option<Block> {
        Some(match event {
            Event::StartParagraph => Block::Paragraph,
            Event::StartHeading {
                level,
                anchor,
                text,
            } => Block::Heading {
                level: *level,
                anchor: anchor.clone(),
                text: Arc::clone(text),
            },
            Event::StartList { ordered } => Block::List { ordered: *ordered },
            Event::StartListItem => Block::ListItem,
            Event::StartTable { rows, columns } => Block::Table {
                rows: *rows,
                columns: *columns,
            },
            Event::StartTableRow => Block::TableRow,
            Event::StartTableCell => Block::TableCell,
            _ => return None,
        })
    }

    /// Name of the event that closes this block.
    pub fn end_name(&self) -> &'static str {
        match self {
            Block::Paragraph => "EndParagraph",
            Block::Heading { .. } => "EndHeading",
            Block::List { .. } => "EndList",
            Block::ListItem => "EndListItem",
            Block::Table { .. } => "EndTable",
            Block::TableRow => "EndTableRow",
            Block::TableCell => "EndTableCell",
        }
    }
}

/// An open formatting scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub style: StyleFlags,
    pub link: Option<String>,
}

impl Span {
    pub fn new(style: StyleFlags) -> Self {
        Self { style, link: None }
    }

    pub fn link(url: impl Into<String>) -> Self {
        Self {
            style: StyleFlags::LINK,
            link: Some(url.into()),
        }
    }

    /// Link target, empty for non-link spans.
    pub fn href(&self) -> &str {
        self.link.as_deref().unwrap_or_default()
    }
}

/// Spans to close and reopen to end one formatting scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpanRepair {
    /// Innermost first; the ended span is last.
    pub closed: Vec<Span>,
    /// Spans that were opened after the ended one, outermost first.
    pub reopened: Vec<Span>,
}

/// Stack of open formatting spans.
#[derive(Debug, Clone, Default)]
pub struct FormatStack {
    open: Vec<Span>,
}

impl FormatStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, span: Span) {
        self.open.push(span);
    }

    /// End the innermost span with `style`.
    ///
    /// Returns `None` if no such span is open.
    pub fn end(&mut self, style: StyleFlags) -> Option<SpanRepair> {
        let position = self.open.iter().rposition(|span| span.style == style)?;
        let mut closed: Vec<Span> = self.open.drain(position..).collect();
        let reopened: Vec<Span> = closed[1..].to_vec();
        closed.reverse();
        self.open.extend(reopened.iter().cloned());
        Some(SpanRepair { closed, reopened })
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.open.len()
    }

    pub fn clear(&mut self) {
        self.open.clear();
    }
}

/// One output format, driven by balanced calls from [`FormatConsumer`].
pub trait Render: Send {
    /// Format name used in errors and outputs.
    const FORMAT: &'static str;
    const CONTENT_TYPE: &'static str;
    const EXTENSION: &'static str;
    const IS_TEXT: bool = true;

    fn start_document(&mut self, info: &DocumentInfo);
    fn end_document(&mut self) {}
    fn open(&mut self, block: &Block);
    fn close(&mut self, block: &Block);
    fn start_span(&mut self, span: &Span);
    fn end_span(&mut self, span: &Span);
    fn text(&mut self, text: &str);
    fn image(&mut self, url: &str, alt: &str);

    /// Produce the finished output.
    fn finish(&mut self) -> Result<Vec<u8>>;

    /// Discard all state.
    fn reset(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Phase {
    #[default]
    Idle,
    Open,
    Closed,
}

/// A [`Consumer`] that validates the event stream and drives a [`Render`].
#[derive(Debug, Default)]
pub struct FormatConsumer<R> {
    render: R,
    blocks: Vec<Block>,
    spans: FormatStack,
    phase: Phase,
    stats: Stats,
}

impl<R: Render + Default> FormatConsumer<R> {
    pub fn new() -> Self {
        Self::with_render(R::default())
    }
}

impl<R: Render> FormatConsumer<R> {
    pub fn with_render(render: R) -> Self {
        Self {
            render,
            blocks: Vec::new(),
            spans: FormatStack::new(),
            phase: Phase::Idle,
            stats: Stats::new(),
        }
    }

    pub fn render(&self) -> &R {
        &self.render
    }

    /// Current structural nesting depth (excluding the document).
    pub fn depth(&self) -> usize {
        self.blocks.len()
    }

    fn unbalanced(&self, expected: &str, found: &str) -> Error {
        warn!("{}: expected {expected}, found {found}", R::FORMAT);
        Error::unbalanced(R::FORMAT, expected, found)
    }

    /// What the stream should close next.
    fn expected_end(&self) -> &'static str {
        if !self.spans.is_empty() {
            "EndFormatting"
        } else {
            self.blocks.last().map_or("EndDocument", Block::end_name)
        }
    }

    fn require_open(&self, event: &Event) -> Result<()> {
        match self.phase {
            Phase::Open => Ok(()),
            Phase::Idle => Err(self.unbalanced("StartDocument", event.name())),
            Phase::Closed => Err(self.unbalanced("end of input", event.name())),
        }
    }

    fn close_block(&mut self, event: &Event) -> Result<()> {
        let expected = self.expected_end();
        if expected != event.name() {
            return Err(self.unbalanced(expected, event.name()));
        }
        if let Some(block) = self.blocks.pop() {
            self.render.close(&block);
        }
        Ok(())
    }
}

impl<R: Render> Consumer for FormatConsumer<R> {
    fn name(&self) -> &'static str {
        R::FORMAT
    }

    fn handle(&mut self, event: &Event) -> Result<()> {
        self.stats.record(event);

        if let Event::StartDocument(info) = event {
            if self.phase != Phase::Idle {
                return Err(self.unbalanced("end of input", event.name()));
            }
            self.phase = Phase::Open;
            self.render.start_document(info);
            return Ok(());
        }
        self.require_open(event)?;

        if let Some(block) = Block::from_event(event) {
            if !self.spans.is_empty() {
                return Err(self.unbalanced("EndFormatting", event.name()));
            }
            self.render.open(&block);
            self.blocks.push(block);
            return Ok(());
        }

        match event {
            Event::EndDocument => {
                let expected = self.expected_end();
                if expected != "EndDocument" {
                    return Err(self.unbalanced(expected, event.name()));
                }
                self.phase = Phase::Closed;
                self.render.end_document();
            }
            Event::StartFormatting { style, link } => {
                let span = Span {
                    style: *style,
                    link: link.clone(),
                };
                self.render.start_span(&span);
                self.spans.start(span);
            }
            Event::EndFormatting { style } => {
                let Some(repair) = self.spans.end(*style) else {
                    return Err(self.unbalanced(self.expected_end(), event.name()));
                };
                for span in &repair.closed {
                    self.render.end_span(span);
                }
                for span in &repair.reopened {
                    self.render.start_span(span);
                }
            }
            Event::Text(text) => self.render.text(text),
            Event::Image { url, alt } => self.render.image(url, alt),
            _ => self.close_block(event)?,
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<Vec<u8>> {
        if self.phase != Phase::Closed {
            return Err(self.unbalanced(self.expected_end(), "end of input"));
        }
        let bytes = self.render.finish()?;
        self.reset();
        Ok(bytes)
    }

    fn reset(&mut self) {
        self.render.reset();
        self.blocks.clear();
        self.spans.clear();
        self.phase = Phase::Idle;
        self.stats = Stats::new();
    }

    fn stats(&self) -> &Stats {
        &self.stats
    }

    fn content_type(&self) -> &'static str {
        R::CONTENT_TYPE
    }

    fn extension(&self) -> &'static str {
        R::EXTENSION
    }

    fn is_text(&self) -> bool {
        R::IS_TEXT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records calls as strings.
    #[derive(Debug, Default)]
    struct Trace(Vec<String>);

    impl Render for Trace {
        const FORMAT: &'static str = "trace";
        const CONTENT_TYPE: &'static str = "text/plain";
        const EXTENSION: &'static str = "trace";

        fn start_document(&mut self, info: &DocumentInfo) {
            self.0.push(format!("doc {}", info.title));
        }
        fn open(&mut self, block: &Block) {
            self.0.push(format!("open {}", block.end_name()));
        }
        fn close(&mut self, block: &Block) {
            self.0.push(format!("close {}", block.end_name()));
        }
        fn start_span(&mut self, span: &Span) {
            self.0.push(format!("+{}", span.style.name()));
        }
        fn end_span(&mut self, span: &Span) {
            self.0.push(format!("-{}", span.style.name()));
        }
        fn text(&mut self, text: &str) {
            self.0.push(text.to_string());
        }
        fn image(&mut self, url: &str, _alt: &str) {
            self.0.push(format!("img {url}"));
        }
        fn finish(&mut self) -> Result<Vec<u8>> {
            Ok(self.0.join(",").into_bytes())
        }
        fn reset(&mut self) {
            self.0.clear();
        }
    }

    fn start() -> Event {
        Event::StartDocument(Box::new(DocumentInfo {
            title: "T".into(),
            ..DocumentInfo::default()
        }))
    }

    #[test]
    fn test_format_stack_repairs_overlap() {
        let mut stack = FormatStack::new();
        stack.start(Span::new(StyleFlags::BOLD));
        stack.start(Span::new(StyleFlags::ITALIC));
        stack.start(Span::link("#a"));

        let repair = stack.end(StyleFlags::BOLD).expect("bold is open");
        assert_eq!(
            repair.closed,
            vec![Span::link("#a"), Span::new(StyleFlags::ITALIC), Span::new(StyleFlags::BOLD)]
        );
        assert_eq!(repair.reopened, vec![Span::new(StyleFlags::ITALIC), Span::link("#a")]);
        assert_eq!(stack.depth(), 2);
        assert!(stack.end(StyleFlags::UNDERLINE).is_none());
    }

    #[test]
    fn test_consumer_nests_overlapping_spans() {
        let mut consumer = FormatConsumer::<Trace>::new();
        for event in [
            start(),
            Event::StartParagraph,
            Event::start_formatting(StyleFlags::BOLD),
            Event::start_formatting(StyleFlags::ITALIC),
            Event::text("a"),
            Event::end_formatting(StyleFlags::BOLD),
            Event::text("b"),
            Event::end_formatting(StyleFlags::ITALIC),
            Event::EndParagraph,
            Event::EndDocument,
        ] {
            consumer.handle(&event).expect("balanced");
        }
        let out = String::from_utf8(consumer.flush().expect("flush")).expect("utf8");
        assert_eq!(
            out,
            "doc T,open EndParagraph,+bold,+italic,a,-italic,-bold,+italic,b,-italic,close EndParagraph"
        );
    }

    #[test]
    fn test_mismatched_end_is_rejected() {
        let mut consumer = FormatConsumer::<Trace>::new();
        consumer.handle(&start()).expect("start");
        consumer.handle(&Event::StartParagraph).expect("paragraph");

        let err = consumer.handle(&Event::EndList).expect_err("mismatch");
        match err {
            Error::Unbalanced {
                format,
                expected,
                found,
            } => {
                assert_eq!(format, "trace");
                assert_eq!(expected, "EndParagraph");
                assert_eq!(found, "EndList");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_events_outside_document_are_rejected() {
        let mut consumer = FormatConsumer::<Trace>::new();
        assert!(consumer.handle(&Event::text("early")).is_err());

        consumer.reset();
        consumer.handle(&start()).expect("start");
        consumer.handle(&Event::EndDocument).expect("end");
        assert!(consumer.handle(&Event::StartParagraph).is_err());
    }

    #[test]
    fn test_flush_requires_end_document() {
        let mut consumer = FormatConsumer::<Trace>::new();
        consumer.handle(&start()).expect("start");
        assert!(consumer.flush().is_err());
    }

    #[test]
    fn test_reset_discards_output_and_stats() {
        let mut consumer = FormatConsumer::<Trace>::new();
        consumer.handle(&start()).expect("start");
        consumer.handle(&Event::StartParagraph).expect("paragraph");
        consumer.reset();

        assert_eq!(consumer.stats().events, 0);
        assert_eq!(consumer.depth(), 0);
        assert!(consumer.render().0.is_empty());
    }
}
