//! Event-stream generation.
//!
//! [`stream`] turns a [`Document`] into a lazy sequence of [`Event`]s. All
//! work happens while the caller pulls events:
//!
//! 1. The first pull sanitizes the document (optional) and runs the
//!    table-of-contents pass ([`toc::collect`]), which also plans every
//!    heading anchor.
//! 2. Each later pull emits queued events; when the queue is empty the next
//!    body element is translated into events.
//!
//! Text runs longer than [`StreamOptions::chunk_size`] are queued as lazy
//! [`TextChunks`], so only one chunk is materialised per pull.
//!
//! The [`CancelToken`] is checked before every event and every 32 scanned
//! body elements. A cancelled stream simply ends: scopes that were open stay
//! open and no `EndDocument` is emitted.
//!
//! # Example
//!
//! ```
//! use docstream::model::{Document, Paragraph};
//! use docstream::stream::{stream, CancelToken, StreamOptions};
//! use docstream::Event;
//!
//! let doc = Document::new("Report").with_body(vec![
//!     Paragraph::heading(1, "Intro").into(),
//!     Paragraph::text("Hello").into(),
//! ]);
//! let events: Vec<Event> = stream(&doc, &StreamOptions::default(), &CancelToken::new()).collect();
//! assert!(matches!(events.first(), Some(Event::StartDocument(_))));
//! assert_eq!(events.last(), Some(&Event::EndDocument));
//! ```

mod anchor;
mod cancel;
mod heading;
mod text;
mod toc;
mod transition;

pub use anchor::{FALLBACK_SLUG, SlugCache, slugify};
pub use cancel::CancelToken;
pub use heading::{HeadingSpec, TOC_PLACEHOLDERS, heading_level, is_toc_placeholder};
pub use text::{TextChunks, normalize};
pub use toc::{TocEntry, TocPlan, collect, collect_toc};
pub use transition::StyleTracker;

use std::borrow::Cow;
use std::collections::VecDeque;
use std::sync::Arc;

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::ir::{DocumentInfo, Event, StyleFlags};
use crate::model::{Body, Chapter, Document, Paragraph, ParagraphElement, StructuralElement, Table};
use crate::sanitize::sanitize;

/// Default chunk size for text runs, in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// How many body elements may be scanned between cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 32;

/// Options recognised by the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "cli", serde(default))]
pub struct StreamOptions {
    /// Text runs longer than this many bytes are split at line boundaries.
    pub chunk_size: usize,
    /// Informational upper bound; logged, not enforced.
    pub memory_limit: Option<usize>,
    /// Drop paragraphs with no text and no image.
    pub skip_empty: bool,
    /// Run the sanitizer before streaming.
    pub sanitize_text: bool,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            memory_limit: None,
            skip_empty: true,
            sanitize_text: true,
        }
    }
}

impl StreamOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_memory_limit(mut self, limit: usize) -> Self {
        self.memory_limit = Some(limit);
        self
    }

    pub fn with_skip_empty(mut self, skip_empty: bool) -> Self {
        self.skip_empty = skip_empty;
        self
    }

    pub fn with_sanitize_text(mut self, sanitize_text: bool) -> Self {
        self.sanitize_text = sanitize_text;
        self
    }

    /// Check that the options are usable.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidOptions("chunk_size must be positive".into()));
        }
        if let Some(limit) = self.memory_limit
            && limit < self.chunk_size
        {
            return Err(Error::InvalidOptions(format!(
                "memory_limit ({limit}) is smaller than chunk_size ({})",
                self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Produces event streams with fixed options.
///
/// The generator itself holds no session state, so one instance can serve
/// any number of concurrent streams.
#[derive(Debug, Clone, Default)]
pub struct EventGenerator {
    options: StreamOptions,
}

impl EventGenerator {
    pub fn new(options: StreamOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &StreamOptions {
        &self.options
    }

    /// Start a new streaming session over `doc`.
    pub fn stream<'a>(&self, doc: &'a Document, cancel: &CancelToken) -> EventStream<'a> {
        EventStream::new(doc, self.options.clone(), cancel.clone())
    }
}

/// Stream `doc` as events with a fresh session.
pub fn stream<'a>(doc: &'a Document, options: &StreamOptions, cancel: &CancelToken) -> EventStream<'a> {
    EventStream::new(doc, options.clone(), cancel.clone())
}

/// Session-scoped mutable state.
#[derive(Debug, Default)]
struct Session {
    slugs: SlugCache,
    toc: Vec<TocEntry>,
    anchors: VecDeque<String>,
    toc_emitted: bool,
}

#[derive(Debug)]
enum Pending {
    Ready(Event),
    Chunks(TextChunks),
}

/// Events waiting to be pulled.
#[derive(Debug)]
struct EventQueue {
    items: VecDeque<Pending>,
    chunk_size: usize,
}

impl EventQueue {
    fn new(chunk_size: usize) -> Self {
        Self {
            items: VecDeque::new(),
            chunk_size: chunk_size.max(1),
        }
    }

    fn push(&mut self, event: Event) {
        self.items.push_back(Pending::Ready(event));
    }

    /// Queue text, deferring the split of oversized runs until pulled.
    fn push_text(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        if text.len() <= self.chunk_size {
            self.push(Event::Text(text));
        } else {
            self.items
                .push_back(Pending::Chunks(TextChunks::new(text, self.chunk_size)));
        }
    }

    fn pop(&mut self) -> Option<Event> {
        while let Some(front) = self.items.front_mut() {
            if let Pending::Chunks(chunks) = front {
                if let Some(chunk) = chunks.next() {
                    return Some(Event::Text(chunk));
                }
                self.items.pop_front();
                continue;
            }
            if let Some(Pending::Ready(event)) = self.items.pop_front() {
                return Some(event);
            }
        }
        None
    }

    fn clear(&mut self) {
        self.items.clear();
    }
}

impl Extend<Event> for EventQueue {
    fn extend<I: IntoIterator<Item = Event>>(&mut self, iter: I) {
        for event in iter {
            self.push(event);
        }
    }
}

/// Position of the walk.
#[derive(Debug)]
enum Cursor {
    Start,
    /// Next body element to translate.
    Body(usize),
    /// Pre-order path to the next chapter of a chapter-only body.
    Chapters(Vec<usize>),
    Done,
}

/// A lazy, pull-based event sequence for one document.
///
/// Created by [`stream`] or [`EventGenerator::stream`]. Each instance owns
/// its own session (slug cache, TOC, "TOC emitted" flag).
pub struct EventStream<'a> {
    doc: Cow<'a, Document>,
    options: StreamOptions,
    cancel: CancelToken,
    session: Session,
    queue: EventQueue,
    cursor: Cursor,
    list_open: bool,
    scanned: usize,
    emitted: usize,
    fused: bool,
}

impl<'a> EventStream<'a> {
    fn new(doc: &'a Document, options: StreamOptions, cancel: CancelToken) -> Self {
        Self {
            doc: Cow::Borrowed(doc),
            queue: EventQueue::new(options.chunk_size),
            options,
            cancel,
            session: Session::default(),
            cursor: Cursor::Start,
            list_open: false,
            scanned: 0,
            emitted: 0,
            fused: false,
        }
    }

    /// Collected table of contents (empty until the first event is pulled).
    pub fn toc(&self) -> &[TocEntry] {
        &self.session.toc
    }

    /// Number of events handed out so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    fn emitter(&mut self) -> Emitter<'_> {
        Emitter {
            doc: &self.doc,
            queue: &mut self.queue,
            session: &mut self.session,
            list_open: &mut self.list_open,
            skip_empty: self.options.skip_empty,
        }
    }

    /// Queue more events. Returns false when the walk is over or cancelled.
    fn advance(&mut self) -> bool {
        match std::mem::replace(&mut self.cursor, Cursor::Done) {
            Cursor::Start => {
                self.begin();
                true
            }
            Cursor::Body(index) => self.advance_body(index),
            Cursor::Chapters(path) => self.advance_chapters(path),
            Cursor::Done => false,
        }
    }

    fn begin(&mut self) {
        if self.options.sanitize_text {
            self.doc = Cow::Owned(sanitize(&self.doc));
        }

        self.session = Session::default();
        let plan = toc::collect(&self.doc, &mut self.session.slugs);
        self.session.toc = plan.entries;
        self.session.anchors = plan.anchors;
        self.session.toc_emitted = false;

        debug!(
            "streaming '{}': {} body elements, {} toc entries",
            self.doc.metadata.title,
            self.doc.elements().len(),
            self.session.toc.len()
        );
        if let Some(limit) = self.options.memory_limit {
            debug!("memory limit {limit} bytes (informational)");
        }

        let info = DocumentInfo::from_document(&self.doc);
        self.queue.push(Event::StartDocument(Box::new(info)));
        self.cursor = match self.doc.body {
            Body::Rich(_) => Cursor::Body(0),
            Body::Chapters => Cursor::Chapters(vec![0]),
        };
    }

    fn advance_body(&mut self, mut index: usize) -> bool {
        let len = self.doc.elements().len();
        while index < len {
            if !self.checkpoint() {
                return false;
            }
            let produced = self.emitter().element(index);
            index += 1;
            if produced {
                self.cursor = Cursor::Body(index);
                return true;
            }
        }
        self.finish();
        true
    }

    fn advance_chapters(&mut self, mut path: Vec<usize>) -> bool {
        while !path.is_empty() {
            if !self.checkpoint() {
                return false;
            }
            let produced = self.emitter().chapter(&path);
            next_chapter_path(&self.doc.chapters, &mut path);
            if produced {
                self.cursor = Cursor::Chapters(path);
                return true;
            }
        }
        self.finish();
        true
    }

    /// Periodic cancellation check while scanning elements that emit nothing.
    fn checkpoint(&mut self) -> bool {
        self.scanned += 1;
        !(self.scanned % CANCEL_CHECK_INTERVAL == 0 && self.cancel.is_cancelled())
    }

    fn finish(&mut self) {
        self.emitter().close_list();
        self.queue.push(Event::EndDocument);
        self.cursor = Cursor::Done;
    }
}

impl Iterator for EventStream<'_> {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        loop {
            if self.fused {
                return None;
            }
            if self.cancel.is_cancelled() {
                debug!("stream cancelled after {} events", self.emitted);
                self.fused = true;
                self.queue.clear();
                return None;
            }
            if let Some(event) = self.queue.pop() {
                self.emitted += 1;
                return Some(event);
            }
            if !self.advance() {
                self.fused = true;
                if !self.cancel.is_cancelled() {
                    debug!("stream finished: {} events", self.emitted);
                }
            }
        }
    }
}

/// Translates body elements into queued events.
struct Emitter<'s> {
    doc: &'s Document,
    queue: &'s mut EventQueue,
    session: &'s mut Session,
    list_open: &'s mut bool,
    skip_empty: bool,
}

impl Emitter<'_> {
    /// Translate body element `index`. Returns whether anything was queued.
    fn element(&mut self, index: usize) -> bool {
        let doc = self.doc;
        match doc.elements().get(index) {
            Some(StructuralElement::Paragraph(paragraph)) => self.paragraph(paragraph),
            Some(StructuralElement::Table(table)) => self.table(table),
            None => false,
        }
    }

    fn paragraph(&mut self, paragraph: &Paragraph) -> bool {
        if let Some(spec) = heading::classify(self.doc, paragraph) {
            self.heading(spec);
            return true;
        }

        if let Some(id) = paragraph.style.chapter_id.as_deref()
            && self.doc.find_chapter(id).is_none()
        {
            warn!("paragraph references unknown chapter '{id}'");
        }

        if self.skip_empty && self.is_empty(paragraph) {
            return false;
        }

        if paragraph.bullet.is_some() {
            if !*self.list_open {
                self.queue.push(Event::StartList { ordered: false });
                *self.list_open = true;
            }
            self.queue.push(Event::StartListItem);
            self.inline(paragraph);
            self.queue.push(Event::EndListItem);
        } else {
            self.close_list();
            self.queue.push(Event::StartParagraph);
            self.inline(paragraph);
            self.queue.push(Event::EndParagraph);
        }
        true
    }

    fn heading(&mut self, spec: HeadingSpec) {
        self.close_list();

        let anchor = match self.session.anchors.pop_front() {
            Some(anchor) => anchor,
            None => self.session.slugs.with_cache(&spec.text),
        };
        let level = spec.level;
        let placeholder = is_toc_placeholder(&spec.text);

        self.queue.push(Event::StartHeading {
            level,
            anchor,
            text: Arc::from(spec.text.as_str()),
        });
        self.queue.push_text(spec.text);
        self.queue.push(Event::EndHeading { level });

        if placeholder && !self.session.toc_emitted {
            self.toc();
            self.session.toc_emitted = true;
        }
    }

    /// Emit the collected table of contents as a list of links.
    fn toc(&mut self) {
        if self.session.toc.is_empty() {
            return;
        }
        self.queue.push(Event::StartList { ordered: false });
        for entry in &self.session.toc {
            self.queue.push(Event::StartListItem);
            self.queue.push(Event::start_link(format!("#{}", entry.anchor)));
            self.queue.push(Event::Text(entry.text.clone()));
            self.queue.push(Event::end_formatting(StyleFlags::LINK));
            self.queue.push(Event::EndListItem);
        }
        self.queue.push(Event::EndList);
    }

    fn table(&mut self, table: &Table) -> bool {
        if table.table_rows.is_empty() {
            return false;
        }
        self.close_list();

        let rows = if table.rows > 0 {
            table.rows
        } else {
            table.table_rows.len()
        };
        let columns = if table.columns > 0 {
            table.columns
        } else {
            table
                .table_rows
                .iter()
                .map(|row| row.cells.len())
                .max()
                .unwrap_or(0)
        };

        self.queue.push(Event::StartTable { rows, columns });
        for row in &table.table_rows {
            self.queue.push(Event::StartTableRow);
            for cell in &row.cells {
                self.queue.push(Event::StartTableCell);
                let mut first = true;
                for element in &cell.content {
                    let StructuralElement::Paragraph(paragraph) = element else {
                        continue;
                    };
                    if self.is_empty(paragraph) {
                        continue;
                    }
                    if !first {
                        self.queue.push(Event::text("\n"));
                    }
                    self.inline(paragraph);
                    first = false;
                }
                self.queue.push(Event::EndTableCell);
            }
            self.queue.push(Event::EndTableRow);
        }
        self.queue.push(Event::EndTable);
        true
    }

    /// Text runs and images of one paragraph, with style transitions.
    fn inline(&mut self, paragraph: &Paragraph) {
        let mut styles = StyleTracker::new();
        for element in &paragraph.elements {
            match element {
                ParagraphElement::TextRun(run) => {
                    let text = normalize(&run.content);
                    if text.is_empty() {
                        continue;
                    }
                    let flags = StyleFlags::from(&run.style);
                    styles.transition(flags, run.style.link.as_deref(), &mut *self.queue);
                    self.queue.push_text(text);
                }
                ParagraphElement::InlineImage { object_id } => self.image(object_id),
            }
        }
        styles.close_all(&mut *self.queue);
    }

    fn image(&mut self, id: &str) {
        let Some(object) = self.doc.inline_object(id) else {
            debug!("skipping unresolved image '{id}'");
            return;
        };
        let alt = [object.title.as_deref(), object.description.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                if id.is_empty() {
                    "Embedded image".to_string()
                } else {
                    format!("Image: {id}")
                }
            });
        self.queue.push(Event::Image {
            url: object.url.clone(),
            alt,
        });
    }

    /// Translate the chapter at `path` of a chapter-only body.
    fn chapter(&mut self, path: &[usize]) -> bool {
        let doc = self.doc;
        let Some(chapter) = chapter_at(&doc.chapters, path) else {
            return false;
        };

        let mut produced = false;
        let title = chapter.title.trim();
        if !title.is_empty() {
            self.heading(HeadingSpec {
                level: heading::chapter_level(path.len() - 1),
                text: title.to_string(),
            });
            produced = true;
        }

        let text = normalize(&chapter.text);
        if !text.trim().is_empty() {
            self.queue.push(Event::StartParagraph);
            self.queue.push_text(text);
            self.queue.push(Event::EndParagraph);
            produced = true;
        }
        produced
    }

    fn is_empty(&self, paragraph: &Paragraph) -> bool {
        !paragraph.has_text()
            && !paragraph
                .image_ids()
                .any(|id| self.doc.inline_object(id).is_some())
    }

    fn close_list(&mut self) {
        if *self.list_open {
            self.queue.push(Event::EndList);
            *self.list_open = false;
        }
    }
}

fn chapter_at<'d>(chapters: &'d [Chapter], path: &[usize]) -> Option<&'d Chapter> {
    let (first, rest) = path.split_first()?;
    let mut chapter = chapters.get(*first)?;
    for &index in rest {
        chapter = chapter.children.get(index)?;
    }
    Some(chapter)
}

/// Move `path` to the next chapter in pre-order; empties it at the end.
fn next_chapter_path(chapters: &[Chapter], path: &mut Vec<usize>) {
    if let Some(chapter) = chapter_at(chapters, path)
        && !chapter.children.is_empty()
    {
        path.push(0);
        return;
    }
    while let Some(last) = path.last_mut() {
        *last += 1;
        if chapter_at(chapters, path).is_some() {
            return;
        }
        path.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InlineObject, TextRun};

    fn events(doc: &Document) -> Vec<Event> {
        stream(doc, &StreamOptions::default(), &CancelToken::new()).collect()
    }

    /// Drop the StartDocument/EndDocument frame.
    fn body_events(doc: &Document) -> Vec<Event> {
        let mut all = events(doc);
        assert!(matches!(all.first(), Some(Event::StartDocument(_))));
        assert_eq!(all.pop(), Some(Event::EndDocument));
        all.remove(0);
        all
    }

    #[test]
    fn test_empty_document() {
        let events = events(&Document::default());
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Event::StartDocument(_)));
        assert_eq!(events[1], Event::EndDocument);
    }

    #[test]
    fn test_heading_list_paragraph_sequence() {
        let doc = Document::new("Doc").with_body(vec![
            Paragraph::heading(1, "Intro").into(),
            Paragraph::bullet("Item 1").into(),
            Paragraph::bullet("Item 2").into(),
            Paragraph::text("Text").into(),
        ]);

        assert_eq!(
            body_events(&doc),
            vec![
                Event::StartHeading {
                    level: 2,
                    anchor: "intro".into(),
                    text: Arc::from("Intro"),
                },
                Event::text("Intro"),
                Event::EndHeading { level: 2 },
                Event::StartList { ordered: false },
                Event::StartListItem,
                Event::text("Item 1"),
                Event::EndListItem,
                Event::StartListItem,
                Event::text("Item 2"),
                Event::EndListItem,
                Event::EndList,
                Event::StartParagraph,
                Event::text("Text"),
                Event::EndParagraph,
            ]
        );
    }

    #[test]
    fn test_list_closed_at_end_of_document() {
        let doc = Document::new("Doc").with_body(vec![Paragraph::bullet("Only").into()]);
        let events = body_events(&doc);
        assert_eq!(events.last(), Some(&Event::EndList));
    }

    #[test]
    fn test_empty_paragraphs_are_skipped_by_default() {
        let doc = Document::new("Doc").with_body(vec![
            Paragraph::text("  ").into(),
            Paragraph::default().into(),
            Paragraph::text("kept").into(),
        ]);
        assert_eq!(
            body_events(&doc),
            vec![Event::StartParagraph, Event::text("kept"), Event::EndParagraph]
        );
    }

    #[test]
    fn test_empty_paragraphs_kept_when_requested() {
        let doc = Document::new("Doc").with_body(vec![Paragraph::default().into()]);
        let options = StreamOptions::default().with_skip_empty(false);
        let events: Vec<Event> = stream(&doc, &options, &CancelToken::new()).collect();
        assert_eq!(events[1..3], [Event::StartParagraph, Event::EndParagraph]);
    }

    #[test]
    fn test_style_runs_emit_formatting() {
        let doc = Document::new("Doc").with_body(vec![
            Paragraph::default()
                .with_run(TextRun::new("a").bold().italic())
                .with_run(TextRun::new("b").italic().link("https://example.com"))
                .into(),
        ]);

        assert_eq!(
            body_events(&doc),
            vec![
                Event::StartParagraph,
                Event::start_formatting(StyleFlags::BOLD),
                Event::start_formatting(StyleFlags::ITALIC),
                Event::text("a"),
                Event::end_formatting(StyleFlags::BOLD),
                Event::start_link("https://example.com"),
                Event::text("b"),
                Event::end_formatting(StyleFlags::LINK),
                Event::end_formatting(StyleFlags::ITALIC),
                Event::EndParagraph,
            ]
        );
    }

    #[test]
    fn test_image_resolution_and_alt_text() {
        let doc = Document::new("Doc")
            .with_inline_object("titled", InlineObject::new("a.png").with_title("Figure 1"))
            .with_inline_object("described", InlineObject::new("b.png").with_description("A chart"))
            .with_inline_object("bare", InlineObject::new("c.png"))
            .with_body(vec![
                Paragraph::default()
                    .with_image("titled")
                    .with_image("described")
                    .with_image("bare")
                    .with_image("missing")
                    .into(),
            ]);

        let images: Vec<(String, String)> = body_events(&doc)
            .into_iter()
            .filter_map(|event| match event {
                Event::Image { url, alt } => Some((url, alt)),
                _ => None,
            })
            .collect();
        assert_eq!(
            images,
            vec![
                ("a.png".to_string(), "Figure 1".to_string()),
                ("b.png".to_string(), "A chart".to_string()),
                ("c.png".to_string(), "Image: bare".to_string()),
            ]
        );
    }

    #[test]
    fn test_paragraph_with_only_unresolved_image_is_empty() {
        let doc = Document::new("Doc").with_body(vec![Paragraph::default().with_image("nope").into()]);
        assert!(body_events(&doc).is_empty());
    }

    #[test]
    fn test_table_events() {
        let doc = Document::new("Doc").with_body(vec![
            Paragraph::bullet("before").into(),
            Table::from_rows([vec!["a", "b"]]).into(),
        ]);

        assert_eq!(
            body_events(&doc),
            vec![
                Event::StartList { ordered: false },
                Event::StartListItem,
                Event::text("before"),
                Event::EndListItem,
                Event::EndList,
                Event::StartTable { rows: 1, columns: 2 },
                Event::StartTableRow,
                Event::StartTableCell,
                Event::text("a"),
                Event::EndTableCell,
                Event::StartTableCell,
                Event::text("b"),
                Event::EndTableCell,
                Event::EndTableRow,
                Event::EndTable,
            ]
        );
    }

    #[test]
    fn test_table_without_rows_emits_nothing() {
        let doc = Document::new("Doc").with_body(vec![
            Paragraph::bullet("item").into(),
            Table::default().into(),
            Paragraph::bullet("item 2").into(),
        ]);
        let lists = body_events(&doc)
            .iter()
            .filter(|e| matches!(e, Event::StartList { .. }))
            .count();
        assert_eq!(lists, 1);
    }

    #[test]
    fn test_cell_paragraphs_separated_by_newline() {
        let mut table = Table::from_rows([vec!["first"]]);
        table.table_rows[0].cells[0]
            .content
            .push(Paragraph::text("second").into());
        let doc = Document::new("Doc").with_body(vec![table.into()]);

        let texts: Vec<Event> = body_events(&doc)
            .into_iter()
            .filter(|e| matches!(e, Event::Text(_)))
            .collect();
        assert_eq!(
            texts,
            vec![Event::text("first"), Event::text("\n"), Event::text("second")]
        );
    }

    #[test]
    fn test_large_run_is_chunked() {
        let line = "x".repeat(30);
        let content = format!("{line}\n{line}\n{line}");
        let doc = Document::new("Doc").with_body(vec![Paragraph::text(content.clone()).into()]);
        let options = StreamOptions::default().with_chunk_size(40);

        let texts: Vec<String> = stream(&doc, &options, &CancelToken::new())
            .filter_map(|event| match event {
                Event::Text(text) => Some(text),
                _ => None,
            })
            .collect();
        assert_eq!(texts.len(), 3);
        assert_eq!(texts.concat(), content);
    }

    #[test]
    fn test_chapter_only_body() {
        let doc = Document::new("Doc")
            .with_chapter(Chapter::new("1", "One").with_text("Chapter text").with_child(Chapter::new("1.1", "Sub")))
            .with_chapter_body();

        let headings: Vec<(u8, String)> = body_events(&doc)
            .into_iter()
            .filter_map(|event| match event {
                Event::StartHeading { level, anchor, .. } => Some((level, anchor)),
                _ => None,
            })
            .collect();
        assert_eq!(headings, vec![(2, "one".to_string()), (3, "sub".to_string())]);
    }

    #[test]
    fn test_next_chapter_path_is_preorder() {
        let chapters = vec![
            Chapter::new("a", "A").with_child(Chapter::new("a1", "A1")),
            Chapter::new("b", "B"),
        ];
        let mut path = vec![0];
        let mut visited = Vec::new();
        while let Some(chapter) = chapter_at(&chapters, &path) {
            visited.push(chapter.id.clone());
            next_chapter_path(&chapters, &mut path);
        }
        assert_eq!(visited, vec!["a", "a1", "b"]);
        assert!(path.is_empty());
    }

    #[test]
    fn test_validate_options() {
        assert!(StreamOptions::default().validate().is_ok());
        assert!(StreamOptions::default().with_chunk_size(0).validate().is_err());
        assert!(
            StreamOptions::default()
                .with_chunk_size(512)
                .with_memory_limit(100)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_toc_available_after_first_pull() {
        let doc = Document::new("Doc").with_body(vec![Paragraph::heading(1, "A").into()]);
        let mut events = stream(&doc, &StreamOptions::default(), &CancelToken::new());
        assert!(events.toc().is_empty());
        events.next();
        assert_eq!(events.toc().len(), 1);
    }

    /// Pull StartDocument, cancel, then scan without going through `next`.
    fn cancel_during_scan(doc: &Document) {
        let cancel = CancelToken::new();
        let mut events = stream(doc, &StreamOptions::default(), &cancel);
        assert!(matches!(events.next(), Some(Event::StartDocument(_))));

        cancel.cancel();
        assert!(!events.advance());
        assert_eq!(events.scanned, CANCEL_CHECK_INTERVAL);
        assert!(matches!(events.cursor, Cursor::Done));
        assert_eq!(events.queue.pop(), None);
        assert_eq!(events.next(), None);
    }

    #[test]
    fn test_scan_of_skipped_paragraphs_observes_cancel() {
        let mut body: Vec<StructuralElement> =
            (0..100).map(|_| Paragraph::default().into()).collect();
        body.push(Paragraph::text("last").into());
        cancel_during_scan(&Document::new("Doc").with_body(body));
    }

    #[test]
    fn test_scan_of_empty_chapters_observes_cancel() {
        let mut doc = Document::new("Doc");
        for i in 0..100 {
            doc = doc.with_chapter(Chapter::new(i.to_string(), ""));
        }
        let doc = doc.with_chapter(Chapter::new("last", "Last")).with_chapter_body();
        cancel_during_scan(&doc);
    }
}
