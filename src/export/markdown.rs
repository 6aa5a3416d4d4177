//! Markdown consumer.
//!
//! Emphasis markers are written lazily: an opening marker is only placed
//! once non-space text follows it, and trailing spaces are moved outside the
//! closing marker, so `**bold **` never appears in the output. Inside an
//! emphasis span a run of newlines becomes a single hard break, since a blank
//! line would end the paragraph with the span still open.

use super::consumer::{Block, FormatConsumer, Render, Span};
use super::info_lines;
use crate::error::Result;
use crate::ir::{DocumentInfo, StyleFlags};
use crate::markdown::{escape_cell, escape_markdown, escape_url};

/// Configuration for Markdown export.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "cli", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "cli", serde(default))]
pub struct MarkdownConfig {
    /// Append `{#anchor}` to headings so in-document links resolve.
    pub heading_anchors: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            heading_anchors: true,
        }
    }
}

/// Inline content of the current block.
#[derive(Debug, Default)]
struct Inline {
    out: String,
    pending_open: String,
    pending_space: String,
    newline: &'static str,
    /// Markers in `pending_open` not yet written.
    pending_spans: usize,
    /// Markers written to `out` and not yet closed.
    open_spans: usize,
}

impl Inline {
    fn new(newline: &'static str) -> Self {
        Self {
            newline,
            ..Self::default()
        }
    }

    fn open(&mut self, marker: &str) {
        self.pending_open.push_str(marker);
        self.pending_spans += 1;
    }

    fn close(&mut self, open: &str, close: &str) {
        // Nothing was written since the marker opened: drop both.
        if self.pending_spans > 0 && self.pending_open.ends_with(open) {
            let len = self.pending_open.len() - open.len();
            self.pending_open.truncate(len);
            self.pending_spans -= 1;
            return;
        }
        self.out.push_str(close);
        self.open_spans = self.open_spans.saturating_sub(1);
    }

    fn flush_space(&mut self) {
        if self.pending_space.is_empty() {
            return;
        }
        let space = std::mem::take(&mut self.pending_space);
        if self.open_spans > 0 && space.contains('\n') {
            self.out.push_str(self.newline);
        } else {
            self.out.push_str(&space.replace('\n', self.newline));
        }
    }

    fn flush_open(&mut self) {
        self.out.push_str(&std::mem::take(&mut self.pending_open));
        self.open_spans += std::mem::take(&mut self.pending_spans);
    }

    /// Escaped text with its line breaks; blank lines are dropped in a span.
    fn lines(&self, word: &str) -> String {
        let escaped = escape_markdown(word);
        if self.open_spans == 0 {
            return escaped.replace('\n', self.newline);
        }
        escaped
            .split('\n')
            .filter(|line| !line.trim().is_empty())
            .collect::<Vec<_>>()
            .join(self.newline)
    }

    fn text(&mut self, text: &str) {
        let body = text.trim_start();
        if body.is_empty() {
            self.pending_space.push_str(text);
            return;
        }
        let lead = &text[..text.len() - body.len()];
        let word = body.trim_end();
        let trail = &body[word.len()..];

        self.pending_space.push_str(lead);
        self.flush_space();
        self.flush_open();
        let lines = self.lines(word);
        self.out.push_str(&lines);
        self.pending_space.push_str(trail);
    }

    /// Already formatted markup such as an image.
    fn raw(&mut self, markup: &str) {
        self.flush_space();
        self.flush_open();
        self.out.push_str(markup);
    }

    fn take(&mut self) -> String {
        self.pending_open.clear();
        self.pending_space.clear();
        self.pending_spans = 0;
        self.open_spans = 0;
        std::mem::take(&mut self.out)
    }
}

#[derive(Debug, Default)]
struct TableBuffer {
    columns: usize,
    rows: Vec<Vec<String>>,
}

impl TableBuffer {
    /// Render as a pipe table; the first row is the header.
    fn render(&self, out: &mut String) {
        let widest = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        let columns = self.columns.max(widest).max(1);

        for (i, row) in self.rows.iter().enumerate() {
            out.push('|');
            for column in 0..columns {
                let cell = row.get(column).map_or("", String::as_str);
                out.push(' ');
                out.push_str(cell);
                out.push_str(" |");
            }
            out.push('\n');
            if i == 0 {
                out.push('|');
                for _ in 0..columns {
                    out.push_str(" --- |");
                }
                out.push('\n');
            }
        }
        out.push('\n');
    }
}

/// Renders Markdown.
#[derive(Debug, Default)]
pub struct MarkdownWriter {
    config: MarkdownConfig,
    out: String,
    inline: Inline,
    table: Option<TableBuffer>,
    /// Output length right after the last list ended.
    list_end: Option<usize>,
}

impl MarkdownWriter {
    pub fn new(config: MarkdownConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Opening and closing markers for a formatting flag.
    fn markers(span: &Span) -> (&'static str, String) {
        let open = match span.style {
            StyleFlags::BOLD => "**",
            StyleFlags::ITALIC => "*",
            StyleFlags::UNDERLINE => "<u>",
            StyleFlags::STRIKE => "~~",
            StyleFlags::HIGHLIGHT => "==",
            StyleFlags::SUB => "~",
            StyleFlags::SUP => "^",
            StyleFlags::LINK => "[",
            _ => "",
        };
        let close = match span.style {
            StyleFlags::UNDERLINE => "</u>".to_string(),
            StyleFlags::LINK => format!("]({})", escape_url(span.href())),
            _ => open.to_string(),
        };
        (open, close)
    }
}

impl Render for MarkdownWriter {
    const FORMAT: &'static str = "markdown";
    const CONTENT_TYPE: &'static str = "text/markdown";
    const EXTENSION: &'static str = "md";

    fn start_document(&mut self, info: &DocumentInfo) {
        if !info.title.trim().is_empty() {
            self.out.push_str("# ");
            self.out.push_str(&escape_markdown(info.title.trim()));
            self.out.push_str("\n\n");
        }
        if !info.description.trim().is_empty() {
            self.out.push_str(&escape_markdown(info.description.trim()));
            self.out.push_str("\n\n");
        }
        let lines: Vec<String> = info_lines(info).iter().map(|l| escape_markdown(l)).collect();
        if !lines.is_empty() {
            self.out.push_str(&lines.join("  \n"));
            self.out.push_str("\n\n");
        }
    }

    fn open(&mut self, block: &Block) {
        match block {
            Block::Paragraph => self.inline = Inline::new("  \n"),
            Block::Heading { .. } => self.inline = Inline::new(" "),
            Block::ListItem => self.inline = Inline::new("  \n  "),
            Block::TableCell => self.inline = Inline::new("\n"),
            Block::Table { columns, .. } => {
                self.table = Some(TableBuffer {
                    columns: *columns,
                    rows: Vec::new(),
                });
            }
            Block::TableRow => {
                if let Some(table) = &mut self.table {
                    table.rows.push(Vec::new());
                }
            }
            Block::List { .. } => {
                // Back-to-back lists would merge into one.
                if self.list_end == Some(self.out.len()) {
                    self.out.push_str("<!-- -->\n\n");
                }
            }
        }
    }

    fn close(&mut self, block: &Block) {
        match block {
            Block::Paragraph => {
                let content = self.inline.take();
                if !content.trim().is_empty() {
                    self.out.push_str(content.trim());
                    self.out.push_str("\n\n");
                }
            }
            Block::Heading { level, anchor, .. } => {
                let content = self.inline.take();
                self.out.push_str(&"#".repeat(usize::from((*level).clamp(1, 6))));
                self.out.push(' ');
                self.out.push_str(content.trim());
                if self.config.heading_anchors && !anchor.is_empty() {
                    self.out.push_str(" {#");
                    self.out.push_str(anchor);
                    self.out.push('}');
                }
                self.out.push_str("\n\n");
            }
            Block::ListItem => {
                let content = self.inline.take();
                self.out.push_str("- ");
                self.out.push_str(content.trim());
                self.out.push('\n');
            }
            Block::List { .. } => {
                self.out.push('\n');
                self.list_end = Some(self.out.len());
            }
            Block::TableCell => {
                let content = escape_cell(&self.inline.take());
                if let Some(row) = self.table.as_mut().and_then(|t| t.rows.last_mut()) {
                    row.push(content);
                }
            }
            Block::TableRow => {}
            Block::Table { .. } => {
                if let Some(table) = self.table.take() {
                    table.render(&mut self.out);
                }
            }
        }
    }

    fn start_span(&mut self, span: &Span) {
        let (open, _) = Self::markers(span);
        self.inline.open(open);
    }

    fn end_span(&mut self, span: &Span) {
        let (open, close) = Self::markers(span);
        self.inline.close(open, &close);
    }

    fn text(&mut self, text: &str) {
        self.inline.text(text);
    }

    fn image(&mut self, url: &str, alt: &str) {
        let markup = format!("![{}]({})", escape_markdown(alt), escape_url(url));
        self.inline.raw(&markup);
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        let mut markdown = std::mem::take(&mut self.out);
        let len = markdown.trim_end().len();
        markdown.truncate(len);
        markdown.push('\n');
        Ok(markdown.into_bytes())
    }

    fn reset(&mut self) {
        self.out.clear();
        self.inline = Inline::default();
        self.table = None;
        self.list_end = None;
    }
}

/// Markdown format consumer.
pub type MarkdownConsumer = FormatConsumer<MarkdownWriter>;

impl FormatConsumer<MarkdownWriter> {
    pub fn with_config(config: MarkdownConfig) -> Self {
        Self::with_render(MarkdownWriter::new(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::Consumer;
    use crate::ir::Event;

    fn render(events: Vec<Event>) -> String {
        let mut consumer = MarkdownConsumer::new();
        let mut all = vec![Event::StartDocument(Box::new(DocumentInfo {
            title: "Report".into(),
            ..DocumentInfo::default()
        }))];
        all.extend(events);
        all.push(Event::EndDocument);
        for event in &all {
            consumer.handle(event).expect("balanced");
        }
        String::from_utf8(consumer.flush().expect("flush")).expect("utf8")
    }

    fn paragraph(inner: Vec<Event>) -> Vec<Event> {
        let mut events = vec![Event::StartParagraph];
        events.extend(inner);
        events.push(Event::EndParagraph);
        events
    }

    #[test]
    fn test_heading_with_anchor() {
        let md = render(vec![
            Event::StartHeading {
                level: 3,
                anchor: "scope".into(),
                text: "Scope".into(),
            },
            Event::text("Scope"),
            Event::EndHeading { level: 3 },
        ]);
        assert_eq!(md, "# Report\n\n### Scope {#scope}\n");
    }

    #[test]
    fn test_emphasis_hugs_text() {
        let md = render(paragraph(vec![
            Event::text("a "),
            Event::start_formatting(StyleFlags::BOLD),
            Event::text(" bold "),
            Event::end_formatting(StyleFlags::BOLD),
            Event::text("word"),
        ]));
        assert_eq!(md, "# Report\n\na  **bold** word\n");
    }

    #[test]
    fn test_empty_span_is_dropped() {
        let md = render(paragraph(vec![
            Event::start_formatting(StyleFlags::ITALIC),
            Event::text("  "),
            Event::end_formatting(StyleFlags::ITALIC),
            Event::text("x"),
        ]));
        assert_eq!(md, "# Report\n\nx\n");
    }

    #[test]
    fn test_links_and_images() {
        let md = render(paragraph(vec![
            Event::start_link("https://example.com/a b"),
            Event::text("site"),
            Event::end_formatting(StyleFlags::LINK),
            Event::text(" "),
            Event::Image {
                url: "img.png".into(),
                alt: "Figure [1]".into(),
            },
        ]));
        assert_eq!(
            md,
            "# Report\n\n[site](https://example.com/a%20b) ![Figure \\[1\\]](img.png)\n"
        );
    }

    #[test]
    fn test_list_items() {
        let md = render(vec![
            Event::StartList { ordered: false },
            Event::StartListItem,
            Event::text("one"),
            Event::EndListItem,
            Event::StartListItem,
            Event::text("two"),
            Event::EndListItem,
            Event::EndList,
        ]);
        assert_eq!(md, "# Report\n\n- one\n- two\n");
    }

    #[test]
    fn test_blank_line_inside_span_is_one_hard_break() {
        let md = render(paragraph(vec![
            Event::start_formatting(StyleFlags::BOLD),
            Event::text("first\n\nsecond"),
            Event::end_formatting(StyleFlags::BOLD),
        ]));
        assert_eq!(md, "# Report\n\n**first  \nsecond**\n");
    }

    #[test]
    fn test_blank_line_split_across_chunks_inside_span() {
        let md = render(paragraph(vec![
            Event::start_link("https://example.com"),
            Event::text("one\n"),
            Event::text("\ntwo"),
            Event::end_formatting(StyleFlags::LINK),
            Event::text("\n\nafter"),
        ]));
        assert_eq!(
            md,
            "# Report\n\n[one  \ntwo](https://example.com)  \n  \nafter\n"
        );
    }

    #[test]
    fn test_adjacent_lists_are_separated() {
        let list = |text: &str| {
            vec![
                Event::StartList { ordered: false },
                Event::StartListItem,
                Event::text(text),
                Event::EndListItem,
                Event::EndList,
            ]
        };
        let mut events = list("toc entry");
        events.extend(list("bullet"));
        let md = render(events);
        assert_eq!(md, "# Report\n\n- toc entry\n\n<!-- -->\n\n- bullet\n");
    }

    #[test]
    fn test_pipe_table() {
        let cell = |text: &str| vec![Event::StartTableCell, Event::text(text), Event::EndTableCell];
        let mut events = vec![Event::StartTable { rows: 2, columns: 2 }];
        for row in [["Name", "Value"], ["a|b", "1"]] {
            events.push(Event::StartTableRow);
            for text in row {
                events.extend(cell(text));
            }
            events.push(Event::EndTableRow);
        }
        events.push(Event::EndTable);

        assert_eq!(
            render(events),
            "# Report\n\n| Name | Value |\n| --- | --- |\n| a\\|b | 1 |\n"
        );
    }
}
