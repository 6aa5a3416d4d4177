//! Plain text consumer.

use super::consumer::{Block, FormatConsumer, Render, Span};
use super::info_lines;
use crate::error::Result;
use crate::ir::{DocumentInfo, StyleFlags};

/// Configuration for plain text output.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "cli", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "cli", serde(default))]
pub struct TextConfig {
    /// Line width for wrapping (0 = no wrapping).
    pub line_width: usize,
}

/// Greedy word wrap; continuation lines start with `indent`.
fn wrap(text: &str, width: usize, indent: &str) -> String {
    let start = indent.chars().count();
    let mut out = String::with_capacity(text.len());

    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
            out.push_str(indent);
        }
        if width == 0 {
            out.push_str(line);
            continue;
        }

        let mut column = start;
        for word in line.split_whitespace() {
            let len = word.chars().count();
            if column > start {
                if column + 1 + len > width {
                    out.push('\n');
                    out.push_str(indent);
                    column = start;
                } else {
                    out.push(' ');
                    column += 1;
                }
            }
            out.push_str(word);
            column += len;
        }
    }
    out
}

fn underline(text: &str, c: char) -> String {
    let width = text.lines().map(|l| l.chars().count()).max().unwrap_or(0);
    std::iter::repeat_n(c, width).collect()
}

/// Renders plain text.
#[derive(Debug, Default)]
pub struct TextWriter {
    config: TextConfig,
    out: String,
    inline: String,
    row: Vec<String>,
}

impl TextWriter {
    pub fn new(config: TextConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    fn take_inline(&mut self) -> String {
        let text = std::mem::take(&mut self.inline);
        text.trim().to_string()
    }
}

impl Render for TextWriter {
    const FORMAT: &'static str = "text";
    const CONTENT_TYPE: &'static str = "text/plain";
    const EXTENSION: &'static str = "txt";

    fn start_document(&mut self, info: &DocumentInfo) {
        let title = info.title.trim();
        if !title.is_empty() {
            self.out.push_str(title);
            self.out.push('\n');
            self.out.push_str(&underline(title, '='));
            self.out.push_str("\n\n");
        }
        if !info.description.trim().is_empty() {
            self.out
                .push_str(&wrap(info.description.trim(), self.config.line_width, ""));
            self.out.push_str("\n\n");
        }
        let lines = info_lines(info);
        if !lines.is_empty() {
            self.out.push_str(&lines.join("\n"));
            self.out.push_str("\n\n");
        }
    }

    fn open(&mut self, block: &Block) {
        match block {
            Block::Paragraph | Block::Heading { .. } | Block::ListItem | Block::TableCell => {
                self.inline.clear();
            }
            Block::TableRow => self.row.clear(),
            Block::List { .. } | Block::Table { .. } => {}
        }
    }

    fn close(&mut self, block: &Block) {
        let width = self.config.line_width;
        match block {
            Block::Paragraph => {
                let text = self.take_inline();
                if !text.is_empty() {
                    self.out.push_str(&wrap(&text, width, ""));
                    self.out.push_str("\n\n");
                }
            }
            Block::Heading { .. } => {
                let text = self.take_inline().replace('\n', " ");
                self.out.push_str(&text);
                self.out.push('\n');
                self.out.push_str(&underline(&text, '-'));
                self.out.push_str("\n\n");
            }
            Block::ListItem => {
                let text = self.take_inline();
                self.out.push_str("* ");
                self.out.push_str(&wrap(&text, width, "  "));
                self.out.push('\n');
            }
            Block::TableCell => {
                let text = self.take_inline().replace('\n', " ");
                self.row.push(text);
            }
            Block::TableRow => {
                self.out.push_str(&self.row.join("\t"));
                self.out.push('\n');
                self.row.clear();
            }
            Block::List { .. } | Block::Table { .. } => self.out.push('\n'),
        }
    }

    fn start_span(&mut self, _span: &Span) {}

    fn end_span(&mut self, span: &Span) {
        let url = span.href();
        if span.style == StyleFlags::LINK && !url.is_empty() && !url.starts_with('#') {
            self.inline.push_str(" <");
            self.inline.push_str(url);
            self.inline.push('>');
        }
    }

    fn text(&mut self, text: &str) {
        self.inline.push_str(text);
    }

    fn image(&mut self, _url: &str, alt: &str) {
        self.inline.push('[');
        self.inline.push_str(alt);
        self.inline.push(']');
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        let mut text = std::mem::take(&mut self.out);
        let len = text.trim_end().len();
        text.truncate(len);
        text.push('\n');
        Ok(text.into_bytes())
    }

    fn reset(&mut self) {
        self.out.clear();
        self.inline.clear();
        self.row.clear();
    }
}

/// Plain text format consumer.
pub type TextConsumer = FormatConsumer<TextWriter>;

impl FormatConsumer<TextWriter> {
    pub fn with_config(config: TextConfig) -> Self {
        Self::with_render(TextWriter::new(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::Consumer;
    use crate::ir::Event;

    fn render(config: TextConfig, events: Vec<Event>) -> String {
        let mut consumer = TextConsumer::with_config(config);
        let mut all = vec![Event::StartDocument(Box::new(DocumentInfo {
            title: "Notes".into(),
            ..DocumentInfo::default()
        }))];
        all.extend(events);
        all.push(Event::EndDocument);
        for event in &all {
            consumer.handle(event).expect("balanced");
        }
        String::from_utf8(consumer.flush().expect("flush")).expect("utf8")
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("aaa bbb ccc", 7, ""), "aaa bbb\nccc");
        assert_eq!(wrap("aaa bbb ccc", 0, ""), "aaa bbb ccc");
        assert_eq!(wrap("aaa bbb", 5, "  "), "aaa\n  bbb");
    }

    #[test]
    fn test_title_heading_and_list() {
        let text = render(
            TextConfig::default(),
            vec![
                Event::StartHeading {
                    level: 2,
                    anchor: "intro".into(),
                    text: "Intro".into(),
                },
                Event::text("Intro"),
                Event::EndHeading { level: 2 },
                Event::StartList { ordered: false },
                Event::StartListItem,
                Event::text("one"),
                Event::EndListItem,
                Event::EndList,
            ],
        );
        assert_eq!(text, "Notes\n=====\n\nIntro\n-----\n\n* one\n");
    }

    #[test]
    fn test_links_and_images() {
        let text = render(
            TextConfig::default(),
            vec![
                Event::StartParagraph,
                Event::start_link("https://example.com"),
                Event::text("site"),
                Event::end_formatting(StyleFlags::LINK),
                Event::text(" "),
                Event::start_link("#intro"),
                Event::text("intro"),
                Event::end_formatting(StyleFlags::LINK),
                Event::text(" "),
                Event::Image {
                    url: "a.png".into(),
                    alt: "Chart".into(),
                },
                Event::EndParagraph,
            ],
        );
        assert_eq!(text, "Notes\n=====\n\nsite <https://example.com> intro [Chart]\n");
    }

    #[test]
    fn test_table_cells_are_tab_separated() {
        let mut events = vec![Event::StartTable { rows: 1, columns: 2 }, Event::StartTableRow];
        for cell in ["a", "b"] {
            events.extend([Event::StartTableCell, Event::text(cell), Event::EndTableCell]);
        }
        events.extend([Event::EndTableRow, Event::EndTable]);

        let text = render(TextConfig::default(), events);
        assert_eq!(text, "Notes\n=====\n\na\tb\n");
    }
}
