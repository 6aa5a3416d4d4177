//! HTML consumer.
//!
//! [`Markup`] maps blocks and spans to tags and is shared with the EPUB
//! writer, which uses its XHTML flavour (self-closed void elements).

use std::borrow::Cow;
use std::fmt::Write;

use quick_xml::escape::escape;

use super::consumer::{Block, FormatConsumer, Render, Span};
use super::info_lines;
use crate::error::Result;
use crate::ir::{DocumentInfo, StyleFlags};

/// Configuration for HTML output.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "cli", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "cli", serde(default))]
pub struct HtmlConfig {
    /// Emit only the body content, without `<html>`, `<head>` and title.
    pub fragment: bool,
    /// Optional stylesheet href linked from the head.
    pub stylesheet: Option<String>,
    /// Value of the `lang` attribute.
    pub lang: String,
}

impl Default for HtmlConfig {
    fn default() -> Self {
        Self {
            fragment: false,
            stylesheet: None,
            lang: "en".to_string(),
        }
    }
}

/// Body markup builder.
#[derive(Debug, Default)]
pub(crate) struct Markup {
    out: String,
    xhtml: bool,
    depth: usize,
}

impl Markup {
    pub(crate) fn new(xhtml: bool) -> Self {
        Self {
            out: String::new(),
            xhtml,
            depth: 0,
        }
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.out
    }

    /// Take the markup written so far.
    pub(crate) fn take(&mut self) -> String {
        std::mem::take(&mut self.out)
    }

    pub(crate) fn clear(&mut self) {
        self.out.clear();
        self.depth = 0;
    }

    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
    }

    pub(crate) fn open(&mut self, block: &Block) {
        self.indent();
        let tag = block_tag(block);
        match block {
            Block::Heading { anchor, .. } => {
                let _ = write!(self.out, "<{tag} id=\"{}\">", escape(anchor.as_str()));
            }
            _ => {
                let _ = write!(self.out, "<{tag}>");
            }
        }
        if is_container(block) {
            self.out.push('\n');
            self.depth += 1;
        }
    }

    pub(crate) fn close(&mut self, block: &Block) {
        if is_container(block) {
            self.depth = self.depth.saturating_sub(1);
            self.indent();
        }
        let _ = writeln!(self.out, "</{}>", block_tag(block));
    }

    pub(crate) fn start_span(&mut self, span: &Span) {
        let tag = span_tag(span.style);
        if span.style == StyleFlags::LINK {
            let _ = write!(self.out, "<a href=\"{}\">", escape(span.href()));
        } else {
            let _ = write!(self.out, "<{tag}>");
        }
    }

    pub(crate) fn end_span(&mut self, span: &Span) {
        let _ = write!(self.out, "</{}>", span_tag(span.style));
    }

    /// Escaped text; newlines become line breaks.
    pub(crate) fn text(&mut self, text: &str) {
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                self.out.push_str(self.line_break());
            }
            self.out.push_str(&escape(line));
        }
    }

    pub(crate) fn image(&mut self, url: &str, alt: &str) {
        let close = if self.xhtml { "/>" } else { ">" };
        let _ = write!(
            self.out,
            "<img src=\"{}\" alt=\"{}\"{close}",
            escape(url),
            escape(alt)
        );
    }

    /// A paragraph per metadata line, used on title pages.
    pub(crate) fn info(&mut self, info: &DocumentInfo) {
        if !info.description.trim().is_empty() {
            let _ = writeln!(
                self.out,
                "<p class=\"description\">{}</p>",
                escape(info.description.trim())
            );
        }
        let lines = info_lines(info);
        if !lines.is_empty() {
            let joined: Vec<Cow<'_, str>> = lines.iter().map(|l| escape(l.as_str())).collect();
            let _ = writeln!(
                self.out,
                "<p class=\"meta\">{}</p>",
                joined.join(self.line_break())
            );
        }
    }

    fn line_break(&self) -> &'static str {
        if self.xhtml { "<br/>" } else { "<br>" }
    }
}

/// Blocks that hold other blocks rather than inline content.
fn is_container(block: &Block) -> bool {
    matches!(
        block,
        Block::List { .. } | Block::Table { .. } | Block::TableRow
    )
}

/// Map a block to its tag name.
fn block_tag(block: &Block) -> &'static str {
    match block {
        Block::Paragraph => "p",
        Block::Heading { level, .. } => match level {
            0 | 1 => "h1",
            2 => "h2",
            3 => "h3",
            4 => "h4",
            5 => "h5",
            _ => "h6",
        },
        Block::List { ordered: true } => "ol",
        Block::List { ordered: false } => "ul",
        Block::ListItem => "li",
        Block::Table { .. } => "table",
        Block::TableRow => "tr",
        Block::TableCell => "td",
    }
}

/// Map a single formatting flag to its tag name.
fn span_tag(style: StyleFlags) -> &'static str {
    match style {
        StyleFlags::BOLD => "strong",
        StyleFlags::ITALIC => "em",
        StyleFlags::UNDERLINE => "u",
        StyleFlags::STRIKE => "s",
        StyleFlags::HIGHLIGHT => "mark",
        StyleFlags::SUB => "sub",
        StyleFlags::SUP => "sup",
        StyleFlags::LINK => "a",
        _ => "span",
    }
}

/// Renders an HTML5 document.
#[derive(Debug, Default)]
pub struct HtmlWriter {
    config: HtmlConfig,
    head: String,
    body: Markup,
}

impl HtmlWriter {
    pub fn new(config: HtmlConfig) -> Self {
        Self {
            config,
            head: String::new(),
            body: Markup::new(false),
        }
    }
}

impl Render for HtmlWriter {
    const FORMAT: &'static str = "html";
    const CONTENT_TYPE: &'static str = "text/html";
    const EXTENSION: &'static str = "html";

    fn start_document(&mut self, info: &DocumentInfo) {
        if self.config.fragment {
            return;
        }

        let head = &mut self.head;
        let _ = writeln!(head, "<!DOCTYPE html>");
        let _ = writeln!(head, "<html lang=\"{}\">", escape(self.config.lang.as_str()));
        head.push_str("<head>\n  <meta charset=\"utf-8\">\n");
        let _ = writeln!(head, "  <title>{}</title>", escape(info.title.as_str()));
        if !info.description.trim().is_empty() {
            let _ = writeln!(
                head,
                "  <meta name=\"description\" content=\"{}\">",
                escape(info.description.trim())
            );
        }
        if let Some(href) = &self.config.stylesheet {
            let _ = writeln!(head, "  <link rel=\"stylesheet\" href=\"{}\">", escape(href.as_str()));
        }
        head.push_str("</head>\n<body>\n");
        let _ = writeln!(head, "<h1>{}</h1>", escape(info.title.as_str()));

        let mut meta = Markup::new(false);
        meta.info(info);
        head.push_str(meta.as_str());
    }

    fn open(&mut self, block: &Block) {
        self.body.open(block);
    }

    fn close(&mut self, block: &Block) {
        self.body.close(block);
    }

    fn start_span(&mut self, span: &Span) {
        self.body.start_span(span);
    }

    fn end_span(&mut self, span: &Span) {
        self.body.end_span(span);
    }

    fn text(&mut self, text: &str) {
        self.body.text(text);
    }

    fn image(&mut self, url: &str, alt: &str) {
        self.body.image(url, alt);
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        let mut html = std::mem::take(&mut self.head);
        html.push_str(&self.body.take());
        if !self.config.fragment {
            html.push_str("</body>\n</html>\n");
        }
        Ok(html.into_bytes())
    }

    fn reset(&mut self) {
        self.head.clear();
        self.body.clear();
    }
}

/// HTML format consumer.
pub type HtmlConsumer = FormatConsumer<HtmlWriter>;

impl FormatConsumer<HtmlWriter> {
    pub fn with_config(config: HtmlConfig) -> Self {
        Self::with_render(HtmlWriter::new(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::Consumer;
    use crate::ir::Event;

    fn render(config: HtmlConfig, events: Vec<Event>) -> String {
        let mut consumer = HtmlConsumer::with_config(config);
        let mut all = vec![Event::StartDocument(Box::new(DocumentInfo {
            title: "A & B".into(),
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
    fn test_document_wrapper() {
        let html = render(HtmlConfig::default(), vec![]);
        assert!(html.starts_with("<!DOCTYPE html>\n<html lang=\"en\">"));
        assert!(html.contains("<title>A &amp; B</title>"));
        assert!(html.contains("<h1>A &amp; B</h1>"));
        assert!(html.ends_with("</body>\n</html>\n"));
    }

    #[test]
    fn test_fragment_has_body_only() {
        let config = HtmlConfig {
            fragment: true,
            ..HtmlConfig::default()
        };
        let html = render(
            config,
            vec![Event::StartParagraph, Event::text("x < y"), Event::EndParagraph],
        );
        assert_eq!(html, "<p>x &lt; y</p>\n");
    }

    #[test]
    fn test_heading_list_and_link() {
        let config = HtmlConfig {
            fragment: true,
            ..HtmlConfig::default()
        };
        let html = render(
            config,
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
                Event::start_link("#intro"),
                Event::text("Intro"),
                Event::end_formatting(StyleFlags::LINK),
                Event::EndListItem,
                Event::EndList,
            ],
        );
        assert_eq!(
            html,
            "<h2 id=\"intro\">Intro</h2>\n<ul>\n  <li><a href=\"#intro\">Intro</a></li>\n</ul>\n"
        );
    }

    #[test]
    fn test_overlapping_formatting_is_nested() {
        let config = HtmlConfig {
            fragment: true,
            ..HtmlConfig::default()
        };
        let html = render(
            config,
            vec![
                Event::StartParagraph,
                Event::start_formatting(StyleFlags::BOLD),
                Event::start_formatting(StyleFlags::ITALIC),
                Event::text("a"),
                Event::end_formatting(StyleFlags::BOLD),
                Event::text("b"),
                Event::end_formatting(StyleFlags::ITALIC),
                Event::EndParagraph,
            ],
        );
        assert_eq!(html, "<p><strong><em>a</em></strong><em>b</em></p>\n");
    }

    #[test]
    fn test_text_newlines_and_images() {
        let mut markup = Markup::new(true);
        markup.text("one\ntwo");
        markup.image("a.png", "A \"quoted\" alt");
        assert_eq!(
            markup.as_str(),
            "one<br/>two<img src=\"a.png\" alt=\"A &quot;quoted&quot; alt\"/>"
        );
    }
}
