//! EPUB consumer.
//!
//! Builds an EPUB 3 container (with an EPUB 2 NCX for older readers) from the
//! event stream. The body is split into one XHTML file per chapter: every
//! heading of level 2 or above starts a new file. Links to headings that end
//! up in another file are rewritten once all anchors are known.

use std::collections::HashMap;
use std::io::{Cursor, Write};

use log::debug;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::consumer::{Block, FormatConsumer, Render, Span};
use super::html::Markup;
use crate::error::Result;
use crate::ir::DocumentInfo;
use crate::util::truncate_to_date;

/// Headings at or above this level start a new chapter file.
const SPLIT_LEVEL: u8 = 2;

/// Configuration for EPUB export.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "cli", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "cli", serde(default))]
pub struct EpubConfig {
    /// Compression level for deflate (0-9, default 6).
    pub compression_level: Option<i64>,
    /// Value of `dc:language`.
    pub language: String,
}

impl Default for EpubConfig {
    fn default() -> Self {
        Self {
            compression_level: None,
            language: "en".to_string(),
        }
    }
}

/// One chapter file.
#[derive(Debug, Default)]
struct ChapterFile {
    title: String,
    body: String,
    anchors: Vec<String>,
    remote_images: bool,
}

/// A heading seen in the stream, for the navigation documents.
#[derive(Debug, Clone)]
struct NavEntry {
    level: u8,
    title: String,
    href: String,
}

/// Navigation tree node.
#[derive(Debug)]
struct NavPoint {
    title: String,
    href: String,
    children: Vec<NavPoint>,
}

/// Nest a flat heading list by level.
fn nest(entries: &[NavEntry]) -> Vec<NavPoint> {
    fn build(entries: &[NavEntry], index: &mut usize, level: u8) -> Vec<NavPoint> {
        let mut points = Vec::new();
        while let Some(entry) = entries.get(*index) {
            if entry.level < level {
                break;
            }
            *index += 1;
            let children = build(entries, index, entry.level + 1);
            points.push(NavPoint {
                title: entry.title.clone(),
                href: entry.href.clone(),
                children,
            });
        }
        points
    }

    let mut index = 0;
    let mut roots = Vec::new();
    while index < entries.len() {
        let level = entries[index].level;
        roots.extend(build(entries, &mut index, level));
    }
    roots
}

/// Renders an EPUB archive.
#[derive(Debug)]
pub struct EpubWriter {
    config: EpubConfig,
    info: DocumentInfo,
    chapters: Vec<ChapterFile>,
    current: ChapterFile,
    markup: Markup,
    nav: Vec<NavEntry>,
}

impl EpubWriter {
    pub fn new(config: EpubConfig) -> Self {
        Self {
            config,
            info: DocumentInfo::default(),
            chapters: Vec::new(),
            current: ChapterFile::default(),
            markup: Markup::new(true),
            nav: Vec::new(),
        }
    }

    /// Close the current chapter file if it has content.
    fn finish_chapter(&mut self) {
        self.current.body.push_str(&self.markup.take());
        if self.current.body.trim().is_empty() {
            return;
        }
        self.chapters.push(std::mem::take(&mut self.current));
    }

    fn file_name(index: usize) -> String {
        format!("chapter_{}.xhtml", index + 1)
    }

    fn identifier(&self) -> String {
        let seed = format!(
            "{}\u{1F}{}",
            self.info.title,
            self.info.date.as_deref().unwrap_or_default()
        );
        format!("urn:sha1:{}", sha1_smol::Sha1::from(seed).hexdigest())
    }

    /// Rewrite `#anchor` links that point into another chapter file.
    fn link_chapters(&mut self) {
        let mut owner: HashMap<String, usize> = HashMap::new();
        for (index, chapter) in self.chapters.iter().enumerate() {
            for anchor in &chapter.anchors {
                owner.entry(anchor.clone()).or_insert(index);
            }
        }

        for (index, chapter) in self.chapters.iter_mut().enumerate() {
            for (anchor, &target) in &owner {
                if target == index {
                    continue;
                }
                let local = format!("href=\"#{anchor}\"");
                if chapter.body.contains(&local) {
                    let remote = format!("href=\"{}#{anchor}\"", Self::file_name(target));
                    chapter.body = chapter.body.replace(&local, &remote);
                }
            }
        }
    }

    fn write_archive(&self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(self.config.compression_level.unwrap_or(6)));

        // mimetype must be first and uncompressed
        zip.start_file("mimetype", stored)?;
        zip.write_all(b"application/epub+zip")?;

        zip.start_file("META-INF/container.xml", deflated)?;
        zip.write_all(CONTAINER_XML)?;

        let mut manifest = vec![
            ManifestItem::new("nav", "nav.xhtml", "application/xhtml+xml").with_properties("nav"),
            ManifestItem::new("css", "styles.css", "text/css"),
            ManifestItem::new("title", "title.xhtml", "application/xhtml+xml"),
        ];
        let mut spine = vec!["title".to_string()];
        for (i, chapter) in self.chapters.iter().enumerate() {
            let id = format!("chapter_{}", i + 1);
            let mut item = ManifestItem::new(&id, &Self::file_name(i), "application/xhtml+xml");
            if chapter.remote_images {
                item = item.with_properties("remote-resources");
            }
            manifest.push(item);
            spine.push(id);
        }

        let identifier = self.identifier();
        let opf = generate_opf(&self.info, &self.config.language, &identifier, &manifest, &spine);
        zip.start_file("OEBPS/content.opf", deflated)?;
        zip.write_all(opf.as_bytes())?;

        let points = nest(&self.nav);
        let ncx = generate_ncx(&self.info.title, &identifier, &points);
        zip.start_file("OEBPS/toc.ncx", deflated)?;
        zip.write_all(ncx.as_bytes())?;

        let nav = generate_nav(&self.config.language, &points);
        zip.start_file("OEBPS/nav.xhtml", deflated)?;
        zip.write_all(nav.as_bytes())?;

        zip.start_file("OEBPS/styles.css", deflated)?;
        zip.write_all(STYLES_CSS)?;

        let mut title_page = Markup::new(true);
        title_page.info(&self.info);
        let title_body = format!(
            "<h1 class=\"title\">{}</h1>\n{}",
            quick_xml::escape::escape(self.info.title.as_str()),
            title_page.as_str()
        );
        let title_xhtml = xhtml_document(&self.config.language, &self.info.title, &title_body);
        zip.start_file("OEBPS/title.xhtml", deflated)?;
        zip.write_all(title_xhtml.as_bytes())?;

        for (i, chapter) in self.chapters.iter().enumerate() {
            let title = if chapter.title.is_empty() {
                &self.info.title
            } else {
                &chapter.title
            };
            let xhtml = xhtml_document(&self.config.language, title, &chapter.body);
            zip.start_file(format!("OEBPS/{}", Self::file_name(i)), deflated)?;
            zip.write_all(xhtml.as_bytes())?;
        }

        let cursor = zip.finish()?;
        debug!(
            "epub: {} chapters, {} nav entries",
            self.chapters.len(),
            self.nav.len()
        );
        Ok(cursor.into_inner())
    }
}

impl Default for EpubWriter {
    fn default() -> Self {
        Self::new(EpubConfig::default())
    }
}

impl Render for EpubWriter {
    const FORMAT: &'static str = "epub";
    const CONTENT_TYPE: &'static str = "application/epub+zip";
    const EXTENSION: &'static str = "epub";
    const IS_TEXT: bool = false;

    fn start_document(&mut self, info: &DocumentInfo) {
        self.info = info.clone();
    }

    fn end_document(&mut self) {
        self.finish_chapter();
    }

    fn open(&mut self, block: &Block) {
        if let Block::Heading {
            level,
            anchor,
            text,
        } = block
        {
            if *level <= SPLIT_LEVEL {
                self.finish_chapter();
                self.current.title = text.trim().to_string();
            }
            self.current.anchors.push(anchor.clone());
            self.nav.push(NavEntry {
                level: *level,
                title: text.trim().to_string(),
                href: format!("{}#{anchor}", Self::file_name(self.chapters.len())),
            });
        }
        self.markup.open(block);
    }

    fn close(&mut self, block: &Block) {
        self.markup.close(block);
    }

    fn start_span(&mut self, span: &Span) {
        self.markup.start_span(span);
    }

    fn end_span(&mut self, span: &Span) {
        self.markup.end_span(span);
    }

    fn text(&mut self, text: &str) {
        self.markup.text(text);
    }

    fn image(&mut self, url: &str, alt: &str) {
        if url.starts_with("http://") || url.starts_with("https://") {
            self.current.remote_images = true;
        }
        self.markup.image(url, alt);
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        self.link_chapters();
        self.write_archive()
    }

    fn reset(&mut self) {
        self.info = DocumentInfo::default();
        self.chapters.clear();
        self.current = ChapterFile::default();
        self.markup.clear();
        self.nav.clear();
    }
}

/// EPUB format consumer.
pub type EpubConsumer = FormatConsumer<EpubWriter>;

impl FormatConsumer<EpubWriter> {
    pub fn with_config(config: EpubConfig) -> Self {
        Self::with_render(EpubWriter::new(config))
    }
}

/// Container.xml template.
const CONTAINER_XML: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

const STYLES_CSS: &[u8] = b"body { font-family: serif; line-height: 1.4; }
h1.title { text-align: center; }
p.description { font-style: italic; }
p.meta { font-size: 0.9em; }
table { border-collapse: collapse; }
td { border: 1px solid #999; padding: 0.2em 0.4em; }
img { max-width: 100%; }
";

struct ManifestItem {
    id: String,
    href: String,
    media_type: String,
    properties: Option<&'static str>,
}

impl ManifestItem {
    fn new(id: &str, href: &str, media_type: &str) -> Self {
        Self {
            id: id.to_string(),
            href: href.to_string(),
            media_type: media_type.to_string(),
            properties: None,
        }
    }

    fn with_properties(mut self, properties: &'static str) -> Self {
        self.properties = Some(properties);
        self
    }
}

/// Escape XML special characters.
fn escape_xml(s: &str) -> String {
    quick_xml::escape::escape(s).into_owned()
}

/// Wrap body markup in an XHTML document.
fn xhtml_document(language: &str, title: &str, body: &str) -> String {
    let language = escape_xml(language);
    let mut doc = String::new();
    doc.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE html>\n");
    doc.push_str(&format!(
        "<html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:epub=\"http://www.idpf.org/2007/ops\" xml:lang=\"{language}\" lang=\"{language}\">\n"
    ));
    doc.push_str("<head>\n  <meta charset=\"utf-8\"/>\n");
    doc.push_str(&format!("  <title>{}</title>\n", escape_xml(title)));
    doc.push_str("  <link rel=\"stylesheet\" type=\"text/css\" href=\"styles.css\"/>\n");
    doc.push_str("</head>\n<body>\n");
    doc.push_str(body);
    doc.push_str("</body>\n</html>\n");
    doc
}

/// Generate content.opf from metadata and manifest.
fn generate_opf(
    info: &DocumentInfo,
    language: &str,
    identifier: &str,
    manifest: &[ManifestItem],
    spine_refs: &[String],
) -> String {
    let mut opf = String::new();

    opf.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
"#,
    );

    opf.push_str(&format!(
        "    <dc:title>{}</dc:title>\n",
        escape_xml(&info.title)
    ));
    opf.push_str(&format!(
        "    <dc:identifier id=\"BookId\">{}</dc:identifier>\n",
        escape_xml(identifier)
    ));
    opf.push_str(&format!(
        "    <dc:language>{}</dc:language>\n",
        escape_xml(language)
    ));

    // dcterms:modified is required and must be a full timestamp
    let date = info
        .date
        .as_deref()
        .map(truncate_to_date)
        .filter(|d| !d.is_empty());
    let modified = date.as_deref().unwrap_or("1970-01-01");
    opf.push_str(&format!(
        "    <meta property=\"dcterms:modified\">{}T00:00:00Z</meta>\n",
        escape_xml(modified)
    ));
    if let Some(date) = &date {
        opf.push_str(&format!("    <dc:date>{}</dc:date>\n", escape_xml(date)));
    }
    if !info.description.trim().is_empty() {
        opf.push_str(&format!(
            "    <dc:description>{}</dc:description>\n",
            escape_xml(info.description.trim())
        ));
    }
    if let Some(period) = &info.period {
        let coverage = match (period.start.as_deref(), period.end.as_deref()) {
            (Some(start), Some(end)) => Some(format!("{start}/{end}")),
            (Some(only), None) | (None, Some(only)) => Some(only.to_string()),
            (None, None) => None,
        };
        if let Some(coverage) = coverage {
            opf.push_str(&format!(
                "    <dc:coverage>{}</dc:coverage>\n",
                escape_xml(&coverage)
            ));
        }
    }

    opf.push_str("  </metadata>\n");

    opf.push_str("  <manifest>\n");
    opf.push_str(
        "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
    );
    for item in manifest {
        let properties = item
            .properties
            .map(|p| format!(" properties=\"{p}\""))
            .unwrap_or_default();
        opf.push_str(&format!(
            "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"{properties}/>\n",
            escape_xml(&item.id),
            escape_xml(&item.href),
            escape_xml(&item.media_type)
        ));
    }
    opf.push_str("  </manifest>\n");

    opf.push_str("  <spine toc=\"ncx\">\n");
    for id in spine_refs {
        opf.push_str(&format!("    <itemref idref=\"{}\"/>\n", escape_xml(id)));
    }
    opf.push_str("  </spine>\n");

    opf.push_str("</package>\n");
    opf
}

fn nav_depth(points: &[NavPoint]) -> usize {
    points
        .iter()
        .map(|p| 1 + nav_depth(&p.children))
        .max()
        .unwrap_or(0)
}

/// Generate toc.ncx from the navigation tree.
fn generate_ncx(title: &str, identifier: &str, points: &[NavPoint]) -> String {
    let mut ncx = String::new();

    ncx.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE ncx PUBLIC "-//NISO//DTD ncx 2005-1//EN" "http://www.daisy.org/z3986/2005/ncx-2005-1.dtd">
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content=""#,
    );
    ncx.push_str(&escape_xml(identifier));
    ncx.push_str(&format!(
        "\"/>\n    <meta name=\"dtb:depth\" content=\"{}\"/>\n",
        nav_depth(points).max(1)
    ));
    ncx.push_str(
        r#"    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle>
    <text>"#,
    );
    ncx.push_str(&escape_xml(title));
    ncx.push_str(
        r#"</text>
  </docTitle>
  <navMap>
"#,
    );

    let mut play_order = 1;
    write_nav_points(&mut ncx, points, &mut play_order, 2);

    ncx.push_str("  </navMap>\n</ncx>\n");
    ncx
}

/// Recursively write navPoint elements.
fn write_nav_points(ncx: &mut String, points: &[NavPoint], play_order: &mut usize, indent: usize) {
    let indent_str = "  ".repeat(indent);

    for point in points {
        ncx.push_str(&format!(
            "{indent_str}<navPoint id=\"navPoint-{play_order}\" playOrder=\"{play_order}\">\n"
        ));
        ncx.push_str(&format!(
            "{indent_str}  <navLabel><text>{}</text></navLabel>\n",
            escape_xml(&point.title)
        ));
        ncx.push_str(&format!(
            "{indent_str}  <content src=\"{}\"/>\n",
            escape_xml(&point.href)
        ));

        *play_order += 1;

        if !point.children.is_empty() {
            write_nav_points(ncx, &point.children, play_order, indent + 1);
        }

        ncx.push_str(&format!("{indent_str}</navPoint>\n"));
    }
}

/// Generate the EPUB 3 navigation document.
fn generate_nav(language: &str, points: &[NavPoint]) -> String {
    fn write_list(out: &mut String, points: &[NavPoint], indent: usize) {
        let pad = "  ".repeat(indent);
        out.push_str(&format!("{pad}<ol>\n"));
        for point in points {
            out.push_str(&format!(
                "{pad}  <li><a href=\"{}\">{}</a>",
                escape_xml(&point.href),
                escape_xml(&point.title)
            ));
            if !point.children.is_empty() {
                out.push('\n');
                write_list(out, &point.children, indent + 2);
                out.push_str(&format!("{pad}  "));
            }
            out.push_str("</li>\n");
        }
        out.push_str(&format!("{pad}</ol>\n"));
    }

    let mut body = String::from("<nav epub:type=\"toc\" id=\"toc\">\n  <h1>Contents</h1>\n");
    if points.is_empty() {
        body.push_str("  <ol>\n    <li><a href=\"title.xhtml\">Title</a></li>\n  </ol>\n");
    } else {
        write_list(&mut body, points, 1);
    }
    body.push_str("</nav>\n");
    xhtml_document(language, "Contents", &body)
}
