//! Structural elements: paragraphs, text runs and tables.

/// A block in the document body.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "cli", serde(tag = "type", rename_all = "snake_case"))]
pub enum StructuralElement {
    Paragraph(Paragraph),
    Table(Table),
}

/// A paragraph with optional named style and bullet marker.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "cli", serde(default))]
pub struct Paragraph {
    pub style: ParagraphStyle,
    pub bullet: Option<Bullet>,
    pub elements: Vec<ParagraphElement>,
}

/// Paragraph-level style.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "cli", serde(default))]
pub struct ParagraphStyle {
    /// Named style such as `NORMAL_TEXT`, `TITLE` or `HEADING_2`.
    pub named_style: Option<String>,
    /// Chapter this paragraph is the heading of.
    pub chapter_id: Option<String>,
}

/// List membership marker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "cli", serde(default))]
pub struct Bullet {
    pub list_id: String,
    /// Carried from the source; lists are rendered flat.
    pub nesting_level: u8,
}

/// Inline content of a paragraph.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "cli", serde(tag = "type", rename_all = "snake_case"))]
pub enum ParagraphElement {
    TextRun(TextRun),
    InlineImage { object_id: String },
}

/// A run of text sharing one style.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "cli", serde(default))]
pub struct TextRun {
    pub content: String,
    pub style: TextStyle,
}

/// Independent character styling flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cli", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "cli", serde(default))]
pub struct TextStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub small_caps: bool,
    pub link: Option<String>,
}

/// A table: declared dimensions plus rows of cells.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "cli", serde(default))]
pub struct Table {
    pub columns: usize,
    pub rows: usize,
    pub table_rows: Vec<TableRow>,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "cli", serde(default))]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "cli", serde(default))]
pub struct TableCell {
    pub content: Vec<StructuralElement>,
}

impl Paragraph {
    /// A plain paragraph with a single unstyled run.
    pub fn text(content: impl Into<String>) -> Self {
        Self::default().with_run(TextRun::new(content))
    }

    /// A paragraph styled `HEADING_<tier>`.
    pub fn heading(tier: u8, content: impl Into<String>) -> Self {
        Self::text(content).with_named_style(format!("HEADING_{tier}"))
    }

    /// A bulleted list item.
    pub fn bullet(content: impl Into<String>) -> Self {
        let mut paragraph = Self::text(content);
        paragraph.bullet = Some(Bullet::default());
        paragraph
    }

    /// A paragraph marking the start of a chapter.
    pub fn chapter(chapter_id: impl Into<String>) -> Self {
        let mut paragraph = Self::default();
        paragraph.style.chapter_id = Some(chapter_id.into());
        paragraph
    }

    pub fn with_named_style(mut self, style: impl Into<String>) -> Self {
        self.style.named_style = Some(style.into());
        self
    }

    pub fn with_run(mut self, run: TextRun) -> Self {
        self.elements.push(ParagraphElement::TextRun(run));
        self
    }

    pub fn with_image(mut self, object_id: impl Into<String>) -> Self {
        self.elements.push(ParagraphElement::InlineImage {
            object_id: object_id.into(),
        });
        self
    }

    /// Concatenated text of all runs.
    pub fn plain_text(&self) -> String {
        let mut text = String::new();
        for element in &self.elements {
            if let ParagraphElement::TextRun(run) = element {
                text.push_str(&run.content);
            }
        }
        text
    }

    /// Whether any run carries non-whitespace text.
    pub fn has_text(&self) -> bool {
        self.elements.iter().any(|element| match element {
            ParagraphElement::TextRun(run) => !run.content.trim().is_empty(),
            ParagraphElement::InlineImage { .. } => false,
        })
    }

    /// Image ids referenced by this paragraph, in order.
    pub fn image_ids(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(|element| match element {
            ParagraphElement::InlineImage { object_id } => Some(object_id.as_str()),
            ParagraphElement::TextRun(_) => None,
        })
    }
}

impl From<Paragraph> for StructuralElement {
    fn from(paragraph: Paragraph) -> Self {
        StructuralElement::Paragraph(paragraph)
    }
}

impl From<Table> for StructuralElement {
    fn from(table: Table) -> Self {
        StructuralElement::Table(table)
    }
}

impl TextRun {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            style: TextStyle::default(),
        }
    }

    pub fn bold(mut self) -> Self {
        self.style.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.style.italic = true;
        self
    }

    pub fn underline(mut self) -> Self {
        self.style.underline = true;
        self
    }

    pub fn strikethrough(mut self) -> Self {
        self.style.strikethrough = true;
        self
    }

    pub fn small_caps(mut self) -> Self {
        self.style.small_caps = true;
        self
    }

    pub fn link(mut self, url: impl Into<String>) -> Self {
        self.style.link = Some(url.into());
        self
    }
}

impl Table {
    /// Build a table of plain-text cells; dimensions are derived from the rows.
    pub fn from_rows<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let table_rows: Vec<TableRow> = rows
            .into_iter()
            .map(|cells| TableRow {
                cells: cells
                    .into_iter()
                    .map(|text| TableCell {
                        content: vec![Paragraph::text(text).into()],
                    })
                    .collect(),
            })
            .collect();
        let columns = table_rows.iter().map(|row| row.cells.len()).max().unwrap_or(0);
        Self {
            columns,
            rows: table_rows.len(),
            table_rows,
        }
    }
}
