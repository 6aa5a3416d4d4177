//! Defines the flat event stream representation of a document.

use std::sync::Arc;

use super::StyleFlags;
use crate::model::{Chapter, Document, Period};

/// Represents a single event in the document stream.
///
/// Events are plain values: consumers receive them in emission order and
/// never need to look anything up elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    StartDocument(Box<DocumentInfo>),
    EndDocument,
    StartParagraph,
    EndParagraph,
    StartHeading {
        level: u8,
        anchor: String,
        text: Arc<str>,
    },
    EndHeading {
        level: u8,
    },
    StartList {
        ordered: bool,
    },
    EndList,
    StartListItem,
    EndListItem,
    StartTable {
        rows: usize,
        columns: usize,
    },
    EndTable,
    StartTableRow,
    EndTableRow,
    StartTableCell,
    EndTableCell,
    /// Opens one formatting flag. `link` is set only for [`StyleFlags::LINK`].
    StartFormatting {
        style: StyleFlags,
        link: Option<String>,
    },
    EndFormatting {
        style: StyleFlags,
    },
    Text(String),
    Image {
        url: String,
        alt: String,
    },
}

/// Everything a consumer needs to know about the document up front.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentInfo {
    pub title: String,
    pub description: String,
    pub date: Option<String>,
    pub period: Option<Period>,
    pub page_count: Option<u32>,
    pub progress: Option<u8>,
    pub chapters: Vec<Chapter>,
    pub images: Vec<String>,
}

impl DocumentInfo {
    pub fn from_document(doc: &Document) -> Self {
        let meta = &doc.metadata;
        Self {
            title: meta.title.clone(),
            description: meta.description.clone(),
            date: meta.date.clone(),
            period: meta.period.clone(),
            page_count: meta.page_count,
            progress: meta.progress,
            chapters: doc.chapters.clone(),
            images: doc.image_urls(),
        }
    }
}

impl Event {
    /// Short kind name, used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Event::StartDocument(_) => "StartDocument",
            Event::EndDocument => "EndDocument",
            Event::StartParagraph => "StartParagraph",
            Event::EndParagraph => "EndParagraph",
            Event::StartHeading { .. } => "StartHeading",
            Event::EndHeading { .. } => "EndHeading",
            Event::StartList { .. } => "StartList",
            Event::EndList => "EndList",
            Event::StartListItem => "StartListItem",
            Event::EndListItem => "EndListItem",
            Event::StartTable { .. } => "StartTable",
            Event::EndTable => "EndTable",
            Event::StartTableRow => "StartTableRow",
            Event::EndTableRow => "EndTableRow",
            Event::StartTableCell => "StartTableCell",
            Event::EndTableCell => "EndTableCell",
            Event::StartFormatting { .. } => "StartFormatting",
            Event::EndFormatting { .. } => "EndFormatting",
            Event::Text(_) => "Text",
            Event::Image { .. } => "Image",
        }
    }

    /// Whether this event opens a scope.
    pub fn is_start(&self) -> bool {
        matches!(
            self,
            Event::StartDocument(_)
                | Event::StartParagraph
                | Event::StartHeading { .. }
                | Event::StartList { .. }
                | Event::StartListItem
                | Event::StartTable { .. }
                | Event::StartTableRow
                | Event::StartTableCell
                | Event::StartFormatting { .. }
        )
    }

    /// Whether this event closes a scope.
    pub fn is_end(&self) -> bool {
        matches!(
            self,
            Event::EndDocument
                | Event::EndParagraph
                | Event::EndHeading { .. }
                | Event::EndList
                | Event::EndListItem
                | Event::EndTable
                | Event::EndTableRow
                | Event::EndTableCell
                | Event::EndFormatting { .. }
        )
    }

    /// Name of the end event matching this start event.
    pub fn matching_end(&self) -> Option<&'static str> {
        Some(match self {
            Event::StartDocument(_) => "EndDocument",
            Event::StartParagraph => "EndParagraph",
            Event::StartHeading { .. } => "EndHeading",
            Event::StartList { .. } => "EndList",
            Event::StartListItem => "EndListItem",
            Event::StartTable { .. } => "EndTable",
            Event::StartTableRow => "EndTableRow",
            Event::StartTableCell => "EndTableCell",
            Event::StartFormatting { .. } => "EndFormatting",
            _ => return None,
        })
    }

    pub fn text(content: impl Into<String>) -> Self {
        Event::Text(content.into())
    }

    pub fn start_formatting(style: StyleFlags) -> Self {
        Event::StartFormatting { style, link: None }
    }

    pub fn start_link(url: impl Into<String>) -> Self {
        Event::StartFormatting {
            style: StyleFlags::LINK,
            link: Some(url.into()),
        }
    }

    pub fn end_formatting(style: StyleFlags) -> Self {
        Event::EndFormatting { style }
    }
}
