//! Document, metadata and chapter tree.

use std::collections::BTreeMap;

use super::paragraph::StructuralElement;

/// An academic document: metadata, chapter tree, body and image table.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "cli", serde(default))]
pub struct Document {
    pub metadata: Metadata,
    pub chapters: Vec<Chapter>,
    pub body: Body,
    /// Inline image id -> resolved object.
    pub inline_objects: BTreeMap<String, InlineObject>,
}

/// Descriptive metadata carried on the document start event.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "cli", serde(default))]
pub struct Metadata {
    pub title: String,
    pub description: String,
    pub date: Option<String>,
    pub period: Option<Period>,
    pub page_count: Option<u32>,
    /// Completion percentage (0-100).
    pub progress: Option<u8>,
}

/// Time span the document covers (e.g. an internship or study period).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "cli", serde(default))]
pub struct Period {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// A node in the chapter tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "cli", serde(default))]
pub struct Chapter {
    pub id: String,
    pub title: String,
    /// Plain text content, only used by chapter-only bodies.
    pub text: String,
    pub children: Vec<Chapter>,
}

/// Document body.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "cli",
    serde(tag = "type", content = "elements", rename_all = "snake_case")
)]
pub enum Body {
    /// Structural elements in document order.
    Rich(Vec<StructuralElement>),
    /// No body of its own; content comes from the chapter tree.
    Chapters,
}

impl Default for Body {
    fn default() -> Self {
        Body::Rich(Vec::new())
    }
}

/// An embedded image resolved to a URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "cli", serde(default))]
pub struct InlineObject {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl Document {
    /// Create an empty document with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            metadata: Metadata::new(title),
            ..Self::default()
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_chapter(mut self, chapter: Chapter) -> Self {
        self.chapters.push(chapter);
        self
    }

    pub fn with_body(mut self, elements: Vec<StructuralElement>) -> Self {
        self.body = Body::Rich(elements);
        self
    }

    /// Use the chapter tree as the body.
    pub fn with_chapter_body(mut self) -> Self {
        self.body = Body::Chapters;
        self
    }

    pub fn with_inline_object(mut self, id: impl Into<String>, object: InlineObject) -> Self {
        self.inline_objects.insert(id.into(), object);
        self
    }

    /// Body elements, empty for chapter-only bodies.
    pub fn elements(&self) -> &[StructuralElement] {
        match &self.body {
            Body::Rich(elements) => elements,
            Body::Chapters => &[],
        }
    }

    /// Find a chapter anywhere in the tree by id (depth-first).
    pub fn find_chapter(&self, id: &str) -> Option<&Chapter> {
        fn find<'a>(chapters: &'a [Chapter], id: &str) -> Option<&'a Chapter> {
            for chapter in chapters {
                if chapter.id == id {
                    return Some(chapter);
                }
                if let Some(found) = find(&chapter.children, id) {
                    return Some(found);
                }
            }
            None
        }
        find(&self.chapters, id)
    }

    /// Resolve an inline image id to a usable object (non-empty URL).
    pub fn inline_object(&self, id: &str) -> Option<&InlineObject> {
        self.inline_objects.get(id).filter(|obj| !obj.url.is_empty())
    }

    /// All resolvable image URLs, ordered by image id.
    pub fn image_urls(&self) -> Vec<String> {
        self.inline_objects
            .values()
            .filter(|obj| !obj.url.is_empty())
            .map(|obj| obj.url.clone())
            .collect()
    }
}

impl Metadata {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_period(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.period = Some(Period {
            start: Some(start.into()),
            end: Some(end.into()),
        });
        self
    }

    pub fn with_pages(mut self, page_count: u32) -> Self {
        self.page_count = Some(page_count);
        self
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress.min(100));
        self
    }
}

impl Chapter {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_child(mut self, child: Chapter) -> Self {
        self.children.push(child);
        self
    }
}

impl InlineObject {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_nested_chapter() {
        let doc = Document::new("Thesis").with_chapter(
            Chapter::new("c1", "Introduction")
                .with_child(Chapter::new("c1.1", "Background").with_child(Chapter::new("c1.1.1", "History"))),
        );

        assert_eq!(doc.find_chapter("c1.1.1").map(|c| c.title.as_str()), Some("History"));
        assert!(doc.find_chapter("missing").is_none());
    }

    #[test]
    fn test_image_urls_skip_empty() {
        let doc = Document::new("Images")
            .with_inline_object("b", InlineObject::new("https://example.com/b.png"))
            .with_inline_object("a", InlineObject::new("https://example.com/a.png"))
            .with_inline_object("c", InlineObject::new(""));

        assert_eq!(
            doc.image_urls(),
            vec!["https://example.com/a.png", "https://example.com/b.png"]
        );
        assert!(doc.inline_object("c").is_none());
    }

    #[test]
    fn test_chapter_body_has_no_elements() {
        let doc = Document::new("Chapters").with_chapter_body();
        assert!(doc.elements().is_empty());
    }
}
