//! Table-of-contents collection (the first pass).
//!
//! The collector walks the body before any event is emitted. For every
//! heading it draws an anchor from the session's [`SlugCache`] and appends it
//! to the anchor plan; the emitting pass takes anchors from that plan in the
//! same order, so TOC links and heading ids always agree.

use std::collections::{HashSet, VecDeque};

use super::anchor::SlugCache;
use super::heading::{self, HeadingSpec};
use crate::model::{Body, Chapter, Document, StructuralElement};

/// One line of the table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub level: u8,
    pub text: String,
    pub anchor: String,
}

/// Result of the collection pass.
#[derive(Debug, Clone, Default)]
pub struct TocPlan {
    /// Entries to list, without placeholders and duplicate texts.
    pub entries: Vec<TocEntry>,
    /// Anchor of every heading in document order, including skipped ones.
    pub anchors: VecDeque<String>,
}

/// Collect the table of contents of `doc`, drawing anchors from `slugs`.
pub fn collect(doc: &Document, slugs: &mut SlugCache) -> TocPlan {
    let mut collector = Collector {
        slugs,
        plan: TocPlan::default(),
        seen: HashSet::new(),
    };

    match &doc.body {
        Body::Rich(elements) => {
            for element in elements {
                if let StructuralElement::Paragraph(paragraph) = element
                    && let Some(spec) = heading::classify(doc, paragraph)
                {
                    collector.record(spec);
                }
            }
        }
        Body::Chapters => collector.chapters(&doc.chapters, 0),
    }

    collector.plan
}

/// Collect the table of contents with a fresh slug cache.
pub fn collect_toc(doc: &Document) -> Vec<TocEntry> {
    collect(doc, &mut SlugCache::new()).entries
}

struct Collector<'c> {
    slugs: &'c mut SlugCache,
    plan: TocPlan,
    seen: HashSet<String>,
}

impl Collector<'_> {
    fn record(&mut self, spec: HeadingSpec) {
        let anchor = self.slugs.with_cache(&spec.text);
        self.plan.anchors.push_back(anchor.clone());

        if heading::is_toc_placeholder(&spec.text) || !self.seen.insert(spec.text.clone()) {
            return;
        }
        self.plan.entries.push(TocEntry {
            level: spec.level,
            text: spec.text,
            anchor,
        });
    }

    fn chapters(&mut self, chapters: &[Chapter], depth: usize) {
        for chapter in chapters {
            let title = chapter.title.trim();
            if !title.is_empty() {
                self.record(HeadingSpec {
                    level: heading::chapter_level(depth),
                    text: title.to_string(),
                });
            }
            self.chapters(&chapter.children, depth + 1);
        }
    }
}
