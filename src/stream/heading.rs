//! Heading classification shared by the TOC pass and the emitting pass.
//!
//! Both passes must agree on exactly which paragraphs are headings, otherwise
//! the anchor plan drifts out of step with the emitted headings.

use crate::model::{Document, Paragraph};

/// Headings whose text marks where the table of contents goes.
pub const TOC_PLACEHOLDERS: [&str; 4] = ["inhoudsopgave", "table of contents", "contents", "index"];

/// Level of every chapter-derived heading.
pub const CHAPTER_HEADING_LEVEL: u8 = 2;

/// Deepest heading level emitted.
pub const MAX_HEADING_LEVEL: u8 = 6;

/// A paragraph recognised as a heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingSpec {
    pub level: u8,
    /// Trimmed heading text.
    pub text: String,
}

/// Map a named paragraph style to a heading level.
///
/// `HEADING_1` is level 2 and every further tier adds one, capped at 6.
/// `TITLE`, `SUBTITLE` and heading tiers that cannot be parsed are level 2.
/// Returns `None` for styles that are not headings at all.
pub fn heading_level(named_style: &str) -> Option<u8> {
    let normalized = named_style.trim().to_ascii_uppercase().replace([' ', '-'], "_");

    match normalized.as_str() {
        "TITLE" | "SUBTITLE" => return Some(CHAPTER_HEADING_LEVEL),
        _ => {}
    }

    let tier = normalized.strip_prefix("HEADING")?.trim_start_matches('_');
    match tier.parse::<u8>() {
        Ok(n) if n >= 1 => Some(n.saturating_add(1).min(MAX_HEADING_LEVEL)),
        _ => Some(CHAPTER_HEADING_LEVEL),
    }
}

/// Whether heading text names the table of contents.
pub fn is_toc_placeholder(text: &str) -> bool {
    let folded = text.trim().to_lowercase();
    TOC_PLACEHOLDERS.contains(&folded.as_str())
}

/// Decide whether `paragraph` is a heading and with which level and text.
///
/// Chapter-linked paragraphs take their chapter's title at level 2. Headings
/// with no text are not headings.
pub fn classify(doc: &Document, paragraph: &Paragraph) -> Option<HeadingSpec> {
    if let Some(chapter) = paragraph
        .style
        .chapter_id
        .as_deref()
        .and_then(|id| doc.find_chapter(id))
    {
        let title = chapter.title.trim();
        let text = if title.is_empty() {
            paragraph.plain_text().trim().to_string()
        } else {
            title.to_string()
        };
        return (!text.is_empty()).then_some(HeadingSpec {
            level: CHAPTER_HEADING_LEVEL,
            text,
        });
    }

    let level = paragraph.style.named_style.as_deref().and_then(heading_level)?;
    let text = paragraph.plain_text().trim().to_string();
    (!text.is_empty()).then_some(HeadingSpec { level, text })
}

/// Heading level for a chapter at `depth` in a chapter-only body.
pub fn chapter_level(depth: usize) -> u8 {
    let depth = u8::try_from(depth).unwrap_or(u8::MAX);
    CHAPTER_HEADING_LEVEL
        .saturating_add(depth)
        .min(MAX_HEADING_LEVEL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Chapter;

    #[test]
    fn test_heading_level_mapping() {
        assert_eq!(heading_level("HEADING_1"), Some(2));
        assert_eq!(heading_level("HEADING_2"), Some(3));
        assert_eq!(heading_level("heading 4"), Some(5));
        assert_eq!(heading_level("HEADING_5"), Some(6));
        assert_eq!(heading_level("HEADING_6"), Some(6));
        assert_eq!(heading_level("HEADING_9"), Some(6));
    }

    #[test]
    fn test_unknown_heading_tier_is_level_two() {
        assert_eq!(heading_level("TITLE"), Some(2));
        assert_eq!(heading_level("SUBTITLE"), Some(2));
        assert_eq!(heading_level("HEADING_X"), Some(2));
        assert_eq!(heading_level("HEADING_0"), Some(2));
    }

    #[test]
    fn test_non_heading_styles() {
        assert_eq!(heading_level("NORMAL_TEXT"), None);
        assert_eq!(heading_level(""), None);
    }

    #[test]
    fn test_toc_placeholders_are_case_insensitive() {
        assert!(is_toc_placeholder("Table of Contents"));
        assert!(is_toc_placeholder("  INHOUDSOPGAVE "));
        assert!(is_toc_placeholder("Index"));
        assert!(!is_toc_placeholder("Table of Contents 2"));
        assert!(!is_toc_placeholder("Introduction"));
    }

    #[test]
    fn test_classify_chapter_link_uses_chapter_title() {
        let doc = Document::new("Doc").with_chapter(Chapter::new("c1", "Method"));
        let paragraph = Paragraph::text("ignored").with_named_style("HEADING_3");
        let mut linked = paragraph.clone();
        linked.style.chapter_id = Some("c1".into());

        assert_eq!(
            classify(&doc, &linked),
            Some(HeadingSpec {
                level: 2,
                text: "Method".into()
            })
        );
        assert_eq!(classify(&doc, &paragraph).map(|h| h.level), Some(4));
    }

    #[test]
    fn test_classify_unresolved_chapter_falls_back_to_style() {
        let doc = Document::new("Doc");
        let mut paragraph = Paragraph::text("Body text");
        paragraph.style.chapter_id = Some("missing".into());
        assert_eq!(classify(&doc, &paragraph), None);
    }

    #[test]
    fn test_classify_empty_heading_is_not_heading() {
        let doc = Document::new("Doc");
        assert_eq!(classify(&doc, &Paragraph::heading(1, "   ")), None);
    }

    #[test]
    fn test_chapter_level_caps() {
        assert_eq!(chapter_level(0), 2);
        assert_eq!(chapter_level(3), 5);
        assert_eq!(chapter_level(10), 6);
    }
}
