//! Document cleanup run before streaming.
//!
//! Exported word-processor text is full of invisible characters: zero-width
//! joiners, soft hyphens, byte-order marks, vertical tabs standing in for line
//! breaks. [`sanitize`] returns a copy of the document with these removed or
//! mapped to plain equivalents. The input is never modified.

use std::borrow::Cow;

use crate::model::{
    Body, Chapter, Document, InlineObject, Metadata, Paragraph, ParagraphElement, StructuralElement,
    Table,
};

/// Return a cleaned copy of `doc`.
pub fn sanitize(doc: &Document) -> Document {
    let mut clean = doc.clone();
    sanitize_metadata(&mut clean.metadata);
    clean.chapters.iter_mut().for_each(sanitize_chapter);
    if let Body::Rich(elements) = &mut clean.body {
        elements.iter_mut().for_each(sanitize_element);
    }
    clean.inline_objects.values_mut().for_each(sanitize_object);
    clean
}

/// Strip invisible characters from a single string.
///
/// Zero-width characters, soft hyphens and control characters other than
/// newline, carriage return and tab are removed. Non-breaking spaces become
/// plain spaces; vertical tabs and Unicode line separators become newlines.
pub fn clean_text(text: &str) -> Cow<'_, str> {
    if !text.chars().any(needs_cleaning) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{00A0}' | '\u{202F}' | '\u{2007}' => out.push(' '),
            '\u{000B}' | '\u{000C}' | '\u{2028}' | '\u{2029}' => out.push('\n'),
            c if is_invisible(c) => {}
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn needs_cleaning(c: char) -> bool {
    is_invisible(c) || matches!(c, '\u{00A0}' | '\u{202F}' | '\u{2007}' | '\u{2028}' | '\u{2029}')
}

fn is_invisible(c: char) -> bool {
    match c {
        '\n' | '\r' | '\t' => false,
        '\u{00AD}' | '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}' => true,
        c => c.is_control(),
    }
}

fn clean_in_place(text: &mut String) {
    let clean = match clean_text(text) {
        Cow::Borrowed(_) => return,
        Cow::Owned(clean) => clean,
    };
    *text = clean;
}

/// Trim a link target; blank targets become no link.
fn clean_link(link: &mut Option<String>) {
    *link = link
        .take()
        .map(|url| clean_text(&url).trim().to_string())
        .filter(|url| !url.is_empty());
}

fn sanitize_metadata(metadata: &mut Metadata) {
    clean_in_place(&mut metadata.title);
    clean_in_place(&mut metadata.description);
    if let Some(date) = &mut metadata.date {
        clean_in_place(date);
    }
}

fn sanitize_chapter(chapter: &mut Chapter) {
    clean_in_place(&mut chapter.title);
    clean_in_place(&mut chapter.text);
    chapter.children.iter_mut().for_each(sanitize_chapter);
}

fn sanitize_element(element: &mut StructuralElement) {
    match element {
        StructuralElement::Paragraph(paragraph) => sanitize_paragraph(paragraph),
        StructuralElement::Table(table) => sanitize_table(table),
    }
}

fn sanitize_paragraph(paragraph: &mut Paragraph) {
    for element in &mut paragraph.elements {
        if let ParagraphElement::TextRun(run) = element {
            clean_in_place(&mut run.content);
            clean_link(&mut run.style.link);
        }
    }
}

fn sanitize_table(table: &mut Table) {
    for row in &mut table.table_rows {
        for cell in &mut row.cells {
            cell.content.iter_mut().for_each(sanitize_element);
        }
    }
}

fn sanitize_object(object: &mut InlineObject) {
    object.url = object.url.trim().to_string();
    for field in [&mut object.title, &mut object.description] {
        if let Some(text) = field {
            clean_in_place(text);
        }
    }
}
