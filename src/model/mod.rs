//! Core data model for academic documents.
//!
//! This module contains:
//! - Document metadata and the chapter tree
//! - Structural elements (paragraphs and tables)
//! - Run-level text styling and inline image references
//!
//! The model is immutable input to the event stream. Absent optional data is
//! always treated as empty; nothing here is validated eagerly.

mod document;
mod paragraph;

pub use document::{Body, Chapter, Document, InlineObject, Metadata, Period};
pub use paragraph::{
    Bullet, Paragraph, ParagraphElement, ParagraphStyle, StructuralElement, Table, TableCell,
    TableRow, TextRun, TextStyle,
};
