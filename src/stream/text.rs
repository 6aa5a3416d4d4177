//! Text run normalization and line-boundary chunking.

use log::trace;

/// Normalize run text before it is emitted.
///
/// Carriage returns are removed, runs of three or more newlines collapse to
/// two and trailing newlines are stripped. Leading and trailing spaces are
/// kept: they separate words across run boundaries.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut newlines = 0;

    for c in text.chars() {
        match c {
            '\r' => {}
            '\n' => {
                newlines += 1;
                if newlines <= 2 {
                    out.push('\n');
                }
            }
            _ => {
                newlines = 0;
                out.push(c);
            }
        }
    }

    let len = out.trim_end_matches('\n').len();
    out.truncate(len);
    out
}

/// Lazily splits an owned string into chunks of at most `chunk_size` bytes.
///
/// Chunks end after the last newline that fits. A line longer than the chunk
/// size is cut after its last space or tab, else at a character boundary.
/// Concatenating all chunks yields the original string.
#[derive(Debug, Clone)]
pub struct TextChunks {
    text: String,
    pos: usize,
    chunk_size: usize,
}

impl TextChunks {
    pub fn new(text: String, chunk_size: usize) -> Self {
        Self {
            text,
            pos: 0,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Bytes not yet yielded.
    pub fn remaining(&self) -> usize {
        self.text.len() - self.pos
    }
}

impl Iterator for TextChunks {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.pos >= self.text.len() {
            return None;
        }

        // Fits entirely: hand over the buffer without copying when possible.
        if self.pos == 0 && self.text.len() <= self.chunk_size {
            return Some(std::mem::take(&mut self.text));
        }

        let rest = &self.text[self.pos..];
        let cut = split_point(rest, self.chunk_size);
        let chunk = rest[..cut].to_string();
        self.pos += cut;
        trace!("text chunk of {} bytes, {} remaining", cut, self.remaining());
        Some(chunk)
    }
}

/// Byte length of the next chunk of `rest`; always > 0 for non-empty input.
fn split_point(rest: &str, chunk_size: usize) -> usize {
    if rest.len() <= chunk_size {
        return rest.len();
    }

    let limit = floor_char_boundary(rest, chunk_size);
    let window = &rest.as_bytes()[..limit];

    if let Some(i) = memchr::memrchr(b'\n', window) {
        return i + 1;
    }
    if let Some(i) = memchr::memrchr2(b' ', b'\t', window) {
        return i + 1;
    }
    if limit > 0 {
        return limit;
    }

    // A single character wider than the chunk size.
    rest.char_indices()
        .nth(1)
        .map_or(rest.len(), |(i, _)| i)
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}
