//! Pure markdown escaping utilities.
//!
//! These functions escape text, link targets and table cells so that content
//! never turns into unintended markup.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

/// Bytes that would end or split a `(...)` link target.
const LINK_TARGET: &AsciiSet = &CONTROLS.add(b' ').add(b'(').add(b')').add(b'<').add(b'>');

/// Escape special Markdown characters in text.
///
/// Escapes characters that have special meaning in Markdown:
/// - Backslash: `\\`
/// - Emphasis: `*`, `_`
/// - Links: `[`, `]`
/// - Code: `` ` ``
/// - Headings: `#` (only at line start)
/// - List markers: `-`, `+`, and the `.` or `)` after digits (only at line start)
/// - Tables: `|`
/// - HTML: `<`, `>`
/// - Images: `!` (when followed by `[`)
/// - Strikethrough, subscript and superscript: `~`, `^`
/// - Highlight: `=` (when doubled)
///
/// # Examples
///
/// ```
/// use docstream::markdown::escape_markdown;
///
/// assert_eq!(escape_markdown("*bold*"), "\\*bold\\*");
/// assert_eq!(escape_markdown("[link]"), "\\[link\\]");
/// ```
pub fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 10);
    let mut chars = text.chars().peekable();
    let mut at_line_start = true;

    while let Some(c) = chars.next() {
        match c {
            '\\' => result.push_str("\\\\"),
            '*' | '_' | '[' | ']' | '`' | '|' | '<' | '>' | '~' | '^' => {
                result.push('\\');
                result.push(c);
            }
            '#' | '-' | '+' if at_line_start => {
                result.push('\\');
                result.push(c);
            }
            '0'..='9' if at_line_start => {
                result.push(c);
                while let Some(&digit) = chars.peek().filter(|d| d.is_ascii_digit()) {
                    result.push(digit);
                    chars.next();
                }
                if let Some(&marker) = chars.peek().filter(|&&m| m == '.' || m == ')') {
                    result.push('\\');
                    result.push(marker);
                    chars.next();
                }
                at_line_start = false;
                continue;
            }
            '!' if chars.peek() == Some(&'[') => {
                result.push('\\');
                result.push(c);
            }
            '=' if chars.peek() == Some(&'=') => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
        at_line_start = c == '\n';
    }

    result
}

/// Escape a link or image target for use inside `(...)`.
///
/// Spaces and parentheses are percent-encoded so the target stays one token.
///
/// ```
/// use docstream::markdown::escape_url;
///
/// assert_eq!(escape_url("a b(1).png"), "a%20b%281%29.png");
/// ```
pub fn escape_url(url: &str) -> String {
    utf8_percent_encode(url, LINK_TARGET).to_string()
}

/// Make already-escaped inline markdown safe inside a pipe table cell.
///
/// Cells cannot span lines, so newlines become `<br>`.
pub fn escape_cell(content: &str) -> String {
    content.trim().replace('\n', "<br>")
}
