//! LaTeX consumer.

use std::fmt::Write;

use super::consumer::{Block, FormatConsumer, Render, Span};
use super::info_lines;
use crate::error::Result;
use crate::ir::{DocumentInfo, StyleFlags};
use crate::util::truncate_to_date;

/// Configuration for LaTeX output.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "cli", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "cli", serde(default))]
pub struct LatexConfig {
    pub document_class: String,
    /// Use `\includegraphics` for images instead of a hyperlink.
    pub embed_images: bool,
}

impl Default for LatexConfig {
    fn default() -> Self {
        Self {
            document_class: "article".to_string(),
            embed_images: false,
        }
    }
}

/// Escape LaTeX special characters.
///
/// ```
/// use docstream::export::escape_latex;
///
/// assert_eq!(escape_latex("50% of $x_1$"), "50\\% of \\$x\\_1\\$");
/// ```
pub fn escape_latex(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 8);
    for c in text.chars() {
        match c {
            '\\' => result.push_str("\\textbackslash{}"),
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                result.push('\\');
                result.push(c);
            }
            '~' => result.push_str("\\textasciitilde{}"),
            '<' => result.push_str("\\textless{}"),
            '>' => result.push_str("\\textgreater{}"),
            '|' => result.push_str("\\textbar{}"),
            '^' => result.push_str("\\textasciicircum{}"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape a URL for `\href` and `\includegraphics`.
fn escape_url(url: &str) -> String {
    let mut result = String::with_capacity(url.len());
    for c in url.chars() {
        match c {
            '%' | '#' | '{' | '}' => {
                result.push('\\');
                result.push(c);
            }
            '\\' => result.push('/'),
            _ => result.push(c),
        }
    }
    result
}

/// Sectioning command for a heading level.
fn section_command(level: u8) -> &'static str {
    match level {
        0..=2 => "section",
        3 => "subsection",
        4 => "subsubsection",
        5 => "paragraph",
        _ => "subparagraph",
    }
}

fn span_command(span: &Span) -> String {
    match span.style {
        StyleFlags::BOLD => "\\textbf{".to_string(),
        StyleFlags::ITALIC => "\\textit{".to_string(),
        StyleFlags::UNDERLINE => "\\uline{".to_string(),
        StyleFlags::STRIKE => "\\sout{".to_string(),
        StyleFlags::HIGHLIGHT => "\\hl{".to_string(),
        StyleFlags::SUB => "\\textsubscript{".to_string(),
        StyleFlags::SUP => "\\textsuperscript{".to_string(),
        StyleFlags::LINK => match span.href().strip_prefix('#') {
            Some(label) => format!("\\hyperref[{label}]{{"),
            None => format!("\\href{{{}}}{{", escape_url(span.href())),
        },
        _ => "{".to_string(),
    }
}

/// Renders a standalone LaTeX document.
#[derive(Debug, Default)]
pub struct LatexWriter {
    config: LatexConfig,
    out: String,
    /// Inside a heading or table cell, where blank lines are not allowed.
    single_line: bool,
    cell_index: usize,
    /// Formatting groups currently open.
    span_depth: usize,
}

impl LatexWriter {
    pub fn new(config: LatexConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }
}

impl LatexWriter {
    /// A blank line inside `\textbf{..}` and friends ends the paragraph
    /// before the group closes, so a second newline becomes `\newline`.
    fn group_newline(&mut self) {
        let Some(before) = self.out.strip_suffix('\n') else {
            self.out.push('\n');
            return;
        };
        // Nothing to break yet: `\newline` there is an error.
        if before.ends_with('{') || before.ends_with("\\newline") {
            return;
        }
        self.out.pop();
        self.out.push_str("\\newline\n");
    }
}

impl Render for LatexWriter {
    const FORMAT: &'static str = "latex";
    const CONTENT_TYPE: &'static str = "application/x-latex";
    const EXTENSION: &'static str = "tex";

    fn start_document(&mut self, info: &DocumentInfo) {
        let class = if self.config.document_class.trim().is_empty() {
            "article"
        } else {
            self.config.document_class.trim()
        };
        let out = &mut self.out;
        let _ = writeln!(out, "\\documentclass{{{class}}}");
        out.push_str("\\usepackage[T1]{fontenc}\n");
        out.push_str("\\usepackage[utf8]{inputenc}\n");
        out.push_str("\\usepackage[normalem]{ulem}\n");
        out.push_str("\\usepackage{soul}\n");
        out.push_str("\\usepackage{graphicx}\n");
        out.push_str("\\usepackage{hyperref}\n\n");

        let _ = writeln!(out, "\\title{{{}}}", escape_latex(info.title.trim()));
        match info.date.as_deref() {
            Some(date) => {
                let _ = writeln!(out, "\\date{{{}}}", escape_latex(&truncate_to_date(date)));
            }
            None => out.push_str("\\date{}\n"),
        }
        out.push_str("\n\\begin{document}\n\\maketitle\n\n");

        if !info.description.trim().is_empty() {
            let _ = writeln!(
                out,
                "\\begin{{abstract}}\n{}\n\\end{{abstract}}\n",
                escape_latex(info.description.trim())
            );
        }
        let lines = info_lines(info);
        if !lines.is_empty() {
            out.push_str("\\noindent ");
            let escaped: Vec<String> = lines.iter().map(|l| escape_latex(l)).collect();
            out.push_str(&escaped.join("\\\\\n"));
            out.push_str("\n\n");
        }
    }

    fn end_document(&mut self) {
        self.out.push_str("\\end{document}\n");
    }

    fn open(&mut self, block: &Block) {
        match block {
            Block::Paragraph => {}
            Block::Heading { level, .. } => {
                let _ = write!(self.out, "\\{}{{", section_command(*level));
                self.single_line = true;
            }
            Block::List { ordered } => {
                let env = if *ordered { "enumerate" } else { "itemize" };
                let _ = writeln!(self.out, "\\begin{{{env}}}");
            }
            Block::ListItem => self.out.push_str("  \\item "),
            Block::Table { columns, .. } => {
                let spec = "l|".repeat((*columns).max(1));
                let _ = writeln!(self.out, "\\begin{{tabular}}{{|{spec}}}\n\\hline");
            }
            Block::TableRow => self.cell_index = 0,
            Block::TableCell => {
                if self.cell_index > 0 {
                    self.out.push_str(" & ");
                }
                self.cell_index += 1;
                self.single_line = true;
            }
        }
    }

    fn close(&mut self, block: &Block) {
        match block {
            Block::Paragraph => self.out.push_str("\n\n"),
            Block::Heading { anchor, .. } => {
                let _ = writeln!(self.out, "}}\\label{{{anchor}}}\n");
                self.single_line = false;
            }
            Block::List { ordered } => {
                let env = if *ordered { "enumerate" } else { "itemize" };
                let _ = writeln!(self.out, "\\end{{{env}}}\n");
            }
            Block::ListItem => self.out.push('\n'),
            Block::Table { .. } => self.out.push_str("\\end{tabular}\n\n"),
            Block::TableRow => self.out.push_str(" \\\\\n\\hline\n"),
            Block::TableCell => self.single_line = false,
        }
    }

    fn start_span(&mut self, span: &Span) {
        self.out.push_str(&span_command(span));
        self.span_depth += 1;
    }

    fn end_span(&mut self, _span: &Span) {
        self.out.push('}');
        self.span_depth = self.span_depth.saturating_sub(1);
    }

    fn text(&mut self, text: &str) {
        let escaped = escape_latex(text);
        if self.single_line {
            self.out.push_str(&escaped.replace('\n', " "));
        } else if self.span_depth == 0 {
            self.out.push_str(&escaped);
        } else {
            for c in escaped.chars() {
                if c == '\n' {
                    self.group_newline();
                } else {
                    self.out.push(c);
                }
            }
        }
    }

    fn image(&mut self, url: &str, alt: &str) {
        if self.config.embed_images {
            let _ = write!(
                self.out,
                "\\includegraphics[width=\\linewidth]{{{}}}",
                escape_url(url)
            );
        } else {
            let _ = write!(
                self.out,
                "\\href{{{}}}{{{}}}",
                escape_url(url),
                escape_latex(alt)
            );
        }
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        Ok(std::mem::take(&mut self.out).into_bytes())
    }

    fn reset(&mut self) {
        self.out.clear();
        self.single_line = false;
        self.cell_index = 0;
        self.span_depth = 0;
    }
}

/// LaTeX format consumer.
pub type LatexConsumer = FormatConsumer<LatexWriter>;

impl FormatConsumer<LatexWriter> {
    pub fn with_config(config: LatexConfig) -> Self {
        Self::with_render(LatexWriter::new(config))
    }
}
