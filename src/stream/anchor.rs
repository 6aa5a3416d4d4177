//! Slug generation for heading anchors.
//!
//! Anchors are derived from heading text and de-duplicated per streaming
//! session, so identical headings become `base`, `base-1`, `base-2`, ...

use std::collections::{HashMap, HashSet};

/// Slug used when heading text has no letters or numbers at all.
pub const FALLBACK_SLUG: &str = "section";

/// Generate a URL-safe slug from text.
///
/// Lower-cases, turns whitespace into hyphens and drops everything that is
/// not a letter, number or hyphen. Unicode letters and numbers are kept.
///
/// # Examples
///
/// ```
/// use docstream::stream::slugify;
///
/// assert_eq!(slugify("Chapter One"), "chapter-one");
/// assert_eq!(slugify("Hello, World!"), "hello-world");
/// assert_eq!(slugify("Café Résumé"), "café-résumé");
/// ```
pub fn slugify(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .filter_map(|c| {
            if c.is_whitespace() {
                Some('-')
            } else if c.is_alphanumeric() || c == '-' {
                Some(c)
            } else {
                None
            }
        })
        .collect()
}

/// Per-session slug registry.
#[derive(Debug, Clone, Default)]
pub struct SlugCache {
    counts: HashMap<String, usize>,
    issued: HashSet<String>,
}

impl SlugCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a unique anchor for `text`, recording it in the cache.
    ///
    /// The first occurrence of a slug is returned as-is; later occurrences get
    /// `-1`, `-2`, ... appended. A suffixed candidate that collides with an
    /// anchor already issued keeps counting up.
    pub fn with_cache(&mut self, text: &str) -> String {
        let mut base = slugify(text.trim());
        if base.is_empty() {
            base = FALLBACK_SLUG.to_string();
        }

        let mut count = self.counts.get(&base).map_or(0, |c| c + 1);
        loop {
            let candidate = if count == 0 {
                base.clone()
            } else {
                format!("{base}-{count}")
            };
            if self.issued.insert(candidate.clone()) {
                self.counts.insert(base, count);
                return candidate;
            }
            count += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.issued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }

    pub fn clear(&mut self) {
        self.counts.clear();
        self.issued.clear();
    }
}
