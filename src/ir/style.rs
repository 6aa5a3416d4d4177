//! Character style bitset.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use crate::model::TextStyle;

/// A set of formatting flags packed into one byte.
///
/// The bit order is the canonical precedence order: scopes open from the
/// lowest bit up and close from the highest bit down.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StyleFlags(pub u8);

impl StyleFlags {
    pub const NONE: StyleFlags = StyleFlags(0);
    pub const BOLD: StyleFlags = StyleFlags(1 << 0);
    pub const ITALIC: StyleFlags = StyleFlags(1 << 1);
    pub const UNDERLINE: StyleFlags = StyleFlags(1 << 2);
    pub const STRIKE: StyleFlags = StyleFlags(1 << 3);
    pub const HIGHLIGHT: StyleFlags = StyleFlags(1 << 4);
    pub const SUB: StyleFlags = StyleFlags(1 << 5);
    pub const SUP: StyleFlags = StyleFlags(1 << 6);
    pub const LINK: StyleFlags = StyleFlags(1 << 7);

    /// Single flags in opening order.
    pub const CANONICAL: [StyleFlags; 8] = [
        StyleFlags::BOLD,
        StyleFlags::ITALIC,
        StyleFlags::UNDERLINE,
        StyleFlags::STRIKE,
        StyleFlags::HIGHLIGHT,
        StyleFlags::SUB,
        StyleFlags::SUP,
        StyleFlags::LINK,
    ];

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: StyleFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: StyleFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: StyleFlags) {
        self.0 &= !other.0;
    }

    /// Flags in `self` that are not in `other`.
    pub fn difference(self, other: StyleFlags) -> StyleFlags {
        StyleFlags(self.0 & !other.0)
    }

    /// Single flags of this set in opening (forward canonical) order.
    pub fn opening_order(self) -> impl Iterator<Item = StyleFlags> {
        Self::CANONICAL.into_iter().filter(move |f| self.contains(*f))
    }

    /// Single flags of this set in closing (reverse canonical) order.
    pub fn closing_order(self) -> impl Iterator<Item = StyleFlags> {
        Self::CANONICAL
            .into_iter()
            .rev()
            .filter(move |f| self.contains(*f))
    }

    /// Name of a single flag, `"mixed"` for sets.
    pub fn name(self) -> &'static str {
        match self {
            StyleFlags::NONE => "none",
            StyleFlags::BOLD => "bold",
            StyleFlags::ITALIC => "italic",
            StyleFlags::UNDERLINE => "underline",
            StyleFlags::STRIKE => "strike",
            StyleFlags::HIGHLIGHT => "highlight",
            StyleFlags::SUB => "sub",
            StyleFlags::SUP => "sup",
            StyleFlags::LINK => "link",
            _ => "mixed",
        }
    }
}

impl BitOr for StyleFlags {
    type Output = StyleFlags;

    fn bitor(self, rhs: StyleFlags) -> StyleFlags {
        StyleFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for StyleFlags {
    fn bitor_assign(&mut self, rhs: StyleFlags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for StyleFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("StyleFlags(none)");
        }
        let names: Vec<&str> = self.opening_order().map(StyleFlags::name).collect();
        write!(f, "StyleFlags({})", names.join("|"))
    }
}

/// Small caps render as highlight; nothing in the model produces sub/sup.
/// A blank link target is no link.
impl From<&TextStyle> for StyleFlags {
    fn from(style: &TextStyle) -> Self {
        let mut flags = StyleFlags::NONE;
        if style.bold {
            flags |= StyleFlags::BOLD;
        }
        if style.italic {
            flags |= StyleFlags::ITALIC;
        }
        if style.underline {
            flags |= StyleFlags::UNDERLINE;
        }
        if style.strikethrough {
            flags |= StyleFlags::STRIKE;
        }
        if style.small_caps {
            flags |= StyleFlags::HIGHLIGHT;
        }
        if style.link.as_deref().is_some_and(|url| !url.trim().is_empty()) {
            flags |= StyleFlags::LINK;
        }
        flags
    }
}
