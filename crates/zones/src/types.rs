use serde::{Deserialize, Serialize};

use crate::span::Span;

/// Kind of markdown construct a protected zone covers.
///
/// The scanner assigns no precedence among kinds. Each consumer decides what
/// a kind means for it: headers block link insertion but their text still
/// feeds the index, code blocks block everything, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    /// YAML metadata block delimited by `---` lines at the top of a note.
    Frontmatter,
    /// Fenced code region delimited by triple backticks.
    CodeBlock,
    /// Single-backtick inline code span.
    InlineCode,
    /// `[[Target]]` or `[[Target|Alias]]` internal reference.
    Wikilink,
    /// `[label](url)` external reference.
    MarkdownLink,
    /// Bare `http://` / `https://` URL.
    Url,
    /// `#tag` style hashtag.
    Hashtag,
    /// A single opening or closing HTML tag.
    HtmlTag,
    /// `%%...%%` editor-only comment.
    Comment,
    /// Inline `$...$` or block `$$...$$` math.
    Math,
    /// `#`-prefixed heading line.
    Header,
    /// `> [!type]` callout block, including its continuation lines.
    Callout,
}

impl ZoneKind {
    /// Stable snake_case name, for logs and serialized diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ZoneKind::Frontmatter => "frontmatter",
            ZoneKind::CodeBlock => "code_block",
            ZoneKind::InlineCode => "inline_code",
            ZoneKind::Wikilink => "wikilink",
            ZoneKind::MarkdownLink => "markdown_link",
            ZoneKind::Url => "url",
            ZoneKind::Hashtag => "hashtag",
            ZoneKind::HtmlTag => "html_tag",
            ZoneKind::Comment => "comment",
            ZoneKind::Math => "math",
            ZoneKind::Header => "header",
            ZoneKind::Callout => "callout",
        }
    }
}

/// A text span automated link insertion must not alter or insert into.
///
/// Offsets are byte offsets into the scanned `&str`, half-open:
/// `start` inclusive, `end` exclusive. Zones are plain values tied to one
/// document snapshot; after any edit the document must be rescanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedZone {
    pub start: usize,
    pub end: usize,
    pub kind: ZoneKind,
}

impl ProtectedZone {
    #[must_use]
    pub const fn new(start: usize, end: usize, kind: ZoneKind) -> Self {
        Self { start, end, kind }
    }

    #[must_use]
    pub const fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }
}

/// True if `pos` falls inside any zone (start inclusive, end exclusive).
#[must_use]
pub fn is_in_protected_zone(pos: usize, zones: &[ProtectedZone]) -> bool {
    zones.iter().any(|zone| zone.span().contains(pos))
}

/// True if the half-open range `[start, end)` intersects any zone.
///
/// A candidate edit that exactly abuts a zone boundary (the edit ends where
/// the zone starts, or starts where the zone ends) does not overlap it.
#[must_use]
pub fn range_overlaps_protected_zone(start: usize, end: usize, zones: &[ProtectedZone]) -> bool {
    let range = Span::new(start, end);
    zones.iter().any(|zone| zone.span().overlaps(range))
}
