use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{ProtectedZone, ZoneKind};

static INLINE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`[^`]+`").expect("inline code pattern"));
static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```.*?```").expect("code fence pattern"));
static WIKILINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[[^\]]+\]\]").expect("wikilink pattern"));
static MARKDOWN_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]*\]\([^)]*\)").expect("markdown link pattern"));
static BARE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://\S+").expect("url pattern"));
static HASHTAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"#[\w-]+").expect("hashtag pattern"));
static HTML_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?[A-Za-z][^>]*>").expect("html tag pattern"));
static COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)%%.*?%%").expect("comment pattern"));
static BLOCK_MATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\$\$.*?\$\$").expect("block math pattern"));
static INLINE_MATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$[^$\n]+\$").expect("inline math pattern"));
static HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#{1,6} [^\n]*").expect("header pattern"));
static CALLOUT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^>[ \t]*\[![A-Za-z][\w-]*\][^\n]*(?:\n>[^\n]*)*").expect("callout pattern")
});

/// Scans raw note text for spans that automated link insertion must leave
/// untouched.
///
/// Scanning is a pure function of the input: no shared state, deterministic,
/// safe to call from any number of threads. Each construct is detected
/// independently over the full text and the results are merged, so zones of
/// different kinds may overlap; containment queries treat a position as
/// protected when any zone covers it.
pub struct ZoneScanner;

impl ZoneScanner {
    /// Scan `text` and return its protected zones, sorted ascending by
    /// `(start, end)`. Offsets are byte offsets into `text`.
    ///
    /// Malformed markup never fails the scan: an unclosed frontmatter block
    /// produces no zone, while an unclosed code fence protects through the
    /// end of the document.
    #[must_use]
    pub fn scan(text: &str) -> Vec<ProtectedZone> {
        let mut zones = Vec::new();

        if let Some(zone) = frontmatter_zone(text) {
            zones.push(zone);
        }

        let code_blocks = code_block_zones(text);
        zones.extend(regex_zones_between(
            text,
            &INLINE_CODE,
            ZoneKind::InlineCode,
            &code_blocks,
        ));
        zones.extend(code_blocks);

        let wikilinks = regex_zones(text, &WIKILINK, ZoneKind::Wikilink);
        let markdown_links = regex_zones(text, &MARKDOWN_LINK, ZoneKind::MarkdownLink);
        let links: Vec<ProtectedZone> = wikilinks
            .iter()
            .chain(markdown_links.iter())
            .copied()
            .collect();
        zones.extend(regex_zones_outside(text, &BARE_URL, ZoneKind::Url, &links));
        zones.extend(wikilinks);
        zones.extend(markdown_links);

        zones.extend(regex_zones(text, &HTML_TAG, ZoneKind::HtmlTag));
        zones.extend(regex_zones(text, &COMMENT, ZoneKind::Comment));

        let block_math = regex_zones(text, &BLOCK_MATH, ZoneKind::Math);
        zones.extend(regex_zones_between(
            text,
            &INLINE_MATH,
            ZoneKind::Math,
            &block_math,
        ));
        zones.extend(block_math);

        zones.extend(regex_zones(text, &HEADER, ZoneKind::Header));
        zones.extend(regex_zones(text, &CALLOUT, ZoneKind::Callout));

        // Hashtags go last: a `#` run inside any other construct (a URL
        // fragment, a fenced block, a math span) is not a tag of its own.
        let hashtags = hashtag_zones(text, &zones);
        zones.extend(hashtags);

        zones.sort_unstable_by_key(|zone| (zone.start, zone.end));
        log::debug!("scanned {} bytes into {} protected zones", text.len(), zones.len());
        zones
    }
}

fn regex_zones(text: &str, pattern: &Regex, kind: ZoneKind) -> Vec<ProtectedZone> {
    pattern
        .find_iter(text)
        .map(|m| ProtectedZone::new(m.start(), m.end(), kind))
        .collect()
}

fn regex_zones_outside(
    text: &str,
    pattern: &Regex,
    kind: ZoneKind,
    blockers: &[ProtectedZone],
) -> Vec<ProtectedZone> {
    pattern
        .find_iter(text)
        .map(|m| ProtectedZone::new(m.start(), m.end(), kind))
        .filter(|zone| {
            !blockers
                .iter()
                .any(|blocker| blocker.span().overlaps(zone.span()))
        })
        .collect()
}

/// Match only in the gaps between `blockers` (sorted ascending). Delimiter
/// characters inside a blocker must stay invisible here: a fence's trailing
/// backtick would otherwise pair with the first inline backtick after the
/// block and swallow it.
fn regex_zones_between(
    text: &str,
    pattern: &Regex,
    kind: ZoneKind,
    blockers: &[ProtectedZone],
) -> Vec<ProtectedZone> {
    let mut zones = Vec::new();
    let mut cursor = 0;
    for blocker in blockers {
        if cursor < blocker.start {
            collect_at(&text[cursor..blocker.start], cursor, pattern, kind, &mut zones);
        }
        cursor = cursor.max(blocker.end);
    }
    if cursor < text.len() {
        collect_at(&text[cursor..], cursor, pattern, kind, &mut zones);
    }
    zones
}

fn collect_at(
    slice: &str,
    base: usize,
    pattern: &Regex,
    kind: ZoneKind,
    out: &mut Vec<ProtectedZone>,
) {
    out.extend(
        pattern
            .find_iter(slice)
            .map(|m| ProtectedZone::new(base + m.start(), base + m.end(), kind)),
    );
}

/// Frontmatter only counts when the document opens with `---` plus a line
/// break at offset 0 and a later line is exactly `---` (trailing whitespace
/// allowed). The zone runs through the closing delimiter line, newline
/// included. A single `---` line or an unclosed block yields no zone.
fn frontmatter_zone(text: &str) -> Option<ProtectedZone> {
    let rest = text.strip_prefix("---")?;
    let body = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))?;

    let mut offset = text.len() - body.len();
    for line in body.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return Some(ProtectedZone::new(
                0,
                offset + line.len(),
                ZoneKind::Frontmatter,
            ));
        }
        offset += line.len();
    }

    log::debug!("frontmatter opened at offset 0 but never closed; not protecting it");
    None
}

/// Paired fences in document order; an unpaired trailing fence protects
/// through the end of the document, so a half-written block can never
/// receive an automated edit.
fn code_block_zones(text: &str) -> Vec<ProtectedZone> {
    let mut zones: Vec<ProtectedZone> = CODE_FENCE
        .find_iter(text)
        .map(|m| ProtectedZone::new(m.start(), m.end(), ZoneKind::CodeBlock))
        .collect();

    let tail = zones.last().map_or(0, |zone| zone.end);
    if let Some(open) = text[tail..].find("```") {
        let start = tail + open;
        log::debug!("unclosed code fence at byte {start}; protecting through end of document");
        zones.push(ProtectedZone::new(start, text.len(), ZoneKind::CodeBlock));
    }

    zones
}

fn hashtag_zones(text: &str, others: &[ProtectedZone]) -> Vec<ProtectedZone> {
    HASHTAG
        .find_iter(text)
        .filter(|m| !at_header_line_start(text, m.start()))
        .map(|m| ProtectedZone::new(m.start(), m.end(), ZoneKind::Hashtag))
        .filter(|zone| {
            !others
                .iter()
                .any(|other| other.span().overlaps(zone.span()))
        })
        .collect()
}

fn at_header_line_start(text: &str, pos: usize) -> bool {
    let line_start = text[..pos].rfind('\n').map_or(0, |newline| newline + 1);
    if pos != line_start {
        return false;
    }
    let line = text[line_start..].as_bytes();
    let hashes = line.iter().take_while(|&&b| b == b'#').count();
    (1..=6).contains(&hashes) && line.get(hashes) == Some(&b' ')
}
