//! # VaultLink Zones
//!
//! Protected-zone scanning for markdown vault documents.
//!
//! Automated link insertion must never rewrite structured regions of a note:
//! frontmatter, code, existing links, URLs, math, HTML, comments, headers,
//! callouts. This crate scans raw document text once and produces the set of
//! spans those regions occupy, so any text-mutation workflow can check its
//! candidate edit ranges before committing them.
//!
//! ## Architecture
//!
//! ```text
//! Raw note text
//!     │
//!     ├──> ZoneScanner::scan
//!     │    ├─> one detection pass per construct (frontmatter, fences, ...)
//!     │    ├─> containment filters (inline code vs fences, URLs vs links)
//!     │    └─> merge + sort by (start, end)
//!     │
//!     └──> Vec<ProtectedZone>
//!          ├─> is_in_protected_zone(pos, ..)
//!          └─> range_overlaps_protected_zone(start, end, ..)
//! ```
//!
//! Zones of different kinds may overlap (a URL inside inline code yields
//! both). Consumers treat a position as protected when it falls inside *any*
//! zone, so duplicates are harmless; the scanner assigns no precedence.
//!
//! ## Example
//!
//! ```rust
//! use vaultlink_zones::{range_overlaps_protected_zone, ZoneScanner};
//!
//! let text = "See [[Graph Index]] and `build()` for details.";
//! let zones = ZoneScanner::scan(text);
//!
//! // A candidate edit inside the wikilink is rejected...
//! assert!(range_overlaps_protected_zone(6, 10, &zones));
//! // ...while one in plain prose is fine.
//! assert!(!range_overlaps_protected_zone(20, 23, &zones));
//! ```

mod scanner;
mod span;
mod types;

pub use scanner::ZoneScanner;
pub use span::Span;
pub use types::{
    is_in_protected_zone, range_overlaps_protected_zone, ProtectedZone, ZoneKind,
};
