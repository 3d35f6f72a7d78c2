use serde::{Deserialize, Serialize};

/// Caching tier for a tool, decided statically by tool name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Side-effecting operations: never cached, never deduplicated.
    Bypass,
    /// Stable for the lifetime of the connection; evicted only by explicit
    /// invalidation.
    Session,
    /// Fast-moving derived state: link graphs and search-adjacent analytics.
    Short,
    /// Slow-moving aggregate state: health and index status summaries.
    Medium,
}

// These tables are a protocol contract with the indexing server; the names
// must match its tool surface exactly. Kept as plain lists so a server-side
// rename is a one-line edit here.

const SESSION_TOOLS: &[&str] = &["get_schema", "get_capabilities"];

const SHORT_TOOLS: &[&str] = &[
    "search_notes",
    "get_note_links",
    "get_backlinks",
    "get_graph_neighbors",
    "get_entity_graph",
    "score_relevance",
];

const MEDIUM_TOOLS: &[&str] = &["get_vault_health", "get_index_status", "get_entity_stats"];

/// Mutations and one-shot actions. Unknown names also bypass, so this list
/// only distinguishes "known mutation" from "name we have never seen" in
/// the logs.
const BYPASS_TOOLS: &[&str] = &[
    "update_note",
    "apply_link_edits",
    "update_frontmatter",
    "create_entity",
    "delete_entity",
    "record_feedback",
    "reindex_vault",
    "sync_vault",
];

impl Tier {
    /// Classify a tool name. Unclassified names fail safe toward freshness:
    /// they bypass the cache on every call.
    #[must_use]
    pub fn classify(tool: &str) -> Tier {
        if SESSION_TOOLS.contains(&tool) {
            Tier::Session
        } else if SHORT_TOOLS.contains(&tool) {
            Tier::Short
        } else if MEDIUM_TOOLS.contains(&tool) {
            Tier::Medium
        } else {
            if !BYPASS_TOOLS.contains(&tool) {
                log::debug!("unclassified tool `{tool}`, bypassing cache");
            }
            Tier::Bypass
        }
    }

    #[must_use]
    pub const fn is_cacheable(self) -> bool {
        !matches!(self, Tier::Bypass)
    }
}
