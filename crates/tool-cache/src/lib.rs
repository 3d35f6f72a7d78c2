//! # VaultLink Tool Cache
//!
//! Tiered response cache with in-flight deduplication, sitting in front of
//! the remote indexing server's tool-call surface.
//!
//! Dashboard views fire the same handful of read-only tool calls over and
//! over (link graphs, health summaries, schema lookups). Going to the server
//! for each one is wasteful and, worse, concurrent identical calls multiply
//! that waste. This crate memoizes results per `(tool, args)` key with a TTL
//! chosen by tool name, and coalesces concurrent identical calls onto a
//! single remote invocation.
//!
//! ## Architecture
//!
//! ```text
//! caller ──> ToolCache::call(tool, args, remote)
//!              │
//!              ├─> Tier::classify(tool)
//!              │     bypass  → invoke remote directly, store nothing
//!              │     session → cache until invalidated
//!              │     short   → cache ~5 s
//!              │     medium  → cache ~30 s
//!              │
//!              ├─> live entry?          → return it
//!              ├─> identical in flight? → await the leader's result
//!              └─> become leader        → invoke remote, settle everyone
//! ```
//!
//! Failures are never cached: the leader's error reaches every coalesced
//! waiter and the key is immediately retryable. Mutation-shaped tools (and
//! any unknown name) bypass the cache entirely, so staleness can only ever
//! affect read paths.
//!
//! ## Example
//!
//! ```rust
//! use serde_json::json;
//! use vaultlink_tool_cache::{CacheConfig, ToolCache};
//!
//! # async fn demo() -> vaultlink_tool_cache::ToolResult {
//! let cache = ToolCache::new(CacheConfig::with_defaults());
//! let args = json!({ "note": "Projects/Rollout.md" });
//!
//! let links = cache
//!     .call("get_note_links", &args, || async {
//!         // real transport call goes here
//!         Ok(json!({ "links": [] }))
//!     })
//!     .await?;
//! # Ok(links)
//! # }
//! ```

mod cache;
mod error;
mod invoker;
mod tiers;

pub use cache::{CacheConfig, CacheStats, ToolCache};
pub use error::{ToolError, ToolResult};
pub use invoker::{CachedInvoker, ToolInvoker};
pub use tiers::Tier;
