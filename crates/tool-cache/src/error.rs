use thiserror::Error;

/// Result of a tool call routed through the cache.
pub type ToolResult = std::result::Result<serde_json::Value, ToolError>;

/// Errors surfaced by a remote tool call.
///
/// The type is `Clone` so one settled failure can be delivered to the leader
/// call and to every caller coalesced onto the same in-flight request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolError {
    /// The transport reported a failure for this call.
    #[error("remote call failed: {0}")]
    Remote(String),

    /// The leader call was dropped before settling; the key is immediately
    /// retryable.
    #[error("in-flight call for `{0}` was canceled before completing")]
    Canceled(String),
}

impl ToolError {
    /// Wrap a transport-level failure message.
    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(msg.into())
    }
}
