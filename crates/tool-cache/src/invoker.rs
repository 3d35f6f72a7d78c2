use async_trait::async_trait;
use serde_json::Value;

use crate::cache::ToolCache;
use crate::error::ToolResult;

/// Transport seam to the remote indexing server.
///
/// Implementations own request serialization, connection lifecycle, and
/// per-call timeouts; callers treat an invocation as an opaque async
/// function from `(tool, args)` to a result.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke(&self, tool: &str, args: &Value) -> ToolResult;
}

/// A [`ToolInvoker`] that routes every call through a [`ToolCache`].
///
/// Same trait as the raw transport, with tiered caching and request
/// coalescing applied per tool, so the consuming layer never has to know
/// which calls are cached.
pub struct CachedInvoker<I> {
    inner: I,
    cache: ToolCache,
}

impl<I: ToolInvoker> CachedInvoker<I> {
    pub fn new(inner: I, cache: ToolCache) -> Self {
        Self { inner, cache }
    }

    /// The underlying cache, e.g. to invalidate after a mutation settles.
    pub fn cache(&self) -> &ToolCache {
        &self.cache
    }

    pub fn into_inner(self) -> I {
        self.inner
    }
}

#[async_trait]
impl<I: ToolInvoker> ToolInvoker for CachedInvoker<I> {
    async fn invoke(&self, tool: &str, args: &Value) -> ToolResult {
        self.cache
            .call(tool, args, || self.inner.invoke(tool, args))
            .await
    }
}
