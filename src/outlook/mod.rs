//! The domain façade: one thin method per Outlook operation.
//!
//! Reads go through the cache with a TTL tier matched to how quickly
//! the underlying data moves; writes call straight through and then
//! invalidate every cached read their change could have staled.

pub mod auth;
pub mod calendar;
pub mod contacts;
pub mod mail;
pub mod search;
pub mod tasks;

use crate::core::cache::{cache_key, CacheStats, ToolCache};
use crate::core::config::Config;
use crate::core::error::ClientError;
use crate::mcp::protocol;
use crate::mcp::session::Session;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::Duration;
use tracing::debug;

/// Volatile listings: message/event/contact/task lists and search.
const LIST_TTL: Duration = Duration::from_secs(5 * 60);
/// Single-item fetches and bounded-range queries.
const ITEM_TTL: Duration = Duration::from_secs(15 * 60);
/// Near-static reference data: folder and calendar lists.
const REFERENCE_TTL: Duration = Duration::from_secs(60 * 60);

/// The client context: the single session, the result cache, and the
/// authentication-failure vocabulary. Constructed once and threaded
/// through every operation; there is no ambient state.
pub struct OutlookClient {
    session: Session,
    cache: ToolCache,
    auth_markers: Arc<Vec<String>>,
    cache_bypass: AtomicBool,
}

impl OutlookClient {
    pub fn new(config: &Config) -> Self {
        let auth_markers = Arc::new(protocol::auth_markers(config.auth_error_markers.clone()));
        Self {
            session: Session::stdio(config.server.clone(), Arc::clone(&auth_markers)),
            cache: ToolCache::new(config.cache.enabled),
            auth_markers,
            cache_bypass: AtomicBool::new(false),
        }
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        session: Session,
        cache: ToolCache,
        auth_markers: Arc<Vec<String>>,
    ) -> Self {
        Self {
            session,
            cache,
            auth_markers,
            cache_bypass: AtomicBool::new(false),
        }
    }

    /// One uncached round trip: ensure a session, call the tool, unwrap
    /// the envelope, classify the failure. Used directly by writes and
    /// wrapped by [`Self::cached_call`] for reads.
    pub(crate) async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Value, ClientError> {
        self.call_tool_inner(name, arguments, false).await
    }

    /// Same as [`Self::call_tool`] but skips the authentication
    /// preflight and the absorbing auth state; the login commands must
    /// reach the server while unauthenticated.
    pub(crate) async fn call_tool_exempt(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Value, ClientError> {
        self.call_tool_inner(name, arguments, true).await
    }

    async fn call_tool_inner(
        &self,
        name: &str,
        arguments: Map<String, Value>,
        auth_exempt: bool,
    ) -> Result<Value, ClientError> {
        let client = self.session.connect(auth_exempt).await?;
        let arguments = (!arguments.is_empty()).then_some(arguments);

        let result = match client.call_tool(name, arguments).await {
            Ok(envelope) => protocol::unwrap_tool_result(envelope, &self.auth_markers),
            Err(err) => Err(protocol::classify(err, &self.auth_markers)),
        };

        if let Err(err) = &result {
            debug!(tool = name, code = err.code_str(), "tool call failed");
            if let ClientError::AuthRequired(message) = err {
                self.session.mark_auth_required(message).await;
            }
        }
        result
    }

    pub(crate) async fn cached_call(
        &self,
        name: &str,
        arguments: Map<String, Value>,
        ttl: Duration,
    ) -> Result<Value, ClientError> {
        let key = cache_key(name, &arguments);
        let bypass = self.cache_bypass.load(Ordering::Relaxed);
        self.cache
            .get_or_fetch(&key, ttl, bypass, || self.call_tool(name, arguments.clone()))
            .await
    }

    /// Drops every cached read for the named operations. Best-effort:
    /// the caller's own result is unaffected by what happens here.
    pub(crate) async fn invalidate_operations(&self, operations: &[&str]) {
        let pattern = format!("^(?:{}):", operations.join("|"));
        match Regex::new(&pattern) {
            Ok(pattern) => {
                self.cache.invalidate_pattern(&pattern).await;
            }
            Err(err) => debug!(%err, "invalidation pattern failed to compile"),
        }
    }

    /// Drops the cached detail entries for one specific item.
    pub(crate) async fn invalidate_item(&self, operation: &str, id: &str) {
        let pattern = format!("^{}:.*{}", regex::escape(operation), regex::escape(id));
        match Regex::new(&pattern) {
            Ok(pattern) => {
                self.cache.invalidate_pattern(&pattern).await;
            }
            Err(err) => debug!(%err, "invalidation pattern failed to compile"),
        }
    }

    pub fn set_cache_enabled(&self, enabled: bool) {
        self.cache.set_enabled(enabled);
    }

    /// Per-invocation bypass: producers always run, nothing is stored.
    pub fn set_cache_bypass(&self, bypass: bool) {
        self.cache_bypass.store(bypass, Ordering::Relaxed);
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    pub async fn cache_clear(&self) -> usize {
        self.cache.clear().await
    }

    pub async fn disconnect(&self) {
        self.session.disconnect().await;
    }
}
