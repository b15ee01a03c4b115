//! Shared test doubles: a scriptable transport and envelope builders.

use crate::core::error::ClientError;
use crate::mcp::session::{Connector, TransportHandle};
use crate::mcp::ToolTransport;
use async_trait::async_trait;
use futures_util::FutureExt;
use rust_mcp_schema::CallToolResult;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

type Responder =
    dyn Fn(&str, Option<&Map<String, Value>>) -> Result<CallToolResult, ClientError> + Send + Sync;

pub(crate) struct MockTransport {
    responder: Box<Responder>,
    calls: Mutex<Vec<(String, Option<Map<String, Value>>)>>,
    shutdowns: AtomicUsize,
}

impl MockTransport {
    pub(crate) fn new(
        responder: impl Fn(&str, Option<&Map<String, Value>>) -> Result<CallToolResult, ClientError>
            + Send
            + Sync
            + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
            shutdowns: AtomicUsize::new(0),
        })
    }

    /// A transport that reports an authenticated session and answers
    /// every other tool with `default`.
    pub(crate) fn authenticated(default: Value) -> Arc<Self> {
        Self::new(move |tool, _| {
            if tool == crate::mcp::session::AUTH_STATUS_TOOL {
                Ok(json_result(&json!({"authenticated": true})))
            } else {
                Ok(json_result(&default))
            }
        })
    }

    pub(crate) async fn calls(&self) -> Vec<(String, Option<Map<String, Value>>)> {
        self.calls.lock().await.clone()
    }

    pub(crate) async fn calls_for(&self, tool: &str) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|(name, _)| name == tool)
            .count()
    }

    pub(crate) fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolTransport for MockTransport {
    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<CallToolResult, ClientError> {
        self.calls
            .lock()
            .await
            .push((name.to_string(), arguments.clone()));
        (self.responder)(name, arguments.as_ref())
    }

    async fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

/// A connector handing out an already-built mock transport.
pub(crate) fn mock_connector(transport: Arc<MockTransport>) -> Connector {
    Arc::new(move || {
        let transport = Arc::clone(&transport);
        async move { Ok(transport as TransportHandle) }.boxed()
    })
}

pub(crate) fn text_result(text: &str) -> CallToolResult {
    serde_json::from_value(json!({
        "content": [{"type": "text", "text": text}]
    }))
    .expect("tool result should deserialize")
}

pub(crate) fn json_result(value: &Value) -> CallToolResult {
    text_result(&value.to_string())
}

pub(crate) fn error_result(text: &str) -> CallToolResult {
    serde_json::from_value(json!({
        "content": [{"type": "text", "text": text}],
        "isError": true
    }))
    .expect("tool result should deserialize")
}
