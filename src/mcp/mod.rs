pub mod client;
pub mod protocol;
pub mod session;

use crate::core::error::ClientError;
use async_trait::async_trait;
use rust_mcp_schema::CallToolResult;
use serde_json::{Map, Value};

/// One live channel to the tool server.
///
/// The stdio transport is the production implementation; the trait is
/// the seam that lets the session guard and the domain façade run
/// against a mock in tests.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<CallToolResult, ClientError>;

    async fn shutdown(&self);
}
