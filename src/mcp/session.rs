use crate::core::config::ServerConfig;
use crate::core::error::ClientError;
use crate::mcp::client::StdioClient;
use crate::mcp::{protocol, ToolTransport};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Status tool queried once after the handshake. Auth-exempt callers
/// (the login commands) skip the query.
pub const AUTH_STATUS_TOOL: &str = "verify-login";

pub type TransportHandle = Arc<dyn ToolTransport>;

/// Produces a fresh, handshaken transport. The production connector
/// launches the stdio server; tests substitute mocks.
pub type Connector =
    Arc<dyn Fn() -> BoxFuture<'static, Result<TransportHandle, ClientError>> + Send + Sync>;

type PendingConnect = Shared<BoxFuture<'static, Result<TransportHandle, ClientError>>>;

/// Owns the single connection to the tool server.
///
/// `connect` is lazy, idempotent, and single-flight: callers that
/// arrive while an attempt is in flight await that same attempt and
/// observe its outcome. The pending marker is cleared when the attempt
/// resolves, so a failure is never replayed to later callers.
///
/// An authentication failure is absorbing: once recorded, non-exempt
/// connects fail fast until a successful login clears it.
pub struct Session {
    connector: Connector,
    auth_markers: Arc<Vec<String>>,
    state: Arc<Mutex<SessionState>>,
    attempts: Arc<AtomicU64>,
}

#[derive(Default)]
struct SessionState {
    client: Option<TransportHandle>,
    pending: Option<PendingConnect>,
    auth_required: Option<String>,
}

impl Session {
    pub fn stdio(config: ServerConfig, auth_markers: Arc<Vec<String>>) -> Self {
        let connector: Connector = Arc::new(move || {
            let config = config.clone();
            async move {
                let client = StdioClient::connect(&config).await?;
                Ok(client as TransportHandle)
            }
            .boxed()
        });
        Self::with_connector(connector, auth_markers)
    }

    pub fn with_connector(connector: Connector, auth_markers: Arc<Vec<String>>) -> Self {
        Self {
            connector,
            auth_markers,
            state: Arc::new(Mutex::new(SessionState::default())),
            attempts: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn connect(&self, auth_exempt: bool) -> Result<TransportHandle, ClientError> {
        let attempt = {
            let mut state = self.state.lock().await;
            if !auth_exempt {
                if let Some(message) = &state.auth_required {
                    return Err(ClientError::AuthRequired(message.clone()));
                }
            }
            if let Some(client) = &state.client {
                return Ok(client.clone());
            }
            if let Some(pending) = &state.pending {
                pending.clone()
            } else {
                let pending = self.establish(auth_exempt);
                state.pending = Some(pending.clone());
                pending
            }
        };
        attempt.await
    }

    fn establish(&self, auth_exempt: bool) -> PendingConnect {
        let connector = Arc::clone(&self.connector);
        let auth_markers = Arc::clone(&self.auth_markers);
        let state = Arc::clone(&self.state);
        let attempts = Arc::clone(&self.attempts);
        async move {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            debug!(attempt, auth_exempt, "establishing tool server session");

            let result = async {
                let client = connector().await?;
                if !auth_exempt {
                    if let Err(err) = preflight(client.as_ref(), &auth_markers).await {
                        client.shutdown().await;
                        return Err(err);
                    }
                }
                Ok(client)
            }
            .await;

            let mut state = state.lock().await;
            state.pending = None;
            match &result {
                Ok(client) => {
                    state.client = Some(Arc::clone(client));
                    if !auth_exempt {
                        state.auth_required = None;
                    }
                }
                Err(ClientError::AuthRequired(message)) => {
                    debug!("authentication preflight failed");
                    state.auth_required = Some(message.clone());
                }
                Err(err) => {
                    debug!(code = err.code_str(), "session establishment failed");
                }
            }
            result
        }
        .boxed()
        .shared()
    }

    /// Records the absorbing authentication-required state; set by the
    /// façade when a tool call on a live session classifies as an
    /// authentication failure.
    pub(crate) async fn mark_auth_required(&self, message: &str) {
        self.state.lock().await.auth_required = Some(message.to_string());
    }

    pub(crate) async fn clear_auth_required(&self) {
        self.state.lock().await.auth_required = None;
    }

    pub async fn disconnect(&self) {
        let client = {
            let mut state = self.state.lock().await;
            state.pending = None;
            state.client.take()
        };
        if let Some(client) = client {
            client.shutdown().await;
            debug!("tool server session closed");
        }
    }

    #[cfg(test)]
    pub(crate) fn connection_attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

/// Fails fast when the server reports an unauthenticated session, so a
/// command does not get halfway into a tool call that cannot succeed.
async fn preflight(client: &dyn ToolTransport, markers: &[String]) -> Result<(), ClientError> {
    let envelope = client.call_tool(AUTH_STATUS_TOOL, None).await;
    let status = envelope
        .and_then(|envelope| protocol::unwrap_tool_result(envelope, markers))
        .map_err(|err| protocol::classify(err, markers))?;

    if status.get("authenticated").and_then(Value::as_bool) == Some(false) {
        let message = status
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("the tool server reports an unauthenticated session")
            .to_string();
        return Err(ClientError::AuthRequired(message));
    }
    Ok(())
}
