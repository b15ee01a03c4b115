use crate::core::config::ServerConfig;
use crate::core::error::ClientError;
use crate::mcp::{protocol, ToolTransport};
use async_trait::async_trait;
use rust_mcp_schema::schema_utils::{
    ClientMessage, FromMessage, MessageFromClient, NotificationFromClient, RequestFromClient,
    ServerMessage,
};
use rust_mcp_schema::{
    CallToolRequestParams, CallToolResult, ClientCapabilities, Implementation,
    InitializeRequestParams, InitializeResult, RequestId, LATEST_PROTOCOL_VERSION,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{oneshot, Mutex};
use tokio::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

type PendingMap = Arc<Mutex<HashMap<RequestId, oneshot::Sender<ServerMessage>>>>;

/// Line-delimited JSON-RPC over the stdio of a spawned server process.
///
/// A reader task resolves pending requests by id; a reaper task clears
/// every waiter when the process exits and kills the process when the
/// client shuts down (or is dropped).
pub struct StdioClient {
    stdin: Mutex<ChildStdin>,
    pending: PendingMap,
    next_request_id: AtomicI64,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
}

impl StdioClient {
    /// Launches the configured server process and completes the MCP
    /// handshake. The returned client is ready for tool calls.
    pub async fn connect(config: &ServerConfig) -> Result<Arc<Self>, ClientError> {
        debug!(command = %config.command, args = ?config.args, "starting MCP tool server");
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());

        if let Some(env) = &config.env {
            cmd.envs(env);
        }

        let mut child = cmd.spawn().map_err(|err| {
            ClientError::Connect(format!("unable to launch {}: {err}", config.command))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ClientError::Connect("unable to retrieve stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ClientError::Connect("unable to retrieve stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ClientError::Connect("unable to retrieve stderr".to_string()))?;

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let client = Arc::new(Self {
            stdin: Mutex::new(stdin),
            pending: pending.clone(),
            next_request_id: AtomicI64::new(0),
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
        });

        Self::spawn_stdout_reader(pending.clone(), stdout);
        Self::spawn_stderr_drain(stderr);
        Self::spawn_reaper(pending, child, shutdown_rx);

        match client.initialize().await {
            Ok(details) => {
                debug!(
                    server = %details.server_info.name,
                    version = %details.server_info.version,
                    protocol = %details.protocol_version,
                    "MCP handshake complete"
                );
            }
            Err(err) => {
                client.shutdown().await;
                return Err(ClientError::Connect(format!(
                    "MCP handshake with {} failed: {err}",
                    config.command
                )));
            }
        }

        Ok(client)
    }

    fn spawn_stdout_reader(pending: PendingMap, stdout: tokio::process::ChildStdout) {
        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = reader.next_line().await {
                let message = match serde_json::from_str::<ServerMessage>(&line) {
                    Ok(message) => message,
                    Err(_) => {
                        debug!("skipping non-protocol line on server stdout");
                        continue;
                    }
                };
                match &message {
                    ServerMessage::Response(response) => {
                        let id = response.id.clone();
                        if let Some(tx) = pending.lock().await.remove(&id) {
                            let _ = tx.send(message);
                        }
                    }
                    ServerMessage::Error(error) => {
                        if let Some(id) = error.id.clone() {
                            if let Some(tx) = pending.lock().await.remove(&id) {
                                let _ = tx.send(message);
                            }
                        }
                    }
                    ServerMessage::Request(request) => {
                        // This client advertises no capabilities that
                        // would invite server-initiated requests.
                        debug!(method = %request.method(), "ignoring server-initiated request");
                    }
                    ServerMessage::Notification(_) => {
                        debug!("ignoring server notification");
                    }
                }
            }
            pending.lock().await.clear();
        });
    }

    fn spawn_stderr_drain(stderr: tokio::process::ChildStderr) {
        tokio::spawn(async move {
            let mut reader = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = reader.next_line().await {
                debug!(line = %line, "tool server stderr");
            }
        });
    }

    fn spawn_reaper(pending: PendingMap, mut child: Child, shutdown_rx: oneshot::Receiver<()>) {
        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => {
                    debug!(status = ?status.ok(), "tool server process exited");
                }
                _ = shutdown_rx => {
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                    debug!("tool server process stopped");
                }
            }
            pending.lock().await.clear();
        });
    }

    fn next_request_id(&self) -> RequestId {
        RequestId::Integer(self.next_request_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn send_request(&self, request: RequestFromClient) -> Result<ServerMessage, ClientError> {
        let request_id = self.next_request_id();
        let message = ClientMessage::from_message(
            MessageFromClient::RequestFromClient(request),
            Some(request_id.clone()),
        )
        .map_err(|err| ClientError::Transport(err.to_string()))?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(request_id.clone(), tx);

        if let Err(err) = self.write_message(&message).await {
            self.pending.lock().await.remove(&request_id);
            return Err(err);
        }

        debug!(request_id = ?request_id, "awaiting tool server response");
        match tokio::time::timeout(REQUEST_TIMEOUT, rx).await {
            Ok(Ok(message)) => Ok(message),
            Ok(Err(_)) => Err(ClientError::Transport(
                "response channel closed; the tool server process likely exited".to_string(),
            )),
            Err(_) => {
                self.pending.lock().await.remove(&request_id);
                Err(ClientError::Transport(format!(
                    "request timed out after {}s",
                    REQUEST_TIMEOUT.as_secs()
                )))
            }
        }
    }

    async fn send_notification(
        &self,
        notification: NotificationFromClient,
    ) -> Result<(), ClientError> {
        let message = ClientMessage::from_message(
            MessageFromClient::NotificationFromClient(notification),
            None,
        )
        .map_err(|err| ClientError::Transport(err.to_string()))?;
        self.write_message(&message).await
    }

    async fn write_message(&self, message: &ClientMessage) -> Result<(), ClientError> {
        let payload =
            serde_json::to_string(message).map_err(|err| ClientError::Transport(err.to_string()))?;

        let mut stdin = tokio::time::timeout(WRITE_TIMEOUT, self.stdin.lock())
            .await
            .map_err(|_| {
                ClientError::Transport("timed out waiting for the request channel".to_string())
            })?;

        debug!(bytes = payload.len(), "writing tool server request");
        let write = async {
            stdin.write_all(payload.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
            stdin.flush().await
        };
        tokio::time::timeout(WRITE_TIMEOUT, write)
            .await
            .map_err(|_| ClientError::Transport("timed out writing to the tool server".to_string()))?
            .map_err(|err: std::io::Error| ClientError::Transport(err.to_string()))
    }

    async fn initialize(&self) -> Result<InitializeResult, ClientError> {
        let response = self
            .send_request(RequestFromClient::InitializeRequest(client_details()))
            .await?;
        let result = protocol::parse_initialize_result(response)?;
        self.send_notification(NotificationFromClient::InitializedNotification(None))
            .await?;
        Ok(result)
    }
}

#[async_trait]
impl ToolTransport for StdioClient {
    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<CallToolResult, ClientError> {
        let mut params = CallToolRequestParams::new(name);
        if let Some(arguments) = arguments {
            params = params.with_arguments(arguments);
        }
        debug!(tool = name, "calling tool");
        let response = self
            .send_request(RequestFromClient::CallToolRequest(params))
            .await?;
        protocol::parse_call_tool(response)
    }

    async fn shutdown(&self) {
        if let Some(tx) = self.shutdown_tx.lock().await.take() {
            let _ = tx.send(());
        }
    }
}

fn client_details() -> InitializeRequestParams {
    InitializeRequestParams {
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: "outlookctl".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            title: Some("outlookctl".to_string()),
            description: Some("Outlook/MS365 command-line client".to_string()),
            icons: Vec::new(),
            website_url: None,
        },
        meta: None,
        protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
    }
}
