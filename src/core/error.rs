/// Failure taxonomy for the client.
///
/// `Clone` is required because connection outcomes are shared between
/// concurrent callers of the session guard; every variant therefore
/// carries its diagnostics as owned strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The tool server subprocess could not be launched or the MCP
    /// handshake did not complete. Never retried by the client.
    #[error("failed to connect to the tool server: {0}")]
    Connect(String),

    /// The server reports an unauthenticated session, or an error
    /// message matched the authentication vocabulary. Retrying cannot
    /// succeed until the operator re-authenticates interactively.
    #[error("authentication required: {0}")]
    AuthRequired(String),

    /// The server reported a tool failure. The message is preserved
    /// verbatim.
    #[error("{0}")]
    Tool(String),

    /// The transport channel failed after establishment: closed pipe,
    /// write/response timeout, or a payload that could not be encoded.
    #[error("tool server transport error: {0}")]
    Transport(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Stable machine-readable code, used in logs.
    pub fn code_str(&self) -> &'static str {
        match self {
            ClientError::Connect(_) => "connect_failed",
            ClientError::AuthRequired(_) => "auth_required",
            ClientError::Tool(_) => "tool_failed",
            ClientError::Transport(_) => "transport_error",
            ClientError::InvalidInput(_) => "invalid_input",
            ClientError::Config(_) => "config_error",
        }
    }

    pub fn is_auth_required(&self) -> bool {
        matches!(self, ClientError::AuthRequired(_))
    }
}
