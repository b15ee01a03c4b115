use crate::core::error::ClientError;
use rust_mcp_schema::schema_utils::ServerMessage;
use rust_mcp_schema::{CallToolResult, ContentBlock, InitializeResult, RpcError};
use serde_json::Value;

/// Error-message fragments that mark an authentication failure.
///
/// The server mixes transport-level and Graph-level error surfaces into
/// one text channel, so classification is a case-insensitive substring
/// match over this vocabulary rather than a status-code check. The
/// table can be replaced wholesale through the `auth_error_markers`
/// configuration key.
const DEFAULT_AUTH_ERROR_MARKERS: &[&str] = &[
    "401",
    "unauthorized",
    "unauthenticated",
    "token expired",
    "token_expired",
    "invalid_grant",
    "interaction_required",
    "consent_required",
    "invalidauthenticationtoken",
    "authentication required",
    "no access token",
    "aadsts",
];

/// Resolves the active vocabulary: the configured override, or the
/// built-in table.
pub fn auth_markers(configured: Option<Vec<String>>) -> Vec<String> {
    configured.unwrap_or_else(|| {
        DEFAULT_AUTH_ERROR_MARKERS
            .iter()
            .map(|marker| marker.to_string())
            .collect()
    })
}

pub fn is_auth_failure(message: &str, markers: &[String]) -> bool {
    let lowered = message.to_lowercase();
    markers
        .iter()
        .any(|marker| lowered.contains(&marker.to_lowercase()))
}

/// Upgrades a server-reported failure to the authentication-required
/// condition when its message matches the vocabulary. Other error kinds
/// pass through untouched.
pub(crate) fn classify(err: ClientError, markers: &[String]) -> ClientError {
    match err {
        ClientError::Tool(message) => {
            if is_auth_failure(&message, markers) {
                ClientError::AuthRequired(message)
            } else {
                ClientError::Tool(message)
            }
        }
        other => other,
    }
}

/// Interprets a tool response envelope.
///
/// Error flag set: the error text is extracted and classified. Success:
/// textual content is parsed as JSON when possible and returned as the
/// raw string otherwise; non-text content comes back as the serialized
/// content list.
pub(crate) fn unwrap_tool_result(
    result: CallToolResult,
    markers: &[String],
) -> Result<Value, ClientError> {
    let texts: Vec<&str> = result
        .content
        .iter()
        .filter_map(|block| match block {
            ContentBlock::TextContent(text) => Some(text.text.as_str()),
            _ => None,
        })
        .collect();

    if result.is_error.unwrap_or(false) {
        let message = if texts.is_empty() {
            "the tool server reported an error without a message".to_string()
        } else {
            texts.join("\n")
        };
        return Err(classify(ClientError::Tool(message), markers));
    }

    match texts.first() {
        Some(text) => Ok(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))),
        None => serde_json::to_value(&result.content)
            .map_err(|err| ClientError::Transport(err.to_string())),
    }
}

pub(crate) fn parse_initialize_result(
    message: ServerMessage,
) -> Result<InitializeResult, ClientError> {
    let value = parse_response_value(message)?;
    let result = serde_json::from_value::<InitializeResult>(value)
        .map_err(|err| ClientError::Transport(err.to_string()))?;
    if result.protocol_version.trim().is_empty() {
        return Err(ClientError::Transport(
            "unexpected initialize response".to_string(),
        ));
    }
    Ok(result)
}

pub(crate) fn parse_call_tool(message: ServerMessage) -> Result<CallToolResult, ClientError> {
    let value = parse_response_value(message)?;
    serde_json::from_value::<CallToolResult>(value)
        .map_err(|err| ClientError::Transport(err.to_string()))
}

pub(crate) fn parse_response_value(message: ServerMessage) -> Result<Value, ClientError> {
    match message {
        ServerMessage::Response(response) => serde_json::to_value(&response.result)
            .map_err(|err| ClientError::Transport(err.to_string())),
        ServerMessage::Error(error) => Err(ClientError::Tool(format_rpc_error(&error.error))),
        other => Err(ClientError::Transport(format!(
            "unexpected tool server message: {other:?}"
        ))),
    }
}

fn format_rpc_error(error: &RpcError) -> String {
    let mut output = format!("MCP error {}: {}", error.code, error.message);
    if let Some(data) = &error.data {
        let details = data
            .get("details")
            .and_then(|value| value.as_str())
            .map(|value| value.to_string())
            .or_else(|| data.as_str().map(|value| value.to_string()))
            .or_else(|| serde_json::to_string_pretty(data).ok());

        if let Some(details) = details {
            if !details.is_empty() {
                output.push('\n');
                output.push_str(&details);
            }
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn markers() -> Vec<String> {
        auth_markers(None)
    }

    fn tool_result(payload: Value) -> CallToolResult {
        serde_json::from_value(payload).expect("tool result should deserialize")
    }

    #[test]
    fn json_text_content_is_parsed() {
        let result = tool_result(json!({
            "content": [{"type": "text", "text": "{\"value\": [1, 2]}"}]
        }));
        let value = unwrap_tool_result(result, &markers()).expect("unwrap should succeed");
        assert_eq!(value, json!({"value": [1, 2]}));
    }

    #[test]
    fn plain_text_content_is_returned_as_string() {
        let result = tool_result(json!({
            "content": [{"type": "text", "text": "Message sent successfully."}]
        }));
        let value = unwrap_tool_result(result, &markers()).expect("unwrap should succeed");
        assert_eq!(value, Value::String("Message sent successfully.".to_string()));
    }

    #[test]
    fn non_text_content_is_returned_as_content_list() {
        let result = tool_result(json!({
            "content": [{"type": "image", "data": "aGk=", "mimeType": "image/png"}]
        }));
        let value = unwrap_tool_result(result, &markers()).expect("unwrap should succeed");
        let blocks = value.as_array().expect("expected content list");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].get("type").and_then(Value::as_str), Some("image"));
    }

    #[test]
    fn error_envelope_with_auth_text_raises_auth_required() {
        let result = tool_result(json!({
            "isError": true,
            "content": [{"type": "text", "text": "401 Unauthorized"}]
        }));
        let err = unwrap_tool_result(result, &markers()).expect_err("expected failure");
        assert!(err.is_auth_required(), "got: {err:?}");
    }

    #[test]
    fn error_envelope_preserves_generic_message_verbatim() {
        let result = tool_result(json!({
            "isError": true,
            "content": [{"type": "text", "text": "Mailbox 'archive' not found"}]
        }));
        let err = unwrap_tool_result(result, &markers()).expect_err("expected failure");
        assert_eq!(err, ClientError::Tool("Mailbox 'archive' not found".to_string()));
    }

    #[test]
    fn auth_vocabulary_matches_substrings_case_insensitively() {
        for marker in [
            "token expired",
            "401",
            "invalid_grant",
            "interaction_required",
            "consent_required",
            "InvalidAuthenticationToken",
            "AADSTS50076",
        ] {
            let message = format!("Graph request failed: {marker} (trace 4f2c)");
            assert!(
                is_auth_failure(&message, &markers()),
                "expected auth failure for {marker}"
            );
            assert!(
                is_auth_failure(&message.to_uppercase(), &markers()),
                "expected auth failure for uppercased {marker}"
            );
        }

        assert!(!is_auth_failure("Mailbox quota exceeded", &markers()));
        assert!(!is_auth_failure("folder not found", &markers()));
    }

    #[test]
    fn configured_markers_replace_the_default_table() {
        let custom = auth_markers(Some(vec!["custom marker".to_string()]));
        assert!(is_auth_failure("hit the CUSTOM MARKER here", &custom));
        assert!(!is_auth_failure("401 Unauthorized", &custom));
    }

    #[test]
    fn classify_only_touches_tool_errors() {
        let upgraded = classify(ClientError::Tool("token expired".to_string()), &markers());
        assert!(upgraded.is_auth_required());

        let untouched = classify(
            ClientError::Transport("401 on the wire".to_string()),
            &markers(),
        );
        assert_eq!(untouched, ClientError::Transport("401 on the wire".to_string()));
    }

    #[test]
    fn rpc_errors_surface_code_message_and_details() {
        let message: ServerMessage = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "error": {"code": -32000, "message": "boom", "data": {"details": "the mailbox is locked"}}
        }))
        .expect("message should parse");

        let err = parse_response_value(message).expect_err("expected rpc error");
        match err {
            ClientError::Tool(text) => {
                assert!(text.contains("MCP error -32000: boom"), "text: {text}");
                assert!(text.contains("the mailbox is locked"), "text: {text}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn initialize_rejects_blank_protocol_version() {
        let message: ServerMessage = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 0,
            "result": {
                "capabilities": {},
                "protocolVersion": " ",
                "serverInfo": {"name": "mock", "version": "0.1.0"}
            }
        }))
        .expect("message should parse");

        assert!(parse_initialize_result(message).is_err());
    }

    #[test]
    fn call_tool_response_parses_envelope() {
        let message: ServerMessage = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 7,
            "result": {
                "content": [{"type": "text", "text": "{\"ok\": true}"}],
                "isError": false
            }
        }))
        .expect("message should parse");

        let envelope = parse_call_tool(message).expect("envelope should parse");
        assert_eq!(envelope.is_error, Some(false));
        let value = unwrap_tool_result(envelope, &markers()).expect("unwrap should succeed");
        assert_eq!(value, json!({"ok": true}));
    }
}
