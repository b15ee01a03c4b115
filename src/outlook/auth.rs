use super::OutlookClient;
use crate::core::error::ClientError;
use crate::mcp::session::AUTH_STATUS_TOOL;
use serde_json::{Map, Value};

/// Tool that starts the interactive device-code sign-in flow on the
/// server.
pub const LOGIN_TOOL: &str = "authenticate";

impl OutlookClient {
    /// Runs the sign-in flow. Auth-exempt: this must reach the server
    /// while the session is unauthenticated.
    pub async fn login(&self) -> Result<Value, ClientError> {
        let result = self.call_tool_exempt(LOGIN_TOOL, Map::new()).await?;
        self.session.clear_auth_required().await;
        // A fresh sign-in may be a different account; nothing cached is
        // safe to keep.
        self.cache.clear().await;
        Ok(result)
    }

    /// Reports the server's authentication status without touching the
    /// absorbing auth state.
    pub async fn verify_login(&self) -> Result<Value, ClientError> {
        self.call_tool_exempt(AUTH_STATUS_TOOL, Map::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outlook::facade_tests::client_with;
    use crate::test_support::{error_result, json_result, MockTransport};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn login_clears_the_absorbing_auth_state_and_the_cache() {
        let authenticated = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&authenticated);
        let transport = MockTransport::new(move |tool, _| match tool {
            AUTH_STATUS_TOOL => Ok(json_result(&json!({"authenticated": true}))),
            LOGIN_TOOL => {
                flag.store(true, Ordering::SeqCst);
                Ok(json_result(&json!({"status": "signed in"})))
            }
            _ if flag.load(Ordering::SeqCst) => Ok(json_result(&json!({"value": []}))),
            _ => Ok(error_result("InvalidAuthenticationToken: token expired")),
        });
        let client = client_with(Arc::clone(&transport));

        client
            .list_messages(None, None)
            .await
            .expect("initial list should succeed");

        authenticated.store(false, Ordering::SeqCst);
        // The cached entry is still served; a fresh read trips the
        // absorbing state.
        client
            .list_folders()
            .await
            .expect_err("expected auth failure");
        client
            .list_calendars()
            .await
            .expect_err("expected fast failure");
        assert_eq!(transport.calls_for("list-calendars").await, 0);

        client.login().await.expect("login should succeed");
        client
            .list_calendars()
            .await
            .expect("list should succeed after login");

        // The pre-login list-messages entry was cleared along with
        // everything else.
        client
            .list_messages(None, None)
            .await
            .expect("list should succeed after login");
        assert_eq!(transport.calls_for("list-messages").await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn verify_login_passes_the_status_through() {
        let transport = MockTransport::new(|tool, _| match tool {
            AUTH_STATUS_TOOL => Ok(json_result(
                &json!({"authenticated": false, "message": "No access token found"}),
            )),
            other => panic!("unexpected tool call: {other}"),
        });
        let client = client_with(Arc::clone(&transport));

        let value = client.verify_login().await.expect("status should succeed");
        assert_eq!(
            value.get("authenticated").and_then(serde_json::Value::as_bool),
            Some(false)
        );
    }
}
