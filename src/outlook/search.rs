use super::{OutlookClient, LIST_TTL};
use crate::core::error::ClientError;
use serde_json::{json, Map, Value};

impl OutlookClient {
    /// Mailbox-wide search. Results are cached like any other volatile
    /// listing; a repeated query within the TTL is served locally.
    pub async fn search(&self, query: &str, top: Option<u32>) -> Result<Value, ClientError> {
        if query.trim().is_empty() {
            return Err(ClientError::InvalidInput(
                "a search query is required".to_string(),
            ));
        }
        let mut arguments = Map::new();
        arguments.insert("query".to_string(), json!(query));
        if let Some(top) = top {
            arguments.insert("top".to_string(), json!(top));
        }
        self.cached_call("search", arguments, LIST_TTL).await
    }
}

#[cfg(test)]
mod tests {
    use crate::core::error::ClientError;
    use crate::outlook::facade_tests::client_with;
    use crate::test_support::MockTransport;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn repeated_query_is_served_from_cache() {
        let transport = MockTransport::authenticated(json!({"value": [{"id": "hit"}]}));
        let client = client_with(Arc::clone(&transport));

        client
            .search("quarterly report", Some(5))
            .await
            .expect("search should succeed");
        client
            .search("quarterly report", Some(5))
            .await
            .expect("search should succeed");
        client
            .search("quarterly report", Some(10))
            .await
            .expect("search should succeed");

        // Same query and options hit the cache; a different top is a
        // different key.
        assert_eq!(transport.calls_for("search").await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn blank_query_is_rejected_client_side() {
        let transport = MockTransport::authenticated(json!({}));
        let client = client_with(Arc::clone(&transport));

        let err = client
            .search("   ", None)
            .await
            .expect_err("expected validation failure");
        assert!(matches!(err, ClientError::InvalidInput(_)));
        assert!(transport.calls().await.is_empty());
    }
}
