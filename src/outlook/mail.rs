use super::{OutlookClient, ITEM_TTL, LIST_TTL, REFERENCE_TTL};
use crate::core::error::ClientError;
use serde_json::{json, Map, Value};

/// Outgoing message payload, shared by send and draft creation.
#[derive(Debug, Clone, Default)]
pub struct MailDraft {
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub body: String,
    pub html: bool,
}

impl MailDraft {
    fn into_arguments(self) -> Result<Map<String, Value>, ClientError> {
        if self.to.is_empty() {
            return Err(ClientError::InvalidInput(
                "at least one recipient is required".to_string(),
            ));
        }
        let mut arguments = Map::new();
        arguments.insert("to".to_string(), json!(self.to));
        if !self.cc.is_empty() {
            arguments.insert("cc".to_string(), json!(self.cc));
        }
        if !self.bcc.is_empty() {
            arguments.insert("bcc".to_string(), json!(self.bcc));
        }
        arguments.insert("subject".to_string(), json!(self.subject));
        arguments.insert("body".to_string(), json!(self.body));
        if self.html {
            arguments.insert("contentType".to_string(), json!("html"));
        }
        Ok(arguments)
    }
}

impl OutlookClient {
    pub async fn list_messages(
        &self,
        folder: Option<&str>,
        top: Option<u32>,
    ) -> Result<Value, ClientError> {
        let mut arguments = Map::new();
        if let Some(folder) = folder {
            arguments.insert("folder".to_string(), json!(folder));
        }
        if let Some(top) = top {
            arguments.insert("top".to_string(), json!(top));
        }
        self.cached_call("list-messages", arguments, LIST_TTL).await
    }

    pub async fn list_folders(&self) -> Result<Value, ClientError> {
        self.cached_call("list-folders", Map::new(), REFERENCE_TTL)
            .await
    }

    pub async fn list_folder_messages(
        &self,
        folder_id: &str,
        top: Option<u32>,
    ) -> Result<Value, ClientError> {
        let mut arguments = Map::new();
        arguments.insert("folderId".to_string(), json!(folder_id));
        if let Some(top) = top {
            arguments.insert("top".to_string(), json!(top));
        }
        self.cached_call("list-folder-messages", arguments, LIST_TTL)
            .await
    }

    pub async fn get_message(&self, message_id: &str) -> Result<Value, ClientError> {
        let mut arguments = Map::new();
        arguments.insert("messageId".to_string(), json!(message_id));
        self.cached_call("get-message", arguments, ITEM_TTL).await
    }

    pub async fn send_mail(&self, draft: MailDraft) -> Result<Value, ClientError> {
        let result = self.call_tool("send-mail", draft.into_arguments()?).await?;
        self.invalidate_operations(&["list-messages", "list-folder-messages"])
            .await;
        Ok(result)
    }

    pub async fn create_draft(&self, draft: MailDraft) -> Result<Value, ClientError> {
        let result = self
            .call_tool("create-draft", draft.into_arguments()?)
            .await?;
        self.invalidate_operations(&["list-messages", "list-folder-messages"])
            .await;
        Ok(result)
    }

    pub async fn move_message(
        &self,
        message_id: &str,
        destination_folder_id: &str,
    ) -> Result<Value, ClientError> {
        let mut arguments = Map::new();
        arguments.insert("messageId".to_string(), json!(message_id));
        arguments.insert(
            "destinationFolderId".to_string(),
            json!(destination_folder_id),
        );
        let result = self.call_tool("move-message", arguments).await?;
        self.invalidate_operations(&["list-messages", "list-folder-messages", "list-folders"])
            .await;
        self.invalidate_item("get-message", message_id).await;
        Ok(result)
    }

    pub async fn delete_message(&self, message_id: &str) -> Result<Value, ClientError> {
        let mut arguments = Map::new();
        arguments.insert("messageId".to_string(), json!(message_id));
        let result = self.call_tool("delete-message", arguments).await?;
        self.invalidate_operations(&["list-messages", "list-folder-messages", "list-folders"])
            .await;
        self.invalidate_item("get-message", message_id).await;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outlook::facade_tests::client_with;
    use crate::test_support::MockTransport;
    use serde_json::json;
    use std::sync::Arc;

    fn draft() -> MailDraft {
        MailDraft {
            to: vec!["a@example.com".to_string()],
            subject: "hi".to_string(),
            body: "hello there".to_string(),
            ..MailDraft::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn send_mail_invalidates_message_lists() {
        let transport = MockTransport::authenticated(json!({"value": []}));
        let client = client_with(Arc::clone(&transport));

        client
            .list_messages(None, None)
            .await
            .expect("list should succeed");
        client.send_mail(draft()).await.expect("send should succeed");
        client
            .list_messages(None, None)
            .await
            .expect("list should succeed");

        // The post-send list must not come from the pre-send snapshot.
        assert_eq!(transport.calls_for("list-messages").await, 2);
        assert_eq!(transport.calls_for("send-mail").await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn send_mail_leaves_unrelated_entries_cached() {
        let transport = MockTransport::authenticated(json!({"value": []}));
        let client = client_with(Arc::clone(&transport));

        client.list_calendars().await.expect("list should succeed");
        client.send_mail(draft()).await.expect("send should succeed");
        client.list_calendars().await.expect("list should succeed");

        assert_eq!(transport.calls_for("list-calendars").await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn move_message_drops_lists_folders_and_the_detail_entry() {
        let transport = MockTransport::authenticated(json!({"id": "m1"}));
        let client = client_with(Arc::clone(&transport));

        client.get_message("m1").await.expect("get should succeed");
        client
            .list_folders()
            .await
            .expect("folder list should succeed");
        client
            .move_message("m1", "archive")
            .await
            .expect("move should succeed");
        client.get_message("m1").await.expect("get should succeed");
        client
            .list_folders()
            .await
            .expect("folder list should succeed");

        assert_eq!(transport.calls_for("get-message").await, 2);
        assert_eq!(transport.calls_for("list-folders").await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn move_message_keeps_other_details_cached() {
        let transport = MockTransport::authenticated(json!({"id": "x"}));
        let client = client_with(Arc::clone(&transport));

        client.get_message("m1").await.expect("get should succeed");
        client.get_message("m2").await.expect("get should succeed");
        client
            .move_message("m1", "archive")
            .await
            .expect("move should succeed");
        client.get_message("m2").await.expect("get should succeed");

        assert_eq!(transport.calls_for("get-message").await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_message_reports_the_write_result_after_invalidation() {
        let transport = MockTransport::authenticated(json!({"deleted": true}));
        let client = client_with(Arc::clone(&transport));

        let value = client
            .delete_message("m1")
            .await
            .expect("delete should succeed");
        assert_eq!(value, json!({"deleted": true}));
    }

    #[tokio::test(start_paused = true)]
    async fn send_mail_requires_a_recipient() {
        let transport = MockTransport::authenticated(json!({}));
        let client = client_with(Arc::clone(&transport));

        let err = client
            .send_mail(MailDraft {
                subject: "hi".to_string(),
                body: "hello".to_string(),
                ..MailDraft::default()
            })
            .await
            .expect_err("expected validation failure");
        assert!(matches!(err, crate::core::error::ClientError::InvalidInput(_)));
        assert!(transport.calls().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unset_options_do_not_reach_the_wire() {
        let transport = MockTransport::authenticated(json!({"value": []}));
        let client = client_with(Arc::clone(&transport));

        client
            .list_messages(None, None)
            .await
            .expect("list should succeed");
        let calls = transport.calls().await;
        let (_, arguments) = calls
            .iter()
            .find(|(name, _)| name == "list-messages")
            .expect("list-messages should have been called");
        assert!(arguments.is_none());

        client.send_mail(draft()).await.expect("send should succeed");
        let calls = transport.calls().await;
        let (_, arguments) = calls
            .iter()
            .find(|(name, _)| name == "send-mail")
            .expect("send-mail should have been called");
        let arguments = arguments.as_ref().expect("send-mail carries arguments");
        assert!(!arguments.contains_key("cc"));
        assert!(!arguments.contains_key("bcc"));
        assert!(!arguments.contains_key("contentType"));
    }
}
