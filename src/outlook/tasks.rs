use super::{OutlookClient, LIST_TTL};
use crate::core::error::ClientError;
use serde_json::{json, Map, Value};

impl OutlookClient {
    pub async fn list_tasks(
        &self,
        list_id: Option<&str>,
        top: Option<u32>,
    ) -> Result<Value, ClientError> {
        let mut arguments = Map::new();
        if let Some(list_id) = list_id {
            arguments.insert("listId".to_string(), json!(list_id));
        }
        if let Some(top) = top {
            arguments.insert("top".to_string(), json!(top));
        }
        self.cached_call("list-tasks", arguments, LIST_TTL).await
    }
}
