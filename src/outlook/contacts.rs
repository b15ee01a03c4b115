use super::{OutlookClient, LIST_TTL};
use crate::core::error::ClientError;
use serde_json::{json, Map, Value};

impl OutlookClient {
    pub async fn list_contacts(&self, top: Option<u32>) -> Result<Value, ClientError> {
        let mut arguments = Map::new();
        if let Some(top) = top {
            arguments.insert("top".to_string(), json!(top));
        }
        self.cached_call("list-contacts", arguments, LIST_TTL).await
    }
}
