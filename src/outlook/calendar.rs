use super::{OutlookClient, ITEM_TTL, LIST_TTL, REFERENCE_TTL};
use crate::core::error::ClientError;
use chrono::DateTime;
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Default)]
pub struct EventDraft {
    pub subject: String,
    pub start: String,
    pub end: String,
    pub location: Option<String>,
    pub body: Option<String>,
    pub attendees: Vec<String>,
    pub calendar: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    pub subject: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub location: Option<String>,
    pub body: Option<String>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        self.subject.is_none()
            && self.start.is_none()
            && self.end.is_none()
            && self.location.is_none()
            && self.body.is_none()
    }
}

fn require_rfc3339(label: &str, value: &str) -> Result<(), ClientError> {
    DateTime::parse_from_rfc3339(value).map(|_| ()).map_err(|err| {
        ClientError::InvalidInput(format!("{label} must be an RFC 3339 timestamp: {err}"))
    })
}

impl OutlookClient {
    pub async fn list_calendars(&self) -> Result<Value, ClientError> {
        self.cached_call("list-calendars", Map::new(), REFERENCE_TTL)
            .await
    }

    pub async fn list_events(
        &self,
        calendar: Option<&str>,
        top: Option<u32>,
    ) -> Result<Value, ClientError> {
        let mut arguments = Map::new();
        if let Some(calendar) = calendar {
            arguments.insert("calendar".to_string(), json!(calendar));
        }
        if let Some(top) = top {
            arguments.insert("top".to_string(), json!(top));
        }
        self.cached_call("list-events", arguments, LIST_TTL).await
    }

    pub async fn get_event(&self, event_id: &str) -> Result<Value, ClientError> {
        let mut arguments = Map::new();
        arguments.insert("eventId".to_string(), json!(event_id));
        self.cached_call("get-event", arguments, ITEM_TTL).await
    }

    /// Events overlapping the half-open range `[start, end)`.
    pub async fn get_calendar_view(
        &self,
        start: &str,
        end: &str,
        calendar: Option<&str>,
    ) -> Result<Value, ClientError> {
        require_rfc3339("start", start)?;
        require_rfc3339("end", end)?;

        let mut arguments = Map::new();
        arguments.insert("start".to_string(), json!(start));
        arguments.insert("end".to_string(), json!(end));
        if let Some(calendar) = calendar {
            arguments.insert("calendar".to_string(), json!(calendar));
        }
        self.cached_call("get-calendar-view", arguments, ITEM_TTL)
            .await
    }

    pub async fn create_event(&self, draft: EventDraft) -> Result<Value, ClientError> {
        require_rfc3339("start", &draft.start)?;
        require_rfc3339("end", &draft.end)?;

        let mut arguments = Map::new();
        arguments.insert("subject".to_string(), json!(draft.subject));
        arguments.insert("start".to_string(), json!(draft.start));
        arguments.insert("end".to_string(), json!(draft.end));
        if let Some(location) = &draft.location {
            arguments.insert("location".to_string(), json!(location));
        }
        if let Some(body) = &draft.body {
            arguments.insert("body".to_string(), json!(body));
        }
        if !draft.attendees.is_empty() {
            arguments.insert("attendees".to_string(), json!(draft.attendees));
        }
        if let Some(calendar) = &draft.calendar {
            arguments.insert("calendar".to_string(), json!(calendar));
        }

        let result = self.call_tool("create-event", arguments).await?;
        self.invalidate_operations(&["list-events", "get-calendar-view"])
            .await;
        Ok(result)
    }

    pub async fn update_event(
        &self,
        event_id: &str,
        patch: EventPatch,
    ) -> Result<Value, ClientError> {
        if patch.is_empty() {
            return Err(ClientError::InvalidInput(
                "nothing to update; provide at least one field".to_string(),
            ));
        }
        if let Some(start) = &patch.start {
            require_rfc3339("start", start)?;
        }
        if let Some(end) = &patch.end {
            require_rfc3339("end", end)?;
        }

        let mut arguments = Map::new();
        arguments.insert("eventId".to_string(), json!(event_id));
        if let Some(subject) = &patch.subject {
            arguments.insert("subject".to_string(), json!(subject));
        }
        if let Some(start) = &patch.start {
            arguments.insert("start".to_string(), json!(start));
        }
        if let Some(end) = &patch.end {
            arguments.insert("end".to_string(), json!(end));
        }
        if let Some(location) = &patch.location {
            arguments.insert("location".to_string(), json!(location));
        }
        if let Some(body) = &patch.body {
            arguments.insert("body".to_string(), json!(body));
        }

        let result = self.call_tool("update-event", arguments).await?;
        self.invalidate_operations(&["list-events", "get-calendar-view"])
            .await;
        self.invalidate_item("get-event", event_id).await;
        Ok(result)
    }

    pub async fn delete_event(&self, event_id: &str) -> Result<Value, ClientError> {
        let mut arguments = Map::new();
        arguments.insert("eventId".to_string(), json!(event_id));
        let result = self.call_tool("delete-event", arguments).await?;
        self.invalidate_operations(&["list-events", "get-calendar-view"])
            .await;
        self.invalidate_item("get-event", event_id).await;
        Ok(result)
    }
}
