use errors::TaskError;
use serde::{Deserialize, Serialize};

/// One unit of work pushed onto the task queue.
///
/// The wire form is a flat JSON object whose four fields are all strings.
/// Unknown fields are ignored so older ingestors that attach extra columns
/// keep working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEvent {
    pub message_id: String,
    pub user_id: String,
    pub content: String,
    pub timestamp: String,
}

impl TaskEvent {
    pub fn new(
        message_id: impl Into<String>,
        user_id: impl Into<String>,
        content: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            user_id: user_id.into(),
            content: content.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Decodes and validates a raw queue payload.
    pub fn decode(raw: &[u8]) -> Result<Self, TaskError> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Err(TaskError::EmptyPayload);
        }
        let event: TaskEvent = serde_json::from_slice(raw).map_err(TaskError::Malformed)?;
        event.validate()?;
        Ok(event)
    }

    pub fn encode(&self) -> Vec<u8> {
        // Four string fields; serialization of this shape cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }

    fn validate(&self) -> Result<(), TaskError> {
        if self.user_id.trim().is_empty() {
            return Err(TaskError::InvalidField {
                field: "user_id",
                reason: "must not be empty",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_flat_record() {
        let raw = br#"{"message_id":"7","user_id":"u1","content":"hi","timestamp":"1700000000.5"}"#;
        let event = TaskEvent::decode(raw).unwrap();
        assert_eq!(event, TaskEvent::new("7", "u1", "hi", "1700000000.5"));
    }

    #[test]
    fn ignores_unknown_fields_and_allows_empty_content() {
        let raw = br#"{"message_id":"7","user_id":"u1","content":"","timestamp":"t","source":"csv"}"#;
        let event = TaskEvent::decode(raw).unwrap();
        assert_eq!(event.content, "");
    }

    #[test]
    fn rejects_empty_and_whitespace_payloads() {
        assert!(matches!(TaskEvent::decode(b""), Err(TaskError::EmptyPayload)));
        assert!(matches!(TaskEvent::decode(b"  \n"), Err(TaskError::EmptyPayload)));
    }

    #[test]
    fn rejects_broken_json() {
        let err = TaskEvent::decode(b"{\"user_id\": \"u1\"").unwrap_err();
        assert!(matches!(err, TaskError::Malformed(_)));
    }

    #[test]
    fn rejects_missing_fields() {
        let err = TaskEvent::decode(br#"{"user_id":"u1","content":"x"}"#).unwrap_err();
        assert!(matches!(err, TaskError::Malformed(_)));
    }

    #[test]
    fn rejects_non_string_fields() {
        let raw = br#"{"message_id":7,"user_id":"u1","content":"x","timestamp":"t"}"#;
        assert!(matches!(TaskEvent::decode(raw), Err(TaskError::Malformed(_))));
    }

    #[test]
    fn rejects_blank_user_id() {
        let raw = br#"{"message_id":"1","user_id":"  ","content":"x","timestamp":"t"}"#;
        let err = TaskEvent::decode(raw).unwrap_err();
        assert!(matches!(err, TaskError::InvalidField { field: "user_id", .. }));
    }

    #[test]
    fn encode_is_readable_by_decode() {
        let event = TaskEvent::new("m", "u2", "I will hurt you", "now");
        assert_eq!(TaskEvent::decode(&event.encode()).unwrap(), event);
    }
}
