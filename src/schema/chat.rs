use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One turn of conversation as the UI records it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub speaker: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChatMessage {
    pub fn new(speaker: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            message: message.into(),
            timestamp: None,
        }
    }
}
