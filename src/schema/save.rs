use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::character::Character;
use super::chat::ChatMessage;
use super::story_arc::StoryArc;

/// Version written into new save documents.
pub const SAVE_VERSION: &str = "1.0";

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A saved conversation room, in the shape the save/load layer writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveDocument {
    pub room_name: String,
    #[serde(default)]
    pub characters: Vec<Character>,
    #[serde(default)]
    pub chat_history: Vec<ChatMessage>,
    #[serde(default)]
    pub background: String,
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub opening_prompt: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub story_arc: Option<StoryArc>,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    SAVE_VERSION.to_string()
}

impl SaveDocument {
    pub fn new(room_name: impl Into<String>, theme: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            room_name: room_name.into(),
            characters: Vec::new(),
            chat_history: Vec::new(),
            background: String::new(),
            theme: theme.into(),
            opening_prompt: String::new(),
            created_at: now,
            updated_at: now,
            story_arc: None,
            version: default_version(),
        }
    }

    /// Bump `updated_at` to now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn to_json(&self) -> Result<String, SaveError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(input: &str) -> Result<Self, SaveError> {
        Ok(serde_json::from_str(input)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::story_arc::{Phase, Tension};

    #[test]
    fn json_round_trip_keeps_story_arc() {
        let mut doc = SaveDocument::new("Tower", "superhero");
        doc.opening_prompt = "Aliens over New York".to_string();
        doc.chat_history.push(ChatMessage::new("Thor", "The sky splits open."));
        doc.story_arc = Some(StoryArc {
            title: "Avengers: Alien Invasion".to_string(),
            theme: "superhero".to_string(),
            current_phase: Phase::Climax,
            current_tension: Tension::VeryHigh,
            ..StoryArc::default()
        });

        let json = doc.to_json().unwrap();
        assert!(json.contains("\"story_arc\""));
        assert!(json.contains("\"very high\""));

        let back = SaveDocument::from_json(&json).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn minimal_document_loads_with_defaults() {
        let json = r#"{
            "room_name": "Empty",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        }"#;
        let doc = SaveDocument::from_json(json).unwrap();
        assert_eq!(doc.version, SAVE_VERSION);
        assert!(doc.story_arc.is_none());
        assert!(doc.characters.is_empty());
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(matches!(
            SaveDocument::from_json("{\"room_name\": 3}"),
            Err(SaveError::Json(_))
        ));
    }

    #[test]
    fn touch_moves_updated_at_forward() {
        let mut doc = SaveDocument::new("Room", "");
        let before = doc.updated_at;
        doc.touch();
        assert!(doc.updated_at >= before);
        assert_eq!(doc.created_at, before);
    }
}
