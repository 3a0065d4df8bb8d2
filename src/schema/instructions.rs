use serde::{Deserialize, Serialize};

/// Stylistic register a character should answer in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WritingStyle {
    #[default]
    Balanced,
    Analytical,
    Witty,
    Emotional,
    Philosophical,
    Assertive,
}

/// Target length of the next response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResponseLength {
    Brief,
    #[default]
    Medium,
    Long,
}

/// Per-turn directive for an external response generator. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WritingInstructions {
    pub story_arc: String,
    pub writing_style: WritingStyle,
    pub response_length: ResponseLength,
    pub character_reminders: String,
    pub general_notes: String,
}
