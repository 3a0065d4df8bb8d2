use serde::{Deserialize, Serialize};
use std::fmt;

use super::character::{Character, CharacterType};

/// Genre of a scenario. Mirrors [`CharacterType`] plus `Casual`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioType {
    Fantasy,
    Scifi,
    Historical,
    Modern,
    Superhero,
    Adventure,
    Romance,
    Combat,
    Casual,
}

impl ScenarioType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Casual => "casual",
            other => other.character_type().as_str(),
        }
    }

    /// The character type cast members of this scenario default to.
    pub fn character_type(&self) -> CharacterType {
        match self {
            Self::Fantasy => CharacterType::Fantasy,
            Self::Scifi => CharacterType::Scifi,
            Self::Historical => CharacterType::Historical,
            Self::Modern | Self::Casual => CharacterType::Modern,
            Self::Superhero => CharacterType::Superhero,
            Self::Adventure => CharacterType::Adventure,
            Self::Romance => CharacterType::Romance,
            Self::Combat => CharacterType::Combat,
        }
    }
}

impl From<CharacterType> for ScenarioType {
    fn from(t: CharacterType) -> Self {
        match t {
            CharacterType::Fantasy => Self::Fantasy,
            CharacterType::Scifi => Self::Scifi,
            CharacterType::Historical => Self::Historical,
            CharacterType::Modern => Self::Modern,
            CharacterType::Superhero => Self::Superhero,
            CharacterType::Adventure => Self::Adventure,
            CharacterType::Romance => Self::Romance,
            CharacterType::Combat => Self::Combat,
        }
    }
}

impl fmt::Display for ScenarioType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Narrative axis of a franchise quick-scenario variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioFocus {
    Action,
    Mystery,
    Character,
}

impl ScenarioFocus {
    pub const ALL: [ScenarioFocus; 3] = [Self::Action, Self::Mystery, Self::Character];

    /// Position of this focus in the variant list; also selects the franchise background.
    pub fn index(&self) -> usize {
        match self {
            Self::Action => 0,
            Self::Mystery => 1,
            Self::Character => 2,
        }
    }
}

/// A narrative setting with its cast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub title: String,
    pub description: String,
    pub prompt: String,
    #[serde(rename = "type")]
    pub scenario_type: ScenarioType,
    /// Gradient or image reference token, opaque to the engine.
    pub background: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub franchise: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus: Option<ScenarioFocus>,
    #[serde(default)]
    pub characters: Vec<Character>,
}
