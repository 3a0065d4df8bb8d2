use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stage of a conversation's narrative arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Introduction,
    Discovery,
    Conflict,
    Planning,
    Climax,
    Resolution,
}

impl Phase {
    /// Position in the linear progression. `Discovery` and `Conflict` are
    /// alternative second stages and share a rank.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Introduction => 0,
            Self::Discovery | Self::Conflict => 1,
            Self::Planning => 2,
            Self::Climax => 3,
            Self::Resolution => 4,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolution)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Introduction => "introduction",
            Self::Discovery => "discovery",
            Self::Conflict => "conflict",
            Self::Planning => "planning",
            Self::Climax => "climax",
            Self::Resolution => "resolution",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse narrative intensity.
///
/// Serialized as its display label (`"very high"` has a space), so it goes
/// through strings in both JSON and RON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum Tension {
    #[default]
    Medium,
    Building,
    High,
    VeryHigh,
    Falling,
}

impl Tension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Medium => "medium",
            Self::Building => "building",
            Self::High => "high",
            Self::VeryHigh => "very high",
            Self::Falling => "falling",
        }
    }
}

impl fmt::Display for Tension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown tension label: {0:?}")]
pub struct UnknownTension(pub String);

impl FromStr for Tension {
    type Err = UnknownTension;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', " ").as_str() {
            "medium" => Ok(Self::Medium),
            "building" => Ok(Self::Building),
            "high" => Ok(Self::High),
            "very high" => Ok(Self::VeryHigh),
            "falling" => Ok(Self::Falling),
            _ => Err(UnknownTension(s.to_string())),
        }
    }
}

impl TryFrom<String> for Tension {
    type Error = UnknownTension;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Tension> for String {
    fn from(t: Tension) -> Self {
        t.as_str().to_string()
    }
}

/// Mutable narrative progress for one conversation.
///
/// Every field defaults, so an arc read back from a save file is usable
/// as-is even when older files lack some keys. Keys are camelCase; the
/// snake_case spellings are still accepted on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct StoryArc {
    pub title: String,
    pub theme: String,
    #[serde(alias = "current_phase")]
    pub current_phase: Phase,
    #[serde(alias = "current_tension")]
    pub current_tension: Tension,
    #[serde(alias = "current_goal")]
    pub current_goal: String,
    #[serde(alias = "key_characters")]
    pub key_characters: Vec<String>,
    #[serde(alias = "key_locations")]
    pub key_locations: Vec<String>,
    #[serde(alias = "plot_points")]
    pub plot_points: Vec<String>,
    #[serde(alias = "current_context")]
    pub current_context: String,
    #[serde(alias = "previous_context")]
    pub previous_context: String,
}

impl StoryArc {
    /// Add a character to the registry. Returns false if already present.
    pub fn add_character(&mut self, name: &str) -> bool {
        insert_unique(&mut self.key_characters, name)
    }

    /// Add a location to the registry. Returns false if already present.
    pub fn add_location(&mut self, name: &str) -> bool {
        insert_unique(&mut self.key_locations, name)
    }

    pub fn is_resolved(&self) -> bool {
        self.current_phase.is_terminal()
    }
}

fn insert_unique(registry: &mut Vec<String>, name: &str) -> bool {
    let name = name.trim();
    if name.is_empty() || registry.iter().any(|n| n.eq_ignore_ascii_case(name)) {
        return false;
    }
    registry.push(name.to_string());
    true
}
