use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest value any personality trait or talkativeness may take.
pub const TRAIT_MIN: u8 = 1;
/// Highest value any personality trait or talkativeness may take.
pub const TRAIT_MAX: u8 = 10;
/// Slowest allowed thinking speed multiplier.
pub const PACE_MIN: f32 = 0.5;
/// Fastest allowed thinking speed multiplier.
pub const PACE_MAX: f32 = 2.0;

/// Genre a character is written for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum CharacterType {
    Fantasy,
    Scifi,
    Historical,
    #[default]
    Modern,
    Superhero,
    Adventure,
    Romance,
    Combat,
}

impl CharacterType {
    pub const ALL: [CharacterType; 8] = [
        Self::Fantasy,
        Self::Scifi,
        Self::Historical,
        Self::Modern,
        Self::Superhero,
        Self::Adventure,
        Self::Romance,
        Self::Combat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fantasy => "fantasy",
            Self::Scifi => "scifi",
            Self::Historical => "historical",
            Self::Modern => "modern",
            Self::Superhero => "superhero",
            Self::Adventure => "adventure",
            Self::Romance => "romance",
            Self::Combat => "combat",
        }
    }
}

impl fmt::Display for CharacterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The personality dimensions a character is scored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trait {
    Analytical,
    Emotional,
    Philosophical,
    Humor,
    Confidence,
    Creativity,
    Sociability,
}

impl Trait {
    /// The five traits every personality carries.
    pub const CORE: [Trait; 5] = [
        Self::Analytical,
        Self::Emotional,
        Self::Philosophical,
        Self::Humor,
        Self::Confidence,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analytical => "analytical",
            Self::Emotional => "emotional",
            Self::Philosophical => "philosophical",
            Self::Humor => "humor",
            Self::Confidence => "confidence",
            Self::Creativity => "creativity",
            Self::Sociability => "sociability",
        }
    }
}

/// Clamp an arbitrary score into the `[TRAIT_MIN, TRAIT_MAX]` range.
pub fn clamp_trait(value: i32) -> u8 {
    value.clamp(TRAIT_MIN as i32, TRAIT_MAX as i32) as u8
}

/// Clamp a thinking speed multiplier into `[PACE_MIN, PACE_MAX]`.
pub fn clamp_pace(value: f32) -> f32 {
    if value.is_nan() {
        return 1.0;
    }
    value.clamp(PACE_MIN, PACE_MAX)
}

/// Serde adapters that clamp numeric attributes as they are read, so
/// records from save files or the JSON boundary always satisfy the ranges.
mod clamped {
    use super::{clamp_pace, TRAIT_MAX, TRAIT_MIN};
    use serde::{Deserialize, Deserializer};

    fn to_trait(value: i64) -> u8 {
        value.clamp(TRAIT_MIN as i64, TRAIT_MAX as i64) as u8
    }

    pub fn score<'de, D: Deserializer<'de>>(d: D) -> Result<u8, D::Error> {
        i64::deserialize(d).map(to_trait)
    }

    pub fn optional_score<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u8>, D::Error> {
        Ok(Option::<i64>::deserialize(d)?.map(to_trait))
    }

    pub fn pace<'de, D: Deserializer<'de>>(d: D) -> Result<f32, D::Error> {
        f32::deserialize(d).map(clamp_pace)
    }
}

/// Personality vector on a 1..=10 scale.
///
/// `creativity` and `sociability` are only present when an archetype
/// bundle supplied them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Personality {
    #[serde(deserialize_with = "clamped::score")]
    pub analytical: u8,
    #[serde(deserialize_with = "clamped::score")]
    pub emotional: u8,
    #[serde(deserialize_with = "clamped::score")]
    pub philosophical: u8,
    #[serde(deserialize_with = "clamped::score")]
    pub humor: u8,
    #[serde(deserialize_with = "clamped::score")]
    pub confidence: u8,
    #[serde(
        default,
        deserialize_with = "clamped::optional_score",
        skip_serializing_if = "Option::is_none"
    )]
    pub creativity: Option<u8>,
    #[serde(
        default,
        deserialize_with = "clamped::optional_score",
        skip_serializing_if = "Option::is_none"
    )]
    pub sociability: Option<u8>,
}

impl Personality {
    pub const BASELINE: u8 = 5;

    pub fn get(&self, t: Trait) -> Option<u8> {
        match t {
            Trait::Analytical => Some(self.analytical),
            Trait::Emotional => Some(self.emotional),
            Trait::Philosophical => Some(self.philosophical),
            Trait::Humor => Some(self.humor),
            Trait::Confidence => Some(self.confidence),
            Trait::Creativity => self.creativity,
            Trait::Sociability => self.sociability,
        }
    }

    /// Set a trait, clamping the value into range.
    pub fn set(&mut self, t: Trait, value: i32) {
        let v = clamp_trait(value);
        match t {
            Trait::Analytical => self.analytical = v,
            Trait::Emotional => self.emotional = v,
            Trait::Philosophical => self.philosophical = v,
            Trait::Humor => self.humor = v,
            Trait::Confidence => self.confidence = v,
            Trait::Creativity => self.creativity = Some(v),
            Trait::Sociability => self.sociability = Some(v),
        }
    }

    /// Every present trait with its value, core traits first.
    pub fn iter(&self) -> impl Iterator<Item = (Trait, u8)> + '_ {
        [
            Trait::Analytical,
            Trait::Emotional,
            Trait::Philosophical,
            Trait::Humor,
            Trait::Confidence,
            Trait::Creativity,
            Trait::Sociability,
        ]
        .into_iter()
        .filter_map(|t| self.get(t).map(|v| (t, v)))
    }

}

impl Default for Personality {
    fn default() -> Self {
        Self {
            analytical: Self::BASELINE,
            emotional: Self::BASELINE,
            philosophical: Self::BASELINE,
            humor: Self::BASELINE,
            confidence: Self::BASELINE,
            creativity: None,
            sociability: None,
        }
    }
}

/// A synthesized character: identity plus behavioral profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub character_type: CharacterType,
    pub mood: String,
    pub opening_line: String,
    pub voice_style: String,
    pub personality: Personality,
    #[serde(deserialize_with = "clamped::score")]
    pub talkativeness: u8,
    #[serde(deserialize_with = "clamped::pace")]
    pub thinking_speed: f32,
    pub background: String,
    #[serde(default)]
    pub catchphrases: Vec<String>,
    /// Opaque avatar token for the UI.
    #[serde(default)]
    pub avatar: String,
    /// Archetype profile that drove name and text selection, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archetype: Option<String>,
    /// Cast label assigned when the character was generated as part of a scenario cast.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Character {
    /// Returns true if every numeric attribute is inside its documented range.
    pub fn in_range(&self) -> bool {
        self.personality
            .iter()
            .all(|(_, v)| (TRAIT_MIN..=TRAIT_MAX).contains(&v))
            && (TRAIT_MIN..=TRAIT_MAX).contains(&self.talkativeness)
            && (PACE_MIN..=PACE_MAX).contains(&self.thinking_speed)
    }
}
