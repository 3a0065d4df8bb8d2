/// Trait and attribute derivation: ordered keyword rules mapped onto
/// personality scores and categorical attributes.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::classifier::{Classification, ThemeKeywords};
use crate::schema::character::{
    clamp_pace, clamp_trait, CharacterType, Personality, Trait, TRAIT_MAX, TRAIT_MIN,
};

/// Baseline talkativeness before any pace rule applies.
pub const BASE_TALKATIVENESS: u8 = 5;
/// Baseline thinking speed multiplier.
pub const BASE_THINKING_SPEED: f32 = 1.0;
/// Mood label used when nothing matches.
pub const DEFAULT_MOOD: &str = "neutral";

/// A full personality vector tied to an archetype keyword.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchetypeBundle {
    pub archetype: String,
    pub keywords: Vec<String>,
    pub personality: Personality,
}

/// Generic `keywords → trait = value` adjustment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraitAdjustment {
    pub keywords: Vec<String>,
    #[serde(rename = "trait")]
    pub target: Trait,
    pub value: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoodRule {
    pub mood: String,
    pub keywords: Vec<String>,
}

/// Verbosity and speed nudges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaceRule {
    pub keywords: Vec<String>,
    #[serde(default)]
    pub talkativeness: Option<u8>,
    #[serde(default)]
    pub speed_factor: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceStyleRule {
    pub keyword: String,
    pub style: String,
}

/// Personality rule tables. Loaded from `personality.ron`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PersonalityRules {
    /// Archetype bundles in priority order.
    pub bundles: Vec<ArchetypeBundle>,
    pub adjustments: Vec<TraitAdjustment>,
    pub moods: Vec<MoodRule>,
    pub pace: Vec<PaceRule>,
    pub voice_styles: Vec<VoiceStyleRule>,
    pub default_voices: BTreeMap<CharacterType, String>,
}

impl PersonalityRules {
    pub fn parse_ron(input: &str) -> Result<PersonalityRules, ron::error::SpannedError> {
        ron::from_str(input)
    }

    pub(crate) fn lint(&self, issues: &mut Vec<String>) {
        for bundle in &self.bundles {
            let p = &bundle.personality;
            if p.creativity.is_none() || p.sociability.is_none() {
                issues.push(format!(
                    "personality: bundle '{}' must define all seven traits",
                    bundle.archetype
                ));
            }
            if p.iter().any(|(_, v)| !(TRAIT_MIN..=TRAIT_MAX).contains(&v)) {
                issues.push(format!(
                    "personality: bundle '{}' has a trait outside {}..={}",
                    bundle.archetype, TRAIT_MIN, TRAIT_MAX
                ));
            }
        }
        for t in CharacterType::ALL {
            if !self.default_voices.contains_key(&t) {
                issues.push(format!("personality: no default voice for type '{}'", t));
            }
        }
    }
}

/// What one rule contributes. Unset fields leave earlier values alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialAttributes {
    pub character_type: Option<CharacterType>,
    pub mood: Option<String>,
    pub traits: Vec<(Trait, u8)>,
    pub talkativeness: Option<u8>,
    pub speed_factor: Option<f32>,
    pub voice_style: Option<String>,
}

impl PartialAttributes {
    /// Fold `later` over `self`: later values override, trait settings
    /// accumulate in order and speed factors multiply.
    pub fn merge(mut self, later: PartialAttributes) -> PartialAttributes {
        if later.character_type.is_some() {
            self.character_type = later.character_type;
        }
        if later.mood.is_some() {
            self.mood = later.mood;
        }
        self.traits.extend(later.traits);
        if later.talkativeness.is_some() {
            self.talkativeness = later.talkativeness;
        }
        self.speed_factor = match (self.speed_factor, later.speed_factor) {
            (Some(a), Some(b)) => Some(a * b),
            (a, b) => b.or(a),
        };
        if later.voice_style.is_some() {
            self.voice_style = later.voice_style;
        }
        self
    }
}

/// A pure classification rule.
pub trait AttributeRule {
    fn apply(&self, classification: &Classification) -> Option<PartialAttributes>;
}

impl AttributeRule for ThemeKeywords {
    fn apply(&self, c: &Classification) -> Option<PartialAttributes> {
        c.contains_any(&self.keywords).then(|| PartialAttributes {
            character_type: Some(self.genre),
            ..PartialAttributes::default()
        })
    }
}

impl AttributeRule for ArchetypeBundle {
    fn apply(&self, c: &Classification) -> Option<PartialAttributes> {
        c.contains_any(&self.keywords).then(|| PartialAttributes {
            traits: self.personality.iter().collect(),
            ..PartialAttributes::default()
        })
    }
}

impl AttributeRule for TraitAdjustment {
    fn apply(&self, c: &Classification) -> Option<PartialAttributes> {
        c.contains_any(&self.keywords).then(|| PartialAttributes {
            traits: vec![(self.target, self.value)],
            ..PartialAttributes::default()
        })
    }
}

impl AttributeRule for MoodRule {
    fn apply(&self, c: &Classification) -> Option<PartialAttributes> {
        c.contains_any(&self.keywords).then(|| PartialAttributes {
            mood: Some(self.mood.clone()),
            ..PartialAttributes::default()
        })
    }
}

impl AttributeRule for PaceRule {
    fn apply(&self, c: &Classification) -> Option<PartialAttributes> {
        c.contains_any(&self.keywords).then(|| PartialAttributes {
            talkativeness: self.talkativeness,
            speed_factor: self.speed_factor,
            ..PartialAttributes::default()
        })
    }
}

impl AttributeRule for VoiceStyleRule {
    fn apply(&self, c: &Classification) -> Option<PartialAttributes> {
        c.contains(&self.keyword).then(|| PartialAttributes {
            voice_style: Some(self.style.clone()),
            ..PartialAttributes::default()
        })
    }
}

/// How rules inside a group combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precedence {
    /// Evaluate in order and stop at the first rule that fires.
    FirstMatch,
    /// Evaluate every rule; later results override earlier ones.
    Layered,
}

/// An ordered list of rules with one precedence policy.
pub struct RuleGroup<'a> {
    pub precedence: Precedence,
    pub rules: Vec<&'a dyn AttributeRule>,
}

impl<'a> RuleGroup<'a> {
    pub fn new(precedence: Precedence, rules: Vec<&'a dyn AttributeRule>) -> Self {
        Self { precedence, rules }
    }

    /// Returns `None` when no rule in the group fired.
    pub fn evaluate(&self, c: &Classification) -> Option<PartialAttributes> {
        match self.precedence {
            Precedence::FirstMatch => self.rules.iter().find_map(|r| r.apply(c)),
            Precedence::Layered => self
                .rules
                .iter()
                .filter_map(|r| r.apply(c))
                .reduce(PartialAttributes::merge),
        }
    }
}

/// Fully resolved attributes for a character.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedAttributes {
    pub character_type: CharacterType,
    pub mood: String,
    pub personality: Personality,
    pub talkativeness: u8,
    pub thinking_speed: f32,
    pub voice_style: String,
}

/// Derives [`DerivedAttributes`] from a classification.
///
/// Rule groups, in order:
/// 1. genre themes, first match (combat is a scenario-only genre and skipped)
/// 2. archetype bundles, layered
/// 3. generic trait adjustments, layered, only when no bundle fired
/// 4. moods, first match
/// 5. pace, layered
/// 6. literal voice styles, first match
pub struct AttributeDeriver<'a> {
    rules: &'a PersonalityRules,
    themes: &'a [ThemeKeywords],
}

impl<'a> AttributeDeriver<'a> {
    pub fn new(rules: &'a PersonalityRules, themes: &'a [ThemeKeywords]) -> Self {
        Self { rules, themes }
    }

    pub fn theme_group(&self) -> RuleGroup<'a> {
        RuleGroup::new(
            Precedence::FirstMatch,
            self.themes
                .iter()
                .filter(|t| t.genre != CharacterType::Combat)
                .map(|t| t as &dyn AttributeRule)
                .collect(),
        )
    }

    pub fn bundle_group(&self) -> RuleGroup<'a> {
        RuleGroup::new(
            Precedence::Layered,
            self.rules
                .bundles
                .iter()
                .map(|b| b as &dyn AttributeRule)
                .collect(),
        )
    }

    pub fn adjustment_group(&self) -> RuleGroup<'a> {
        RuleGroup::new(
            Precedence::Layered,
            self.rules
                .adjustments
                .iter()
                .map(|a| a as &dyn AttributeRule)
                .collect(),
        )
    }

    pub fn derive(&self, c: &Classification) -> DerivedAttributes {
        let theme = self.theme_group().evaluate(c);
        let personality_patch = self
            .bundle_group()
            .evaluate(c)
            .or_else(|| self.adjustment_group().evaluate(c));
        let mood = RuleGroup::new(
            Precedence::FirstMatch,
            self.rules.moods.iter().map(|m| m as &dyn AttributeRule).collect(),
        )
        .evaluate(c);
        let pace = RuleGroup::new(
            Precedence::Layered,
            self.rules.pace.iter().map(|p| p as &dyn AttributeRule).collect(),
        )
        .evaluate(c);
        let voice = RuleGroup::new(
            Precedence::FirstMatch,
            self.rules
                .voice_styles
                .iter()
                .map(|v| v as &dyn AttributeRule)
                .collect(),
        )
        .evaluate(c);

        let merged = [theme, personality_patch, mood, pace, voice]
            .into_iter()
            .flatten()
            .fold(PartialAttributes::default(), PartialAttributes::merge);

        self.finalize(merged)
    }

    fn finalize(&self, patch: PartialAttributes) -> DerivedAttributes {
        let character_type = patch.character_type.unwrap_or_default();

        let mut personality = Personality::default();
        for (t, v) in &patch.traits {
            personality.set(*t, *v as i32);
        }

        let talkativeness =
            clamp_trait(patch.talkativeness.unwrap_or(BASE_TALKATIVENESS) as i32);
        let thinking_speed = clamp_pace(BASE_THINKING_SPEED * patch.speed_factor.unwrap_or(1.0));

        let voice_style = patch
            .voice_style
            .or_else(|| self.rules.default_voices.get(&character_type).cloned())
            .unwrap_or_else(|| "natural and conversational".to_string());

        DerivedAttributes {
            character_type,
            mood: patch.mood.unwrap_or_else(|| DEFAULT_MOOD.to_string()),
            personality,
            talkativeness,
            thinking_speed,
            voice_style,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::{KeywordClassifier, Lexicon};

    const LEXICON: &str = r#"(
        themes: [
            (genre: combat, keywords: ["battle", "ninja"]),
            (genre: fantasy, keywords: ["dragon", "wizard"]),
            (genre: scifi, keywords: ["space", "robot"]),
        ],
        archetypes: [],
        traits: [],
        franchises: [],
    )"#;

    const RULES: &str = r#"(
        bundles: [
            (archetype: "ninja", keywords: ["ninja"], personality: (analytical: 7, emotional: 3, philosophical: 6, humor: 2, confidence: 8, creativity: Some(6), sociability: Some(2))),
            (archetype: "angry", keywords: ["angry"], personality: (analytical: 3, emotional: 9, philosophical: 2, humor: 2, confidence: 7, creativity: Some(4), sociability: Some(2))),
        ],
        adjustments: [
            (keywords: ["smart", "clever"], trait: analytical, value: 9),
            (keywords: ["funny"], trait: humor, value: 9),
            (keywords: ["clever"], trait: analytical, value: 7),
            (keywords: ["reckless"], trait: confidence, value: 14),
        ],
        moods: [
            (mood: "happy", keywords: ["happy", "funny"]),
            (mood: "calm", keywords: ["calm"]),
        ],
        pace: [
            (keywords: ["talkative"], talkativeness: Some(8)),
            (keywords: ["quiet"], talkativeness: Some(2)),
            (keywords: ["quick"], speed_factor: Some(1.5)),
            (keywords: ["slow"], speed_factor: Some(0.7)),
        ],
        voice_styles: [
            (keyword: "formal", style: "formal and precise"),
        ],
        default_voices: {
            fantasy: "archaic and lyrical",
            scifi: "clipped and technical",
            historical: "measured",
            modern: "casual",
            superhero: "bold",
            adventure: "eager",
            romance: "warm",
            combat: "terse",
        },
    )"#;

    fn derive(text: &str) -> DerivedAttributes {
        let lexicon = Lexicon::parse_ron(LEXICON).unwrap();
        let rules = PersonalityRules::parse_ron(RULES).unwrap();
        let c = KeywordClassifier::new(&lexicon).classify(text);
        AttributeDeriver::new(&rules, &lexicon.themes).derive(&c)
    }

    #[test]
    fn empty_input_gives_baseline() {
        let d = derive("");
        assert_eq!(d.character_type, CharacterType::Modern);
        assert_eq!(d.mood, DEFAULT_MOOD);
        assert_eq!(d.personality, Personality::default());
        assert_eq!(d.talkativeness, BASE_TALKATIVENESS);
        assert_eq!(d.thinking_speed, BASE_THINKING_SPEED);
        assert_eq!(d.voice_style, "casual");
    }

    #[test]
    fn combat_theme_is_not_a_character_type() {
        assert_eq!(derive("ninja battle").character_type, CharacterType::Modern);
        assert_eq!(derive("ninja dragon").character_type, CharacterType::Fantasy);
    }

    #[test]
    fn theme_priority_first_match() {
        assert_eq!(derive("robot wizard").character_type, CharacterType::Fantasy);
        assert_eq!(derive("space robot").character_type, CharacterType::Scifi);
    }

    #[test]
    fn later_bundle_overrides_earlier() {
        let d = derive("ninja angry");
        assert_eq!(d.personality.emotional, 9);
        assert_eq!(d.personality.sociability, Some(2));
        assert_eq!(d.personality.creativity, Some(4));
    }

    #[test]
    fn bundle_skips_generic_adjustments() {
        let d = derive("smart ninja");
        assert_eq!(d.personality.analytical, 7);
    }

    #[test]
    fn adjustments_layer_in_listed_order_and_clamp() {
        // "clever" appears in two rules; the later value wins.
        assert_eq!(derive("clever").personality.analytical, 7);
        assert_eq!(derive("smart").personality.analytical, 9);
        assert_eq!(derive("reckless").personality.confidence, TRAIT_MAX);
        assert_eq!(derive("funny").personality.humor, 9);
    }

    #[test]
    fn mood_first_match() {
        assert_eq!(derive("calm funny").mood, "happy");
        assert_eq!(derive("calm").mood, "calm");
    }

    #[test]
    fn pace_rules_nudge_and_multiply() {
        let d = derive("talkative quick");
        assert_eq!(d.talkativeness, 8);
        assert!((d.thinking_speed - 1.5).abs() < f32::EPSILON);

        let d = derive("quiet slow");
        assert_eq!(d.talkativeness, 2);
        assert!((d.thinking_speed - 0.7).abs() < 1e-6);

        let d = derive("quick slow");
        assert!((d.thinking_speed - 1.05).abs() < 1e-6);
    }

    #[test]
    fn voice_style_literal_then_type_default() {
        assert_eq!(derive("formal wizard").voice_style, "formal and precise");
        assert_eq!(derive("wizard").voice_style, "archaic and lyrical");
    }

    #[test]
    fn merge_prefers_later_values() {
        let a = PartialAttributes {
            mood: Some("sad".into()),
            speed_factor: Some(2.0),
            ..Default::default()
        };
        let b = PartialAttributes {
            mood: Some("happy".into()),
            speed_factor: Some(0.5),
            ..Default::default()
        };
        let merged = a.merge(b);
        assert_eq!(merged.mood.as_deref(), Some("happy"));
        assert_eq!(merged.speed_factor, Some(1.0));
    }

    #[test]
    fn lint_requires_full_bundles_and_default_voices() {
        let mut rules = PersonalityRules::parse_ron(RULES).unwrap();
        rules.bundles[0].personality.creativity = None;
        rules.default_voices.remove(&CharacterType::Romance);
        let mut issues = Vec::new();
        rules.lint(&mut issues);
        assert_eq!(issues.len(), 2);
    }
}
