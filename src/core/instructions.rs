/// Writing instruction generator: per-turn directives derived from the
/// current story arc and the character about to speak.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::story_arc::ArcContent;
use crate::core::template::Template;
use crate::schema::character::{Character, CharacterType, Trait};
use crate::schema::instructions::{ResponseLength, WritingInstructions, WritingStyle};
use crate::schema::story_arc::{Phase, StoryArc, Tension};

/// A trait above `above` selects `style` and contributes `clause` to the
/// character reminders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleRule {
    #[serde(rename = "trait")]
    pub target: Trait,
    pub above: u8,
    pub style: WritingStyle,
    pub clause: Template,
}

/// Talkativeness bounds for response length.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LengthThresholds {
    pub long_above: u8,
    pub brief_below: u8,
}

impl Default for LengthThresholds {
    fn default() -> Self {
        Self {
            long_above: 7,
            brief_below: 4,
        }
    }
}

/// Guidance for a phase, optionally narrowed to one theme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseNote {
    pub phase: Phase,
    #[serde(default)]
    pub theme: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TensionNote {
    pub tension: Tension,
    pub text: String,
}

/// Instruction tables. Loaded from `instructions.ron`.
///
/// Template slots: `arc_summary` takes `title`, `theme`, `phase`,
/// `tension`, `goal`, `context`; reminders take `name`, `description`,
/// `voice`; the scenario reminder takes `title` and the goal reminder `goal`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstructionContent {
    /// Style rules in priority order; the first rule exceeded wins.
    pub style_rules: Vec<StyleRule>,
    #[serde(default)]
    pub length: LengthThresholds,
    pub arc_summary: Template,
    pub base_reminder: Template,
    pub type_clauses: BTreeMap<CharacterType, Template>,
    pub voice_clause: Template,
    pub notes: Vec<PhaseNote>,
    pub tension_notes: Vec<TensionNote>,
    pub scenario_reminder: Template,
    pub goal_reminder: Template,
}

impl InstructionContent {
    pub fn parse_ron(input: &str) -> Result<InstructionContent, ron::error::SpannedError> {
        ron::from_str(input)
    }

    pub(crate) fn lint(&self, issues: &mut Vec<String>) {
        if self.style_rules.is_empty() {
            issues.push("instructions: no style rules".to_string());
        }
        for t in CharacterType::ALL {
            if !self.type_clauses.contains_key(&t) {
                issues.push(format!("instructions: no type clause for '{}'", t));
            }
        }
        let phases = [
            Phase::Introduction,
            Phase::Discovery,
            Phase::Conflict,
            Phase::Planning,
            Phase::Climax,
            Phase::Resolution,
        ];
        for phase in phases {
            let generic = self
                .notes
                .iter()
                .any(|n| n.phase == phase && n.theme.is_none());
            if !generic {
                issues.push(format!("instructions: no generic note for phase '{}'", phase));
            }
        }
        if self.length.brief_below > self.length.long_above {
            issues.push("instructions: brief_below exceeds long_above".to_string());
        }
    }

    /// Theme-specific note for the phase, else the phase-only note.
    pub fn note_for(&self, phase: Phase, theme: &str) -> Option<&str> {
        self.notes
            .iter()
            .find(|n| {
                n.phase == phase
                    && n.theme
                        .as_deref()
                        .is_some_and(|t| t.eq_ignore_ascii_case(theme))
            })
            .or_else(|| {
                self.notes
                    .iter()
                    .find(|n| n.phase == phase && n.theme.is_none())
            })
            .map(|n| n.text.as_str())
    }
}

/// Pure instruction derivation over borrowed content tables.
#[derive(Debug, Clone, Copy)]
pub struct InstructionGenerator<'a> {
    content: &'a InstructionContent,
    arcs: &'a ArcContent,
}

impl<'a> InstructionGenerator<'a> {
    pub fn new(content: &'a InstructionContent, arcs: &'a ArcContent) -> Self {
        Self { content, arcs }
    }

    /// Never fails. Unless both the arc and the character are present the
    /// result is the all-default record with empty strings.
    pub fn instruct(
        &self,
        arc: Option<&StoryArc>,
        character: Option<&Character>,
    ) -> WritingInstructions {
        let (Some(arc), Some(character)) = (arc, character) else {
            tracing::trace!(
                has_arc = arc.is_some(),
                has_character = character.is_some(),
                "incomplete input, default writing instructions"
            );
            return WritingInstructions::default();
        };
        let out = WritingInstructions {
            story_arc: self.summarize(arc),
            writing_style: self.writing_style(character),
            response_length: self.response_length(character.talkativeness),
            character_reminders: self.character_reminders(character),
            general_notes: self.general_notes(arc),
        };
        tracing::trace!(
            style = ?out.writing_style,
            length = ?out.response_length,
            "writing instructions"
        );
        out
    }

    pub fn writing_style(&self, character: &Character) -> WritingStyle {
        self.content
            .style_rules
            .iter()
            .find(|rule| exceeds(character, rule))
            .map(|rule| rule.style)
            .unwrap_or_default()
    }

    pub fn response_length(&self, talkativeness: u8) -> ResponseLength {
        let bounds = self.content.length;
        if talkativeness > bounds.long_above {
            ResponseLength::Long
        } else if talkativeness < bounds.brief_below {
            ResponseLength::Brief
        } else {
            ResponseLength::Medium
        }
    }

    pub fn character_reminders(&self, character: &Character) -> String {
        let description = predicate(&character.description);
        let slots = [
            ("name", character.name.as_str()),
            ("description", description.as_str()),
            ("voice", character.voice_style.as_str()),
        ];

        let mut parts = vec![self.content.base_reminder.render(&slots)];
        parts.extend(
            self.content
                .style_rules
                .iter()
                .filter(|rule| exceeds(character, rule))
                .map(|rule| rule.clause.render(&slots)),
        );
        if let Some(clause) = self.content.type_clauses.get(&character.character_type) {
            parts.push(clause.render(&slots));
        }
        if !character.voice_style.trim().is_empty() {
            parts.push(self.content.voice_clause.render(&slots));
        }
        parts.retain(|p| !p.trim().is_empty());
        parts.join(" ")
    }

    fn summarize(&self, arc: &StoryArc) -> String {
        let phase = arc.current_phase.to_string();
        let tension = arc.current_tension.to_string();
        self.content.arc_summary.render(&[
            ("title", arc.title.as_str()),
            ("theme", arc.theme.as_str()),
            ("phase", phase.as_str()),
            ("tension", tension.as_str()),
            ("goal", arc.current_goal.as_str()),
            ("context", arc.current_context.as_str()),
        ])
    }

    fn general_notes(&self, arc: &StoryArc) -> String {
        let mut parts: Vec<String> = Vec::new();
        match self.content.note_for(arc.current_phase, &arc.theme) {
            Some(note) => parts.push(note.to_string()),
            None => tracing::debug!(phase = %arc.current_phase, "no note for phase"),
        }
        if let Some(note) = self
            .content
            .tension_notes
            .iter()
            .find(|n| n.tension == arc.current_tension)
        {
            parts.push(note.text.clone());
        }
        if let Some(known) = self.arcs.find_known_scenario(&arc.title) {
            let mut reminder = self
                .content
                .scenario_reminder
                .render(&[("title", known.title.as_str())]);
            if !arc.current_goal.trim().is_empty() {
                reminder.push(' ');
                reminder.push_str(
                    &self
                        .content
                        .goal_reminder
                        .render(&[("goal", arc.current_goal.as_str())]),
                );
            }
            parts.push(reminder);
        }
        parts.join(" ")
    }
}

fn exceeds(character: &Character, rule: &StyleRule) -> bool {
    character
        .personality
        .get(rule.target)
        .is_some_and(|v| v > rule.above)
}

/// Lowercase a leading article so the description reads after "is".
fn predicate(description: &str) -> String {
    let trimmed = description.trim();
    for article in ["A ", "An ", "The "] {
        if let Some(rest) = trimmed.strip_prefix(article) {
            return format!("{}{}", article.to_lowercase(), rest);
        }
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::character::Personality;

    const CONTENT: &str = r#"(
        style_rules: [
            (trait: analytical, above: 7, style: analytical, clause: "{name} reasons carefully."),
            (trait: humor, above: 7, style: witty, clause: "{name} jokes often."),
            (trait: emotional, above: 7, style: emotional, clause: "{name} feels deeply."),
            (trait: philosophical, above: 7, style: philosophical, clause: "{name} ponders meaning."),
            (trait: confidence, above: 8, style: assertive, clause: "{name} speaks with certainty."),
        ],
        arc_summary: "{title}: {phase} ({tension}). {context}",
        base_reminder: "{name} is {description}",
        type_clauses: {
            fantasy: "Use archaic turns of phrase.",
            modern: "Keep references contemporary.",
        },
        voice_clause: "Voice: {voice}.",
        notes: [
            (phase: introduction, text: "Establish the scene."),
            (phase: conflict, text: "Raise the stakes."),
            (phase: conflict, theme: Some("superhero"), text: "Powers clash."),
        ],
        tension_notes: [
            (tension: "high", text: "Keep it urgent."),
            (tension: "very high", text: "Everything hangs by a thread."),
        ],
        scenario_reminder: "This is {title}.",
        goal_reminder: "Goal: {goal}",
    )"#;

    const ARCS: &str = r#"(
        known_scenarios: [(
            title: "Siege of Dawn",
            theme: "fantasy",
            phases: [conflict, resolution],
            initial_phase: conflict,
            tension: "high",
            goal: "Hold the gate.",
            key_characters: [],
            key_locations: [],
            context: "",
            transitions: [],
        )],
        generic_transitions: [],
        theme_defaults: [],
        theme_detection: [],
        general_goal: "Talk.",
        goal_rules: [],
        contexts: [],
        phase_tension: [],
    )"#;

    fn character(personality: Personality, talkativeness: u8) -> Character {
        Character {
            name: "Rook".into(),
            description: "A wry courier.".into(),
            character_type: CharacterType::Fantasy,
            mood: "neutral".into(),
            opening_line: "Package for you.".into(),
            voice_style: "dry".into(),
            personality,
            talkativeness,
            thinking_speed: 1.0,
            background: String::new(),
            catchphrases: vec![],
            avatar: String::new(),
            archetype: None,
            role: None,
        }
    }

    fn fixtures() -> (InstructionContent, ArcContent) {
        (
            InstructionContent::parse_ron(CONTENT).unwrap(),
            ArcContent::parse_ron(ARCS).unwrap(),
        )
    }

    #[test]
    fn humor_nine_is_witty() {
        let (content, arcs) = fixtures();
        let generator = InstructionGenerator::new(&content, &arcs);
        let p = Personality {
            humor: 9,
            ..Personality::default()
        };
        assert_eq!(generator.writing_style(&character(p, 5)), WritingStyle::Witty);
    }

    #[test]
    fn style_priority_and_confidence_threshold() {
        let (content, arcs) = fixtures();
        let generator = InstructionGenerator::new(&content, &arcs);
        let p = Personality {
            analytical: 8,
            humor: 10,
            ..Personality::default()
        };
        assert_eq!(generator.writing_style(&character(p, 5)), WritingStyle::Analytical);

        let p = Personality {
            confidence: 8,
            ..Personality::default()
        };
        assert_eq!(generator.writing_style(&character(p, 5)), WritingStyle::Balanced);
        let p = Personality {
            confidence: 9,
            ..Personality::default()
        };
        assert_eq!(generator.writing_style(&character(p, 5)), WritingStyle::Assertive);
    }

    #[test]
    fn response_length_bounds() {
        let (content, arcs) = fixtures();
        let generator = InstructionGenerator::new(&content, &arcs);
        assert_eq!(generator.response_length(8), ResponseLength::Long);
        assert_eq!(generator.response_length(7), ResponseLength::Medium);
        assert_eq!(generator.response_length(4), ResponseLength::Medium);
        assert_eq!(generator.response_length(3), ResponseLength::Brief);
    }

    #[test]
    fn reminders_compose_clauses() {
        let (content, arcs) = fixtures();
        let generator = InstructionGenerator::new(&content, &arcs);
        let p = Personality {
            humor: 9,
            ..Personality::default()
        };
        assert_eq!(
            generator.character_reminders(&character(p, 5)),
            "Rook is a wry courier. Rook jokes often. Use archaic turns of phrase. Voice: dry."
        );
    }

    #[test]
    fn notes_prefer_theme_then_phase_and_append_reminders() {
        let (content, arcs) = fixtures();
        let generator = InstructionGenerator::new(&content, &arcs);
        let rook = character(Personality::default(), 5);
        let arc = StoryArc {
            title: "Siege of Dawn".into(),
            theme: "fantasy".into(),
            current_phase: Phase::Conflict,
            current_tension: Tension::High,
            current_goal: "Hold the gate.".into(),
            ..StoryArc::default()
        };
        let out = generator.instruct(Some(&arc), Some(&rook));
        assert_eq!(
            out.general_notes,
            "Raise the stakes. Keep it urgent. This is Siege of Dawn. Goal: Hold the gate."
        );
        assert_eq!(out.writing_style, WritingStyle::Balanced);
        assert!(out.story_arc.starts_with("Siege of Dawn: conflict (high)."));
        assert!(out.character_reminders.starts_with("Rook is"));

        let arc = StoryArc {
            theme: "superhero".into(),
            current_phase: Phase::Conflict,
            current_tension: Tension::VeryHigh,
            ..StoryArc::default()
        };
        let out = generator.instruct(Some(&arc), Some(&rook));
        assert_eq!(out.general_notes, "Powers clash. Everything hangs by a thread.");
    }

    #[test]
    fn missing_inputs_give_defaults() {
        let (content, arcs) = fixtures();
        let generator = InstructionGenerator::new(&content, &arcs);
        let arc = StoryArc {
            title: "Siege of Dawn".into(),
            current_phase: Phase::Conflict,
            ..StoryArc::default()
        };
        let p = Personality {
            humor: 9,
            ..Personality::default()
        };
        let witty = character(p, 9);

        assert_eq!(generator.instruct(None, None), WritingInstructions::default());
        assert_eq!(
            generator.instruct(Some(&arc), None),
            WritingInstructions::default()
        );
        let out = generator.instruct(None, Some(&witty));
        assert_eq!(out, WritingInstructions::default());
        assert_eq!(out.writing_style, WritingStyle::Balanced);
        assert_eq!(out.response_length, ResponseLength::Medium);
        assert!(out.character_reminders.is_empty());
        assert!(out.story_arc.is_empty());
    }

    #[test]
    fn lint_requires_type_clauses_and_phase_notes() {
        let (content, _) = fixtures();
        let mut issues = Vec::new();
        content.lint(&mut issues);
        assert!(issues.iter().any(|i| i.contains("type clause for 'scifi'")));
        assert!(issues.iter().any(|i| i.contains("phase 'climax'")));
    }
}
