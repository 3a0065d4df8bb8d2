/// Story arc state machine: initialization by lookup chain and
/// keyword-triggered, forward-only phase advancement.
use serde::{Deserialize, Serialize};

use crate::core::classifier::contains_phrase;
use crate::schema::chat::ChatMessage;
use crate::schema::story_arc::{Phase, StoryArc, Tension};

/// Messages inspected per `advance` call unless configured otherwise.
pub const DEFAULT_MESSAGE_WINDOW: usize = 5;
/// Shortest partial title, in letters and digits, that can select a known scenario.
pub const MIN_TITLE_FRAGMENT: usize = 4;
/// Theme used when nothing can be detected.
pub const GENERAL_THEME: &str = "general";

/// Phase sequence used when no known scenario applies.
pub const GENERIC_PHASES: [Phase; 5] = [
    Phase::Introduction,
    Phase::Conflict,
    Phase::Planning,
    Phase::Climax,
    Phase::Resolution,
];

/// `from → to` when any keyword occurs in the recent conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: Phase,
    pub to: Phase,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseContext {
    pub phase: Phase,
    pub text: String,
}

/// A hand-authored scenario with its own phase list and transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnownScenario {
    pub title: String,
    pub theme: String,
    pub phases: Vec<Phase>,
    pub initial_phase: Phase,
    pub tension: Tension,
    pub goal: String,
    pub key_characters: Vec<String>,
    pub key_locations: Vec<String>,
    /// Further places registered when mentioned in conversation.
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub plot_points: Vec<String>,
    pub context: String,
    pub transitions: Vec<PhaseTransition>,
    #[serde(default)]
    pub contexts: Vec<PhaseContext>,
}

/// Starting state for a recognized theme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeDefaults {
    pub theme: String,
    #[serde(default)]
    pub phase: Phase,
    #[serde(default)]
    pub tension: Tension,
    pub goal: String,
    pub context: String,
    #[serde(default)]
    pub key_locations: Vec<String>,
}

/// Substring rule mapping prompt text to a theme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeDetection {
    pub theme: String,
    pub keywords: Vec<String>,
}

/// Goal refresh rule. `theme: None` applies to every theme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalRule {
    #[serde(default)]
    pub theme: Option<String>,
    pub keywords: Vec<String>,
    pub goal: String,
}

/// Narrative summary for a theme and phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemedContext {
    pub theme: String,
    pub phase: Phase,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTension {
    pub phase: Phase,
    pub tension: Tension,
}

/// Story arc tables. Loaded from `story_arcs.ron`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ArcContent {
    pub known_scenarios: Vec<KnownScenario>,
    pub generic_transitions: Vec<PhaseTransition>,
    pub theme_defaults: Vec<ThemeDefaults>,
    /// Detection rules in priority order.
    pub theme_detection: Vec<ThemeDetection>,
    pub general_goal: String,
    pub goal_rules: Vec<GoalRule>,
    pub contexts: Vec<ThemedContext>,
    pub phase_tension: Vec<PhaseTension>,
    /// Speaker labels never registered as characters.
    #[serde(default)]
    pub ignored_speakers: Vec<String>,
}

impl ArcContent {
    pub fn parse_ron(input: &str) -> Result<ArcContent, ron::error::SpannedError> {
        ron::from_str(input)
    }

    /// Exact title match first, then partial containment either way.
    /// Matching is case-insensitive and on whole words. A fragment of a
    /// known title must be at least [`MIN_TITLE_FRAGMENT`] characters long.
    pub fn find_known_scenario(&self, title: &str) -> Option<&KnownScenario> {
        let wanted = title.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        self.known_scenarios
            .iter()
            .find(|s| s.title.to_lowercase() == wanted)
            .or_else(|| {
                self.known_scenarios.iter().find(|s| {
                    contains_phrase(&wanted, &s.title)
                        || (wanted.chars().filter(|c| c.is_alphanumeric()).count()
                            >= MIN_TITLE_FRAGMENT
                            && contains_phrase(&s.title, &wanted))
                })
            })
    }

    pub fn theme_defaults(&self, theme: &str) -> Option<&ThemeDefaults> {
        self.theme_defaults
            .iter()
            .find(|d| d.theme.eq_ignore_ascii_case(theme))
    }

    /// First detection rule with a keyword in the prompt, else `general`.
    pub fn detect_theme(&self, prompt: &str) -> String {
        let lowered = prompt.to_lowercase();
        self.theme_detection
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| lowered.contains(k.as_str())))
            .map(|rule| rule.theme.clone())
            .unwrap_or_else(|| GENERAL_THEME.to_string())
    }

    pub fn tension_for(&self, phase: Phase) -> Option<Tension> {
        self.phase_tension
            .iter()
            .find(|pt| pt.phase == phase)
            .map(|pt| pt.tension)
    }

    pub(crate) fn lint(&self, issues: &mut Vec<String>) {
        for s in &self.known_scenarios {
            let label = format!("story_arcs: scenario '{}'", s.title);
            lint_phase_table(issues, &label, &s.phases, &s.transitions);
            if !s.phases.contains(&s.initial_phase) {
                issues.push(format!(
                    "{}: initial phase '{}' is not in its phase list",
                    label, s.initial_phase
                ));
            }
        }
        lint_phase_table(
            issues,
            "story_arcs: generic",
            &GENERIC_PHASES,
            &self.generic_transitions,
        );
        for d in &self.theme_defaults {
            if d.theme != d.theme.to_lowercase() {
                issues.push(format!("story_arcs: theme '{}' must be lowercase", d.theme));
            }
        }
        for rule in &self.theme_detection {
            if rule.keywords.iter().any(|k| k.is_empty() || *k != k.to_lowercase()) {
                issues.push(format!(
                    "story_arcs: detection keywords for '{}' must be lowercase and non-empty",
                    rule.theme
                ));
            }
        }
        if self.general_goal.trim().is_empty() {
            issues.push("story_arcs: general_goal is empty".to_string());
        }
    }
}

/// Phases must be strictly increasing in rank and end in resolution;
/// every transition must move to the immediately following phase.
fn lint_phase_table(
    issues: &mut Vec<String>,
    label: &str,
    phases: &[Phase],
    transitions: &[PhaseTransition],
) {
    if phases.last() != Some(&Phase::Resolution) {
        issues.push(format!("{}: phase list must end in resolution", label));
    }
    if phases.windows(2).any(|w| w[0].rank() >= w[1].rank()) {
        issues.push(format!("{}: phases are not in forward order", label));
    }
    for t in transitions {
        let position = phases.iter().position(|p| *p == t.from);
        let follows = position.and_then(|i| phases.get(i + 1)) == Some(&t.to);
        if !follows {
            issues.push(format!(
                "{}: transition {} -> {} does not follow the phase list",
                label, t.from, t.to
            ));
        }
        if t.keywords.is_empty() {
            issues.push(format!(
                "{}: transition {} -> {} has no keywords",
                label, t.from, t.to
            ));
        }
    }
}

/// Transition and context lookup for one arc.
pub trait PhaseTable {
    fn phases(&self) -> &[Phase];

    fn transition_from(&self, phase: Phase) -> Option<&PhaseTransition>;

    /// Narrative summary for `phase`, if the table has one.
    fn context(&self, theme: &str, phase: Phase) -> Option<&str>;
}

/// Backed by a known scenario, falling back to the themed context table.
pub struct ScenarioPhaseTable<'a> {
    scenario: &'a KnownScenario,
    content: &'a ArcContent,
}

impl<'a> ScenarioPhaseTable<'a> {
    pub fn new(scenario: &'a KnownScenario, content: &'a ArcContent) -> Self {
        Self { scenario, content }
    }
}

impl PhaseTable for ScenarioPhaseTable<'_> {
    fn phases(&self) -> &[Phase] {
        &self.scenario.phases
    }

    /// The scenario's own transition, else the generic one for the phase.
    fn transition_from(&self, phase: Phase) -> Option<&PhaseTransition> {
        self.scenario
            .transitions
            .iter()
            .find(|t| t.from == phase)
            .or_else(|| generic_transition(self.content, phase))
    }

    fn context(&self, theme: &str, phase: Phase) -> Option<&str> {
        self.scenario
            .contexts
            .iter()
            .find(|c| c.phase == phase)
            .map(|c| c.text.as_str())
            .or_else(|| themed_context(self.content, theme, phase))
    }
}

/// The five-phase fallback.
pub struct GenericPhaseTable<'a> {
    content: &'a ArcContent,
}

impl<'a> GenericPhaseTable<'a> {
    pub fn new(content: &'a ArcContent) -> Self {
        Self { content }
    }
}

impl PhaseTable for GenericPhaseTable<'_> {
    fn phases(&self) -> &[Phase] {
        &GENERIC_PHASES
    }

    fn transition_from(&self, phase: Phase) -> Option<&PhaseTransition> {
        generic_transition(self.content, phase)
    }

    fn context(&self, theme: &str, phase: Phase) -> Option<&str> {
        themed_context(self.content, theme, phase)
    }
}

fn generic_transition(content: &ArcContent, phase: Phase) -> Option<&PhaseTransition> {
    content.generic_transitions.iter().find(|t| t.from == phase)
}

fn themed_context<'c>(content: &'c ArcContent, theme: &str, phase: Phase) -> Option<&'c str> {
    content
        .contexts
        .iter()
        .find(|c| c.phase == phase && c.theme.eq_ignore_ascii_case(theme))
        .map(|c| c.text.as_str())
}

/// Creates and advances [`StoryArc`] values. Never mutates its input.
#[derive(Debug, Clone, Copy)]
pub struct StoryArcMachine<'a> {
    content: &'a ArcContent,
    window: usize,
}

impl<'a> StoryArcMachine<'a> {
    pub fn new(content: &'a ArcContent) -> Self {
        Self {
            content,
            window: DEFAULT_MESSAGE_WINDOW,
        }
    }

    /// Number of trailing messages inspected by [`advance`](Self::advance).
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window.max(1);
        self
    }

    /// Build the starting arc.
    ///
    /// Lookup chain: known scenario by title, then theme defaults for
    /// the given theme, then theme detection over the prompt.
    pub fn initialize(&self, title: &str, prompt: &str, theme: &str) -> StoryArc {
        if let Some(known) = self.content.find_known_scenario(title) {
            tracing::debug!(scenario = %known.title, "story arc seeded from known scenario");
            return StoryArc {
                title: known.title.clone(),
                theme: known.theme.clone(),
                current_phase: known.initial_phase,
                current_tension: known.tension,
                current_goal: known.goal.clone(),
                key_characters: known.key_characters.clone(),
                key_locations: known.key_locations.clone(),
                plot_points: known.plot_points.clone(),
                current_context: known.context.clone(),
                previous_context: String::new(),
            };
        }

        let theme = theme.trim().to_lowercase();
        if let Some(defaults) = self.content.theme_defaults(&theme) {
            tracing::debug!(theme = %theme, "story arc seeded from theme defaults");
            return StoryArc {
                title: title.trim().to_string(),
                theme,
                current_phase: defaults.phase,
                current_tension: defaults.tension,
                current_goal: defaults.goal.clone(),
                key_locations: defaults.key_locations.clone(),
                current_context: defaults.context.clone(),
                ..StoryArc::default()
            };
        }

        let detected = self.content.detect_theme(prompt);
        tracing::debug!(theme = %detected, "story arc theme detected from prompt");
        let goal = self
            .content
            .theme_defaults(&detected)
            .map(|d| d.goal.clone())
            .unwrap_or_else(|| self.content.general_goal.clone());
        StoryArc {
            title: title.trim().to_string(),
            theme: detected,
            current_goal: goal,
            current_context: prompt.trim().to_string(),
            ..StoryArc::default()
        }
    }

    /// Inspect the trailing message window and return the next arc.
    ///
    /// At most one forward transition per call; resolution is final.
    /// Goal and context refresh independently of the transition.
    pub fn advance(&self, arc: &StoryArc, messages: &[ChatMessage]) -> StoryArc {
        let mut next = arc.clone();
        let start = messages.len().saturating_sub(self.window);
        let recent = &messages[start..];
        if recent.is_empty() {
            return next;
        }

        // One lowercase haystack for every keyword check
        let text = recent
            .iter()
            .map(|m| m.message.as_str())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        // Register speakers
        for m in recent {
            let speaker = m.speaker.trim();
            let ignored = self
                .content
                .ignored_speakers
                .iter()
                .any(|s| s.eq_ignore_ascii_case(speaker));
            if !ignored && next.add_character(speaker) {
                tracing::trace!(speaker = %speaker, "registered key character");
            }
        }

        // Locations are only tracked for known scenarios
        let known = self.content.find_known_scenario(&arc.title);
        if let Some(known) = known {
            for location in known.key_locations.iter().chain(&known.locations) {
                if text.contains(&location.to_lowercase()) {
                    next.add_location(location);
                }
            }
        }

        let scenario_table;
        let generic_table = GenericPhaseTable::new(self.content);
        let table: &dyn PhaseTable = match known {
            Some(known) => {
                scenario_table = ScenarioPhaseTable::new(known, self.content);
                &scenario_table
            }
            None => &generic_table,
        };

        self.transition(&mut next, table, &text);
        self.refresh_goal(&mut next, &text);

        // Keep the old context when the new phase has none
        if let Some(context) = table.context(&next.theme, next.current_phase) {
            if context != next.current_context {
                next.previous_context = std::mem::replace(&mut next.current_context, context.to_string());
            }
        }

        next
    }

    fn transition(&self, arc: &mut StoryArc, table: &dyn PhaseTable, text: &str) {
        let from = arc.current_phase;
        if from.is_terminal() {
            return;
        }
        let Some(transition) = table.transition_from(from) else {
            tracing::trace!(phase = %from, "no transition defined for phase");
            return;
        };
        if transition.to.rank() <= from.rank() {
            tracing::warn!(from = %from, to = %transition.to, "ignoring backward transition");
            return;
        }
        let Some(trigger) = transition
            .keywords
            .iter()
            .find(|k| !k.is_empty() && text.contains(&k.to_lowercase()))
        else {
            return;
        };

        arc.current_phase = transition.to;
        if let Some(tension) = self.content.tension_for(transition.to) {
            arc.current_tension = tension;
        }
        arc.plot_points.push(format!(
            "The story moved from {} to {} ({}).",
            from, transition.to, trigger
        ));
        tracing::debug!(from = %from, to = %transition.to, trigger = %trigger, "phase transition");
    }

    fn refresh_goal(&self, arc: &mut StoryArc, text: &str) {
        let rule = self.content.goal_rules.iter().find(|rule| {
            rule.theme
                .as_deref()
                .map_or(true, |t| t.eq_ignore_ascii_case(&arc.theme))
                && rule.keywords.iter().any(|k| text.contains(&k.to_lowercase()))
        });
        if let Some(rule) = rule {
            if arc.current_goal != rule.goal {
                tracing::debug!(goal = %rule.goal, "goal refreshed");
                arc.current_goal = rule.goal.clone();
            }
        }
    }
}
