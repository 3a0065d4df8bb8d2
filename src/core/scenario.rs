/// Scenario synthesis: genre templates, franchise variants and diverse casts.
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::character::{capitalize, lint_pool, CharacterSynthesizer};
use crate::core::classifier::Classification;
use crate::core::library::ContentLibrary;
use crate::core::template::Template;
use crate::schema::character::{Character, CharacterType};
use crate::schema::scenario::{Scenario, ScenarioFocus, ScenarioType};

/// Cast size used when the caller does not choose one.
pub const DEFAULT_CAST_SIZE: usize = 3;
/// Keyword tokens substituted into scenario templates.
const MAX_SUBJECTS: usize = 3;
const SUBJECT_SLOTS: [&str; MAX_SUBJECTS] = ["first", "second", "third"];
const FALLBACK_BACKGROUND: &str = "linear-gradient(135deg, #667eea 0%, #764ba2 100%)";

/// Title, description and prompt for one scenario type.
///
/// Slots `{first}`, `{second}`, `{third}` take keyword tokens as typed;
/// `{First}`, `{Second}`, `{Third}` take them capitalized. Missing tokens
/// use `defaults` in the same position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioTemplate {
    pub title: Template,
    pub description: Template,
    pub prompt: Template,
    pub defaults: Vec<String>,
}

/// Dedicated lexicon for a recognized franchise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FranchiseLexicon {
    pub name: String,
    pub genre: CharacterType,
    /// Keyword fed to cast synthesis so members pick up the franchise genre.
    pub theme_keyword: String,
    pub settings: Vec<String>,
    pub characters: Vec<String>,
    pub items: Vec<String>,
    pub themes: Vec<String>,
    /// Image reference per focus, indexed by [`ScenarioFocus::index`].
    pub backgrounds: Vec<String>,
    pub cast_roles: Vec<String>,
    pub cast_kinds: Vec<String>,
}

/// Title, description and prompt for one focus axis.
///
/// Slots: `{setting}`, `{character}`, `{item}`, `{theme}`, `{franchise}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusTemplate {
    pub focus: ScenarioFocus,
    pub title: Template,
    pub description: Template,
    pub prompt: Template,
}

/// Label pools sampled without replacement when building a cast.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CastPools {
    pub roles: Vec<String>,
    pub kinds: Vec<String>,
    pub emphases: Vec<String>,
}

/// Scenario templates and palettes. Loaded from `scenarios.ron`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScenarioContent {
    pub templates: BTreeMap<ScenarioType, ScenarioTemplate>,
    pub palettes: BTreeMap<ScenarioType, Vec<String>>,
    pub franchises: Vec<FranchiseLexicon>,
    pub focus_templates: Vec<FocusTemplate>,
    pub cast: CastPools,
}

impl ScenarioContent {
    pub fn parse_ron(input: &str) -> Result<ScenarioContent, ron::error::SpannedError> {
        ron::from_str(input)
    }

    pub fn franchise(&self, name: &str) -> Option<&FranchiseLexicon> {
        self.franchises.iter().find(|f| f.name == name)
    }

    pub fn focus_template(&self, focus: ScenarioFocus) -> Option<&FocusTemplate> {
        self.focus_templates.iter().find(|t| t.focus == focus)
    }

    pub(crate) fn lint(&self, issues: &mut Vec<String>) {
        for t in CharacterType::ALL {
            let st = ScenarioType::from(t);
            match self.palettes.get(&st) {
                Some(p) => lint_pool(issues, &format!("scenarios: palette '{}'", st), "gradients", p.len(), 3),
                None => issues.push(format!("scenarios: no palette for type '{}'", st)),
            }
            if !self.templates.contains_key(&st) {
                issues.push(format!("scenarios: no template for type '{}'", st));
            }
        }
        if !self.templates.contains_key(&ScenarioType::Casual) {
            issues.push("scenarios: no template for type 'casual'".to_string());
        }
        for (st, template) in &self.templates {
            if template.defaults.len() < MAX_SUBJECTS {
                issues.push(format!(
                    "scenarios: template '{}' needs {} defaults",
                    st, MAX_SUBJECTS
                ));
            }
        }
        for focus in ScenarioFocus::ALL {
            if self.focus_template(focus).is_none() {
                issues.push(format!("scenarios: no focus template for {:?}", focus));
            }
        }
        for f in &self.franchises {
            let label = format!("scenarios: franchise '{}'", f.name);
            lint_pool(issues, &label, "settings", f.settings.len(), 1);
            lint_pool(issues, &label, "characters", f.characters.len(), 1);
            lint_pool(issues, &label, "items", f.items.len(), 1);
            lint_pool(issues, &label, "themes", f.themes.len(), 1);
            lint_pool(issues, &label, "backgrounds", f.backgrounds.len(), ScenarioFocus::ALL.len());
            lint_pool(issues, &label, "cast_roles", f.cast_roles.len(), DEFAULT_CAST_SIZE);
            lint_pool(issues, &label, "cast_kinds", f.cast_kinds.len(), DEFAULT_CAST_SIZE);
        }
        lint_pool(issues, "scenarios: cast", "roles", self.cast.roles.len(), DEFAULT_CAST_SIZE);
        lint_pool(issues, "scenarios: cast", "kinds", self.cast.kinds.len(), DEFAULT_CAST_SIZE);
        lint_pool(issues, "scenarios: cast", "emphases", self.cast.emphases.len(), DEFAULT_CAST_SIZE);
    }
}

/// Composes [`Scenario`] records and their casts.
#[derive(Clone, Copy)]
pub struct ScenarioSynthesizer<'a> {
    library: &'a ContentLibrary,
    characters: CharacterSynthesizer<'a>,
    cast_size: usize,
}

impl<'a> ScenarioSynthesizer<'a> {
    pub fn new(library: &'a ContentLibrary) -> Self {
        Self {
            library,
            characters: CharacterSynthesizer::new(library),
            cast_size: DEFAULT_CAST_SIZE,
        }
    }

    /// Number of characters generated per scenario (at least one).
    pub fn with_cast_size(mut self, cast_size: usize) -> Self {
        self.cast_size = cast_size.max(1);
        self
    }

    /// Build a scenario from keywords using the genre templates.
    pub fn synthesize_scenario<R: Rng + ?Sized>(&self, keywords: &str, rng: &mut R) -> Scenario {
        let classification = self.library.classifier().classify(keywords);
        self.scenario_from(&classification, keywords, rng)
    }

    /// Quick flow: three franchise variants (action, mystery, character)
    /// when a franchise is recognized, otherwise three genre scenarios.
    pub fn quick_scenarios<R: Rng + ?Sized>(&self, keywords: &str, rng: &mut R) -> Vec<Scenario> {
        let classification = self.library.classifier().classify(keywords);
        let lexicon = classification
            .franchise
            .as_deref()
            .and_then(|name| self.library.scenarios.franchise(name));

        match lexicon {
            Some(lexicon) => {
                tracing::debug!(franchise = %lexicon.name, "quick scenarios from franchise lexicon");
                ScenarioFocus::ALL
                    .iter()
                    .map(|focus| self.franchise_scenario(lexicon, *focus, rng))
                    .collect()
            }
            None => (0..ScenarioFocus::ALL.len())
                .map(|_| self.scenario_from(&classification, keywords, rng))
                .collect(),
        }
    }

    /// Compose `count` characters with distinct role, kind and emphasis
    /// labels while the pools allow it.
    pub fn synthesize_cast<R: Rng + ?Sized>(
        &self,
        keywords: &str,
        count: usize,
        rng: &mut R,
    ) -> Vec<Character> {
        let pools = &self.library.scenarios.cast;
        self.compose_cast(&pools.roles, &pools.kinds, keywords, count, rng)
    }

    /// Compose a cast strictly from a franchise lexicon; scenario keywords
    /// are not mixed in.
    pub fn franchise_cast<R: Rng + ?Sized>(
        &self,
        lexicon: &FranchiseLexicon,
        count: usize,
        rng: &mut R,
    ) -> Vec<Character> {
        self.compose_cast(
            &lexicon.cast_roles,
            &lexicon.cast_kinds,
            &lexicon.theme_keyword,
            count,
            rng,
        )
    }

    /// Genre of a scenario: first theme in lexicon order (combat is listed
    /// first), `modern` when nothing matches, `casual` for empty input.
    pub fn scenario_type(&self, classification: &Classification) -> ScenarioType {
        if classification.is_empty() {
            return ScenarioType::Casual;
        }
        self.library
            .lexicon
            .themes
            .iter()
            .find(|t| classification.contains_any(&t.keywords))
            .map(|t| ScenarioType::from(t.genre))
            .unwrap_or(ScenarioType::Modern)
    }

    /// Up to three keyword tokens usable as template subjects.
    pub fn subjects(&self, classification: &Classification) -> Vec<String> {
        let stopwords = &self.library.lexicon.stopwords;
        classification
            .tokens
            .iter()
            .filter(|t| !stopwords.contains(t))
            .take(MAX_SUBJECTS)
            .cloned()
            .collect()
    }

    /// Uniform pick from the type's gradient palette.
    pub fn background<R: Rng + ?Sized>(&self, scenario_type: ScenarioType, rng: &mut R) -> String {
        let palettes = &self.library.scenarios.palettes;
        palettes
            .get(&scenario_type)
            .or_else(|| palettes.get(&ScenarioType::Modern))
            .and_then(|p| p.choose(rng))
            .cloned()
            .unwrap_or_else(|| FALLBACK_BACKGROUND.to_string())
    }

    fn scenario_from<R: Rng + ?Sized>(
        &self,
        classification: &Classification,
        keywords: &str,
        rng: &mut R,
    ) -> Scenario {
        let scenario_type = self.scenario_type(classification);
        let subjects = self.subjects(classification);
        let templates = &self.library.scenarios.templates;
        let template = templates
            .get(&scenario_type)
            .or_else(|| templates.get(&ScenarioType::Modern));

        let (title, description, prompt) = match template {
            Some(t) => {
                let values: Vec<String> = (0..MAX_SUBJECTS)
                    .map(|i| {
                        subjects
                            .get(i)
                            .or_else(|| t.defaults.get(i))
                            .cloned()
                            .unwrap_or_default()
                    })
                    .collect();
                let resolve = |slot: &str| subject_slot(slot, &values);
                (
                    t.title.render_with(resolve),
                    t.description.render_with(resolve),
                    t.prompt.render_with(resolve),
                )
            }
            None => {
                tracing::warn!(scenario_type = %scenario_type, "no scenario template, using plain text");
                (
                    format!("A {} Story", capitalize(scenario_type.as_str())),
                    format!("A {} scenario.", scenario_type),
                    "Introduce yourselves.".to_string(),
                )
            }
        };

        let background = self.background(scenario_type, rng);
        let characters = self.synthesize_cast(keywords, self.cast_size, rng);

        tracing::debug!(title = %title, scenario_type = %scenario_type, "synthesized scenario");

        Scenario {
            title,
            description,
            prompt,
            scenario_type,
            background,
            franchise: None,
            focus: None,
            characters,
        }
    }

    fn franchise_scenario<R: Rng + ?Sized>(
        &self,
        lexicon: &FranchiseLexicon,
        focus: ScenarioFocus,
        rng: &mut R,
    ) -> Scenario {
        let pick = |pool: &[String], rng: &mut R| {
            pool.choose(rng)
                .cloned()
                .unwrap_or_else(|| lexicon.name.clone())
        };
        let setting = pick(&lexicon.settings, rng);
        let character = pick(&lexicon.characters, rng);
        let item = pick(&lexicon.items, rng);
        let theme = pick(&lexicon.themes, rng);
        let franchise = lexicon
            .name
            .split_whitespace()
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" ");

        let slots = [
            ("setting", setting.as_str()),
            ("character", character.as_str()),
            ("item", item.as_str()),
            ("theme", theme.as_str()),
            ("franchise", franchise.as_str()),
        ];
        let (title, description, prompt) = match self.library.scenarios.focus_template(focus) {
            Some(t) => (
                t.title.render(&slots),
                t.description.render(&slots),
                t.prompt.render(&slots),
            ),
            None => (
                format!("{}: {}", franchise, setting),
                format!("An adventure in the {} universe.", franchise),
                format!("You find yourselves in the {}.", setting),
            ),
        };

        let scenario_type = ScenarioType::from(lexicon.genre);
        let background = lexicon
            .backgrounds
            .get(focus.index())
            .or_else(|| lexicon.backgrounds.first())
            .cloned()
            .unwrap_or_else(|| self.background(scenario_type, rng));
        let characters = self.franchise_cast(lexicon, self.cast_size, rng);

        Scenario {
            title,
            description,
            prompt,
            scenario_type,
            background,
            franchise: Some(lexicon.name.clone()),
            focus: Some(focus),
            characters,
        }
    }

    fn compose_cast<R: Rng + ?Sized>(
        &self,
        roles: &[String],
        kinds: &[String],
        keywords: &str,
        count: usize,
        rng: &mut R,
    ) -> Vec<Character> {
        let roles = draw_distinct(roles, count, rng);
        let kinds = draw_distinct(kinds, count, rng);
        let emphases = draw_distinct(&self.library.scenarios.cast.emphases, count, rng);

        (0..count)
            .map(|i| {
                let role = roles.get(i).copied();
                // Role first so archetype words in it win over the scenario keywords
                let combined = [role, kinds.get(i).copied(), emphases.get(i).copied(), Some(keywords)]
                    .into_iter()
                    .flatten()
                    .filter(|part| !part.trim().is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                let mut character = self.characters.synthesize(&combined, rng);
                // Label only, never fed back into synthesis
                character.role = role.map(str::to_string);
                character
            })
            .collect()
    }
}

/// Shuffle the pool and assign entries in order, cycling once it runs out.
fn draw_distinct<'p, R: Rng + ?Sized>(pool: &'p [String], count: usize, rng: &mut R) -> Vec<&'p str> {
    let mut order: Vec<&str> = pool.iter().map(String::as_str).collect();
    if order.is_empty() {
        return Vec::new();
    }
    order.shuffle(rng);
    if count > order.len() {
        tracing::debug!(pool = order.len(), count, "cast label pool exhausted, reusing labels");
    }
    (0..count).map(|i| order[i % order.len()]).collect()
}

fn subject_slot(slot: &str, values: &[String]) -> Option<String> {
    let index = SUBJECT_SLOTS
        .iter()
        .position(|s| s.eq_ignore_ascii_case(slot))?;
    let value = values.get(index)?;
    if slot.starts_with(char::is_uppercase) {
        Some(capitalize(value))
    } else {
        Some(value.clone())
    }
}
