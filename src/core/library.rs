/// Content library: every lookup table the synthesizers read, loaded
/// from RON assets with per-file directory overrides.
use serde::de::DeserializeOwned;
use std::path::Path;
use thiserror::Error;

use crate::core::character::{CharacterPools, EnhancementPools};
use crate::core::classifier::{KeywordClassifier, Lexicon};
use crate::core::instructions::{InstructionContent, InstructionGenerator};
use crate::core::scenario::ScenarioContent;
use crate::core::story_arc::{ArcContent, StoryArcMachine};
use crate::core::traits::{AttributeDeriver, PersonalityRules};

pub const LEXICON_FILE: &str = "lexicon.ron";
pub const PERSONALITY_FILE: &str = "personality.ron";
pub const CHARACTERS_FILE: &str = "characters.ron";
pub const ENHANCEMENTS_FILE: &str = "enhancements.ron";
pub const SCENARIOS_FILE: &str = "scenarios.ron";
pub const STORY_ARCS_FILE: &str = "story_arcs.ron";
pub const INSTRUCTIONS_FILE: &str = "instructions.ron";

/// Asset file names in load order.
pub const ASSET_FILES: [&str; 7] = [
    LEXICON_FILE,
    PERSONALITY_FILE,
    CHARACTERS_FILE,
    ENHANCEMENTS_FILE,
    SCENARIOS_FILE,
    STORY_ARCS_FILE,
    INSTRUCTIONS_FILE,
];

const BUILTIN_LEXICON: &str = include_str!("../../content_data/lexicon.ron");
const BUILTIN_PERSONALITY: &str = include_str!("../../content_data/personality.ron");
const BUILTIN_CHARACTERS: &str = include_str!("../../content_data/characters.ron");
const BUILTIN_ENHANCEMENTS: &str = include_str!("../../content_data/enhancements.ron");
const BUILTIN_SCENARIOS: &str = include_str!("../../content_data/scenarios.ron");
const BUILTIN_STORY_ARCS: &str = include_str!("../../content_data/story_arcs.ron");
const BUILTIN_INSTRUCTIONS: &str = include_str!("../../content_data/instructions.ron");

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON error in {file}: {source}")]
    Ron {
        file: &'static str,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("content library failed validation with {} issue(s): {}", .0.len(), .0.join("; "))]
    Invalid(Vec<String>),
}

/// All content tables. Read-only once built; synthesizers borrow it.
#[derive(Debug, Clone)]
pub struct ContentLibrary {
    pub lexicon: Lexicon,
    pub personality: PersonalityRules,
    pub characters: CharacterPools,
    pub enhancements: EnhancementPools,
    pub scenarios: ScenarioContent,
    pub arcs: ArcContent,
    pub instructions: InstructionContent,
}

impl ContentLibrary {
    /// The content compiled into the crate.
    pub fn builtin() -> Result<ContentLibrary, LibraryError> {
        Self::assemble(|_| Ok(None))
    }

    /// Load each asset from `dir` when the file exists there, falling
    /// back to the built-in asset otherwise, then validate the result.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<ContentLibrary, LibraryError> {
        let dir = dir.as_ref();
        if !dir.exists() {
            tracing::warn!(dir = %dir.display(), "content directory missing, using built-in content");
        }
        let library = Self::assemble(|file| {
            let path = dir.join(file);
            if !path.is_file() {
                return Ok(None);
            }
            tracing::info!(path = %path.display(), "loading content override");
            Ok(Some(std::fs::read_to_string(&path)?))
        })?;
        library.validate()?;
        Ok(library)
    }

    fn assemble<F>(mut source: F) -> Result<ContentLibrary, LibraryError>
    where
        F: FnMut(&'static str) -> Result<Option<String>, LibraryError>,
    {
        let mut load = |file: &'static str, builtin: &'static str| -> Result<_, LibraryError> {
            Ok(source(file)?.map_or(std::borrow::Cow::Borrowed(builtin), std::borrow::Cow::Owned))
        };
        Ok(ContentLibrary {
            lexicon: parse(LEXICON_FILE, &load(LEXICON_FILE, BUILTIN_LEXICON)?)?,
            personality: parse(PERSONALITY_FILE, &load(PERSONALITY_FILE, BUILTIN_PERSONALITY)?)?,
            characters: parse(CHARACTERS_FILE, &load(CHARACTERS_FILE, BUILTIN_CHARACTERS)?)?,
            enhancements: parse(
                ENHANCEMENTS_FILE,
                &load(ENHANCEMENTS_FILE, BUILTIN_ENHANCEMENTS)?,
            )?,
            scenarios: parse(SCENARIOS_FILE, &load(SCENARIOS_FILE, BUILTIN_SCENARIOS)?)?,
            arcs: parse(STORY_ARCS_FILE, &load(STORY_ARCS_FILE, BUILTIN_STORY_ARCS)?)?,
            instructions: parse(
                INSTRUCTIONS_FILE,
                &load(INSTRUCTIONS_FILE, BUILTIN_INSTRUCTIONS)?,
            )?,
        })
    }

    pub fn classifier(&self) -> KeywordClassifier<'_> {
        KeywordClassifier::new(&self.lexicon)
    }

    pub fn deriver(&self) -> AttributeDeriver<'_> {
        AttributeDeriver::new(&self.personality, &self.lexicon.themes)
    }

    pub fn story_arcs(&self) -> StoryArcMachine<'_> {
        StoryArcMachine::new(&self.arcs)
    }

    pub fn instruction_generator(&self) -> InstructionGenerator<'_> {
        InstructionGenerator::new(&self.instructions, &self.arcs)
    }

    /// Every structural problem found, per table and across tables.
    pub fn lint(&self) -> Vec<String> {
        let mut issues = Vec::new();
        self.lexicon.lint(&mut issues);
        self.personality.lint(&mut issues);
        self.characters.lint(&mut issues);
        self.enhancements.lint(&mut issues);
        self.scenarios.lint(&mut issues);
        self.arcs.lint(&mut issues);
        self.instructions.lint(&mut issues);
        self.lint_cross_references(&mut issues);
        issues
    }

    pub fn validate(&self) -> Result<(), LibraryError> {
        let issues = self.lint();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(LibraryError::Invalid(issues))
        }
    }

    fn lint_cross_references(&self, issues: &mut Vec<String>) {
        for f in &self.lexicon.franchises {
            if self.scenarios.franchise(&f.name).is_none() {
                issues.push(format!(
                    "franchise '{}' is recognized by the lexicon but has no scenario lexicon",
                    f.name
                ));
            }
        }

        let archetype_keywords: Vec<&str> = self.characters.archetype_keywords().collect();
        let leaks = |words: &[String]| -> Vec<String> {
            words
                .iter()
                .flat_map(|w| w.split_whitespace())
                .filter(|w| archetype_keywords.contains(w))
                .map(str::to_string)
                .collect()
        };

        for f in &self.scenarios.franchises {
            if !self.lexicon.franchises.iter().any(|k| k.name == f.name) {
                issues.push(format!(
                    "scenario franchise '{}' is never recognized by the lexicon",
                    f.name
                ));
            }
            let genre_keywords = self
                .lexicon
                .themes
                .iter()
                .find(|t| t.genre == f.genre)
                .map(|t| t.keywords.as_slice())
                .unwrap_or_default();
            if !genre_keywords.contains(&f.theme_keyword) {
                issues.push(format!(
                    "franchise '{}': theme keyword '{}' is not a '{}' theme keyword",
                    f.name, f.theme_keyword, f.genre
                ));
            }
            let mut words = f.cast_roles.clone();
            words.extend(f.cast_kinds.iter().cloned());
            words.push(f.theme_keyword.clone());
            for leak in leaks(&words) {
                issues.push(format!(
                    "franchise '{}': cast word '{}' selects a generic archetype",
                    f.name, leak
                ));
            }
        }
        for leak in leaks(&self.scenarios.cast.emphases) {
            issues.push(format!(
                "scenarios: cast emphasis '{}' selects a generic archetype",
                leak
            ));
        }
    }
}

fn parse<T: DeserializeOwned>(file: &'static str, input: &str) -> Result<T, LibraryError> {
    ron::from_str(input).map_err(|source| LibraryError::Ron { file, source })
}
