/// The engine façade: one entry point owning the content library and
/// the seed, exposing every synthesis and story operation.
///
/// Randomness is derived per call from `seed + generation_count`, so a
/// fixed seed and call sequence reproduce identical output.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::character::CharacterSynthesizer;
use crate::core::library::{ContentLibrary, LibraryError};
use crate::core::scenario::{ScenarioSynthesizer, DEFAULT_CAST_SIZE};
use crate::core::story_arc::DEFAULT_MESSAGE_WINDOW;
use crate::schema::character::Character;
use crate::schema::chat::ChatMessage;
use crate::schema::instructions::WritingInstructions;
use crate::schema::scenario::Scenario;
use crate::schema::story_arc::StoryArc;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("content library error: {0}")]
    Library(#[from] LibraryError),
}

/// The top-level engine. Built via `StoryEngine::builder()`.
pub struct StoryEngine {
    library: ContentLibrary,
    seed: u64,
    generation_count: u64,
    message_window: usize,
    cast_size: usize,
}

/// Builder for constructing a `StoryEngine`.
pub struct StoryEngineBuilder {
    content_dir: Option<PathBuf>,
    seed: u64,
    /// Directly provided content (for testing without files).
    library: Option<ContentLibrary>,
    message_window: usize,
    cast_size: usize,
}

impl StoryEngine {
    pub fn builder() -> StoryEngineBuilder {
        StoryEngineBuilder {
            content_dir: None,
            seed: 0,
            library: None,
            message_window: DEFAULT_MESSAGE_WINDOW,
            cast_size: DEFAULT_CAST_SIZE,
        }
    }

    pub fn library(&self) -> &ContentLibrary {
        &self.library
    }

    /// Character from a short keyword string.
    pub fn character(&mut self, keywords: &str) -> Character {
        let mut rng = self.next_rng();
        CharacterSynthesizer::new(&self.library).synthesize(keywords, &mut rng)
    }

    /// Character from a free-text description; `None` for blank input.
    pub fn character_from_description(&mut self, description: &str) -> Option<Character> {
        let mut rng = self.next_rng();
        CharacterSynthesizer::new(&self.library).from_description(description, &mut rng)
    }

    pub fn scenario(&mut self, keywords: &str) -> Scenario {
        let mut rng = self.next_rng();
        self.scenarios().synthesize_scenario(keywords, &mut rng)
    }

    /// Three scenario variants; franchise-focused when one is recognized.
    pub fn quick_scenarios(&mut self, keywords: &str) -> Vec<Scenario> {
        let mut rng = self.next_rng();
        self.scenarios().quick_scenarios(keywords, &mut rng)
    }

    pub fn cast(&mut self, keywords: &str, count: usize) -> Vec<Character> {
        let mut rng = self.next_rng();
        self.scenarios().synthesize_cast(keywords, count, &mut rng)
    }

    pub fn begin_story(&self, title: &str, prompt: &str, theme: &str) -> StoryArc {
        self.library.story_arcs().initialize(title, prompt, theme)
    }

    /// Next arc after the given conversation; the input arc is unchanged.
    pub fn advance_story(&self, arc: &StoryArc, messages: &[ChatMessage]) -> StoryArc {
        self.library
            .story_arcs()
            .with_window(self.message_window)
            .advance(arc, messages)
    }

    pub fn instruct(
        &self,
        arc: Option<&StoryArc>,
        character: Option<&Character>,
    ) -> WritingInstructions {
        self.library.instruction_generator().instruct(arc, character)
    }

    fn scenarios(&self) -> ScenarioSynthesizer<'_> {
        ScenarioSynthesizer::new(&self.library).with_cast_size(self.cast_size)
    }

    fn next_rng(&mut self) -> StdRng {
        let rng = StdRng::seed_from_u64(self.seed.wrapping_add(self.generation_count));
        self.generation_count += 1;
        rng
    }
}

impl StoryEngineBuilder {
    /// Directory whose RON files override the built-in content.
    pub fn content_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.content_dir = Some(path.into());
        self
    }

    /// Set the RNG seed for deterministic output.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Use an already loaded library instead of reading content.
    pub fn with_library(mut self, library: ContentLibrary) -> Self {
        self.library = Some(library);
        self
    }

    /// Trailing messages inspected per story advance.
    pub fn message_window(mut self, window: usize) -> Self {
        self.message_window = window.max(1);
        self
    }

    /// Characters generated per scenario.
    pub fn cast_size(mut self, size: usize) -> Self {
        self.cast_size = size.max(1);
        self
    }

    pub fn build(self) -> Result<StoryEngine, PipelineError> {
        let library = match (self.library, self.content_dir) {
            (Some(library), _) => {
                library.validate()?;
                library
            }
            (None, Some(dir)) => ContentLibrary::load_from_dir(&dir)?,
            (None, None) => ContentLibrary::builtin()?,
        };

        tracing::debug!(
            seed = self.seed,
            cast_size = self.cast_size,
            window = self.message_window,
            "story engine built"
        );

        Ok(StoryEngine {
            library,
            seed: self.seed,
            generation_count: 0,
            message_window: self.message_window,
            cast_size: self.cast_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::story_arc::Phase;

    fn build_test_engine(seed: u64) -> StoryEngine {
        StoryEngine::builder().seed(seed).build().unwrap()
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = build_test_engine(42);
        let mut b = build_test_engine(42);
        assert_eq!(a.character("pirate captain"), b.character("pirate captain"));
        assert_eq!(a.scenario("haunted castle"), b.scenario("haunted castle"));
        assert_eq!(a.quick_scenarios("star wars"), b.quick_scenarios("star wars"));
    }

    #[test]
    fn each_call_advances_the_generator() {
        let mut engine = build_test_engine(7);
        let first: Vec<_> = (0..5).map(|_| engine.character("robot")).collect();
        let mut replay = build_test_engine(7);
        let second: Vec<_> = (0..5).map(|_| replay.character("robot")).collect();
        assert_eq!(first, second);
        assert_eq!(engine.generation_count, 5);
    }

    #[test]
    fn cast_size_applies_to_scenarios() {
        let mut engine = StoryEngine::builder().seed(3).cast_size(5).build().unwrap();
        assert_eq!(engine.scenario("space station").characters.len(), 5);
        let mut engine = StoryEngine::builder().seed(3).cast_size(0).build().unwrap();
        assert_eq!(engine.scenario("space station").characters.len(), 1);
    }

    #[test]
    fn with_library_is_validated() {
        let mut library = ContentLibrary::builtin().unwrap();
        library.lexicon.themes.clear();
        assert!(matches!(
            StoryEngine::builder().with_library(library).build(),
            Err(PipelineError::Library(LibraryError::Invalid(_)))
        ));
    }

    #[test]
    fn story_round_trip_through_engine() {
        let mut engine = build_test_engine(1);
        let arc = engine.begin_story("Avengers: Alien Invasion", "", "superhero");
        let next = engine.advance_story(
            &arc,
            &[ChatMessage::new("Tony", "Their weakness is the mothership link.")],
        );
        assert_eq!(next.current_phase, Phase::Planning);
        assert_eq!(engine.instruct(Some(&next), None), WritingInstructions::default());

        let thor = engine.character("thor hammer");
        let out = engine.instruct(Some(&next), Some(&thor));
        assert!(out.general_notes.contains("Avengers: Alien Invasion"));
        assert!(!out.story_arc.is_empty());
    }
}
