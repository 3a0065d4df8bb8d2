//! WASM bindings for narrative-synth, used by the chat-room web UI.
//!
//! Every method takes and returns JSON strings so the page can keep the
//! records in its own state and save files.

use wasm_bindgen::prelude::*;

use narrative_synth::schema::character::Character;
use narrative_synth::schema::chat::ChatMessage;
use narrative_synth::schema::story_arc::StoryArc;
use narrative_synth::StoryEngine;

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Deserialize)]
struct StoryStart {
    title: String,
    #[serde(default)]
    prompt: String,
    #[serde(default)]
    theme: String,
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(|e| JsError::new(&format!("Serialization error: {e}")))
}

fn from_json<'a, T: serde::Deserialize<'a>>(input: &'a str, what: &str) -> Result<T, JsError> {
    serde_json::from_str(input).map_err(|e| JsError::new(&format!("Invalid {what} JSON: {e}")))
}

/// Blank or `null` input means "not supplied".
fn optional_json<'a, T: serde::Deserialize<'a>>(
    input: &'a str,
    what: &str,
) -> Result<Option<T>, JsError> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }
    from_json(trimmed, what).map(Some)
}

// ---------------------------------------------------------------------------
// NarrativeSynth: the main exported struct
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct NarrativeSynth {
    engine: StoryEngine,
}

#[wasm_bindgen]
impl NarrativeSynth {
    /// Create an engine over the built-in content with the given seed.
    #[wasm_bindgen(constructor)]
    pub fn new(seed: u64) -> Result<NarrativeSynth, JsError> {
        let engine = StoryEngine::builder()
            .seed(seed)
            .build()
            .map_err(|e| JsError::new(&format!("Engine build error: {e}")))?;
        Ok(NarrativeSynth { engine })
    }

    /// Character record for a keyword string.
    pub fn generate_character(&mut self, keywords: &str) -> Result<String, JsError> {
        to_json(&self.engine.character(keywords))
    }

    /// Character record for a free-text description, or `null` for blank input.
    pub fn generate_character_from_description(
        &mut self,
        description: &str,
    ) -> Result<String, JsError> {
        to_json(&self.engine.character_from_description(description))
    }

    pub fn generate_scenario(&mut self, keywords: &str) -> Result<String, JsError> {
        to_json(&self.engine.scenario(keywords))
    }

    /// JSON array of three scenario variants.
    pub fn generate_quick_scenarios(&mut self, keywords: &str) -> Result<String, JsError> {
        to_json(&self.engine.quick_scenarios(keywords))
    }

    pub fn generate_cast(&mut self, keywords: &str, count: usize) -> Result<String, JsError> {
        to_json(&self.engine.cast(keywords, count))
    }

    /// Start a story arc.
    ///
    /// Expected JSON shape:
    /// ```json
    /// { "title": "Avengers: Alien Invasion", "prompt": "...", "theme": "superhero" }
    /// ```
    pub fn begin_story(&self, start_json: &str) -> Result<String, JsError> {
        let start: StoryStart = from_json(start_json, "story start")?;
        to_json(
            &self
                .engine
                .begin_story(&start.title, &start.prompt, &start.theme),
        )
    }

    /// Advance an arc over a JSON array of chat messages; returns the new arc.
    pub fn advance_story(&self, arc_json: &str, messages_json: &str) -> Result<String, JsError> {
        let arc: StoryArc = from_json(arc_json, "story arc")?;
        let messages: Vec<ChatMessage> =
            optional_json(messages_json, "chat messages")?.unwrap_or_default();
        to_json(&self.engine.advance_story(&arc, &messages))
    }

    /// Writing instructions; either argument may be blank.
    pub fn writing_instructions(
        &self,
        arc_json: &str,
        character_json: &str,
    ) -> Result<String, JsError> {
        let arc: Option<StoryArc> = optional_json(arc_json, "story arc")?;
        let character: Option<Character> = optional_json(character_json, "character")?;
        to_json(&self.engine.instruct(arc.as_ref(), character.as_ref()))
    }

    /// JSON array of the titles with a dedicated phase table.
    pub fn known_scenarios(&self) -> String {
        let titles: Vec<&str> = self
            .engine
            .library()
            .arcs
            .known_scenarios
            .iter()
            .map(|s| s.title.as_str())
            .collect();
        serde_json::to_string(&titles).unwrap_or_else(|_| "[]".to_string())
    }

    /// JSON array of recognized franchise names.
    pub fn franchises(&self) -> String {
        let names: Vec<&str> = self
            .engine
            .library()
            .lexicon
            .franchises
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        serde_json::to_string(&names).unwrap_or_else(|_| "[]".to_string())
    }
}

