//! Narrative Synth: rule-based character, scenario and story-arc synthesis.
//!
//! Fabricates characters and scenarios from free-text keywords, tracks a
//! conversation's progress through a keyword-driven phase machine, and
//! emits per-turn writing instructions for an external response generator.
//! All lookup tables live in RON content assets.

pub mod core;
pub mod schema;

pub use crate::core::library::{ContentLibrary, LibraryError};
pub use crate::core::pipeline::{PipelineError, StoryEngine, StoryEngineBuilder};
