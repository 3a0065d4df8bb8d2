pub mod character;
pub mod classifier;
pub mod instructions;
pub mod library;
pub mod pipeline;
pub mod scenario;
pub mod story_arc;
pub mod template;
pub mod traits;
