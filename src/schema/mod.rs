pub mod character;
pub mod chat;
pub mod instructions;
pub mod save;
pub mod scenario;
pub mod story_arc;
