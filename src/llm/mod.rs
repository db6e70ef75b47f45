//! Reply generation: provider trait, Gemini client, persona prompt.

pub mod gemini;
pub mod persona;
pub mod provider;

pub use gemini::{GeminiClient, GeminiError};
pub use provider::{
    APOLOGY_TEXT, EMPTY_REPLY_TEXT, GenerateFuture, Generation, GenerationProvider, HistoryEntry,
    HistoryRole,
};
