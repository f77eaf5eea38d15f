//! Outbound integrations for GhostPixel.

pub mod gemini;

pub use gemini::GeminiCompletionProvider;
