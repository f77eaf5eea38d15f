pub mod model;
pub mod repository;

pub use model::{AppState, GeminiConfig, SecretConfig};
pub use repository::LocalPreferences;
