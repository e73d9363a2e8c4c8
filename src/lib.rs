//! AI image generation proxy library
//!
//! Modules:
//! - `api`: Axum HTTP handlers and router setup used by the binary.
//! - `upstream`: Client for the hosted completions-style generation endpoint.
//! - `prompt`: Style enhancement, prompt validation and the static catalog.
//! - `history`: Key-value persistence of generation history and preferences.
//! - `types`: Request/result types shared across modules.
//! - `config`: Env-driven configuration loader.
//! - `error`: Common error type and alias.
//!
//! Re-exports are provided for common types: `Config`, `GenerationClient`,
//! `HistoryManager`, `GenerationRequest` and `GenerationResult`.
pub mod api;
pub mod config;
pub mod error;
pub mod history;
pub mod prompt;
pub mod types;
pub mod upstream;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use history::HistoryManager;
pub use prompt::enhancer::{enhance_prompt, Style};
pub use prompt::validation::{validate_prompt, PromptRules, Validation};
pub use types::{GenerationRequest, GenerationResult, HistoryEntry};
pub use upstream::client::GenerationClient;
