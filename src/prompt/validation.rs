//! Prompt validation run before any outbound call.
//!
//! The denylist is a plain case-insensitive substring check. It has no notion
//! of word boundaries or non-ASCII folding and is not a content classifier.
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::types::GenerationRequest;

pub const MAX_PROMPT_LENGTH: usize = 1000;
pub const STRICT_MIN_PROMPT_LENGTH: usize = 3;
pub const DENYLIST: &[&str] = &["nsfw", "explicit", "violence", "gore", "hate"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRules {
    pub min_len: usize,
    pub max_len: usize,
    pub denylist: Vec<String>,
}

impl Default for PromptRules {
    fn default() -> Self {
        Self {
            min_len: STRICT_MIN_PROMPT_LENGTH,
            max_len: MAX_PROMPT_LENGTH,
            denylist: DENYLIST.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl PromptRules {
    /// Only requires a non-empty prompt; no stricter minimum.
    pub fn lenient() -> Self {
        Self { min_len: 1, ..Self::default() }
    }

    pub fn with_min_len(mut self, min_len: usize) -> Self {
        self.min_len = min_len.max(1);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Validation {
    fn ok() -> Self {
        Self { valid: true, reason: None }
    }

    fn rejected(reason: impl Into<String>) -> Self {
        Self { valid: false, reason: Some(reason.into()) }
    }

    pub fn into_result(self) -> AppResult<()> {
        if self.valid {
            Ok(())
        } else {
            Err(AppError::Validation(self.reason.unwrap_or_else(|| "Invalid prompt".to_string())))
        }
    }
}

/// Lengths count characters of the trimmed prompt.
pub fn validate_prompt(prompt: &str, rules: &PromptRules) -> Validation {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        return Validation::rejected("Prompt is required and must be a non-empty string");
    }

    let len = trimmed.chars().count();
    if len > rules.max_len {
        return Validation::rejected(format!(
            "Prompt is too long (max {} characters)",
            rules.max_len
        ));
    }
    if len < rules.min_len {
        return Validation::rejected(format!(
            "Prompt is too short (min {} characters)",
            rules.min_len
        ));
    }

    let lower = trimmed.to_lowercase();
    if rules.denylist.iter().any(|term| lower.contains(term.as_str())) {
        return Validation::rejected("Prompt contains prohibited content");
    }

    Validation::ok()
}

/// Full request check: prompt rules plus positive dimensions.
pub fn validate_request(request: &GenerationRequest, rules: &PromptRules) -> AppResult<()> {
    validate_prompt(&request.prompt, rules).into_result()?;
    if request.width == 0 || request.height == 0 {
        return Err(AppError::Validation(
            "Width and height must be positive integers".to_string(),
        ));
    }
    Ok(())
}
