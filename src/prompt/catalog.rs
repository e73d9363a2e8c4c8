//! Static catalog served to clients: style options, preset prompts and
//! dimension presets.
use serde::Serialize;

use super::enhancer::Style;
use super::validation::MAX_PROMPT_LENGTH;

#[derive(Debug, Clone, Serialize)]
pub struct StyleOption {
    pub value: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct PresetPrompt {
    pub name: &'static str,
    pub prompt: &'static str,
    pub style: Style,
}

#[derive(Debug, Clone, Serialize)]
pub struct DimensionPreset {
    pub value: &'static str,
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
}

pub fn style_options() -> Vec<StyleOption> {
    Style::ALL
        .into_iter()
        .map(|style| {
            let (label, description) = match style {
                Style::Photorealistic => ("Photorealistic", "High-detail, realistic photography style"),
                Style::Artistic => ("Artistic", "Creative and expressive artistic interpretation"),
                Style::Minimal => ("Minimal", "Clean, simple, and elegant design"),
                Style::Cinematic => ("Cinematic", "Movie-like dramatic lighting and composition"),
                Style::Fantasy => ("Fantasy", "Magical and imaginative fantasy art"),
                Style::Abstract => ("Abstract", "Modern abstract art with geometric patterns"),
                Style::Cyberpunk => ("Cyberpunk", "Neon-lit, futuristic high-tech scenes"),
                Style::Vintage => ("Vintage", "Retro look with a nostalgic feel"),
            };
            StyleOption { value: style.as_str(), label, description }
        })
        .collect()
}

pub fn preset_prompts() -> Vec<PresetPrompt> {
    vec![
        PresetPrompt {
            name: "Landscape",
            prompt: "A breathtaking mountain landscape at sunset with golden light reflecting on a pristine lake",
            style: Style::Photorealistic,
        },
        PresetPrompt {
            name: "Portrait",
            prompt: "Professional portrait of a person with natural lighting and soft background blur",
            style: Style::Photorealistic,
        },
        PresetPrompt {
            name: "Abstract Art",
            prompt: "Flowing abstract composition with vibrant colors and dynamic movement",
            style: Style::Abstract,
        },
        PresetPrompt {
            name: "Fantasy Scene",
            prompt: "Magical forest with glowing mushrooms and ethereal light filtering through ancient trees",
            style: Style::Fantasy,
        },
        PresetPrompt {
            name: "Architecture",
            prompt: "Modern minimalist building with clean lines and geometric shapes against a clear sky",
            style: Style::Minimal,
        },
        PresetPrompt {
            name: "Still Life",
            prompt: "Elegant still life composition with fresh flowers and natural lighting",
            style: Style::Artistic,
        },
    ]
}

pub fn dimension_presets() -> Vec<DimensionPreset> {
    vec![
        DimensionPreset { value: "1:1", label: "Square (1:1)", width: 1024, height: 1024 },
        DimensionPreset { value: "16:9", label: "Landscape (16:9)", width: 1344, height: 768 },
        DimensionPreset { value: "9:16", label: "Portrait (9:16)", width: 768, height: 1344 },
        DimensionPreset { value: "4:3", label: "Standard (4:3)", width: 1152, height: 896 },
        DimensionPreset { value: "3:4", label: "Portrait (3:4)", width: 896, height: 1152 },
        DimensionPreset { value: "21:9", label: "Ultrawide (21:9)", width: 1536, height: 640 },
    ]
}

/// Look up a preset by ratio (`16:9`) or explicit size (`1344x768`).
pub fn find_dimension_preset(value: &str) -> Option<DimensionPreset> {
    let value = value.trim();
    dimension_presets()
        .into_iter()
        .find(|p| p.value == value || format!("{}x{}", p.width, p.height) == value)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub message: &'static str,
    pub version: &'static str,
    pub endpoints: serde_json::Value,
    pub supported_styles: Vec<&'static str>,
    pub max_prompt_length: usize,
    pub supported_dimensions: Vec<String>,
}

pub fn capabilities() -> Capabilities {
    Capabilities {
        message: "AI Image Generation API",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: serde_json::json!({
            "POST": "/api/generate - Generate images from text prompts"
        }),
        supported_styles: Style::ALL.iter().map(Style::as_str).collect(),
        max_prompt_length: MAX_PROMPT_LENGTH,
        supported_dimensions: dimension_presets()
            .iter()
            .map(|p| format!("{}x{}", p.width, p.height))
            .collect(),
    }
}
