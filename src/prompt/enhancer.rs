//! Style keyword enhancement.
//!
//! `enhance_prompt` appends the fixed keyword phrase for a style tag to the
//! user's prompt: `base + ", " + phrase`. Unknown tags use the phrase of the
//! default style, so the function is total. Applying it twice appends twice.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    #[default]
    Photorealistic,
    Artistic,
    Minimal,
    Cinematic,
    Fantasy,
    Abstract,
    Cyberpunk,
    Vintage,
}

impl Style {
    pub const ALL: [Style; 8] = [
        Style::Photorealistic,
        Style::Artistic,
        Style::Minimal,
        Style::Cinematic,
        Style::Fantasy,
        Style::Abstract,
        Style::Cyberpunk,
        Style::Vintage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Photorealistic => "photorealistic",
            Self::Artistic => "artistic",
            Self::Minimal => "minimal",
            Self::Cinematic => "cinematic",
            Self::Fantasy => "fantasy",
            Self::Abstract => "abstract",
            Self::Cyberpunk => "cyberpunk",
            Self::Vintage => "vintage",
        }
    }

    /// Descriptive keywords appended to prompts of this style.
    pub fn keywords(&self) -> &'static str {
        match self {
            Self::Photorealistic => "photorealistic, high quality, detailed, professional photography",
            Self::Artistic => "artistic, creative, expressive, stylized, beautiful composition",
            Self::Minimal => "minimal, clean, simple, elegant, modern design",
            Self::Cinematic => {
                "cinematic lighting, dramatic composition, movie-like quality, professional cinematography"
            }
            Self::Fantasy => "fantasy, magical, ethereal, mystical, enchanting",
            Self::Abstract => "abstract art, geometric patterns, creative interpretation, modern abstract style",
            Self::Cyberpunk => "cyberpunk, futuristic, neon, high-tech, dystopian",
            Self::Vintage => "vintage, retro, classic, nostalgic, timeless",
        }
    }

    /// Case-insensitive lookup; `None` for tags outside the table.
    pub fn parse(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        Self::ALL.into_iter().find(|s| s.as_str().eq_ignore_ascii_case(tag))
    }

    /// Like [`Style::parse`] but unknown tags resolve to the default style.
    pub fn from_tag(tag: &str) -> Self {
        Self::parse(tag).unwrap_or_default()
    }
}

impl std::fmt::Display for Style {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn enhance_prompt(base: &str, style_tag: &str) -> String {
    format!("{}, {}", base, Style::from_tag(style_tag).keywords())
}
