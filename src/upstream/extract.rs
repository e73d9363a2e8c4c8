//! Image reference extraction from upstream message content.
//!
//! Strategies run in [`EXTRACTORS`] order and the first hit wins. Each one is
//! total and side-effect-free. Content that parses as JSON is settled by the
//! JSON strategy alone: the text patterns only run on content that is not JSON.
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Field names checked, in order, when the content is a JSON object.
pub const JSON_URL_FIELDS: &[&str] = &["image_url", "url", "imageUrl"];

static HTTP_IMAGE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)https?://\S+\.(?:jpg|jpeg|png|gif|webp)").expect("valid image url pattern")
});

static BASE64_DATA_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"data:image/[^;]+;base64,[A-Za-z0-9+/=]+").expect("valid data url pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageExtractor {
    /// Content parses as JSON and carries one of [`JSON_URL_FIELDS`].
    JsonField,
    /// An http(s) URL ending in a known image extension.
    HttpImageUrl,
    /// A `data:image/...;base64,` URL.
    DataUrl,
}

/// What a single strategy made of the content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Found(String),
    /// The content was recognised but holds no image; later strategies must not run.
    Settled,
    /// Not applicable; try the next strategy.
    NoMatch,
}

pub const EXTRACTORS: &[ImageExtractor] = &[
    ImageExtractor::JsonField,
    ImageExtractor::HttpImageUrl,
    ImageExtractor::DataUrl,
];

impl ImageExtractor {
    pub fn apply(&self, content: &str) -> Extraction {
        let found = match self {
            Self::JsonField => {
                let Ok(parsed) = serde_json::from_str::<Value>(content.trim()) else {
                    return Extraction::NoMatch;
                };
                let hit = JSON_URL_FIELDS.iter().find_map(|field| {
                    parsed
                        .get(field)
                        .and_then(Value::as_str)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                });
                return hit.map_or(Extraction::Settled, Extraction::Found);
            }
            Self::HttpImageUrl => HTTP_IMAGE_URL.find(content),
            Self::DataUrl => BASE64_DATA_URL.find(content),
        };
        found.map_or(Extraction::NoMatch, |m| Extraction::Found(m.as_str().to_string()))
    }

    /// The reference this strategy alone finds, if any.
    pub fn extract(&self, content: &str) -> Option<String> {
        match self.apply(content) {
            Extraction::Found(s) => Some(s),
            Extraction::Settled | Extraction::NoMatch => None,
        }
    }
}

pub fn extract_image_url(content: &str) -> Option<String> {
    extract_with(EXTRACTORS, content)
}

pub fn extract_with(extractors: &[ImageExtractor], content: &str) -> Option<String> {
    for e in extractors {
        match e.apply(content) {
            Extraction::Found(hit) => {
                tracing::debug!(extractor = ?e, "image reference extracted");
                return Some(hit);
            }
            Extraction::Settled => {
                tracing::debug!(extractor = ?e, "content settled without an image reference");
                return None;
            }
            Extraction::NoMatch => {}
        }
    }
    None
}
