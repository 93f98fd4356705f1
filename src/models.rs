// src/models.rs
use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::FitGeniusError;

/// An image held in memory for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedImage {
    pub mime_type: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl EncodedImage {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.data)
    }

    /// Splits `data:<mime>;base64,<payload>`. A bare payload is taken as JPEG.
    fn split_data_url(input: &str) -> (&str, &str) {
        let input = input.trim();
        match input
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(";base64,"))
        {
            Some((mime, payload)) if !mime.is_empty() => (mime, payload),
            _ => ("image/jpeg", input),
        }
    }

    /// The media type a data URL declares, read without decoding the payload.
    pub fn data_url_mime_type(input: &str) -> &str {
        Self::split_data_url(input).0
    }

    pub fn from_data_url(input: &str) -> Result<Self, FitGeniusError> {
        let (mime_type, payload) = Self::split_data_url(input);

        let data = general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| FitGeniusError::Ingestion(format!("Invalid base64 payload: {}", e)))?;

        Ok(Self::new(mime_type, data))
    }

    /// File extension for downloads, falling back to `png`.
    pub fn extension(&self) -> &str {
        self.mime_type
            .strip_prefix("image/")
            .map(|ext| match ext {
                "jpeg" => "jpg",
                "svg+xml" => "svg",
                other => other,
            })
            .filter(|ext| !ext.is_empty())
            .unwrap_or("png")
    }
}

mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&general_purpose::STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        general_purpose::STANDARD
            .decode(encoded)
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAnalysis {
    pub gender: String,
    pub body_shape: String,
    pub skin_tone: String,
    pub detected_colors: Vec<String>,
    pub vibe: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StyleMode {
    #[default]
    #[serde(alias = "Office Professional")]
    Office,
    #[serde(alias = "Party & Festival")]
    Party,
    #[serde(alias = "Streetwear & Urban")]
    Streetwear,
    #[serde(alias = "Smart Casual")]
    Casual,
    #[serde(alias = "Wedding & Ethnic")]
    Wedding,
    #[serde(alias = "Gym & Athleisure")]
    Gym,
    #[serde(alias = "Winter Cozy")]
    Winter,
    #[serde(alias = "Summer Light")]
    Summer,
}

impl StyleMode {
    pub const ALL: [StyleMode; 8] = [
        StyleMode::Office,
        StyleMode::Party,
        StyleMode::Streetwear,
        StyleMode::Casual,
        StyleMode::Wedding,
        StyleMode::Gym,
        StyleMode::Winter,
        StyleMode::Summer,
    ];

    /// The occasion name used in prompts and export file names.
    pub fn display_name(self) -> &'static str {
        match self {
            StyleMode::Office => "Office Professional",
            StyleMode::Party => "Party & Festival",
            StyleMode::Streetwear => "Streetwear & Urban",
            StyleMode::Casual => "Smart Casual",
            StyleMode::Wedding => "Wedding & Ethnic",
            StyleMode::Gym => "Gym & Athleisure",
            StyleMode::Winter => "Winter Cozy",
            StyleMode::Summer => "Summer Light",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StyleMode::Office => "Office",
            StyleMode::Party => "Party",
            StyleMode::Streetwear => "Streetwear",
            StyleMode::Casual => "Casual",
            StyleMode::Wedding => "Wedding",
            StyleMode::Gym => "Gym",
            StyleMode::Winter => "Winter",
            StyleMode::Summer => "Summer",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            StyleMode::Office => "briefcase",
            StyleMode::Party => "sparkles",
            StyleMode::Streetwear => "zap",
            StyleMode::Casual => "coffee",
            StyleMode::Wedding => "heart",
            StyleMode::Gym => "dumbbell",
            StyleMode::Winter => "snowflake",
            StyleMode::Summer => "sun",
        }
    }

    /// Scene description used when rendering the outfit preview.
    pub fn environment(self) -> &'static str {
        match self {
            StyleMode::Office => {
                "modern minimalist corporate office with glass walls, soft daytime professional lighting, depth of field"
            }
            StyleMode::Party => {
                "vibrant nightlife city street with neon signs and bokeh lights, dramatic night lighting, cyber fashion aesthetic"
            }
            StyleMode::Streetwear => {
                "urban concrete city street with industrial architecture, graffiti art background, cool overcast lighting"
            }
            StyleMode::Casual => {
                "relaxed high-end coffee shop interior or sunny city park path, warm natural sunlight"
            }
            StyleMode::Wedding => {
                "elegant luxury event venue with floral decorations, soft golden hour lighting, dreamy atmosphere"
            }
            StyleMode::Gym => {
                "modern high-end fitness studio with mirrors and sleek equipment, bright energetic lighting"
            }
            StyleMode::Winter => {
                "cozy winter street scene with soft snow or modern cabin interior, cold crisp lighting"
            }
            StyleMode::Summer => {
                "sunny outdoor resort promenade or beachside walkway, bright clear daylight, blue sky"
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutfitItem {
    /// Top, Bottom, Shoes or Accessory.
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub shopping_query: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutfitRecommendation {
    pub style_name: String,
    pub description: String,
    #[serde(default)]
    pub items: Vec<OutfitItem>,
    #[serde(default)]
    pub color_palette: Vec<String>,
    pub visual_prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedPreviewImage {
    pub image: EncodedImage,
    pub style: StyleMode,
    pub created_at: DateTime<Utc>,
}

impl GeneratedPreviewImage {
    pub fn new(image: EncodedImage, style: StyleMode) -> Self {
        Self {
            image,
            style,
            created_at: Utc::now(),
        }
    }

    pub fn download_name(&self) -> String {
        format!(
            "FitGenius-{}.{}",
            self.style.display_name(),
            self.image.extension()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewState {
    Landing,
    Uploading,
    Analyzing,
    Results,
    Features,
    Showcase,
    Pricing,
    About,
    Blog,
    Contact,
    Auth,
}

impl ViewState {
    /// Marketing screens that carry no session data.
    pub fn is_static_page(self) -> bool {
        matches!(
            self,
            ViewState::Features
                | ViewState::Showcase
                | ViewState::Pricing
                | ViewState::About
                | ViewState::Blog
                | ViewState::Contact
                | ViewState::Auth
        )
    }
}

pub const LOADING_STEPS: [&str; 5] = [
    "Scanning body geometry...",
    "Analyzing skin undertones...",
    "Extracting wardrobe palette...",
    "Consulting AI stylist engine...",
    "Rendering high-fidelity previews...",
];
