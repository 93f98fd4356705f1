// src/services/stylist.rs
use std::sync::Arc;
use std::time::Instant;

use log::{error, info};
use serde_json::{Value, json};

use crate::config::AppConfig;
use crate::errors::FitGeniusError;
use crate::models::*;
use crate::services::gemini::{GenerateContentRequest, GenerationConfig, InferenceBackend, Part};

const ANALYSIS_PROMPT: &str = "Analyze this full-body image of a person for fashion styling purposes.
Identify the gender, estimate the body shape (e.g., Hourglass, Rectangle, Inverted Triangle, Pear, Oval),
detect the skin tone/complexion, and identify 3 dominant colors present in the image (if any clothing is worn) or suitable colors.
Also describe the general 'vibe' or current style of the person.";

const PREVIEW_ASPECT_RATIO: &str = "3:4";

/// Environment used when no style-specific scene applies.
pub const DEFAULT_ENVIRONMENT: &str = "clean high-fashion studio background, professional lighting";

/// The three-stage analyze, recommend, render pipeline.
pub struct StylistService {
    backend: Arc<dyn InferenceBackend>,
    analysis_model: String,
    recommendation_model: String,
    image_model: String,
}

impl StylistService {
    pub fn new(backend: Arc<dyn InferenceBackend>, config: &AppConfig) -> Self {
        Self {
            backend,
            analysis_model: config.analysis_model.clone(),
            recommendation_model: config.recommendation_model.clone(),
            image_model: config.image_model.clone(),
        }
    }

    pub async fn analyze_user_image(
        &self,
        image: &EncodedImage,
    ) -> Result<UserAnalysis, FitGeniusError> {
        let start = Instant::now();

        let request = GenerateContentRequest::new(
            vec![Part::image(image), Part::text(ANALYSIS_PROMPT)],
            GenerationConfig::json(analysis_schema()),
        );

        let response = self
            .backend
            .generate_content(&self.analysis_model, &request)
            .await
            .map_err(|e| FitGeniusError::Analysis(e.to_string()))?;

        let text = response
            .text()
            .ok_or_else(|| FitGeniusError::Analysis("Failed to analyze image".to_string()))?;

        let analysis: UserAnalysis = serde_json::from_str(&text)
            .map_err(|e| FitGeniusError::Analysis(format!("Failed to parse analysis JSON: {}", e)))?;

        info!(
            "Analysis finished in {}ms: {} / {}",
            start.elapsed().as_millis(),
            analysis.body_shape,
            analysis.skin_tone
        );
        Ok(analysis)
    }

    pub async fn generate_outfit_recommendation(
        &self,
        analysis: &UserAnalysis,
        style: StyleMode,
    ) -> Result<OutfitRecommendation, FitGeniusError> {
        let start = Instant::now();

        let request = GenerateContentRequest::new(
            vec![Part::text(recommendation_prompt(analysis, style))],
            GenerationConfig::json(recommendation_schema()),
        );

        let response = self
            .backend
            .generate_content(&self.recommendation_model, &request)
            .await
            .map_err(|e| FitGeniusError::Generation(e.to_string()))?;

        let text = response
            .text()
            .ok_or_else(|| FitGeniusError::Generation("Failed to generate outfit".to_string()))?;

        let recommendation: OutfitRecommendation = serde_json::from_str(&text).map_err(|e| {
            FitGeniusError::Generation(format!("Failed to parse outfit JSON: {}", e))
        })?;

        info!(
            "Outfit '{}' for {} with {} items in {}ms",
            recommendation.style_name,
            style.label(),
            recommendation.items.len(),
            start.elapsed().as_millis()
        );
        Ok(recommendation)
    }

    /// Renders the outfit; `original` conditions the result on the uploaded photo.
    pub async fn generate_outfit_image(
        &self,
        visual_prompt: &str,
        style: Option<StyleMode>,
        original: Option<&EncodedImage>,
    ) -> Result<EncodedImage, FitGeniusError> {
        let start = Instant::now();
        let environment = style.map(StyleMode::environment).unwrap_or(DEFAULT_ENVIRONMENT);

        let mut parts = Vec::with_capacity(2);
        if let Some(image) = original {
            parts.push(Part::image(image));
        }
        parts.push(Part::text(synthesis_prompt(visual_prompt, environment)));

        let request =
            GenerateContentRequest::new(parts, GenerationConfig::image(PREVIEW_ASPECT_RATIO));

        let result = self.render(&request).await;

        match &result {
            Ok(image) => info!(
                "Preview rendered in {}ms ({}, {} bytes)",
                start.elapsed().as_millis(),
                image.mime_type,
                image.data.len()
            ),
            Err(e) => error!("Image generation failed: {}", e),
        }
        result
    }

    async fn render(&self, request: &GenerateContentRequest) -> Result<EncodedImage, FitGeniusError> {
        let response = self
            .backend
            .generate_content(&self.image_model, request)
            .await
            .map_err(|e| FitGeniusError::Synthesis(e.to_string()))?;

        response
            .first_inline_image()?
            .ok_or_else(|| FitGeniusError::Synthesis("No image generated".to_string()))
    }
}

pub fn recommendation_prompt(analysis: &UserAnalysis, style: StyleMode) -> String {
    format!(
        "Act as a world-class fashion stylist.
Create a complete outfit recommendation for a {} with a {} body shape and {} skin tone.
The occasion/style is: {}.

Suggest specific items (Top, Bottom, Shoes, Accessory).
Provide a search query string for finding these items online.
Create a specific visual prompt that I can feed into an image generator to visualize this outfit.",
        analysis.gender,
        analysis.body_shape,
        analysis.skin_tone,
        style.display_name()
    )
}

pub fn synthesis_prompt(visual_prompt: &str, environment: &str) -> String {
    format!(
        "Professional fashion photography, full body shot, cinematic lighting, 8k resolution, photorealistic.
{}.
The model should be standing in a {}.
Ensure the outfit details match the description perfectly.",
        visual_prompt.trim().trim_end_matches('.'),
        environment
    )
}

fn analysis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "gender": { "type": "STRING" },
            "bodyShape": { "type": "STRING" },
            "skinTone": { "type": "STRING" },
            "detectedColors": { "type": "ARRAY", "items": { "type": "STRING" } },
            "vibe": { "type": "STRING" }
        },
        "required": ["gender", "bodyShape", "skinTone", "detectedColors", "vibe"]
    })
}

fn recommendation_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "styleName": { "type": "STRING" },
            "description": { "type": "STRING" },
            "items": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "type": { "type": "STRING" },
                        "name": { "type": "STRING" },
                        "color": { "type": "STRING" },
                        "description": { "type": "STRING" },
                        "shoppingQuery": { "type": "STRING" }
                    }
                }
            },
            "colorPalette": { "type": "ARRAY", "items": { "type": "STRING" } },
            "visualPrompt": { "type": "STRING" }
        },
        "required": ["styleName", "description", "visualPrompt"]
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::services::gemini::GenerateContentResponse;

    /// Replays canned responses and records every request it sees.
    #[derive(Default)]
    pub struct ScriptedBackend {
        responses: Mutex<VecDeque<Result<GenerateContentResponse, FitGeniusError>>>,
        pub calls: Mutex<Vec<(String, GenerateContentRequest)>>,
    }

    impl ScriptedBackend {
        pub fn push_text(&self, text: &str) {
            self.push(Ok(serde_json::from_value(json!({
                "candidates": [{ "content": { "parts": [{ "text": text }] } }]
            }))
            .unwrap()));
        }

        pub fn push_json(&self, value: serde_json::Value) {
            self.push_text(&value.to_string());
        }

        pub fn push_image(&self, mime_type: &str, b64: &str) {
            self.push(Ok(serde_json::from_value(json!({
                "candidates": [{ "content": { "parts": [
                    { "inlineData": { "mimeType": mime_type, "data": b64 } }
                ]}}]
            }))
            .unwrap()));
        }

        pub fn push_empty(&self) {
            self.push(Ok(GenerateContentResponse::default()));
        }

        pub fn push(&self, response: Result<GenerateContentResponse, FitGeniusError>) {
            self.responses.lock().unwrap().push_back(response);
        }

        pub fn calls(&self) -> Vec<(String, GenerateContentRequest)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl InferenceBackend for ScriptedBackend {
        async fn generate_content(
            &self,
            model: &str,
            request: &GenerateContentRequest,
        ) -> Result<GenerateContentResponse, FitGeniusError> {
            self.calls
                .lock()
                .unwrap()
                .push((model.to_string(), request.clone()));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(FitGeniusError::Upstream("no scripted response".into())))
        }
    }

    pub fn test_config() -> AppConfig {
        AppConfig::from_lookup(|key| (key == "GEMINI_API_KEY").then(|| "test-key".to_string()))
            .unwrap()
    }

    pub fn sample_analysis() -> serde_json::Value {
        json!({
            "gender": "female",
            "bodyShape": "Hourglass",
            "skinTone": "Warm Olive",
            "detectedColors": ["Navy", "Cream"],
            "vibe": "Classic"
        })
    }

    pub fn sample_outfit(visual_prompt: &str) -> serde_json::Value {
        json!({
            "styleName": "Neon Nights",
            "description": "Sequins and sharp tailoring",
            "items": [
                { "type": "Top", "name": "Sequin camisole", "color": "Silver",
                  "description": "Bias-cut", "shoppingQuery": "silver sequin camisole" },
                { "type": "Shoes", "name": "Strappy heels", "color": "Black",
                  "description": "Block heel", "shoppingQuery": "black block heel sandals" }
            ],
            "colorPalette": ["Silver", "Black"],
            "visualPrompt": visual_prompt
        })
    }
}
