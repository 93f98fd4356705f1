// src/config.rs
use std::time::Duration;

use crate::errors::FitGeniusError;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_ANALYSIS_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_RECOMMENDATION_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

/// Startup configuration, read once from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub base_url: String,
    pub analysis_model: String,
    pub recommendation_model: String,
    pub image_model: String,
    pub bind_addr: String,
    /// No timeout when unset.
    pub request_timeout: Option<Duration>,
    /// Uploaded images pass through untouched when unset.
    pub max_image_dimension: Option<u32>,
    /// Idle sessions are evicted after this long. `None` keeps them until deleted.
    pub session_ttl: Option<Duration>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, FitGeniusError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, FitGeniusError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("GEMINI_API_KEY")
            .or_else(|| get("API_KEY"))
            .ok_or_else(|| {
                FitGeniusError::Configuration(
                    "GEMINI_API_KEY (or API_KEY) must be set".to_string(),
                )
            })?;

        let request_timeout =
            parse_number::<u64>("FITGENIUS_REQUEST_TIMEOUT_SECS", get("FITGENIUS_REQUEST_TIMEOUT_SECS"))?
                .map(Duration::from_secs);
        let max_image_dimension =
            parse_number::<u32>("FITGENIUS_MAX_IMAGE_DIMENSION", get("FITGENIUS_MAX_IMAGE_DIMENSION"))?;

        // 0 turns eviction off.
        let session_ttl =
            match parse_number::<u64>("FITGENIUS_SESSION_TTL_SECS", get("FITGENIUS_SESSION_TTL_SECS"))? {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => Some(DEFAULT_SESSION_TTL),
            };

        if max_image_dimension == Some(0) {
            return Err(FitGeniusError::Configuration(
                "FITGENIUS_MAX_IMAGE_DIMENSION must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            api_key,
            base_url: get("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            analysis_model: get("FITGENIUS_ANALYSIS_MODEL")
                .unwrap_or_else(|| DEFAULT_ANALYSIS_MODEL.to_string()),
            recommendation_model: get("FITGENIUS_RECOMMENDATION_MODEL")
                .unwrap_or_else(|| DEFAULT_RECOMMENDATION_MODEL.to_string()),
            image_model: get("FITGENIUS_IMAGE_MODEL")
                .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            bind_addr: get("FITGENIUS_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()),
            request_timeout,
            max_image_dimension,
            session_ttl,
        })
    }
}

fn parse_number<T: std::str::FromStr>(
    key: &str,
    value: Option<String>,
) -> Result<Option<T>, FitGeniusError> {
    value
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|_| {
                FitGeniusError::Configuration(format!("{} is not a valid number: {}", key, raw))
            })
        })
        .transpose()
}
