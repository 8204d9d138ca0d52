//! Best-effort structured extraction from free text.
//!
//! Defines the [`Extractor`] port used by the flow engine's AI-assist overlay.
//! Extraction never fails from the caller's point of view: adapters swallow
//! their own errors and report "nothing extracted".

mod mock;
mod openrouter;

pub use mock::MockExtractor;
pub use openrouter::OpenRouterExtractor;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::ExtractionConfig;


/// Environment variable holding the OpenRouter API key.
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Fields an extractor may recover from a message. All optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractedFields {
    /// `buyer` or `vendor`.
    pub user_type: Option<String>,
    /// City name.
    pub city: Option<String>,
    /// `cement`, `tmt` or `both`.
    pub material: Option<String>,
    /// Free-text quantity.
    pub quantity: Option<String>,
    /// Brand preference.
    pub brand: Option<String>,
    /// Vendor company name.
    pub vendor_name: Option<String>,
    /// Vendor phone.
    pub vendor_phone: Option<String>,
    /// Materials a vendor supplies.
    pub materials: Option<Vec<String>>,
}

impl ExtractedFields {
    /// Whether no field was recovered.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Result of one extraction attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Whether anything usable was recovered.
    pub extracted: bool,
    /// Extractor's confidence, `0.0..=1.0`.
    pub confidence: f64,
    /// Recovered fields.
    pub data: ExtractedFields,
    /// Step the extractor thinks the conversation should move to.
    pub suggested_step: String,
}

impl Extraction {
    /// "Nothing extracted"; the suggestion stays on `current_step`.
    pub fn none(current_step: &str) -> Self {
        Self {
            extracted: false,
            confidence: 0.0,
            data: ExtractedFields::default(),
            suggested_step: current_step.to_string(),
        }
    }

    /// Whether this result is strong enough to act on: confidence strictly
    /// above `threshold`.
    pub fn is_confident(&self, threshold: f64) -> bool {
        self.extracted && self.confidence > threshold
    }
}

/// Errors inside extractor adapters. Never returned through [`Extractor`].
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// Network or connection failure.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The API key was rejected.
    #[error("authentication failed: {0}")]
    AuthenticationError(String),

    /// The model's reply could not be understood.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Port for free-text extraction.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Inspect `text` in the context of `current_step`.
    async fn extract(&self, text: &str, current_step: &str) -> Extraction;
}

/// Extractor that never recovers anything; the structured flow runs alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledExtractor;

#[async_trait]
impl Extractor for DisabledExtractor {
    async fn extract(&self, _text: &str, current_step: &str) -> Extraction {
        Extraction::none(current_step)
    }
}

/// Create the extractor described by `config`.
///
/// The API key comes from `OPENROUTER_API_KEY`, then `config.api_key`. A
/// disabled section or a missing key yields a [`DisabledExtractor`].
pub fn create_extractor(config: &ExtractionConfig) -> Box<dyn Extractor> {
    if !config.enabled {
        tracing::info!("AI extraction disabled by config");
        return Box::new(DisabledExtractor);
    }

    match resolve_api_key(config) {
        Some(api_key) => {
            tracing::info!(model = %config.model, "AI extraction enabled");
            Box::new(OpenRouterExtractor::new(
                api_key,
                &config.base_url,
                &config.model,
            ))
        }
        None => {
            tracing::warn!(
                "No {} or extraction.api_key set, AI extraction disabled",
                API_KEY_ENV
            );
            Box::new(DisabledExtractor)
        }
    }
}

/// Priority: environment variable > config.api_key. Empty values count as unset.
fn resolve_api_key(config: &ExtractionConfig) -> Option<String> {
    if let Ok(key) = std::env::var(API_KEY_ENV)
        && !key.is_empty()
    {
        return Some(key);
    }
    config.api_key.clone().filter(|k| !k.is_empty())
}
