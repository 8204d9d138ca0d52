//! OpenRouter-backed extractor.
//!
//! Sends one OpenAI-compatible Chat Completions request per message and reads
//! a JSON object out of the model's reply.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{ExtractedFields, Extraction, ExtractionError, Extractor};

/// Max tokens for the model's JSON reply.
const MAX_TOKENS: u32 = 200;

/// Low temperature keeps the JSON shape stable.
const TEMPERATURE: f32 = 0.1;

/// First `{` to last `}` of the reply.
static JSON_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("JSON object pattern is valid"));

#[derive(Debug, Serialize)]
pub(super) struct ApiMessage {
    pub(super) role: String,
    pub(super) content: String,
}

/// Request body for a Chat Completions call.
#[derive(Debug, Serialize)]
pub(super) struct ApiRequest {
    pub(super) model: String,
    pub(super) messages: Vec<ApiMessage>,
    pub(super) max_tokens: u32,
    pub(super) temperature: f32,
}

#[derive(Debug, Deserialize)]
pub(super) struct ApiResponse {
    pub(super) choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Choice {
    pub(super) message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChoiceMessage {
    #[serde(default)]
    pub(super) content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ApiError {
    pub(super) error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorDetail {
    pub(super) message: String,
}

/// The JSON object the model is asked to produce.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ModelReply {
    #[serde(flatten)]
    fields: ExtractedFields,
    confidence: Option<f64>,
    suggested_step: Option<String>,
}

/// Extractor that asks a hosted model via OpenRouter.
pub struct OpenRouterExtractor {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl OpenRouterExtractor {
    /// Create an extractor for `model` behind `base_url`
    /// (e.g. `https://openrouter.ai/api/v1`).
    pub fn new(api_key: impl Into<String>, base_url: &str, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.into(),
        }
    }

    fn build_request(&self, text: &str, current_step: &str) -> ApiRequest {
        ApiRequest {
            model: self.model.clone(),
            messages: vec![ApiMessage {
                role: "user".to_string(),
                content: build_prompt(text, current_step),
            }],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        }
    }

    async fn try_extract(&self, text: &str, current_step: &str) -> Result<Extraction, ExtractionError> {
        let request = self.build_request(text, current_step);
        let content = complete_request(&self.client, &self.endpoint, &self.api_key, &request).await?;
        parse_extraction(&content, current_step)
    }
}

#[async_trait]
impl Extractor for OpenRouterExtractor {
    async fn extract(&self, text: &str, current_step: &str) -> Extraction {
        match self.try_extract(text, current_step).await {
            Ok(extraction) => extraction,
            Err(e) => {
                tracing::warn!(error = %e, step = current_step, "AI extraction failed");
                Extraction::none(current_step)
            }
        }
    }
}

pub(super) fn build_prompt(text: &str, current_step: &str) -> String {
    format!(
        r#"Extract info from: "{text}"
The conversation is currently at step "{current_step}".

IMPORTANT RULES:
- If message contains "I supply", "I sell", "vendor", "supplier", "dealer", "store", "business" -> userType: "vendor"
- If message contains "I need", "I want", "looking for", "require", "buy" -> userType: "buyer"

Return JSON:
{{
  "userType": "buyer" or "vendor" or null,
  "city": "city name" or null,
  "material": "cement" or "tmt" or "both" or null,
  "quantity": "amount" or null,
  "brand": "brand name" or null,
  "vendorName": "company name" or null,
  "vendorPhone": "phone" or null,
  "materials": ["cement","tmt"] or null,
  "confidence": 0.0-1.0,
  "suggestedStep": "confirm" or "vendor_confirm" or "get_city" or "get_quantity"
}}

Examples:
"I supply cement" -> userType: "vendor", suggestedStep: "vendor_confirm"
"I need cement in Guwahati" -> userType: "buyer", suggestedStep: "confirm""#
    )
}

/// Read the JSON object out of a model reply.
pub(super) fn parse_extraction(
    content: &str,
    current_step: &str,
) -> Result<Extraction, ExtractionError> {
    let json = JSON_OBJECT
        .find(content)
        .ok_or_else(|| ExtractionError::InvalidResponse("no JSON object in reply".to_string()))?;
    let reply: ModelReply = serde_json::from_str(json.as_str())
        .map_err(|e| ExtractionError::InvalidResponse(e.to_string()))?;

    let confidence = reply.confidence.unwrap_or(0.0).clamp(0.0, 1.0);
    Ok(Extraction {
        extracted: !reply.fields.is_empty() && confidence > 0.0,
        confidence,
        data: reply.fields,
        suggested_step: reply
            .suggested_step
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| current_step.to_string()),
    })
}

/// Send a completion request and return the reply text.
pub(super) async fn complete_request(
    client: &reqwest::Client,
    endpoint: &str,
    api_key: &str,
    request: &ApiRequest,
) -> Result<String, ExtractionError> {
    tracing::debug!(endpoint, "openrouter: POST extraction request");
    let response = client
        .post(endpoint)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(request)
        .send()
        .await
        .map_err(|e| ExtractionError::RequestFailed(e.to_string()))?;

    let status = response.status();
    tracing::debug!(status = status.as_u16(), "openrouter: response status");

    if status == reqwest::StatusCode::UNAUTHORIZED {
        let error_body: ApiError = response.json().await.unwrap_or_else(|_| ApiError {
            error: ErrorDetail {
                message: "Invalid API key".to_string(),
            },
        });
        return Err(ExtractionError::AuthenticationError(error_body.error.message));
    }

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        return Err(ExtractionError::RequestFailed(format!(
            "HTTP {}: {}",
            status, error_text
        )));
    }

    let api_response: ApiResponse = response
        .json()
        .await
        .map_err(|e| ExtractionError::InvalidResponse(format!("failed to parse response: {}", e)))?;

    api_response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ExtractionError::InvalidResponse("no choices in response".to_string()))
}
