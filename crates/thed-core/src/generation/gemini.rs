//! Google Gemini generator.
//!
//! Calls `models/{model}:generateContent` with a JSON response schema and
//! parses the returned text as suggestions. Auth via URL query param.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{debug, warn};
use url::Url;

use super::fallback::{fallback_routine, fallback_single};
use crate::error::GenerationError;
use crate::gateway::TaskGenerator;
use crate::task::Suggestion;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

const SINGLE_PROMPT: &str = "Generate one quick productivity boost task under 8 words.";

pub struct GeminiGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl GeminiGenerator {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
            model: model.into(),
        }
    }

    fn endpoint(&self, api_key: &str) -> Result<Url, GenerationError> {
        let mut base = self.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let mut url = Url::parse(&base)?.join(&format!("models/{}:generateContent", self.model))?;
        url.query_pairs_mut().append_pair("key", api_key);
        Ok(url)
    }

    async fn generate(&self, prompt: &str, schema: Value) -> Result<String, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(GenerationError::MissingApiKey)?;
        let start = Instant::now();

        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: schema,
            },
        };

        debug!("gemini: POST models/{}:generateContent", self.model);
        let resp = self
            .client
            .post(self.endpoint(api_key)?)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Status { status, body });
        }

        let parsed: GeminiResponse = resp.json().await?;
        let text = parsed
            .candidates
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.first())
            .map(|p| p.text.clone())
            .ok_or_else(|| GenerationError::Payload("no candidates".into()))?;

        debug!(
            "gemini: response in {}ms",
            start.elapsed().as_millis()
        );
        Ok(text)
    }

    pub async fn try_routine_batch(&self, count: usize) -> Result<Vec<Suggestion>, GenerationError> {
        let prompt = format!(
            "Generate {count} easy wellness micro-tasks for a {count}-hour flow. \
             Format as JSON list of title and description."
        );
        let schema = json!({ "type": "ARRAY", "items": suggestion_schema() });
        let text = self.generate(&prompt, schema).await?;
        parse_batch(&text, count)
    }

    pub async fn try_single(&self) -> Result<Suggestion, GenerationError> {
        let text = self.generate(SINGLE_PROMPT, suggestion_schema()).await?;
        parse_single(&text)
    }
}

#[async_trait]
impl TaskGenerator for GeminiGenerator {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate_routine_batch(&self, count: usize) -> Vec<Suggestion> {
        match self.try_routine_batch(count).await {
            Ok(items) => items,
            Err(e) => {
                warn!("gemini failed to generate routine tasks, using fallback: {e}");
                let mut items = fallback_routine();
                items.truncate(count);
                items
            }
        }
    }

    async fn generate_single_suggestion(&self) -> Suggestion {
        match self.try_single().await {
            Ok(item) => item,
            Err(e) => {
                warn!("gemini failed to generate single task, using fallback: {e}");
                fallback_single()
            }
        }
    }
}

fn suggestion_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "description": { "type": "STRING" }
        },
        "required": ["title", "description"]
    })
}

fn parse_batch(text: &str, count: usize) -> Result<Vec<Suggestion>, GenerationError> {
    let mut items: Vec<Suggestion> = serde_json::from_str::<Vec<Suggestion>>(text)
        .map_err(|e| GenerationError::Payload(e.to_string()))?
        .into_iter()
        .filter(|s| !s.title.trim().is_empty())
        .collect();
    if items.is_empty() {
        return Err(GenerationError::Payload("empty batch".into()));
    }
    items.truncate(count);
    Ok(items)
}

fn parse_single(text: &str) -> Result<Suggestion, GenerationError> {
    let item: Suggestion =
        serde_json::from_str(text).map_err(|e| GenerationError::Payload(e.to_string()))?;
    if item.title.trim().is_empty() {
        return Err(GenerationError::Payload("empty title".into()));
    }
    Ok(item)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: Value,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}
