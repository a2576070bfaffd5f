//! Generative advisory responder.
//!
//! Forwards the conversation to a Gemini-style `generateContent` endpoint and
//! returns the first candidate's first text part. A response with no usable
//! text degrades to an empty string; any transport or HTTP failure surfaces
//! as a generation error. No retries, no internal timeout — callers that
//! need one impose it externally.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ResponderConfig;
use crate::error::{ApiError, ApiResult};

use super::{AdvisoryResponder, ChatTurn};

pub struct GenerativeResponder {
    client: reqwest::Client,
    api_url: String,
    model: String,
    api_key: String,
    default_system: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerativeResponder {
    pub fn new(config: &ResponderConfig) -> anyhow::Result<Self> {
        anyhow::ensure!(
            !config.api_key.is_empty(),
            "generative responder selected but no API key set (GEMINI_API_KEY)"
        );
        Ok(Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            default_system: config.system_prompt.clone(),
        })
    }
}

#[async_trait]
impl AdvisoryResponder for GenerativeResponder {
    async fn respond(&self, turns: &[ChatTurn], system: Option<&str>) -> ApiResult<String> {
        let request = GenerateRequest {
            system_instruction: Some(system_content(
                system.unwrap_or(&self.default_system),
            )),
            contents: to_contents(turns),
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_url, self.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ApiError::Generation(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Generation(format!(
                "model endpoint returned HTTP {status}"
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Generation(format!("malformed model response: {e}")))?;

        Ok(extract_text(body))
    }
}

fn system_content(text: &str) -> Content {
    Content {
        role: None,
        parts: vec![Part { text: text.into() }],
    }
}

/// Map conversation roles onto the two the wire format knows. Anything that
/// is not an assistant turn is treated as user input.
fn to_contents(turns: &[ChatTurn]) -> Vec<Content> {
    turns
        .iter()
        .map(|turn| {
            let role = match turn.role.as_str() {
                "assistant" | "model" => "model",
                _ => "user",
            };
            Content {
                role: Some(role.into()),
                parts: vec![Part {
                    text: turn.content.clone(),
                }],
            }
        })
        .collect()
}

/// First candidate, first non-empty text part; empty string when the model
/// returned nothing usable.
fn extract_text(response: GenerateResponse) -> String {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .map(|p| p.text)
                .find(|t| !t.is_empty())
                .unwrap_or_default()
        })
        .unwrap_or_default()
}
