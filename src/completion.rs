use log::debug;

use crate::config::COMPLETION_KEY_ENV;
use crate::error::CompletionError;

const REFINE_SYSTEM_PROMPT: &str = "You are a helpful assistant that improves the readability of transcripts \
while preserving all the original content. Add proper punctuation, fix grammar, and organize the text into \
paragraphs where appropriate. Do not add or remove any information from the original transcript.";

const REPURPOSE_SYSTEM_PROMPT: &str = "You are a helpful assistant that converts transcripts into a series of \
tweets. Each tweet must be 280 characters or less. Break the content into logical, self-contained tweets that \
maintain context and flow. Number each tweet. Make sure each tweet is engaging and can stand on its own.";

pub const REFINE_TEMPERATURE: f64 = 0.1;
pub const REPURPOSE_TEMPERATURE: f64 = 0.7;

/// Client for an OpenAI-compatible chat completion API
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl ChatClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
        }
    }

    /// Clean up punctuation, grammar and paragraphing of a raw transcript
    pub async fn refine(&self, transcript: &str) -> Result<String, CompletionError> {
        self.complete(REFINE_SYSTEM_PROMPT, transcript, REFINE_TEMPERATURE).await
    }

    /// Ask for a numbered series of short posts; the reply is returned unparsed
    pub async fn repurpose(&self, transcript: &str) -> Result<String, CompletionError> {
        self.complete(REPURPOSE_SYSTEM_PROMPT, transcript, REPURPOSE_TEMPERATURE).await
    }

    async fn complete(&self, system: &str, user: &str, temperature: f64) -> Result<String, CompletionError> {
        let api_key = self.api_key.as_deref().ok_or(CompletionError::MissingApiKey {
            env_var: COMPLETION_KEY_ENV,
        })?;

        debug!(
            "Requesting completion with model {} (temperature {temperature}, {} chars)",
            self.model,
            user.len()
        );

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": system
                },
                {
                    "role": "user",
                    "content": user
                }
            ],
            "temperature": temperature
        });

        let resp = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(CompletionError::Status { status, body });
        }

        let json: serde_json::Value = resp.json().await?;
        extract_content(&json).ok_or(CompletionError::EmptyContent)
    }
}

/// First choice's message content, if present and not blank
fn extract_content(json: &serde_json::Value) -> Option<String> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
        .filter(|t| !t.trim().is_empty())
        .map(str::to_string)
}
