//! The structured-extraction boundary.
//!
//! The pipeline hands raw résumé text to an [`ExtractionDelegate`] and gets
//! JSON text back. What happens in between is the delegate's business; the
//! shipped [`LlmDelegate`] asks an OpenAI-compatible chat completion API.

use std::time::Duration;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Config;

/// Turns raw document text into a JSON string of structured fields.
#[async_trait]
pub trait ExtractionDelegate: Send + Sync {
    async fn extract(&self, text: &str) -> Result<String>;

    fn name(&self) -> &str;

    fn is_available(&self) -> bool {
        true
    }
}

const SYSTEM_PROMPT: &str = r#"You are an AI bot designed to act as a professional for parsing resumes. You are given a resume and your job is to extract the following information from it:
1. full_name
2. email
3. phone
4. github (portfolio or profile URL)
5. linkedin (profile URL)
6. summary (two or three sentences)
7. employment_details (array of objects with company, title, start_date, end_date, highlights)
8. education (array of objects with institution, degree, field, graduation_date)
9. technical_skills (array of strings)
10. soft_skills (array of strings)
Use null for anything the resume does not mention. Respond with a single JSON object using exactly these keys and nothing else."#;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Delegate backed by a remote language model.
pub struct LlmDelegate {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl LlmDelegate {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.llm_timeout_seconds))
            .build()
            .context("Failed to build HTTP client for the extraction delegate")?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.llm_api_url.trim_end_matches('/')),
            api_key: config.llm_api_key.clone(),
            model: config.llm_model.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ExtractionDelegate for LlmDelegate {
    async fn extract(&self, text: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("no LLM API key configured"))?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: text },
            ],
            temperature: 0.0,
            response_format: ResponseFormat { kind: "json_object" },
        };

        debug!(model = %self.model, text_length = text.len(), "Calling extraction model");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .context("extraction request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("extraction API returned {}: {}", status, truncate(&body, 200));
        }

        let reply: ChatResponse = response
            .json()
            .await
            .context("extraction API returned an unreadable response")?;

        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("extraction API returned no content"))?;

        info!(model = %self.model, reply_length = content.len(), "Extraction model replied");
        Ok(strip_code_fence(&content).to_string())
    }

    fn name(&self) -> &str {
        "llm"
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Models sometimes wrap JSON in a Markdown fence despite being asked not to.
pub fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line.
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
