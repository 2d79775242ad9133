use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::config::ChatSettings;
use crate::core::models::usage::CallUsage;
use crate::core::pricing::{self, ModelPricing};

/// Completed chat round-trip: the answer plus the usage observed for it.
#[derive(Debug)]
pub struct ChatOutcome {
    pub answer: String,
    pub usage: CallUsage,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: u64,
}

/// Client for OpenAI-compatible chat completion endpoints.
pub struct ChatClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    pricing: &'static ModelPricing,
}

impl ChatClient {
    /// Builds a client from config plus the environment contract:
    /// OPENAI_API_KEY is required, OPENAI_API_BASE overrides the configured
    /// endpoint. Fails up front when the model has no pricing entry, so no
    /// paid call can end up unpriced.
    pub fn from_config(chat: &ChatSettings, model_override: Option<String>) -> Result<Self> {
        let api_key =
            std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY env var not set")?;
        if api_key.is_empty() {
            anyhow::bail!("OPENAI_API_KEY is empty");
        }
        let base_url =
            std::env::var("OPENAI_API_BASE").unwrap_or_else(|_| chat.base_url.clone());
        let model = model_override.unwrap_or_else(|| chat.model.clone());
        let pricing = pricing::lookup(&model).with_context(|| {
            format!(
                "No pricing known for model '{}'; use `aim record --cost` for calls made with it",
                model
            )
        })?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
            model,
            pricing,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// One question, deterministic settings, answer plus usage back.
    pub async fn ask(&self, prompt: &str) -> Result<ChatOutcome> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0.0,
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to send chat request to {}", url))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            anyhow::bail!("Unauthorized - check your OPENAI_API_KEY");
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("HTTP {} from chat endpoint: {}", status.as_u16(), body);
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("Failed to parse chat response")?;
        outcome_from_response(parsed, self.pricing)
    }
}

/// Assemble answer and usage out of a decoded response. Split out so the
/// response handling stays testable without a server.
fn outcome_from_response(
    response: ChatResponse,
    pricing: &'static ModelPricing,
) -> Result<ChatOutcome> {
    let answer = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .context("Chat response contained no message content")?;
    let api_usage = response
        .usage
        .context("Chat response contained no usage block")?;

    let total_cost = pricing::calculate_cost(
        pricing,
        api_usage.prompt_tokens,
        api_usage.completion_tokens,
    );
    let usage = CallUsage {
        total_tokens: api_usage.total_tokens,
        prompt_tokens: api_usage.prompt_tokens,
        completion_tokens: api_usage.completion_tokens,
        total_cost,
    };
    Ok(ChatOutcome { answer, usage })
}
