//! Language-model clients.
//!
//! [`GroqModel`] calls the Groq chat-completions API with retrieved chunks
//! stuffed into the system prompt. [`OfflineModel`] is the credential-free
//! substitute: a deterministic answer that echoes the query, recognizable
//! in tests by [`OFFLINE_ANSWER_PREFIX`].
//!
//! External calls are made exactly once; a failure is surfaced to the
//! caller as an error result, never retried here.

use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::config::LlmConfig;

const GROQ_CHAT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Fixed prefix of every offline-mode answer.
pub const OFFLINE_ANSWER_PREFIX: &str = "Simulated answer for query:";

/// A model that can answer a query given retrieved context.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier, for logging.
    fn name(&self) -> &str;

    /// Answer `query` using `context` chunks. One attempt, no retries.
    async fn answer(&self, query: &str, context: &[String]) -> Result<String>;
}

// ============ Offline substitute ============

/// Deterministic placeholder model used when no API key is configured.
pub struct OfflineModel;

#[async_trait]
impl LanguageModel for OfflineModel {
    fn name(&self) -> &str {
        "offline"
    }

    async fn answer(&self, query: &str, _context: &[String]) -> Result<String> {
        Ok(format!(
            "{} '{}'. This answer is based on the stored document content.",
            OFFLINE_ANSWER_PREFIX, query
        ))
    }
}

// ============ Groq ============

/// Client for the Groq OpenAI-compatible chat-completions endpoint.
pub struct GroqModel {
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl GroqModel {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| anyhow!("GROQ_API_KEY not set"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            model: config.model.clone(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl LanguageModel for GroqModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn answer(&self, query: &str, context: &[String]) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": build_system_prompt(context) },
                { "role": "user", "content": query },
            ],
        });

        let response = self
            .client
            .post(GROQ_CHAT_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("Groq API error {}: {}", status, text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_chat_response(&json)
    }
}

fn build_system_prompt(context: &[String]) -> String {
    if context.is_empty() {
        return "You are a helpful assistant answering questions about uploaded documents. \
                No relevant document content was retrieved for this question; say so if \
                you cannot answer from general knowledge."
            .to_string();
    }
    let mut prompt = String::from(
        "You are a helpful assistant answering questions about uploaded documents. \
         Answer using only the following document excerpts.\n",
    );
    for (i, excerpt) in context.iter().enumerate() {
        prompt.push_str(&format!("\n--- Excerpt {} ---\n{}\n", i + 1, excerpt));
    }
    prompt
}

fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("invalid chat response: missing choices[0].message.content"))
}
