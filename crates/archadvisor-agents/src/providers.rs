//! LLM transport abstraction. The engine speaks to one chat-completions
//! endpoint; everything OpenAI-compatible (OpenAI, OpenRouter, Groq, local
//! gateways) works through the same provider by changing the base URL.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use archadvisor_core::Settings;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub usage: TokenUsage,
}

#[async_trait]
pub trait Provider: Send + Sync {
    fn id(&self) -> &str;

    async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
        model: &str,
    ) -> anyhow::Result<Completion>;
}

pub struct OpenAICompatibleProvider {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl OpenAICompatibleProvider {
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client: Client::new(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.provider_base_url, settings.provider_api_key.clone())
    }
}

#[async_trait]
impl Provider for OpenAICompatibleProvider {
    fn id(&self) -> &str {
        "openai-compatible"
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
        model: &str,
    ) -> anyhow::Result<Completion> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut request = self.client.post(url).json(&json!({
            "model": model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_message},
            ],
            "stream": false,
        }));
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        let value: serde_json::Value = response.json().await?;

        if !status.is_success() {
            let detail = extract_error(&value)
                .unwrap_or_else(|| format!("provider request failed with status {status}"));
            anyhow::bail!(detail);
        }
        if let Some(detail) = extract_error(&value) {
            anyhow::bail!(detail);
        }

        let content = value["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string);
        let Some(content) = content.filter(|c| !c.trim().is_empty()) else {
            anyhow::bail!("provider returned no completion content for model `{model}`");
        };

        Ok(Completion {
            content,
            usage: extract_usage(&value),
        })
    }
}

fn extract_error(value: &serde_json::Value) -> Option<String> {
    value
        .get("error")
        .and_then(|v| v.get("message"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

fn extract_usage(value: &serde_json::Value) -> TokenUsage {
    let usage = value.get("usage");
    TokenUsage {
        input_tokens: usage
            .and_then(|u| u.get("prompt_tokens"))
            .and_then(|v| v.as_u64())
            .unwrap_or(0),
        output_tokens: usage
            .and_then(|u| u.get("completion_tokens"))
            .and_then(|v| v.as_u64())
            .unwrap_or(0),
    }
}

/// Offline fallback used when no API key is configured: echoes a canned
/// shape so the pipeline stays exercisable.
pub struct LocalEchoProvider;

#[async_trait]
impl Provider for LocalEchoProvider {
    fn id(&self) -> &str {
        "local-echo"
    }

    async fn complete(
        &self,
        _system_prompt: &str,
        user_message: &str,
        _model: &str,
    ) -> anyhow::Result<Completion> {
        Ok(Completion {
            content: format!("{{\"echo\": {}}}", serde_json::Value::String(user_message.into())),
            usage: TokenUsage::default(),
        })
    }
}

/// Pick the configured provider, falling back to the echo provider when no
/// key is present.
pub fn build_provider(settings: &Settings) -> Arc<dyn Provider> {
    if settings.provider_api_key.is_some() {
        Arc::new(OpenAICompatibleProvider::from_settings(settings))
    } else {
        tracing::warn!("no provider API key configured; using local echo provider");
        Arc::new(LocalEchoProvider)
    }
}
