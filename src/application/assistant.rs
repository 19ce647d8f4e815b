//! Writing-assistant proxy: forwards chat completions to the configured
//! LLM providers with provider-specific request and response shapes.

use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use crate::config::AssistantSettings;
use crate::domain::types::AssistantProvider;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const GOOGLE_GENERATE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostTier {
    Low,
    Medium,
    High,
}

/// Catalog entry for a selectable assistant model.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub provider: AssistantProvider,
    pub context_length: u32,
    pub cost_tier: CostTier,
}

/// Models the selector offers. Provider routing goes through this catalog,
/// never through substring sniffing of the model id.
pub const AVAILABLE_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "gpt-4o-mini",
        name: "GPT-4o Mini",
        provider: AssistantProvider::Openai,
        context_length: 128_000,
        cost_tier: CostTier::Low,
    },
    ModelInfo {
        id: "gpt-4o",
        name: "GPT-4o",
        provider: AssistantProvider::Openai,
        context_length: 128_000,
        cost_tier: CostTier::Medium,
    },
    ModelInfo {
        id: "claude-3-5-haiku-latest",
        name: "Claude 3.5 Haiku",
        provider: AssistantProvider::Anthropic,
        context_length: 200_000,
        cost_tier: CostTier::Low,
    },
    ModelInfo {
        id: "claude-3-7-sonnet-latest",
        name: "Claude 3.7 Sonnet",
        provider: AssistantProvider::Anthropic,
        context_length: 200_000,
        cost_tier: CostTier::Medium,
    },
    ModelInfo {
        id: "gemini-1.5-pro",
        name: "Gemini 1.5 Pro",
        provider: AssistantProvider::Google,
        context_length: 128_000,
        cost_tier: CostTier::Medium,
    },
];

pub fn model_info(model_id: &str) -> Option<&'static ModelInfo> {
    AVAILABLE_MODELS.iter().find(|model| model.id == model_id)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("unknown model `{0}`")]
    UnknownModel(String),
    #[error("messages must not be empty")]
    EmptyMessages,
    #[error("api key for provider `{0}` is not configured")]
    MissingApiKey(&'static str),
    #[error("provider returned status {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("provider request failed: {0}")]
    Transport(String),
    #[error("provider response had an unexpected shape")]
    MalformedResponse,
}

impl From<reqwest::Error> for AssistantError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[derive(Clone)]
pub struct AssistantService {
    http: reqwest::Client,
    settings: AssistantSettings,
}

impl AssistantService {
    pub fn new(http: reqwest::Client, settings: AssistantSettings) -> Self {
        Self { http, settings }
    }

    pub fn models(&self) -> &'static [ModelInfo] {
        AVAILABLE_MODELS
    }

    /// Forward a chat completion to the provider owning `model_id` and
    /// normalise the reply to plain text.
    pub async fn complete(
        &self,
        model_id: &str,
        messages: &[ChatMessage],
    ) -> Result<String, AssistantError> {
        if messages.is_empty() {
            return Err(AssistantError::EmptyMessages);
        }
        let model = model_info(model_id)
            .ok_or_else(|| AssistantError::UnknownModel(model_id.to_string()))?;

        counter!("lettera_assistant_requests_total").increment(1);

        match model.provider {
            AssistantProvider::Openai => self.complete_openai(model, messages).await,
            AssistantProvider::Anthropic => self.complete_anthropic(model, messages).await,
            AssistantProvider::Google => self.complete_google(model, messages).await,
        }
    }

    async fn complete_openai(
        &self,
        model: &ModelInfo,
        messages: &[ChatMessage],
    ) -> Result<String, AssistantError> {
        let key = self
            .settings
            .openai_api_key
            .as_deref()
            .ok_or(AssistantError::MissingApiKey("openai"))?;

        let body = json!({
            "model": model.id,
            "messages": messages,
            "temperature": self.settings.temperature,
            "max_tokens": self.settings.max_tokens,
        });

        let response = self
            .http
            .post(OPENAI_CHAT_URL)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;
        let payload = check_status(response).await?;

        payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(AssistantError::MalformedResponse)
    }

    async fn complete_anthropic(
        &self,
        model: &ModelInfo,
        messages: &[ChatMessage],
    ) -> Result<String, AssistantError> {
        let key = self
            .settings
            .anthropic_api_key
            .as_deref()
            .ok_or(AssistantError::MissingApiKey("anthropic"))?;

        // The messages endpoint takes system text as a top-level field, not
        // as a conversation turn.
        let system = messages
            .iter()
            .filter(|message| message.role == "system")
            .map(|message| message.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let turns: Vec<&ChatMessage> = messages
            .iter()
            .filter(|message| message.role != "system")
            .collect();

        let mut body = json!({
            "model": model.id,
            "messages": turns,
            "max_tokens": self.settings.max_tokens,
        });
        if !system.is_empty() {
            body["system"] = Value::String(system);
        }

        let response = self
            .http
            .post(ANTHROPIC_MESSAGES_URL)
            .header("x-api-key", key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;
        let payload = check_status(response).await?;

        payload
            .pointer("/content/0/text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(AssistantError::MalformedResponse)
    }

    async fn complete_google(
        &self,
        model: &ModelInfo,
        messages: &[ChatMessage],
    ) -> Result<String, AssistantError> {
        let key = self
            .settings
            .google_api_key
            .as_deref()
            .ok_or(AssistantError::MissingApiKey("google"))?;

        let contents: Vec<Value> = messages
            .iter()
            .map(|message| {
                let role = if message.role == "assistant" {
                    "model"
                } else {
                    "user"
                };
                json!({"role": role, "parts": [{"text": message.content}]})
            })
            .collect();

        let url = format!("{GOOGLE_GENERATE_URL}/{}:generateContent", model.id);
        let body = json!({
            "contents": contents,
            "generationConfig": {
                "temperature": self.settings.temperature,
                "maxOutputTokens": self.settings.max_tokens,
            },
        });

        let response = self
            .http
            .post(&url)
            .query(&[("key", key)])
            .json(&body)
            .send()
            .await?;
        let payload = check_status(response).await?;

        payload
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(AssistantError::MalformedResponse)
    }
}

async fn check_status(response: reqwest::Response) -> Result<Value, AssistantError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(AssistantError::Upstream {
            status: status.as_u16(),
            message,
        });
    }
    response
        .json::<Value>()
        .await
        .map_err(AssistantError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lookup_routes_by_id() {
        assert_eq!(
            model_info("gpt-4o").map(|model| model.provider),
            Some(AssistantProvider::Openai)
        );
        assert_eq!(
            model_info("claude-3-5-haiku-latest").map(|model| model.provider),
            Some(AssistantProvider::Anthropic)
        );
        assert!(model_info("gpt-4o-turbo-preview").is_none());
    }

    #[test]
    fn catalog_ids_are_unique() {
        for (index, model) in AVAILABLE_MODELS.iter().enumerate() {
            assert!(
                AVAILABLE_MODELS[index + 1..]
                    .iter()
                    .all(|other| other.id != model.id),
                "duplicate model id `{}`",
                model.id
            );
        }
    }
}
