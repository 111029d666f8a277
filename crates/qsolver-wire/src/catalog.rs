//! OpenAI-compatible model listing and connectivity checks

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Endpoint used when no base URL is configured
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Upper bound for a connectivity check
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(15);

/// Client for the model-listing and chat endpoints of an OpenAI-compatible API
pub struct OpenAiCatalog {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiCatalog {
    /// Create a catalog client. An empty base URL selects the default endpoint.
    pub fn new(api_key: impl Into<String>, base_url: &str) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::InvalidApiKey);
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: normalize_base_url(base_url),
        })
    }

    /// Endpoint this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List model identifiers
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/models", self.base_url);
        tracing::debug!(%url, "listing models");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let list: ModelList = response.json().await?;
        Ok(list.data.into_iter().map(|m| m.id).collect())
    }

    /// Send a one-token chat request to check the key, endpoint and model
    pub async fn test_chat(&self, model: &str) -> Result<()> {
        if model.trim().is_empty() {
            return Err(Error::MissingModel);
        }

        let url = format!("{}/chat/completions", self.base_url);
        let request = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&probe_request(model));

        let response = tokio::time::timeout(CONNECTION_TIMEOUT, request.send())
            .await
            .map_err(|_| Error::Timeout(CONNECTION_TIMEOUT.as_secs()))??;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(())
    }
}

fn normalize_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        DEFAULT_BASE_URL.to_string()
    } else {
        trimmed.to_string()
    }
}

fn probe_request(model: &str) -> ChatRequest<'_> {
    ChatRequest {
        model,
        messages: vec![ChatMessage {
            role: "user",
            content: "hi",
        }],
        max_tokens: 1,
    }
}

async fn error_from_response(response: reqwest::Response) -> Error {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => {
            let code = match envelope.error.code {
                Some(serde_json::Value::String(s)) => s,
                Some(serde_json::Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };
            Error::api(status, code, envelope.error.message)
        }
        Err(_) => Error::api(status, "", body),
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
struct ModelInfo {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_rejected() {
        assert!(matches!(
            OpenAiCatalog::new("  ", ""),
            Err(Error::InvalidApiKey)
        ));
    }

    #[test]
    fn test_base_url_normalization() {
        let catalog = OpenAiCatalog::new("sk-test", "").unwrap();
        assert_eq!(catalog.base_url(), DEFAULT_BASE_URL);

        let catalog = OpenAiCatalog::new("sk-test", "https://proxy.local/v1/ ").unwrap();
        assert_eq!(catalog.base_url(), "https://proxy.local/v1");
    }

    #[tokio::test]
    async fn test_chat_requires_model() {
        let catalog = OpenAiCatalog::new("sk-test", "http://127.0.0.1:9").unwrap();
        assert!(matches!(catalog.test_chat("").await, Err(Error::MissingModel)));
    }

    #[test]
    fn test_probe_request_shape() {
        let json = serde_json::to_value(probe_request("gpt-4o-mini")).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["max_tokens"], 1);
        assert_eq!(json["messages"][0]["content"], "hi");
    }

    #[test]
    fn test_model_list_parsing() {
        let list: ModelList = serde_json::from_str(
            r#"{"object":"list","data":[{"id":"gpt-4o","object":"model"},{"id":"o3-mini"}]}"#,
        )
        .unwrap();
        let ids: Vec<_> = list.data.into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["gpt-4o", "o3-mini"]);
    }
}
