// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Chat-completion client (OpenAI-compatible REST API).
//!
//! One request per call: no retry, no streaming. Call sites pick their
//! sampling parameters from the constants below.

use crate::config::Config;
use crate::error::AppError;
use serde::{Deserialize, Serialize};

/// Sampling parameters fixed per call site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

pub const SUMMARY_PARAMS: CompletionParams = CompletionParams {
    temperature: 0.7,
    max_tokens: 250,
};

pub const ONBOARDING_PARAMS: CompletionParams = CompletionParams {
    temperature: 0.8,
    max_tokens: 150,
};

pub const EXTRACTION_PARAMS: CompletionParams = CompletionParams {
    temperature: 0.1,
    max_tokens: 300,
};

/// Completion provider client.
#[derive(Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl CompletionClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Send a system + user message pair and return the trimmed reply.
    pub async fn complete(
        &self,
        system: &str,
        prompt: &str,
        params: CompletionParams,
    ) -> Result<String, AppError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::NotConfigured("completion provider API key".to_string()))?;

        let body = ChatCompletionRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(model = %self.model, max_tokens = params.max_tokens, "Requesting completion");

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Completion(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Completion(format!("HTTP {}: {}", status, body)));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Completion(format!("JSON parse error: {}", e)))?;

        extract_text(parsed)
    }
}

fn extract_text(response: ChatCompletionResponse) -> Result<String, AppError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|text| text.trim().to_string())
        .ok_or_else(|| AppError::Completion("Response contained no message".to_string()))
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_first_choice_trimmed() {
        let response: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"  Great day!\n"}},
                           {"message":{"role":"assistant","content":"ignored"}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "Great day!");
    }

    #[test]
    fn test_extract_empty_choices_is_error() {
        let response: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(
            extract_text(response),
            Err(AppError::Completion(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_key_is_not_configured() {
        let client = CompletionClient::new(&Config::test_default());
        assert!(!client.is_configured());

        let err = client
            .complete("system", "prompt", SUMMARY_PARAMS)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotConfigured(_)));
    }
}
