//! Blocking client for OpenAI-compatible chat completion endpoints.
//!
//! Works against hosted APIs and local servers (llama.cpp's `llama-server`,
//! for instance) that accept `response_format` with a JSON schema.

use filesearch::{CompletionClient, CompletionRequest, ExtractionError};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::LlmError;
use crate::settings::LlmSettings;

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChatCompletionClient {
    http: Client,
    settings: LlmSettings,
}

impl ChatCompletionClient {
    pub fn new(settings: LlmSettings) -> Result<Self, LlmError> {
        if settings.base_url.trim().is_empty() {
            return Err(LlmError::InvalidInput("base URL is empty".to_string()));
        }
        let http = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|error| LlmError::Internal(format!("failed to build HTTP client: {error}")))?;
        Ok(Self { http, settings })
    }

    pub fn from_env() -> Result<Self, LlmError> {
        Self::new(LlmSettings::from_env())
    }

    pub fn settings(&self) -> &LlmSettings {
        &self.settings
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'))
    }

    /// Chat payload: the instruction as the system turn, each worked example
    /// as a user/assistant pair, then the input.
    pub fn request_body(&self, request: &CompletionRequest) -> Value {
        let mut messages = vec![json!({ "role": "system", "content": request.instruction })];
        for example in &request.examples {
            messages.push(json!({ "role": "user", "content": example.input }));
            messages.push(json!({ "role": "assistant", "content": example.output.to_string() }));
        }
        messages.push(json!({ "role": "user", "content": request.input }));

        json!({
            "model": self.settings.model,
            "messages": messages,
            "temperature": self.settings.temperature,
            "max_tokens": self.settings.max_output_tokens,
            "response_format": {
                "type": "json_object",
                "schema": request.schema,
            },
        })
    }

    pub fn send(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let mut builder = self.http.post(self.endpoint()).json(&self.request_body(request));
        if let Some(key) = self.settings.api_key.as_deref() {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send()?;
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            log::warn!("completion request failed status={status}");
            return Err(LlmError::Status {
                code: status.as_u16(),
                body,
            });
        }
        parse_response(&body)
    }
}

impl CompletionClient for ChatCompletionClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String, ExtractionError> {
        self.send(request).map_err(ExtractionError::from)
    }
}

/// Content of the first choice.
fn parse_response(body: &str) -> Result<String, LlmError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|error| LlmError::InvalidResponse(error.to_string()))?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| LlmError::InvalidResponse("response has no message content".to_string()))
}
