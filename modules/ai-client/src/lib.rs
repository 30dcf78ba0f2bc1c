mod schema;
pub(crate) mod types;

pub use schema::StructuredOutput;

use anyhow::{anyhow, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;

use types::*;

const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// OpenAI agent: an API key, a model, and an overridable base URL so tests
/// can point it at a mock server.
#[derive(Debug, Clone)]
pub struct OpenAi {
    api_key: String,
    model: String,
    http: reqwest::Client,
    base_url: String,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            http: reqwest::Client::new(),
            base_url: OPENAI_API_URL.to_string(),
        }
    }

    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow!("OPENAI_API_KEY environment variable not set"))?;
        Ok(Self::new(api_key, model))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    async fn post_chat(&self, body: &impl serde::Serialize) -> Result<ChatResponse> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(anyhow!("OpenAI API error ({}): {}", status, error_text));
        }

        Ok(response.json().await?)
    }

    /// Plain chat completion: system preamble + user prompt, text back.
    pub async fn chat_completion(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Result<String> {
        debug!(model = %self.model, "OpenAI chat request");

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                WireMessage::system(system.into()),
                WireMessage::user(user.into()),
            ],
            temperature: Some(0.3),
            max_tokens: Some(2000),
            response_format: None,
        };

        let response = self.post_chat(&request).await?;
        first_content(response)
    }

    /// Typed structured-output extraction. The schema for `T` is derived via
    /// schemars and tightened to OpenAI strict mode before the request.
    pub async fn extract<T: StructuredOutput>(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Result<T> {
        debug!(model = %self.model, type_name = %T::type_name(), "OpenAI structured output request");

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                WireMessage::system(system.into()),
                WireMessage::user(user.into()),
            ],
            temperature: Some(0.0),
            max_tokens: None,
            response_format: Some(ResponseFormat::json_schema(
                "structured_response",
                T::strict_schema(),
            )),
        };

        let response = self.post_chat(&request).await?;
        let json_str = first_content(response)?;

        serde_json::from_str(&json_str)
            .map_err(|e| anyhow!("Failed to deserialize structured response: {}", e))
    }
}

fn first_content(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| anyhow!("No response content from OpenAI"))
}
