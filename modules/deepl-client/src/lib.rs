pub mod error;

pub use error::{DeeplError, Result};

use serde::{Deserialize, Serialize};
use tracing::debug;

const BASE_URL: &str = "https://api.deepl.com/v2";

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    text: Vec<&'a str>,
    source_lang: &'a str,
    target_lang: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
struct Translation {
    text: String,
}

pub struct DeeplClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl DeeplClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Translate one text between the given ISO language codes.
    pub async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String> {
        let url = format!("{}/translate", self.base_url);

        debug!(source_lang, target_lang, "DeepL translate request");

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .json(&TranslateRequest {
                text: vec![text],
                source_lang,
                target_lang,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DeeplError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: TranslateResponse = resp.json().await.map_err(DeeplError::from)?;
        body.translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .ok_or(DeeplError::EmptyResponse)
    }
}
