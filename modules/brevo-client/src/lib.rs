pub mod error;
pub mod types;

pub use error::{BrevoError, Result};
pub use types::{EmailAddress, SendEmailRequest};

use tracing::info;
use types::SendEmailResponse;

const BASE_URL: &str = "https://api.brevo.com/v3";

pub struct BrevoClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl BrevoClient {
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

    /// Send one transactional email. Returns the provider message id.
    pub async fn send_email(&self, request: &SendEmailRequest) -> Result<String> {
        let url = format!("{}/smtp/email", self.base_url);

        let resp = self
            .client
            .post(&url)
            .header("api-key", &self.api_key)
            .header("accept", "application/json")
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BrevoError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: SendEmailResponse = resp.json().await.map_err(BrevoError::from)?;
        let message_id = body.message_id.ok_or(BrevoError::MissingMessageId)?;

        info!(to = %request.to.first().map(|a| a.email.as_str()).unwrap_or("?"),
              message_id = %message_id, "Email accepted by Brevo");
        Ok(message_id)
    }
}
