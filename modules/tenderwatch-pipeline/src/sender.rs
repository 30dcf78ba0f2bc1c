// Digest delivery over Brevo, with bounded retry on transient transport
// failures. A digest that cannot be delivered surfaces as a Delivery error;
// the orchestrator records the task as failed in the sending stage and no
// retry is queued beyond this loop.

use async_trait::async_trait;
use tracing::{info, warn};

use brevo_client::{BrevoClient, EmailAddress, SendEmailRequest};
use tenderwatch_common::{DigestMessage, TenderWatchError};

use crate::retry;
use crate::traits::DigestSender;

const DIGEST_TAGS: [&str; 2] = ["procurement", "daily-digest"];

pub struct BrevoSender {
    client: BrevoClient,
    sender: EmailAddress,
    max_attempts: u32,
}

impl BrevoSender {
    pub fn new(api_key: &str, sender_name: &str, sender_email: &str, max_attempts: u32) -> Self {
        Self {
            client: BrevoClient::new(api_key),
            sender: EmailAddress::named(sender_name, sender_email),
            max_attempts: max_attempts.max(1),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, url: String) -> Self {
        self.client = BrevoClient::new("test-key").with_base_url(url);
        self
    }

    fn request_for(&self, message: &DigestMessage) -> SendEmailRequest {
        SendEmailRequest {
            sender: self.sender.clone(),
            to: vec![EmailAddress::new(&message.recipient_email)],
            subject: message.subject.clone(),
            html_content: message.html_body.clone(),
            text_content: message.text_body.clone(),
            headers: Default::default(),
            tags: DIGEST_TAGS.iter().map(|t| t.to_string()).collect(),
        }
        .with_list_unsubscribe(&message.unsubscribe_ref)
    }
}

#[async_trait]
impl DigestSender for BrevoSender {
    async fn send(&self, message: &DigestMessage) -> Result<String, TenderWatchError> {
        let request = self.request_for(message);

        let mut last_error = String::new();
        for attempt in 0..self.max_attempts {
            match self.client.send_email(&request).await {
                Ok(message_id) => return Ok(message_id),
                Err(e) if e.is_transient() && attempt + 1 < self.max_attempts => {
                    warn!(attempt = attempt + 1, error = %e, "Email send failed, retrying");
                    last_error = e.to_string();
                    tokio::time::sleep(retry::backoff_delay(attempt)).await;
                }
                Err(e) => {
                    return Err(TenderWatchError::Delivery(e.to_string()));
                }
            }
        }
        Err(TenderWatchError::Delivery(last_error))
    }
}

/// Sender used by `--dry-run`: composes everything, delivers nothing.
pub struct DryRunSender;

#[async_trait]
impl DigestSender for DryRunSender {
    async fn send(&self, message: &DigestMessage) -> Result<String, TenderWatchError> {
        info!(
            to = message.recipient_email.as_str(),
            subject = message.subject.as_str(),
            items = message.items.len(),
            "Dry run: digest composed but not sent"
        );
        Ok("dry-run".to_string())
    }
}
