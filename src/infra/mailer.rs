//! HTTP mailer backed by a transactional-email JSON API.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::application::delivery::{Mailer, MailerError, OutboundEmail};
use crate::config::MailerSettings;

const SEND_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpMailer {
    http: reqwest::Client,
    api_url: String,
    api_token: Option<String>,
}

impl HttpMailer {
    /// Build a mailer from settings. Returns `None` when no endpoint is
    /// configured, which disables delivery.
    pub fn from_settings(settings: &MailerSettings) -> Option<Self> {
        let api_url = settings.api_url.clone()?;
        Some(Self {
            http: reqwest::Client::new(),
            api_url,
            api_token: settings.api_token.clone(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &OutboundEmail) -> Result<(), MailerError> {
        let payload = json!({
            "from": {
                "name": message.from_name,
                "email": message.from_email,
            },
            "to": [{ "email": message.to }],
            "subject": message.subject,
            "html": message.html,
            "text": message.text,
        });

        let mut request = self
            .http
            .post(&self.api_url)
            .timeout(SEND_TIMEOUT)
            .json(&payload);
        if let Some(token) = self.api_token.as_ref() {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|err| MailerError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(MailerError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
