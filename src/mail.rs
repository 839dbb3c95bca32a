use axum::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

use crate::config::MailConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mail API rejected message: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Outbound email delivery. One call, one message; no retry, no queue.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError>;
}

/// Wire payload for the HTTP mail API. The `from` address is injected
/// from configuration, callers never supply it.
#[derive(Debug, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

#[derive(Clone)]
pub struct HttpMailer {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(config: &MailConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            from: config.from.clone(),
        }
    }

    fn payload(&self, to: &str, subject: &str, html: &str) -> OutgoingEmail {
        OutgoingEmail {
            from: self.from.clone(),
            to: vec![to.to_string()],
            subject: subject.to_string(),
            html: html.to_string(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError> {
        let res = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&self.payload(to, subject, html))
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            error!(status = status.as_u16(), %body, "mail API rejected message");
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(%to, %subject, "email accepted by transport");
        Ok(())
    }
}

#[cfg(test)]
mod mail_tests {
    use super::*;

    fn mailer() -> HttpMailer {
        HttpMailer::new(&MailConfig {
            api_url: "https://mail.invalid/emails".into(),
            api_key: "test-key".into(),
            from: "noreply@userhub.test".into(),
        })
    }

    #[test]
    fn payload_injects_configured_from_address() {
        let payload = mailer().payload("alice@example.com", "Verify email", "<a>link</a>");
        assert_eq!(payload.from, "noreply@userhub.test");
        assert_eq!(payload.to, vec!["alice@example.com".to_string()]);
    }

    #[test]
    fn payload_serializes_all_fields() {
        let json =
            serde_json::to_string(&mailer().payload("bob@example.com", "Hi", "<b>hi</b>")).unwrap();
        assert!(json.contains("\"from\":\"noreply@userhub.test\""));
        assert!(json.contains("\"to\":[\"bob@example.com\"]"));
        assert!(json.contains("\"subject\":\"Hi\""));
        assert!(json.contains("\"html\":\"<b>hi</b>\""));
    }
}
