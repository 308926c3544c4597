use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::config::AppConfig;
use crate::errors::{AppError, Result};

/// Outbound notification contract. The auth service treats OTP delivery as
/// part of the request (failure is surfaced) and the post-reset
/// confirmation as fire-and-forget (failure is logged).
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send_otp(&self, email: &str, code: &str, display_name: &str) -> Result<()>;
    async fn send_reset_confirmation(&self, email: &str, display_name: &str) -> Result<()>;
}

/// HTTP mail API client (Resend-style JSON endpoint).
#[derive(Clone)]
pub struct EmailService {
    api_url: String,
    api_key: String,
    from: String,
    client: Client,
}

impl EmailService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            api_url: config.mail_api_url.clone(),
            api_key: config.mail_api_key.clone(),
            from: config.mail_from.clone(),
            client: Client::new(),
        }
    }

    async fn send(&self, to: &str, subject: &str, text: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": [to],
                "subject": subject,
                "text": text,
            }))
            .send()
            .await
            .map_err(|e| AppError::Delivery(format!("Mail API error: {}", e)))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AppError::Delivery(format!(
                "Mail sending failed with status: {}",
                response.status()
            )))
        }
    }
}

#[async_trait]
impl NotificationSender for EmailService {
    async fn send_otp(&self, email: &str, code: &str, display_name: &str) -> Result<()> {
        let text = format!(
            "Hi {},\n\nYour password reset code is: {}\n\nIt expires in 10 minutes. \
             If you did not request this, you can ignore this email.",
            display_name, code
        );
        self.send(email, "Your password reset code", &text).await
    }

    async fn send_reset_confirmation(&self, email: &str, display_name: &str) -> Result<()> {
        let text = format!(
            "Hi {},\n\nYour password was just changed. If this wasn't you, \
             reset your password immediately.",
            display_name
        );
        self.send(email, "Your password was changed", &text).await
    }
}
