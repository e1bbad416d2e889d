//! Outbound notification collaborators (mail and chat tips)
//!
//! The gateway only hands a validated message to a [`Notifier`]. Protocol
//! adapters live outside this crate; [`TracingNotifier`] records deliveries
//! in the log for local and test deployments.

use async_trait::async_trait;
use mediagate_core::AppError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const MAX_SUBJECT_LEN: usize = 256;
const MAX_BODY_LEN: usize = 64 * 1024;

/// Request body for `POST /mail/send`
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Request body for `POST /slack/tip`
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct Tip {
    pub recipient: String,
    /// Credits offered with the tip
    pub amount: i64,
    #[serde(default)]
    pub message: Option<String>,
}

/// Acknowledgement returned once a notification was handed off
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Delivery {
    pub delivered: bool,
    pub channel: String,
}

impl MailMessage {
    pub fn validate(&self) -> Result<(), AppError> {
        let to = self.to.trim();
        let valid_address = to
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !valid_address {
            return Err(AppError::InvalidInput(
                "to must be an email address".to_string(),
            ));
        }
        if self.subject.trim().is_empty() || self.subject.len() > MAX_SUBJECT_LEN {
            return Err(AppError::InvalidInput(format!(
                "subject must be between 1 and {} characters",
                MAX_SUBJECT_LEN
            )));
        }
        if self.body.len() > MAX_BODY_LEN {
            return Err(AppError::PayloadTooLarge("mail body too large".to_string()));
        }
        Ok(())
    }
}

impl Tip {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.recipient.trim().is_empty() {
            return Err(AppError::InvalidInput("recipient is required".to_string()));
        }
        if self.amount <= 0 {
            return Err(AppError::InvalidInput(
                "amount must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_mail(&self, sender: &str, message: &MailMessage) -> Result<(), AppError>;

    async fn post_tip(&self, sender: &str, tip: &Tip) -> Result<(), AppError>;
}

/// Records notifications through `tracing` instead of delivering them.
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send_mail(&self, sender: &str, message: &MailMessage) -> Result<(), AppError> {
        tracing::info!(
            sender = %sender,
            to = %message.to,
            subject = %message.subject,
            body_len = message.body.len(),
            "Mail notification recorded"
        );
        Ok(())
    }

    async fn post_tip(&self, sender: &str, tip: &Tip) -> Result<(), AppError> {
        tracing::info!(
            sender = %sender,
            recipient = %tip.recipient,
            amount = tip.amount,
            "Tip notification recorded"
        );
        Ok(())
    }
}
