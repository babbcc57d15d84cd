//! Outgoing mail.
//!
//! Delivery sits behind the [`Mailer`] trait so the server never depends on
//! a particular transport. [`LogMailer`] is the default and only records
//! what would be sent; [`MemoryMailer`] keeps messages for inspection.

use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, instrument};

/// A file attached to an email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A plain-text email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub attachments: Vec<Attachment>,
}

impl Email {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, text_body: impl Into<String>) -> Self {
        Email {
            to: to.into(),
            subject: subject.into(),
            text_body: text_body.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Mail transport failed: {0}")]
    Transport(String),
}

/// Mail delivery.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

fn check_recipient(to: &str) -> Result<(), MailError> {
    if to.contains('@') && !to.trim().is_empty() {
        Ok(())
    } else {
        Err(MailError::InvalidRecipient(to.to_string()))
    }
}

/// Writes each message to the log instead of delivering it.
#[derive(Debug, Clone)]
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        LogMailer { from: from.into() }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    #[instrument(skip(self, email), fields(to = %email.to))]
    async fn send(&self, email: Email) -> Result<(), MailError> {
        check_recipient(&email.to)?;
        let attachments: Vec<&str> = email.attachments.iter().map(|a| a.filename.as_str()).collect();
        info!(
            from = %self.from,
            subject = %email.subject,
            attachments = ?attachments,
            body_len = email.text_body.len(),
            "Email sent"
        );
        Ok(())
    }
}

/// Keeps sent messages in memory.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<Email>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far.
    pub fn sent(&self) -> Vec<Email> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        check_recipient(&email.to)?;
        match self.sent.lock() {
            Ok(mut sent) => sent.push(email),
            Err(poisoned) => poisoned.into_inner().push(email),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_mailer_records_messages() {
        let mailer = MemoryMailer::new();
        let email = Email::new("asha@example.com", "Hello", "Body").with_attachment(Attachment {
            filename: "a.pdf".into(),
            content_type: "application/pdf".into(),
            bytes: b"%PDF".to_vec(),
        });
        mailer.send(email.clone()).await.unwrap();
        assert_eq!(mailer.sent(), vec![email]);
    }

    #[tokio::test]
    async fn test_bad_recipient_rejected() {
        let mailer = LogMailer::new("orders@storefront.local");
        let result = mailer.send(Email::new("not-an-address", "Hi", "")).await;
        assert!(matches!(result, Err(MailError::InvalidRecipient(_))));
    }
}
