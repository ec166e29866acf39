//! Billing mail over the Resend API.
//!
//! Without an API key every notification is logged and skipped. Delivery
//! failures are returned to the caller, which logs them and carries on.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::config::EmailConfig;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{Notification, NotificationSender};

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

pub struct ResendNotificationSender {
    api_key: Option<SecretString>,
    from: String,
    admin_email: Option<String>,
    endpoint: String,
    client: reqwest::Client,
}

/// A rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Email {
    to: String,
    subject: String,
    html: String,
}

impl ResendNotificationSender {
    pub fn new(config: &EmailConfig) -> Self {
        Self {
            api_key: config
                .resend_api_key
                .clone()
                .filter(|k| !k.is_empty())
                .map(SecretString::new),
            from: config.from_header(),
            admin_email: config.admin_email.clone(),
            endpoint: RESEND_ENDPOINT.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point at a different API host (for testing).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn render(&self, notification: &Notification) -> Option<Email> {
        match notification {
            Notification::PaymentConfirmed {
                to,
                event_title,
                payment_reference,
                amount,
                invoice_number,
                invoice_document,
            } => {
                let mut html = format!(
                    "<p>Hi {},</p><p>We received your payment of <strong>{}</strong> for \
                     <strong>{}</strong>.</p><p>Payment ID: {}<br>Invoice: {}</p>",
                    escape(&to.name),
                    amount,
                    escape(event_title),
                    payment_reference,
                    invoice_number
                );
                if let Some(document) = invoice_document {
                    html.push_str(&format!("<pre>{}</pre>", escape(document)));
                }
                Some(Email {
                    to: to.email.clone(),
                    subject: format!("Payment Confirmation - {}", event_title),
                    html,
                })
            }
            Notification::PaymentFailed {
                to,
                event_title,
                payment_reference,
                reason,
            } => Some(Email {
                to: to.email.clone(),
                subject: format!("Payment Failed - {}", event_title),
                html: format!(
                    "<p>Hi {},</p><p>Your payment {} for <strong>{}</strong> did not go \
                     through.</p><p>Reason: {}</p><p>You can try again from the event page.</p>",
                    escape(&to.name),
                    payment_reference,
                    escape(event_title),
                    escape(reason)
                ),
            }),
            Notification::PaymentInstructions {
                to,
                event_title,
                payment_reference,
                amount,
                payment_method,
            } => Some(Email {
                to: to.email.clone(),
                subject: format!("Payment Instructions - {}", event_title),
                html: format!(
                    "<p>Hi {},</p><p>To complete your registration for <strong>{}</strong>, \
                     pay <strong>{}</strong> by {}.</p><p>Quote payment ID {} as the \
                     reference. We will confirm once the money arrives.</p>",
                    escape(&to.name),
                    escape(event_title),
                    amount,
                    escape(&payment_method.replace('_', " ")),
                    payment_reference
                ),
            }),
            Notification::RefundProcessed {
                to,
                event_title,
                refund_reference,
                amount,
            } => Some(Email {
                to: to.email.clone(),
                subject: format!("Refund Processed - {}", event_title),
                html: format!(
                    "<p>Hi {},</p><p>Your refund of <strong>{}</strong> for <strong>{}</strong> \
                     has been processed.</p><p>Refund ID: {}</p>",
                    escape(&to.name),
                    amount,
                    escape(event_title),
                    refund_reference
                ),
            }),
            Notification::RefundRequested {
                requested_by,
                event_title,
                refund_reference,
                payment_reference,
                amount,
                reason,
            } => {
                let admin = self.admin_email.clone()?;
                Some(Email {
                    to: admin,
                    subject: format!("Refund Request - {}", refund_reference),
                    html: format!(
                        "<p>{} ({}) requested a refund of <strong>{}</strong> for \
                         <strong>{}</strong>.</p><p>Payment ID: {}<br>Refund ID: {}</p>\
                         <p>Reason: {}</p><p>This refund must be processed manually.</p>",
                        escape(&requested_by.name),
                        escape(&requested_by.email),
                        amount,
                        escape(event_title),
                        payment_reference,
                        refund_reference,
                        escape(reason)
                    ),
                })
            }
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[async_trait]
impl NotificationSender for ResendNotificationSender {
    async fn send(&self, notification: Notification) -> Result<(), DomainError> {
        let kind = notification.kind();
        let Some(api_key) = &self.api_key else {
            tracing::warn!(kind, "Email not configured, skipping");
            return Ok(());
        };
        let Some(email) = self.render(&notification) else {
            tracing::warn!(kind, "No recipient configured, skipping");
            return Ok(());
        };

        let body = serde_json::json!({
            "from": self.from,
            "to": [email.to],
            "subject": email.subject,
            "html": email.html,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                DomainError::new(ErrorCode::ExternalServiceError, format!("Resend: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::error!(kind, status = status.as_u16(), body = %text, "Resend rejected email");
            return Err(DomainError::new(
                ErrorCode::ExternalServiceError,
                format!("Resend returned {}", status),
            ));
        }

        tracing::info!(kind, subject = %email.subject, "Billing email sent");
        Ok(())
    }
}
