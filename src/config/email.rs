//! Email configuration (Resend)
//!
//! Mail is optional. Without an API key the sender logs and skips every
//! notification.

use serde::Deserialize;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// Resend API key (re_...)
    pub resend_api_key: Option<String>,

    #[serde(default = "default_from_email")]
    pub from_email: String,

    #[serde(default = "default_from_name")]
    pub from_name: String,

    /// Staff inbox for refund requests
    pub admin_email: Option<String>,
}

impl EmailConfig {
    /// Get formatted "From" header value
    pub fn from_header(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_email)
    }

    pub fn is_enabled(&self) -> bool {
        self.resend_api_key
            .as_deref()
            .map(|k| !k.is_empty())
            .unwrap_or(false)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(key) = self.resend_api_key.as_deref().filter(|k| !k.is_empty()) {
            if !key.starts_with("re_") {
                return Err(ValidationError::InvalidResendKey);
            }
        }
        if !self.from_email.contains('@') {
            return Err(ValidationError::InvalidFromEmail);
        }
        if let Some(admin) = &self.admin_email {
            if !admin.contains('@') {
                return Err(ValidationError::InvalidFromEmail);
            }
        }
        Ok(())
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            resend_api_key: None,
            from_email: default_from_email(),
            from_name: default_from_name(),
            admin_email: None,
        }
    }
}

fn default_from_email() -> String {
    "payments@eventhub.example".to_string()
}

fn default_from_name() -> String {
    "Event Payments".to_string()
}
