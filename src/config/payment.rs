//! Payment configuration
//!
//! Gateway credentials are optional: a gateway is registered only when its
//! credentials are present. The manual gateway needs none.

use serde::Deserialize;

use crate::adapters::razorpay::RazorpayConfig;
use crate::adapters::stripe::StripeConfig;
use crate::domain::foundation::Currency;

use super::error::ValidationError;
use super::server::Environment;

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe secret key (sk_live_... / sk_test_...)
    pub stripe_api_key: Option<String>,

    /// Stripe webhook signing secret (whsec_...)
    pub stripe_webhook_secret: Option<String>,

    /// Override for the Stripe API host
    pub stripe_api_base_url: Option<String>,

    /// Reject Stripe test-mode webhook events
    #[serde(default)]
    pub stripe_require_livemode: bool,

    /// Razorpay key id (rzp_live_... / rzp_test_...)
    pub razorpay_key_id: Option<String>,

    pub razorpay_key_secret: Option<String>,

    pub razorpay_webhook_secret: Option<String>,

    /// Override for the Razorpay API host
    pub razorpay_api_base_url: Option<String>,

    /// Complete payments at checkout without calling a gateway
    #[serde(default)]
    pub dev_mode: bool,

    /// Currency used when checkout omits one
    #[serde(default = "default_currency")]
    pub default_currency: String,

    /// Seconds between expiry / purge sweeps
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Days processed-webhook records are kept
    #[serde(default = "default_webhook_retention_days")]
    pub webhook_retention_days: i64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            stripe_api_key: None,
            stripe_webhook_secret: None,
            stripe_api_base_url: None,
            stripe_require_livemode: false,
            razorpay_key_id: None,
            razorpay_key_secret: None,
            razorpay_webhook_secret: None,
            razorpay_api_base_url: None,
            dev_mode: false,
            default_currency: default_currency(),
            sweep_interval_secs: default_sweep_interval(),
            webhook_retention_days: default_webhook_retention_days(),
        }
    }
}

impl PaymentConfig {
    /// Stripe adapter settings, when both key and webhook secret are set.
    pub fn stripe(&self) -> Option<StripeConfig> {
        let api_key = self.stripe_api_key.as_deref().filter(|k| !k.is_empty())?;
        let secret = self.stripe_webhook_secret.as_deref().filter(|s| !s.is_empty())?;
        let mut config =
            StripeConfig::new(api_key, secret).with_require_livemode(self.stripe_require_livemode);
        if let Some(url) = &self.stripe_api_base_url {
            config = config.with_base_url(url);
        }
        Some(config)
    }

    /// Razorpay adapter settings, when all three credentials are set.
    pub fn razorpay(&self) -> Option<RazorpayConfig> {
        let key_id = self.razorpay_key_id.as_deref().filter(|k| !k.is_empty())?;
        let key_secret = self.razorpay_key_secret.as_deref().filter(|k| !k.is_empty())?;
        let webhook_secret = self
            .razorpay_webhook_secret
            .as_deref()
            .filter(|k| !k.is_empty())?;
        let mut config = RazorpayConfig::new(key_id, key_secret, webhook_secret);
        if let Some(url) = &self.razorpay_api_base_url {
            config = config.with_base_url(url);
        }
        Some(config)
    }

    pub fn default_currency(&self) -> Result<Currency, ValidationError> {
        Currency::new(&self.default_currency)
            .map_err(|_| ValidationError::InvalidCurrency(self.default_currency.clone()))
    }

    pub fn validate(&self, environment: Environment) -> Result<(), ValidationError> {
        if self.dev_mode && environment == Environment::Production {
            return Err(ValidationError::DevModeInProduction);
        }

        match (&self.stripe_api_key, &self.stripe_webhook_secret) {
            (Some(key), Some(secret)) => {
                if !key.starts_with("sk_") {
                    return Err(ValidationError::InvalidStripeKey);
                }
                if !secret.starts_with("whsec_") {
                    return Err(ValidationError::InvalidStripeWebhookSecret);
                }
            }
            (Some(_), None) => {
                return Err(ValidationError::MissingRequired("PAYMENT__STRIPE_WEBHOOK_SECRET"))
            }
            (None, Some(_)) => {
                return Err(ValidationError::MissingRequired("PAYMENT__STRIPE_API_KEY"))
            }
            (None, None) => {}
        }

        if let Some(key_id) = &self.razorpay_key_id {
            if !key_id.starts_with("rzp_") {
                return Err(ValidationError::InvalidRazorpayKey);
            }
            if self.razorpay_key_secret.is_none() {
                return Err(ValidationError::MissingRequired("PAYMENT__RAZORPAY_KEY_SECRET"));
            }
            if self.razorpay_webhook_secret.is_none() {
                return Err(ValidationError::MissingRequired(
                    "PAYMENT__RAZORPAY_WEBHOOK_SECRET",
                ));
            }
        }

        self.default_currency()?;

        if !(10..=3600).contains(&self.sweep_interval_secs) {
            return Err(ValidationError::InvalidSweepInterval);
        }
        if self.webhook_retention_days < 1 {
            return Err(ValidationError::InvalidRetention);
        }
        Ok(())
    }
}

fn default_currency() -> String {
    "INR".to_string()
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_webhook_retention_days() -> i64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_stripe() -> PaymentConfig {
        PaymentConfig {
            stripe_api_key: Some("sk_test_abc".to_string()),
            stripe_webhook_secret: Some("whsec_abc".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn no_gateways_is_valid() {
        let config = PaymentConfig::default();
        assert!(config.validate(Environment::Development).is_ok());
        assert!(config.stripe().is_none());
        assert!(config.razorpay().is_none());
        assert_eq!(config.default_currency().unwrap().code(), "INR");
    }

    #[test]
    fn stripe_needs_both_credentials() {
        let config = PaymentConfig {
            stripe_webhook_secret: None,
            ..with_stripe()
        };
        assert_eq!(
            config.validate(Environment::Development),
            Err(ValidationError::MissingRequired("PAYMENT__STRIPE_WEBHOOK_SECRET"))
        );
        assert!(config.stripe().is_none());
        assert!(with_stripe().stripe().is_some());
    }

    #[test]
    fn stripe_key_prefixes_are_checked() {
        let config = PaymentConfig {
            stripe_api_key: Some("pk_test_abc".to_string()),
            ..with_stripe()
        };
        assert_eq!(
            config.validate(Environment::Development),
            Err(ValidationError::InvalidStripeKey)
        );

        let config = PaymentConfig {
            stripe_webhook_secret: Some("secret".to_string()),
            ..with_stripe()
        };
        assert_eq!(
            config.validate(Environment::Development),
            Err(ValidationError::InvalidStripeWebhookSecret)
        );
    }

    #[test]
    fn razorpay_is_built_from_all_three_credentials() {
        let config = PaymentConfig {
            razorpay_key_id: Some("rzp_test_abc".to_string()),
            razorpay_key_secret: Some("secret".to_string()),
            razorpay_webhook_secret: Some("hook".to_string()),
            ..Default::default()
        };
        assert!(config.validate(Environment::Development).is_ok());
        assert_eq!(config.razorpay().unwrap().key_id(), "rzp_test_abc");

        let partial = PaymentConfig {
            razorpay_webhook_secret: None,
            ..config
        };
        assert!(partial.validate(Environment::Development).is_err());
        assert!(partial.razorpay().is_none());
    }

    #[test]
    fn dev_mode_is_rejected_in_production() {
        let config = PaymentConfig {
            dev_mode: true,
            ..Default::default()
        };
        assert!(config.validate(Environment::Staging).is_ok());
        assert_eq!(
            config.validate(Environment::Production),
            Err(ValidationError::DevModeInProduction)
        );
    }

    #[test]
    fn sweep_and_retention_bounds() {
        let config = PaymentConfig {
            sweep_interval_secs: 1,
            ..Default::default()
        };
        assert_eq!(
            config.validate(Environment::Development),
            Err(ValidationError::InvalidSweepInterval)
        );

        let config = PaymentConfig {
            webhook_retention_days: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(Environment::Development),
            Err(ValidationError::InvalidRetention)
        );
    }

    #[test]
    fn bad_default_currency_is_rejected() {
        let config = PaymentConfig {
            default_currency: "rupees".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(Environment::Development),
            Err(ValidationError::InvalidCurrency(_))
        ));
    }
}
