//! Feature flags configuration

use serde::Deserialize;

/// Feature flags for enabling/disabling functionality
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureFlags {
    /// Include internal error text in API responses (disable in production!)
    #[serde(default)]
    pub verbose_errors: bool,

    /// Wrap the router in a request trace layer
    #[serde(default = "default_enable_tracing")]
    pub enable_tracing: bool,

    /// Periodically fail pending payments whose payment window elapsed
    #[serde(default)]
    pub expire_pending_payments: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            verbose_errors: false,
            enable_tracing: default_enable_tracing(),
            expire_pending_payments: false,
        }
    }
}

fn default_enable_tracing() -> bool {
    true
}
