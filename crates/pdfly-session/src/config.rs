//! Client configuration
//!
//! Defaults are baked in at build time from `PDFLY_API_URL` and
//! `PDFLY_PUBLIC_KEY`; the same variables override them at runtime.

use std::time::Duration;

const DEFAULT_API_URL: &str = "http://localhost:3001";

/// How often an authenticated session is re-verified
pub const REVALIDATE_EVERY: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the auth endpoints
    pub base_url: String,
    /// Public API key sent as the bearer on unauthenticated requests
    pub public_key: String,
    pub revalidate_every: Duration,
    /// Production builds mark the credential cookie `Secure`
    pub production: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: option_env!("PDFLY_API_URL")
                .unwrap_or(DEFAULT_API_URL)
                .to_string(),
            public_key: option_env!("PDFLY_PUBLIC_KEY").unwrap_or_default().to_string(),
            revalidate_every: REVALIDATE_EVERY,
            production: !cfg!(debug_assertions),
        }
    }
}

impl ClientConfig {
    /// Build-time defaults overridden by the runtime environment
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("PDFLY_API_URL") {
            config.base_url = url;
        }
        if let Ok(key) = std::env::var("PDFLY_PUBLIC_KEY") {
            config.public_key = key;
        }
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        config
    }
}
