//! Command-line and environment configuration

use axum::http::{header, HeaderValue, Method};
use clap::Parser;
use pdfly_types::TOKEN_LIFETIME_SECS;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

#[derive(Parser, Debug, Clone)]
#[command(name = "pdfly-auth")]
#[command(about = "Auth service for pdfly: login, signup and token verification")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3001")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Secret used to sign and verify credentials
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// sqlite connection string; defaults to a file in the user data directory
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Credential lifetime in seconds
    #[arg(long, env = "TOKEN_LIFETIME_SECS", default_value_t = TOKEN_LIFETIME_SECS)]
    pub token_lifetime_secs: u64,

    /// Comma-separated CORS origins; any origin when empty
    #[arg(long, env = "ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allowed_origins: Vec<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn cors_layer(&self) -> anyhow::Result<CorsLayer> {
        let origins = self
            .allowed_origins
            .iter()
            .map(|o| o.trim())
            .filter(|o| !o.is_empty())
            .map(HeaderValue::from_str)
            .collect::<Result<Vec<_>, _>>()?;

        let allow_origin = if origins.is_empty() {
            AllowOrigin::from(Any)
        } else {
            AllowOrigin::list(origins)
        };

        Ok(CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]))
    }
}
