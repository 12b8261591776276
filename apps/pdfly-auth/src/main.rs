//! pdfly auth service
//!
//! Three JSON endpoints back the client session lifecycle:
//!
//! - `POST /login` - email/password to signed credential
//! - `POST /signup` - create an identity and its profile
//! - `POST /verify-token` - signature and expiry check
//!
//! plus `GET /health`. Identities live in sqlite with Argon2id hashes.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::Request,
    http::{Method, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use clap::Parser;
use pdfly_types::routes;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod error;
mod handlers;
mod jwt;
mod password;
mod state;

use config::Args;
use jwt::TokenSigner;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let signer = TokenSigner::new(args.jwt_secret.as_bytes(), args.token_lifetime_secs);
    let state = AppState::new(args.database_url.as_deref(), signer).await?;
    let app = app(Arc::new(state), args.cors_layer()?);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    info!("Starting pdfly auth service on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn app(state: Arc<AppState>, cors: CorsLayer) -> Router {
    Router::new()
        .route(routes::HEALTH, get(handlers::health))
        .route(
            routes::LOGIN,
            post(handlers::login)
                .options(handlers::preflight)
                .fallback(handlers::method_not_allowed),
        )
        .route(
            routes::SIGNUP,
            post(handlers::signup)
                .options(handlers::preflight)
                .fallback(handlers::method_not_allowed),
        )
        .route(
            routes::VERIFY_TOKEN,
            post(handlers::verify_token)
                .options(handlers::preflight)
                .fallback(handlers::method_not_allowed),
        )
        .layer(cors)
        .layer(middleware::from_fn(no_content_preflight))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS preflights answered by the cors layer come back 200; clients expect 204
async fn no_content_preflight(req: Request, next: Next) -> Response {
    let is_options = req.method() == Method::OPTIONS;
    let mut response = next.run(req).await;
    if is_options && response.status() == StatusCode::OK {
        *response.status_mut() = StatusCode::NO_CONTENT;
    }
    response
}
