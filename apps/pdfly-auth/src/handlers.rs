//! HTTP handlers for the auth service

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use pdfly_types::{
    LoginRequest, LoginResponse, SignupRequest, SignupResponse, UserProfile, VerifyTokenRequest,
    VerifyTokenResponse,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::password::{
    hash_password, sanitize, validate_email, validate_password, validate_username,
    verify_password,
};
use crate::state::AppState;

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

/// Answer bare `OPTIONS` requests that are not CORS preflights
pub async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Any method other than POST (or OPTIONS) on an auth endpoint
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid request body: {}", e.body_text())))
}

/// Authenticate with email/password and issue a credential
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let req = body(payload)?;
    let email = sanitize(&req.email).to_lowercase();
    validate_email(&email).map_err(ApiError::InvalidRequest)?;
    if req.password.is_empty() {
        return Err(ApiError::InvalidRequest("Password is required".to_string()));
    }

    let identity: Option<(String, String)> =
        sqlx::query_as("SELECT id, password_hash FROM auth_identities WHERE email = ?")
            .bind(&email)
            .fetch_optional(&state.db)
            .await?;
    let Some((user_id, password_hash)) = identity else {
        tracing::info!("Login for unknown email");
        return Err(ApiError::InvalidCredentials);
    };

    let password = req.password;
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &password_hash))
        .await
        .map_err(anyhow::Error::from)?;
    if !matches {
        tracing::info!(%user_id, "Login with wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    let profile: Option<(String, String, String, String)> =
        sqlx::query_as("SELECT id, email, username, created_at FROM profiles WHERE id = ?")
            .bind(&user_id)
            .fetch_optional(&state.db)
            .await
            .map_err(|e| ApiError::Profile(e.to_string()))?;
    let profile = profile.map(|(id, email, username, created_at)| UserProfile {
        id,
        email,
        username,
        created_at: Some(created_at),
    });

    let username = profile
        .as_ref()
        .map(|p| p.username.clone())
        .unwrap_or_else(|| email.clone());
    let token = state
        .signer
        .issue(&user_id, &email, &username)
        .map_err(anyhow::Error::from)?;

    tracing::info!(%user_id, "Issued credential");

    Ok(Json(LoginResponse {
        token,
        profile,
        user_id,
        user_email: email,
    }))
}

/// Create an auth identity and its profile. A failed profile insert deletes
/// the identity again.
pub async fn signup(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    let req = body(payload)?;
    let email = sanitize(&req.email).to_lowercase();
    let username = sanitize(&req.username);

    validate_email(&email).map_err(ApiError::InvalidRequest)?;
    validate_password(&req.password).map_err(ApiError::InvalidRequest)?;
    validate_username(&username).map_err(ApiError::InvalidRequest)?;

    let password = req.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(anyhow::Error::from)?
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e)))?;

    let user_id = Uuid::new_v4().to_string();
    let inserted =
        sqlx::query("INSERT INTO auth_identities (id, email, password_hash) VALUES (?, ?, ?)")
            .bind(&user_id)
            .bind(&email)
            .bind(&password_hash)
            .execute(&state.db)
            .await;
    match inserted {
        Ok(_) => {}
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(ApiError::EmailTaken);
        }
        Err(e) => return Err(e.into()),
    }

    let profile = sqlx::query("INSERT INTO profiles (id, email, username) VALUES (?, ?, ?)")
        .bind(&user_id)
        .bind(&email)
        .bind(&username)
        .execute(&state.db)
        .await;

    if let Err(e) = profile {
        tracing::warn!(%user_id, "Profile insert failed, removing identity: {}", e);
        sqlx::query("DELETE FROM auth_identities WHERE id = ?")
            .bind(&user_id)
            .execute(&state.db)
            .await?;
        return Err(ApiError::Profile(e.to_string()));
    }

    tracing::info!(%user_id, "Created account");
    Ok((StatusCode::CREATED, Json(SignupResponse { user_id })))
}

/// Check a credential's signature and expiry
pub async fn verify_token(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VerifyTokenRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<VerifyTokenResponse>), ApiError> {
    let req = body(payload)?;
    if req.token.is_empty() {
        return Err(ApiError::InvalidRequest("Token is required".to_string()));
    }

    match state.signer.verify(&req.token) {
        Ok(claims) => Ok((StatusCode::OK, Json(VerifyTokenResponse::valid(claims)))),
        Err(e) => {
            tracing::debug!("Rejected token: {}", e);
            Ok((
                StatusCode::UNAUTHORIZED,
                Json(VerifyTokenResponse::invalid(e.to_string())),
            ))
        }
    }
}
