//! Client for the auth service endpoints

use crate::config::ClientConfig;
use crate::error::SessionError;
use async_trait::async_trait;
use pdfly_types::{
    routes, ErrorBody, LoginRequest, LoginResponse, SignupRequest, SignupResponse,
    VerifyTokenRequest, VerifyTokenResponse,
};
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, SessionError>;

    async fn signup(&self, request: &SignupRequest) -> Result<SignupResponse, SessionError>;

    /// A rejected token is `Ok` with `valid: false`; `Err` means the check
    /// itself could not be performed
    async fn verify(&self, token: &str) -> Result<VerifyTokenResponse, SessionError>;
}

pub struct HttpAuthBackend {
    client: reqwest::Client,
    base_url: String,
    public_key: String,
}

impl HttpAuthBackend {
    pub fn new(config: &ClientConfig) -> Result<Self, SessionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            public_key: config.public_key.clone(),
        })
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<(StatusCode, R), SessionError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "auth request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.public_key)
            .json(body)
            .send()
            .await?;
        let status = response.status();
        Ok((status, response.json().await?))
    }

    async fn post_expecting<B, R>(&self, path: &str, body: &B) -> Result<R, SessionError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let (status, value) = self.post::<B, serde_json::Value>(path, body).await?;
        if status.is_success() {
            return Ok(serde_json::from_value(value)?);
        }

        let message = serde_json::from_value::<ErrorBody>(value)
            .map(|e| e.error)
            .unwrap_or_else(|_| format!("HTTP {}", status));
        Err(SessionError::AuthFailure(message))
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, SessionError> {
        self.post_expecting(routes::LOGIN, request).await
    }

    async fn signup(&self, request: &SignupRequest) -> Result<SignupResponse, SessionError> {
        self.post_expecting(routes::SIGNUP, request).await
    }

    async fn verify(&self, token: &str) -> Result<VerifyTokenResponse, SessionError> {
        let request = VerifyTokenRequest {
            token: token.to_string(),
        };
        // 401 still carries a VerifyTokenResponse body
        let (_, response) = self.post(routes::VERIFY_TOKEN, &request).await?;
        Ok(response)
    }
}
