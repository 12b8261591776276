use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    /// The backend rejected the credentials or the signup
    #[error("Authentication failed: {0}")]
    AuthFailure(String),

    /// The backend reported the stored credential invalid or expired
    #[error("Token invalid: {0}")]
    TokenInvalid(String),

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Request to auth backend failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Credential storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Credential serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
