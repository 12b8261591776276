//! Credential signing and verification
//!
//! HS256 JWTs built directly on `hmac`/`sha2`. Verification checks the
//! signature, the header algorithm and expiry, and consults nothing else.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use pdfly_types::TokenClaims;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Invalid token format")]
    Malformed,

    #[error("Invalid signature")]
    BadSignature,

    #[error("Unsupported algorithm")]
    UnsupportedAlgorithm,

    #[error("Token expired")]
    Expired,

    #[error("Signing failed: {0}")]
    Signing(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct JwtHeader {
    alg: String,
    typ: String,
}

impl Default for JwtHeader {
    fn default() -> Self {
        Self {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        }
    }
}

/// Issues and checks credentials with one shared secret
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
    lifetime_secs: u64,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("lifetime_secs", &self.lifetime_secs)
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(secret: impl Into<Vec<u8>>, lifetime_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            lifetime_secs,
        }
    }

    pub fn issue(&self, sub: &str, email: &str, username: &str) -> Result<String, TokenError> {
        self.issue_at(sub, email, username, now())
    }

    pub fn issue_at(
        &self,
        sub: &str,
        email: &str,
        username: &str,
        now: u64,
    ) -> Result<String, TokenError> {
        let claims = TokenClaims {
            sub: sub.to_string(),
            email: email.to_string(),
            username: username.to_string(),
            exp: now.saturating_add(self.lifetime_secs),
        };

        let header = serde_json::to_vec(&JwtHeader::default())
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        let payload =
            serde_json::to_vec(&claims).map_err(|e| TokenError::Signing(e.to_string()))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(payload)
        );
        let signature = self.mac(&signing_input)?.finalize().into_bytes();

        Ok(format!(
            "{}.{}",
            signing_input,
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.verify_at(token, now())
    }

    pub fn verify_at(&self, token: &str, now: u64) -> Result<TokenClaims, TokenError> {
        let parts: Vec<&str> = token.split('.').collect();
        let [header_b64, payload_b64, signature_b64] = parts.as_slice() else {
            return Err(TokenError::Malformed);
        };

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::Malformed)?;
        self.mac(&format!("{}.{}", header_b64, payload_b64))?
            .verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let header: JwtHeader = decode_segment(header_b64)?;
        if header.alg != "HS256" {
            return Err(TokenError::UnsupportedAlgorithm);
        }

        let claims: TokenClaims = decode_segment(payload_b64)?;
        if claims.is_expired_at(now) {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    fn mac(&self, signing_input: &str) -> Result<HmacSha256, TokenError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        mac.update(signing_input.as_bytes());
        Ok(mac)
    }
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}

fn now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}
