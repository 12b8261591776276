//! Client-side view of a credential's payload
//!
//! Decoding here performs no signature check. It only projects the payload
//! of a token the backend has just issued; trust decisions always go back to
//! the verify endpoint.

use crate::error::SessionError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use pdfly_types::TokenClaims;

pub fn decode_unverified(token: &str) -> Result<TokenClaims, SessionError> {
    let mut parts = token.split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err(SessionError::MalformedToken("expected three segments".into())),
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| SessionError::MalformedToken(format!("payload encoding: {}", e)))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| SessionError::MalformedToken(format!("payload format: {}", e)))
}
