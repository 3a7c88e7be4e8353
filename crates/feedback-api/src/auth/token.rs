//! Raw token utilities used before signature verification.
//!
//! - Size limit enforced BEFORE any parsing (DoS prevention)
//! - `kid` extraction from the unverified header for JWKS key lookup
//! - `iat` validation with clock skew tolerance
//!
//! Error messages are intentionally generic; detail is logged at debug level
//! by callers.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use thiserror::Error;

/// Maximum allowed JWT size in bytes (8KB).
///
/// Typical tokens are a few hundred bytes; anything larger is rejected
/// before base64 decoding or cryptographic work happens.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Errors from pre-verification token handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token exceeds size limit")]
    TokenTooLarge,

    #[error("token is not a valid JWT structure")]
    MalformedToken,

    #[error("token header is missing a kid")]
    MissingKid,

    #[error("token iat is too far in the future")]
    IatTooFarInFuture,
}

/// Extract the `kid` (key ID) from a JWT header without verifying the
/// signature.
///
/// The returned value is only used to select a key from a trusted JWKS; the
/// token must still be verified against that key.
pub fn extract_kid(token: &str) -> Result<String, TokenError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        return Err(TokenError::TokenTooLarge);
    }

    let mut parts = token.split('.');
    let header_b64 = parts.next().ok_or(TokenError::MalformedToken)?;
    // Exactly three segments: header.payload.signature
    if parts.count() != 2 || header_b64.is_empty() {
        return Err(TokenError::MalformedToken);
    }

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header_b64)
        .map_err(|_| TokenError::MalformedToken)?;

    let header: serde_json::Value =
        serde_json::from_slice(&header_bytes).map_err(|_| TokenError::MalformedToken)?;

    match header.get("kid").and_then(|v| v.as_str()) {
        Some(kid) if !kid.is_empty() => Ok(kid.to_string()),
        _ => Err(TokenError::MissingKid),
    }
}

/// Validate an `iat` claim against the current time with skew tolerance.
///
/// Tokens issued more than `clock_skew_seconds` in the future are rejected;
/// tokens without an `iat` claim pass (expiry is checked separately).
pub fn validate_iat(iat: Option<i64>, clock_skew_seconds: i64) -> Result<(), TokenError> {
    let Some(iat) = iat else {
        return Ok(());
    };

    if iat > Utc::now().timestamp() + clock_skew_seconds {
        return Err(TokenError::IatTooFarInFuture);
    }

    Ok(())
}
