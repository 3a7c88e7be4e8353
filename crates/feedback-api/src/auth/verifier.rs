//! Bearer token verification against the cached JWKS.
//!
//! Malformed, expired, or unknown-key tokens are expected outcomes and
//! produce [`Verification::Invalid`]; only infrastructure failures (the key
//! set could not be fetched) propagate as errors.

use crate::auth::claims::Claims;
use crate::auth::jwks::{Jwk, JwksClient, JwksError};
use crate::auth::token::{extract_kid, validate_iat};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::sync::Arc;
use tracing::instrument;

/// Generic rejection message; the precise cause is logged server-side only.
const INVALID_TOKEN_MESSAGE: &str = "The access token is invalid or expired";

/// Outcome of verifying a bearer token.
#[derive(Debug)]
pub enum Verification {
    Valid(Claims),
    Invalid(String),
}

/// JWT verifier configured with a key cache and optional issuer/audience.
pub struct JwtVerifier {
    jwks_client: Arc<JwksClient>,
    issuer: Option<String>,
    audience: Option<String>,
    clock_skew_seconds: i64,
}

impl JwtVerifier {
    pub fn new(
        jwks_client: Arc<JwksClient>,
        issuer: Option<String>,
        audience: Option<String>,
        clock_skew_seconds: i64,
    ) -> Self {
        Self {
            jwks_client,
            issuer,
            audience,
            clock_skew_seconds,
        }
    }

    /// Verify a token's signature and standard claims.
    ///
    /// Checks, in order: size limit, kid extraction, key lookup, EdDSA
    /// signature, `exp`, issuer/audience where configured, and `iat` clock
    /// skew. Every token-caused failure returns `Ok(Invalid)`; a JWKS fetch
    /// failure returns `Err`.
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &str) -> Result<Verification, JwksError> {
        let kid = match extract_kid(token) {
            Ok(kid) => kid,
            Err(e) => {
                tracing::debug!(target: "api.auth.jwt", error = ?e, "Token kid extraction failed");
                return Ok(Verification::Invalid(INVALID_TOKEN_MESSAGE.to_string()));
            }
        };

        let Some(jwk) = self.jwks_client.get_key(&kid).await? else {
            return Ok(Verification::Invalid(INVALID_TOKEN_MESSAGE.to_string()));
        };

        let claims = match self.decode_token(token, &jwk) {
            Some(claims) => claims,
            None => return Ok(Verification::Invalid(INVALID_TOKEN_MESSAGE.to_string())),
        };

        if let Err(e) = validate_iat(claims.iat, self.clock_skew_seconds) {
            tracing::debug!(target: "api.auth.jwt", error = ?e, "Token iat validation failed");
            return Ok(Verification::Invalid(INVALID_TOKEN_MESSAGE.to_string()));
        }

        tracing::debug!(target: "api.auth.jwt", "Token verified");
        Ok(Verification::Valid(claims))
    }

    /// Verify the signature and standard claims; `None` on any rejection.
    fn decode_token(&self, token: &str, jwk: &Jwk) -> Option<Claims> {
        if jwk.kty != "OKP" {
            tracing::warn!(target: "api.auth.jwt", kty = %jwk.kty, "Unexpected JWK key type");
            return None;
        }
        if let Some(alg) = &jwk.alg {
            if alg != "EdDSA" {
                tracing::warn!(target: "api.auth.jwt", alg = %alg, "Unexpected JWK algorithm");
                return None;
            }
        }

        let public_key_b64 = match jwk.x.as_ref() {
            Some(x) => x,
            None => {
                tracing::error!(target: "api.auth.jwt", kid = %jwk.kid, "JWK missing x field");
                return None;
            }
        };

        let public_key_bytes = match base64::Engine::decode(
            &base64::engine::general_purpose::URL_SAFE_NO_PAD,
            public_key_b64,
        ) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(target: "api.auth.jwt", error = %e, "Invalid public key encoding");
                return None;
            }
        };

        let decoding_key = DecodingKey::from_ed_der(&public_key_bytes);

        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.validate_exp = true;
        if let Some(iss) = &self.issuer {
            validation.set_issuer(&[iss]);
        }
        match &self.audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        match decode::<Claims>(token, &decoding_key, &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!(target: "api.auth.jwt", error = %e, "Token verification failed");
                None
            }
        }
    }
}
