//! Auth gateway: the two authentication entry points.
//!
//! Every call, success or failure, is stamped with a freshly generated
//! request id so outcomes can be correlated end-to-end. Both paths are pure
//! decision functions over their inputs plus injected dependencies (the key
//! registry and the JWT verifier); authentication failures never reach
//! business logic.

use crate::auth::verifier::{JwtVerifier, Verification};
use crate::config::ApiKeyEntry;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

/// How a request authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    ApiKey,
    Jwt,
}

/// The authenticated caller context attached to a request.
///
/// Request-scoped; never persisted.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Opaque trace id, freshly generated per request.
    pub request_id: String,

    /// Tenant scope. Present for API-key auth, where it comes from the
    /// matched registry entry; JWT-authenticated reads scope by query
    /// parameter instead.
    pub target_id: Option<String>,

    /// User id from the token (`sub`, falling back to the username claim).
    /// Absent for API-key auth.
    pub subject: Option<String>,

    pub auth_method: AuthMethod,
}

/// Why authentication failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    MissingApiKey,
    MissingTargetId,
    InvalidApiKey,
    MissingAuthorization,
    InvalidAuthorizationFormat,
    InvalidJwt,
    /// The verifier itself failed (key fetch), a server fault rather than a
    /// client fault.
    VerificationInfrastructure,
}

impl AuthErrorKind {
    /// Machine-readable code for the error body.
    pub fn code(self) -> &'static str {
        match self {
            AuthErrorKind::MissingApiKey => "MISSING_API_KEY",
            AuthErrorKind::MissingTargetId => "MISSING_TARGET_ID",
            AuthErrorKind::InvalidApiKey => "INVALID_API_KEY",
            AuthErrorKind::MissingAuthorization => "MISSING_AUTHORIZATION",
            AuthErrorKind::InvalidAuthorizationFormat => "INVALID_AUTHORIZATION_FORMAT",
            AuthErrorKind::InvalidJwt => "INVALID_JWT",
            AuthErrorKind::VerificationInfrastructure => "JWT_VERIFICATION_ERROR",
        }
    }

    /// Whether this is a server fault (500-class) rather than a 401.
    pub fn is_infrastructure(self) -> bool {
        matches!(self, AuthErrorKind::VerificationInfrastructure)
    }

    fn default_message(self) -> &'static str {
        match self {
            AuthErrorKind::MissingApiKey => "X-API-Key header is required",
            AuthErrorKind::MissingTargetId => "X-Target-Id header is required",
            AuthErrorKind::InvalidApiKey => "Invalid API key or targetId mismatch",
            AuthErrorKind::MissingAuthorization => "Authorization header is required",
            AuthErrorKind::InvalidAuthorizationFormat => {
                "Authorization header must be in \"Bearer <token>\" format"
            }
            AuthErrorKind::InvalidJwt => "JWT verification failed",
            AuthErrorKind::VerificationInfrastructure => {
                "Internal error during JWT verification"
            }
        }
    }
}

/// A rejected authentication attempt, carrying its correlation id.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AuthError {
    pub kind: AuthErrorKind,
    pub message: String,
    pub request_id: String,
}

impl AuthError {
    pub fn new(kind: AuthErrorKind, request_id: String) -> Self {
        Self {
            message: kind.default_message().to_string(),
            kind,
            request_id,
        }
    }

    fn with_message(kind: AuthErrorKind, message: String, request_id: String) -> Self {
        Self {
            kind,
            message,
            request_id,
        }
    }
}

/// Generate a per-request trace id: `req_<epoch-millis>_<short-random>`.
pub fn generate_request_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    let short = suffix.get(..7).unwrap_or("0000000");
    format!("req_{}_{}", chrono::Utc::now().timestamp_millis(), short)
}

/// Authentication gateway over the static key registry and the JWT verifier.
pub struct AuthGateway {
    api_keys: Vec<ApiKeyEntry>,
    verifier: Arc<JwtVerifier>,
}

impl fmt::Debug for AuthGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthGateway")
            .field("api_key_count", &self.api_keys.len())
            .finish()
    }
}

impl AuthGateway {
    pub fn new(api_keys: Vec<ApiKeyEntry>, verifier: Arc<JwtVerifier>) -> Self {
        Self { api_keys, verifier }
    }

    /// Authenticate a write request by its `X-API-Key` / `X-Target-Id`
    /// headers.
    ///
    /// A registry entry must match BOTH values exactly; a valid key replayed
    /// against another tenant's target id is rejected.
    #[instrument(skip_all)]
    pub fn authenticate_api_key(
        &self,
        api_key: Option<&str>,
        target_id: Option<&str>,
    ) -> Result<Identity, AuthError> {
        let request_id = generate_request_id();

        let Some(api_key) = api_key else {
            tracing::warn!(target: "api.auth", request_id = %request_id, "Missing X-API-Key header");
            return Err(AuthError::new(AuthErrorKind::MissingApiKey, request_id));
        };

        let Some(target_id) = target_id else {
            tracing::warn!(target: "api.auth", request_id = %request_id, "Missing X-Target-Id header");
            return Err(AuthError::new(AuthErrorKind::MissingTargetId, request_id));
        };

        let matched = self
            .api_keys
            .iter()
            .any(|entry| entry.key == api_key && entry.target_id == target_id);

        if !matched {
            tracing::warn!(target: "api.auth", request_id = %request_id, "Invalid API key or targetId mismatch");
            return Err(AuthError::new(AuthErrorKind::InvalidApiKey, request_id));
        }

        Ok(Identity {
            request_id,
            target_id: Some(target_id.to_string()),
            subject: None,
            auth_method: AuthMethod::ApiKey,
        })
    }

    /// Authenticate a read request by its `Authorization: Bearer <jwt>`
    /// header.
    #[instrument(skip_all)]
    pub async fn authenticate_bearer(
        &self,
        authorization: Option<&str>,
    ) -> Result<Identity, AuthError> {
        let request_id = generate_request_id();

        let Some(authorization) = authorization else {
            tracing::warn!(target: "api.auth", request_id = %request_id, "Missing Authorization header");
            return Err(AuthError::new(
                AuthErrorKind::MissingAuthorization,
                request_id,
            ));
        };

        let Some(token) = authorization.strip_prefix("Bearer ") else {
            tracing::warn!(target: "api.auth", request_id = %request_id, "Authorization header is not in Bearer format");
            return Err(AuthError::new(
                AuthErrorKind::InvalidAuthorizationFormat,
                request_id,
            ));
        };

        match self.verifier.verify(token.trim()).await {
            Ok(Verification::Valid(claims)) => Ok(Identity {
                request_id,
                target_id: None,
                subject: claims.subject().map(str::to_string),
                auth_method: AuthMethod::Jwt,
            }),
            Ok(Verification::Invalid(reason)) => {
                tracing::warn!(target: "api.auth", request_id = %request_id, reason = %reason, "JWT verification failed");
                Err(AuthError::with_message(
                    AuthErrorKind::InvalidJwt,
                    reason,
                    request_id,
                ))
            }
            Err(e) => {
                tracing::error!(target: "api.auth", request_id = %request_id, error = %e, "JWT verification error");
                Err(AuthError::new(
                    AuthErrorKind::VerificationInfrastructure,
                    request_id,
                ))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::jwks::JwksClient;

    fn gateway(entries: Vec<(&str, &str)>) -> AuthGateway {
        let api_keys = entries
            .into_iter()
            .map(|(key, target_id)| ApiKeyEntry {
                key: key.to_string(),
                target_id: target_id.to_string(),
            })
            .collect();
        // The verifier is never reached by the API-key path or by requests
        // rejected before token verification.
        let jwks = Arc::new(JwksClient::new(
            "http://localhost:8082/.well-known/jwks.json".to_string(),
        ));
        AuthGateway::new(api_keys, Arc::new(JwtVerifier::new(jwks, None, None, 300)))
    }

    #[test]
    fn test_api_key_valid_pair_succeeds() {
        let gw = gateway(vec![("key-a", "target-a"), ("key-b", "target-b")]);

        let identity = gw
            .authenticate_api_key(Some("key-a"), Some("target-a"))
            .unwrap();

        assert_eq!(identity.auth_method, AuthMethod::ApiKey);
        assert_eq!(identity.target_id.as_deref(), Some("target-a"));
        assert!(identity.subject.is_none());
        assert!(identity.request_id.starts_with("req_"));
    }

    #[test]
    fn test_api_key_rejects_cross_tenant_replay() {
        let gw = gateway(vec![("key-a", "target-a"), ("key-b", "target-b")]);

        // Valid key for tenant A replayed against tenant B's target id
        let err = gw
            .authenticate_api_key(Some("key-a"), Some("target-b"))
            .unwrap_err();
        assert_eq!(err.kind, AuthErrorKind::InvalidApiKey);
    }

    #[test]
    fn test_api_key_rejects_unknown_key() {
        let gw = gateway(vec![("key-a", "target-a")]);
        let err = gw
            .authenticate_api_key(Some("nope"), Some("target-a"))
            .unwrap_err();
        assert_eq!(err.kind, AuthErrorKind::InvalidApiKey);
    }

    #[test]
    fn test_api_key_missing_headers() {
        let gw = gateway(vec![("key-a", "target-a")]);

        let err = gw.authenticate_api_key(None, Some("target-a")).unwrap_err();
        assert_eq!(err.kind, AuthErrorKind::MissingApiKey);
        assert!(!err.request_id.is_empty());

        let err = gw.authenticate_api_key(Some("key-a"), None).unwrap_err();
        assert_eq!(err.kind, AuthErrorKind::MissingTargetId);
    }

    #[tokio::test]
    async fn test_bearer_missing_header() {
        let gw = gateway(vec![]);
        let err = gw.authenticate_bearer(None).await.unwrap_err();
        assert_eq!(err.kind, AuthErrorKind::MissingAuthorization);
    }

    #[tokio::test]
    async fn test_bearer_rejects_non_bearer_scheme() {
        let gw = gateway(vec![]);
        let err = gw
            .authenticate_bearer(Some("Basic dXNlcjpwYXNz"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, AuthErrorKind::InvalidAuthorizationFormat);
    }

    #[tokio::test]
    async fn test_bearer_rejects_lowercase_scheme() {
        let gw = gateway(vec![]);
        let err = gw
            .authenticate_bearer(Some("bearer abc.def.ghi"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, AuthErrorKind::InvalidAuthorizationFormat);
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = generate_request_id();
        let b = generate_request_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(AuthErrorKind::MissingApiKey.code(), "MISSING_API_KEY");
        assert_eq!(AuthErrorKind::InvalidApiKey.code(), "INVALID_API_KEY");
        assert_eq!(AuthErrorKind::InvalidJwt.code(), "INVALID_JWT");
        assert_eq!(
            AuthErrorKind::VerificationInfrastructure.code(),
            "JWT_VERIFICATION_ERROR"
        );
        assert!(AuthErrorKind::VerificationInfrastructure.is_infrastructure());
        assert!(!AuthErrorKind::InvalidJwt.is_infrastructure());
    }
}
