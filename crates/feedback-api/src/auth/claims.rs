//! Claims extracted from verified bearer tokens.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Claims from a validated JWT.
///
/// The subject fields contain user identifiers and are redacted in Debug
/// output to keep them out of logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id). Some identity providers omit it on certain token
    /// types, so the `username` claim acts as a fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Token issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Username claim, used when `sub` is absent.
    #[serde(
        default,
        alias = "cognito:username",
        skip_serializing_if = "Option::is_none"
    )]
    pub username: Option<String>,

    /// Space-separated scopes, when the provider issues them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl Claims {
    /// The authenticated user id: `sub`, falling back to `username`.
    pub fn subject(&self) -> Option<&str> {
        self.sub.as_deref().or(self.username.as_deref())
    }
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("sub", &self.sub.as_ref().map(|_| "[REDACTED]"))
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("iss", &self.iss)
            .field("username", &self.username.as_ref().map(|_| "[REDACTED]"))
            .field("scope", &self.scope)
            .finish()
    }
}
