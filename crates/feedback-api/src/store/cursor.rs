//! Opaque continuation cursors for paginated reads.
//!
//! A cursor encodes the last evaluated `(targetId, itemId)` key pair as
//! base64url of a small JSON record. Callers treat the token as opaque; the
//! structure is never exposed unencoded across the service boundary.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Invalid pagination token")]
pub struct CursorError;

/// The resume point for a paginated key-range scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    pub target_id: String,
    pub item_id: String,
}

impl Cursor {
    pub fn new(target_id: impl Into<String>, item_id: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            item_id: item_id.into(),
        }
    }

    /// Encode as a transport-safe opaque token.
    pub fn encode(&self) -> String {
        // Serializing a two-string struct cannot fail
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Decode a token produced by [`Cursor::encode`].
    pub fn decode(token: &str) -> Result<Self, CursorError> {
        let bytes = URL_SAFE_NO_PAD.decode(token).map_err(|_| CursorError)?;
        serde_json::from_slice(&bytes).map_err(|_| CursorError)
    }
}
