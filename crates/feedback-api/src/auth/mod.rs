//! Authentication for the feedback API.
//!
//! Two independent schemes share a uniform outcome: a static API-key/target
//! pair for write endpoints and a JWKS-verified bearer token for read
//! endpoints. Both produce an [`Identity`](gateway::Identity) or a typed
//! [`AuthError`](gateway::AuthError); neither leaks into business logic.

pub mod claims;
pub mod gateway;
pub mod jwks;
pub mod token;
pub mod verifier;

pub use claims::Claims;
pub use gateway::{AuthError, AuthErrorKind, AuthGateway, AuthMethod, Identity};
pub use jwks::JwksClient;
pub use verifier::{JwtVerifier, Verification};
