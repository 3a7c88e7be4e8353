//! Query error types.

use thiserror::Error;

/// Errors from the remote query API.
///
/// A job that finishes as failed or cancelled is NOT an error; those are
/// reported as outcomes by the poller. Errors cover only the cases where the
/// protocol itself broke down.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The remote service rejected the query submission.
    #[error("query submission rejected: {0}")]
    SubmissionFailed(String),

    /// The request could not be delivered or the connection failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote service answered with a body this client cannot parse.
    #[error("invalid response from query service: {0}")]
    InvalidResponse(String),
}
