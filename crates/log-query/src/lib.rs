//! Asynchronous log query client.
//!
//! Remote log stores execute queries as jobs: a query is submitted, runs in
//! the background, and results are fetched once the job reaches a terminal
//! status. This crate wraps that submit-then-poll protocol:
//!
//! - [`client`] - the query API trait and its HTTP implementation
//! - [`poller`] - the polling loop that drives a job to completion
//! - [`error`] - transport and protocol error types
//!
//! ```no_run
//! # async fn example() -> Result<(), log_query::QueryError> {
//! use log_query::{HttpLogQueryClient, PollOptions, QueryPoller, QuerySpec};
//! use std::sync::Arc;
//!
//! let client = HttpLogQueryClient::new("http://logs.internal:9200".to_string())?;
//! let poller = QueryPoller::new(Arc::new(client));
//!
//! let spec = QuerySpec::last_hour(vec!["/service/api".to_string()]);
//! let outcome = poller.run(&spec, PollOptions::default()).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod poller;

pub use client::{HttpLogQueryClient, JobId, JobSnapshot, LogQueryApi, QuerySpec, RemoteStatus};
pub use error::QueryError;
pub use poller::{PollOptions, QueryOutcome, QueryPoller};
