//! Feedback API Service Library
//!
//! This library provides the core functionality for the feedback API - an
//! HTTP service that collects product feedback and serves evolution
//! reports:
//!
//! - Feedback submission (API-key authenticated writes)
//! - Feedback and report retrieval (JWT authenticated reads, verified
//!   against a remote JWKS)
//! - A generic partitioned store with opaque-cursor pagination
//!
//! # Architecture
//!
//! The service follows the Handler -> Service -> Store pattern:
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/*.rs -> store/*.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - API-key registry, JWKS client, and JWT verification
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Authentication layers
//! - `models` - Data models
//! - `routes` - Axum router setup
//! - `services` - Feedback and report domain logic
//! - `store` - Partitioned storage primitive (PostgreSQL + in-memory)

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
