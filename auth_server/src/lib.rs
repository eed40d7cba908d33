//! HTTP front end for the forum credential service.
//!
//! Wraps [`forum_auth::SessionManager`] in an axum router and carries the
//! server concerns: configuration, structured logging, Prometheus metrics,
//! and the background purge of expired refresh tokens.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod purge;
