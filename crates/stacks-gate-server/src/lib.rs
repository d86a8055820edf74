//! HTTP front end for stacks-gate.
//!
//! Serves `GET /resource`, answering 400 for malformed or unproven requests,
//! 402 with payment instructions when no invoice is on chain, and the
//! generated resource once the caller has paid.
//!
//! # Modules
//!
//! - [`config`]: environment configuration ([`ServerConfig`](config::ServerConfig))
//! - [`generator`]: downstream resource generator client
//! - [`routes`]: HTTP handlers
//! - [`metrics`]: Prometheus metrics for decisions and generator fetches

pub mod config;
pub mod cors;
pub mod error;
pub mod generator;
pub mod metrics;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::ServerError;
pub use generator::{GeneratedResource, HttpGenerator, ResourceGenerator, ResourceKey};
pub use state::AppState;
