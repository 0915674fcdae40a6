//! Tagsel persistence server library.
//!
//! Exposes the config, state, error handling, router and handlers so the
//! binary entrypoint and the integration tests build the same application.

pub mod config;
pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
