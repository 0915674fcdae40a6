//! Test tag selection engine.
//!
//! Holds the feature catalog model, the selection store and its batch and
//! search helpers, the saved-config repository with active-config tracking,
//! the deployment file emitter, and the persistence abstractions shared by
//! the API server and the HTTP client.

pub mod batch;
pub mod catalog;
pub mod config_export;
pub mod deployment;
pub mod diff;
pub mod error;
pub mod format;
pub mod naming;
pub mod persistence;
pub mod repository;
pub mod search;
pub mod selection;
pub mod session;
pub mod tracker;
pub mod types;
