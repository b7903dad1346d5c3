//! Weekly community health reports for Reddit.
//!
//! The binary in `src/main.rs` wires these modules together; they are
//! public so the integration tests in `tests/` can reach them.

pub mod analytics;
pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod publish;
pub mod report;
pub mod repository;
pub mod runner;
pub mod services;
