//! Rendering and writing the weekly summary.

pub mod markdown;
pub mod output;

pub use markdown::build_markdown;
pub use output::{purge_older_than, write_output, DEFAULT_RETENTION_DAYS};
