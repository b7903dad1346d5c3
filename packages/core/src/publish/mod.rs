//! Outbound notifications once a summary is produced.

pub mod webhook;
