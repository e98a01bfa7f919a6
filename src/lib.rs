//! Library entrypoint for invoke-binary.
//!
//! The primary interface is the `invoke-binary` executable. This lib target
//! exposes the launcher modules to integration tests.

pub mod actions;
pub mod config;
pub mod error;
pub mod launcher;
pub mod output;
pub mod platform;
