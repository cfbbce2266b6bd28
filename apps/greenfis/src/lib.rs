//! # GreenFis Library
//!
//! This library exposes the GreenFis server modules for testing and integration.
//!
//! The main binary uses these modules through the `main.rs` entry point.

pub mod api;
pub mod cli;
pub mod config;

// Re-export greenfis_core for convenience
pub use greenfis_core;
