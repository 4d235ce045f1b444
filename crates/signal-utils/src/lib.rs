//! Shared utilities for the stock signal workspace
//!
//! This crate provides the ambient pieces every binary and library in the
//! workspace needs: tracing setup and environment-driven logging configuration.

pub mod config;
pub mod logging;

pub use config::{LogFormat, LoggingConfig};
pub use logging::{init_tracing, init_tracing_with};
