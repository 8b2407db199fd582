//! Common Test Utilities
//!
//! Shared fixtures for catalog, inbox and session tests.

pub mod fixtures;

pub use fixtures::*;
