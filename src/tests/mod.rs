//! In-crate test suites that span several modules.
//!
//! Unit tests live next to the code they cover; this tree holds shared
//! fixtures, property tests and multi-step scenarios over the mocked API.

mod common;
mod property;
