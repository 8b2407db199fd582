//! BookHub - terminal client for a book exchange marketplace
//!
//! Browse books other people own, propose one-for-one exchanges, and
//! accept or reject the requests you receive.

pub mod config;
pub mod core;
pub mod tui;

#[cfg(test)]
mod tests;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
