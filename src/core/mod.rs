pub mod api;
pub mod enrichment;
pub mod error;
pub mod exchange;
pub mod filter;
pub mod inbox;
pub mod logging;
pub mod models;
pub mod query;
pub mod resolver;
pub mod session;
pub mod shelf;
