//! Property-based tests for the catalog pipeline
//!
//! Run all property tests:
//! ```sh
//! cargo test property --release
//! ```
//!
//! ## Test Modules
//!
//! - `filter_props`: fuzzy filter and genre facet
//!   - Output is a subset of the catalog, in catalog order
//!   - Empty query with the "all" facet is the identity
//!   - Deterministic for the same inputs
//!   - Facet keeps exactly the rows of that genre
//!   - Query and facet compose as an intersection
//!
//! - `enrichment_props`: owner enrichment
//!   - The viewer's own books never appear
//!   - Everyone else's books all appear, in catalog order

mod enrichment_props;
mod filter_props;
