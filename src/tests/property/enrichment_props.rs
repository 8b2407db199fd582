//! Property-based tests for owner enrichment
//!
//! Tests invariants:
//! - No enriched row is owned (by display name) by the viewer
//! - Every other row survives, in catalog order

use std::sync::Arc;

use proptest::prelude::*;

use crate::core::enrichment::{enrich_catalog, SelfExclusion};
use crate::core::models::{Book, EnrichedBook};
use crate::core::resolver::NameResolver;
use crate::tests::common::{book, naming_api, user};

fn arb_catalog() -> impl Strategy<Value = Vec<Book>> {
    prop::collection::vec(0u8..5, 0..25).prop_map(|owners| {
        owners
            .into_iter()
            .enumerate()
            .map(|(i, owner)| book(&i.to_string(), &format!("Book {i}"), "Fiction", &format!("u{owner}")))
            .collect()
    })
}

fn enrich(catalog: Vec<Book>, policy: SelfExclusion) -> Vec<EnrichedBook> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    let resolver = NameResolver::new(Arc::new(naming_api()));
    // Fixture names are `name-<id>`.
    let viewer = user("u0", "name-u0");
    runtime
        .block_on(enrich_catalog(catalog, &viewer, &resolver, policy))
        .expect("mock lookups succeed")
}

proptest! {
    /// Property: the viewer never sees their own books.
    #[test]
    fn prop_viewer_books_excluded(catalog in arb_catalog()) {
        for policy in [SelfExclusion::DisplayName, SelfExclusion::OwnerId] {
            let enriched = enrich(catalog.clone(), policy);
            for entry in &enriched {
                prop_assert_ne!(entry.owner_name.as_str(), "name-u0");
            }
        }
    }

    /// Property: everything else survives in catalog order with its owner's name.
    #[test]
    fn prop_others_kept_in_order(catalog in arb_catalog()) {
        let expected: Vec<Book> = catalog
            .iter()
            .filter(|b| b.owner.id.as_str() != "u0")
            .cloned()
            .collect();

        let enriched = enrich(catalog, SelfExclusion::DisplayName);

        let books: Vec<Book> = enriched.iter().map(|e| e.book.clone()).collect();
        prop_assert_eq!(books, expected);
        for entry in &enriched {
            prop_assert_eq!(&entry.owner_name, &format!("name-{}", entry.book.owner.id));
        }
    }
}
