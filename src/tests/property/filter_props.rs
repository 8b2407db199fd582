//! Property-based tests for the catalog filter
//!
//! Tests invariants:
//! - filter(C, q, g) is a subset of C and preserves C's order
//! - filter(C, "", all) == C
//! - Same inputs give the same rows
//! - A genre facet keeps exactly the rows of that genre

use proptest::prelude::*;

use crate::core::filter::{CatalogFilter, GenreFacet};
use crate::core::models::EnrichedBook;
use crate::tests::common::enriched;

// ============================================================================
// Strategies
// ============================================================================

const GENRES: [&str; 6] = [
    "Fiction",
    "Non-Fiction",
    "Mystery",
    "Science Fiction",
    "Fantasy",
    "Poetry",
];

fn arb_genre() -> impl Strategy<Value = String> {
    prop::sample::select(GENRES.to_vec()).prop_map(str::to_string)
}

fn arb_catalog(max: usize) -> impl Strategy<Value = Vec<EnrichedBook>> {
    prop::collection::vec(("[A-Za-z ]{1,24}", arb_genre(), "[a-z]{3,8}"), 0..max).prop_map(
        |rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (title, genre, owner))| enriched(&i.to_string(), &title, &genre, &owner))
                .collect()
        },
    )
}

fn arb_query() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), "[a-z]{1,4}", " [A-Za-z]{1,3} "]
}

fn arb_facet() -> impl Strategy<Value = GenreFacet> {
    prop_oneof![
        Just(GenreFacet::All),
        arb_genre().prop_map(GenreFacet::Exact),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Property: rows come from the catalog, in strictly increasing catalog order.
    #[test]
    fn prop_subset_and_order_preserving(
        catalog in arb_catalog(30),
        query in arb_query(),
        facet in arb_facet()
    ) {
        let rows = CatalogFilter::new(query, facet).apply(&catalog);

        prop_assert!(rows.len() <= catalog.len());
        for row in &rows {
            prop_assert_eq!(row.book, &catalog[row.index]);
        }
        for pair in rows.windows(2) {
            prop_assert!(pair[0].index < pair[1].index, "Rows must keep catalog order");
        }
    }

    /// Property: no query and no facet returns the catalog unchanged.
    #[test]
    fn prop_unfiltered_is_identity(catalog in arb_catalog(30)) {
        let filter = CatalogFilter::new("", GenreFacet::All);
        prop_assert!(filter.is_unfiltered());

        let rows = filter.apply(&catalog);
        let books: Vec<&EnrichedBook> = rows.iter().map(|r| r.book).collect();
        let expected: Vec<&EnrichedBook> = catalog.iter().collect();
        prop_assert_eq!(books, expected);
    }

    /// Property: same inputs give the same rows and ranks.
    #[test]
    fn prop_deterministic(
        catalog in arb_catalog(30),
        query in arb_query(),
        facet in arb_facet()
    ) {
        let filter = CatalogFilter::new(query, facet);
        prop_assert_eq!(filter.apply(&catalog), filter.apply(&catalog));
    }

    /// Property: a facet alone keeps exactly the rows whose genre matches.
    #[test]
    fn prop_facet_is_exact(catalog in arb_catalog(30), genre in arb_genre()) {
        let rows = CatalogFilter::new("", GenreFacet::Exact(genre.clone())).apply(&catalog);

        for row in &rows {
            prop_assert_eq!(row.book.genre().as_str(), genre.as_str());
        }
        let expected = catalog.iter().filter(|b| b.genre().as_str() == genre).count();
        prop_assert_eq!(rows.len(), expected);
    }

    /// Property: query and facet together keep the rows that pass each alone.
    #[test]
    fn prop_query_and_facet_compose(
        catalog in arb_catalog(30),
        query in arb_query(),
        genre in arb_genre()
    ) {
        let both = CatalogFilter::new(query.clone(), GenreFacet::Exact(genre.clone())).apply(&catalog);
        let by_query: Vec<usize> = CatalogFilter::new(query, GenreFacet::All)
            .apply(&catalog)
            .iter()
            .map(|r| r.index)
            .collect();
        let by_facet: Vec<usize> = CatalogFilter::new("", GenreFacet::Exact(genre))
            .apply(&catalog)
            .iter()
            .map(|r| r.index)
            .collect();

        let expected: Vec<usize> = by_query.into_iter().filter(|i| by_facet.contains(i)).collect();
        let actual: Vec<usize> = both.iter().map(|r| r.index).collect();
        prop_assert_eq!(actual, expected);
    }
}

#[test]
fn test_dun_matches_dune_only() {
    let catalog = vec![
        enriched("1", "Dune", "Science Fiction", "Alice"),
        enriched("2", "Emma", "Fiction", "Bob"),
    ];
    let rows = CatalogFilter::new("dun", GenreFacet::All).apply(&catalog);
    let titles: Vec<&str> = rows.iter().map(|r| r.book.title()).collect();
    assert_eq!(titles, ["Dune"]);
}
