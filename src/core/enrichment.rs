//! Owner enrichment: attach owner display names to catalog entries and drop
//! the viewer's own books.
//!
//! All owner lookups are issued concurrently through the shared
//! [`NameResolver`] and awaited together. A single failed lookup fails the
//! whole run; partial catalogs are never produced.

use serde::{Deserialize, Serialize};

use super::error::Result;
use super::models::{Book, EnrichedBook, User};
use super::resolver::NameResolver;

/// How a catalog entry is recognised as belonging to the viewer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfExclusion {
    /// The resolved owner name equals the viewer's display name. Two users
    /// sharing a display name hide each other's books.
    #[default]
    DisplayName,
    /// The owner id equals the viewer's id.
    OwnerId,
}

impl SelfExclusion {
    fn is_own(self, book: &EnrichedBook, viewer: &User) -> bool {
        match self {
            Self::DisplayName => book.owner_name == viewer.name,
            Self::OwnerId => book.book.owner.id == viewer.id,
        }
    }
}

/// Enrich `catalog` for `viewer`. Output order follows the input order.
pub async fn enrich_catalog(
    catalog: Vec<Book>,
    viewer: &User,
    resolver: &NameResolver,
    policy: SelfExclusion,
) -> Result<Vec<EnrichedBook>> {
    let names = resolver
        .resolve_all(catalog.iter().map(|book| &book.owner.id))
        .await?;

    let total = catalog.len();
    let enriched: Vec<EnrichedBook> = catalog
        .into_iter()
        .filter_map(|book| {
            let owner_name = names.get(&book.owner.id)?.clone();
            Some(EnrichedBook { book, owner_name })
        })
        .filter(|entry| !policy.is_own(entry, viewer))
        .collect();

    log::debug!(
        "Enriched catalog: {} of {total} books visible to {}",
        enriched.len(),
        viewer.name
    );
    Ok(enriched)
}
