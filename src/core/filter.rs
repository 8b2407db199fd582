//! Catalog filtering: a fuzzy title match composed with an exact genre facet.
//!
//! [`CatalogFilter::apply`] is a pure projection over an enriched catalog.
//! It never reorders rows; the fuzzy rank is reported alongside each row
//! but is not used for ordering.

use nucleo::{
    pattern::{Atom, AtomKind, CaseMatching, Normalization},
    Matcher, Utf32Str,
};

use super::models::EnrichedBook;

/// Facet value meaning "no genre filtering".
pub const ALL_GENRES: &str = "all";

/// Genre facet selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GenreFacet {
    #[default]
    All,
    /// Keep rows whose genre equals this string exactly.
    Exact(String),
}

impl GenreFacet {
    /// Parse a facet value as selected in the UI; `"all"` disables the facet.
    pub fn from_value(value: &str) -> Self {
        if value == ALL_GENRES {
            Self::All
        } else {
            Self::Exact(value.to_string())
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::All => "All Genres",
            Self::Exact(genre) => genre,
        }
    }

    pub fn matches(&self, book: &EnrichedBook) -> bool {
        match self {
            Self::All => true,
            Self::Exact(genre) => book.genre().as_str() == genre,
        }
    }
}

/// One row that passed the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilteredRow<'a> {
    /// Position of the row in the unfiltered catalog.
    pub index: usize,
    pub book: &'a EnrichedBook,
    /// Fuzzy match score; `None` when no text query is active.
    pub rank: Option<u16>,
}

/// Text query plus genre facet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFilter {
    pub query: String,
    pub facet: GenreFacet,
}

impl CatalogFilter {
    pub fn new(query: impl Into<String>, facet: GenreFacet) -> Self {
        Self {
            query: query.into(),
            facet,
        }
    }

    /// No query and no facet: every row passes.
    pub fn is_unfiltered(&self) -> bool {
        self.query.trim().is_empty() && self.facet == GenreFacet::All
    }

    /// Rows of `catalog` passing both the fuzzy query and the facet, in
    /// catalog order.
    pub fn apply<'a>(&self, catalog: &'a [EnrichedBook]) -> Vec<FilteredRow<'a>> {
        let query = self.query.trim();
        let atom = (!query.is_empty()).then(|| title_atom(query));
        let mut matcher = Matcher::default();
        let mut buf = Vec::new();

        catalog
            .iter()
            .enumerate()
            .filter(|(_, book)| self.facet.matches(book))
            .filter_map(|(index, book)| {
                let rank = match atom {
                    Some(ref atom) => {
                        let haystack = Utf32Str::new(book.title(), &mut buf);
                        Some(atom.score(haystack, &mut matcher)?)
                    }
                    None => None,
                };
                Some(FilteredRow { index, book, rank })
            })
            .collect()
    }
}

fn title_atom(query: &str) -> Atom {
    Atom::new(
        query,
        CaseMatching::Ignore,
        Normalization::Smart,
        AtomKind::Fuzzy,
        false,
    )
}

/// Fuzzy rank of `title` against `query`; `None` when it does not pass.
pub fn fuzzy_rank(title: &str, query: &str) -> Option<u16> {
    let query = query.trim();
    if query.is_empty() {
        return Some(0);
    }
    let mut matcher = Matcher::default();
    let mut buf = Vec::new();
    title_atom(query).score(Utf32Str::new(title, &mut buf), &mut matcher)
}

/// Distinct genres of `catalog` in first-seen order, for the facet picker.
pub fn genre_options(catalog: &[EnrichedBook]) -> Vec<String> {
    let mut genres: Vec<String> = Vec::new();
    for book in catalog {
        let genre = book.genre().as_str();
        if !genres.iter().any(|g| g == genre) {
            genres.push(genre.to_string());
        }
    }
    genres
}
